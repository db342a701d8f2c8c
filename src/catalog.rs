// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Book catalog collaborator.
//!
//! The ledger only reads from the catalog: it asks whether a book exists
//! before lending it, and fetches title and author to enrich history views.
//! [`InMemoryCatalog`] is the bundled implementation; anything backed by a
//! remote store implements [`Catalog`] and reports outages as
//! [`CatalogError::Unavailable`].

use crate::base::BookId;
use crate::error::CatalogError;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// A catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub year_published: Option<i32>,
}

impl Book {
    pub fn new(id: BookId, title: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            author: author.into(),
            genre: None,
            year_published: None,
        }
    }

    pub fn summary(&self) -> BookSummary {
        BookSummary {
            title: self.title.clone(),
            author: self.author.clone(),
        }
    }
}

/// Display metadata denormalized into borrow history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookSummary {
    pub title: String,
    pub author: String,
}

/// Read interface the ledger needs from a catalog.
pub trait Catalog: Send + Sync {
    fn book_exists(&self, book_id: BookId) -> Result<bool, CatalogError>;

    /// Returns `Ok(None)` for books that are not (or no longer) in the catalog.
    fn book_summary(&self, book_id: BookId) -> Result<Option<BookSummary>, CatalogError>;
}

/// Concurrent in-memory catalog.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    books: DashMap<BookId, Book>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self {
            books: DashMap::new(),
        }
    }

    /// Adds or replaces a book, returning the previous entry.
    pub fn insert(&self, book: Book) -> Option<Book> {
        self.books.insert(book.id, book)
    }

    pub fn remove(&self, book_id: BookId) -> Option<Book> {
        self.books.remove(&book_id).map(|(_, book)| book)
    }

    pub fn get(&self, book_id: BookId) -> Option<Book> {
        self.books.get(&book_id).map(|book| book.clone())
    }

    /// All books ordered by id.
    pub fn list(&self) -> Vec<Book> {
        let mut books: Vec<Book> = self.books.iter().map(|entry| entry.value().clone()).collect();
        books.sort_by_key(|book| book.id);
        books
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }
}

impl FromIterator<Book> for InMemoryCatalog {
    fn from_iter<I: IntoIterator<Item = Book>>(iter: I) -> Self {
        let catalog = InMemoryCatalog::new();
        for book in iter {
            catalog.insert(book);
        }
        catalog
    }
}

impl Catalog for InMemoryCatalog {
    fn book_exists(&self, book_id: BookId) -> Result<bool, CatalogError> {
        Ok(self.books.contains_key(&book_id))
    }

    fn book_summary(&self, book_id: BookId) -> Result<Option<BookSummary>, CatalogError> {
        Ok(self.books.get(&book_id).map(|book| book.summary()))
    }
}
