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

//! Thread-safe index of borrow records.
//!
//! Shelves own the records themselves. The log answers the questions that
//! cut across books: which book a borrow id belongs to, and which borrows a
//! user has ever made.

use crate::LedgerError;
use crate::base::{BookId, BorrowId, UserId};
use crate::borrow::BorrowRecord;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

/// Locator of a record: its id and the shelf that holds it.
pub(crate) type BorrowRef = (BorrowId, BookId);

/// Append-only index of every borrow, keyed by record and by user.
#[derive(Debug, Default)]
pub(crate) struct BorrowLog {
    /// Borrow id to book, for O(1) record lookup and duplicate detection.
    books: DashMap<BorrowId, BookId>,

    /// Every borrow a user has made, in creation order.
    by_user: DashMap<UserId, Vec<BorrowRef>>,
}

impl BorrowLog {
    pub(crate) fn new() -> Self {
        Self {
            books: DashMap::new(),
            by_user: DashMap::new(),
        }
    }

    /// Indexes a newly created record.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::DuplicateBorrow`] if the id is already indexed.
    pub(crate) fn push(&self, record: &BorrowRecord) -> Result<(), LedgerError> {
        // Entry API makes the check-and-insert atomic
        match self.books.entry(record.id) {
            Entry::Occupied(_) => Err(LedgerError::DuplicateBorrow(record.id)),
            Entry::Vacant(entry) => {
                entry.insert(record.book_id);
                self.by_user
                    .entry(record.user_id)
                    .or_default()
                    .push((record.id, record.book_id));
                Ok(())
            }
        }
    }

    pub(crate) fn book_of(&self, borrow_id: BorrowId) -> Option<BookId> {
        self.books.get(&borrow_id).map(|book| *book)
    }

    /// Snapshot of a user's borrows in creation order.
    pub(crate) fn entries_for(&self, user_id: UserId) -> Vec<BorrowRef> {
        self.by_user
            .get(&user_id)
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    /// True if the user has borrowed the book at any point.
    pub(crate) fn has_borrowed(&self, user_id: UserId, book_id: BookId) -> bool {
        self.by_user
            .get(&user_id)
            .is_some_and(|entries| entries.iter().any(|(_, book)| *book == book_id))
    }

    /// Users with at least one borrow, ordered by id.
    pub(crate) fn users(&self) -> Vec<UserId> {
        let mut users: Vec<UserId> = self.by_user.iter().map(|entry| *entry.key()).collect();
        users.sort();
        users
    }

    pub(crate) fn len(&self) -> usize {
        self.books.len()
    }
}
