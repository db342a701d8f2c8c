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

//! # Library Ledger
//!
//! This library tracks the lending of library books: borrowing, returning,
//! availability, per-user history with overdue detection, and the rule that
//! only borrowers may review a book.
//!
//! ## Core Components
//!
//! - [`Ledger`]: Central borrow processor that owns every borrow record
//! - [`Shelf`]: Lending state of a single book
//! - [`Catalog`]: Read interface to the book catalog, with [`InMemoryCatalog`]
//! - [`ReviewGate`]: Review authorization backed by borrow history
//! - [`LedgerError`]: Error types for ledger operations
//!
//! ## Example
//!
//! ```
//! use library_ledger::{Book, BookId, InMemoryCatalog, Ledger, LedgerError, UserId};
//! use std::sync::Arc;
//!
//! let catalog = InMemoryCatalog::new();
//! catalog.insert(Book::new(BookId(7), "The Dispossessed", "Ursula K. Le Guin"));
//! let ledger = Ledger::new(Arc::new(catalog));
//!
//! // Borrow with the default 14-day loan period
//! let record = ledger.borrow_default(UserId(1), BookId(7)).unwrap();
//! assert!(!ledger.check_availability(BookId(7)).unwrap().is_available);
//!
//! // Nobody else can take it meanwhile
//! assert_eq!(
//!     ledger.borrow_default(UserId(2), BookId(7)),
//!     Err(LedgerError::BookAlreadyBorrowed)
//! );
//!
//! ledger.return_book(UserId(1), BookId(7)).unwrap();
//! assert!(ledger.check_availability(BookId(7)).unwrap().is_available);
//! assert!(ledger.review_gate().can_review(UserId(1), BookId(7)));
//! # let _ = record;
//! ```
//!
//! ## Thread Safety
//!
//! Borrows and returns of the same book are serialized by a per-book lock;
//! operations on different books run in parallel.

mod base;
pub mod borrow;
mod borrow_log;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod error;
mod ledger;
mod review;
mod shelf;

pub use base::{BookId, BorrowId, UserId};
pub use borrow::{
    AvailabilitySummary, BorrowDetails, BorrowHistorySummary, BorrowQuery, BorrowRecord,
    BorrowStatus,
};
pub use catalog::{Book, BookSummary, Catalog, InMemoryCatalog};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::LedgerConfig;
pub use error::{CatalogError, ConfigError, ErrorKind, LedgerError};
pub use ledger::Ledger;
pub use review::ReviewGate;
pub use shelf::Shelf;
