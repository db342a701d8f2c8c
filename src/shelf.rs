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

//! Per-book lending state.
//!
//! Every book that has ever been lent owns a [`Shelf`]: the append-only list
//! of its borrow records plus a pointer to the one that is currently active.
//! Borrow and return run their check-then-act sequence while holding the
//! shelf's lock, which is what keeps two callers from lending the same copy.
//!
//! # Example
//!
//! ```
//! use library_ledger::{BookId, Shelf};
//!
//! let shelf = Shelf::new(BookId(1));
//! assert!(shelf.is_available());
//! assert_eq!(shelf.availability().total_borrows, 0);
//! ```

use crate::base::{BookId, BorrowId, UserId};
use crate::borrow::{AvailabilitySummary, BorrowRecord};
use crate::error::LedgerError;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, MutexGuard};

//  (none) ──borrow──► Active ──return──► Returned
#[derive(Debug)]
pub(crate) struct ShelfData {
    book_id: BookId,
    /// Index into `borrows` of the active record.
    active: Option<usize>,
    /// Every record for this book, in creation order.
    borrows: Vec<BorrowRecord>,
}

impl ShelfData {
    fn new(book_id: BookId) -> Self {
        Self {
            book_id,
            active: None,
            borrows: Vec::new(),
        }
    }

    fn assert_invariants(&self) {
        debug_assert!(
            self.borrows.iter().filter(|r| r.is_active()).count() <= 1,
            "Invariant violated: book {} has more than one active borrow",
            self.book_id
        );
        debug_assert!(
            self.active.is_none_or(|i| self.borrows[i].is_active()),
            "Invariant violated: active pointer of book {} names a returned record",
            self.book_id
        );
    }

    fn active_record(&self) -> Option<&BorrowRecord> {
        self.active.map(|i| &self.borrows[i])
    }

    /// Rejects the borrow if anyone holds the book.
    ///
    /// The holder is checked first so that a user re-borrowing their own
    /// book gets the more specific error.
    pub(crate) fn ensure_lendable(&self, user_id: UserId) -> Result<(), LedgerError> {
        match self.active_record() {
            Some(record) if record.user_id == user_id => Err(LedgerError::AlreadyBorrowedByUser),
            Some(_) => Err(LedgerError::BookAlreadyBorrowed),
            None => Ok(()),
        }
    }

    /// Appends a freshly created record and marks it active.
    pub(crate) fn check_out(&mut self, record: BorrowRecord) -> Result<&BorrowRecord, LedgerError> {
        debug_assert_eq!(record.book_id, self.book_id);
        self.ensure_lendable(record.user_id)?;
        self.borrows.push(record);
        let index = self.borrows.len() - 1;
        self.active = Some(index);
        self.assert_invariants();
        Ok(&self.borrows[index])
    }

    /// Closes the user's active borrow.
    pub(crate) fn check_in(
        &mut self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<&BorrowRecord, LedgerError> {
        let index = match self.active {
            Some(i) if self.borrows[i].user_id == user_id => i,
            _ => return Err(LedgerError::NoActiveBorrow),
        };
        self.borrows[index].mark_returned(now);
        self.active = None;
        self.assert_invariants();
        Ok(&self.borrows[index])
    }

    pub(crate) fn record(&self, borrow_id: BorrowId) -> Option<&BorrowRecord> {
        // Ids grow with creation order, so the list is sorted by id.
        self.borrows
            .binary_search_by_key(&borrow_id, |r| r.id)
            .ok()
            .map(|i| &self.borrows[i])
    }

    fn availability(&self) -> AvailabilitySummary {
        let active_borrows = usize::from(self.active.is_some());
        AvailabilitySummary {
            book_id: self.book_id,
            is_available: active_borrows == 0,
            active_borrows,
            total_borrows: self.borrows.len(),
        }
    }
}

/// Lending state of one book.
#[derive(Debug)]
pub struct Shelf {
    inner: Mutex<ShelfData>,
}

impl Shelf {
    pub fn new(book_id: BookId) -> Self {
        Self {
            inner: Mutex::new(ShelfData::new(book_id)),
        }
    }

    pub fn book_id(&self) -> BookId {
        self.inner.lock().book_id
    }

    pub fn is_available(&self) -> bool {
        self.inner.lock().active.is_none()
    }

    pub fn availability(&self) -> AvailabilitySummary {
        self.inner.lock().availability()
    }

    /// Snapshot of the active record, if any.
    pub fn active_borrow(&self) -> Option<BorrowRecord> {
        self.inner.lock().active_record().cloned()
    }

    /// Snapshot of every record in creation order.
    pub fn records(&self) -> Vec<BorrowRecord> {
        self.inner.lock().borrows.clone()
    }

    pub fn record(&self, borrow_id: BorrowId) -> Option<BorrowRecord> {
        self.inner.lock().record(borrow_id).cloned()
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, ShelfData> {
        self.inner.lock()
    }
}
