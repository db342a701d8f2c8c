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

//! Review eligibility.
//!
//! Users may only review books they have borrowed. A past borrow counts:
//! returning the book does not take the right away. The gate holds no state
//! of its own and reads the ledger on every call, so it must be consulted at
//! review-creation time rather than cached.

use crate::LedgerError;
use crate::base::{BookId, UserId};
use crate::ledger::Ledger;

/// Authorization check consulted before accepting a review.
#[derive(Clone, Copy)]
pub struct ReviewGate<'a> {
    ledger: &'a Ledger,
}

impl<'a> ReviewGate<'a> {
    pub fn new(ledger: &'a Ledger) -> Self {
        Self { ledger }
    }

    pub fn can_review(&self, user_id: UserId, book_id: BookId) -> bool {
        self.ledger.has_user_borrowed(user_id, book_id)
    }

    /// # Errors
    ///
    /// Returns [`LedgerError::ReviewNotAllowed`] if the user never borrowed the book.
    pub fn authorize(&self, user_id: UserId, book_id: BookId) -> Result<(), LedgerError> {
        if self.can_review(user_id, book_id) {
            Ok(())
        } else {
            tracing::debug!(%user_id, %book_id, "review rejected: book never borrowed");
            Err(LedgerError::ReviewNotAllowed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Book, InMemoryCatalog};
    use crate::error::ErrorKind;
    use std::sync::Arc;

    fn ledger() -> Ledger {
        let catalog = InMemoryCatalog::new();
        catalog.insert(Book::new(BookId(9), "Solaris", "Stanislaw Lem"));
        Ledger::new(Arc::new(catalog))
    }

    #[test]
    fn never_borrowed_is_forbidden() {
        let ledger = ledger();
        let gate = ledger.review_gate();

        assert!(!gate.can_review(UserId(1), BookId(9)));
        let err = gate.authorize(UserId(1), BookId(9)).unwrap_err();
        assert_eq!(err, LedgerError::ReviewNotAllowed);
        assert_eq!(err.kind(), ErrorKind::Forbidden);
    }

    #[test]
    fn active_borrow_allows_review() {
        let ledger = ledger();
        ledger.borrow_default(UserId(1), BookId(9)).unwrap();

        assert!(ledger.review_gate().can_review(UserId(1), BookId(9)));
        assert!(ledger.review_gate().authorize(UserId(1), BookId(9)).is_ok());
    }

    #[test]
    fn eligibility_survives_return() {
        let ledger = ledger();
        ledger.borrow_default(UserId(1), BookId(9)).unwrap();
        ledger.return_book(UserId(1), BookId(9)).unwrap();

        assert!(ledger.review_gate().can_review(UserId(1), BookId(9)));
    }

    #[test]
    fn eligibility_is_per_user() {
        let ledger = ledger();
        ledger.borrow_default(UserId(1), BookId(9)).unwrap();

        assert!(!ledger.review_gate().can_review(UserId(2), BookId(9)));
    }
}
