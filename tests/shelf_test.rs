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

//! Shelf public API integration tests.

use library_ledger::{Book, BookId, BorrowStatus, InMemoryCatalog, Ledger, Shelf, UserId};
use std::sync::Arc;
use std::thread;

fn ledger() -> Ledger {
    let catalog: InMemoryCatalog = [Book::new(BookId(7), "Dune", "Frank Herbert")]
        .into_iter()
        .collect();
    Ledger::new(Arc::new(catalog))
}

#[test]
fn new_shelf_is_available_and_empty() {
    let shelf = Shelf::new(BookId(3));

    assert_eq!(shelf.book_id(), BookId(3));
    assert!(shelf.is_available());
    assert!(shelf.active_borrow().is_none());
    assert!(shelf.records().is_empty());

    let summary = shelf.availability();
    assert_eq!(summary.active_borrows, 0);
    assert_eq!(summary.total_borrows, 0);
}

#[test]
fn shelf_exists_only_after_first_borrow() {
    let ledger = ledger();
    assert!(ledger.shelf(BookId(7)).is_none());

    ledger.borrow(UserId(1), BookId(7), 14).unwrap();
    assert!(ledger.shelf(BookId(7)).is_some());
}

#[test]
fn shelf_tracks_active_record() {
    let ledger = ledger();
    let record = ledger.borrow(UserId(1), BookId(7), 14).unwrap();

    let shelf = ledger.shelf(BookId(7)).unwrap();
    assert!(!shelf.is_available());
    assert_eq!(shelf.active_borrow(), Some(record.clone()));
    assert_eq!(shelf.record(record.id), Some(record));
}

#[test]
fn shelf_keeps_returned_records_in_creation_order() {
    let ledger = ledger();
    let first = ledger.borrow(UserId(1), BookId(7), 14).unwrap();
    ledger.return_book(UserId(1), BookId(7)).unwrap();
    let second = ledger.borrow(UserId(2), BookId(7), 14).unwrap();

    let shelf = ledger.shelf(BookId(7)).unwrap();
    let records = shelf.records();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].id, first.id);
    assert_eq!(records[0].status, BorrowStatus::Returned);
    assert_eq!(records[1].id, second.id);
    assert_eq!(records[1].status, BorrowStatus::Active);
    assert_eq!(shelf.active_borrow().map(|r| r.id), Some(second.id));
}

#[test]
fn shelf_snapshots_are_detached() {
    let ledger = ledger();
    ledger.borrow(UserId(1), BookId(7), 14).unwrap();

    let before = ledger.shelf(BookId(7)).unwrap().records();
    ledger.return_book(UserId(1), BookId(7)).unwrap();

    assert_eq!(before[0].status, BorrowStatus::Active);
    let after = ledger.shelf(BookId(7)).unwrap().records();
    assert_eq!(after[0].status, BorrowStatus::Returned);
}

#[test]
fn shelf_reads_are_thread_safe() {
    let ledger = Arc::new(ledger());
    ledger.borrow(UserId(1), BookId(7), 14).unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let ledger = ledger.clone();
            thread::spawn(move || {
                let shelf = ledger.shelf(BookId(7)).unwrap();
                (0..100).all(|_| !shelf.is_available())
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap());
    }
}
