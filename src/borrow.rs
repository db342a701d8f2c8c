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

//! Borrow records and the views derived from them.
//!
//! A record follows a two-state machine:
//! - created as [`Active`](BorrowStatus::Active) by a borrow
//! - [`Active`](BorrowStatus::Active) → [`Returned`](BorrowStatus::Returned) via return (terminal)
//!
//! Overdue is not a state. It is evaluated against a point in time with
//! [`BorrowRecord::is_overdue`].

use crate::base::{BookId, BorrowId, UserId};
use crate::catalog::BookSummary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BorrowStatus {
    Active,
    Returned,
}

/// One lending of one book to one user.
///
/// Only `return_date` and `status` ever change, and only once, when the
/// book comes back.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BorrowRecord {
    pub id: BorrowId,
    pub user_id: UserId,
    pub book_id: BookId,
    pub borrow_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub status: BorrowStatus,
}

impl BorrowRecord {
    pub(crate) fn new(
        id: BorrowId,
        user_id: UserId,
        book_id: BookId,
        borrow_date: DateTime<Utc>,
        due_date: DateTime<Utc>,
    ) -> Self {
        debug_assert!(due_date >= borrow_date, "due date precedes borrow date");
        Self {
            id,
            user_id,
            book_id,
            borrow_date,
            due_date,
            return_date: None,
            status: BorrowStatus::Active,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == BorrowStatus::Active
    }

    /// Active and past its due date at `now`.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.is_active() && now > self.due_date
    }

    /// Closes the record. A clock behind the borrow date is clamped so a
    /// record never comes back before it went out.
    pub(crate) fn mark_returned(&mut self, now: DateTime<Utc>) {
        debug_assert!(self.is_active(), "returning a record that is not active");
        self.return_date = Some(now.max(self.borrow_date));
        self.status = BorrowStatus::Returned;
    }
}

/// A borrow record joined with catalog metadata, as shown in history views.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BorrowDetails {
    #[serde(flatten)]
    pub record: BorrowRecord,
    pub is_overdue: bool,
    pub book_title: Option<String>,
    pub book_author: Option<String>,
}

impl BorrowDetails {
    pub fn new(record: BorrowRecord, summary: Option<BookSummary>, now: DateTime<Utc>) -> Self {
        let is_overdue = record.is_overdue(now);
        let (book_title, book_author) = match summary {
            Some(BookSummary { title, author }) => (Some(title), Some(author)),
            None => (None, None),
        };
        Self {
            record,
            is_overdue,
            book_title,
            book_author,
        }
    }
}

/// Lending state of a single book.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct AvailabilitySummary {
    pub book_id: BookId,
    pub is_available: bool,
    pub active_borrows: usize,
    pub total_borrows: usize,
}

impl AvailabilitySummary {
    /// Summary for a catalog book that has never been lent.
    pub fn never_borrowed(book_id: BookId) -> Self {
        Self {
            book_id,
            is_available: true,
            active_borrows: 0,
            total_borrows: 0,
        }
    }
}

/// A user's borrow history with aggregate counts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BorrowHistorySummary {
    pub total_borrows: usize,
    pub active_borrows: usize,
    pub returned_borrows: usize,
    pub overdue_borrows: usize,
    /// Most recent borrow first.
    pub borrows: Vec<BorrowDetails>,
}

impl BorrowHistorySummary {
    /// Builds the summary from details already sorted newest first.
    pub fn from_details(borrows: Vec<BorrowDetails>) -> Self {
        let active_borrows = borrows.iter().filter(|d| d.record.is_active()).count();
        let overdue_borrows = borrows.iter().filter(|d| d.is_overdue).count();
        Self {
            total_borrows: borrows.len(),
            active_borrows,
            returned_borrows: borrows.len() - active_borrows,
            overdue_borrows,
            borrows,
        }
    }
}

/// Filter and page for borrow listings.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BorrowQuery {
    pub status: Option<BorrowStatus>,
    pub skip: usize,
    /// Page size. `None` takes the smaller of the default page size and the
    /// configured maximum.
    pub limit: Option<usize>,
}

impl BorrowQuery {
    pub fn with_status(status: BorrowStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub(crate) fn matches(&self, record: &BorrowRecord) -> bool {
        self.status.is_none_or(|status| record.status == status)
    }
}

/// Sorts newest borrow first. Ties on the borrow date fall back to the id,
/// which is allocated in creation order.
pub(crate) fn sort_newest_first(records: &mut [BorrowRecord]) {
    records.sort_by(|a, b| {
        b.borrow_date
            .cmp(&a.borrow_date)
            .then_with(|| b.id.cmp(&a.id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, 9, 0, 0).unwrap()
    }

    fn record(id: u64, borrowed: u32, due: u32) -> BorrowRecord {
        BorrowRecord::new(BorrowId(id), UserId(1), BookId(1), at(borrowed), at(due))
    }

    #[test]
    fn new_record_is_active() {
        let record = record(1, 1, 15);
        assert!(record.is_active());
        assert_eq!(record.return_date, None);
    }

    #[test]
    fn overdue_only_after_due_date() {
        let record = record(1, 1, 15);
        assert!(!record.is_overdue(at(15)));
        assert!(record.is_overdue(at(15) + Duration::seconds(1)));
    }

    #[test]
    fn returned_record_is_never_overdue() {
        let mut record = record(1, 1, 15);
        record.mark_returned(at(20));
        assert_eq!(record.status, BorrowStatus::Returned);
        assert_eq!(record.return_date, Some(at(20)));
        assert!(!record.is_overdue(at(30)));
    }

    #[test]
    fn return_date_never_precedes_borrow_date() {
        let mut record = record(1, 10, 24);
        record.mark_returned(at(1));
        assert_eq!(record.return_date, Some(at(10)));
    }

    #[test]
    fn details_carry_summary_and_overdue_flag() {
        let summary = BookSummary {
            title: "Dune".into(),
            author: "Frank Herbert".into(),
        };
        let details = BorrowDetails::new(record(1, 1, 15), Some(summary), at(20));
        assert!(details.is_overdue);
        assert_eq!(details.book_title.as_deref(), Some("Dune"));
        assert_eq!(details.book_author.as_deref(), Some("Frank Herbert"));

        let orphan = BorrowDetails::new(record(2, 1, 15), None, at(2));
        assert!(!orphan.is_overdue);
        assert_eq!(orphan.book_title, None);
    }

    #[test]
    fn history_counts_are_consistent() {
        let mut returned = record(1, 1, 5);
        returned.mark_returned(at(4));
        let details = vec![
            BorrowDetails::new(record(3, 10, 12), None, at(20)),
            BorrowDetails::new(record(2, 8, 28), None, at(20)),
            BorrowDetails::new(returned, None, at(20)),
        ];

        let summary = BorrowHistorySummary::from_details(details);
        assert_eq!(summary.total_borrows, 3);
        assert_eq!(summary.active_borrows, 2);
        assert_eq!(summary.returned_borrows, 1);
        assert_eq!(summary.overdue_borrows, 1);
    }

    #[test]
    fn sort_breaks_date_ties_by_id() {
        let mut records = vec![record(1, 3, 10), record(3, 3, 10), record(2, 5, 10)];
        sort_newest_first(&mut records);
        let ids: Vec<u64> = records.iter().map(|r| r.id.0).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[test]
    fn query_matches_status() {
        let mut returned = record(1, 1, 5);
        returned.mark_returned(at(2));
        let active = record(2, 1, 5);

        assert!(BorrowQuery::default().matches(&returned));
        assert!(BorrowQuery::with_status(BorrowStatus::Active).matches(&active));
        assert!(!BorrowQuery::with_status(BorrowStatus::Active).matches(&returned));
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&BorrowStatus::Active).unwrap(), "\"active\"");
        assert_eq!(serde_json::to_string(&BorrowStatus::Returned).unwrap(), "\"returned\"");
    }
}
