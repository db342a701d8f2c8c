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

//! Borrow ledger.
//!
//! The [`Ledger`] is the central component: it lends and takes back books,
//! answers availability and history queries, and backs the review gate.
//!
//! # Operations
//!
//! - **Borrow**: Lends a catalog book to a user for a number of days.
//! - **Return**: Closes the user's active borrow of a book.
//! - **Availability**: Reports whether a book is on the shelf and how often it was lent.
//! - **History**: Lists a user's borrows, newest first, with aggregate counts.
//! - **Has borrowed**: Tells whether a user ever borrowed a book, returned or not.
//!
//! # Thread Safety
//!
//! Shelves live in a [`DashMap`] keyed by book. Borrow and return hold the
//! book's shelf lock across their check and their write, so two callers
//! racing for one book serialize while different books proceed in parallel.

use crate::base::{BookId, BorrowId, UserId};
use crate::borrow::{
    AvailabilitySummary, BorrowDetails, BorrowHistorySummary, BorrowQuery, BorrowRecord,
    sort_newest_first,
};
use crate::borrow_log::BorrowLog;
use crate::catalog::{BookSummary, Catalog};
use crate::clock::{Clock, SystemClock};
use crate::config::LedgerConfig;
use crate::review::ReviewGate;
use crate::shelf::Shelf;
use crate::LedgerError;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Append-only ledger of borrow records.
///
/// # Invariants
///
/// - A book has at most one active borrow (single-copy model).
/// - A user holds at most one active borrow per book.
/// - Records are never deleted; a return date, once set, never changes.
/// - `due_date >= borrow_date` for every record.
pub struct Ledger {
    catalog: Arc<dyn Catalog>,
    clock: Arc<dyn Clock>,
    config: LedgerConfig,
    /// Lending state indexed by book ID.
    shelves: DashMap<BookId, Shelf>,
    /// Cross-book index by borrow ID and user.
    log: BorrowLog,
    next_id: AtomicU64,
}

impl Ledger {
    /// Creates an empty ledger over `catalog`, using wall-clock time and
    /// default settings.
    pub fn new(catalog: Arc<dyn Catalog>) -> Self {
        Ledger {
            catalog,
            clock: Arc::new(SystemClock),
            config: LedgerConfig::default(),
            shelves: DashMap::new(),
            log: BorrowLog::new(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_config(mut self, config: LedgerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Lends `book_id` to `user_id` for `loan_period_days` days.
    ///
    /// The catalog is asked before the shelf lock is taken, so a book removed
    /// from the catalog concurrently with this call may still be lent.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidLoanPeriod`] - Period is not positive or exceeds the configured maximum.
    /// - [`LedgerError::BookNotFound`] - Book is not in the catalog.
    /// - [`LedgerError::CatalogUnavailable`] - Catalog could not be asked.
    /// - [`LedgerError::AlreadyBorrowedByUser`] - User already holds this book.
    /// - [`LedgerError::BookAlreadyBorrowed`] - Someone else holds this book.
    pub fn borrow(
        &self,
        user_id: UserId,
        book_id: BookId,
        loan_period_days: i64,
    ) -> Result<BorrowRecord, LedgerError> {
        let loan_period = self.loan_period(loan_period_days)?;
        self.ensure_book_exists(book_id)?;

        // Everything below runs under the shelf lock, so the availability
        // check and the insertion are one atomic step.
        let shelf = self
            .shelves
            .entry(book_id)
            .or_insert_with(|| Shelf::new(book_id))
            .downgrade();
        let mut data = shelf.lock();

        data.ensure_lendable(user_id).inspect_err(|err| {
            tracing::debug!(%user_id, %book_id, error = %err, "borrow rejected");
        })?;

        let borrow_date = self.clock.now();
        let due_date = borrow_date
            .checked_add_signed(loan_period)
            .ok_or(LedgerError::InvalidLoanPeriod(loan_period_days))?;
        let id = BorrowId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let record = BorrowRecord::new(id, user_id, book_id, borrow_date, due_date);

        let record = data.check_out(record)?.clone();
        // Indexed only once the shelf holds the record, still under its lock
        self.log.push(&record)?;

        tracing::info!(
            borrow_id = %record.id,
            %user_id,
            %book_id,
            due_date = %record.due_date,
            "book borrowed"
        );
        Ok(record)
    }

    /// Lends a book for the configured default loan period.
    pub fn borrow_default(
        &self,
        user_id: UserId,
        book_id: BookId,
    ) -> Result<BorrowRecord, LedgerError> {
        self.borrow(user_id, book_id, self.config.default_loan_period_days)
    }

    /// Closes `user_id`'s active borrow of `book_id`.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::NoActiveBorrow`] - The user does not hold the book, either
    ///   because they never borrowed it or because it was already returned.
    pub fn return_book(&self, user_id: UserId, book_id: BookId) -> Result<BorrowRecord, LedgerError> {
        let shelf = self
            .shelves
            .get(&book_id)
            .ok_or(LedgerError::NoActiveBorrow)?;
        let mut data = shelf.lock();

        let now = self.clock.now();
        let record = data
            .check_in(user_id, now)
            .inspect_err(|err| {
                tracing::debug!(%user_id, %book_id, error = %err, "return rejected");
            })?
            .clone();

        tracing::info!(borrow_id = %record.id, %user_id, %book_id, "book returned");
        Ok(record)
    }

    /// Reports whether a catalog book can be borrowed right now.
    ///
    /// Unknown books fail with [`LedgerError::BookNotFound`], the same as `borrow`.
    pub fn check_availability(&self, book_id: BookId) -> Result<AvailabilitySummary, LedgerError> {
        self.ensure_book_exists(book_id)?;
        Ok(self
            .shelves
            .get(&book_id)
            .map(|shelf| shelf.availability())
            .unwrap_or_else(|| AvailabilitySummary::never_borrowed(book_id)))
    }

    /// Returns every borrow `user_id` has made, newest first, with counts.
    ///
    /// Overdue is evaluated at call time.
    pub fn user_history(&self, user_id: UserId) -> Result<BorrowHistorySummary, LedgerError> {
        let now = self.clock.now();
        let mut records = self.user_records(user_id);
        sort_newest_first(&mut records);
        let details = self.enrich(records, now)?;
        Ok(BorrowHistorySummary::from_details(details))
    }

    /// True if `user_id` has ever borrowed `book_id`, whether or not it was returned.
    pub fn has_user_borrowed(&self, user_id: UserId, book_id: BookId) -> bool {
        self.log.has_borrowed(user_id, book_id)
    }

    /// Review authorization backed by this ledger's history.
    pub fn review_gate(&self) -> ReviewGate<'_> {
        ReviewGate::new(self)
    }

    /// Looks up a single record by ID.
    pub fn get_borrow(&self, borrow_id: BorrowId) -> Result<BorrowRecord, LedgerError> {
        self.log
            .book_of(borrow_id)
            .and_then(|book_id| self.shelves.get(&book_id))
            .and_then(|shelf| shelf.record(borrow_id))
            .ok_or(LedgerError::BorrowNotFound(borrow_id))
    }

    /// One page of a user's borrows, newest first, optionally filtered by status.
    pub fn list_user_borrows(
        &self,
        user_id: UserId,
        query: &BorrowQuery,
    ) -> Result<Vec<BorrowDetails>, LedgerError> {
        let limit = self.page_limit(query.limit)?;
        let records = self
            .user_records(user_id)
            .into_iter()
            .filter(|record| query.matches(record))
            .collect();
        self.page_newest_first(records, query.skip, limit)
    }

    /// One page of all borrows across users, newest first, optionally filtered by status.
    pub fn list_all_borrows(&self, query: &BorrowQuery) -> Result<Vec<BorrowDetails>, LedgerError> {
        let limit = self.page_limit(query.limit)?;
        let records = self
            .shelves
            .iter()
            .flat_map(|shelf| shelf.records())
            .filter(|record| query.matches(record))
            .collect();
        self.page_newest_first(records, query.skip, limit)
    }

    /// One page of active borrows past their due date, earliest due first.
    ///
    /// `limit` follows the same rules as [`BorrowQuery::limit`].
    pub fn overdue_borrows(
        &self,
        skip: usize,
        limit: Option<usize>,
    ) -> Result<Vec<BorrowDetails>, LedgerError> {
        let limit = self.page_limit(limit)?;
        let now = self.clock.now();
        let mut overdue: Vec<BorrowRecord> = self
            .shelves
            .iter()
            .filter_map(|shelf| shelf.active_borrow())
            .filter(|record| record.is_overdue(now))
            .collect();
        overdue.sort_by(|a, b| a.due_date.cmp(&b.due_date).then_with(|| a.id.cmp(&b.id)));
        let page = overdue.into_iter().skip(skip).take(limit).collect();
        self.enrich(page, now)
    }

    /// Retrieves the shelf of a book that has been lent at least once.
    pub fn shelf(&self, book_id: BookId) -> Option<dashmap::mapref::one::Ref<'_, BookId, Shelf>> {
        self.shelves.get(&book_id)
    }

    /// Users with at least one borrow, ordered by ID.
    pub fn users(&self) -> Vec<UserId> {
        self.log.users()
    }

    /// Total number of records ever created.
    pub fn borrow_count(&self) -> usize {
        self.log.len()
    }

    fn loan_period(&self, days: i64) -> Result<Duration, LedgerError> {
        let above_max = self.config.max_loan_period_days.is_some_and(|max| days > max);
        if days <= 0 || above_max {
            return Err(LedgerError::InvalidLoanPeriod(days));
        }
        Duration::try_days(days).ok_or(LedgerError::InvalidLoanPeriod(days))
    }

    /// Resolves a requested page size against the configured maximum.
    fn page_limit(&self, requested: Option<usize>) -> Result<usize, LedgerError> {
        let max = self.config.max_page_limit;
        match requested {
            None => Ok(LedgerConfig::DEFAULT_PAGE_LIMIT.min(max)),
            Some(limit) if limit == 0 || limit > max => Err(LedgerError::InvalidPageLimit(limit)),
            Some(limit) => Ok(limit),
        }
    }

    fn ensure_book_exists(&self, book_id: BookId) -> Result<(), LedgerError> {
        match self.catalog.book_exists(book_id) {
            Ok(true) => Ok(()),
            Ok(false) => Err(LedgerError::BookNotFound(book_id)),
            Err(err) => {
                tracing::warn!(%book_id, error = %err, "catalog lookup failed");
                Err(err.into())
            }
        }
    }

    /// Snapshot of a user's records in creation order.
    fn user_records(&self, user_id: UserId) -> Vec<BorrowRecord> {
        self.log
            .entries_for(user_id)
            .into_iter()
            .filter_map(|(borrow_id, book_id)| {
                self.shelves.get(&book_id).and_then(|shelf| shelf.record(borrow_id))
            })
            .collect()
    }

    fn page_newest_first(
        &self,
        mut records: Vec<BorrowRecord>,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<BorrowDetails>, LedgerError> {
        sort_newest_first(&mut records);
        let page = records.into_iter().skip(skip).take(limit).collect();
        self.enrich(page, self.clock.now())
    }

    /// Joins records with catalog metadata, asking the catalog once per book.
    fn enrich(
        &self,
        records: Vec<BorrowRecord>,
        now: DateTime<Utc>,
    ) -> Result<Vec<BorrowDetails>, LedgerError> {
        let mut summaries: HashMap<BookId, Option<BookSummary>> = HashMap::new();
        let mut details = Vec::with_capacity(records.len());

        for record in records {
            let summary = match summaries.entry(record.book_id) {
                Entry::Occupied(entry) => entry.get().clone(),
                Entry::Vacant(entry) => {
                    let summary = self.catalog.book_summary(record.book_id).inspect_err(|err| {
                        tracing::warn!(book_id = %record.book_id, error = %err, "catalog lookup failed");
                    })?;
                    entry.insert(summary).clone()
                }
            };
            details.push(BorrowDetails::new(record, summary, now));
        }

        Ok(details)
    }
}
