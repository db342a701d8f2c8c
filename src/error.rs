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

//! Error types for ledger operations.

use crate::base::{BookId, BorrowId};
use thiserror::Error;

/// Coarse classification of a [`LedgerError`].
///
/// Callers at the boundary (HTTP, CLI) translate on the kind rather than the
/// concrete variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    InvalidArgument,
    Conflict,
    Forbidden,
    Unavailable,
}

/// Ledger operation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Book does not exist in the catalog
    #[error("book {0} not found")]
    BookNotFound(BookId),

    /// No active borrow exists for the user and book
    #[error("no active borrow")]
    NoActiveBorrow,

    /// Borrow record ID is unknown
    #[error("borrow record {0} not found")]
    BorrowNotFound(BorrowId),

    /// Loan period is zero, negative, or above the configured maximum
    #[error("invalid loan period: {0} days")]
    InvalidLoanPeriod(i64),

    /// Page size outside the accepted range
    #[error("invalid page limit: {0}")]
    InvalidPageLimit(usize),

    /// Book has an active borrow by another user
    #[error("book already borrowed")]
    BookAlreadyBorrowed,

    /// User already holds the active borrow for this book
    #[error("user already holds an active borrow for this book")]
    AlreadyBorrowedByUser,

    /// Duplicate borrow ID
    #[error("duplicate borrow ID {0}")]
    DuplicateBorrow(BorrowId),

    /// Review attempted without any borrow of the book
    #[error("you must borrow this book before reviewing it")]
    ReviewNotAllowed,

    /// Catalog collaborator failed
    #[error("catalog unavailable: {0}")]
    CatalogUnavailable(String),
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::BookNotFound(_) | Self::NoActiveBorrow | Self::BorrowNotFound(_) => {
                ErrorKind::NotFound
            }
            Self::InvalidLoanPeriod(_) | Self::InvalidPageLimit(_) => ErrorKind::InvalidArgument,
            Self::BookAlreadyBorrowed | Self::AlreadyBorrowedByUser | Self::DuplicateBorrow(_) => {
                ErrorKind::Conflict
            }
            Self::ReviewNotAllowed => ErrorKind::Forbidden,
            Self::CatalogUnavailable(_) => ErrorKind::Unavailable,
        }
    }
}

/// Failure reported by a catalog collaborator.
///
/// Distinct from a book being absent: a lookup that cannot be answered must
/// never be read as "book doesn't exist".
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("{0}")]
    Unavailable(String),
}

impl From<CatalogError> for LedgerError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::Unavailable(reason) => LedgerError::CatalogUnavailable(reason),
        }
    }
}

/// Configuration loading errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
