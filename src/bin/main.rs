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

use chrono::{DateTime, Utc};
use clap::{Parser, ValueEnum};
use csv::{ReaderBuilder, Trim, Writer};
use library_ledger::{
    Book, BookId, InMemoryCatalog, Ledger, LedgerConfig, LedgerError, ManualClock, UserId,
};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Library Ledger - Replay borrow events and report lending state
///
/// Reads borrow/return events from a CSV file, applies them to a ledger
/// over the given catalog, and writes a report to stdout.
#[derive(Parser, Debug)]
#[command(name = "library-ledger")]
#[command(about = "Replays library borrow events and reports availability or user history", long_about = None)]
struct Args {
    /// Path to CSV file with borrow events
    ///
    /// Expected format: type,user,book,days,at
    /// Example: cargo run -- events.csv --catalog books.csv > availability.csv
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Path to CSV file with catalog books (id,title,author)
    #[arg(long, value_name = "FILE")]
    catalog: PathBuf,

    /// Optional TOML file with ledger settings
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Report to write after replaying
    #[arg(long, value_enum, default_value_t = Report::Availability)]
    report: Report,

    /// Point in time the report is evaluated at (RFC 3339), defaults to now
    #[arg(long, value_name = "TIMESTAMP")]
    as_of: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Report {
    /// One row per catalog book: book,available,active,total
    Availability,
    /// One row per borrowing user: user,total,active,returned,overdue
    Users,
}

fn main() {
    // Logs go to stderr so the CSV report on stdout stays clean
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => match LedgerConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "failed to load config");
                process::exit(1);
            }
        },
        None => LedgerConfig::default(),
    };

    let catalog = match open(&args.catalog).and_then(|file| load_catalog(BufReader::new(file))) {
        Ok(catalog) => Arc::new(catalog),
        Err(e) => {
            tracing::error!(path = %args.catalog.display(), error = %e, "failed to load catalog");
            process::exit(1);
        }
    };
    tracing::info!(books = catalog.len(), "catalog loaded");

    let clock = Arc::new(ManualClock::new(Utc::now()));
    let ledger = Ledger::new(catalog.clone())
        .with_clock(clock.clone())
        .with_config(config);

    let applied = match open(&args.input).and_then(|file| {
        replay_events(BufReader::new(file), &ledger, &clock)
    }) {
        Ok(applied) => applied,
        Err(e) => {
            tracing::error!(path = %args.input.display(), error = %e, "failed to replay events");
            process::exit(1);
        }
    };
    tracing::info!(applied, "events replayed");

    clock.set(args.as_of.unwrap_or_else(Utc::now));

    let result = match args.report {
        Report::Availability => write_availability(&ledger, &catalog, std::io::stdout()),
        Report::Users => write_user_summaries(&ledger, std::io::stdout()),
    };
    if let Err(e) = result {
        tracing::error!(error = %e, "failed to write report");
        process::exit(1);
    }
}

fn open(path: &Path) -> Result<File, csv::Error> {
    File::open(path).map_err(csv::Error::from)
}

/// Raw CSV record matching the event format.
///
/// Fields: `type, user, book, days, at`
#[derive(Debug, Deserialize)]
struct EventRecord {
    #[serde(rename = "type")]
    event_type: String,
    user: u32,
    book: u32,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    days: Option<i64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    at: Option<DateTime<Utc>>,
}

/// A borrow event ready to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Event {
    Borrow {
        user_id: UserId,
        book_id: BookId,
        days: Option<i64>,
    },
    Return {
        user_id: UserId,
        book_id: BookId,
    },
}

impl EventRecord {
    /// Converts the CSV record to an event.
    ///
    /// Returns `None` for unknown event types.
    fn into_event(self) -> Option<Event> {
        let user_id = UserId(self.user);
        let book_id = BookId(self.book);

        match self.event_type.to_lowercase().as_str() {
            "borrow" => Some(Event::Borrow {
                user_id,
                book_id,
                days: self.days,
            }),
            "return" => Some(Event::Return { user_id, book_id }),
            _ => None,
        }
    }
}

impl Event {
    fn apply(self, ledger: &Ledger) -> Result<(), LedgerError> {
        match self {
            Event::Borrow {
                user_id,
                book_id,
                days: Some(days),
            } => ledger.borrow(user_id, book_id, days).map(|_| ()),
            Event::Borrow {
                user_id,
                book_id,
                days: None,
            } => ledger.borrow_default(user_id, book_id).map(|_| ()),
            Event::Return { user_id, book_id } => ledger.return_book(user_id, book_id).map(|_| ()),
        }
    }
}

/// Load catalog books from a CSV reader.
///
/// Expected columns: `id, title, author` with optional `genre, year_published`.
/// Rows that fail to parse are skipped.
pub fn load_catalog<R: Read>(reader: R) -> Result<InMemoryCatalog, csv::Error> {
    let catalog = InMemoryCatalog::new();

    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .has_headers(true)
        .from_reader(reader);

    for result in rdr.deserialize::<Book>() {
        match result {
            Ok(book) => {
                catalog.insert(book);
            }
            Err(e) => tracing::debug!(error = %e, "skipping malformed catalog row"),
        }
    }

    Ok(catalog)
}

/// Replay borrow events from a CSV reader.
///
/// Streams the input, so files of any size are handled without loading
/// them into memory. Malformed rows and rejected events are skipped.
///
/// # CSV Format
///
/// Expected columns: `type, user, book, days, at`
/// - `type`: Event type (borrow, return)
/// - `user`: User ID (u32)
/// - `book`: Book ID (u32)
/// - `days`: Loan period for borrows (optional, defaults to the configured period)
/// - `at`: RFC 3339 timestamp the event happened at (optional, keeps the previous time).
///   Rows stamped earlier than the last stamped row are skipped.
///
/// # Example
///
/// ```csv
/// type,user,book,days,at
/// borrow,1,7,14,2024-03-01T10:00:00Z
/// return,1,7,,2024-03-10T16:30:00Z
/// ```
///
/// # Errors
///
/// Returns a CSV error if the reader fails. Individual event errors are
/// logged at debug level and don't stop processing.
///
/// Returns the number of events applied.
pub fn replay_events<R: Read>(
    reader: R,
    ledger: &Ledger,
    clock: &ManualClock,
) -> Result<usize, csv::Error> {
    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All) // Handle whitespace in fields like " borrow "
        .flexible(true) // Allow missing days and timestamp fields
        .has_headers(true)
        .from_reader(reader);

    let mut applied = 0;
    let mut last_at: Option<DateTime<Utc>> = None;
    for result in rdr.deserialize::<EventRecord>() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                tracing::debug!(error = %e, "skipping malformed row");
                continue;
            }
        };

        if let Some(at) = record.at {
            if let Some(last) = last_at.filter(|last| at < *last) {
                tracing::debug!(%at, %last, "skipping event stamped before the previous one");
                continue;
            }
            last_at = Some(at);
            clock.set(at);
        }

        let Some(event) = record.into_event() else {
            tracing::debug!("skipping unknown event type");
            continue;
        };

        match event.apply(ledger) {
            Ok(()) => applied += 1,
            Err(e) => tracing::debug!(?event, error = %e, "skipping rejected event"),
        }
    }

    Ok(applied)
}

#[derive(Debug, Serialize)]
struct AvailabilityRow {
    book: BookId,
    available: bool,
    active: usize,
    total: usize,
}

#[derive(Debug, Serialize)]
struct UserRow {
    user: UserId,
    total: usize,
    active: usize,
    returned: usize,
    overdue: usize,
}

/// Write the availability of every catalog book as CSV.
///
/// # CSV Format
///
/// Columns: `book, available, active, total`
///
/// # Errors
///
/// Returns a CSV error if writing fails or the ledger cannot answer.
pub fn write_availability<W: Write>(
    ledger: &Ledger,
    catalog: &InMemoryCatalog,
    writer: W,
) -> Result<(), csv::Error> {
    let mut wtr = Writer::from_writer(writer);

    for book in catalog.list() {
        let summary = ledger.check_availability(book.id).map_err(report_error)?;
        wtr.serialize(AvailabilityRow {
            book: summary.book_id,
            available: summary.is_available,
            active: summary.active_borrows,
            total: summary.total_borrows,
        })?;
    }

    wtr.flush()?;
    Ok(())
}

/// Write history counts for every user with at least one borrow as CSV.
///
/// # CSV Format
///
/// Columns: `user, total, active, returned, overdue`
///
/// # Errors
///
/// Returns a CSV error if writing fails or the ledger cannot answer.
pub fn write_user_summaries<W: Write>(ledger: &Ledger, writer: W) -> Result<(), csv::Error> {
    let mut wtr = Writer::from_writer(writer);

    for user_id in ledger.users() {
        let history = ledger.user_history(user_id).map_err(report_error)?;
        wtr.serialize(UserRow {
            user: user_id,
            total: history.total_borrows,
            active: history.active_borrows,
            returned: history.returned_borrows,
            overdue: history.overdue_borrows,
        })?;
    }

    wtr.flush()?;
    Ok(())
}

fn report_error(err: LedgerError) -> csv::Error {
    csv::Error::from(std::io::Error::other(err))
}
