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

//! Benchmarks for the borrow ledger.
//!
//! Run with: cargo bench
//!
//! Benchmarks include:
//! - Single-threaded borrow/return cycles
//! - History and listing queries over a populated ledger
//! - Parallel borrows across books and contention on a single book
//! - Scaling with thread count

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use library_ledger::{Book, BookId, BorrowQuery, InMemoryCatalog, Ledger, UserId};
use rayon::prelude::*;
use std::sync::Arc;

// =============================================================================
// Helper Functions
// =============================================================================

fn ledger_with_books(count: u32) -> Ledger {
    let catalog: InMemoryCatalog = (1..=count)
        .map(|id| Book::new(BookId(id), format!("Title {id}"), format!("Author {id}")))
        .collect();
    Ledger::new(Arc::new(catalog))
}

/// A ledger where each of `users` has borrowed and returned `per_user` books.
fn populated_ledger(users: u32, per_user: u32) -> Ledger {
    let ledger = ledger_with_books(per_user);
    for user in 1..=users {
        for book in 1..=per_user {
            ledger.borrow(UserId(user), BookId(book), 14).unwrap();
            ledger.return_book(UserId(user), BookId(book)).unwrap();
        }
    }
    ledger
}

// =============================================================================
// Single-Threaded Benchmarks
// =============================================================================

fn bench_borrow_return_cycle(c: &mut Criterion) {
    c.bench_function("borrow_return_cycle", |b| {
        let ledger = ledger_with_books(1);
        b.iter(|| {
            ledger.borrow(UserId(1), black_box(BookId(1)), 14).unwrap();
            ledger.return_book(UserId(1), black_box(BookId(1))).unwrap();
        })
    });
}

fn bench_rejected_borrow(c: &mut Criterion) {
    c.bench_function("rejected_borrow", |b| {
        let ledger = ledger_with_books(1);
        ledger.borrow(UserId(1), BookId(1), 14).unwrap();
        b.iter(|| {
            let result = ledger.borrow(UserId(2), black_box(BookId(1)), 14);
            assert!(result.is_err());
        })
    });
}

fn bench_borrow_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("borrow_throughput");

    for count in [100u32, 1_000, 10_000].iter() {
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            b.iter(|| {
                let ledger = ledger_with_books(count);
                for book in 1..=count {
                    ledger.borrow(UserId(book % 50 + 1), BookId(book), 14).unwrap();
                }
                black_box(&ledger);
            })
        });
    }
    group.finish();
}

// =============================================================================
// Query Benchmarks
// =============================================================================

fn bench_user_history(c: &mut Criterion) {
    let mut group = c.benchmark_group("user_history");

    for per_user in [10u32, 100, 1_000].iter() {
        let ledger = populated_ledger(10, *per_user);
        group.throughput(Throughput::Elements(*per_user as u64));
        group.bench_with_input(BenchmarkId::from_parameter(per_user), per_user, |b, _| {
            b.iter(|| black_box(ledger.user_history(UserId(5)).unwrap()))
        });
    }
    group.finish();
}

fn bench_listings(c: &mut Criterion) {
    let mut group = c.benchmark_group("listings");
    let ledger = populated_ledger(50, 200);

    group.bench_function("list_all_first_page", |b| {
        b.iter(|| black_box(ledger.list_all_borrows(&BorrowQuery::default()).unwrap()))
    });
    group.bench_function("availability", |b| {
        b.iter(|| black_box(ledger.check_availability(BookId(100)).unwrap()))
    });
    group.bench_function("has_user_borrowed", |b| {
        b.iter(|| black_box(ledger.has_user_borrowed(UserId(25), BookId(150))))
    });
    group.finish();
}

// =============================================================================
// Multi-Threaded Benchmarks
// =============================================================================

fn bench_parallel_borrows_different_books(c: &mut Criterion) {
    let mut group = c.benchmark_group("parallel_borrows_different_books");
    let num_books = 10_000u32;

    group.throughput(Throughput::Elements(num_books as u64));
    group.bench_function("10000_books", |b| {
        b.iter(|| {
            let ledger = ledger_with_books(num_books);
            (1..=num_books).into_par_iter().for_each(|book| {
                ledger.borrow(UserId(book % 100 + 1), BookId(book), 14).unwrap();
            });
            black_box(&ledger);
        })
    });
    group.finish();
}

fn bench_contention(c: &mut Criterion) {
    let mut group = c.benchmark_group("contention");
    let total_ops = 10_000u32;

    // Fewer books = more threads competing for the same shelf lock
    for num_books in [1u32, 10, 100, 1_000].iter() {
        group.throughput(Throughput::Elements(total_ops as u64));
        group.bench_with_input(
            BenchmarkId::new("books", num_books),
            num_books,
            |b, &num_books| {
                b.iter(|| {
                    let ledger = ledger_with_books(num_books);

                    (0..total_ops).into_par_iter().for_each(|i| {
                        let user = UserId(i % 64 + 1);
                        let book = BookId(i % num_books + 1);
                        if ledger.borrow(user, book, 14).is_ok() {
                            let _ = ledger.return_book(user, book);
                        }
                    });

                    black_box(&ledger);
                })
            },
        );
    }
    group.finish();
}

// =============================================================================
// Scaling Benchmarks
// =============================================================================

fn bench_thread_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("thread_scaling");
    let total_ops = 50_000u32;
    let num_books = 1_000u32;

    for num_threads in [1, 2, 4, 8].iter() {
        group.throughput(Throughput::Elements(total_ops as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(num_threads),
            num_threads,
            |b, &num_threads| {
                // Configure rayon thread pool for this benchmark
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(num_threads)
                    .build()
                    .unwrap();

                b.iter(|| {
                    let ledger = ledger_with_books(num_books);

                    pool.install(|| {
                        (0..total_ops).into_par_iter().for_each(|i| {
                            let user = UserId(i % 500 + 1);
                            let book = BookId(i % num_books + 1);
                            if ledger.borrow(user, book, 14).is_ok() {
                                let _ = ledger.return_book(user, book);
                            }
                        });
                    });

                    black_box(&ledger);
                })
            },
        );
    }
    group.finish();
}

// =============================================================================
// Criterion Groups
// =============================================================================

criterion_group!(
    single_threaded,
    bench_borrow_return_cycle,
    bench_rejected_borrow,
    bench_borrow_throughput,
);

criterion_group!(queries, bench_user_history, bench_listings,);

criterion_group!(
    multi_threaded,
    bench_parallel_borrows_different_books,
    bench_contention,
);

criterion_group!(scaling, bench_thread_scaling,);

criterion_main!(single_threaded, queries, multi_threaded, scaling);
