//! REST API server example for the borrow ledger.
//!
//! Run with: `cargo run --example server`
//!
//! Set `LEDGER_CONFIG` to a TOML file to override ledger settings.
//!
//! ## Endpoints
//!
//! - `POST /borrows/{book_id}/borrow` - Borrow a book
//! - `POST /borrows/{book_id}/return` - Return a borrowed book
//! - `GET /borrows/book/{book_id}/availability` - Availability of a book
//! - `GET /borrows/history` - Current user's borrow history with counts
//! - `GET /borrows` - Current user's borrows (`status`, `skip`, `limit`)
//! - `GET /borrows/all` - All borrows (admin)
//! - `GET /borrows/overdue` - Overdue borrows (admin)
//! - `GET /borrows/user/{user_id}/has-borrowed/{book_id}` - Whether a user ever borrowed a book
//! - `POST /reviews` - Submit a review (borrowers only)
//!
//! Identity comes from the `X-User-Id` header, with `X-User-Role: admin` for
//! administrators. A real deployment puts an authenticating proxy in front.
//!
//! ## Example Usage
//!
//! ```bash
//! # Borrow book 1 for a week
//! curl -X POST http://localhost:3000/borrows/1/borrow \
//!   -H "X-User-Id: 1" -H "Content-Type: application/json" \
//!   -d '{"loan_period_days": 7}'
//!
//! # Check availability
//! curl -H "X-User-Id: 1" http://localhost:3000/borrows/book/1/availability
//!
//! # Return it
//! curl -X POST -H "X-User-Id: 1" http://localhost:3000/borrows/1/return
//! ```

use axum::{
    Json, Router,
    extract::{FromRequestParts, Path, Query, State},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use library_ledger::{
    AvailabilitySummary, Book, BookId, BorrowDetails, BorrowHistorySummary, BorrowQuery,
    BorrowRecord, ErrorKind, InMemoryCatalog, Ledger, LedgerConfig, LedgerError, UserId,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

// === Request/Response DTOs ===

/// Request body for borrowing. A missing body or field uses the default loan period.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BorrowRequest {
    pub loan_period_days: Option<i64>,
}

/// Request body for submitting a review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewRequest {
    pub book_id: u32,
    pub rating: u8,
    pub review_text: String,
}

/// A stored review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub user_id: UserId,
    pub book_id: BookId,
    pub rating: u8,
    pub review_text: String,
}

/// Query string for paged overdue listings.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PageQuery {
    pub skip: usize,
    pub limit: Option<usize>,
}

/// Response body for errors.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

// === Application State ===

/// Shared application state containing the ledger and submitted reviews.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<Ledger>,
    pub reviews: Arc<DashMap<(UserId, BookId), Review>>,
}

impl AppState {
    pub fn new(ledger: Arc<Ledger>) -> Self {
        Self {
            ledger,
            reviews: Arc::new(DashMap::new()),
        }
    }
}

// === Authentication ===

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Member,
    Admin,
}

/// Identity supplied by the authentication layer in request headers.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser {
    pub id: UserId,
    pub role: Role,
}

impl CurrentUser {
    fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get("x-user-id")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u32>().ok())
            .map(UserId)
            .ok_or(AppError::Unauthenticated)?;

        let role = match parts.headers.get("x-user-role").map(|value| value.to_str()) {
            Some(Ok(role)) if role.eq_ignore_ascii_case("admin") => Role::Admin,
            _ => Role::Member,
        };

        Ok(Self { id, role })
    }
}

// === Error Handling ===

/// Errors returned by handlers, rendered as JSON.
#[derive(Debug)]
pub enum AppError {
    Ledger(LedgerError),
    Unauthenticated,
    AdminOnly,
    NotOwnHistory,
    InvalidRating,
    AlreadyReviewed,
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        AppError::Ledger(err)
    }
}

impl AppError {
    /// Status, machine-readable code, and a message safe to show users.
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Ledger(err) => {
                let status = match err.kind() {
                    ErrorKind::NotFound => StatusCode::NOT_FOUND,
                    ErrorKind::InvalidArgument => StatusCode::BAD_REQUEST,
                    ErrorKind::Conflict => StatusCode::CONFLICT,
                    ErrorKind::Forbidden => StatusCode::FORBIDDEN,
                    ErrorKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
                };
                let (code, message) = match err {
                    LedgerError::BookNotFound(_) => ("BOOK_NOT_FOUND", "book not found".into()),
                    LedgerError::NoActiveBorrow => (
                        "NO_ACTIVE_BORROW",
                        "you have no active borrow for this book".into(),
                    ),
                    LedgerError::BorrowNotFound(_) => ("BORROW_NOT_FOUND", err.to_string()),
                    LedgerError::InvalidLoanPeriod(_) => ("INVALID_LOAN_PERIOD", err.to_string()),
                    LedgerError::InvalidPageLimit(_) => ("INVALID_PAGE_LIMIT", err.to_string()),
                    LedgerError::BookAlreadyBorrowed => ("BOOK_ALREADY_BORROWED", err.to_string()),
                    LedgerError::AlreadyBorrowedByUser => {
                        ("ALREADY_BORROWED_BY_USER", err.to_string())
                    }
                    LedgerError::DuplicateBorrow(_) => ("DUPLICATE_BORROW", err.to_string()),
                    LedgerError::ReviewNotAllowed => ("REVIEW_NOT_ALLOWED", err.to_string()),
                    LedgerError::CatalogUnavailable(_) => (
                        "CATALOG_UNAVAILABLE",
                        "catalog temporarily unavailable, try again".into(),
                    ),
                };
                (status, code, message)
            }
            AppError::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHENTICATED",
                "missing or invalid X-User-Id header".into(),
            ),
            AppError::AdminOnly => (
                StatusCode::FORBIDDEN,
                "ADMIN_ONLY",
                "administrator access required".into(),
            ),
            AppError::NotOwnHistory => (
                StatusCode::FORBIDDEN,
                "NOT_OWN_HISTORY",
                "not authorized to check this user's borrow history".into(),
            ),
            AppError::InvalidRating => (
                StatusCode::BAD_REQUEST,
                "INVALID_RATING",
                "rating must be between 1 and 5".into(),
            ),
            AppError::AlreadyReviewed => (
                StatusCode::CONFLICT,
                "ALREADY_REVIEWED",
                "you have already reviewed this book".into(),
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, error) = self.parts();
        if status.is_server_error() {
            tracing::warn!(?self, "request failed");
        }
        (
            status,
            Json(ErrorResponse {
                error,
                code: code.to_string(),
            }),
        )
            .into_response()
    }
}

// === Handlers ===

/// POST /borrows/{book_id}/borrow - Borrow a book.
async fn borrow_book(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(book_id): Path<u32>,
    body: Option<Json<BorrowRequest>>,
) -> Result<(StatusCode, Json<BorrowRecord>), AppError> {
    let book_id = BookId(book_id);
    let Json(request) = body.unwrap_or_default();
    let record = match request.loan_period_days {
        Some(days) => state.ledger.borrow(user.id, book_id, days)?,
        None => state.ledger.borrow_default(user.id, book_id)?,
    };
    Ok((StatusCode::CREATED, Json(record)))
}

/// POST /borrows/{book_id}/return - Return a borrowed book.
async fn return_book(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(book_id): Path<u32>,
) -> Result<Json<BorrowRecord>, AppError> {
    let record = state.ledger.return_book(user.id, BookId(book_id))?;
    Ok(Json(record))
}

/// GET /borrows/book/{book_id}/availability - Availability of a book.
async fn check_availability(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(book_id): Path<u32>,
) -> Result<Json<AvailabilitySummary>, AppError> {
    Ok(Json(state.ledger.check_availability(BookId(book_id))?))
}

/// GET /borrows/history - Current user's history with counts.
async fn borrow_history(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<BorrowHistorySummary>, AppError> {
    Ok(Json(state.ledger.user_history(user.id)?))
}

/// GET /borrows - Current user's borrows, filtered and paged.
async fn my_borrows(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<BorrowQuery>,
) -> Result<Json<Vec<BorrowDetails>>, AppError> {
    Ok(Json(state.ledger.list_user_borrows(user.id, &query)?))
}

/// GET /borrows/all - Every borrow (admin only).
async fn all_borrows(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<BorrowQuery>,
) -> Result<Json<Vec<BorrowDetails>>, AppError> {
    if !user.is_admin() {
        return Err(AppError::AdminOnly);
    }
    Ok(Json(state.ledger.list_all_borrows(&query)?))
}

/// GET /borrows/overdue - Overdue borrows, earliest due first (admin only).
async fn overdue_borrows(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(page): Query<PageQuery>,
) -> Result<Json<Vec<BorrowDetails>>, AppError> {
    if !user.is_admin() {
        return Err(AppError::AdminOnly);
    }
    Ok(Json(state.ledger.overdue_borrows(page.skip, page.limit)?))
}

/// GET /borrows/user/{user_id}/has-borrowed/{book_id} - Whether a user ever borrowed a book.
///
/// Users may ask about themselves; admins may ask about anyone.
async fn has_borrowed(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((user_id, book_id)): Path<(u32, u32)>,
) -> Result<Json<bool>, AppError> {
    let user_id = UserId(user_id);
    if user.id != user_id && !user.is_admin() {
        return Err(AppError::NotOwnHistory);
    }
    Ok(Json(state.ledger.has_user_borrowed(user_id, BookId(book_id))))
}

/// POST /reviews - Submit a review of a borrowed book.
async fn create_review(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<ReviewRequest>,
) -> Result<(StatusCode, Json<Review>), AppError> {
    if !(1..=5).contains(&request.rating) {
        return Err(AppError::InvalidRating);
    }
    let book_id = BookId(request.book_id);
    state.ledger.review_gate().authorize(user.id, book_id)?;

    match state.reviews.entry((user.id, book_id)) {
        Entry::Occupied(_) => Err(AppError::AlreadyReviewed),
        Entry::Vacant(entry) => {
            let review = Review {
                user_id: user.id,
                book_id,
                rating: request.rating,
                review_text: request.review_text,
            };
            entry.insert(review.clone());
            tracing::info!(user_id = %user.id, %book_id, rating = review.rating, "review created");
            Ok((StatusCode::CREATED, Json(review)))
        }
    }
}

// === Router ===

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/borrows", get(my_borrows))
        .route("/borrows/all", get(all_borrows))
        .route("/borrows/overdue", get(overdue_borrows))
        .route("/borrows/history", get(borrow_history))
        .route("/borrows/{book_id}/borrow", post(borrow_book))
        .route("/borrows/{book_id}/return", post(return_book))
        .route("/borrows/book/{book_id}/availability", get(check_availability))
        .route(
            "/borrows/user/{user_id}/has-borrowed/{book_id}",
            get(has_borrowed),
        )
        .route("/reviews", post(create_review))
        .with_state(state)
}

/// A small catalog so the server is usable out of the box.
pub fn demo_catalog() -> InMemoryCatalog {
    [
        Book::new(BookId(1), "The Left Hand of Darkness", "Ursula K. Le Guin"),
        Book::new(BookId(2), "Solaris", "Stanislaw Lem"),
        Book::new(BookId(3), "Roadside Picnic", "Arkady and Boris Strugatsky"),
        Book::new(BookId(7), "The Dispossessed", "Ursula K. Le Guin"),
        Book::new(BookId(9), "Hyperion", "Dan Simmons"),
    ]
    .into_iter()
    .collect()
}

// === Main ===

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match std::env::var("LEDGER_CONFIG") {
        Ok(path) => LedgerConfig::load(path)?,
        Err(_) => LedgerConfig::default(),
    };

    let ledger = Ledger::new(Arc::new(demo_catalog())).with_config(config);
    let app = create_router(AppState::new(Arc::new(ledger)));

    let listener = TcpListener::bind("127.0.0.1:3000").await?;
    tracing::info!("Library ledger API running on http://127.0.0.1:3000");

    axum::serve(listener, app).await?;
    Ok(())
}
