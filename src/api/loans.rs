//! Borrow and return endpoints

use axum::{
    extract::{Path, State},
    Json,
};

use crate::{
    error::AppResult,
    models::{book::Book, borrower::HeldBooks},
    AppState,
};

use super::AuthenticatedUser;

/// Borrow a book
#[utoipa::path(
    post,
    path = "/books/{id}/borrow",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Book borrowed", body = Book),
        (status = 403, description = "Only regular users can borrow"),
        (status = 404, description = "Book not found"),
        (status = 409, description = "Book is not available"),
        (status = 422, description = "Borrowing limit reached")
    )
)]
pub async fn borrow_book(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Book>> {
    claims.require_regular()?;

    let book = state.services.loans.borrow(claims.user_id, id).await?;
    Ok(Json(book))
}

/// Return a borrowed book
#[utoipa::path(
    post,
    path = "/books/{id}/return",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Book returned", body = Book),
        (status = 404, description = "Book not found"),
        (status = 409, description = "Book is not held by the caller")
    )
)]
pub async fn return_book(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Book>> {
    claims.require_regular()?;

    let book = state.services.loans.return_book(claims.user_id, id).await?;
    Ok(Json(book))
}

/// Books held by the caller
#[utoipa::path(
    get,
    path = "/borrowers/me/books",
    tag = "loans",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Held books", body = HeldBooks),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn my_books(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<HeldBooks>> {
    let held = state.services.loans.held_books(claims.user_id).await?;
    Ok(Json(held))
}
