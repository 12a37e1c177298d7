//! Borrower aggregate: a user's set of currently held books

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::book::Book;

/// Borrower row, created lazily on a user's first borrow
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Borrower {
    pub id: i32,
    pub user_id: i32,
}

/// Books currently held by a user
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HeldBooks {
    pub user_id: i32,
    pub books: Vec<Book>,
    /// Remaining borrows before the limit is reached
    pub remaining: usize,
}
