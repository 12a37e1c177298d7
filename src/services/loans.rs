//! Lending engine: borrow and return transitions

use std::sync::Arc;

use crate::{
    clock::Clock,
    config::LendingConfig,
    error::{AppError, AppResult},
    models::{
        book::{Book, LoanState},
        borrower::HeldBooks,
    },
    repository::LendingStore,
};

use super::redis::BookCache;

/// Moves books between `Available` and `Borrowed(holder)`.
///
/// Each transition runs in one store transaction that locks the book row
/// and then the borrower row. Any error before commit rolls it back.
#[derive(Clone)]
pub struct LoansService {
    store: Arc<dyn LendingStore>,
    clock: Arc<dyn Clock>,
    cache: BookCache,
    max_borrowed_books: usize,
}

impl LoansService {
    pub fn new(
        store: Arc<dyn LendingStore>,
        clock: Arc<dyn Clock>,
        cache: BookCache,
        config: &LendingConfig,
    ) -> Self {
        Self {
            store,
            clock,
            cache,
            max_borrowed_books: config.max_borrowed_books,
        }
    }

    pub fn max_borrowed_books(&self) -> usize {
        self.max_borrowed_books
    }

    /// Lend a book to a user
    pub async fn borrow(&self, user_id: i32, book_id: i32) -> AppResult<Book> {
        let mut tx = self.store.begin().await?;

        let mut book = tx
            .lock_book(book_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", book_id)))?;

        if book.state() == LoanState::Borrowed {
            tracing::debug!(user_id, book_id, "Borrow rejected: book not available");
            return Err(AppError::Conflict("Book is not available".to_string()));
        }

        let borrower = tx
            .lock_borrower(user_id, true)
            .await?
            .ok_or_else(|| AppError::Internal(format!("No borrower record for user {}", user_id)))?;

        let held = tx.held_books(borrower.id).await?;
        if held.len() >= self.max_borrowed_books {
            tracing::debug!(user_id, book_id, held = held.len(), "Borrow rejected: limit reached");
            return Err(AppError::LimitExceeded(format!(
                "You cannot borrow more than {} books",
                self.max_borrowed_books
            )));
        }

        let now = self.clock.now();
        tx.attach(borrower.id, book_id, now).await?;
        tx.commit().await?;

        book.available = false;
        book.last_borrowed_date = Some(now);

        self.cache.invalidate().await;
        tracing::info!(user_id, book_id, "Book borrowed");
        Ok(book)
    }

    /// Take back a book the user holds
    pub async fn return_book(&self, user_id: i32, book_id: i32) -> AppResult<Book> {
        let mut tx = self.store.begin().await?;

        let mut book = tx
            .lock_book(book_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", book_id)))?;

        let Some(borrower) = tx.lock_borrower(user_id, false).await? else {
            tracing::debug!(user_id, book_id, "Return rejected: user never borrowed");
            return Err(AppError::InvalidState("You have not borrowed this book".to_string()));
        };

        let held = tx.held_books(borrower.id).await?;
        if !held.contains(&book_id) {
            tracing::debug!(user_id, book_id, "Return rejected: book not held by user");
            return Err(AppError::InvalidState("You have not borrowed this book".to_string()));
        }

        tx.detach(borrower.id, book_id).await?;
        tx.commit().await?;

        book.available = true;

        self.cache.invalidate().await;
        tracing::info!(user_id, book_id, "Book returned");
        Ok(book)
    }

    /// Books the user currently holds
    pub async fn held_books(&self, user_id: i32) -> AppResult<HeldBooks> {
        let books = self.store.books_held_by(user_id).await?;
        Ok(HeldBooks {
            user_id,
            remaining: self.max_borrowed_books.saturating_sub(books.len()),
            books,
        })
    }
}
