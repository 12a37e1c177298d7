//! Transactional store for the borrow and return transitions

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Transaction};

use crate::{
    error::AppResult,
    models::{book::Book, borrower::Borrower},
};

/// Source of lending transactions
#[async_trait]
pub trait LendingStore: Send + Sync {
    /// Start a transaction. Dropping it without [`LendingTx::commit`] rolls back.
    async fn begin(&self) -> AppResult<Box<dyn LendingTx>>;

    /// Books currently held by a user, outside any transaction
    async fn books_held_by(&self, user_id: i32) -> AppResult<Vec<Book>>;
}

/// One lending transaction.
///
/// Rows are locked in a fixed order: the book first, then the borrower.
#[async_trait]
pub trait LendingTx: Send {
    /// Lock and load a book
    async fn lock_book(&mut self, book_id: i32) -> AppResult<Option<Book>>;

    /// Lock and load the user's borrower row, materializing it first when
    /// `create` is set
    async fn lock_borrower(&mut self, user_id: i32, create: bool) -> AppResult<Option<Borrower>>;

    /// Ids of the books in the borrower's held set
    async fn held_books(&mut self, borrower_id: i32) -> AppResult<Vec<i32>>;

    /// Add the book to the held set and mark it borrowed at `at`
    async fn attach(&mut self, borrower_id: i32, book_id: i32, at: DateTime<Utc>) -> AppResult<()>;

    /// Remove the book from the held set and mark it available
    async fn detach(&mut self, borrower_id: i32, book_id: i32) -> AppResult<()>;

    async fn commit(self: Box<Self>) -> AppResult<()>;
}

#[derive(Clone)]
pub struct LendingRepository {
    pool: Pool<Postgres>,
}

impl LendingRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LendingStore for LendingRepository {
    async fn begin(&self) -> AppResult<Box<dyn LendingTx>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgLendingTx { tx }))
    }

    async fn books_held_by(&self, user_id: i32) -> AppResult<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>(
            r#"
            SELECT b.id, b.title, b.isbn, b.author_id, b.published_date,
                   b.available, b.last_borrowed_date
            FROM books b
            JOIN borrowed_books bb ON bb.book_id = b.id
            JOIN borrowers br ON br.id = bb.borrower_id
            WHERE br.user_id = $1
            ORDER BY bb.borrowed_at, b.id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(books)
    }
}

struct PgLendingTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl LendingTx for PgLendingTx {
    async fn lock_book(&mut self, book_id: i32) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>(
            r#"
            SELECT id, title, isbn, author_id, published_date, available, last_borrowed_date
            FROM books
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(book_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(book)
    }

    async fn lock_borrower(&mut self, user_id: i32, create: bool) -> AppResult<Option<Borrower>> {
        if create {
            sqlx::query("INSERT INTO borrowers (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
                .bind(user_id)
                .execute(&mut *self.tx)
                .await?;
        }

        let borrower = sqlx::query_as::<_, Borrower>(
            "SELECT id, user_id FROM borrowers WHERE user_id = $1 FOR UPDATE",
        )
        .bind(user_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(borrower)
    }

    async fn held_books(&mut self, borrower_id: i32) -> AppResult<Vec<i32>> {
        let ids = sqlx::query_scalar::<_, i32>(
            "SELECT book_id FROM borrowed_books WHERE borrower_id = $1",
        )
        .bind(borrower_id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(ids)
    }

    async fn attach(&mut self, borrower_id: i32, book_id: i32, at: DateTime<Utc>) -> AppResult<()> {
        sqlx::query("INSERT INTO borrowed_books (borrower_id, book_id, borrowed_at) VALUES ($1, $2, $3)")
            .bind(borrower_id)
            .bind(book_id)
            .bind(at)
            .execute(&mut *self.tx)
            .await?;

        sqlx::query("UPDATE books SET available = FALSE, last_borrowed_date = $2 WHERE id = $1")
            .bind(book_id)
            .bind(at)
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn detach(&mut self, borrower_id: i32, book_id: i32) -> AppResult<()> {
        sqlx::query("DELETE FROM borrowed_books WHERE borrower_id = $1 AND book_id = $2")
            .bind(borrower_id)
            .bind(book_id)
            .execute(&mut *self.tx)
            .await?;

        sqlx::query("UPDATE books SET available = TRUE WHERE id = $1")
            .bind(book_id)
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
