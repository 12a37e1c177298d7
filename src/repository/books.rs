//! Books repository for database operations

use sqlx::{Pool, Postgres, QueryBuilder};

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookDetails, BookQuery, CreateBook, UpdateBook},
};

const DETAILS_SELECT: &str = r#"
    SELECT b.id, b.title, b.isbn, b.author_id, a.name AS author_name,
           b.published_date, b.available, b.last_borrowed_date
    FROM books b
    JOIN authors a ON a.id = b.author_id
"#;

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// All books with their author's name
    pub async fn list(&self) -> AppResult<Vec<BookDetails>> {
        let books = sqlx::query_as::<_, BookDetails>(&format!("{} ORDER BY b.id", DETAILS_SELECT))
            .fetch_all(&self.pool)
            .await?;
        Ok(books)
    }

    /// Get book by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<BookDetails> {
        sqlx::query_as::<_, BookDetails>(&format!("{} WHERE b.id = $1", DETAILS_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    /// Search by title and author name substrings and availability
    pub async fn search(&self, query: &BookQuery) -> AppResult<Vec<BookDetails>> {
        let mut qb = QueryBuilder::<Postgres>::new(DETAILS_SELECT);
        qb.push(" WHERE TRUE");

        if let Some(title) = query.title.as_deref().filter(|s| !s.is_empty()) {
            qb.push(" AND b.title ILIKE ").push_bind(format!("%{}%", title));
        }
        if let Some(author) = query.author_name.as_deref().filter(|s| !s.is_empty()) {
            qb.push(" AND a.name ILIKE ").push_bind(format!("%{}%", author));
        }
        if let Some(available) = query.available {
            qb.push(" AND b.available = ").push_bind(available);
        }
        qb.push(" ORDER BY b.id");

        let books = qb.build_query_as::<BookDetails>().fetch_all(&self.pool).await?;
        Ok(books)
    }

    /// Check if an ISBN is taken, optionally ignoring one book
    pub async fn isbn_exists(&self, isbn: &str, exclude_id: Option<i32>) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM books WHERE isbn = $1 AND ($2::INT IS NULL OR id <> $2))",
        )
        .bind(isbn)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// Check for a book with the same title and published date
    pub async fn edition_exists(&self, title: &str, published_date: Option<&str>) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM books WHERE title = $1 AND published_date IS NOT DISTINCT FROM $2)",
        )
        .bind(title)
        .bind(published_date)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// Insert a new, available book
    pub async fn create(&self, book: &CreateBook) -> AppResult<Book> {
        let created = sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (title, isbn, author_id, published_date, available)
            VALUES ($1, $2, $3, $4, TRUE)
            RETURNING id, title, isbn, author_id, published_date, available, last_borrowed_date
            "#,
        )
        .bind(&book.title)
        .bind(&book.isbn)
        .bind(book.author_id)
        .bind(&book.published_date)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    /// Update the descriptive fields that are present. Availability only
    /// changes through lending.
    pub async fn update(&self, id: i32, book: &UpdateBook) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(
            r#"
            UPDATE books
            SET title = COALESCE($2, title),
                isbn = COALESCE($3, isbn),
                author_id = COALESCE($4, author_id),
                published_date = COALESCE($5, published_date)
            WHERE id = $1
            RETURNING id, title, isbn, author_id, published_date, available, last_borrowed_date
            "#,
        )
        .bind(id)
        .bind(&book.title)
        .bind(&book.isbn)
        .bind(book.author_id)
        .bind(&book.published_date)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    /// Delete a book that nobody holds
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let available: bool = sqlx::query_scalar("SELECT available FROM books WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))?;

        if !available {
            return Err(AppError::Conflict("Book is currently borrowed".to_string()));
        }

        sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
