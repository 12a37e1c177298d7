//! Catalog service: authors and books

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        author::{Author, CreateAuthor, UpdateAuthor},
        book::{validate_isbn, Book, BookDetails, BookQuery, CreateBook, UpdateBook},
    },
    repository::Repository,
};

use super::redis::BookCache;

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
    cache: BookCache,
}

impl CatalogService {
    pub fn new(repository: Repository, cache: BookCache) -> Self {
        Self { repository, cache }
    }

    // =========================================================================
    // Authors
    // =========================================================================

    pub async fn list_authors(&self) -> AppResult<Vec<Author>> {
        self.repository.authors.list().await
    }

    pub async fn get_author(&self, id: i32) -> AppResult<Author> {
        self.repository.authors.get_by_id(id).await
    }

    pub async fn create_author(&self, author: CreateAuthor) -> AppResult<Author> {
        author.validate()?;

        if self.repository.authors.name_exists(&author.name, None).await? {
            return Err(AppError::Conflict("Author already exists".to_string()));
        }
        self.repository.authors.create(&author).await
    }

    pub async fn update_author(&self, id: i32, author: UpdateAuthor) -> AppResult<Author> {
        author.validate()?;

        if let Some(name) = &author.name {
            if self.repository.authors.name_exists(name, Some(id)).await? {
                return Err(AppError::Conflict("Another author already has this name".to_string()));
            }
        }
        let updated = self.repository.authors.update(id, &author).await?;
        self.cache.invalidate().await;
        Ok(updated)
    }

    /// Delete an author with no books
    pub async fn delete_author(&self, id: i32) -> AppResult<()> {
        self.repository.authors.get_by_id(id).await?;

        if self.repository.authors.count_books(id).await? > 0 {
            return Err(AppError::Conflict("Author still has books in the catalog".to_string()));
        }
        self.repository.authors.delete(id).await
    }

    // =========================================================================
    // Books
    // =========================================================================

    /// All books, served from the cache when possible
    pub async fn list_books(&self) -> AppResult<Vec<BookDetails>> {
        // Captured before the query so a concurrent mutation retires this read
        let generation = self.cache.generation().await;
        if let Some(generation) = generation {
            if let Some(cached) = self.cache.get::<Vec<BookDetails>>(generation).await {
                tracing::debug!(generation, "Book list served from cache");
                return Ok(cached);
            }
        }

        let books = self.repository.books.list().await?;
        if let Some(generation) = generation {
            self.cache.put(generation, &books).await;
        }
        Ok(books)
    }

    pub async fn get_book(&self, id: i32) -> AppResult<BookDetails> {
        self.repository.books.get_by_id(id).await
    }

    pub async fn search_books(&self, query: &BookQuery) -> AppResult<Vec<BookDetails>> {
        self.repository.books.search(query).await
    }

    pub async fn create_book(&self, book: CreateBook) -> AppResult<Book> {
        book.validate()?;
        validate_isbn(&book.isbn)?;

        self.repository.authors.get_by_id(book.author_id).await?;

        if self.repository.books.isbn_exists(&book.isbn, None).await? {
            return Err(AppError::Conflict("A book with the same ISBN already exists".to_string()));
        }
        if self
            .repository
            .books
            .edition_exists(&book.title, book.published_date.as_deref())
            .await?
        {
            return Err(AppError::Conflict(
                "A book with the same title and published date already exists".to_string(),
            ));
        }

        let created = self.repository.books.create(&book).await?;
        self.cache.invalidate().await;
        tracing::info!(book_id = created.id, "Book created");
        Ok(created)
    }

    pub async fn update_book(&self, id: i32, book: UpdateBook) -> AppResult<Book> {
        book.validate()?;

        if let Some(isbn) = &book.isbn {
            validate_isbn(isbn)?;
            if self.repository.books.isbn_exists(isbn, Some(id)).await? {
                return Err(AppError::Conflict("A book with the same ISBN already exists".to_string()));
            }
        }
        if let Some(author_id) = book.author_id {
            self.repository.authors.get_by_id(author_id).await?;
        }

        let updated = self.repository.books.update(id, &book).await?;
        self.cache.invalidate().await;
        Ok(updated)
    }

    pub async fn delete_book(&self, id: i32) -> AppResult<()> {
        self.repository.books.delete(id).await?;
        self.cache.invalidate().await;
        tracing::info!(book_id = id, "Book deleted");
        Ok(())
    }
}
