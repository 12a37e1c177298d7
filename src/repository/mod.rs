//! Repository layer for database operations

pub mod authors;
pub mod books;
pub mod lending;
#[cfg(test)]
pub mod memory;
pub mod tickets;
pub mod users;

use sqlx::{Pool, Postgres};

pub use lending::{LendingStore, LendingTx};
pub use tickets::TicketStore;
pub use users::ManagerDirectory;

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub users: users::UsersRepository,
    pub authors: authors::AuthorsRepository,
    pub books: books::BooksRepository,
    pub lending: lending::LendingRepository,
    pub tickets: tickets::TicketsRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            users: users::UsersRepository::new(pool.clone()),
            authors: authors::AuthorsRepository::new(pool.clone()),
            books: books::BooksRepository::new(pool.clone()),
            lending: lending::LendingRepository::new(pool.clone()),
            tickets: tickets::TicketsRepository::new(pool.clone()),
            pool,
        }
    }
}
