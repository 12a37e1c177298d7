//! In-memory stores used to run the lending engine and the ticket resolver
//! without a database

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    error::{AppError, AppResult},
    models::{
        book::Book,
        borrower::Borrower,
        ticket::{AssigneeType, TicketAccessContext, TicketAssignee, TicketRelations, TicketRow},
    },
    tickets::{AccessSource, TicketFilter},
};

use super::{
    lending::{LendingStore, LendingTx},
    tickets::TicketStore,
};

/// Books, borrowers and held sets
#[derive(Debug, Clone, Default)]
pub struct LibrarySnapshot {
    pub books: BTreeMap<i32, Book>,
    pub borrowers: BTreeMap<i32, Borrower>,
    /// Borrower id to held book ids
    pub held: BTreeMap<i32, BTreeSet<i32>>,
    next_borrower_id: i32,
}

impl LibrarySnapshot {
    /// Snapshot holding `count` available books with ids `1..=count`
    pub fn with_books(count: i32) -> Self {
        let mut snapshot = Self::default();
        for id in 1..=count {
            snapshot.books.insert(
                id,
                Book {
                    id,
                    title: format!("Book {}", id),
                    isbn: format!("{:013}", id),
                    author_id: 1,
                    published_date: None,
                    available: true,
                    last_borrowed_date: None,
                },
            );
        }
        snapshot
    }

    pub fn borrower_of_user(&self, user_id: i32) -> Option<&Borrower> {
        self.borrowers.values().find(|b| b.user_id == user_id)
    }

    /// Held book ids of a user, empty when the user never borrowed
    pub fn held_by_user(&self, user_id: i32) -> BTreeSet<i32> {
        self.borrower_of_user(user_id)
            .and_then(|b| self.held.get(&b.id))
            .cloned()
            .unwrap_or_default()
    }

    /// Borrower ids whose held set contains the book
    pub fn holders_of(&self, book_id: i32) -> Vec<i32> {
        self.held
            .iter()
            .filter(|(_, books)| books.contains(&book_id))
            .map(|(borrower_id, _)| *borrower_id)
            .collect()
    }
}

#[derive(Clone, Default)]
pub struct MemoryLendingStore {
    state: Arc<Mutex<LibrarySnapshot>>,
}

impl MemoryLendingStore {
    pub fn new(snapshot: LibrarySnapshot) -> Self {
        Self {
            state: Arc::new(Mutex::new(snapshot)),
        }
    }

    /// Committed state
    pub async fn snapshot(&self) -> LibrarySnapshot {
        self.state.lock().await.clone()
    }
}

#[async_trait]
impl LendingStore for MemoryLendingStore {
    async fn begin(&self) -> AppResult<Box<dyn LendingTx>> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryLendingTx { guard, working }))
    }

    async fn books_held_by(&self, user_id: i32) -> AppResult<Vec<Book>> {
        let state = self.state.lock().await;
        Ok(state
            .held_by_user(user_id)
            .iter()
            .filter_map(|id| state.books.get(id).cloned())
            .collect())
    }
}

/// Holds the store lock for its whole lifetime and works on a copy that is
/// written back on commit
struct MemoryLendingTx {
    guard: OwnedMutexGuard<LibrarySnapshot>,
    working: LibrarySnapshot,
}

#[async_trait]
impl LendingTx for MemoryLendingTx {
    async fn lock_book(&mut self, book_id: i32) -> AppResult<Option<Book>> {
        Ok(self.working.books.get(&book_id).cloned())
    }

    async fn lock_borrower(&mut self, user_id: i32, create: bool) -> AppResult<Option<Borrower>> {
        if let Some(borrower) = self.working.borrower_of_user(user_id) {
            return Ok(Some(borrower.clone()));
        }
        if !create {
            return Ok(None);
        }

        self.working.next_borrower_id += 1;
        let borrower = Borrower {
            id: self.working.next_borrower_id,
            user_id,
        };
        self.working.borrowers.insert(borrower.id, borrower.clone());
        Ok(Some(borrower))
    }

    async fn held_books(&mut self, borrower_id: i32) -> AppResult<Vec<i32>> {
        Ok(self
            .working
            .held
            .get(&borrower_id)
            .map(|books| books.iter().copied().collect())
            .unwrap_or_default())
    }

    async fn attach(&mut self, borrower_id: i32, book_id: i32, at: DateTime<Utc>) -> AppResult<()> {
        if !self.working.holders_of(book_id).is_empty() {
            return Err(AppError::Conflict(format!("Book {} is already held", book_id)));
        }
        let book = self
            .working
            .books
            .get_mut(&book_id)
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", book_id)))?;
        book.available = false;
        book.last_borrowed_date = Some(at);
        self.working.held.entry(borrower_id).or_default().insert(book_id);
        Ok(())
    }

    async fn detach(&mut self, borrower_id: i32, book_id: i32) -> AppResult<()> {
        if let Some(books) = self.working.held.get_mut(&borrower_id) {
            books.remove(&book_id);
        }
        if let Some(book) = self.working.books.get_mut(&book_id) {
            book.available = true;
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let MemoryLendingTx { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}

/// Ticket store over plain collections
#[derive(Debug, Clone, Default)]
pub struct MemoryTicketStore {
    contexts: HashMap<i32, TicketAccessContext>,
    tickets: Vec<TicketRow>,
    assignees: Vec<TicketAssignee>,
    relations: TicketRelations,
}

impl MemoryTicketStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, ctx: TicketAccessContext) -> Self {
        self.contexts.insert(ctx.user_id, ctx);
        self
    }

    pub fn with_ticket(mut self, row: TicketRow) -> Self {
        self.tickets.push(row);
        self
    }

    pub fn with_assignee(mut self, ticket_id: i32, assignee_type: AssigneeType, assignee_id: i32) -> Self {
        self.assignees.push(TicketAssignee {
            ticket_id,
            assignee_type,
            assignee_id,
        });
        self
    }

    pub fn with_relations(mut self, relations: TicketRelations) -> Self {
        self.relations = relations;
        self
    }
}

#[async_trait]
impl TicketStore for MemoryTicketStore {
    async fn access_context(&self, user_id: i32) -> AppResult<TicketAccessContext> {
        self.contexts
            .get(&user_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", user_id)))
    }

    async fn ticket_ids_for(&self, source: &AccessSource) -> AppResult<Vec<i32>> {
        let ids: BTreeSet<i32> = match source {
            AccessSource::CreatedOrAssigned(user_id) => self
                .tickets
                .iter()
                .filter(|t| !t.is_deleted)
                .filter(|t| t.created_by_id == Some(*user_id) || t.assigned_to_id == Some(*user_id))
                .map(|t| t.id)
                .collect(),
            edge_source => self
                .assignees
                .iter()
                .filter(|edge| edge_source.matches_assignee(edge))
                .filter(|edge| {
                    self.tickets
                        .iter()
                        .any(|t| t.id == edge.ticket_id && !t.is_deleted)
                })
                .map(|edge| edge.ticket_id)
                .collect(),
        };
        Ok(ids.into_iter().collect())
    }

    async fn search(&self, filter: &TicketFilter) -> AppResult<(Vec<TicketRow>, TicketRelations)> {
        let mut rows: Vec<TicketRow> = self
            .tickets
            .iter()
            .filter(|row| filter.matches(row))
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            a.parent_id
                .is_some()
                .cmp(&b.parent_id.is_some())
                .then(a.parent_id.cmp(&b.parent_id))
                .then(b.created_at.cmp(&a.created_at))
        });
        Ok((rows, self.relations.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn test_dropped_transaction_discards_changes() {
        let store = MemoryLendingStore::new(LibrarySnapshot::with_books(1));

        let mut tx = store.begin().await.unwrap();
        let borrower = tx.lock_borrower(7, true).await.unwrap().unwrap();
        tx.attach(borrower.id, 1, Utc::now()).await.unwrap();
        drop(tx);

        let snapshot = store.snapshot().await;
        assert!(snapshot.borrowers.is_empty());
        assert!(snapshot.books[&1].available);
    }

    #[tokio::test]
    async fn test_committed_transaction_is_visible() {
        let store = MemoryLendingStore::new(LibrarySnapshot::with_books(1));

        let mut tx = store.begin().await.unwrap();
        let borrower = tx.lock_borrower(7, true).await.unwrap().unwrap();
        tx.attach(borrower.id, 1, Utc::now()).await.unwrap();
        tx.commit().await.unwrap();

        let snapshot = store.snapshot().await;
        assert_eq!(snapshot.held_by_user(7), BTreeSet::from([1]));
        assert!(!snapshot.books[&1].available);
        assert_eq!(store.books_held_by(7).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_attach_rejects_second_holder() {
        let store = MemoryLendingStore::new(LibrarySnapshot::with_books(1));

        let mut tx = store.begin().await.unwrap();
        let first = tx.lock_borrower(1, true).await.unwrap().unwrap();
        let second = tx.lock_borrower(2, true).await.unwrap().unwrap();
        tx.attach(first.id, 1, Utc::now()).await.unwrap();
        assert!(matches!(
            tx.attach(second.id, 1, Utc::now()).await,
            Err(AppError::Conflict(_))
        ));
    }
}
