//! Business logic services

pub mod catalog;
pub mod loans;
pub mod notifications;
pub mod redis;
pub mod tickets;
pub mod users;

use std::sync::Arc;

use crate::{
    clock::SystemClock, config::AppConfig, models::notification::PolicyTable, repository::Repository,
};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub users: users::UsersService,
    pub catalog: catalog::CatalogService,
    pub loans: loans::LoansService,
    pub tickets: tickets::TicketsService,
    pub notifications: notifications::NotificationService,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, config: &AppConfig, redis: Option<redis::RedisService>) -> Self {
        let cache = redis::BookCache::new(redis, config.redis.book_cache_ttl_seconds);

        Self {
            users: users::UsersService::new(repository.clone(), config.auth.clone()),
            catalog: catalog::CatalogService::new(repository.clone(), cache.clone()),
            loans: loans::LoansService::new(
                Arc::new(repository.lending.clone()),
                Arc::new(SystemClock),
                cache,
                &config.lending,
            ),
            tickets: tickets::TicketsService::new(Arc::new(repository.tickets.clone()), &config.tickets),
            notifications: notifications::NotificationService::new(
                Arc::new(repository.users.clone()),
                PolicyTable::default(),
            ),
        }
    }
}
