//! Redis service for cached read models

use std::sync::Arc;

use async_trait::async_trait;
use redis::{AsyncCommands, Client};
use serde::{de::DeserializeOwned, Serialize};

use crate::error::{AppError, AppResult};

/// Counter bumped by every catalog or lending mutation
pub const BOOK_LIST_GENERATION_KEY: &str = "books:gen";

/// Key of the book list cached for one generation
pub fn book_list_key(generation: i64) -> String {
    format!("books:all:{}", generation)
}

/// Minimal key-value surface the caches need
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    async fn set_ex(&self, key: &str, value: String, expiration_seconds: u64) -> AppResult<()>;

    /// Atomically increment an integer key, creating it at zero
    async fn incr(&self, key: &str) -> AppResult<i64>;
}

#[derive(Clone)]
pub struct RedisService {
    client: Client,
}

impl RedisService {
    /// Create a new Redis service
    pub async fn new(url: &str) -> AppResult<Self> {
        let client = Client::open(url)
            .map_err(|e| AppError::Internal(format!("Failed to create Redis client: {}", e)))?;

        // Test connection
        let mut conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to connect to Redis: {}", e)))?;

        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map_err(|e| AppError::Internal(format!("Redis connection test failed: {}", e)))?;

        Ok(Self { client })
    }

    async fn connection(&self) -> AppResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to get Redis connection: {}", e)))
    }
}

#[async_trait]
impl CacheStore for RedisService {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let mut conn = self.connection().await?;
        conn.get(key)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to read {} from Redis: {}", key, e)))
    }

    async fn set_ex(&self, key: &str, value: String, expiration_seconds: u64) -> AppResult<()> {
        let mut conn = self.connection().await?;
        conn.set_ex::<_, _, ()>(key, value, expiration_seconds)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to store {} in Redis: {}", key, e)))
    }

    async fn incr(&self, key: &str) -> AppResult<i64> {
        let mut conn = self.connection().await?;
        conn.incr(key, 1)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to increment {} in Redis: {}", key, e)))
    }
}

/// Book list cache keyed by generation.
///
/// Readers capture the generation before querying the database and store
/// their result under that generation, so a list read before a mutation is
/// never served after it. Every operation degrades to a no-op without a store.
#[derive(Clone)]
pub struct BookCache {
    store: Option<Arc<dyn CacheStore>>,
    ttl_seconds: u64,
}

impl BookCache {
    pub fn new(redis: Option<RedisService>, ttl_seconds: u64) -> Self {
        Self {
            store: redis.map(|r| Arc::new(r) as Arc<dyn CacheStore>),
            ttl_seconds,
        }
    }

    pub fn with_store(store: Arc<dyn CacheStore>, ttl_seconds: u64) -> Self {
        Self {
            store: Some(store),
            ttl_seconds,
        }
    }

    pub fn disabled() -> Self {
        Self {
            store: None,
            ttl_seconds: 0,
        }
    }

    /// Current generation; `None` when the cache cannot be used
    pub async fn generation(&self) -> Option<i64> {
        let store = self.store.as_ref()?;
        match store.get(BOOK_LIST_GENERATION_KEY).await {
            Ok(None) => Some(0),
            Ok(Some(raw)) => match raw.parse() {
                Ok(generation) => Some(generation),
                Err(e) => {
                    tracing::warn!(raw = %raw, error = %e, "Unreadable book cache generation");
                    None
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "Book cache generation read failed");
                None
            }
        }
    }

    /// Read the list cached for `generation`. Undecodable entries count as misses.
    pub async fn get<T: DeserializeOwned>(&self, generation: i64) -> Option<T> {
        let store = self.store.as_ref()?;
        let key = book_list_key(generation);
        let raw = match store.get(&key).await {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(error = %e, "Book cache read failed");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Discarding undecodable cache entry");
                None
            }
        }
    }

    /// Store a list read under `generation`
    pub async fn put<T: Serialize>(&self, generation: i64, value: &T) {
        let Some(store) = &self.store else {
            return;
        };
        let payload = match serde_json::to_string(value) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to encode book cache entry");
                return;
            }
        };
        if let Err(e) = store
            .set_ex(&book_list_key(generation), payload, self.ttl_seconds)
            .await
        {
            tracing::warn!(error = %e, "Book cache write failed");
        }
    }

    /// Move to a new generation; entries of older generations expire unread
    pub async fn invalidate(&self) {
        if let Some(store) = &self.store {
            if let Err(e) = store.incr(BOOK_LIST_GENERATION_KEY).await {
                tracing::warn!(error = %e, "Book cache invalidation failed");
            }
        }
    }
}
