//! Networked TTL cache backend over Redis.
//!
//! Delegates existence and expiry to a Redis server: presence is the only
//! signal, so entries are written as `SET <key> 1 EX <ttl>` and checked with
//! `EXISTS`. Keys are namespaced with the configured prefix before they go
//! over the wire.
//!
//! # Failure Policy
//!
//! The existence check is fail-open: a known-down connection answers "not
//! present" immediately, and an I/O error during the query is softened the
//! same way after marking the connection down. Writes are NOT fail-open: a
//! silently failed insert would let a genuine duplicate through on every
//! later check, so `set` raises. Deletes are best-effort and swallow
//! failures.
//!
//! # Connection Management
//!
//! Built on `redis::aio::ConnectionManager`, which multiplexes one
//! connection and reconnects on its own. A backend-level connected flag
//! stands in for the transport's connect/error/end lifecycle events: it goes
//! down when an operation hits an I/O error or [`RedisCache::disconnect`] is
//! called, and any later successful round-trip brings it back up. While a
//! manager is held, operations keep going to the wire regardless of the
//! flag, so a transient error never permanently disables the backend; only
//! an explicit disconnect stops traffic.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

use super::{CacheBackend, CacheConfig, namespaced_key, validate_entry};
use crate::error::CacheError;

/// Keys examined per SCAN round trip.
const SCAN_COUNT: usize = 100;

/// Keys deleted per bulk-delete command during `clear`.
const DELETE_BATCH: usize = 100;

/// Default connection URL when none is configured.
const DEFAULT_URL: &str = "redis://localhost:6379";

/// Environment variable overriding the default connection URL.
const REDIS_URL_ENV: &str = "SEEN_REDIS_URL";

/// Redis-backed TTL cache.
pub struct RedisCache {
    config: CacheConfig,
    client: Client,
    connection: Mutex<Option<ConnectionManager>>,
    connected: AtomicBool,
}

impl RedisCache {
    /// Wraps an already-built client without connecting.
    ///
    /// The instance starts disconnected; call [`RedisCache::reconnect`] to
    /// establish the connection.
    #[must_use]
    pub fn with_client(client: Client, config: CacheConfig) -> Self {
        Self {
            config,
            client,
            connection: Mutex::new(None),
            connected: AtomicBool::new(false),
        }
    }

    /// Opens a connection to the given URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is malformed or the connection cannot be
    /// established.
    pub async fn connect(url: &str, config: CacheConfig) -> Result<Self, CacheError> {
        let client =
            Client::open(url).map_err(|e| CacheError::operation("redis_open", e))?;
        let cache = Self::with_client(client, config);
        cache.reconnect().await?;
        Ok(cache)
    }

    /// Connects using `SEEN_REDIS_URL` or the localhost default.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub async fn with_defaults() -> Result<Self, CacheError> {
        let url = std::env::var(REDIS_URL_ENV).unwrap_or_else(|_| DEFAULT_URL.to_string());
        Self::connect(&url, CacheConfig::default()).await
    }

    /// (Re-)establishes the managed connection and marks the backend up.
    ///
    /// # Errors
    ///
    /// Returns an error if the server is unreachable.
    pub async fn reconnect(&self) -> Result<(), CacheError> {
        let manager = self
            .client
            .get_connection_manager()
            .await
            .map_err(|e| {
                self.mark_down();
                CacheError::operation("redis_connect", e)
            })?;

        *self.connection.lock().await = Some(manager);
        self.connected.store(true, Ordering::SeqCst);
        tracing::debug!(namespace = %self.config.namespace, "redis cache connected");
        Ok(())
    }

    /// Releases the connection. Safe to call from any state; disconnecting
    /// twice does not issue a redundant close.
    pub async fn disconnect(&self) {
        let mut guard = self.connection.lock().await;
        if guard.take().is_some() {
            tracing::debug!(namespace = %self.config.namespace, "redis cache disconnected");
        }
        self.connected.store(false, Ordering::SeqCst);
    }

    /// Last-known connection status.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Health probe; restores the connected status on success.
    ///
    /// # Errors
    ///
    /// Returns an error if the server does not answer `PING`.
    pub async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.manager().await?;
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| {
                self.mark_down();
                CacheError::operation("redis_ping", e)
            })?;
        if pong == "PONG" {
            self.connected.store(true, Ordering::SeqCst);
            Ok(())
        } else {
            self.mark_down();
            Err(CacheError::operation("redis_ping", "unexpected reply"))
        }
    }

    /// Clones out the managed connection handle.
    async fn manager(&self) -> Result<ConnectionManager, CacheError> {
        self.connection
            .lock()
            .await
            .clone()
            .ok_or(CacheError::ConnectionDown)
    }

    fn mark_down(&self) {
        if self.connected.swap(false, Ordering::SeqCst) {
            tracing::warn!(namespace = %self.config.namespace, "redis cache marked down");
        }
    }

    fn mark_up(&self) {
        if !self.connected.swap(true, Ordering::SeqCst) {
            tracing::debug!(namespace = %self.config.namespace, "redis cache recovered");
        }
    }

    fn full_key(&self, key: &str) -> String {
        namespaced_key(&self.config.namespace, key)
    }

    fn scan_pattern(&self) -> String {
        format!("{}:*", self.config.namespace)
    }

    /// Issues one bulk delete for a batch of keys.
    async fn delete_batch(
        &self,
        conn: &mut ConnectionManager,
        batch: &[String],
    ) -> Result<u64, CacheError> {
        let deleted: u64 = redis::cmd("DEL")
            .arg(batch)
            .query_async(conn)
            .await
            .map_err(|e| {
                self.mark_down();
                CacheError::operation("redis_clear", e)
            })?;
        Ok(deleted)
    }
}

#[async_trait]
impl CacheBackend for RedisCache {
    async fn has(&self, key: &str) -> Result<bool, CacheError> {
        // No manager means explicitly disconnected: assume not a duplicate
        // and keep the pipeline moving.
        let Ok(mut conn) = self.manager().await else {
            tracing::debug!(key, "redis disconnected, treating as not present");
            metrics::counter!("seen_cache_fail_open_total", "operation" => "has").increment(1);
            return Ok(false);
        };

        let full = self.full_key(key);
        match conn.exists::<_, bool>(&full).await {
            Ok(found) => {
                self.mark_up();
                Ok(found)
            },
            Err(e) => {
                // Connectivity loss during a check is a soft signal, not an
                // error.
                self.mark_down();
                tracing::warn!(key = %full, error = %e, "existence check failed, treating as not present");
                metrics::counter!("seen_cache_fail_open_total", "operation" => "has").increment(1);
                Ok(false)
            },
        }
    }

    async fn set(&self, key: &str, ttl: Duration) -> Result<(), CacheError> {
        validate_entry(key, ttl)?;
        let mut conn = self.manager().await?;

        let full = self.full_key(key);
        // Whole seconds, floored; sub-second TTLs were already rejected.
        // Value content is irrelevant; only presence and expiry matter.
        conn.set_ex::<_, _, ()>(&full, 1u8, ttl.as_secs())
            .await
            .map_err(|e| {
                self.mark_down();
                CacheError::operation("redis_set", e)
            })?;
        self.mark_up();
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        if key.is_empty() {
            return Ok(());
        }
        let Ok(mut conn) = self.manager().await else {
            tracing::debug!(key, "redis disconnected, skipping delete");
            return Ok(());
        };

        let full = self.full_key(key);
        match conn.del::<_, i64>(&full).await {
            Ok(_) => self.mark_up(),
            Err(e) => {
                // Best-effort: log and swallow, preserving the no-throw
                // contract.
                self.mark_down();
                tracing::warn!(key = %full, error = %e, "delete failed, swallowed");
            },
        }
        Ok(())
    }

    fn supports_clear(&self) -> bool {
        true
    }

    async fn clear(&self) -> Result<u64, CacheError> {
        let mut conn = self.manager().await?;

        let pattern = self.scan_pattern();
        let mut cursor: u64 = 0;
        let mut batch: Vec<String> = Vec::with_capacity(DELETE_BATCH);
        let mut removed: u64 = 0;

        // Cursor-based incremental scan; never a blocking full-keyspace
        // listing.
        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_COUNT)
                .query_async(&mut conn)
                .await
                .map_err(|e| {
                    self.mark_down();
                    CacheError::operation("redis_scan", e)
                })?;

            for key in keys {
                batch.push(key);
                if batch.len() == DELETE_BATCH {
                    removed += self.delete_batch(&mut conn, &batch).await?;
                    batch.clear();
                }
            }

            cursor = next;
            if cursor == 0 {
                break;
            }
        }

        // Flush the remainder; zero matches issue no delete at all.
        if !batch.is_empty() {
            removed += self.delete_batch(&mut conn, &batch).await?;
        }

        self.mark_up();
        tracing::debug!(removed, pattern = %pattern, "cleared redis cache namespace");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::print_stderr)]

    use super::*;

    /// Builds a backend whose connection was never established. No server
    /// is contacted: `Client::open` only parses the URL.
    fn down_cache() -> RedisCache {
        let client = Client::open("redis://127.0.0.1:1/").unwrap();
        RedisCache::with_client(client, CacheConfig::default())
    }

    #[tokio::test]
    async fn test_has_fails_open_when_down() {
        let cache = down_cache();
        assert!(!cache.is_connected());
        assert!(!cache.has("any-key").await.unwrap());
    }

    #[tokio::test]
    async fn test_set_raises_when_down() {
        let cache = down_cache();
        let result = cache.set("k", Duration::from_secs(10)).await;
        assert!(matches!(result, Err(CacheError::ConnectionDown)));
    }

    #[tokio::test]
    async fn test_set_validates_before_connecting() {
        let cache = down_cache();

        // Invalid input is reported as such, not as a connection problem.
        let result = cache.set("", Duration::from_secs(10)).await;
        assert!(matches!(result, Err(CacheError::EmptyKey)));

        let result = cache.set("k", Duration::ZERO).await;
        assert!(matches!(result, Err(CacheError::InvalidTtl)));
    }

    #[tokio::test]
    async fn test_delete_swallows_when_down() {
        let cache = down_cache();
        cache.delete("k").await.unwrap();
        cache.delete("").await.unwrap();
    }

    #[tokio::test]
    async fn test_clear_raises_when_down() {
        let cache = down_cache();
        let result = cache.clear().await;
        assert!(matches!(result, Err(CacheError::ConnectionDown)));
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        let cache = down_cache();
        cache.disconnect().await;
        cache.disconnect().await;
        assert!(!cache.is_connected());
    }

    #[tokio::test]
    async fn test_round_trip_restores_marked_down_backend() {
        // Needs a live server; exercises the private status flag directly.
        let Ok(url) = std::env::var("SEEN_TEST_REDIS_URL") else {
            eprintln!("Skipping test: SEEN_TEST_REDIS_URL not set");
            return;
        };
        let config = CacheConfig::default().with_namespace("seen_recovery_test");
        let cache = RedisCache::connect(&url, config).await.unwrap();

        // A transient I/O error flips the flag without dropping the manager.
        cache.mark_down();
        assert!(!cache.is_connected());

        // The next operation still goes over the wire and restores service.
        cache.set("k", Duration::from_secs(30)).await.unwrap();
        assert!(cache.is_connected());
        assert!(cache.has("k").await.unwrap());

        cache.clear().await.unwrap();
        cache.disconnect().await;
    }

    #[test]
    fn test_scan_pattern_scoped_to_namespace() {
        let client = Client::open("redis://127.0.0.1:1/").unwrap();
        let cache = RedisCache::with_client(
            client,
            CacheConfig::default().with_namespace("orders"),
        );
        assert_eq!(cache.scan_pattern(), "orders:*");
        assert_eq!(cache.full_key("abc"), "orders:abc");
    }
}
