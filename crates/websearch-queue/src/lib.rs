//! Queue Client: string-payload URL queues behind
//! `websearch_core::traits::UrlQueue`.
//!
//! `RedisQueue` is the production gateway (LPUSH producers, RPOP
//! polling consumers on one list key, at-least-once delivery).
//! `MemoryQueue` is an in-process equivalent for tests and queue-less
//! development.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;

use websearch_core::error::{Error, Result};
use websearch_core::traits::UrlQueue;

/// Redis-backed queue. `ConnectionManager` multiplexes and reconnects
/// internally, so clones share one pooled connection.
#[derive(Clone)]
pub struct RedisQueue {
    manager: ConnectionManager,
    key: String,
}

impl RedisQueue {
    pub async fn connect(url: &str, key: &str) -> Result<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| Error::Queue(format!("invalid redis url {url}: {e}")))?;
        let manager = ConnectionManager::new(client)
            .await
            .map_err(|e| Error::Queue(format!("redis connection failed: {e}")))?;
        tracing::info!(url, key, "connected to redis queue");
        Ok(Self { manager, key: key.to_string() })
    }
}

#[async_trait]
impl UrlQueue for RedisQueue {
    async fn enqueue(&self, url: &str) -> Result<()> {
        let mut conn = self.manager.clone();
        conn.lpush::<_, _, ()>(&self.key, url)
            .await
            .map_err(|e| Error::Queue(format!("enqueue failed: {e}")))
    }

    async fn dequeue(&self, timeout: Duration) -> Result<Option<String>> {
        let mut conn = self.manager.clone();
        // RPOP pairs with LPUSH for FIFO order; the popped item is
        // removed on delivery (fire-and-forget, no lease). Polling
        // instead of BRPOP keeps blocking commands off the shared
        // multiplexed connection: a BRPOP here would suspend the
        // whole connection and stall every enqueue, llen and ping
        // pipelined behind it until the pop timed out.
        let deadline = Instant::now() + timeout;
        loop {
            let popped: Option<String> = conn
                .rpop(&self.key, None)
                .await
                .map_err(|e| Error::Queue(format!("dequeue failed: {e}")))?;
            if popped.is_some() {
                return Ok(popped);
            }
            match next_poll_delay(deadline) {
                Some(delay) => tokio::time::sleep(delay).await,
                None => return Ok(None),
            }
        }
    }

    async fn len(&self) -> Result<u64> {
        let mut conn = self.manager.clone();
        conn.llen(&self.key)
            .await
            .map_err(|e| Error::Queue(format!("llen failed: {e}")))
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.manager.clone();
        redis::cmd("PING")
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| Error::Queue(format!("redis ping failed: {e}")))
    }
}

/// Spacing between empty-queue polls in `RedisQueue::dequeue`.
const POLL_STEP: Duration = Duration::from_millis(250);

/// Delay before the next empty-queue poll, `None` once `deadline`
/// has passed. Never overshoots the deadline.
fn next_poll_delay(deadline: Instant) -> Option<Duration> {
    let remaining = deadline.saturating_duration_since(Instant::now());
    if remaining.is_zero() {
        None
    } else {
        Some(remaining.min(POLL_STEP))
    }
}

/// FIFO queue held in process memory. Same blocking-dequeue contract
/// as the Redis gateway.
#[derive(Default)]
pub struct MemoryQueue {
    items: Mutex<VecDeque<String>>,
    notify: Notify,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UrlQueue for MemoryQueue {
    async fn enqueue(&self, url: &str) -> Result<()> {
        self.items.lock().await.push_back(url.to_string());
        self.notify.notify_one();
        Ok(())
    }

    async fn dequeue(&self, timeout: Duration) -> Result<Option<String>> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(url) = self.items.lock().await.pop_front() {
                return Ok(Some(url));
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }
            // Missed notifications just cause one extra loop turn.
            let _ = tokio::time::timeout(remaining, self.notify.notified()).await;
        }
    }

    async fn len(&self) -> Result<u64> {
        Ok(self.items.lock().await.len() as u64)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
