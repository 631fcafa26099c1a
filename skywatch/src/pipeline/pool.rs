//! Bounded connection pool for store writes.
//!
//! Concurrency toward the store is bounded by a semaphore: a send must hold a
//! permit for the duration of its write. Acquisition waits up to a configured
//! timeout; exhaustion is a retryable failure, not a panic or an unbounded
//! queue.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Permit representing one store connection. Released on drop.
pub struct PoolPermit {
    _permit: OwnedSemaphorePermit,
}

/// Bounded pool of store connections.
pub struct ConnectionPool {
    semaphore: Arc<Semaphore>,
    size: usize,
    acquire_timeout: Duration,
}

impl ConnectionPool {
    /// Create a pool with `size` connections.
    pub fn new(size: usize, acquire_timeout: Duration) -> Self {
        let size = size.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(size)),
            size,
            acquire_timeout,
        }
    }

    /// Acquire a connection, waiting up to the configured timeout.
    ///
    /// Returns `None` when the pool stays exhausted for the full wait.
    pub async fn acquire(&self) -> Option<PoolPermit> {
        let acquired = tokio::time::timeout(
            self.acquire_timeout,
            Arc::clone(&self.semaphore).acquire_owned(),
        )
        .await
        .ok()?;

        // The semaphore is never closed while the pool is alive.
        acquired.ok().map(|permit| PoolPermit { _permit: permit })
    }

    /// Total pool size.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Connections currently in use.
    pub fn in_use(&self) -> usize {
        self.size - self.semaphore.available_permits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_acquire_and_release() {
        let pool = ConnectionPool::new(2, Duration::from_millis(50));
        assert_eq!(pool.in_use(), 0);

        let a = pool.acquire().await.unwrap();
        let b = pool.acquire().await.unwrap();
        assert_eq!(pool.in_use(), 2);

        drop(a);
        assert_eq!(pool.in_use(), 1);
        drop(b);
        assert_eq!(pool.in_use(), 0);
    }

    #[tokio::test]
    async fn test_exhausted_pool_times_out() {
        let pool = ConnectionPool::new(1, Duration::from_millis(20));
        let _held = pool.acquire().await.unwrap();

        let start = std::time::Instant::now();
        assert!(pool.acquire().await.is_none());
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[tokio::test]
    async fn test_waiter_gets_permit_on_release() {
        let pool = Arc::new(ConnectionPool::new(1, Duration::from_millis(500)));
        let held = pool.acquire().await.unwrap();

        let waiter = {
            let pool = Arc::clone(&pool);
            tokio::spawn(async move { pool.acquire().await.is_some() })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        drop(held);
        assert!(waiter.await.unwrap());
    }

    #[test]
    fn test_zero_size_clamped_to_one() {
        let pool = ConnectionPool::new(0, Duration::from_millis(10));
        assert_eq!(pool.size(), 1);
    }
}
