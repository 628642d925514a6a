//! In-memory store

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::watch;

use super::{ConfigStore, Record};
use crate::error::{StoreError, StoreResult};

/// Store that keeps its record in process memory
///
/// Counts writes and can be told to reject them, which makes it the store of
/// choice for exercising controller error paths.
pub struct MemoryStore<R: Record> {
    sender: watch::Sender<R>,
    writes: AtomicUsize,
    fail_writes: AtomicBool,
}

impl<R: Record> MemoryStore<R> {
    pub fn new() -> Self {
        Self::with_record(R::default())
    }

    pub fn with_record(record: R) -> Self {
        let (sender, _) = watch::channel(record);
        Self {
            sender,
            writes: AtomicUsize::new(0),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Successful writes so far
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Reject every subsequent write with `StoreError::Unavailable`
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Current record without going through the async API
    pub fn snapshot(&self) -> R {
        self.sender.borrow().clone()
    }
}

impl<R: Record> Default for MemoryStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<R: Record> ConfigStore<R> for MemoryStore<R> {
    async fn load(&self) -> StoreResult<R> {
        Ok(self.sender.borrow().clone())
    }

    fn subscribe(&self) -> watch::Receiver<R> {
        self.sender.subscribe()
    }

    async fn write(&self, record: R) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("writes disabled".into()));
        }
        self.sender.send_replace(record);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StrengthConfiguration;

    #[tokio::test]
    async fn test_write_then_load() {
        let store = MemoryStore::<StrengthConfiguration>::new();
        let record = StrengthConfiguration {
            strength: 300,
            enabled: true,
            ..Default::default()
        };
        store.write(record.clone()).await.unwrap();

        assert_eq!(store.load().await.unwrap(), record);
        assert_eq!(store.writes(), 1);
    }

    #[tokio::test]
    async fn test_subscribers_see_writes() {
        let store = MemoryStore::<StrengthConfiguration>::new();
        let mut rx = store.subscribe();

        store
            .write(StrengthConfiguration {
                strength: 10,
                ..Default::default()
            })
            .await
            .unwrap();

        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().strength, 10);
    }

    #[tokio::test]
    async fn test_failed_write_keeps_record() {
        let store = MemoryStore::<StrengthConfiguration>::new();
        store.set_fail_writes(true);

        let result = store
            .write(StrengthConfiguration {
                strength: 999,
                ..Default::default()
            })
            .await;

        assert!(matches!(result, Err(StoreError::Unavailable(_))));
        assert_eq!(store.snapshot().strength, 0);
        assert_eq!(store.writes(), 0);
    }
}
