//! Configuration Stores
//!
//! Durable mirrors of each controller's configuration record.
//!
//! A store holds exactly one record per effect domain. Writes replace the
//! whole record atomically, and every successful write (including this
//! process's own) is published to subscribers through a `watch` channel.

mod equalizer;
mod json;
mod memory;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::watch;

use crate::error::StoreResult;

pub use equalizer::EqualizerDataStore;
pub use json::JsonFileStore;
pub(crate) use json::read_json_or_default;
pub use memory::MemoryStore;

/// Bound shared by every persisted record type
pub trait Record:
    Clone + Default + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

impl<T> Record for T where
    T: Clone + Default + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

/// Durable key-value persistence of one configuration record
#[async_trait]
pub trait ConfigStore<R: Record>: Send + Sync {
    /// Current persisted record (the default record if nothing was written yet)
    async fn load(&self) -> StoreResult<R>;

    /// Stream of persisted records, updated after every successful write
    fn subscribe(&self) -> watch::Receiver<R>;

    /// Atomically replace the persisted record
    async fn write(&self, record: R) -> StoreResult<()>;
}
