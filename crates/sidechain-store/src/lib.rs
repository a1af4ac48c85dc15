//! # Side-chain Store
//!
//! Storage abstraction for side-chain state. Provides a trait-based
//! key/value interface with SQLite and in-memory implementations, and the
//! staged state cache layered on top of it.
//!
//! ## Key Types
//!
//! - [`KvStore`] - The async trait every backend implements
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//! - [`StateCache`] - One staging session over a store
//! - [`StateValue`] - The closed set of state values, keyed by [`DataEntryPrefix`]
//!
//! ## Usage
//!
//! ```rust,no_run
//! use sidechain_store::{DataEntryPrefix, SqliteStore, StateCache, StateValue, StorageItem};
//!
//! async fn example() {
//!     let store = SqliteStore::open("state.db").unwrap();
//!
//!     let mut cache = StateCache::new(&store);
//!     let item = StateValue::Storage(StorageItem::default());
//!     cache.get_or_create(DataEntryPrefix::Storage, "key", item).await.unwrap();
//!
//!     // Writes reach the store only here, in one batch.
//!     cache.commit().await.unwrap();
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Atomic commit**: a session's write set is flushed as a single [`WriteBatch`]
//! - **Tombstones**: deleted entries stay in the write set and become deletes on commit
//! - **Read-through**: a miss consults the committed store without staging anything

pub mod cache;
pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod state;
pub mod traits;

pub use cache::{AccountHooks, StateCache, WriteEntry, PLACEHOLDER_BALANCE};
pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use state::{
    key_to_str, AccountState, AssetState, ContractState, DataEntryPrefix, StateValue, StorageItem,
};
pub use traits::{BatchOp, KvStore, KvStoreExt, WriteBatch};
