//! Content-addressed tangle storage: the approvers index, transaction
//! metadata, a write-behind LRU cache and the composed tangle store sitting
//! on top of a pluggable KV backend.

pub mod approvers;
pub mod cache;
pub mod kv;
pub mod marshal;
pub mod metadata;
pub mod store;

pub use approvers::Approvers;
pub use cache::WriteBehindCache;
pub use kv::{KvStore, MemKvStore, RocksKvStore, StoreError};
pub use metadata::Metadata;
pub use store::{TangleError, TangleStore};
