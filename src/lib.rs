//! kvstore - A key/value store abstraction with interchangeable backends
//!
//! Records are byte values addressed by string keys inside a
//! (database, table) namespace, with optional expiry. Redis, MySQL and an
//! in-process engine implement the same [`Store`] contract.

pub mod backends;
pub mod config;
pub mod error;
pub mod models;
pub mod resolve;
pub mod store;
pub mod tasks;

pub use backends::{open, MemoryStore, MySqlStore, RedisStore};
pub use config::{Backend, Config};
pub use error::{Result, StoreError};
pub use models::{DeleteOptions, ListOptions, Options, ReadOptions, Record, WriteOptions};
pub use store::Store;
