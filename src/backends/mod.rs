//! Backend adapters implementing [`Store`].

pub mod memory;
pub mod mysql;
pub mod redis;

pub use self::memory::MemoryStore;
pub use self::mysql::MySqlStore;
pub use self::redis::RedisStore;

use tracing::info;

use crate::config::{Backend, Config};
use crate::error::Result;
use crate::store::Store;

/// Connects the backend selected by `config`.
pub async fn open(config: &Config) -> Result<Box<dyn Store>> {
    info!(backend = %config.backend, "Opening store");
    let options = config.options.clone();
    let store: Box<dyn Store> = match config.backend {
        Backend::Memory => Box::new(MemoryStore::new(options)?),
        Backend::Redis => Box::new(RedisStore::connect(options).await?),
        Backend::MySql => Box::new(MySqlStore::connect(options).await?),
    };
    Ok(store)
}
