//! Record and option models shared by every backend.

pub mod options;
pub mod record;

// Re-export commonly used types
pub use options::{DeleteOptions, ListOptions, Options, ReadOptions, WriteOptions};
pub use record::Record;
