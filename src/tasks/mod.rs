//! Background Tasks Module
//!
//! # Tasks
//! - Reaper: deletes expired entries found by reads and lists
//! - Sweep: periodically removes expired entries from the memory backend

mod reaper;
mod sweep;

pub use reaper::{Purge, Reaper, DEFAULT_REAP_QUEUE};
pub use sweep::spawn_sweep_task;
