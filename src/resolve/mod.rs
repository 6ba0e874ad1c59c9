//! Resolvers
//!
//! Pure logic shared by every backend: key matching, expiry resolution,
//! pagination and namespace precedence. Backends translate these into their
//! native query mechanisms but never reimplement them.

mod expiry;
mod keys;
mod namespace;
mod page;

pub use expiry::{from_epoch_millis, is_expired, resolve_expiry, to_epoch_millis};
pub use keys::KeyMatch;
pub use namespace::Namespace;
pub use page::paginate;
