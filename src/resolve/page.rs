//! Pagination
//!
//! `offset` counts pages of `limit` items; a zero limit disables paging.

/// Applies limit/offset to an already filtered, ordered result set.
pub fn paginate<T>(items: Vec<T>, limit: usize, offset: usize) -> Vec<T> {
    if limit == 0 {
        return items;
    }
    let skip = limit.saturating_mul(offset);
    items.into_iter().skip(skip).take(limit).collect()
}
