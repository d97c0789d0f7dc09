//! chain-map: a single-threaded separate-chaining hash map whose bucket
//! array grows and shrinks with the entry count.
//!
//! Design summary
//! - Storage: `Vec` of buckets, each bucket a short insertion-ordered
//!   `SmallVec` chain. Every entry lives in bucket `hash(key) % capacity`,
//!   and capacity is never zero.
//! - Writes: `insert` is insert-if-absent: a duplicate key is a silent
//!   no-op and the first value wins. `remove` of an absent key is likewise a
//!   no-op. `entry_or_default` is the insert-on-miss read path.
//! - Resize policy: after an insertion, the bucket array doubles once the
//!   entry count exceeds the bucket count. After a removal, it halves when
//!   the count lands *exactly* on a quarter of the bucket count. Both
//!   directions rebuild by routing every entry through the normal insert
//!   path, so a rehash can never drop or duplicate an entry. The tunables
//!   are the named constants [`BASE_CAPACITY`] and [`GROWTH_FACTOR`].
//! - Iteration: ascending bucket index, insertion order within a bucket.
//!   [`Iter`]/[`IterMut`]/[`IntoIter`] visit each live entry exactly once;
//!   the [`Cursor`] API exposes the same walk as an opaque, advanceable
//!   position with an explicit end sentinel.
//!
//! Contracts
//! - Single-threaded: the map assumes one exclusive owner. A debug-only
//!   guard panics on reentrant use from user `Eq`/`Hash` code; release
//!   builds carry no check.
//! - Invalidation: treat any `insert`, `remove`, `entry_or_default` miss, or
//!   `clear` as invalidating every outstanding [`Cursor`]. Stale cursors are
//!   bounds-checked (they yield `None` or a different live entry, never
//!   undefined behavior), but no positional meaning survives a mutation.
//! - The hash state is fixed at construction and reused unchanged across
//!   every rehash; swapping hash behavior mid-lifetime would break the
//!   bucket-placement invariant.
//!
//! Non-goals: concurrency, persistence, custom allocators, open addressing,
//! and any ordering guarantee beyond the visit-once rule above.

mod chain_map;
mod chain_map_proptest;
mod guard;

// Public surface
pub use chain_map::{
    ChainMap, Cursor, IntoIter, Iter, IterMut, KeyNotFound, BASE_CAPACITY, GROWTH_FACTOR,
};
