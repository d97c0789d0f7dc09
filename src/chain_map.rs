//! ChainMap: a separate-chaining hash table with automatic grow/shrink.
//!
//! Layout is an owned bucket array (`Vec` of short `SmallVec` chains); every
//! entry lives in bucket `hash(key) % capacity`. Capacity is never zero.
//! `insert` is insert-if-absent: a duplicate key leaves the stored value
//! untouched. Growth doubles the bucket array once the entry count exceeds
//! the bucket count; shrink halves it when a removal lands the count exactly
//! on a quarter of the bucket count (see [`ChainMap::remove`] for the quirk).
//!
//! Internally the structure is two layers: `Table` owns the buckets and all
//! placement logic, and [`ChainMap`] wraps it together with the debug-only
//! exclusivity guard taken at each public entry point that can run user
//! `Eq`/`Hash` code.

use crate::guard::DebugExclusive;
use core::borrow::Borrow;
use core::hash::{BuildHasher, Hash};
use smallvec::SmallVec;
use std::collections::hash_map::RandomState;
use std::fmt;

/// Bucket count of a fresh map, and the count `clear` resets to. Must be
/// at least 1 so `hash % capacity` stays well-defined.
pub const BASE_CAPACITY: usize = 10;

/// Capacity multiplier applied on growth; the shrink trigger and the shrink
/// target are both derived from it. Must be greater than 1.
pub const GROWTH_FACTOR: usize = 2;

#[derive(Debug, Clone)]
struct Entry<K, V> {
    key: K,
    value: V,
}

// Chains are short in the expected case; keep the single-entry bucket inline.
type Bucket<K, V> = SmallVec<[Entry<K, V>; 1]>;

/// Error returned by [`ChainMap::at`] when the key is absent.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct KeyNotFound;

impl fmt::Display for KeyNotFound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("key not found")
    }
}

impl std::error::Error for KeyNotFound {}

/// An opaque position inside a [`ChainMap`]: a (bucket, slot) index pair.
///
/// The end sentinel is `(capacity, 0)`; [`ChainMap::end`] produces it and
/// [`ChainMap::advance`] saturates at it. Cursors are plain indices: any
/// mutation of the map (`insert`, `remove`, `entry_or_default` on a missing
/// key, `clear`) must be assumed to invalidate every outstanding cursor. A
/// stale cursor is never unsafe, accessors are bounds-checked and return
/// `None`, but it may address a different entry than it did before.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Cursor {
    bucket: usize,
    pos: usize,
}

impl Cursor {
    /// Borrow the key under this cursor, or `None` at `end()` / out of range.
    pub fn key<'a, K, V, S>(&self, map: &'a ChainMap<K, V, S>) -> Option<&'a K> {
        map.table.entry_at(*self).map(|e| &e.key)
    }

    /// Borrow the value under this cursor, or `None` at `end()` / out of range.
    pub fn value<'a, K, V, S>(&self, map: &'a ChainMap<K, V, S>) -> Option<&'a V> {
        map.table.entry_at(*self).map(|e| &e.value)
    }

    /// Mutably borrow the value under this cursor.
    pub fn value_mut<'a, K, V, S>(&self, map: &'a mut ChainMap<K, V, S>) -> Option<&'a mut V> {
        map.table.entry_at_mut(*self).map(|e| &mut e.value)
    }
}

// Bucket storage and placement logic. Everything that hashes, probes, or
// rehashes lives here; the public wrapper adds the reentrancy guard on top.
struct Table<K, V, S> {
    buckets: Vec<Bucket<K, V>>,
    len: usize,
    hasher: S,
}

impl<K, V, S> Table<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    fn with_hasher(hasher: S) -> Self {
        Self {
            buckets: empty_buckets(BASE_CAPACITY),
            len: 0,
            hasher,
        }
    }

    fn bucket_of<Q>(&self, q: &Q) -> usize
    where
        Q: ?Sized + Hash,
    {
        self.hasher.hash_one(q) as usize % self.buckets.len()
    }

    fn locate<Q>(&self, q: &Q) -> Option<(usize, usize)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let b = self.bucket_of(q);
        self.buckets[b]
            .iter()
            .position(|e| e.key.borrow() == q)
            .map(|pos| (b, pos))
    }

    // The one place entries are added. Dedup scan first; append; then the
    // growth check, which runs only when an entry was actually added.
    fn insert(&mut self, key: K, value: V) -> bool {
        let b = self.bucket_of(&key);
        if self.buckets[b].iter().any(|e| e.key == key) {
            return false;
        }
        self.buckets[b].push(Entry { key, value });
        self.len += 1;
        if self.len > self.buckets.len() {
            self.rehash(self.buckets.len() * GROWTH_FACTOR);
        }
        true
    }

    fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let (b, pos) = self.locate(key)?;
        let entry = self.buckets[b].remove(pos);
        self.len -= 1;
        let halved = self.buckets.len() / GROWTH_FACTOR;
        if self.len == halved / 2 && halved > 0 {
            self.rehash(halved);
        }
        Some(entry.value)
    }

    // Rebuild the bucket array at `new_capacity`, routing every live entry
    // back through insert. The reinserts restore the count; they can never
    // trigger a nested rehash because the new capacity always accommodates
    // the current count.
    fn rehash(&mut self, new_capacity: usize) {
        let old = std::mem::replace(&mut self.buckets, empty_buckets(new_capacity));
        self.len = 0;
        for bucket in old {
            for entry in bucket {
                self.insert(entry.key, entry.value);
            }
        }
    }

    fn clear(&mut self) {
        self.buckets = empty_buckets(BASE_CAPACITY);
        self.len = 0;
    }
}

// Cursor addressing needs no hashing, so these stay unbounded.
impl<K, V, S> Table<K, V, S> {
    fn entry_at(&self, c: Cursor) -> Option<&Entry<K, V>> {
        self.buckets.get(c.bucket)?.get(c.pos)
    }

    fn entry_at_mut(&mut self, c: Cursor) -> Option<&mut Entry<K, V>> {
        self.buckets.get_mut(c.bucket)?.get_mut(c.pos)
    }

    fn end(&self) -> Cursor {
        Cursor {
            bucket: self.buckets.len(),
            pos: 0,
        }
    }

    // First entry at or after bucket `from`, position 0.
    fn next_from(&self, from: usize) -> Cursor {
        for bucket in from..self.buckets.len() {
            if !self.buckets[bucket].is_empty() {
                return Cursor { bucket, pos: 0 };
            }
        }
        self.end()
    }
}

fn empty_buckets<K, V>(capacity: usize) -> Vec<Bucket<K, V>> {
    debug_assert!(capacity > 0);
    (0..capacity).map(|_| SmallVec::new()).collect()
}

/// A hash map built on separate chaining, generic over key, value, and hash
/// state.
///
/// Semantics that differ from `std::collections::HashMap`:
/// - [`insert`](ChainMap::insert) never overwrites: the first value stored
///   under a key wins until that key is removed.
/// - The bucket array shrinks as well as grows; see [`remove`](ChainMap::remove).
///
/// Single-threaded by design: exclusive access is assumed, and a debug-only
/// guard panics on reentrant use from user `Eq`/`Hash` code during probes.
pub struct ChainMap<K, V, S = RandomState> {
    table: Table<K, V, S>,
    guard: DebugExclusive,
}

impl<K, V> ChainMap<K, V>
where
    K: Eq + Hash,
{
    /// Create an empty map with [`BASE_CAPACITY`] buckets and a random hash
    /// state.
    pub fn new() -> Self {
        Self::with_hasher(RandomState::new())
    }
}

impl<K, V> Default for ChainMap<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> ChainMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    /// Create an empty map using the supplied hash state. The state is fixed
    /// for the map's lifetime and reused unchanged across rehashes.
    pub fn with_hasher(hasher: S) -> Self {
        Self {
            table: Table::with_hasher(hasher),
            guard: DebugExclusive::new(),
        }
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.table.len
    }

    pub fn is_empty(&self) -> bool {
        self.table.len == 0
    }

    /// Current bucket count. Always at least 1; grows and shrinks with the
    /// entry count.
    pub fn capacity(&self) -> usize {
        self.table.buckets.len()
    }

    /// The hash state supplied at construction.
    pub fn hasher(&self) -> &S {
        &self.table.hasher
    }

    /// Insert `(key, value)` if `key` is absent. Returns `true` when the pair
    /// was stored.
    ///
    /// This is insert-if-absent, not upsert: when the key is already present
    /// the call returns `false` and the stored value is **not** replaced.
    /// After an actual insertion, the map grows (rehashing every entry into
    /// `capacity * GROWTH_FACTOR` buckets) once the entry count exceeds the
    /// bucket count. A duplicate no-op never triggers growth.
    pub fn insert(&mut self, key: K, value: V) -> bool {
        let _g = self.guard.enter();
        self.table.insert(key, value)
    }

    /// Remove `key`'s entry, returning its value; absent keys are a no-op.
    ///
    /// After a successful removal the map shrinks to `capacity / GROWTH_FACTOR`
    /// buckets when the remaining count equals `capacity / (GROWTH_FACTOR * 2)`
    /// **exactly** (and the halved capacity is still nonzero). The trigger is
    /// an equality test, not a threshold: a count that never lands precisely
    /// on the trigger point between rehashes skips the shrink entirely. This
    /// is intentional, kept for compatibility with the behavior this map
    /// replicates; see DESIGN.md before "fixing" it.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.guard.enter();
        self.table.remove(key)
    }

    /// Borrow the value stored under `key`.
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.guard.enter();
        let (b, pos) = self.table.locate(key)?;
        Some(&self.table.buckets[b][pos].value)
    }

    /// Mutably borrow the value stored under `key`.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.guard.enter();
        let (b, pos) = self.table.locate(key)?;
        Some(&mut self.table.buckets[b][pos].value)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.guard.enter();
        self.table.locate(key).is_some()
    }

    /// Borrow the value stored under `key`, failing with [`KeyNotFound`] when
    /// absent. Never inserts.
    pub fn at<Q>(&self, key: &Q) -> Result<&V, KeyNotFound>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.get(key).ok_or(KeyNotFound)
    }

    /// Cursor lookup: the position of `key`'s entry, or a cursor equal to
    /// [`end`](ChainMap::end) when the key is absent.
    pub fn find<Q>(&self, key: &Q) -> Cursor
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.guard.enter();
        match self.table.locate(key) {
            Some((bucket, pos)) => Cursor { bucket, pos },
            None => self.table.end(),
        }
    }

    /// Borrow the value under `key`, inserting `(key, V::default())` first
    /// when the key is absent.
    ///
    /// The miss path performs the same growth check and chain append as
    /// [`insert`](ChainMap::insert); exactly one value is constructed either
    /// way. Losing track of the entry between the append and the returned
    /// reference would mean the hash state is inconsistent, which is a broken
    /// invariant and panics.
    pub fn entry_or_default(&mut self, key: K) -> &mut V
    where
        V: Default,
    {
        let _g = self.guard.enter();
        let table = &mut self.table;
        if let Some((b, pos)) = table.locate(&key) {
            return &mut table.buckets[b][pos].value;
        }
        // Absent. Rehashing would scatter a just-pushed entry to an unknown
        // slot, so run the growth step up front; the condition is the same
        // one insert applies after its append (len + 1 > capacity).
        if table.len + 1 > table.buckets.len() {
            table.rehash(table.buckets.len() * GROWTH_FACTOR);
        }
        let b = table.bucket_of(&key);
        table.buckets[b].push(Entry {
            key,
            value: V::default(),
        });
        table.len += 1;
        let entry = table.buckets[b].last_mut().expect("entry just pushed");
        &mut entry.value
    }

    /// Drop every entry and reset to [`BASE_CAPACITY`] empty buckets, keeping
    /// the hash state. Equivalent to rebuilding the map with the same hasher.
    pub fn clear(&mut self) {
        let _g = self.guard.enter();
        self.table.clear();
    }

    /// Cursor of the first live entry in iteration order, or
    /// [`end`](ChainMap::end) on an empty map.
    pub fn begin(&self) -> Cursor {
        self.table.next_from(0)
    }

    /// The end sentinel: one past the last bucket. Equal to every other
    /// `end()` cursor taken from this map at the same capacity.
    pub fn end(&self) -> Cursor {
        self.table.end()
    }

    /// Step a cursor to the next entry: the next slot of the same bucket, or
    /// the first slot of the next non-empty bucket, or [`end`](ChainMap::end).
    /// Advancing `end()` (or any out-of-range cursor) yields `end()`.
    pub fn advance(&self, c: Cursor) -> Cursor {
        let Some(bucket) = self.table.buckets.get(c.bucket) else {
            return self.table.end();
        };
        if c.pos + 1 < bucket.len() {
            return Cursor {
                bucket: c.bucket,
                pos: c.pos + 1,
            };
        }
        self.table.next_from(c.bucket + 1)
    }

    /// Iterate over `(&K, &V)` pairs: ascending bucket index, insertion order
    /// within a bucket. The order is not stable across rehashes.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            buckets: self.table.buckets.iter(),
            current: [].iter(),
            remaining: self.table.len,
        }
    }

    /// Iterate over `(&K, &mut V)` pairs in the same order as
    /// [`iter`](ChainMap::iter).
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        let remaining = self.table.len;
        IterMut {
            buckets: self.table.buckets.iter_mut(),
            current: [].iter_mut(),
            remaining,
        }
    }
}

impl<K, V, S> Clone for ChainMap<K, V, S>
where
    K: Eq + Hash + Clone,
    V: Clone,
    S: BuildHasher + Clone,
{
    /// Deep copy: a fresh map with a clone of the source's hash state,
    /// rebuilt by re-inserting every live entry. Rebuilding through the
    /// insert path (rather than cloning the bucket array) re-validates the
    /// placement invariant as a side effect.
    fn clone(&self) -> Self {
        let mut copy = Self::with_hasher(self.table.hasher.clone());
        for (k, v) in self.iter() {
            copy.table.insert(k.clone(), v.clone());
        }
        copy
    }

    fn clone_from(&mut self, source: &Self) {
        self.table.hasher = source.table.hasher.clone();
        self.table.clear();
        for (k, v) in source.iter() {
            self.table.insert(k.clone(), v.clone());
        }
    }
}

impl<K, V, S> fmt::Debug for ChainMap<K, V, S>
where
    K: Eq + Hash + fmt::Debug,
    V: fmt::Debug,
    S: BuildHasher,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, S> FromIterator<(K, V)> for ChainMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher + Default,
{
    /// Inserts each pair in order; a pair whose key is already present is
    /// ignored (first write wins, matching [`insert`](ChainMap::insert)).
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::with_hasher(S::default());
        map.extend(iter);
        map
    }
}

impl<K, V, S> Extend<(K, V)> for ChainMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        let _g = self.guard.enter();
        for (k, v) in iter {
            self.table.insert(k, v);
        }
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for ChainMap<K, V>
where
    K: Eq + Hash,
{
    /// Literal-list construction with first-write-wins dedup:
    /// `ChainMap::from([(1, "a"), (1, "c")])` stores `"a"`.
    fn from(pairs: [(K, V); N]) -> Self {
        let mut map = Self::new();
        map.extend(pairs);
        map
    }
}

/// Immutable entry iterator. Exact-size and fused.
pub struct Iter<'a, K, V> {
    buckets: std::slice::Iter<'a, Bucket<K, V>>,
    current: std::slice::Iter<'a, Entry<K, V>>,
    remaining: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(e) = self.current.next() {
                self.remaining -= 1;
                return Some((&e.key, &e.value));
            }
            self.current = self.buckets.next()?.iter();
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}
impl<K, V> core::iter::FusedIterator for Iter<'_, K, V> {}

/// Mutable entry iterator; keys stay immutable.
pub struct IterMut<'a, K, V> {
    buckets: std::slice::IterMut<'a, Bucket<K, V>>,
    current: std::slice::IterMut<'a, Entry<K, V>>,
    remaining: usize,
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(e) = self.current.next() {
                self.remaining -= 1;
                return Some((&e.key, &mut e.value));
            }
            self.current = self.buckets.next()?.iter_mut();
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for IterMut<'_, K, V> {}
impl<K, V> core::iter::FusedIterator for IterMut<'_, K, V> {}

/// Owning entry iterator.
pub struct IntoIter<K, V> {
    buckets: std::vec::IntoIter<Bucket<K, V>>,
    current: smallvec::IntoIter<[Entry<K, V>; 1]>,
    remaining: usize,
}

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(e) = self.current.next() {
                self.remaining -= 1;
                return Some((e.key, e.value));
            }
            self.current = self.buckets.next()?.into_iter();
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for IntoIter<K, V> {}
impl<K, V> core::iter::FusedIterator for IntoIter<K, V> {}

impl<K, V, S> IntoIterator for ChainMap<K, V, S> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            remaining: self.table.len,
            buckets: self.table.buckets.into_iter(),
            current: SmallVec::new().into_iter(),
        }
    }
}

impl<'a, K, V, S> IntoIterator for &'a ChainMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V, S> IntoIterator for &'a mut ChainMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}
