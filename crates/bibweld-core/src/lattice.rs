//! Keyed collections with merge-on-insert semantics.
//!
//! Two keys may compare equal while carrying different amounts of
//! information (an author known only by initials vs. the same author with
//! a full given name). Inserting a key that is already present never
//! replaces the stored value: the stored value absorbs the newcomer, and
//! its handle stays valid for the lifetime of the collection. External
//! indices can therefore hold handles across arbitrarily many merges.

use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use rustc_hash::{FxHashMap, FxHashSet, FxHasher};

/// A key that can live in a [`DedupSet`].
///
/// `bucket_hash` must be a refinement of `same_key`: any two keys that
/// `same_key` accepts must feed identical data to the hasher. The reverse
/// does not hold — a bucket may contain several mutually unequal keys
/// (authors sharing a last name, paginated refs sharing a title).
/// `same_key` is not required to be transitive.
pub trait LatticeKey {
    fn bucket_hash<H: Hasher>(&self, state: &mut H);

    fn same_key(&self, other: &Self) -> bool;

    /// Absorb information from an equal key. Monotone: existing
    /// information is never cleared, only added to or refined.
    fn merge(&mut self, other: &Self);
}

/// Stable identity of a canonical value inside a [`DedupSet`].
pub struct Handle<T> {
    idx: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    fn new(idx: u32) -> Self {
        Handle {
            idx,
            _marker: PhantomData,
        }
    }

    /// Position of the canonical value in insertion order.
    pub fn index(self) -> usize {
        self.idx as usize
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> Copy for Handle<T> {}
impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.idx == other.idx
    }
}
impl<T> Eq for Handle<T> {}
impl<T> PartialOrd for Handle<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl<T> Ord for Handle<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.idx.cmp(&other.idx)
    }
}
impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.idx.hash(state);
    }
}
impl<T> std::fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Handle({})", self.idx)
    }
}

fn bucket_of<T: LatticeKey>(key: &T) -> u64 {
    let mut hasher = FxHasher::default();
    key.bucket_hash(&mut hasher);
    hasher.finish()
}

/// A set of canonical values addressed by stable handles.
///
/// Values live in an arena; buckets map a key hash to the slots it may
/// match. A slot, once allocated, is never moved or dropped.
pub struct DedupSet<T> {
    slots: Vec<T>,
    buckets: FxHashMap<u64, Vec<u32>>,
}

impl<T: LatticeKey> DedupSet<T> {
    pub fn new() -> Self {
        DedupSet {
            slots: Vec::new(),
            buckets: FxHashMap::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, handle: Handle<T>) -> &T {
        &self.slots[handle.index()]
    }

    pub fn get_mut(&mut self, handle: Handle<T>) -> &mut T {
        &mut self.slots[handle.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.slots.iter()
    }

    pub fn handles(&self) -> impl Iterator<Item = Handle<T>> {
        (0..self.slots.len() as u32).map(Handle::new)
    }

    /// Locate the canonical slot equal to `key` without touching it.
    pub fn find(&self, key: &T) -> Option<Handle<T>> {
        let bucket = self.buckets.get(&bucket_of(key))?;
        bucket
            .iter()
            .find(|&&idx| self.slots[idx as usize].same_key(key))
            .map(|&idx| Handle::new(idx))
    }

    pub fn contains(&self, key: &T) -> bool {
        self.find(key).is_some()
    }

    /// Locate the canonical slot equal to `key`, absorbing `key`'s
    /// information into it on a hit. Even a lookup carries information:
    /// a probing ref with a tighter page range narrows the stored one.
    pub fn probe(&mut self, key: &T) -> Option<Handle<T>> {
        let handle = self.find(key)?;
        self.slots[handle.index()].merge(key);
        Some(handle)
    }

    /// Insert `key`, or absorb it into the equal slot already present.
    /// The returned handle is stable for the lifetime of the set.
    pub fn get_or_insert(&mut self, key: T) -> Handle<T> {
        let hash = bucket_of(&key);
        let bucket = self.buckets.entry(hash).or_default();
        for &idx in bucket.iter() {
            if self.slots[idx as usize].same_key(&key) {
                self.slots[idx as usize].merge(&key);
                return Handle::new(idx);
            }
        }
        let idx = self.slots.len() as u32;
        bucket.push(idx);
        self.slots.push(key);
        Handle::new(idx)
    }

    /// `get_or_insert` every element; canonical handles in input order.
    pub fn update<I: IntoIterator<Item = T>>(&mut self, keys: I) -> Vec<Handle<T>> {
        keys.into_iter().map(|k| self.get_or_insert(k)).collect()
    }

    /// Handles of stored keys equal to some element of `other`.
    pub fn intersection<'a, I>(&self, other: I) -> Vec<Handle<T>>
    where
        I: IntoIterator<Item = &'a T>,
        T: 'a,
    {
        let mut seen = FxHashSet::default();
        let mut out = Vec::new();
        for key in other {
            if let Some(handle) = self.find(key) {
                if seen.insert(handle) {
                    out.push(handle);
                }
            }
        }
        out
    }

    /// Handles of stored keys equal to no element of `other`.
    pub fn difference<'a, I>(&self, other: I) -> Vec<Handle<T>>
    where
        I: IntoIterator<Item = &'a T>,
        T: 'a,
    {
        let matched: FxHashSet<Handle<T>> = self.intersection(other).into_iter().collect();
        self.handles().filter(|h| !matched.contains(h)).collect()
    }
}

impl<T: LatticeKey> Default for DedupSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: LatticeKey> Extend<T> for DedupSet<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for key in iter {
            self.get_or_insert(key);
        }
    }
}

impl<T: LatticeKey> FromIterator<T> for DedupSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = DedupSet::new();
        set.extend(iter);
        set
    }
}

/// A map whose keys deduplicate like a [`DedupSet`]. The value slot is
/// tied to the canonical key's identity, so two equal-but-distinct input
/// keys resolve to a single slot.
pub struct DedupMap<K, V> {
    keys: DedupSet<K>,
    values: Vec<V>,
}

impl<K: LatticeKey, V> DedupMap<K, V> {
    pub fn new() -> Self {
        DedupMap {
            keys: DedupSet::new(),
            values: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn key(&self, handle: Handle<K>) -> &K {
        self.keys.get(handle)
    }

    pub fn value(&self, handle: Handle<K>) -> &V {
        &self.values[handle.index()]
    }

    pub fn value_mut(&mut self, handle: Handle<K>) -> &mut V {
        &mut self.values[handle.index()]
    }

    pub fn find(&self, key: &K) -> Option<Handle<K>> {
        self.keys.find(key)
    }

    /// Probing lookup: absorbs `key` into the canonical key on a hit.
    pub fn get(&mut self, key: &K) -> Option<(Handle<K>, &V)> {
        let handle = self.keys.probe(key)?;
        Some((handle, &self.values[handle.index()]))
    }

    /// Insert or overwrite the value under the canonical key for `key`.
    pub fn insert(&mut self, key: K, value: V) -> Handle<K> {
        let handle = self.keys.get_or_insert(key);
        if handle.index() == self.values.len() {
            self.values.push(value);
        } else {
            self.values[handle.index()] = value;
        }
        handle
    }

    pub fn set_value(&mut self, handle: Handle<K>, value: V) {
        self.values[handle.index()] = value;
    }

    pub fn update<I: IntoIterator<Item = (K, V)>>(&mut self, entries: I) -> Vec<Handle<K>> {
        entries
            .into_iter()
            .map(|(k, v)| self.insert(k, v))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.keys.iter().zip(self.values.iter())
    }

    pub fn handles(&self) -> impl Iterator<Item = Handle<K>> {
        self.keys.handles()
    }
}

impl<K: LatticeKey, V> Default for DedupMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

/// A [`DedupMap`] whose value slot is a set; inserts union.
pub struct DedupMultimap<K, V> {
    keys: DedupSet<K>,
    values: Vec<FxHashSet<V>>,
}

impl<K: LatticeKey, V: Eq + Hash> DedupMultimap<K, V> {
    pub fn new() -> Self {
        DedupMultimap {
            keys: DedupSet::new(),
            values: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn key(&self, handle: Handle<K>) -> &K {
        self.keys.get(handle)
    }

    pub fn values(&self, handle: Handle<K>) -> &FxHashSet<V> {
        &self.values[handle.index()]
    }

    pub fn find(&self, key: &K) -> Option<Handle<K>> {
        self.keys.find(key)
    }

    pub fn get(&mut self, key: &K) -> Option<(Handle<K>, &FxHashSet<V>)> {
        let handle = self.keys.probe(key)?;
        Some((handle, &self.values[handle.index()]))
    }

    /// Add `value` to the set under the canonical key for `key`.
    pub fn insert(&mut self, key: K, value: V) -> Handle<K> {
        let handle = self.keys.get_or_insert(key);
        if handle.index() == self.values.len() {
            self.values.push(FxHashSet::default());
        }
        self.values[handle.index()].insert(value);
        handle
    }

    pub fn add_value(&mut self, handle: Handle<K>, value: V) {
        self.values[handle.index()].insert(value);
    }

    pub fn update<I: IntoIterator<Item = (K, V)>>(&mut self, entries: I) -> Vec<Handle<K>> {
        entries
            .into_iter()
            .map(|(k, v)| self.insert(k, v))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &FxHashSet<V>)> {
        self.keys.iter().zip(self.values.iter())
    }

    pub fn handles(&self) -> impl Iterator<Item = Handle<K>> {
        self.keys.handles()
    }
}

impl<K: LatticeKey, V: Eq + Hash> Default for DedupMultimap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Test key: equal on `word`, accumulating `count`.
    #[derive(Debug, Clone)]
    struct Tally {
        word: String,
        count: u32,
    }

    fn tally(word: &str, count: u32) -> Tally {
        Tally {
            word: word.to_string(),
            count,
        }
    }

    impl LatticeKey for Tally {
        fn bucket_hash<H: Hasher>(&self, state: &mut H) {
            self.word.hash(state);
        }

        fn same_key(&self, other: &Self) -> bool {
            self.word == other.word
        }

        fn merge(&mut self, other: &Self) {
            self.count += other.count;
        }
    }

    #[test]
    fn insert_absorbs_instead_of_replacing() {
        let mut set = DedupSet::new();
        let a = set.get_or_insert(tally("doi", 1));
        let b = set.get_or_insert(tally("doi", 2));
        assert_eq!(a, b);
        assert_eq!(set.len(), 1);
        assert_eq!(set.get(a).count, 3);
    }

    #[test]
    fn handles_stay_valid_across_growth() {
        let mut set = DedupSet::new();
        let first = set.get_or_insert(tally("a", 1));
        for i in 0..100 {
            set.get_or_insert(tally(&format!("k{i}"), 1));
        }
        set.get_or_insert(tally("a", 5));
        assert_eq!(set.get(first).word, "a");
        assert_eq!(set.get(first).count, 6);
    }

    #[test]
    fn probe_merges_on_hit() {
        let mut set = DedupSet::new();
        let h = set.get_or_insert(tally("a", 1));
        assert_eq!(set.probe(&tally("a", 10)), Some(h));
        assert_eq!(set.get(h).count, 11);
        assert!(set.probe(&tally("b", 1)).is_none());
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn find_is_pure() {
        let mut set = DedupSet::new();
        let h = set.get_or_insert(tally("a", 1));
        assert_eq!(set.find(&tally("a", 10)), Some(h));
        assert_eq!(set.get(h).count, 1);
    }

    #[test]
    fn update_returns_canonicals_in_input_order() {
        let mut set = DedupSet::new();
        let handles = set.update(vec![tally("x", 1), tally("y", 1), tally("x", 1)]);
        assert_eq!(handles.len(), 3);
        assert_eq!(handles[0], handles[2]);
        assert_ne!(handles[0], handles[1]);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn set_algebra_against_external_keys() {
        let mut set = DedupSet::new();
        set.extend(vec![tally("a", 1), tally("b", 1), tally("c", 1)]);
        let other = vec![tally("b", 0), tally("d", 0)];
        let inter = set.intersection(other.iter());
        assert_eq!(inter.len(), 1);
        assert_eq!(set.get(inter[0]).word, "b");
        let diff = set.difference(other.iter());
        let words: Vec<_> = diff.iter().map(|&h| set.get(h).word.as_str()).collect();
        assert_eq!(words, vec!["a", "c"]);
    }

    #[test]
    fn map_resolves_equal_keys_to_one_slot() {
        let mut map = DedupMap::new();
        let a = map.insert(tally("k", 1), "first");
        let b = map.insert(tally("k", 1), "second");
        assert_eq!(a, b);
        assert_eq!(map.len(), 1);
        assert_eq!(*map.value(a), "second");
        assert_eq!(map.key(a).count, 2);
    }

    #[test]
    fn map_get_probes_the_key() {
        let mut map = DedupMap::new();
        let h = map.insert(tally("k", 1), 7usize);
        let (found, value) = map.get(&tally("k", 3)).unwrap();
        assert_eq!(found, h);
        assert_eq!(*value, 7);
        assert_eq!(map.key(h).count, 4);
    }

    #[test]
    fn multimap_unions_values() {
        let mut mm = DedupMultimap::new();
        let a = mm.insert(tally("k", 1), 1u32);
        let b = mm.insert(tally("k", 1), 2u32);
        assert_eq!(a, b);
        assert_eq!(mm.values(a).len(), 2);
        mm.add_value(a, 2);
        assert_eq!(mm.values(a).len(), 2);
    }

    #[test]
    fn unequal_keys_share_a_bucket() {
        // Same bucket hash, different keys: both must be stored.
        #[derive(Debug, Clone)]
        struct Initialed {
            lname: String,
            initial: char,
        }
        impl LatticeKey for Initialed {
            fn bucket_hash<H: Hasher>(&self, state: &mut H) {
                self.lname.hash(state);
            }
            fn same_key(&self, other: &Self) -> bool {
                self.lname == other.lname && self.initial == other.initial
            }
            fn merge(&mut self, _other: &Self) {}
        }

        let mut set = DedupSet::new();
        let j = set.get_or_insert(Initialed {
            lname: "Smith".into(),
            initial: 'J',
        });
        let k = set.get_or_insert(Initialed {
            lname: "Smith".into(),
            initial: 'K',
        });
        assert_ne!(j, k);
        assert_eq!(set.len(), 2);
        assert_eq!(
            set.find(&Initialed {
                lname: "Smith".into(),
                initial: 'K'
            }),
            Some(k)
        );
    }
}
