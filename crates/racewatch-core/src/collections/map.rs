//! Map-like tracked container

use super::{clone_monitor, Frozen, Tracked};
use crate::instance::InstanceRef;
use crate::monitor::Monitor;
use crate::tracked::{MutatingOp, TrackedType};
use std::borrow::Borrow;
use std::collections::hash_map::{Drain, Entry, IterMut, ValuesMut};
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::ops::Deref;
use std::panic::Location;
use std::sync::Arc;

/// `HashMap` whose mutations can be observed during a watch cycle
pub struct WatchedMap<K, V> {
    inner: HashMap<K, V>,
    instance: InstanceRef,
}

impl<K, V> WatchedMap<K, V> {
    /// Empty map tracked by the global monitor
    #[must_use]
    pub fn new() -> Self {
        Self::new_in(Monitor::global())
    }

    /// Empty map tracked by `monitor`
    #[must_use]
    pub fn new_in(monitor: &Arc<Monitor>) -> Self {
        Self::from_map_in(HashMap::new(), monitor)
    }

    /// Wrap an existing map, tracked by `monitor`
    #[must_use]
    pub fn from_map_in(inner: HashMap<K, V>, monitor: &Arc<Monitor>) -> Self {
        Self {
            inner,
            instance: monitor.track(TrackedType::Map, false),
        }
    }

    /// Freeze into a read-only handle
    #[must_use]
    pub fn freeze(self) -> Frozen<Self> {
        Frozen::new(self)
    }

    /// Unwrap the underlying map
    #[must_use]
    pub fn into_inner(self) -> HashMap<K, V> {
        self.inner
    }

    #[inline]
    #[track_caller]
    fn intercept(&self, op: MutatingOp) {
        self.instance.intercept(op, Location::caller());
    }

    /// Remove everything
    #[track_caller]
    pub fn clear(&mut self) {
        self.intercept(MutatingOp::Clear);
        self.inner.clear();
    }

    /// Remove and yield every entry
    #[track_caller]
    pub fn drain(&mut self) -> Drain<'_, K, V> {
        self.intercept(MutatingOp::Drain);
        self.inner.drain()
    }

    /// Keep only entries matching `f`
    #[track_caller]
    pub fn retain<F>(&mut self, f: F)
    where
        F: FnMut(&K, &mut V) -> bool,
    {
        self.intercept(MutatingOp::Retain);
        self.inner.retain(f);
    }

    /// Mutable iteration
    #[track_caller]
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        self.intercept(MutatingOp::IterMut);
        self.inner.iter_mut()
    }

    /// Mutable iteration over values
    #[track_caller]
    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V> {
        self.intercept(MutatingOp::ValuesMut);
        self.inner.values_mut()
    }

    /// Swap in new contents, returning the old ones
    #[track_caller]
    pub fn replace_contents(&mut self, contents: HashMap<K, V>) -> HashMap<K, V> {
        self.intercept(MutatingOp::ReplaceContents);
        std::mem::replace(&mut self.inner, contents)
    }
}

impl<K: Eq + Hash, V> WatchedMap<K, V> {
    /// Insert a key/value pair
    #[track_caller]
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.intercept(MutatingOp::Insert);
        self.inner.insert(key, value)
    }

    /// Remove a key
    #[track_caller]
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.intercept(MutatingOp::Remove);
        self.inner.remove(key)
    }

    /// Remove a key, returning the stored key and value
    #[track_caller]
    pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.intercept(MutatingOp::RemoveEntry);
        self.inner.remove_entry(key)
    }

    /// Insert every pair from `iter`
    #[track_caller]
    pub fn extend<I>(&mut self, iter: I)
    where
        I: IntoIterator<Item = (K, V)>,
    {
        self.intercept(MutatingOp::Extend);
        self.inner.extend(iter);
    }

    /// Entry handle for in-place manipulation
    #[track_caller]
    pub fn entry(&mut self, key: K) -> Entry<'_, K, V> {
        self.intercept(MutatingOp::Entry);
        self.inner.entry(key)
    }

    /// Mutable access to a value
    #[track_caller]
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.intercept(MutatingOp::GetMut);
        self.inner.get_mut(key)
    }
}

impl<K, V> Tracked for WatchedMap<K, V> {
    fn instance(&self) -> &InstanceRef {
        &self.instance
    }
}

impl<K, V> Deref for WatchedMap<K, V> {
    type Target = HashMap<K, V>;

    fn deref(&self) -> &HashMap<K, V> {
        &self.inner
    }
}

impl<K, V> Default for WatchedMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clone, V: Clone> Clone for WatchedMap<K, V> {
    /// The clone is a new instance with its own identity
    fn clone(&self) -> Self {
        Self::from_map_in(self.inner.clone(), &clone_monitor(&self.instance))
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for WatchedMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchedMap")
            .field("id", &self.instance.id())
            .field("inner", &self.inner)
            .finish()
    }
}

impl<K: Eq + Hash, V> FromIterator<(K, V)> for WatchedMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from_map_in(iter.into_iter().collect(), Monitor::global())
    }
}

impl<'a, K, V> IntoIterator for &'a WatchedMap<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = std::collections::hash_map::Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn behaves_like_hash_map_when_unwatched() {
        let monitor = Monitor::new();
        let mut map = WatchedMap::new_in(&monitor);

        assert_eq!(map.insert("a", 1), None);
        assert_eq!(map.insert("a", 2), Some(1));
        *map.entry("b").or_insert(0) += 5;
        if let Some(v) = map.get_mut("a") {
            *v += 1;
        }
        assert_eq!(map.get("a"), Some(&3));
        assert_eq!(map["b"], 5);

        map.retain(|_, v| *v > 4);
        assert_eq!(map.len(), 1);
        assert_eq!(map.remove_entry("b"), Some(("b", 5)));
        assert!(map.is_empty());
        assert_eq!(monitor.registry().write_attempts(), 0);
    }

    #[test]
    fn replace_contents_returns_previous() {
        let monitor = Monitor::new();
        let mut map = WatchedMap::new_in(&monitor);
        map.insert(1, "one");

        let old = map.replace_contents(HashMap::from([(2, "two")]));
        assert_eq!(old.get(&1), Some(&"one"));
        assert!(map.contains_key(&2));
        assert!(!map.contains_key(&1));
    }

    #[test]
    fn clone_gets_new_identity_in_same_monitor() {
        let monitor = Monitor::new();
        let mut map = WatchedMap::new_in(&monitor);
        map.insert(1, 1);

        let copy = map.clone();
        assert_ne!(copy.id(), map.id());
        assert_eq!(*copy, *map);
        assert_eq!(monitor.live_instances(TrackedType::Map).len(), 2);
    }

    #[test]
    fn freeze_marks_instance() {
        let monitor = Monitor::new();
        let mut map = WatchedMap::new_in(&monitor);
        map.insert("k", "v");

        let frozen = map.freeze();
        assert!(frozen.instance().is_frozen());
        assert_eq!(frozen.get("k"), Some(&"v"));
    }

    #[test]
    fn drain_and_values_mut() {
        let monitor = Monitor::new();
        let mut map = WatchedMap::from_map_in(HashMap::from([(1, 10), (2, 20)]), &monitor);
        for v in map.values_mut() {
            *v += 1;
        }
        let mut drained: Vec<(i32, i32)> = map.drain().collect();
        drained.sort_unstable();
        assert_eq!(drained, vec![(1, 11), (2, 21)]);
        assert!(map.is_empty());
    }
}
