//! Set-like tracked container

use super::{clone_monitor, Frozen, Tracked};
use crate::instance::InstanceRef;
use crate::monitor::Monitor;
use crate::tracked::{MutatingOp, TrackedType};
use std::borrow::Borrow;
use std::collections::hash_set::Drain;
use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;
use std::ops::Deref;
use std::panic::Location;
use std::sync::Arc;

/// `HashSet` whose mutations can be observed during a watch cycle
pub struct WatchedSet<T> {
    inner: HashSet<T>,
    instance: InstanceRef,
}

impl<T> WatchedSet<T> {
    /// Empty set tracked by the global monitor
    #[must_use]
    pub fn new() -> Self {
        Self::new_in(Monitor::global())
    }

    /// Empty set tracked by `monitor`
    #[must_use]
    pub fn new_in(monitor: &Arc<Monitor>) -> Self {
        Self::from_set_in(HashSet::new(), monitor)
    }

    /// Wrap an existing set, tracked by `monitor`
    #[must_use]
    pub fn from_set_in(inner: HashSet<T>, monitor: &Arc<Monitor>) -> Self {
        Self {
            inner,
            instance: monitor.track(TrackedType::Set, false),
        }
    }

    /// Freeze into a read-only handle
    #[must_use]
    pub fn freeze(self) -> Frozen<Self> {
        Frozen::new(self)
    }

    /// Unwrap the underlying set
    #[must_use]
    pub fn into_inner(self) -> HashSet<T> {
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

    /// Remove and yield every element
    #[track_caller]
    pub fn drain(&mut self) -> Drain<'_, T> {
        self.intercept(MutatingOp::Drain);
        self.inner.drain()
    }

    /// Keep only elements matching `f`
    #[track_caller]
    pub fn retain<F>(&mut self, f: F)
    where
        F: FnMut(&T) -> bool,
    {
        self.intercept(MutatingOp::Retain);
        self.inner.retain(f);
    }

    /// Swap in new contents, returning the old ones
    #[track_caller]
    pub fn replace_contents(&mut self, contents: HashSet<T>) -> HashSet<T> {
        self.intercept(MutatingOp::ReplaceContents);
        std::mem::replace(&mut self.inner, contents)
    }
}

impl<T: Eq + Hash> WatchedSet<T> {
    /// Add a value; returns whether it was newly inserted
    #[track_caller]
    pub fn insert(&mut self, value: T) -> bool {
        self.intercept(MutatingOp::Insert);
        self.inner.insert(value)
    }

    /// Remove a value; returns whether it was present
    #[track_caller]
    pub fn remove<Q>(&mut self, value: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.intercept(MutatingOp::Remove);
        self.inner.remove(value)
    }

    /// Remove and return the stored value equal to `value`
    #[track_caller]
    pub fn take<Q>(&mut self, value: &Q) -> Option<T>
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.intercept(MutatingOp::Take);
        self.inner.take(value)
    }

    /// Add every value from `iter`
    #[track_caller]
    pub fn extend<I>(&mut self, iter: I)
    where
        I: IntoIterator<Item = T>,
    {
        self.intercept(MutatingOp::Extend);
        self.inner.extend(iter);
    }
}

impl<T> Tracked for WatchedSet<T> {
    fn instance(&self) -> &InstanceRef {
        &self.instance
    }
}

impl<T> Deref for WatchedSet<T> {
    type Target = HashSet<T>;

    fn deref(&self) -> &HashSet<T> {
        &self.inner
    }
}

impl<T> Default for WatchedSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> Clone for WatchedSet<T> {
    /// The clone is a new instance with its own identity
    fn clone(&self) -> Self {
        Self::from_set_in(self.inner.clone(), &clone_monitor(&self.instance))
    }
}

impl<T: fmt::Debug> fmt::Debug for WatchedSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchedSet")
            .field("id", &self.instance.id())
            .field("inner", &self.inner)
            .finish()
    }
}

impl<T: Eq + Hash> FromIterator<T> for WatchedSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_set_in(iter.into_iter().collect(), Monitor::global())
    }
}

impl<'a, T> IntoIterator for &'a WatchedSet<T> {
    type Item = &'a T;
    type IntoIter = std::collections::hash_set::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.iter()
    }
}
