//! Sequence-like tracked container

use super::{clone_monitor, Frozen, Tracked};
use crate::instance::InstanceRef;
use crate::monitor::Monitor;
use crate::tracked::{MutatingOp, TrackedType};
use std::fmt;
use std::ops::{Deref, Index, IndexMut, RangeBounds};
use std::panic::Location;
use std::slice::{IterMut, SliceIndex};
use std::sync::Arc;
use std::vec::Drain;

/// `Vec` whose mutations can be observed during a watch cycle
pub struct WatchedVec<T> {
    inner: Vec<T>,
    instance: InstanceRef,
}

impl<T> WatchedVec<T> {
    /// Empty sequence tracked by the global monitor
    #[must_use]
    pub fn new() -> Self {
        Self::new_in(Monitor::global())
    }

    /// Empty sequence tracked by `monitor`
    #[must_use]
    pub fn new_in(monitor: &Arc<Monitor>) -> Self {
        Self::from_vec_in(Vec::new(), monitor)
    }

    /// Wrap an existing vector, tracked by `monitor`
    #[must_use]
    pub fn from_vec_in(inner: Vec<T>, monitor: &Arc<Monitor>) -> Self {
        Self {
            inner,
            instance: monitor.track(TrackedType::Sequence, false),
        }
    }

    /// Sequence owned by racewatch itself; never instrumented or reported
    pub(crate) fn bookkeeping_in(monitor: &Arc<Monitor>) -> Self {
        Self {
            inner: Vec::new(),
            instance: monitor.track(TrackedType::Sequence, true),
        }
    }

    /// Freeze into a read-only handle
    #[must_use]
    pub fn freeze(self) -> Frozen<Self> {
        Frozen::new(self)
    }

    /// Unwrap the underlying vector
    #[must_use]
    pub fn into_inner(self) -> Vec<T> {
        self.inner
    }

    #[inline]
    #[track_caller]
    fn intercept(&self, op: MutatingOp) {
        self.instance.intercept(op, Location::caller());
    }

    /// Append an element
    #[track_caller]
    pub fn push(&mut self, value: T) {
        self.intercept(MutatingOp::Push);
        self.inner.push(value);
    }

    /// Remove the last element
    #[track_caller]
    pub fn pop(&mut self) -> Option<T> {
        self.intercept(MutatingOp::Pop);
        self.inner.pop()
    }

    /// Insert at `index`, shifting later elements
    ///
    /// # Panics
    /// If `index > len`, exactly as `Vec::insert`.
    #[track_caller]
    pub fn insert(&mut self, index: usize, value: T) {
        self.intercept(MutatingOp::Insert);
        self.inner.insert(index, value);
    }

    /// Remove at `index`, shifting later elements
    ///
    /// # Panics
    /// If `index` is out of bounds, exactly as `Vec::remove`.
    #[track_caller]
    pub fn remove(&mut self, index: usize) -> T {
        self.intercept(MutatingOp::Remove);
        self.inner.remove(index)
    }

    /// Remove at `index`, moving the last element into the hole
    ///
    /// # Panics
    /// If `index` is out of bounds.
    #[track_caller]
    pub fn swap_remove(&mut self, index: usize) -> T {
        self.intercept(MutatingOp::SwapRemove);
        self.inner.swap_remove(index)
    }

    /// Remove everything
    #[track_caller]
    pub fn clear(&mut self) {
        self.intercept(MutatingOp::Clear);
        self.inner.clear();
    }

    /// Append every element of `iter`
    #[track_caller]
    pub fn extend<I>(&mut self, iter: I)
    where
        I: IntoIterator<Item = T>,
    {
        self.intercept(MutatingOp::Extend);
        self.inner.extend(iter);
    }

    /// Move every element out of `other`
    #[track_caller]
    pub fn append(&mut self, other: &mut Vec<T>) {
        self.intercept(MutatingOp::Append);
        self.inner.append(other);
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

    /// Shorten to `len` elements
    #[track_caller]
    pub fn truncate(&mut self, len: usize) {
        self.intercept(MutatingOp::Truncate);
        self.inner.truncate(len);
    }

    /// Reverse in place
    #[track_caller]
    pub fn reverse(&mut self) {
        self.intercept(MutatingOp::Reverse);
        self.inner.reverse();
    }

    /// Sort with a comparator
    #[track_caller]
    pub fn sort_by<F>(&mut self, compare: F)
    where
        F: FnMut(&T, &T) -> std::cmp::Ordering,
    {
        self.intercept(MutatingOp::Sort);
        self.inner.sort_by(compare);
    }

    /// Remove and yield a range
    #[track_caller]
    pub fn drain<R>(&mut self, range: R) -> Drain<'_, T>
    where
        R: RangeBounds<usize>,
    {
        self.intercept(MutatingOp::Drain);
        self.inner.drain(range)
    }

    /// Split off the tail starting at `at`
    ///
    /// The returned vector is a plain `Vec`, not a tracked instance.
    #[track_caller]
    pub fn split_off(&mut self, at: usize) -> Vec<T> {
        self.intercept(MutatingOp::SplitOff);
        self.inner.split_off(at)
    }

    /// Swap two elements
    #[track_caller]
    pub fn swap(&mut self, a: usize, b: usize) {
        self.intercept(MutatingOp::Swap);
        self.inner.swap(a, b);
    }

    /// Swap in new contents, returning the old ones
    #[track_caller]
    pub fn replace_contents(&mut self, contents: Vec<T>) -> Vec<T> {
        self.intercept(MutatingOp::ReplaceContents);
        std::mem::replace(&mut self.inner, contents)
    }

    /// Mutable access to one element
    #[track_caller]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.intercept(MutatingOp::GetMut);
        self.inner.get_mut(index)
    }

    /// Mutable iteration
    #[track_caller]
    pub fn iter_mut(&mut self) -> IterMut<'_, T> {
        self.intercept(MutatingOp::IterMut);
        self.inner.iter_mut()
    }
}

impl<T: Clone> WatchedVec<T> {
    /// Grow or shrink to `len`, filling with `value`
    #[track_caller]
    pub fn resize(&mut self, len: usize, value: T) {
        self.intercept(MutatingOp::Resize);
        self.inner.resize(len, value);
    }

    /// Overwrite every element with `value`
    #[track_caller]
    pub fn fill(&mut self, value: T) {
        self.intercept(MutatingOp::Fill);
        self.inner.fill(value);
    }
}

impl<T: Ord> WatchedVec<T> {
    /// Sort in place
    #[track_caller]
    pub fn sort(&mut self) {
        self.intercept(MutatingOp::Sort);
        self.inner.sort();
    }
}

impl<T: PartialEq> WatchedVec<T> {
    /// Remove consecutive duplicates
    #[track_caller]
    pub fn dedup(&mut self) {
        self.intercept(MutatingOp::Dedup);
        self.inner.dedup();
    }
}

impl<T> Tracked for WatchedVec<T> {
    fn instance(&self) -> &InstanceRef {
        &self.instance
    }
}

impl<T> Deref for WatchedVec<T> {
    type Target = Vec<T>;

    fn deref(&self) -> &Vec<T> {
        &self.inner
    }
}

impl<T, I: SliceIndex<[T]>> Index<I> for WatchedVec<T> {
    type Output = I::Output;

    fn index(&self, index: I) -> &Self::Output {
        &self.inner[index]
    }
}

impl<T, I: SliceIndex<[T]>> IndexMut<I> for WatchedVec<T> {
    #[track_caller]
    fn index_mut(&mut self, index: I) -> &mut Self::Output {
        self.intercept(MutatingOp::IndexMut);
        &mut self.inner[index]
    }
}

impl<T> Default for WatchedVec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> Clone for WatchedVec<T> {
    /// The clone is a new instance with its own identity
    fn clone(&self) -> Self {
        Self::from_vec_in(self.inner.clone(), &clone_monitor(&self.instance))
    }
}

impl<T: fmt::Debug> fmt::Debug for WatchedVec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchedVec")
            .field("id", &self.instance.id())
            .field("inner", &self.inner)
            .finish()
    }
}

impl<T> FromIterator<T> for WatchedVec<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_vec_in(iter.into_iter().collect(), Monitor::global())
    }
}

impl<'a, T> IntoIterator for &'a WatchedVec<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.iter()
    }
}
