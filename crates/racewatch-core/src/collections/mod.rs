//! Tracked container wrappers
//!
//! [`WatchedMap`], [`WatchedVec`] and [`WatchedSet`] wrap the std
//! collections. Reads go through `Deref`; every enumerated mutating
//! operation is a `#[track_caller]` method that reports to the instance's
//! agent (if one is attached) and then performs the std operation unchanged.

mod map;
mod set;
mod vec;

pub use map::WatchedMap;
pub use set::WatchedSet;
pub use vec::WatchedVec;

use crate::instance::{InstanceId, InstanceRef};
use crate::monitor::Monitor;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// Implemented by every tracked container
pub trait Tracked {
    /// Identity record of the instance
    fn instance(&self) -> &InstanceRef;

    /// Instance identity
    fn id(&self) -> InstanceId {
        self.instance().id()
    }
}

/// Read-only handle to a frozen tracked container
///
/// Freezing marks the instance so `inject` never attaches an agent to it.
/// The handle exposes only shared access, so the container can no longer be
/// mutated.
pub struct Frozen<T>(T);

impl<T: Tracked> Frozen<T> {
    pub(crate) fn new(inner: T) -> Self {
        inner.instance().freeze();
        Self(inner)
    }
}

impl<T> Deref for Frozen<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T: Tracked> Tracked for Frozen<T> {
    fn instance(&self) -> &InstanceRef {
        self.0.instance()
    }
}

impl<T: fmt::Debug> fmt::Debug for Frozen<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Frozen").field(&self.0).finish()
    }
}

/// Monitor a clone should register in
fn clone_monitor(instance: &InstanceRef) -> Arc<Monitor> {
    instance
        .monitor()
        .unwrap_or_else(|| Arc::clone(Monitor::global()))
}
