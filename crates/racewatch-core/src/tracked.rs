//! Tracked container kinds and their mutating operations
//!
//! Each [`TrackedType`] owns a fixed list of [`MutatingOp`]s. Only operations
//! on that list are ever intercepted for instances of the type.

use crate::error::WatchError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Container kinds subject to interception
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TrackedType {
    /// Map-like containers ([`crate::WatchedMap`])
    Map,
    /// Sequence-like containers ([`crate::WatchedVec`])
    Sequence,
    /// Set-like containers ([`crate::WatchedSet`])
    Set,
}

impl TrackedType {
    /// Every tracked type, in registry slot order
    pub const ALL: [TrackedType; 3] = [TrackedType::Map, TrackedType::Sequence, TrackedType::Set];

    /// Name used in diagnostics and configuration
    #[inline]
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            TrackedType::Map => "Map",
            TrackedType::Sequence => "Sequence",
            TrackedType::Set => "Set",
        }
    }

    /// Registry slot index
    #[inline]
    #[must_use]
    pub(crate) fn index(self) -> usize {
        match self {
            TrackedType::Map => 0,
            TrackedType::Sequence => 1,
            TrackedType::Set => 2,
        }
    }

    /// Mutating operations intercepted for this type
    #[must_use]
    pub fn mutating_ops(&self) -> &'static [MutatingOp] {
        match self {
            TrackedType::Map => MAP_OPS,
            TrackedType::Sequence => SEQUENCE_OPS,
            TrackedType::Set => SET_OPS,
        }
    }
}

impl fmt::Display for TrackedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TrackedType {
    type Err = WatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Map" | "map" => Ok(TrackedType::Map),
            "Sequence" | "sequence" | "Vec" | "vec" => Ok(TrackedType::Sequence),
            "Set" | "set" => Ok(TrackedType::Set),
            other => Err(WatchError::UnknownTrackedType(other.to_string())),
        }
    }
}

/// A mutating operation on a tracked container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutatingOp {
    /// Insert a key/value or an element
    Insert,
    /// Remove by key, value or index
    Remove,
    /// Remove a map entry, returning key and value
    RemoveEntry,
    /// Remove by value, returning the stored element
    Take,
    /// Remove everything
    Clear,
    /// Bulk insert from an iterator
    Extend,
    /// Keep only matching elements
    Retain,
    /// Drain elements out
    Drain,
    /// Replace the whole contents
    ReplaceContents,
    /// Obtain a map entry handle
    Entry,
    /// Mutable access to a single element
    GetMut,
    /// Mutable access through `IndexMut`
    IndexMut,
    /// Mutable iteration
    IterMut,
    /// Mutable iteration over map values
    ValuesMut,
    /// Append to the end of a sequence
    Push,
    /// Remove from the end of a sequence
    Pop,
    /// Remove by index, filling the hole with the last element
    SwapRemove,
    /// Move all elements out of another sequence
    Append,
    /// Shorten a sequence
    Truncate,
    /// Grow or shrink a sequence with a fill value
    Resize,
    /// Overwrite every element
    Fill,
    /// Sort in place
    Sort,
    /// Reverse in place
    Reverse,
    /// Remove consecutive duplicates
    Dedup,
    /// Split a sequence at an index
    SplitOff,
    /// Swap two elements
    Swap,
}

impl MutatingOp {
    /// Operation name
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            MutatingOp::Insert => "insert",
            MutatingOp::Remove => "remove",
            MutatingOp::RemoveEntry => "remove_entry",
            MutatingOp::Take => "take",
            MutatingOp::Clear => "clear",
            MutatingOp::Extend => "extend",
            MutatingOp::Retain => "retain",
            MutatingOp::Drain => "drain",
            MutatingOp::ReplaceContents => "replace_contents",
            MutatingOp::Entry => "entry",
            MutatingOp::GetMut => "get_mut",
            MutatingOp::IndexMut => "index_mut",
            MutatingOp::IterMut => "iter_mut",
            MutatingOp::ValuesMut => "values_mut",
            MutatingOp::Push => "push",
            MutatingOp::Pop => "pop",
            MutatingOp::SwapRemove => "swap_remove",
            MutatingOp::Append => "append",
            MutatingOp::Truncate => "truncate",
            MutatingOp::Resize => "resize",
            MutatingOp::Fill => "fill",
            MutatingOp::Sort => "sort",
            MutatingOp::Reverse => "reverse",
            MutatingOp::Dedup => "dedup",
            MutatingOp::SplitOff => "split_off",
            MutatingOp::Swap => "swap",
        }
    }
}

impl fmt::Display for MutatingOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

const MAP_OPS: &[MutatingOp] = &[
    MutatingOp::Insert,
    MutatingOp::Remove,
    MutatingOp::RemoveEntry,
    MutatingOp::Clear,
    MutatingOp::Extend,
    MutatingOp::Retain,
    MutatingOp::Drain,
    MutatingOp::ReplaceContents,
    MutatingOp::Entry,
    MutatingOp::GetMut,
    MutatingOp::IterMut,
    MutatingOp::ValuesMut,
];

const SEQUENCE_OPS: &[MutatingOp] = &[
    MutatingOp::Push,
    MutatingOp::Pop,
    MutatingOp::Insert,
    MutatingOp::Remove,
    MutatingOp::SwapRemove,
    MutatingOp::Clear,
    MutatingOp::Extend,
    MutatingOp::Append,
    MutatingOp::Retain,
    MutatingOp::Truncate,
    MutatingOp::Resize,
    MutatingOp::Fill,
    MutatingOp::Sort,
    MutatingOp::Reverse,
    MutatingOp::Dedup,
    MutatingOp::Drain,
    MutatingOp::SplitOff,
    MutatingOp::Swap,
    MutatingOp::ReplaceContents,
    MutatingOp::GetMut,
    MutatingOp::IndexMut,
    MutatingOp::IterMut,
];

const SET_OPS: &[MutatingOp] = &[
    MutatingOp::Insert,
    MutatingOp::Remove,
    MutatingOp::Take,
    MutatingOp::Clear,
    MutatingOp::Extend,
    MutatingOp::Retain,
    MutatingOp::Drain,
    MutatingOp::ReplaceContents,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_through_from_str() {
        for kind in TrackedType::ALL {
            assert_eq!(kind.name().parse::<TrackedType>().unwrap(), kind);
        }
    }

    #[test]
    fn unknown_type_is_rejected() {
        let err = "Queue".parse::<TrackedType>().unwrap_err();
        assert!(matches!(err, WatchError::UnknownTrackedType(name) if name == "Queue"));
    }

    #[test]
    fn slot_indices_are_distinct() {
        let indices: Vec<usize> = TrackedType::ALL.iter().map(|k| k.index()).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn set_does_not_intercept_sequence_ops() {
        let ops = TrackedType::Set.mutating_ops();
        assert!(ops.contains(&MutatingOp::Insert));
        assert!(!ops.contains(&MutatingOp::Push));
        assert!(!ops.contains(&MutatingOp::IndexMut));
    }

    #[test]
    fn map_intercepts_entry_api() {
        assert!(TrackedType::Map.mutating_ops().contains(&MutatingOp::Entry));
    }
}
