//! Mutations that live in their own source file, for whitelist tests

use racewatch_core::WatchedMap;

/// Assign `key = 1` from this file
pub fn assign(map: &mut WatchedMap<String, u32>, key: &str) {
    map.insert(key.to_string(), 1);
}
