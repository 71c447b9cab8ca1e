//! Call site identity and stack capture
//!
//! Every intercepted method is `#[track_caller]`, so
//! [`Location::caller`] resolves to the user code that invoked the
//! mutation, never to the interception frame.

use serde::{Deserialize, Serialize};
use std::backtrace::Backtrace;
use std::fmt;
use std::panic::Location;

/// Deduplication key for offender reports
///
/// Equality is by source file and line. Two mutations on the same line share
/// a key even if they sit in different columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CallSiteKey {
    file: &'static str,
    line: u32,
}

impl CallSiteKey {
    /// Build a key from a caller location
    #[inline]
    #[must_use]
    pub fn from_location(location: &'static Location<'static>) -> Self {
        Self {
            file: location.file(),
            line: location.line(),
        }
    }

    /// Key for the location that called this function
    #[inline]
    #[must_use]
    #[track_caller]
    pub fn here() -> Self {
        Self::from_location(Location::caller())
    }

    /// Source file of the call site
    #[inline]
    #[must_use]
    pub fn file(&self) -> &'static str {
        self.file
    }

    /// Source line of the call site
    #[inline]
    #[must_use]
    pub fn line(&self) -> u32 {
        self.line
    }

    #[cfg(test)]
    pub(crate) fn at_line(mut self, line: u32) -> Self {
        self.line = line;
        self
    }
}

impl fmt::Display for CallSiteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// How much of the call stack is kept for a new offender entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StackCapture {
    /// Capture a full backtrace regardless of `RUST_BACKTRACE`
    #[default]
    Full,
    /// Keep only the call site
    Disabled,
}

impl StackCapture {
    /// Capture according to the mode
    ///
    /// Only called for the first attempt at a call site in a cycle.
    #[must_use]
    pub fn capture(self) -> Backtrace {
        match self {
            StackCapture::Full => Backtrace::force_capture(),
            StackCapture::Disabled => Backtrace::disabled(),
        }
    }
}
