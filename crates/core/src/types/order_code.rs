//! Human-readable order codes.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Order code shown to customers, e.g. `ORD1042`.
///
/// Built from the `"order"` sequence: the prefix followed by the sequence
/// value, with no padding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderCode(String);

impl OrderCode {
    /// Prefix shared by every order code.
    pub const PREFIX: &'static str = "ORD";

    /// Build the code for a sequence value.
    #[must_use]
    pub fn from_sequence(seq: i64) -> Self {
        Self(format!("{}{seq}", Self::PREFIX))
    }

    /// Wrap a code loaded from storage.
    #[must_use]
    pub const fn from_stored(code: String) -> Self {
        Self(code)
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The sequence value encoded in the code, if it is well formed.
    #[must_use]
    pub fn sequence(&self) -> Option<i64> {
        self.0.strip_prefix(Self::PREFIX)?.parse().ok()
    }
}

impl fmt::Display for OrderCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
