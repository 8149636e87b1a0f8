//! Session-related types.
//!
//! Types stored in the session for identity resolution.

use serde::{Deserialize, Serialize};

use bazaar_core::{AccountId, AccountRole};

/// Session-stored account identity.
///
/// Written by the upstream sign-in flow; the storefront only reads it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CurrentUser {
    /// Account ID.
    pub id: AccountId,
    /// Email shown in receipts, if the sign-in flow provided one.
    #[serde(default)]
    pub email: Option<String>,
    /// Permission level.
    #[serde(default)]
    pub role: AccountRole,
}

impl CurrentUser {
    /// Whether this user may use the admin endpoints.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == AccountRole::Admin
    }
}

/// Session keys for identity data.
pub mod keys {
    /// Key for storing the current signed-in account.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the anonymous shopper's guest ID (owns the guest cart).
    pub const GUEST_ID: &str = "guest_id";
}
