//! Cart ownership.

use core::fmt;

use serde::{Deserialize, Serialize};

use super::id::{AccountId, GuestId};

/// Who a cart belongs to.
///
/// Exactly one identity owns a cart: a signed-in account or an anonymous
/// guest session. The variant makes "both" and "neither" unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum CartOwner {
    /// An authenticated account.
    Account(AccountId),
    /// An anonymous session.
    Guest(GuestId),
}

impl CartOwner {
    /// The account ID, if this owner is signed in.
    #[must_use]
    pub const fn account(&self) -> Option<AccountId> {
        match self {
            Self::Account(id) => Some(*id),
            Self::Guest(_) => None,
        }
    }

    /// Whether this owner is an anonymous guest.
    #[must_use]
    pub const fn is_guest(&self) -> bool {
        matches!(self, Self::Guest(_))
    }
}

impl fmt::Display for CartOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Account(id) => write!(f, "account:{id}"),
            Self::Guest(id) => write!(f, "guest:{id}"),
        }
    }
}

impl From<AccountId> for CartOwner {
    fn from(id: AccountId) -> Self {
        Self::Account(id)
    }
}

impl From<GuestId> for CartOwner {
    fn from(id: GuestId) -> Self {
        Self::Guest(id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_account_accessor() {
        let owner = CartOwner::from(AccountId::new(3));
        assert_eq!(owner.account(), Some(AccountId::new(3)));
        assert!(!owner.is_guest());

        let guest = CartOwner::from(GuestId::generate());
        assert_eq!(guest.account(), None);
        assert!(guest.is_guest());
    }

    #[test]
    fn test_display_is_prefixed() {
        assert_eq!(CartOwner::Account(AccountId::new(12)).to_string(), "account:12");
    }

    #[test]
    fn test_serde_tagged_shape() {
        let json = serde_json::to_value(CartOwner::Account(AccountId::new(5))).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "account", "id": 5}));
    }
}
