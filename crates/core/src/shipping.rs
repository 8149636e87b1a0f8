//! Region-based shipping fees.
//!
//! The fee depends only on the destination state and the order subtotal:
//!
//! | Destination                  | Subtotal | Fee  |
//! |------------------------------|----------|------|
//! | Tamil Nadu (home)            | ≥ ₹500   | ₹0   |
//! | Tamil Nadu (home)            | < ₹500   | ₹50  |
//! | Kerala, Karnataka, Andhra Pradesh, Puducherry, Telangana | any | ₹150 |
//! | anywhere else, blank or unknown | any   | ₹200 |
//!
//! Region names match case-insensitively, ignoring surrounding and repeated
//! whitespace.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Home state, where shipping is free above the threshold.
pub const HOME_REGION: &str = "Tamil Nadu";

/// Neighbouring states with a flat regional fee.
pub const NEARBY_REGIONS: [&str; 5] = [
    "Kerala",
    "Karnataka",
    "Andhra Pradesh",
    "Puducherry",
    "Telangana",
];

/// Subtotal at which home-region shipping becomes free.
pub const FREE_SHIPPING_THRESHOLD: Decimal = Decimal::from_parts(500, 0, 0, false, 0);

const HOME_FEE: Decimal = Decimal::from_parts(50, 0, 0, false, 0);
const NEARBY_FEE: Decimal = Decimal::from_parts(150, 0, 0, false, 0);
const NATIONWIDE_FEE: Decimal = Decimal::from_parts(200, 0, 0, false, 0);

/// Shipping zone a destination falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShippingZone {
    Home,
    Nearby,
    Nationwide,
}

impl ShippingZone {
    /// Classify a destination state.
    #[must_use]
    pub fn for_region(region: &str) -> Self {
        let normalized = normalize(region);
        if normalized.eq_ignore_ascii_case(HOME_REGION) {
            Self::Home
        } else if NEARBY_REGIONS
            .iter()
            .any(|nearby| normalized.eq_ignore_ascii_case(nearby))
        {
            Self::Nearby
        } else {
            Self::Nationwide
        }
    }

    /// Fee for a subtotal shipped into this zone.
    #[must_use]
    pub fn fee(self, subtotal: Decimal) -> Decimal {
        match self {
            Self::Home if subtotal >= FREE_SHIPPING_THRESHOLD => Decimal::ZERO,
            Self::Home => HOME_FEE,
            Self::Nearby => NEARBY_FEE,
            Self::Nationwide => NATIONWIDE_FEE,
        }
    }
}

/// Shipping fee for an order of `subtotal` sent to `region`.
///
/// Total over all inputs; there is no error case.
///
/// ```
/// use bazaar_core::compute_shipping;
/// use rust_decimal::Decimal;
///
/// assert_eq!(compute_shipping("tamil nadu", Decimal::from(800)), Decimal::ZERO);
/// assert_eq!(compute_shipping("Goa", Decimal::from(800)), Decimal::from(200));
/// ```
#[must_use]
pub fn compute_shipping(region: &str, subtotal: Decimal) -> Decimal {
    ShippingZone::for_region(region).fee(subtotal)
}

fn normalize(region: &str) -> String {
    region.split_whitespace().collect::<Vec<_>>().join(" ")
}
