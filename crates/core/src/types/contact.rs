//! Shipping contact fields: phone numbers and postal codes.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Phone`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PhoneError {
    /// The input string is empty.
    #[error("phone number cannot be empty")]
    Empty,
    /// The input contains characters other than digits, spaces, dashes and a leading `+`.
    #[error("phone number contains invalid characters")]
    InvalidCharacters,
    /// The number does not have ten significant digits.
    #[error("phone number must have 10 digits")]
    WrongLength,
    /// The number does not start with 6, 7, 8 or 9.
    #[error("phone number must start with 6, 7, 8 or 9")]
    InvalidPrefix,
}

/// An Indian mobile number, normalized to its ten significant digits.
///
/// ## Accepted input
///
/// - Ten digits starting with 6–9: `9876543210`
/// - With a country or trunk prefix: `+91 98765 43210`, `919876543210`, `09876543210`
/// - Spaces and dashes anywhere: `98765-43210`
///
/// ## Examples
///
/// ```
/// use bazaar_core::Phone;
///
/// assert_eq!(Phone::parse("+91 98765-43210").unwrap().as_str(), "9876543210");
/// assert!(Phone::parse("12345").is_err());
/// assert!(Phone::parse("5876543210").is_err()); // landline-style prefix
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Phone(String);

impl Phone {
    /// Number of significant digits in a mobile number.
    pub const DIGITS: usize = 10;

    /// Parse and normalize a phone number.
    ///
    /// # Errors
    ///
    /// Returns an error if the input:
    /// - Is empty
    /// - Contains anything other than digits, spaces, dashes or a leading `+`
    /// - Does not reduce to ten digits after stripping a `91`/`0` prefix
    /// - Does not start with 6, 7, 8 or 9
    pub fn parse(s: &str) -> Result<Self, PhoneError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(PhoneError::Empty);
        }

        let body = trimmed.strip_prefix('+').unwrap_or(trimmed);
        if !body
            .chars()
            .all(|c| c.is_ascii_digit() || c == ' ' || c == '-')
        {
            return Err(PhoneError::InvalidCharacters);
        }

        let digits: String = body.chars().filter(char::is_ascii_digit).collect();
        let national = match digits.len() {
            12 => digits.strip_prefix("91"),
            11 => digits.strip_prefix('0'),
            Self::DIGITS => Some(digits.as_str()),
            _ => None,
        }
        .ok_or(PhoneError::WrongLength)?;

        if !national.starts_with(['6', '7', '8', '9']) {
            return Err(PhoneError::InvalidPrefix);
        }

        Ok(Self(national.to_owned()))
    }

    /// Returns the normalized ten-digit number.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `Phone` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Phone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Phone {
    type Err = PhoneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Errors that can occur when parsing a [`Pincode`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PincodeError {
    /// The input is not exactly six digits (spaces allowed between groups).
    #[error("pincode must be 6 digits")]
    Malformed,
    /// The first digit is zero, which no postal region uses.
    #[error("pincode cannot start with 0")]
    LeadingZero,
}

/// An Indian postal index number (six digits, first digit 1–9).
///
/// ```
/// use bazaar_core::Pincode;
///
/// assert_eq!(Pincode::parse("600 001").unwrap().as_str(), "600001");
/// assert!(Pincode::parse("060001").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Pincode(String);

impl Pincode {
    /// Parse a pincode, ignoring a single space between the digit groups.
    ///
    /// # Errors
    ///
    /// Returns [`PincodeError::Malformed`] unless the input is six digits and
    /// [`PincodeError::LeadingZero`] if it starts with `0`.
    pub fn parse(s: &str) -> Result<Self, PincodeError> {
        let compact: String = s.trim().chars().filter(|c| *c != ' ').collect();
        if compact.len() != 6 || !compact.chars().all(|c| c.is_ascii_digit()) {
            return Err(PincodeError::Malformed);
        }
        if compact.starts_with('0') {
            return Err(PincodeError::LeadingZero);
        }
        Ok(Self(compact))
    }

    /// Returns the pincode as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `Pincode` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Pincode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
