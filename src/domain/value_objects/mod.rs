//! Value Objects for the storefront

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Longest session token accepted from a client.
pub const MAX_SESSION_ID_LEN: usize = 128;

/// Characters used for the random part of an order number. No 0/O or 1/I.
const ORDER_NUMBER_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const ORDER_NUMBER_SUFFIX_LEN: usize = 8;

/// Opaque, client-generated cart session token
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn parse(value: impl Into<String>) -> Result<Self, SessionIdError> {
        let value = value.into().trim().to_string();
        if value.is_empty() { return Err(SessionIdError::Empty); }
        if value.len() > MAX_SESSION_ID_LEN { return Err(SessionIdError::TooLong); }
        Ok(Self(value))
    }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionIdError {
    #[error("session id is required")]
    Empty,
    #[error("session id is too long")]
    TooLong,
}

/// Strictly positive line quantity
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(i32);

impl Quantity {
    /// `None` for zero or negative values.
    pub fn new(value: i32) -> Option<Self> { (value >= 1).then_some(Self(value)) }
    pub fn value(&self) -> i32 { self.0 }
    /// `None` when the sum no longer fits the stored column.
    pub fn checked_add(&self, other: Quantity) -> Option<Self> { self.0.checked_add(other.0).map(Self) }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

/// Human-facing order identifier: `<PREFIX>-<yyMMddHHmm>-<random>`
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    pub fn generate(prefix: &str) -> Self { Self::generate_at(prefix, Utc::now()) }

    pub fn generate_at(prefix: &str, now: DateTime<Utc>) -> Self {
        let mut rng = rand::thread_rng();
        let suffix: String = (0..ORDER_NUMBER_SUFFIX_LEN)
            .map(|_| ORDER_NUMBER_ALPHABET[rng.gen_range(0..ORDER_NUMBER_ALPHABET.len())] as char)
            .collect();
        Self(format!("{}-{}-{}", prefix, now.format("%y%m%d%H%M"), suffix))
    }

    /// Wraps a number read back from storage or a URL.
    pub fn from_raw(value: impl Into<String>) -> Self { Self(value.into()) }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

/// Optional variant attribute (size, color). Blank input means "no variant".
pub fn normalize_variant(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashSet;

    #[test]
    fn test_session_id() {
        assert_eq!(SessionId::parse("  abc-123 ").unwrap().as_str(), "abc-123");
        assert_eq!(SessionId::parse("   "), Err(SessionIdError::Empty));
        assert_eq!(SessionId::parse("x".repeat(MAX_SESSION_ID_LEN + 1)), Err(SessionIdError::TooLong));
    }

    #[test]
    fn test_quantity() {
        assert!(Quantity::new(0).is_none());
        assert!(Quantity::new(-3).is_none());
        let q = Quantity::new(2).unwrap();
        assert_eq!(q.checked_add(Quantity::new(3).unwrap()).map(|q| q.value()), Some(5));
        assert_eq!(Quantity::new(i32::MAX).unwrap().checked_add(q), None);
    }

    #[test]
    fn test_order_number_format() {
        let now = Utc.with_ymd_and_hms(2026, 10, 18, 9, 5, 0).unwrap();
        let number = OrderNumber::generate_at("ORD", now);
        let parts: Vec<&str> = number.as_str().split('-').collect();
        assert_eq!(parts[0], "ORD");
        assert_eq!(parts[1], "2610180905");
        assert_eq!(parts[2].len(), ORDER_NUMBER_SUFFIX_LEN);
        assert!(parts[2].bytes().all(|b| ORDER_NUMBER_ALPHABET.contains(&b)));
    }

    #[test]
    fn test_order_numbers_distinct_in_rapid_succession() {
        let now = Utc::now();
        let numbers: HashSet<_> = (0..10_000).map(|_| OrderNumber::generate_at("ORD", now)).collect();
        assert_eq!(numbers.len(), 10_000);
    }

    #[test]
    fn test_normalize_variant() {
        assert_eq!(normalize_variant(Some(" M ")), Some("M".to_string()));
        assert_eq!(normalize_variant(Some("")), None);
        assert_eq!(normalize_variant(None), None);
    }
}
