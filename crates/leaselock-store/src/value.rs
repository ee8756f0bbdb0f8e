//! Typed attribute values and the store record representation

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A single typed attribute value.
///
/// The two shapes cover everything the lock protocol stores: strings for
/// names, identifiers and timestamps, 64-bit integers for expiry nanoseconds
/// and the heartbeat counter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttrValue {
    /// String value
    S(String),
    /// Signed 64-bit integer value
    N(i64),
}

impl AttrValue {
    /// Borrow the string payload, if this is a string value
    pub fn as_s(&self) -> Option<&str> {
        match self {
            AttrValue::S(s) => Some(s.as_str()),
            AttrValue::N(_) => None,
        }
    }

    /// Copy out the integer payload, if this is an integer value
    pub fn as_n(&self) -> Option<i64> {
        match self {
            AttrValue::S(_) => None,
            AttrValue::N(n) => Some(*n),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::S(s.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        AttrValue::S(s)
    }
}

impl From<i64> for AttrValue {
    fn from(n: i64) -> Self {
        AttrValue::N(n)
    }
}

/// One store-resident record: the named attributes stored under a key
pub type Record = HashMap<String, AttrValue>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attr_value_accessors() {
        let s = AttrValue::from("holder-1");
        let n = AttrValue::from(42i64);

        assert_eq!(s.as_s(), Some("holder-1"));
        assert_eq!(s.as_n(), None);
        assert_eq!(n.as_n(), Some(42));
        assert_eq!(n.as_s(), None);
    }

    #[test]
    fn test_attr_value_serde() {
        let value = AttrValue::S("abc".to_string());
        let json = serde_json::to_string(&value).unwrap();
        let back: AttrValue = serde_json::from_str(&json).unwrap();
        assert_eq!(back, value);
    }
}
