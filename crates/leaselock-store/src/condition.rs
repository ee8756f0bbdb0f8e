//! Condition expressions evaluated against a record's current attributes
//!
//! Mirrors the conditional-write expression languages of stores like
//! DynamoDB: named-attribute comparisons combined with AND/OR. Backends
//! evaluate the condition atomically with the write it guards.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::value::{AttrValue, Record};

/// A server-evaluated predicate over a record's attributes.
///
/// Comparisons against a missing attribute, or between mismatched value
/// types, evaluate to false rather than erroring, matching the behavior of
/// conditional-write stores.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Condition {
    /// The named attribute equals the value
    Eq(String, AttrValue),
    /// The named attribute is present and differs from the value
    Ne(String, AttrValue),
    /// The named attribute is strictly less than the value
    Lt(String, AttrValue),
    /// The named attribute is strictly greater than the value
    Gt(String, AttrValue),
    /// The named attribute is not present on the record
    NotExists(String),
    /// Every sub-condition holds
    And(Vec<Condition>),
    /// At least one sub-condition holds
    Or(Vec<Condition>),
}

impl Condition {
    /// Evaluate this condition against a record.
    ///
    /// `record` is `None` when no record exists at the target key; attribute
    /// references then behave as missing attributes, so only `NotExists`
    /// (and combinators built from it) can hold.
    pub fn matches(&self, record: Option<&Record>) -> bool {
        match self {
            Condition::Eq(name, value) => attr(record, name).is_some_and(|a| a == value),
            Condition::Ne(name, value) => attr(record, name).is_some_and(|a| a != value),
            Condition::Lt(name, value) => {
                attr(record, name).and_then(|a| ordering(a, value)).is_some_and(Ordering::is_lt)
            }
            Condition::Gt(name, value) => {
                attr(record, name).and_then(|a| ordering(a, value)).is_some_and(Ordering::is_gt)
            }
            Condition::NotExists(name) => attr(record, name).is_none(),
            Condition::And(conditions) => conditions.iter().all(|c| c.matches(record)),
            Condition::Or(conditions) => conditions.iter().any(|c| c.matches(record)),
        }
    }
}

fn attr<'a>(record: Option<&'a Record>, name: &str) -> Option<&'a AttrValue> {
    record.and_then(|r| r.get(name))
}

/// Order two values of the same type: numeric for integers, lexicographic
/// for strings. Mismatched types do not order.
fn ordering(a: &AttrValue, b: &AttrValue) -> Option<Ordering> {
    match (a, b) {
        (AttrValue::N(x), AttrValue::N(y)) => Some(x.cmp(y)),
        (AttrValue::S(x), AttrValue::S(y)) => Some(x.cmp(y)),
        _ => None,
    }
}
