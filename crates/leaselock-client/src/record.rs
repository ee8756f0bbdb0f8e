//! Lock record representation and its store codec

use std::time::Duration;

use chrono::Utc;
use leaselock_store::{AttrValue, Record};

use crate::error::{LockError, Result};

/// Record key attribute: the lock name
pub const ATTR_KEY: &str = "key";
/// Holder identifier attribute
pub const ATTR_IDENTIFIER: &str = "identifier";
/// Absolute expiry attribute, nanoseconds since the Unix epoch
pub const ATTR_EXPIRY: &str = "expiry";
/// Successful-renewal counter attribute
pub const ATTR_HEARTBEATS: &str = "heartbeats";
/// First-acquisition timestamp attribute, RFC 3339
pub const ATTR_SET_AT: &str = "set_at";

/// The lock record stored under a lock's name.
///
/// `expiry` is an absolute wall-clock instant; competitors compare it
/// against their own clocks, so the protocol tolerates only modest clock
/// skew between holders.
#[derive(Clone, Debug, PartialEq)]
pub struct LockRecord {
    /// Lock name (the store key)
    pub name: String,
    /// Current holder's identifier
    pub identifier: String,
    /// Expiry instant, nanoseconds since the Unix epoch
    pub expiry: i64,
    /// Renewals completed by the current holder
    pub heartbeats: u64,
    /// When the current holder first acquired, RFC 3339
    pub set_at: Option<String>,
}

impl LockRecord {
    /// Encode into store attributes.
    ///
    /// `set_at` is written only on the first write of a holder's tenure
    /// (`heartbeats == 0`); renewal writes leave the stored value alone, so
    /// the acquisition timestamp survives the whole tenure.
    pub fn to_attributes(&self) -> Record {
        let mut record = Record::new();
        record.insert(ATTR_KEY.to_string(), AttrValue::S(self.name.clone()));
        record.insert(ATTR_IDENTIFIER.to_string(), AttrValue::S(self.identifier.clone()));
        record.insert(ATTR_EXPIRY.to_string(), AttrValue::N(self.expiry));
        record.insert(ATTR_HEARTBEATS.to_string(), AttrValue::N(self.heartbeats as i64));
        if self.heartbeats == 0
            && let Some(set_at) = &self.set_at
        {
            record.insert(ATTR_SET_AT.to_string(), AttrValue::S(set_at.clone()));
        }
        record
    }

    /// Decode from store attributes.
    ///
    /// `set_at` is optional; everything else must be present with the
    /// right type.
    pub fn from_attributes(record: &Record) -> Result<Self> {
        Ok(Self {
            name: require_s(record, ATTR_KEY)?,
            identifier: require_s(record, ATTR_IDENTIFIER)?,
            expiry: require_n(record, ATTR_EXPIRY)?,
            heartbeats: require_n(record, ATTR_HEARTBEATS)?.max(0) as u64,
            set_at: record
                .get(ATTR_SET_AT)
                .and_then(AttrValue::as_s)
                .map(str::to_string),
        })
    }

    /// True when the lease is stale at `now` (nanoseconds since the epoch)
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expiry < now
    }
}

fn require_s(record: &Record, name: &str) -> Result<String> {
    record
        .get(name)
        .and_then(AttrValue::as_s)
        .map(str::to_string)
        .ok_or_else(|| LockError::MalformedRecord(format!("missing string attribute '{}'", name)))
}

fn require_n(record: &Record, name: &str) -> Result<i64> {
    record
        .get(name)
        .and_then(AttrValue::as_n)
        .ok_or_else(|| LockError::MalformedRecord(format!("missing integer attribute '{}'", name)))
}

/// Current wall-clock time in nanoseconds since the Unix epoch.
// Saturates past the year 2262, same as the expiry arithmetic built on it.
pub(crate) fn now_nanos() -> i64 {
    Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX)
}

/// A duration as nanoseconds, saturating at i64::MAX.
pub(crate) fn duration_nanos(duration: Duration) -> i64 {
    i64::try_from(duration.as_nanos()).unwrap_or(i64::MAX)
}

/// Current wall-clock time as an RFC 3339 string.
pub(crate) fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}
