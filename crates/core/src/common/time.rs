use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::sync::RwLock;

/// # Summary
/// Clock abstraction used to stamp log lines as they are dispatched.
/// Tests mount a fake clock so delivered timestamps are deterministic.
pub trait TimeProvider: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// # Summary
/// Wall clock, returns the operating system time.
pub struct RealTimeProvider;

impl TimeProvider for RealTimeProvider {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// # Summary
/// Settable clock for tests.
///
/// # Invariants
/// - Reads and writes go through an `RwLock`; a poisoned lock still yields the last value.
pub struct FakeClockProvider {
    current_time: RwLock<DateTime<Utc>>,
}

impl FakeClockProvider {
    pub fn new(initial_time: DateTime<Utc>) -> Self {
        Self {
            current_time: RwLock::new(initial_time),
        }
    }

    pub fn set_time(&self, new_time: DateTime<Utc>) {
        let mut time = self
            .current_time
            .write()
            .unwrap_or_else(|e| e.into_inner());
        *time = new_time;
    }
}

impl TimeProvider for FakeClockProvider {
    fn now(&self) -> DateTime<Utc> {
        *self.current_time.read().unwrap_or_else(|e| e.into_inner())
    }
}

/// # Summary
/// Converts whole unix seconds into a UTC timestamp.
///
/// # Returns
/// `None` when the value is outside chrono's representable range.
pub fn from_unix_seconds(seconds: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(seconds, 0).single()
}

/// # Summary
/// Converts possibly fractional unix seconds into a UTC timestamp.
///
/// # Logic
/// 1. Splits the decimal into whole seconds and a nanosecond remainder.
/// 2. Negative fractions are rejected together with out-of-range values.
pub fn from_unix_decimal(seconds: Decimal) -> Option<DateTime<Utc>> {
    let whole = seconds.trunc();
    let nanos = ((seconds - whole) * Decimal::from(1_000_000_000u32))
        .trunc()
        .to_u32()?;
    Utc.timestamp_opt(whole.to_i64()?, nanos).single()
}

/// # Summary
/// Unix seconds with millisecond precision, the representation order events travel with.
pub fn to_unix_decimal(time: DateTime<Utc>) -> Decimal {
    Decimal::new(time.timestamp_millis(), 3)
}

/// Serde adapter for timestamps encoded as (fractional) unix seconds.
pub mod unix_seconds {
    use super::{from_unix_decimal, to_unix_decimal};
    use chrono::{DateTime, Utc};
    use rust_decimal::Decimal;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(time: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        <Decimal as Serialize>::serialize(&to_unix_decimal(*time), serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let seconds = <Decimal as Deserialize>::deserialize(deserializer)?;
        from_unix_decimal(seconds)
            .ok_or_else(|| serde::de::Error::custom(format!("Timestamp out of range: {}", seconds)))
    }
}
