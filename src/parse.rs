//! Parsing of human-readable token lifetimes.
//!
//! Lifetimes are configured as strings like `"15m"` or `"7d"` and parsed
//! into a [`Ttl`] once, at startup. Parsing is strict: anything that does
//! not match `<digits><unit>` with a unit of `s`, `m`, `h` or `d` is a
//! configuration error. A misconfigured lifetime must fail the process at
//! boot, never default silently at request time.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;

/// A token lifetime, stored as whole milliseconds.
///
/// Parsing the same input always yields the same value, so expiries
/// computed from a fixed "now" are reproducible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ttl(u64);

impl Ttl {
    /// Construct from a raw millisecond count.
    pub const fn from_millis(ms: u64) -> Self {
        Self(ms)
    }

    pub const fn as_millis(&self) -> u64 {
        self.0
    }

    pub const fn as_duration(&self) -> Duration {
        Duration::from_millis(self.0)
    }

    /// Expiry instant for a token issued at `now`.
    pub fn deadline_from(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + chrono::Duration::milliseconds(self.0 as i64)
    }
}

impl fmt::Display for Ttl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

/// Rejected lifetime string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TtlError {
    #[error("invalid ttl {input:?}: expected <digits><unit> with unit one of s, m, h, d")]
    InvalidFormat { input: String },
    #[error("invalid ttl {input:?}: value does not fit in milliseconds")]
    Overflow { input: String },
    #[error("invalid ttl {input:?}: lifetime must be greater than zero")]
    Zero { input: String },
}

/// Parse a lifetime string such as `"30s"`, `"15m"`, `"12h"` or `"7d"`.
///
/// The accepted grammar is exactly one or more ASCII digits followed by a
/// single unit character. Whitespace, signs, fractions and compound forms
/// (`"1h30m"`) are all rejected.
pub fn parse_ttl(input: &str) -> Result<Ttl, TtlError> {
    let invalid = || TtlError::InvalidFormat {
        input: input.to_string(),
    };

    if input.len() < 2 || !input.is_ascii() {
        return Err(invalid());
    }

    let (digits, unit) = input.split_at(input.len() - 1);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    let per_unit: u64 = match unit {
        "s" => 1_000,
        "m" => 60 * 1_000,
        "h" => 60 * 60 * 1_000,
        "d" => 24 * 60 * 60 * 1_000,
        _ => return Err(invalid()),
    };

    let value: u64 = digits.parse().map_err(|_| TtlError::Overflow {
        input: input.to_string(),
    })?;

    let ms = value.checked_mul(per_unit).ok_or_else(|| TtlError::Overflow {
        input: input.to_string(),
    })?;

    if ms == 0 {
        return Err(TtlError::Zero {
            input: input.to_string(),
        });
    }

    Ok(Ttl(ms))
}
