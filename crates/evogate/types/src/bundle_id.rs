use crate::digest::Digest;
use crate::error::TypesError;
use chrono::{DateTime, NaiveDateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%S%.6fZ";
const TIMESTAMP_LEN: usize = "20260101T000000.000000Z".len();
const SUFFIX_LEN: usize = 4;

/// Identity of one evidence bundle: `YYYYMMDDTHHMMSS.ffffffZ-xxxx`.
///
/// Microsecond UTC timestamp plus four random hex digits. Lexicographic
/// order of ids is chronological order of allocation.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BundleId(String);

impl BundleId {
    /// Allocate a fresh id for `now`.
    pub fn generate(now: DateTime<Utc>) -> Self {
        let suffix: u16 = rand::thread_rng().gen();
        Self::from_parts(now, suffix)
    }

    pub fn from_parts(now: DateTime<Utc>, suffix: u16) -> Self {
        Self(format!(
            "{}-{:04x}",
            now.format(TIMESTAMP_FORMAT),
            suffix
        ))
    }

    /// Validate and wrap an existing id string.
    pub fn parse(s: &str) -> Result<Self, TypesError> {
        let invalid = || TypesError::InvalidBundleId(s.to_string());
        if !s.is_ascii() || s.len() != TIMESTAMP_LEN + 1 + SUFFIX_LEN {
            return Err(invalid());
        }
        let (ts, rest) = s.split_at(TIMESTAMP_LEN);
        let suffix = rest.strip_prefix('-').ok_or_else(invalid)?;
        if !suffix
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
        {
            return Err(invalid());
        }
        NaiveDateTime::parse_from_str(ts, TIMESTAMP_FORMAT).map_err(|_| invalid())?;
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Creation time encoded in the id.
    pub fn created_at(&self) -> DateTime<Utc> {
        NaiveDateTime::parse_from_str(&self.0[..TIMESTAMP_LEN], TIMESTAMP_FORMAT)
            .map(|naive| naive.and_utc())
            .unwrap_or_default()
    }

    /// Deterministic seed for any randomized evaluation step.
    ///
    /// First eight bytes (big-endian) of SHA-256 over the id string.
    pub fn seed(&self) -> u64 {
        let digest = Digest::of(self.0.as_bytes());
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest.as_bytes()[..8]);
        u64::from_be_bytes(head)
    }
}

impl fmt::Debug for BundleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BundleId({})", self.0)
    }
}

impl fmt::Display for BundleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for BundleId {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for BundleId {
    type Error = TypesError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<BundleId> for String {
    fn from(id: BundleId) -> Self {
        id.0
    }
}
