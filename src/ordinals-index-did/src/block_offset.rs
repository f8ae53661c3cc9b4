use std::fmt;
use std::str::FromStr;

use candid::CandidType;
use serde::{Deserialize, Serialize};

use crate::error::IndexError;

/// Unit of a relative block offset.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, CandidType)]
pub enum OffsetUnit {
    Blocks,
    Days,
}

impl OffsetUnit {
    fn suffix(&self) -> char {
        match self {
            Self::Blocks => 'b',
            Self::Days => 'd',
        }
    }
}

/// A window anchored to the current chain tip, e.g. `1000b` or `7d`.
///
/// It is resolved to an absolute height at query time and never persisted.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, CandidType)]
pub struct BlockOffset {
    pub magnitude: u64,
    pub unit: OffsetUnit,
}

impl BlockOffset {
    pub fn blocks(magnitude: u64) -> Self {
        Self {
            magnitude,
            unit: OffsetUnit::Blocks,
        }
    }

    pub fn days(magnitude: u64) -> Self {
        Self {
            magnitude,
            unit: OffsetUnit::Days,
        }
    }

    /// Number of blocks covered by the window.
    ///
    /// Day windows need the average number of blocks per day, which is a
    /// protocol constant supplied by configuration.
    pub fn span(&self, blocks_per_day: Option<u64>) -> Result<u64, IndexError> {
        match self.unit {
            OffsetUnit::Blocks => Ok(self.magnitude),
            OffsetUnit::Days => {
                let blocks_per_day = blocks_per_day.ok_or_else(|| {
                    IndexError::Configuration("blocks per day is not configured".to_string())
                })?;

                Ok(self.magnitude.saturating_mul(blocks_per_day))
            }
        }
    }
}

impl fmt::Display for BlockOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.magnitude, self.unit.suffix())
    }
}

impl FromStr for BlockOffset {
    type Err = IndexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || IndexError::InvalidInput(format!("invalid block offset `{s}`"));

        let unit = match s.chars().last() {
            Some('b') => OffsetUnit::Blocks,
            Some('d') => OffsetUnit::Days,
            _ => return Err(invalid()),
        };

        let digits = &s[..s.len() - 1];
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let magnitude = digits.parse::<u64>().map_err(|_| invalid())?;
        if magnitude == 0 {
            return Err(invalid());
        }

        Ok(Self { magnitude, unit })
    }
}
