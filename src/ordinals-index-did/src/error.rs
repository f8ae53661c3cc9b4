use candid::CandidType;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::keys::LocationOrderKey;

pub type IndexResult<T> = Result<T, IndexError>;

#[derive(Debug, Error, Clone, Serialize, Deserialize, CandidType, PartialEq, Eq)]
pub enum IndexError {
    #[error("event {received} of inscription {inscription_id} is not after its current location {current}")]
    DuplicateOrStaleEvent {
        inscription_id: String,
        current: LocationOrderKey,
        received: LocationOrderKey,
    },

    #[error("inscription {inscription_id} sits at {expected}, but the event moves it from {received}")]
    ChainDiscontinuity {
        inscription_id: String,
        expected: String,
        received: String,
    },

    #[error("location chain of inscription {0} is halted")]
    ChainHalted(String),

    #[error("requested range cannot be resolved against indexed data")]
    RangeUnresolvable,

    #[error("inscription {0} not found")]
    InscriptionNotFound(String),

    #[error("inscription number {number} is already assigned to {inscription_id}")]
    NumberTaken { number: i64, inscription_id: String },

    #[error("block {height} is indexed with hash {indexed}, got {received}")]
    BlockHashMismatch {
        height: u64,
        indexed: String,
        received: String,
    },

    #[error("mint of inscription {inscription_id} at {block_height}:{tx_index} is already recorded")]
    DuplicateMint {
        inscription_id: String,
        block_height: u64,
        tx_index: u32,
    },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("storage failure: {0}")]
    Storage(String),
}

impl IndexError {
    /// Re-delivery of an already indexed event. Ingestion may safely skip it.
    pub fn is_duplicate(&self) -> bool {
        matches!(
            self,
            Self::DuplicateOrStaleEvent { .. } | Self::DuplicateMint { .. }
        )
    }
}
