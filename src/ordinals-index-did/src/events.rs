//! Events produced by the upstream ingestion pipeline.

use candid::CandidType;
use serde::{Deserialize, Serialize};

use crate::inscription::{SatRarity, TransferType};
use crate::keys::LocationOrderKey;

/// Header facts of an indexed block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, CandidType)]
pub struct BlockHeader {
    pub height: u64,
    pub hash: String,
    pub timestamp: i64,
}

/// A single ownership event of one inscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, CandidType)]
pub struct LocationEvent {
    /// `<txid>i<index>` of the inscription.
    pub inscription_id: String,
    pub block_height: u64,
    pub block_hash: String,
    pub tx_id: String,
    pub tx_index: u32,
    pub block_transfer_index: u32,
    /// `<txid>:<vout>` of the output holding the inscribed sat.
    pub output: String,
    pub offset: u64,
    pub value: u64,
    pub address: Option<String>,
    pub timestamp: i64,
    pub kind: LocationEventKind,
}

impl LocationEvent {
    pub fn order_key(&self) -> LocationOrderKey {
        LocationOrderKey::new(self.block_height, self.tx_index, self.block_transfer_index)
    }

    pub fn header(&self) -> BlockHeader {
        BlockHeader {
            height: self.block_height,
            hash: self.block_hash.clone(),
            timestamp: self.timestamp,
        }
    }

    pub fn is_genesis(&self) -> bool {
        matches!(self.kind, LocationEventKind::Genesis(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, CandidType)]
pub enum LocationEventKind {
    /// Reveal of the inscription.
    Genesis(GenesisFacts),
    /// Move of an already revealed inscription.
    Transfer(TransferFacts),
}

/// Immutable facts about an inscription known at reveal time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, CandidType)]
pub struct GenesisFacts {
    pub number: i64,
    pub fee: u64,
    pub mime_type: String,
    pub content_type: String,
    pub content: Vec<u8>,
    pub curse_type: Option<String>,
    pub recursion_refs: Vec<String>,
    pub sat_ordinal: u64,
    pub sat_rarity: SatRarity,
    pub sat_coinbase_height: u64,
}

/// Where a transferred inscription came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, CandidType)]
pub struct TransferFacts {
    pub prev_output: String,
    pub prev_offset: u64,
    pub prev_value: u64,
    pub transfer_type: TransferType,
}

/// What a rollback removed from the index.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize, CandidType)]
pub struct RollbackSummary {
    /// Height the rollback started from, inclusive.
    pub from_height: u64,
    pub removed_locations: u64,
    /// Inscriptions whose current location moved back to an older one.
    pub rewound_pointers: u64,
    /// Inscriptions whose genesis was removed.
    pub erased_inscriptions: u64,
    pub removed_blocks: u64,
    pub removed_mints: u64,
    pub released_halts: u64,
}

impl std::fmt::Display for RollbackSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "rollback from {}: {} locations, {} rewound, {} erased, {} blocks, {} mints, {} halts released",
            self.from_height,
            self.removed_locations,
            self.rewound_pointers,
            self.erased_inscriptions,
            self.removed_blocks,
            self.removed_mints,
            self.released_halts
        )
    }
}

/// An inscription whose location chain stopped accepting appends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, CandidType)]
pub struct HaltedChain {
    pub inscription_id: String,
    /// Order key of the rejected event.
    pub rejected: LocationOrderKey,
    /// Satpoint the inscription was recorded at.
    pub expected: String,
    /// Satpoint the rejected event moved it from.
    pub received: String,
}
