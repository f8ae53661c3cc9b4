use std::fmt;

use candid::CandidType;
use serde::{Deserialize, Serialize};

/// Rarity class of a satoshi, computed upstream from its position in the
/// emission schedule.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, CandidType)]
pub enum SatRarity {
    #[serde(rename = "common")]
    Common,
    #[serde(rename = "uncommon")]
    Uncommon,
    #[serde(rename = "rare")]
    Rare,
    #[serde(rename = "epic")]
    Epic,
    #[serde(rename = "legendary")]
    Legendary,
    #[serde(rename = "mythic")]
    Mythic,
}

impl fmt::Display for SatRarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Common => "common",
            Self::Uncommon => "uncommon",
            Self::Rare => "rare",
            Self::Epic => "epic",
            Self::Legendary => "legendary",
            Self::Mythic => "mythic",
        };

        f.write_str(name)
    }
}

/// Terminal disposition of a non-genesis location.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, CandidType)]
pub enum TransferType {
    /// Moved to a new output.
    #[serde(rename = "transferred")]
    Transferred,
    /// Consumed as a fee without a corresponding new output.
    #[serde(rename = "spent_in_fees")]
    SpentInFees,
    /// Sent to an unspendable output.
    #[serde(rename = "burnt")]
    Burnt,
}

impl fmt::Display for TransferType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Transferred => "transferred",
            Self::SpentInFees => "spent_in_fees",
            Self::Burnt => "burnt",
        };

        f.write_str(name)
    }
}

/// Inscription response api schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, CandidType)]
pub struct Inscription {
    pub id: String,
    pub number: i64,
    pub address: Option<String>,
    pub genesis_address: Option<String>,
    pub genesis_block_height: u64,
    pub genesis_block_hash: String,
    pub genesis_tx_id: String,
    pub genesis_fee: String,
    pub genesis_timestamp: i64,
    pub tx_id: String,
    pub location: String,
    pub output: String,
    pub value: Option<String>,
    pub offset: Option<String>,
    pub sat_ordinal: String,
    pub sat_rarity: String,
    pub sat_coinbase_height: u64,
    pub mime_type: String,
    pub content_type: String,
    pub content_length: u64,
    pub timestamp: i64,
    pub curse_type: Option<String>,
    pub recursive: bool,
    pub recursion_refs: Option<Vec<String>>,
}

/// Inscription location response api schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, CandidType)]
pub struct InscriptionLocation {
    pub block_height: u64,
    pub block_hash: String,
    pub address: Option<String>,
    pub tx_id: String,
    pub tx_index: u32,
    pub location: String,
    pub output: String,
    pub value: Option<String>,
    pub offset: Option<String>,
    pub timestamp: i64,
    /// `None` for the genesis location.
    pub transfer_type: Option<TransferType>,
}

/// A location joined to its immediate predecessor.
///
/// The genesis location is reported with no `from` endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, CandidType)]
pub struct InscriptionTransition {
    pub id: String,
    pub number: i64,
    pub from: Option<InscriptionLocation>,
    pub to: InscriptionLocation,
    pub from_genesis: bool,
    pub to_genesis: bool,
    pub from_current: bool,
    pub to_current: bool,
}

/// Raw inscription content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, CandidType)]
pub struct InscriptionContent {
    pub content_type: String,
    pub content_length: u64,
    pub content: Vec<u8>,
}
