use candid::CandidType;
use serde::{Deserialize, Serialize};

/// A `BRC-20` mint accepted by the upstream protocol pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, CandidType)]
pub struct Brc20MintEvent {
    /// `<txid>i<index>` of the mint inscription.
    pub inscription_id: String,
    pub ticker: String,
    /// Decimal amount as emitted by the protocol.
    pub amount: String,
    pub block_height: u64,
    pub block_hash: String,
    pub tx_id: String,
    pub tx_index: u32,
    pub address: Option<String>,
    pub timestamp: i64,
}

/// `BRC-20` mint flow entry response api schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, CandidType)]
pub struct Brc20MintFlowEntry {
    pub ticker: String,
    pub amount: String,
    pub inscription_id: String,
    pub inscription_number: i64,
    pub block_height: u64,
    pub block_hash: String,
    pub tx_id: String,
    pub tx_index: u32,
    pub address: Option<String>,
    pub timestamp: i64,
}
