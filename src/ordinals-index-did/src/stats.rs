use candid::CandidType;
use serde::{Deserialize, Serialize};

/// Inscriptions revealed in a block and the running total up to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, CandidType)]
pub struct BlockInscriptionCount {
    pub block_height: u64,
    pub block_hash: String,
    pub inscription_count: u64,
    /// Sum of `inscription_count` over every indexed block up to and including this one.
    pub inscription_count_accum: u64,
    pub timestamp: i64,
}
