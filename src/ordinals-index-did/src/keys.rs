use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use bitcoin::hashes::Hash;
use bitcoin::Txid;
use candid::CandidType;
use ic_stable_structures::storable::Bound;
use ic_stable_structures::Storable;
use serde::{Deserialize, Serialize};

use crate::error::IndexError;

const TXID_SIZE: usize = 32;

/// Identifier of an inscription, derived from its reveal transaction.
///
/// Textual form is `<txid>i<index>`, where `index` is the position of the
/// envelope inside the reveal transaction.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct InscriptionId {
    /// Reveal transaction id.
    pub txid: Txid,
    /// Envelope index inside the reveal transaction.
    pub index: u32,
}

impl InscriptionId {
    pub fn new(txid: Txid, index: u32) -> Self {
        Self { txid, index }
    }

    /// Smallest possible id, used as a lower range bound.
    pub fn min() -> Self {
        Self {
            txid: Txid::all_zeros(),
            index: 0,
        }
    }
}

impl fmt::Display for InscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}i{}", self.txid, self.index)
    }
}

impl FromStr for InscriptionId {
    type Err = IndexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || IndexError::InvalidInput(format!("invalid inscription id `{s}`"));

        let (txid, index) = s.split_once('i').ok_or_else(invalid)?;
        if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let txid = Txid::from_str(txid).map_err(|_| invalid())?;
        let index = index.parse::<u32>().map_err(|_| invalid())?;

        Ok(Self { txid, index })
    }
}

impl Storable for InscriptionId {
    fn to_bytes(&self) -> Cow<[u8]> {
        let mut buff = Vec::with_capacity(Self::BOUND.max_size() as usize);
        buff.extend_from_slice(&self.txid.to_byte_array());
        buff.extend_from_slice(&self.index.to_be_bytes());

        buff.into()
    }

    fn from_bytes(bytes: Cow<[u8]>) -> Self {
        let txid = bytes[..TXID_SIZE].try_into().expect("invalid tx id");
        let index = u32::from_be_bytes(bytes[TXID_SIZE..].try_into().expect("invalid index"));

        Self {
            txid: Txid::from_byte_array(txid),
            index,
        }
    }

    const BOUND: Bound = Bound::Bounded {
        max_size: TXID_SIZE as u32 + 4,
        is_fixed_size: true,
    };
}

/// Total order of the locations of one inscription.
///
/// The ledger uses this key as its only source of truth for "current" versus
/// "historical" locations.
#[derive(
    Debug,
    Default,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    CandidType,
    Serialize,
    Deserialize,
)]
pub struct LocationOrderKey {
    pub block_height: u64,
    /// Index of the transaction inside its block.
    pub tx_index: u32,
    /// Index of the transfer among all transfers of the block's transaction.
    pub block_transfer_index: u32,
}

impl LocationOrderKey {
    pub const MAX: Self = Self {
        block_height: u64::MAX,
        tx_index: u32::MAX,
        block_transfer_index: u32::MAX,
    };

    pub fn new(block_height: u64, tx_index: u32, block_transfer_index: u32) -> Self {
        Self {
            block_height,
            tx_index,
            block_transfer_index,
        }
    }

    /// First possible key of the given block.
    pub fn block_start(block_height: u64) -> Self {
        Self::new(block_height, 0, 0)
    }
}

impl fmt::Display for LocationOrderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.block_height, self.tx_index, self.block_transfer_index
        )
    }
}

impl Storable for LocationOrderKey {
    fn to_bytes(&self) -> Cow<[u8]> {
        let mut buff = Vec::with_capacity(Self::BOUND.max_size() as usize);
        buff.extend_from_slice(&self.block_height.to_be_bytes());
        buff.extend_from_slice(&self.tx_index.to_be_bytes());
        buff.extend_from_slice(&self.block_transfer_index.to_be_bytes());

        buff.into()
    }

    fn from_bytes(bytes: Cow<[u8]>) -> Self {
        let block_height = u64::from_be_bytes(bytes[..8].try_into().expect("invalid height"));
        let tx_index = u32::from_be_bytes(bytes[8..12].try_into().expect("invalid tx index"));
        let block_transfer_index =
            u32::from_be_bytes(bytes[12..16].try_into().expect("invalid transfer index"));

        Self {
            block_height,
            tx_index,
            block_transfer_index,
        }
    }

    const BOUND: Bound = Bound::Bounded {
        max_size: 8 + 4 + 4,
        is_fixed_size: true,
    };
}
