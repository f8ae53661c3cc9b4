use std::borrow::Cow;

use candid::{CandidType, Decode, Encode};
use ic_stable_structures::storable::Bound;
use ic_stable_structures::{Memory, StableBTreeMap, Storable};
use ordinals_index_did::brc20::{Brc20MintEvent, Brc20MintFlowEntry};
use ordinals_index_did::error::{IndexError, IndexResult};
use ordinals_index_did::keys::InscriptionId;
use ordinals_index_did::pagination::PaginatedResp;
use serde::Deserialize;

/// Position of a mint: `(block_height, tx_index, inscription)`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct MintKey {
    pub block_height: u64,
    pub tx_index: u32,
    pub inscription: InscriptionId,
}

impl MintKey {
    pub fn new(block_height: u64, tx_index: u32, inscription: InscriptionId) -> Self {
        Self {
            block_height,
            tx_index,
            inscription,
        }
    }

    /// Lowest key of the given block.
    pub fn block_start(block_height: u64) -> Self {
        Self::new(block_height, 0, InscriptionId::min())
    }
}

impl Storable for MintKey {
    fn to_bytes(&self) -> Cow<[u8]> {
        let mut buff = Vec::with_capacity(Self::BOUND.max_size() as usize);
        buff.extend_from_slice(&self.block_height.to_be_bytes());
        buff.extend_from_slice(&self.tx_index.to_be_bytes());
        buff.extend_from_slice(&self.inscription.to_bytes());

        buff.into()
    }

    fn from_bytes(bytes: Cow<[u8]>) -> Self {
        let block_height = u64::from_be_bytes(bytes[..8].try_into().expect("invalid height"));
        let tx_index = u32::from_be_bytes(bytes[8..12].try_into().expect("invalid tx index"));
        let inscription = InscriptionId::from_bytes(Cow::Borrowed(&bytes[12..]));

        Self {
            block_height,
            tx_index,
            inscription,
        }
    }

    const BOUND: Bound = Bound::Bounded {
        max_size: 8 + 4 + 36,
        is_fixed_size: true,
    };
}

/// Mint facts stored under a [`MintKey`].
#[derive(Debug, Clone, PartialEq, Eq, CandidType, Deserialize)]
pub struct MintEntry {
    pub ticker: String,
    pub amount: String,
    pub inscription_number: i64,
    pub block_hash: String,
    pub tx_id: String,
    pub address: Option<String>,
    pub timestamp: i64,
}

impl MintEntry {
    pub fn new(event: &Brc20MintEvent, inscription_number: i64) -> Self {
        Self {
            ticker: event.ticker.clone(),
            amount: event.amount.clone(),
            inscription_number,
            block_hash: event.block_hash.clone(),
            tx_id: event.tx_id.clone(),
            address: event.address.clone(),
            timestamp: event.timestamp,
        }
    }

    fn to_api(&self, key: &MintKey) -> Brc20MintFlowEntry {
        Brc20MintFlowEntry {
            ticker: self.ticker.clone(),
            amount: self.amount.clone(),
            inscription_id: key.inscription.to_string(),
            inscription_number: self.inscription_number,
            block_height: key.block_height,
            block_hash: self.block_hash.clone(),
            tx_id: self.tx_id.clone(),
            tx_index: key.tx_index,
            address: self.address.clone(),
            timestamp: self.timestamp,
        }
    }
}

impl Storable for MintEntry {
    fn to_bytes(&self) -> Cow<[u8]> {
        Encode!(self).expect("Failed to encode MintEntry").into()
    }

    fn from_bytes(bytes: Cow<[u8]>) -> Self {
        Decode!(&bytes, MintEntry).expect("Failed to decode MintEntry")
    }

    const BOUND: Bound = Bound::Unbounded;
}

/// `BRC-20` mint events ordered by chain position.
pub struct MintFlow<M: Memory> {
    mints: StableBTreeMap<MintKey, MintEntry, M>,
}

impl<M> MintFlow<M>
where
    M: Memory,
{
    pub fn new(memory: M) -> Self {
        Self {
            mints: StableBTreeMap::init(memory),
        }
    }

    /// Fails if the mint is already recorded.
    pub fn check(&self, key: &MintKey) -> IndexResult<()> {
        if self.mints.contains_key(key) {
            return Err(IndexError::DuplicateMint {
                inscription_id: key.inscription.to_string(),
                block_height: key.block_height,
                tx_index: key.tx_index,
            });
        }

        Ok(())
    }

    pub fn insert(&mut self, key: MintKey, entry: MintEntry) {
        log::trace!(
            "Mint of {} {} recorded at {}:{}",
            entry.amount,
            entry.ticker,
            key.block_height,
            key.tx_index
        );

        self.mints.insert(key, entry);
    }

    /// Removes every mint at or above `block_height`. Returns the number of
    /// removed mints.
    pub fn rollback(&mut self, block_height: u64) -> u64 {
        let removed: Vec<MintKey> = self
            .mints
            .range(MintKey::block_start(block_height)..)
            .map(|(key, _)| key)
            .collect();

        for key in &removed {
            self.mints.remove(key);
        }

        removed.len() as u64
    }

    /// Page of the mints at or above `floor`, oldest first.
    pub fn page(&self, floor: u64, limit: u64, offset: u64) -> PaginatedResp<Brc20MintFlowEntry> {
        let total = self.mints.range(MintKey::block_start(floor)..).count() as u64;

        PaginatedResp::page(
            self.mints
                .range(MintKey::block_start(floor)..)
                .map(|(key, entry)| entry.to_api(&key)),
            total,
            limit,
            offset,
        )
    }

    pub fn len(&self) -> u64 {
        self.mints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mints.is_empty()
    }
}
