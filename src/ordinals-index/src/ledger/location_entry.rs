use std::borrow::Cow;

use candid::{CandidType, Decode, Encode};
use ic_stable_structures::storable::Bound;
use ic_stable_structures::Storable;
use ordinals_index_did::inscription::{InscriptionLocation, TransferType};
use ordinals_index_did::keys::LocationOrderKey;
use serde::Deserialize;

/// The output, the offset inside it and the output value where an inscribed sat sits.
#[derive(Debug, Clone, PartialEq, Eq, CandidType, Deserialize)]
pub struct Satpoint {
    /// `<txid>:<vout>`
    pub output: String,
    pub offset: u64,
    pub value: u64,
}

impl Satpoint {
    pub fn new(output: String, offset: u64, value: u64) -> Self {
        Self {
            output,
            offset,
            value,
        }
    }

    /// `<txid>:<vout>:<offset>`
    pub fn location(&self) -> String {
        format!("{}:{}", self.output, self.offset)
    }
}

impl std::fmt::Display for Satpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({} sats)", self.location(), self.value)
    }
}

/// Link from a location to the one it moved from.
#[derive(Debug, Clone, PartialEq, Eq, CandidType, Deserialize)]
pub struct PreviousLocation {
    pub order: LocationOrderKey,
    pub satpoint: Satpoint,
}

/// One ownership event of an inscription. Never mutated after insertion.
#[derive(Debug, Clone, PartialEq, Eq, CandidType, Deserialize)]
pub struct LocationEntry {
    pub block_hash: String,
    pub tx_id: String,
    pub satpoint: Satpoint,
    pub address: Option<String>,
    pub timestamp: i64,
    /// Set on the genesis location only.
    pub genesis_fee: Option<u64>,
    /// Unset on the genesis location only.
    pub previous: Option<PreviousLocation>,
    pub transfer_type: Option<TransferType>,
}

impl LocationEntry {
    pub fn is_genesis(&self) -> bool {
        self.previous.is_none()
    }

    pub fn to_api(&self, order: LocationOrderKey) -> InscriptionLocation {
        InscriptionLocation {
            block_height: order.block_height,
            block_hash: self.block_hash.clone(),
            address: self.address.clone(),
            tx_id: self.tx_id.clone(),
            tx_index: order.tx_index,
            location: self.satpoint.location(),
            output: self.satpoint.output.clone(),
            value: Some(self.satpoint.value.to_string()),
            offset: Some(self.satpoint.offset.to_string()),
            timestamp: self.timestamp,
            transfer_type: self.transfer_type,
        }
    }
}

impl Storable for LocationEntry {
    fn to_bytes(&self) -> Cow<[u8]> {
        Encode!(self).expect("Failed to encode LocationEntry").into()
    }

    fn from_bytes(bytes: Cow<[u8]>) -> Self {
        Decode!(&bytes, LocationEntry).expect("Failed to decode LocationEntry")
    }

    const BOUND: Bound = Bound::Unbounded;
}

/// Denormalized pointer to the latest location of an inscription.
#[derive(Debug, Clone, PartialEq, Eq, CandidType, Deserialize)]
pub struct CurrentLocation {
    pub order: LocationOrderKey,
    pub satpoint: Satpoint,
    pub address: Option<String>,
}

impl CurrentLocation {
    pub fn new(order: LocationOrderKey, entry: &LocationEntry) -> Self {
        Self {
            order,
            satpoint: entry.satpoint.clone(),
            address: entry.address.clone(),
        }
    }
}

impl Storable for CurrentLocation {
    fn to_bytes(&self) -> Cow<[u8]> {
        Encode!(self)
            .expect("Failed to encode CurrentLocation")
            .into()
    }

    fn from_bytes(bytes: Cow<[u8]>) -> Self {
        Decode!(&bytes, CurrentLocation).expect("Failed to decode CurrentLocation")
    }

    const BOUND: Bound = Bound::Unbounded;
}

/// Reason an inscription chain stopped accepting appends.
#[derive(Debug, Clone, PartialEq, Eq, CandidType, Deserialize)]
pub struct HaltRecord {
    /// Order key of the rejected event.
    pub rejected: LocationOrderKey,
    pub expected: Satpoint,
    pub received: Satpoint,
}

impl Storable for HaltRecord {
    fn to_bytes(&self) -> Cow<[u8]> {
        Encode!(self).expect("Failed to encode HaltRecord").into()
    }

    fn from_bytes(bytes: Cow<[u8]>) -> Self {
        Decode!(&bytes, HaltRecord).expect("Failed to decode HaltRecord")
    }

    const BOUND: Bound = Bound::Unbounded;
}
