use std::borrow::Cow;

use candid::{CandidType, Decode, Encode};
use ic_stable_structures::storable::Bound;
use ic_stable_structures::{Memory, StableBTreeMap, Storable};
use ordinals_index_did::error::{IndexError, IndexResult};
use ordinals_index_did::events::GenesisFacts;
use ordinals_index_did::inscription::{InscriptionContent, SatRarity};
use ordinals_index_did::keys::{InscriptionId, LocationOrderKey};
use serde::Deserialize;

/// Genesis facts of an inscription. Never changes once stored.
#[derive(Debug, Clone, PartialEq, Eq, CandidType, Deserialize)]
pub struct InscriptionEntry {
    pub number: i64,
    /// Order key of the genesis location in the ledger.
    pub genesis: LocationOrderKey,
    pub genesis_fee: u64,
    pub mime_type: String,
    pub content_type: String,
    pub content_length: u64,
    pub curse_type: Option<String>,
    pub recursion_refs: Vec<String>,
    pub sat_ordinal: u64,
    pub sat_rarity: SatRarity,
    pub sat_coinbase_height: u64,
}

impl InscriptionEntry {
    pub fn new(facts: &GenesisFacts, genesis: LocationOrderKey) -> Self {
        Self {
            number: facts.number,
            genesis,
            genesis_fee: facts.fee,
            mime_type: facts.mime_type.clone(),
            content_type: facts.content_type.clone(),
            content_length: facts.content.len() as u64,
            curse_type: facts.curse_type.clone(),
            recursion_refs: facts.recursion_refs.clone(),
            sat_ordinal: facts.sat_ordinal,
            sat_rarity: facts.sat_rarity,
            sat_coinbase_height: facts.sat_coinbase_height,
        }
    }

    pub fn is_recursive(&self) -> bool {
        !self.recursion_refs.is_empty()
    }
}

impl Storable for InscriptionEntry {
    fn to_bytes(&self) -> Cow<[u8]> {
        Encode!(self)
            .expect("Failed to encode InscriptionEntry")
            .into()
    }

    fn from_bytes(bytes: Cow<[u8]>) -> Self {
        Decode!(&bytes, InscriptionEntry).expect("Failed to decode InscriptionEntry")
    }

    const BOUND: Bound = Bound::Unbounded;
}

/// Inscription number, negative for cursed inscriptions numbered before the
/// renumbering.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct InscriptionNumber(pub i64);

impl Storable for InscriptionNumber {
    fn to_bytes(&self) -> Cow<[u8]> {
        self.0.to_be_bytes().to_vec().into()
    }

    fn from_bytes(bytes: Cow<[u8]>) -> Self {
        Self(i64::from_be_bytes(
            bytes[..].try_into().expect("invalid inscription number"),
        ))
    }

    const BOUND: Bound = Bound::Bounded {
        max_size: 8,
        is_fixed_size: true,
    };
}

/// Immutable record of every inscription's genesis facts and content.
pub struct InscriptionRegistry<M: Memory> {
    inscriptions: StableBTreeMap<InscriptionId, InscriptionEntry, M>,
    numbers: StableBTreeMap<InscriptionNumber, InscriptionId, M>,
    content: StableBTreeMap<InscriptionId, Vec<u8>, M>,
}

impl<M> InscriptionRegistry<M>
where
    M: Memory,
{
    pub fn new(inscriptions: M, numbers: M, content: M) -> Self {
        Self {
            inscriptions: StableBTreeMap::init(inscriptions),
            numbers: StableBTreeMap::init(numbers),
            content: StableBTreeMap::init(content),
        }
    }

    /// Fails if `number` is already bound to an inscription other than `id`.
    pub fn check_number(&self, id: &InscriptionId, number: i64) -> IndexResult<()> {
        match self.numbers.get(&InscriptionNumber(number)) {
            Some(owner) if owner != *id => Err(IndexError::NumberTaken {
                number,
                inscription_id: owner.to_string(),
            }),
            _ => Ok(()),
        }
    }

    /// Stores the genesis facts of a new inscription.
    pub fn register(&mut self, id: InscriptionId, entry: InscriptionEntry, content: Vec<u8>) {
        log::trace!("Inscription {id} registered with number {}", entry.number);

        self.numbers.insert(InscriptionNumber(entry.number), id);
        self.content.insert(id, content);
        self.inscriptions.insert(id, entry);
    }

    pub fn get(&self, id: &InscriptionId) -> Option<InscriptionEntry> {
        self.inscriptions.get(id)
    }

    pub fn contains(&self, id: &InscriptionId) -> bool {
        self.inscriptions.contains_key(id)
    }

    pub fn id_by_number(&self, number: i64) -> Option<InscriptionId> {
        self.numbers.get(&InscriptionNumber(number))
    }

    pub fn content(&self, id: &InscriptionId) -> Option<InscriptionContent> {
        let entry = self.inscriptions.get(id)?;
        let content = self.content.get(id).unwrap_or_default();

        Some(InscriptionContent {
            content_type: entry.content_type,
            content_length: entry.content_length,
            content,
        })
    }

    /// Erases an inscription whose genesis block was rolled back.
    pub fn remove(&mut self, id: &InscriptionId) -> Option<InscriptionEntry> {
        let entry = self.inscriptions.remove(id)?;
        self.numbers.remove(&InscriptionNumber(entry.number));
        self.content.remove(id);

        log::trace!("Inscription {id} is erased from the registry");

        Some(entry)
    }

    pub fn len(&self) -> u64 {
        self.inscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inscriptions.is_empty()
    }
}
