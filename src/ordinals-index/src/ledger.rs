mod location_entry;
mod location_key;

use std::collections::BTreeMap;

use ic_stable_structures::{Memory, StableBTreeMap};
use ordinals_index_did::error::{IndexError, IndexResult};
use ordinals_index_did::keys::{InscriptionId, LocationOrderKey};

pub use self::location_entry::{
    CurrentLocation, HaltRecord, LocationEntry, PreviousLocation, Satpoint,
};
pub use self::location_key::{BlockLocationKey, LocationKey};

/// Where an appended location comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Movement {
    /// The inscription is revealed.
    Genesis,
    /// The inscription moves away from the given satpoint.
    Transfer { from: Satpoint },
}

/// Append-only ownership history of every inscription.
///
/// Each inscription owns a chain of locations ordered by [`LocationOrderKey`].
/// The current location pointer always equals the greatest key of the chain.
pub struct LocationLedger<M: Memory> {
    locations: StableBTreeMap<LocationKey, LocationEntry, M>,
    block_locations: StableBTreeMap<BlockLocationKey, (), M>,
    current: StableBTreeMap<InscriptionId, CurrentLocation, M>,
    halted: StableBTreeMap<InscriptionId, HaltRecord, M>,
}

impl<M> LocationLedger<M>
where
    M: Memory,
{
    pub fn new(locations: M, block_locations: M, current: M, halted: M) -> Self {
        Self {
            locations: StableBTreeMap::init(locations),
            block_locations: StableBTreeMap::init(block_locations),
            current: StableBTreeMap::init(current),
            halted: StableBTreeMap::init(halted),
        }
    }

    /// Current location pointer of the inscription.
    pub fn current(&self, id: &InscriptionId) -> Option<CurrentLocation> {
        self.current.get(id)
    }

    /// Checks that a location with the given order key can be appended to the
    /// chain of `id`. Nothing is written.
    ///
    /// Returns the location the inscription moves from, `None` for a genesis.
    pub fn validate_append(
        &self,
        id: &InscriptionId,
        order: LocationOrderKey,
        movement: &Movement,
    ) -> IndexResult<Option<CurrentLocation>> {
        let current = self.current.get(id);

        // A redelivered event stays a duplicate even on a halted chain.
        if let Some(current) = &current {
            if matches!(movement, Movement::Genesis) || order <= current.order {
                return Err(IndexError::DuplicateOrStaleEvent {
                    inscription_id: id.to_string(),
                    current: current.order,
                    received: order,
                });
            }
        }

        if self.halted.contains_key(id) {
            return Err(IndexError::ChainHalted(id.to_string()));
        }

        match (movement, current) {
            (Movement::Genesis, _) => Ok(None),
            (Movement::Transfer { .. }, None) => {
                Err(IndexError::InscriptionNotFound(id.to_string()))
            }
            (Movement::Transfer { from }, Some(current)) if *from != current.satpoint => {
                Err(IndexError::ChainDiscontinuity {
                    inscription_id: id.to_string(),
                    expected: current.satpoint.to_string(),
                    received: from.to_string(),
                })
            }
            (Movement::Transfer { .. }, Some(current)) => Ok(Some(current)),
        }
    }

    /// Appends a validated location and moves the current pointer to it.
    pub fn insert(&mut self, id: InscriptionId, order: LocationOrderKey, entry: LocationEntry) {
        log::trace!(
            "Inscription {id} moves to {} at {order}",
            entry.satpoint.location()
        );

        self.current.insert(id, CurrentLocation::new(order, &entry));
        self.block_locations
            .insert(BlockLocationKey::new(order, id), ());
        self.locations.insert(LocationKey::new(id, order), entry);
    }

    /// Stops accepting appends for `id` until released.
    pub fn halt(&mut self, id: InscriptionId, record: HaltRecord) {
        self.halted.insert(id, record);
    }

    /// Releases a halted chain. Returns `false` if it was not halted.
    pub fn release(&mut self, id: &InscriptionId) -> bool {
        self.halted.remove(id).is_some()
    }

    pub fn halted(&self) -> Vec<(InscriptionId, HaltRecord)> {
        self.halted.iter().collect()
    }

    pub fn location(&self, id: InscriptionId, order: LocationOrderKey) -> Option<LocationEntry> {
        self.locations.get(&LocationKey::new(id, order))
    }

    /// The whole chain of `id`, oldest first.
    pub fn locations(&self, id: InscriptionId) -> Vec<(LocationOrderKey, LocationEntry)> {
        self.locations
            .range(LocationKey::chain_start(id)..=LocationKey::chain_end(id))
            .map(|(key, entry)| (key.order, entry))
            .collect()
    }

    /// All locations recorded in the given block, in block order.
    pub fn block_locations(
        &self,
        block_height: u64,
    ) -> Vec<(LocationOrderKey, InscriptionId, LocationEntry)> {
        self.block_locations
            .range(BlockLocationKey::block_start(block_height)..)
            .take_while(|(key, _)| key.order.block_height == block_height)
            .filter_map(|(key, _)| {
                self.locations
                    .get(&key.location_key())
                    .map(|entry| (key.order, key.inscription, entry))
            })
            .collect()
    }

    pub fn len(&self) -> u64 {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// Computes what removing every location at or above `block_height` does
    /// to the ledger. Nothing is written.
    pub fn plan_rollback(&self, block_height: u64) -> IndexResult<RollbackPlan> {
        let removed: Vec<BlockLocationKey> = self
            .block_locations
            .range(BlockLocationKey::block_start(block_height)..)
            .map(|(key, _)| key)
            .collect();

        let mut earliest: BTreeMap<InscriptionId, LocationOrderKey> = BTreeMap::new();
        for key in &removed {
            earliest
                .entry(key.inscription)
                .and_modify(|order| *order = (*order).min(key.order))
                .or_insert(key.order);
        }

        let mut pointers = Vec::with_capacity(earliest.len());
        for (id, order) in earliest {
            let entry = self.location(id, order).ok_or_else(|| {
                IndexError::Storage(format!("location {order} of inscription {id} is missing"))
            })?;

            let pointer = match entry.previous {
                None => None,
                Some(previous) => {
                    let previous_entry = self.location(id, previous.order).ok_or_else(|| {
                        IndexError::Storage(format!(
                            "location {} of inscription {id} is missing",
                            previous.order
                        ))
                    })?;
                    Some(CurrentLocation::new(previous.order, &previous_entry))
                }
            };

            pointers.push((id, pointer));
        }

        let released = self
            .halted
            .iter()
            .filter(|(_, record)| record.rejected.block_height >= block_height)
            .map(|(id, _)| id)
            .collect();

        Ok(RollbackPlan {
            removed,
            pointers,
            released,
        })
    }

    /// Writes a plan computed by [`Self::plan_rollback`].
    pub fn apply_rollback(&mut self, plan: &RollbackPlan) {
        for key in &plan.removed {
            self.block_locations.remove(key);
            self.locations.remove(&key.location_key());
        }

        for (id, pointer) in &plan.pointers {
            match pointer {
                Some(pointer) => {
                    self.current.insert(*id, pointer.clone());
                }
                None => {
                    self.current.remove(id);
                }
            }
        }

        for id in &plan.released {
            self.halted.remove(id);
        }
    }
}

/// Effect of a rollback on the location ledger.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RollbackPlan {
    /// Locations to delete.
    pub removed: Vec<BlockLocationKey>,
    /// New current pointer of every affected inscription. `None` erases the
    /// inscription since its genesis is removed.
    pub pointers: Vec<(InscriptionId, Option<CurrentLocation>)>,
    /// Halted chains released by the rollback.
    pub released: Vec<InscriptionId>,
}

impl RollbackPlan {
    /// Inscriptions whose genesis is removed.
    pub fn erased(&self) -> impl Iterator<Item = &InscriptionId> {
        self.pointers
            .iter()
            .filter(|(_, pointer)| pointer.is_none())
            .map(|(id, _)| id)
    }

    /// Inscriptions rewound to an older location.
    pub fn rewound(&self) -> impl Iterator<Item = &InscriptionId> {
        self.pointers
            .iter()
            .filter(|(_, pointer)| pointer.is_some())
            .map(|(id, _)| id)
    }
}

#[cfg(test)]
mod tests {
    use ic_stable_structures::VectorMemory;

    use super::*;
    use crate::test_utils::{block_hash, inscription_id, output};

    fn test_ledger() -> LocationLedger<VectorMemory> {
        LocationLedger::new(
            VectorMemory::default(),
            VectorMemory::default(),
            VectorMemory::default(),
            VectorMemory::default(),
        )
    }

    fn satpoint(seed: u8) -> Satpoint {
        Satpoint::new(output(seed, 0), 0, 546)
    }

    fn entry(height: u64, seed: u8, previous: Option<(LocationOrderKey, Satpoint)>) -> LocationEntry {
        LocationEntry {
            block_hash: block_hash(height),
            tx_id: output(seed, 0)[..64].to_string(),
            satpoint: satpoint(seed),
            address: Some(format!("bc1p{seed}")),
            timestamp: height as i64 * 600,
            genesis_fee: previous.is_none().then_some(1000),
            previous: previous.map(|(order, satpoint)| PreviousLocation { order, satpoint }),
            transfer_type: None,
        }
    }

    /// Reveals `id` at `height` from satpoint 1 and moves it once per following height.
    fn build_chain(ledger: &mut LocationLedger<VectorMemory>, id: InscriptionId, heights: &[u64]) {
        let mut previous = None;
        for (i, height) in heights.iter().enumerate() {
            let order = LocationOrderKey::new(*height, 1, 0);
            let entry = entry(*height, i as u8 + 1, previous.clone());
            let movement = match &previous {
                None => Movement::Genesis,
                Some((_, from)) => Movement::Transfer { from: from.clone() },
            };

            ledger.validate_append(&id, order, &movement).unwrap();
            previous = Some((order, entry.satpoint.clone()));
            ledger.insert(id, order, entry);
        }
    }

    #[test]
    fn test_should_keep_pointer_at_last_location() {
        let mut ledger = test_ledger();
        let id = inscription_id(1);
        build_chain(&mut ledger, id, &[100, 101, 105]);

        let chain = ledger.locations(id);
        assert_eq!(chain.len(), 3);
        assert!(chain[0].1.is_genesis());
        assert!(chain.iter().skip(1).all(|(_, entry)| !entry.is_genesis()));

        let current = ledger.current(&id).unwrap();
        assert_eq!(current.order, chain.last().unwrap().0);
        assert_eq!(current.satpoint, chain.last().unwrap().1.satpoint);
    }

    #[test]
    fn test_should_reject_transfer_of_unknown_inscription() {
        let ledger = test_ledger();

        let result = ledger.validate_append(
            &inscription_id(1),
            LocationOrderKey::new(100, 0, 0),
            &Movement::Transfer { from: satpoint(1) },
        );

        assert!(matches!(result, Err(IndexError::InscriptionNotFound(_))));
    }

    #[test]
    fn test_should_reject_duplicate_and_stale_events() {
        let mut ledger = test_ledger();
        let id = inscription_id(1);
        build_chain(&mut ledger, id, &[100, 101]);

        let duplicate = ledger.validate_append(
            &id,
            LocationOrderKey::new(101, 1, 0),
            &Movement::Transfer { from: satpoint(1) },
        );
        assert!(duplicate.as_ref().unwrap_err().is_duplicate());

        let genesis_again =
            ledger.validate_append(&id, LocationOrderKey::new(100, 1, 0), &Movement::Genesis);
        assert!(genesis_again.unwrap_err().is_duplicate());

        let stale = ledger.validate_append(
            &id,
            LocationOrderKey::new(100, 5, 0),
            &Movement::Transfer { from: satpoint(2) },
        );
        assert!(stale.unwrap_err().is_duplicate());
    }

    #[test]
    fn test_should_detect_discontinuity() {
        let mut ledger = test_ledger();
        let id = inscription_id(1);
        build_chain(&mut ledger, id, &[100]);

        let result = ledger.validate_append(
            &id,
            LocationOrderKey::new(101, 0, 0),
            &Movement::Transfer { from: satpoint(9) },
        );

        assert!(matches!(
            result,
            Err(IndexError::ChainDiscontinuity { .. })
        ));
    }

    #[test]
    fn test_should_refuse_appends_to_halted_chain() {
        let mut ledger = test_ledger();
        let id = inscription_id(1);
        build_chain(&mut ledger, id, &[100]);

        ledger.halt(
            id,
            HaltRecord {
                rejected: LocationOrderKey::new(101, 0, 0),
                expected: satpoint(1),
                received: satpoint(9),
            },
        );

        let result = ledger.validate_append(
            &id,
            LocationOrderKey::new(102, 0, 0),
            &Movement::Transfer { from: satpoint(1) },
        );
        assert_eq!(result, Err(IndexError::ChainHalted(id.to_string())));

        assert!(ledger.release(&id));
        assert!(!ledger.release(&id));
        assert!(ledger
            .validate_append(
                &id,
                LocationOrderKey::new(102, 0, 0),
                &Movement::Transfer { from: satpoint(1) },
            )
            .is_ok());
    }

    #[test]
    fn test_should_report_redelivery_on_halted_chain_as_duplicate() {
        let mut ledger = test_ledger();
        let id = inscription_id(1);
        build_chain(&mut ledger, id, &[100, 101]);

        ledger.halt(
            id,
            HaltRecord {
                rejected: LocationOrderKey::new(102, 1, 0),
                expected: satpoint(2),
                received: satpoint(9),
            },
        );

        let redelivered = ledger.validate_append(
            &id,
            LocationOrderKey::new(101, 1, 0),
            &Movement::Transfer { from: satpoint(1) },
        );
        assert!(redelivered.unwrap_err().is_duplicate());

        let genesis =
            ledger.validate_append(&id, LocationOrderKey::new(100, 1, 0), &Movement::Genesis);
        assert!(genesis.unwrap_err().is_duplicate());

        let next = ledger.validate_append(
            &id,
            LocationOrderKey::new(103, 0, 0),
            &Movement::Transfer { from: satpoint(2) },
        );
        assert_eq!(next, Err(IndexError::ChainHalted(id.to_string())));
    }

    #[test]
    fn test_should_list_block_locations() {
        let mut ledger = test_ledger();
        build_chain(&mut ledger, inscription_id(1), &[100, 101]);
        build_chain(&mut ledger, inscription_id(2), &[101, 102]);

        let block = ledger.block_locations(101);
        assert_eq!(block.len(), 2);
        assert!(block.iter().all(|(order, _, _)| order.block_height == 101));
        assert!(ledger.block_locations(103).is_empty());
    }

    #[test]
    fn test_should_rewind_pointers_on_rollback() {
        let mut ledger = test_ledger();
        let moved = inscription_id(1);
        let revealed = inscription_id(2);
        build_chain(&mut ledger, moved, &[100, 101, 102]);
        build_chain(&mut ledger, revealed, &[102]);
        ledger.halt(
            inscription_id(3),
            HaltRecord {
                rejected: LocationOrderKey::new(103, 0, 0),
                expected: satpoint(1),
                received: satpoint(2),
            },
        );

        let plan = ledger.plan_rollback(101).unwrap();
        assert_eq!(plan.removed.len(), 3);
        assert_eq!(plan.erased().collect::<Vec<_>>(), vec![&revealed]);
        assert_eq!(plan.rewound().collect::<Vec<_>>(), vec![&moved]);
        assert_eq!(plan.released, vec![inscription_id(3)]);

        ledger.apply_rollback(&plan);

        let current = ledger.current(&moved).unwrap();
        assert_eq!(current.order, LocationOrderKey::new(100, 1, 0));
        assert_eq!(ledger.locations(moved).len(), 1);
        assert!(ledger.current(&revealed).is_none());
        assert!(ledger.locations(revealed).is_empty());
        assert!(ledger.halted().is_empty());
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_should_plan_empty_rollback_above_tip() {
        let mut ledger = test_ledger();
        build_chain(&mut ledger, inscription_id(1), &[100]);

        let plan = ledger.plan_rollback(101).unwrap();
        assert_eq!(plan, RollbackPlan::default());
    }
}
