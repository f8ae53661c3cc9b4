use std::cell::RefCell;
use std::str::FromStr;

use bitcoin::{BlockHash, OutPoint, Txid};
use candid::CandidType;
use ic_stable_structures::memory_manager::{MemoryManager, VirtualMemory};
use ic_stable_structures::{DefaultMemoryImpl, Memory};
use ordinals_index_did::block_offset::BlockOffset;
use ordinals_index_did::brc20::{Brc20MintEvent, Brc20MintFlowEntry};
use ordinals_index_did::error::{IndexError, IndexResult};
use ordinals_index_did::events::{
    BlockHeader, HaltedChain, LocationEvent, LocationEventKind, RollbackSummary,
};
use ordinals_index_did::inscription::{
    Inscription, InscriptionContent, InscriptionLocation, InscriptionTransition,
};
use ordinals_index_did::keys::{InscriptionId, LocationOrderKey};
use ordinals_index_did::pagination::PaginatedResp;
use ordinals_index_did::stats::BlockInscriptionCount;
use serde::de::DeserializeOwned;

use crate::block_stats::BlockStats;
use crate::cache::{self, StatsCache, StatsQuery};
use crate::config::{IndexConfig, IndexConfigStorage};
use crate::ledger::{HaltRecord, LocationEntry, LocationLedger, Movement, PreviousLocation, Satpoint};
use crate::memory::{
    BLOCK_COUNTS_MEMORY_ID, BLOCK_LOCATIONS_MEMORY_ID, CONFIG_MEMORY_ID,
    CURRENT_LOCATIONS_MEMORY_ID, HALTED_CHAINS_MEMORY_ID, INSCRIPTIONS_MEMORY_ID,
    INSCRIPTION_CONTENT_MEMORY_ID, INSCRIPTION_NUMBERS_MEMORY_ID, LOCATIONS_MEMORY_ID,
    MEMORY_MANAGER, MINT_EVENTS_MEMORY_ID,
};
use crate::mint_flow::{MintEntry, MintFlow, MintKey};
use crate::registry::{InscriptionEntry, InscriptionRegistry};

/// Inscription index: provenance ledger, block statistics and `BRC-20` mint flow.
///
/// Every mutating operation validates its input and reads everything it needs
/// before the first write, so a failed call leaves the index untouched.
pub struct OrdinalsIndex<M: Memory> {
    config: IndexConfigStorage<VirtualMemory<M>>,
    registry: InscriptionRegistry<VirtualMemory<M>>,
    ledger: LocationLedger<VirtualMemory<M>>,
    blocks: BlockStats<VirtualMemory<M>>,
    mints: MintFlow<VirtualMemory<M>>,
    cache: RefCell<StatsCache>,
}

impl Default for OrdinalsIndex<DefaultMemoryImpl> {
    fn default() -> Self {
        MEMORY_MANAGER.with(|memory_manager| Self::new(memory_manager))
    }
}

impl<M> OrdinalsIndex<M>
where
    M: Memory,
{
    pub fn new(memory_manager: &MemoryManager<M>) -> Self {
        let config = IndexConfigStorage::new(memory_manager.get(CONFIG_MEMORY_ID));
        let cache = StatsCache::new(config.get().cache_capacity as usize);

        Self {
            config,
            registry: InscriptionRegistry::new(
                memory_manager.get(INSCRIPTIONS_MEMORY_ID),
                memory_manager.get(INSCRIPTION_NUMBERS_MEMORY_ID),
                memory_manager.get(INSCRIPTION_CONTENT_MEMORY_ID),
            ),
            ledger: LocationLedger::new(
                memory_manager.get(LOCATIONS_MEMORY_ID),
                memory_manager.get(BLOCK_LOCATIONS_MEMORY_ID),
                memory_manager.get(CURRENT_LOCATIONS_MEMORY_ID),
                memory_manager.get(HALTED_CHAINS_MEMORY_ID),
            ),
            blocks: BlockStats::new(memory_manager.get(BLOCK_COUNTS_MEMORY_ID)),
            mints: MintFlow::new(memory_manager.get(MINT_EVENTS_MEMORY_ID)),
            cache: RefCell::new(cache),
        }
    }

    /// Builds an index with its own memory manager over `memory`.
    pub fn with_memory(memory: M) -> Self {
        Self::new(&MemoryManager::init(memory))
    }

    /// Validates and stores a new configuration. Drops every cached result.
    pub fn configure(&mut self, config: IndexConfig) -> IndexResult<()> {
        config.validate().map_err(IndexError::Configuration)?;

        log::info!("Index configured with {config:?}");

        *self.cache.get_mut() = StatsCache::new(config.cache_capacity as usize);
        self.config.set(config)
    }

    pub fn config(&self) -> IndexConfig {
        self.config.get().clone()
    }

    /// Highest indexed block.
    pub fn tip(&self) -> Option<u64> {
        self.blocks.tip()
    }

    pub fn inscription_count(&self) -> u64 {
        self.registry.len()
    }

    /// Registers a block, including blocks with no inscriptions.
    ///
    /// Re-registering a block with the same hash does nothing.
    pub fn index_block(&mut self, header: BlockHeader) -> IndexResult<()> {
        let header = BlockHeader {
            hash: normalize_block_hash(&header.hash)?,
            ..header
        };

        if self.blocks.check_block(&header)? {
            self.blocks.insert_block(&header);
            self.cache.get_mut().invalidate_from(header.height);
        }

        Ok(())
    }

    /// Appends a location to the chain of its inscription.
    ///
    /// A transfer whose declared predecessor is not the current location halts
    /// the chain of the inscription until [`Self::release_halted_chain`].
    pub fn append_location(&mut self, event: LocationEvent) -> IndexResult<()> {
        let id = InscriptionId::from_str(&event.inscription_id)?;
        let order = event.order_key();
        let header = BlockHeader {
            height: event.block_height,
            hash: normalize_block_hash(&event.block_hash)?,
            timestamp: event.timestamp,
        };
        let tx_id = normalize_txid(&event.tx_id)?;
        let satpoint = Satpoint::new(normalize_output(&event.output)?, event.offset, event.value);

        let movement = match &event.kind {
            LocationEventKind::Genesis(_) => Movement::Genesis,
            LocationEventKind::Transfer(transfer) => Movement::Transfer {
                from: Satpoint::new(
                    normalize_output(&transfer.prev_output)?,
                    transfer.prev_offset,
                    transfer.prev_value,
                ),
            },
        };

        let from = match self.ledger.validate_append(&id, order, &movement) {
            Ok(from) => from,
            Err(err) => return Err(self.reject_location(id, order, movement, err)),
        };

        let is_new_block = self.blocks.check_block(&header)?;
        if let LocationEventKind::Genesis(facts) = &event.kind {
            self.registry.check_number(&id, facts.number)?;
        }

        let entry = match &event.kind {
            LocationEventKind::Genesis(facts) => LocationEntry {
                block_hash: header.hash.clone(),
                tx_id,
                satpoint,
                address: event.address.clone(),
                timestamp: event.timestamp,
                genesis_fee: Some(facts.fee),
                previous: None,
                transfer_type: None,
            },
            LocationEventKind::Transfer(transfer) => LocationEntry {
                block_hash: header.hash.clone(),
                tx_id,
                satpoint,
                address: event.address.clone(),
                timestamp: event.timestamp,
                genesis_fee: None,
                previous: from.map(|current| PreviousLocation {
                    order: current.order,
                    satpoint: current.satpoint,
                }),
                transfer_type: Some(transfer.transfer_type),
            },
        };

        if is_new_block {
            self.blocks.insert_block(&header);
        }
        if let LocationEventKind::Genesis(facts) = &event.kind {
            self.blocks.record_inscription(order.block_height)?;
            self.registry.register(
                id,
                InscriptionEntry::new(facts, order),
                facts.content.clone(),
            );
        }
        self.ledger.insert(id, order, entry);
        self.cache.get_mut().invalidate_from(order.block_height);

        Ok(())
    }

    fn reject_location(
        &mut self,
        id: InscriptionId,
        order: LocationOrderKey,
        movement: Movement,
        err: IndexError,
    ) -> IndexError {
        match (&err, movement) {
            (IndexError::ChainDiscontinuity { .. }, Movement::Transfer { from }) => {
                log::error!("Location chain of inscription {id} is halted at {order}: {err}");

                if let Some(current) = self.ledger.current(&id) {
                    self.ledger.halt(
                        id,
                        HaltRecord {
                            rejected: order,
                            expected: current.satpoint,
                            received: from,
                        },
                    );
                }
            }
            (err, _) if err.is_duplicate() => {
                log::debug!("Location {order} of inscription {id} skipped: {err}");
            }
            (err, _) => {
                log::warn!("Location {order} of inscription {id} rejected: {err}");
            }
        }

        err
    }

    /// Records a `BRC-20` mint of a registered inscription.
    pub fn record_mint(&mut self, event: Brc20MintEvent) -> IndexResult<()> {
        let id = InscriptionId::from_str(&event.inscription_id)?;
        let header = BlockHeader {
            height: event.block_height,
            hash: normalize_block_hash(&event.block_hash)?,
            timestamp: event.timestamp,
        };
        let event = Brc20MintEvent {
            tx_id: normalize_txid(&event.tx_id)?,
            block_hash: header.hash.clone(),
            ..event
        };

        let inscription = self
            .registry
            .get(&id)
            .ok_or_else(|| IndexError::InscriptionNotFound(id.to_string()))?;
        if event.block_height < inscription.genesis.block_height {
            return Err(IndexError::InvalidInput(format!(
                "mint of {id} at block {} precedes its genesis at block {}",
                event.block_height, inscription.genesis.block_height
            )));
        }
        let key = MintKey::new(event.block_height, event.tx_index, id);
        self.mints.check(&key)?;
        let is_new_block = self.blocks.check_block(&header)?;

        if is_new_block {
            self.blocks.insert_block(&header);
        }
        self.mints
            .insert(key, MintEntry::new(&event, inscription.number));
        self.cache.get_mut().invalidate_from(event.block_height);

        Ok(())
    }

    /// Removes everything indexed at or above `block_height`.
    ///
    /// Pointers of moved inscriptions are rewound to their last remaining
    /// location, inscriptions revealed in the removed blocks are erased.
    pub fn rollback_from_height(&mut self, block_height: u64) -> IndexResult<RollbackSummary> {
        let plan = self.ledger.plan_rollback(block_height)?;

        let erased: Vec<InscriptionId> = plan.erased().copied().collect();
        if let Some(id) = erased.iter().find(|id| !self.registry.contains(id)) {
            return Err(IndexError::Storage(format!(
                "inscription {id} has locations but is not registered"
            )));
        }

        self.ledger.apply_rollback(&plan);
        for id in &erased {
            self.registry.remove(id);
        }
        let removed_blocks = self.blocks.rollback(block_height);
        let removed_mints = self.mints.rollback(block_height);
        self.cache.get_mut().invalidate_from(block_height);

        let summary = RollbackSummary {
            from_height: block_height,
            removed_locations: plan.removed.len() as u64,
            rewound_pointers: plan.rewound().count() as u64,
            erased_inscriptions: erased.len() as u64,
            removed_blocks,
            removed_mints,
            released_halts: plan.released.len() as u64,
        };

        log::info!("{summary}");

        Ok(summary)
    }

    pub fn halted_chains(&self) -> Vec<HaltedChain> {
        self.ledger
            .halted()
            .into_iter()
            .map(|(id, record)| HaltedChain {
                inscription_id: id.to_string(),
                rejected: record.rejected,
                expected: record.expected.to_string(),
                received: record.received.to_string(),
            })
            .collect()
    }

    /// Lets a halted chain accept appends again. Returns `false` if it was not halted.
    pub fn release_halted_chain(&mut self, id: &str) -> IndexResult<bool> {
        let id = InscriptionId::from_str(id)?;
        let released = self.ledger.release(&id);

        if released {
            log::info!("Location chain of inscription {id} is released");
        }

        Ok(released)
    }

    pub fn get_inscription(&self, id: &str) -> IndexResult<Option<Inscription>> {
        self.inscription(InscriptionId::from_str(id)?)
    }

    pub fn get_inscription_by_number(&self, number: i64) -> IndexResult<Option<Inscription>> {
        match self.registry.id_by_number(number) {
            Some(id) => self.inscription(id),
            None => Ok(None),
        }
    }

    pub fn get_inscription_content(&self, id: &str) -> IndexResult<Option<InscriptionContent>> {
        Ok(self.registry.content(&InscriptionId::from_str(id)?))
    }

    pub fn get_current_location(&self, id: &str) -> IndexResult<Option<InscriptionLocation>> {
        let id = InscriptionId::from_str(id)?;
        let Some(current) = self.ledger.current(&id) else {
            return Ok(None);
        };

        let entry = self.stored_location(id, current.order)?;
        Ok(Some(entry.to_api(current.order)))
    }

    /// Locations of an inscription, newest first.
    pub fn get_inscription_transfers(
        &self,
        id: &str,
        limit: u64,
        offset: u64,
    ) -> IndexResult<Option<PaginatedResp<InscriptionLocation>>> {
        let id = InscriptionId::from_str(id)?;
        if !self.registry.contains(&id) {
            return Ok(None);
        }

        let locations = self.ledger.locations(id);
        let total = locations.len() as u64;

        Ok(Some(PaginatedResp::page(
            locations
                .into_iter()
                .rev()
                .map(|(order, entry)| entry.to_api(order)),
            total,
            limit,
            offset,
        )))
    }

    /// Transitions of an inscription, newest first. The genesis is reported
    /// with no `from` endpoint.
    pub fn get_inscription_transitions(
        &self,
        id: &str,
        limit: u64,
        offset: u64,
    ) -> IndexResult<Option<PaginatedResp<InscriptionTransition>>> {
        let id = InscriptionId::from_str(id)?;
        if !self.registry.contains(&id) {
            return Ok(None);
        }

        let locations = self.ledger.locations(id);
        let total = locations.len() as u64;
        let page = PaginatedResp::page(locations.into_iter().rev(), total, limit, offset);

        self.transitions_page(page, |(order, entry)| (id, order, entry))
            .map(Some)
    }

    /// Transfers recorded in one block, in block order. Reveals are not included.
    pub fn get_block_transfers(
        &self,
        block_height: u64,
        limit: u64,
        offset: u64,
    ) -> IndexResult<PaginatedResp<InscriptionTransition>> {
        let transfers: Vec<_> = self
            .ledger
            .block_locations(block_height)
            .into_iter()
            .filter(|(_, _, entry)| !entry.is_genesis())
            .collect();
        let total = transfers.len() as u64;
        let page = PaginatedResp::page(transfers, total, limit, offset);

        self.transitions_page(page, |(order, id, entry)| (id, order, entry))
    }

    /// Inscriptions revealed per block with the running total, ascending.
    ///
    /// Missing bounds default to the first indexed block and the tip.
    pub fn get_inscription_count_per_block(
        &self,
        from: Option<u64>,
        to: Option<u64>,
    ) -> IndexResult<Vec<BlockInscriptionCount>> {
        let (Some(first), Some(tip)) = (self.blocks.first_height(), self.blocks.tip()) else {
            return Ok(vec![]);
        };

        let from = from.unwrap_or(first);
        let to = to.unwrap_or(tip).min(tip);
        if from > to {
            return Ok(vec![]);
        }

        self.with_cache(StatsQuery::InscriptionCountPerBlock { from, to }, || {
            Ok(self.blocks.counts(Some(from), Some(to)))
        })
    }

    /// `BRC-20` mints in the window of `block_offset` blocks below the tip.
    ///
    /// Returns `None` if the window cannot be resolved since nothing is indexed.
    pub fn get_mint_flow(
        &self,
        block_offset: BlockOffset,
        limit: u64,
        offset: u64,
    ) -> IndexResult<Option<PaginatedResp<Brc20MintFlowEntry>>> {
        let (floor, tip) = match self.resolve_floor(block_offset) {
            Ok(bounds) => bounds,
            Err(IndexError::RangeUnresolvable) => {
                log::debug!("Mint flow window {block_offset} cannot be resolved");
                return Ok(None);
            }
            Err(err) => return Err(err),
        };

        let query = StatsQuery::MintFlow {
            floor,
            tip,
            limit,
            offset,
        };

        self.with_cache(query, || Ok(self.mints.page(floor, limit, offset)))
            .map(Some)
    }

    /// Returns the cached result of `query` or computes it.
    ///
    /// Only results depending on blocks below the reorg safety margin are
    /// cached. Failures are never cached.
    pub fn with_cache<T, F>(&self, query: StatsQuery, compute: F) -> IndexResult<T>
    where
        T: CandidType + DeserializeOwned,
        F: FnOnce() -> IndexResult<T>,
    {
        let cacheable = cache::is_immutable(
            query.upper_bound(),
            self.tip(),
            self.config.get().reorg_safety_margin,
        );

        if cacheable {
            let cached = self.cache.borrow().get(&query);
            if let Some(value) = cached {
                log::trace!("Cache hit for {query:?}");
                return Ok(value);
            }
        }

        let value = compute()?;

        if cacheable {
            self.cache.borrow_mut().insert(query, &value);
        }

        Ok(value)
    }

    /// Number of cached statistics results.
    pub fn cached_results(&self) -> usize {
        self.cache.borrow().len()
    }

    /// Lowest height of the window and the tip it was resolved against.
    fn resolve_floor(&self, block_offset: BlockOffset) -> IndexResult<(u64, u64)> {
        let (Some(first), Some(tip)) = (self.blocks.first_height(), self.blocks.tip()) else {
            return Err(IndexError::RangeUnresolvable);
        };

        let span = block_offset.span(self.config.get().blocks_per_day())?;

        Ok((tip.saturating_sub(span).max(first), tip))
    }

    fn inscription(&self, id: InscriptionId) -> IndexResult<Option<Inscription>> {
        let Some(entry) = self.registry.get(&id) else {
            return Ok(None);
        };

        let current = self.ledger.current(&id).ok_or_else(|| {
            IndexError::Storage(format!("inscription {id} has no current location"))
        })?;
        let genesis = self.stored_location(id, entry.genesis)?;
        let latest = self.stored_location(id, current.order)?;
        let recursive = entry.is_recursive();

        Ok(Some(Inscription {
            id: id.to_string(),
            number: entry.number,
            address: latest.address,
            genesis_address: genesis.address,
            genesis_block_height: entry.genesis.block_height,
            genesis_block_hash: genesis.block_hash,
            genesis_tx_id: genesis.tx_id,
            genesis_fee: entry.genesis_fee.to_string(),
            genesis_timestamp: genesis.timestamp,
            tx_id: latest.tx_id,
            location: latest.satpoint.location(),
            output: latest.satpoint.output,
            value: Some(latest.satpoint.value.to_string()),
            offset: Some(latest.satpoint.offset.to_string()),
            sat_ordinal: entry.sat_ordinal.to_string(),
            sat_rarity: entry.sat_rarity.to_string(),
            sat_coinbase_height: entry.sat_coinbase_height,
            mime_type: entry.mime_type,
            content_type: entry.content_type,
            content_length: entry.content_length,
            timestamp: latest.timestamp,
            curse_type: entry.curse_type,
            recursive,
            recursion_refs: recursive.then_some(entry.recursion_refs),
        }))
    }

    fn transitions_page<I, F>(
        &self,
        page: PaginatedResp<I>,
        location: F,
    ) -> IndexResult<PaginatedResp<InscriptionTransition>>
    where
        F: Fn(I) -> (InscriptionId, LocationOrderKey, LocationEntry),
    {
        let results = page
            .results
            .into_iter()
            .map(|item| {
                let (id, order, entry) = location(item);
                self.transition(id, order, entry)
            })
            .collect::<IndexResult<Vec<_>>>()?;

        Ok(PaginatedResp {
            limit: page.limit,
            offset: page.offset,
            total: page.total,
            results,
        })
    }

    fn transition(
        &self,
        id: InscriptionId,
        order: LocationOrderKey,
        entry: LocationEntry,
    ) -> IndexResult<InscriptionTransition> {
        let inscription = self
            .registry
            .get(&id)
            .ok_or_else(|| IndexError::Storage(format!("inscription {id} is not registered")))?;
        let current = self.ledger.current(&id).map(|current| current.order);

        let from = match &entry.previous {
            Some(previous) => Some((previous.order, self.stored_location(id, previous.order)?)),
            None => None,
        };
        let from_genesis = from
            .as_ref()
            .is_some_and(|(from, _)| *from == inscription.genesis);
        let from_current = from
            .as_ref()
            .is_some_and(|(from, _)| Some(*from) == current);

        Ok(InscriptionTransition {
            id: id.to_string(),
            number: inscription.number,
            from: from.map(|(from, from_entry)| from_entry.to_api(from)),
            to: entry.to_api(order),
            from_genesis,
            to_genesis: order == inscription.genesis,
            from_current,
            to_current: Some(order) == current,
        })
    }

    fn stored_location(&self, id: InscriptionId, order: LocationOrderKey) -> IndexResult<LocationEntry> {
        self.ledger.location(id, order).ok_or_else(|| {
            IndexError::Storage(format!("location {order} of inscription {id} is missing"))
        })
    }
}

fn normalize_txid(tx_id: &str) -> IndexResult<String> {
    Txid::from_str(tx_id)
        .map(|txid| txid.to_string())
        .map_err(|_| IndexError::InvalidInput(format!("invalid transaction id `{tx_id}`")))
}

fn normalize_output(output: &str) -> IndexResult<String> {
    OutPoint::from_str(output)
        .map(|outpoint| outpoint.to_string())
        .map_err(|_| IndexError::InvalidInput(format!("invalid output `{output}`")))
}

fn normalize_block_hash(hash: &str) -> IndexResult<String> {
    BlockHash::from_str(hash)
        .map(|hash| hash.to_string())
        .map_err(|_| IndexError::InvalidInput(format!("invalid block hash `{hash}`")))
}
