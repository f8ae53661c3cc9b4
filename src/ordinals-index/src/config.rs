use std::borrow::Cow;

use candid::{CandidType, Decode, Encode};
use ic_stable_structures::storable::Bound;
use ic_stable_structures::{Memory, StableCell, Storable};
use ordinals_index_did::error::{IndexError, IndexResult};
use serde::Deserialize;

/// Depth of the deepest reorg expected on mainnet.
pub const DEFAULT_REORG_SAFETY_MARGIN: u64 = 6;
/// Maximum number of cached statistics results.
pub const DEFAULT_CACHE_CAPACITY: u32 = 1000;

pub struct IndexConfigStorage<M: Memory> {
    config: StableCell<IndexConfig, M>,
}

impl<M> IndexConfigStorage<M>
where
    M: Memory,
{
    pub fn new(memory: M) -> Self {
        Self {
            config: StableCell::init(memory, IndexConfig::default())
                .expect("stable memory config initialization failed"),
        }
    }

    pub fn get(&self) -> &IndexConfig {
        self.config.get()
    }

    pub fn set(&mut self, config: IndexConfig) -> IndexResult<()> {
        self.config
            .set(config)
            .map(|_| ())
            .map_err(|err| IndexError::Storage(format!("failed to set config: {err:?}")))
    }

    pub fn with_borrow_mut<F>(&mut self, f: F) -> IndexResult<()>
    where
        F: FnOnce(&mut IndexConfig),
    {
        let mut config = self.config.get().clone();

        f(&mut config);

        self.set(config)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, CandidType, Deserialize)]
pub struct IndexConfig {
    /// Average number of blocks mined per day, used to resolve day offsets.
    /// Zero means the value was never configured.
    pub blocks_per_day: u64,
    /// Statistics whose upper bound is at least this many blocks below the
    /// tip are considered immutable and cached without expiry.
    pub reorg_safety_margin: u64,
    /// Maximum number of cached statistics results.
    pub cache_capacity: u32,
}

impl Storable for IndexConfig {
    const BOUND: Bound = Bound::Unbounded;

    fn to_bytes(&self) -> Cow<[u8]> {
        Encode!(self).expect("Failed to encode IndexConfig").into()
    }

    fn from_bytes(bytes: Cow<[u8]>) -> Self {
        Decode!(&bytes, IndexConfig).expect("Failed to decode IndexConfig")
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            blocks_per_day: 0,
            reorg_safety_margin: DEFAULT_REORG_SAFETY_MARGIN,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl IndexConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.blocks_per_day == 0 {
            return Err("blocks per day must be configured".to_string());
        }

        if self.cache_capacity == 0 {
            return Err("cache capacity must be positive".to_string());
        }

        Ok(())
    }

    /// Blocks per day, if configured.
    pub fn blocks_per_day(&self) -> Option<u64> {
        (self.blocks_per_day > 0).then_some(self.blocks_per_day)
    }
}
