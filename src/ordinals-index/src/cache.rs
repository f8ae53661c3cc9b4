use std::collections::{HashMap, VecDeque};

use candid::ser::IDLBuilder;
use candid::CandidType;
use serde::de::DeserializeOwned;

/// A statistics query with every bound resolved to an absolute height.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StatsQuery {
    InscriptionCountPerBlock {
        from: u64,
        to: u64,
    },
    MintFlow {
        floor: u64,
        /// Chain tip the floor was resolved against.
        tip: u64,
        limit: u64,
        offset: u64,
    },
}

impl StatsQuery {
    /// Highest block height the result depends on.
    pub fn upper_bound(&self) -> u64 {
        match self {
            Self::InscriptionCountPerBlock { to, .. } => *to,
            Self::MintFlow { tip, .. } => *tip,
        }
    }
}

/// Whether a result depending on blocks up to `upper_bound` can no longer
/// change through a reorg.
pub fn is_immutable(upper_bound: u64, tip: Option<u64>, reorg_safety_margin: u64) -> bool {
    tip.and_then(|tip| tip.checked_sub(reorg_safety_margin))
        .is_some_and(|settled| upper_bound < settled)
}

/// In-memory cache of candid encoded statistics results with FIFO eviction.
#[derive(Debug)]
pub struct StatsCache {
    entries: HashMap<StatsQuery, Vec<u8>>,
    order: VecDeque<StatsQuery>,
    capacity: usize,
}

impl StatsCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            capacity,
        }
    }

    pub fn get<T>(&self, query: &StatsQuery) -> Option<T>
    where
        T: CandidType + DeserializeOwned,
    {
        let bytes = self.entries.get(query)?;
        match candid::decode_one(bytes) {
            Ok(value) => Some(value),
            Err(err) => {
                log::warn!("Cached result of {query:?} cannot be decoded: {err}");
                None
            }
        }
    }

    pub fn insert<T>(&mut self, query: StatsQuery, value: &T)
    where
        T: CandidType,
    {
        if self.capacity == 0 {
            return;
        }

        let mut builder = IDLBuilder::new();
        let bytes = match builder
            .arg(value)
            .and_then(|builder| builder.serialize_to_vec())
        {
            Ok(bytes) => bytes,
            Err(err) => {
                log::warn!("Result of {query:?} cannot be cached: {err}");
                return;
            }
        };

        if self.entries.insert(query.clone(), bytes).is_none() {
            self.order.push_back(query);
        }

        while self.entries.len() > self.capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            self.entries.remove(&oldest);
        }
    }

    /// Drops every entry depending on a block at or above `block_height`.
    pub fn invalidate_from(&mut self, block_height: u64) {
        self.entries
            .retain(|query, _| query.upper_bound() < block_height);
        let entries = &self.entries;
        self.order.retain(|query| entries.contains_key(query));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
