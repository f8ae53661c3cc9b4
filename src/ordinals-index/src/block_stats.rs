use std::borrow::Cow;
use std::ops::Bound::{Excluded, Unbounded};

use candid::{CandidType, Decode, Encode};
use ic_stable_structures::storable::Bound;
use ic_stable_structures::{Memory, StableBTreeMap, Storable};
use ordinals_index_did::error::{IndexError, IndexResult};
use ordinals_index_did::events::BlockHeader;
use ordinals_index_did::stats::BlockInscriptionCount;
use serde::Deserialize;

/// Per-block inscription counters.
#[derive(Debug, Clone, PartialEq, Eq, CandidType, Deserialize)]
pub struct BlockCountEntry {
    pub hash: String,
    pub timestamp: i64,
    /// Inscriptions revealed in this block.
    pub inscription_count: u64,
    /// Inscriptions revealed in every indexed block up to and including this one.
    pub inscription_count_accum: u64,
}

impl BlockCountEntry {
    fn to_api(&self, block_height: u64) -> BlockInscriptionCount {
        BlockInscriptionCount {
            block_height,
            block_hash: self.hash.clone(),
            inscription_count: self.inscription_count,
            inscription_count_accum: self.inscription_count_accum,
            timestamp: self.timestamp,
        }
    }
}

impl Storable for BlockCountEntry {
    fn to_bytes(&self) -> Cow<[u8]> {
        Encode!(self)
            .expect("Failed to encode BlockCountEntry")
            .into()
    }

    fn from_bytes(bytes: Cow<[u8]>) -> Self {
        Decode!(&bytes, BlockCountEntry).expect("Failed to decode BlockCountEntry")
    }

    const BOUND: Bound = Bound::Unbounded;
}

/// Indexed blocks with their inscription counts.
///
/// For every stored block `inscription_count_accum` equals the sum of
/// `inscription_count` over all stored blocks at or below it.
pub struct BlockStats<M: Memory> {
    blocks: StableBTreeMap<u64, BlockCountEntry, M>,
}

impl<M> BlockStats<M>
where
    M: Memory,
{
    pub fn new(memory: M) -> Self {
        Self {
            blocks: StableBTreeMap::init(memory),
        }
    }

    /// Highest indexed block.
    pub fn tip(&self) -> Option<u64> {
        self.blocks.last_key_value().map(|(height, _)| height)
    }

    /// Lowest indexed block.
    pub fn first_height(&self) -> Option<u64> {
        self.blocks.first_key_value().map(|(height, _)| height)
    }

    pub fn get(&self, block_height: u64) -> Option<BlockCountEntry> {
        self.blocks.get(&block_height)
    }

    /// Returns whether the block is not indexed yet.
    ///
    /// Fails if a block with the same height but another hash is indexed.
    pub fn check_block(&self, header: &BlockHeader) -> IndexResult<bool> {
        match self.blocks.get(&header.height) {
            None => Ok(true),
            Some(entry) if entry.hash == header.hash => Ok(false),
            Some(entry) => Err(IndexError::BlockHashMismatch {
                height: header.height,
                indexed: entry.hash,
                received: header.hash.clone(),
            }),
        }
    }

    /// Stores a block with no inscriptions.
    pub fn insert_block(&mut self, header: &BlockHeader) {
        let accum = self.accum_before(header.height);

        log::trace!("Block {} ({}) added to statistics", header.height, header.hash);

        self.blocks.insert(
            header.height,
            BlockCountEntry {
                hash: header.hash.clone(),
                timestamp: header.timestamp,
                inscription_count: 0,
                inscription_count_accum: accum,
            },
        );
    }

    /// Counts a new genesis in the block at `block_height`.
    pub fn record_inscription(&mut self, block_height: u64) -> IndexResult<()> {
        let mut entry = self.blocks.get(&block_height).ok_or_else(|| {
            IndexError::Storage(format!("block {block_height} is not indexed"))
        })?;
        entry.inscription_count += 1;
        entry.inscription_count_accum += 1;
        self.blocks.insert(block_height, entry);

        let following: Vec<(u64, BlockCountEntry)> = self
            .blocks
            .range((Excluded(block_height), Unbounded))
            .collect();
        for (height, mut entry) in following {
            entry.inscription_count_accum += 1;
            self.blocks.insert(height, entry);
        }

        Ok(())
    }

    /// Removes every block at or above `block_height`. Returns the number of
    /// removed blocks.
    pub fn rollback(&mut self, block_height: u64) -> u64 {
        let removed: Vec<u64> = self
            .blocks
            .range(block_height..)
            .map(|(height, _)| height)
            .collect();

        for height in &removed {
            self.blocks.remove(height);
        }

        removed.len() as u64
    }

    /// Blocks between `from` and `to` inclusive, each side unbounded if unset.
    pub fn counts(&self, from: Option<u64>, to: Option<u64>) -> Vec<BlockInscriptionCount> {
        let from = from.unwrap_or(0);
        let to = to.unwrap_or(u64::MAX);
        if from > to {
            return vec![];
        }

        self.blocks
            .range(from..=to)
            .map(|(height, entry)| entry.to_api(height))
            .collect()
    }

    /// Cumulative count of the blocks below `block_height`.
    fn accum_before(&self, block_height: u64) -> u64 {
        self.blocks
            .range(..block_height)
            .last()
            .map(|(_, entry)| entry.inscription_count_accum)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use ic_stable_structures::VectorMemory;

    use super::*;
    use crate::test_utils::block_hash;

    fn header(height: u64) -> BlockHeader {
        BlockHeader {
            height,
            hash: block_hash(height),
            timestamp: height as i64 * 600,
        }
    }

    fn stats_with(counts: &[(u64, u64)]) -> BlockStats<VectorMemory> {
        let mut stats = BlockStats::new(VectorMemory::default());
        for (height, count) in counts {
            stats.insert_block(&header(*height));
            for _ in 0..*count {
                stats.record_inscription(*height).unwrap();
            }
        }

        stats
    }

    fn assert_accumulated(stats: &BlockStats<VectorMemory>) {
        let mut sum = 0;
        for row in stats.counts(None, None) {
            sum += row.inscription_count;
            assert_eq!(row.inscription_count_accum, sum, "block {}", row.block_height);
        }
    }

    #[test]
    fn test_should_accumulate_counts() {
        let stats = stats_with(&[(100, 2), (101, 0), (102, 3), (103, 1)]);

        let rows = stats.counts(Some(100), Some(103));
        let accum: Vec<u64> = rows.iter().map(|row| row.inscription_count_accum).collect();
        assert_eq!(accum, vec![2, 2, 5, 6]);
        assert_accumulated(&stats);
    }

    #[test]
    fn test_should_keep_accumulation_when_counting_older_block() {
        let mut stats = stats_with(&[(100, 1), (101, 1), (102, 1)]);

        stats.record_inscription(100).unwrap();

        assert_accumulated(&stats);
        assert_eq!(stats.get(102).unwrap().inscription_count_accum, 4);
    }

    #[test]
    fn test_should_detect_hash_mismatch() {
        let stats = stats_with(&[(100, 0)]);

        assert_eq!(stats.check_block(&header(100)), Ok(false));
        assert_eq!(stats.check_block(&header(101)), Ok(true));

        let mut forked = header(100);
        forked.hash = block_hash(9999);
        assert!(matches!(
            stats.check_block(&forked),
            Err(IndexError::BlockHashMismatch { height: 100, .. })
        ));
    }

    #[test]
    fn test_should_roll_back_blocks() {
        let mut stats = stats_with(&[(100, 2), (101, 0), (102, 3), (103, 1)]);

        assert_eq!(stats.rollback(102), 2);
        assert_eq!(stats.tip(), Some(101));
        assert_eq!(stats.first_height(), Some(100));

        stats.insert_block(&header(102));
        stats.record_inscription(102).unwrap();
        assert_eq!(stats.get(102).unwrap().inscription_count_accum, 3);
        assert_accumulated(&stats);
    }

    #[test]
    fn test_should_return_empty_range() {
        let stats = stats_with(&[(100, 2), (101, 0)]);

        assert!(stats.counts(Some(101), Some(100)).is_empty());
        assert!(stats.counts(Some(200), None).is_empty());
        assert_eq!(stats.counts(None, Some(100)).len(), 1);
    }

    #[test]
    fn test_should_fail_counting_unknown_block() {
        let mut stats = stats_with(&[(100, 0)]);

        assert!(matches!(
            stats.record_inscription(101),
            Err(IndexError::Storage(_))
        ));
    }
}
