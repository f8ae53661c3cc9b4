//! Memory ids for the index
//!
//! DO NOT USE ANY MEMORY ID BELOW 10, since used by the sdk

use ic_stable_structures::memory_manager::{MemoryId, MemoryManager};
use ic_stable_structures::DefaultMemoryImpl;

pub const CONFIG_MEMORY_ID: MemoryId = MemoryId::new(10);
pub const INSCRIPTIONS_MEMORY_ID: MemoryId = MemoryId::new(11);
pub const INSCRIPTION_NUMBERS_MEMORY_ID: MemoryId = MemoryId::new(12);
pub const INSCRIPTION_CONTENT_MEMORY_ID: MemoryId = MemoryId::new(13);
pub const LOCATIONS_MEMORY_ID: MemoryId = MemoryId::new(14);
pub const BLOCK_LOCATIONS_MEMORY_ID: MemoryId = MemoryId::new(15);
pub const CURRENT_LOCATIONS_MEMORY_ID: MemoryId = MemoryId::new(16);
pub const HALTED_CHAINS_MEMORY_ID: MemoryId = MemoryId::new(17);
pub const BLOCK_COUNTS_MEMORY_ID: MemoryId = MemoryId::new(18);
pub const MINT_EVENTS_MEMORY_ID: MemoryId = MemoryId::new(19);

thread_local! {
    pub static MEMORY_MANAGER: MemoryManager<DefaultMemoryImpl> = MemoryManager::init(DefaultMemoryImpl::default());
}
