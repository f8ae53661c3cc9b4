pub mod block_stats;
pub mod cache;
pub mod config;
mod index;
pub mod ledger;
pub mod memory;
pub mod mint_flow;
pub mod registry;
pub mod state;
#[cfg(test)]
mod test_utils;

pub use self::index::OrdinalsIndex;
pub use ordinals_index_did as did;
