pub mod block_offset;
pub mod brc20;
pub mod error;
pub mod events;
pub mod inscription;
pub mod keys;
pub mod pagination;
pub mod stats;
