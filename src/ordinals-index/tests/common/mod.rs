#![allow(dead_code)]

use bitcoin::hashes::Hash;
use bitcoin::{BlockHash, Txid};
use ic_stable_structures::VectorMemory;
use ordinals_index::config::IndexConfig;
use ordinals_index::did::brc20::Brc20MintEvent;
use ordinals_index::did::events::{
    BlockHeader, GenesisFacts, LocationEvent, LocationEventKind, TransferFacts,
};
use ordinals_index::did::inscription::{SatRarity, TransferType};
use ordinals_index::did::keys::InscriptionId;
use ordinals_index::OrdinalsIndex;

pub const BLOCKS_PER_DAY: u64 = 144;

pub fn new_index() -> OrdinalsIndex<VectorMemory> {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut index = OrdinalsIndex::with_memory(VectorMemory::default());
    index
        .configure(IndexConfig {
            blocks_per_day: BLOCKS_PER_DAY,
            reorg_safety_margin: 6,
            cache_capacity: 64,
        })
        .unwrap();

    index
}

pub fn inscription_id(seed: u8) -> String {
    InscriptionId::new(Txid::from_byte_array([seed; 32]), 0).to_string()
}

pub fn header(height: u64) -> BlockHeader {
    let mut bytes = [0; 32];
    bytes[..8].copy_from_slice(&height.to_be_bytes());

    BlockHeader {
        height,
        hash: BlockHash::from_byte_array(bytes).to_string(),
        timestamp: 1_700_000_000 + height as i64 * 600,
    }
}

pub fn genesis(seed: u8, number: i64, height: u64, tx_index: u32) -> LocationEvent {
    let header = header(height);
    let txid = Txid::from_byte_array([seed; 32]);

    LocationEvent {
        inscription_id: inscription_id(seed),
        block_height: height,
        block_hash: header.hash,
        tx_id: txid.to_string(),
        tx_index,
        block_transfer_index: 0,
        output: format!("{txid}:0"),
        offset: 0,
        value: 10_000,
        address: Some(format!("bc1p-owner-{seed}")),
        timestamp: header.timestamp,
        kind: LocationEventKind::Genesis(GenesisFacts {
            number,
            fee: 3_000,
            mime_type: "application/json".to_string(),
            content_type: "application/json".to_string(),
            content: br#"{"p":"brc-20","op":"mint","tick":"ordi","amt":"1000"}"#.to_vec(),
            curse_type: None,
            recursion_refs: vec![],
            sat_ordinal: 1_000_000 + seed as u64,
            sat_rarity: SatRarity::Common,
            sat_coinbase_height: 1,
        }),
    }
}

pub fn transfer(from: &LocationEvent, height: u64, tx_index: u32) -> LocationEvent {
    let header = header(height);
    let mut bytes = [0xcd; 32];
    bytes[..8].copy_from_slice(&height.to_be_bytes());
    bytes[8..12].copy_from_slice(&tx_index.to_be_bytes());
    let txid = Txid::from_byte_array(bytes);

    LocationEvent {
        inscription_id: from.inscription_id.clone(),
        block_height: height,
        block_hash: header.hash,
        tx_id: txid.to_string(),
        tx_index,
        block_transfer_index: 0,
        output: format!("{txid}:0"),
        offset: 0,
        value: 546,
        address: Some(format!("bc1p-{height}-{tx_index}")),
        timestamp: header.timestamp,
        kind: LocationEventKind::Transfer(TransferFacts {
            prev_output: from.output.clone(),
            prev_offset: from.offset,
            prev_value: from.value,
            transfer_type: TransferType::Transferred,
        }),
    }
}

pub fn mint(from: &LocationEvent) -> Brc20MintEvent {
    Brc20MintEvent {
        inscription_id: from.inscription_id.clone(),
        ticker: "ordi".to_string(),
        amount: "1000".to_string(),
        block_height: from.block_height,
        block_hash: from.block_hash.clone(),
        tx_id: from.tx_id.clone(),
        tx_index: from.tx_index,
        address: from.address.clone(),
        timestamp: from.timestamp,
    }
}

/// Ingestion input of one block.
#[derive(Debug, Clone, Default)]
pub struct BlockInput {
    pub height: u64,
    pub locations: Vec<LocationEvent>,
    pub mints: Vec<Brc20MintEvent>,
}

pub fn ingest(index: &mut OrdinalsIndex<VectorMemory>, block: &BlockInput) {
    index.index_block(header(block.height)).unwrap();
    for event in &block.locations {
        index.append_location(event.clone()).unwrap();
    }
    for event in &block.mints {
        index.record_mint(event.clone()).unwrap();
    }
}

/// Blocks 100..=105: three inscriptions revealed, moved around and minted.
pub fn scenario() -> Vec<BlockInput> {
    let a = genesis(1, 0, 100, 1);
    let b = genesis(2, 1, 100, 2);
    let a1 = transfer(&a, 102, 0);
    let c = genesis(3, 2, 103, 4);
    let b1 = transfer(&b, 103, 1);
    let a2 = transfer(&a1, 104, 3);
    let b2 = transfer(&b1, 105, 0);

    vec![
        BlockInput {
            height: 100,
            mints: vec![mint(&a), mint(&b)],
            locations: vec![a, b],
        },
        BlockInput {
            height: 101,
            ..Default::default()
        },
        BlockInput {
            height: 102,
            locations: vec![a1],
            ..Default::default()
        },
        BlockInput {
            height: 103,
            mints: vec![mint(&c)],
            locations: vec![b1, c],
        },
        BlockInput {
            height: 104,
            locations: vec![a2],
            ..Default::default()
        },
        BlockInput {
            height: 105,
            locations: vec![b2],
            ..Default::default()
        },
    ]
}
