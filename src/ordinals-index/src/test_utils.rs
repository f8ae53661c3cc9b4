use bitcoin::hashes::Hash;
use bitcoin::{BlockHash, Txid};
use ordinals_index_did::brc20::Brc20MintEvent;
use ordinals_index_did::events::{
    BlockHeader, GenesisFacts, LocationEvent, LocationEventKind, TransferFacts,
};
use ordinals_index_did::inscription::{SatRarity, TransferType};
use ordinals_index_did::keys::InscriptionId;

pub fn init_log() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn inscription_id(seed: u8) -> InscriptionId {
    InscriptionId::new(Txid::from_byte_array([seed; 32]), 0)
}

pub fn block_hash(height: u64) -> String {
    let mut bytes = [0; 32];
    bytes[..8].copy_from_slice(&height.to_be_bytes());

    BlockHash::from_byte_array(bytes).to_string()
}

pub fn block_header(height: u64) -> BlockHeader {
    BlockHeader {
        height,
        hash: block_hash(height),
        timestamp: 1_700_000_000 + height as i64 * 600,
    }
}

pub fn output(seed: u8, vout: u32) -> String {
    format!("{}:{vout}", Txid::from_byte_array([seed; 32]))
}

fn transfer_txid(height: u64, tx_index: u32) -> Txid {
    let mut bytes = [0xab; 32];
    bytes[..8].copy_from_slice(&height.to_be_bytes());
    bytes[8..12].copy_from_slice(&tx_index.to_be_bytes());

    Txid::from_byte_array(bytes)
}

pub fn genesis_facts(number: i64) -> GenesisFacts {
    GenesisFacts {
        number,
        fee: 2_805,
        mime_type: "text/plain".to_string(),
        content_type: "text/plain;charset=utf-8".to_string(),
        content: format!("inscription #{number}").into_bytes(),
        curse_type: None,
        recursion_refs: vec![],
        sat_ordinal: 1_932_229_390_000_000 + number.unsigned_abs(),
        sat_rarity: SatRarity::Common,
        sat_coinbase_height: 386_445,
    }
}

/// Reveal of `inscription_id(seed)` in its own reveal transaction.
pub fn genesis_event(seed: u8, number: i64, height: u64, tx_index: u32) -> LocationEvent {
    let header = block_header(height);
    let id = inscription_id(seed);

    LocationEvent {
        inscription_id: id.to_string(),
        block_height: height,
        block_hash: header.hash,
        tx_id: id.txid.to_string(),
        tx_index,
        block_transfer_index: 0,
        output: output(seed, 0),
        offset: 0,
        value: 10_000,
        address: Some(format!("bc1p-genesis-{seed}")),
        timestamp: header.timestamp,
        kind: LocationEventKind::Genesis(genesis_facts(number)),
    }
}

/// Move of the inscription of `from` away from the location `from` recorded.
pub fn transfer_event(
    from: &LocationEvent,
    height: u64,
    tx_index: u32,
    block_transfer_index: u32,
) -> LocationEvent {
    let header = block_header(height);
    let txid = transfer_txid(height, tx_index);

    LocationEvent {
        inscription_id: from.inscription_id.clone(),
        block_height: height,
        block_hash: header.hash,
        tx_id: txid.to_string(),
        tx_index,
        block_transfer_index,
        output: format!("{txid}:{block_transfer_index}"),
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

pub fn mint_event(seed: u8, height: u64, tx_index: u32) -> Brc20MintEvent {
    let header = block_header(height);
    let id = inscription_id(seed);

    Brc20MintEvent {
        inscription_id: id.to_string(),
        ticker: "ordi".to_string(),
        amount: "1000".to_string(),
        block_height: height,
        block_hash: header.hash,
        tx_id: id.txid.to_string(),
        tx_index,
        address: Some(format!("bc1p-genesis-{seed}")),
        timestamp: header.timestamp,
    }
}
