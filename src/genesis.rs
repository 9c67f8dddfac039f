//! Genesis block assembly and initial ledger seeding.

use crate::block::{Block, DeployCode, Header, Transaction, VmCode, VmType};
use crate::constants::{
    BLOCK_VERSION, GENESIS_NONCE, GENESIS_TIMESTAMP, GOVERNANCE_CONTRACT_ADDRESS, UTILITY_CONTRACT_ADDRESS,
};
use crate::crypto::{address_from_book_keepers, Address};
use crate::error::{ChainError, Result};
use crate::native::{
    encode_params, Distribution, FixedWitnesses, Method, NativeRegistry, NativeService, Notification,
    NotificationSink, VecSink,
};
use crate::storage::{BlockStore, OverlayDb, Store};
use secp256k1::PublicKey;
use tracing::{info, warn};

const DEPLOY_VERSION: &str = "1.0";
const DEPLOY_AUTHOR: &str = "Ontology Team";
const DEPLOY_EMAIL: &str = "contact@ont.io";

/// Invocation script of the genesis governance init: a push of
/// `"Common.Token.Transfer"` (21 bytes).
pub const GOVERNING_INIT_CODE: [u8; 22] = [
    21, 67, 111, 109, 109, 111, 110, 46, 84, 111, 107, 101, 110, 46, 84, 114, 97, 110, 115, 102, 101, 114,
];

fn deploy_native(contract: &Address, name: &str, description: &str) -> Transaction {
    Transaction::deploy(DeployCode {
        code: VmCode {
            vm_type: VmType::Native,
            code: contract.as_bytes().to_vec(),
        },
        need_storage: true,
        name: name.to_string(),
        version: DEPLOY_VERSION.to_string(),
        author: DEPLOY_AUTHOR.to_string(),
        email: DEPLOY_EMAIL.to_string(),
        description: description.to_string(),
    })
}

pub fn new_governing_token() -> Transaction {
    deploy_native(&GOVERNANCE_CONTRACT_ADDRESS, "ONT", "Ontology Network ONT Token")
}

pub fn new_utility_token() -> Transaction {
    deploy_native(&UTILITY_CONTRACT_ADDRESS, "ONG", "Ontology Network ONG Token")
}

pub fn new_governing_init() -> Transaction {
    Transaction::invoke(VmCode {
        vm_type: VmType::Native,
        code: GOVERNING_INIT_CODE.to_vec(),
    })
}

/// Builds the genesis block for a book-keeper set.
///
/// The result depends only on the set of keys, not on their order.
pub fn build_genesis_block(book_keepers: &[PublicKey]) -> Result<Block> {
    let next_book_keeper = address_from_book_keepers(book_keepers)?;

    let header = Header {
        version: BLOCK_VERSION,
        prev_block_hash: [0u8; 32],
        transactions_root: [0u8; 32],
        timestamp: GENESIS_TIMESTAMP,
        height: 0,
        consensus_data: GENESIS_NONCE,
        next_book_keeper,
        book_keepers: Vec::new(),
        sig_data: Vec::new(),
    };

    let block = Block {
        header,
        transactions: vec![new_governing_token(), new_utility_token(), new_governing_init()],
    };
    info!(
        "genesis block {} assembled for {} book-keepers, next book-keeper {}",
        hex::encode(block.hash()),
        book_keepers.len(),
        next_book_keeper
    );
    Ok(block)
}

/// Records the genesis block and runs both token `init`s at the genesis
/// timestamp. Either everything is written or nothing is.
pub fn seed_ledger<S: Store + BlockStore>(
    db: &mut OverlayDb<S>,
    registry: &NativeRegistry,
    block: &Block,
    distribution: &Distribution,
    sink: &mut dyn NotificationSink,
) -> Result<Vec<Notification>> {
    if db.backend().load_block(0)?.is_some() {
        return Err(ChainError::AlreadyInitialized("genesis block already recorded".to_string()));
    }

    let witness = FixedWitnesses::none();
    let mut events = VecSink::default();
    let result = {
        let mut service = NativeService::new(registry, db, &witness, &mut events, block.header.timestamp);
        service
            .native_call(GOVERNANCE_CONTRACT_ADDRESS, Method::Init, &encode_params(distribution))
            .and_then(|_| service.native_call(UTILITY_CONTRACT_ADDRESS, Method::Init, &[]))
    };

    if let Err(e) = result {
        warn!("genesis seeding failed: {}", e);
        db.discard();
        return Err(e);
    }
    if let Err(e) = db.backend_mut().save_block(block) {
        warn!("failed to record genesis block: {}", e);
        db.discard();
        return Err(e);
    }
    if let Err(e) = db.commit() {
        warn!("failed to commit genesis state: {}", e);
        db.discard();
        db.backend_mut().remove_block(block.header.height)?;
        return Err(e);
    }

    for event in &events.events {
        sink.notify(event.clone());
    }
    info!("ledger seeded with {} initial allocations", events.events.len());
    Ok(events.events)
}
