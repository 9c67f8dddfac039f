#![forbid(unsafe_code)]
//! Command line front end for the native token ledger.

use clap::{Parser, Subcommand, ValueEnum};
use native_ledger::codec::Encode;
use native_ledger::config::{load_config, load_config_from, load_distribution, Config};
use native_ledger::constants::{GOVERNANCE_CONTRACT_ADDRESS, UTILITY_CONTRACT_ADDRESS};
use native_ledger::crypto::{Address, KeyPair};
use native_ledger::error::{ChainError, Result};
use native_ledger::genesis::{build_genesis_block, seed_ledger};
use native_ledger::native::{
    decode_u64, encode_params, ledger, AccountQuery, Invocation, NativeRegistry, Notification, SignedWitnesses,
    State, TransferFrom, Transfers, VecSink,
};
use native_ledger::storage::{BlockStore, OverlayDb, SqliteStore};
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file (defaults to ./config.toml)
    #[arg(long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Token {
    Ont,
    Ong,
}

impl Token {
    fn contract(self) -> Address {
        match self {
            Token::Ont => GOVERNANCE_CONTRACT_ADDRESS,
            Token::Ong => UTILITY_CONTRACT_ADDRESS,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Generates a new key pair
    Keygen,
    /// Prints the genesis block for the configured book-keepers
    Genesis,
    /// Records the genesis block and seeds the initial distribution
    Init {
        /// JSON distribution manifest (defaults to chain.distribution)
        #[arg(long)]
        distribution: Option<String>,
    },
    /// Shows the balance of an address
    Balance {
        #[arg(long, value_enum, default_value = "ont")]
        token: Token,
        address: String,
    },
    /// Shows the allowance granted by `owner` to `spender`
    Allowance {
        #[arg(long, value_enum, default_value = "ont")]
        token: Token,
        owner: String,
        spender: String,
    },
    /// Shows the utility tokens an address could unbind right now
    Unbound { address: String },
    /// Transfers tokens, signed with a hex secret key
    Transfer {
        #[arg(long, value_enum, default_value = "ont")]
        token: Token,
        #[arg(long)]
        key: String,
        to: String,
        amount: u64,
    },
    /// Approves `spender` to move tokens on behalf of the key's address
    Approve {
        #[arg(long, value_enum, default_value = "ont")]
        token: Token,
        #[arg(long)]
        key: String,
        spender: String,
        amount: u64,
    },
    /// Withdraws unbound utility tokens into the key's address
    Claim {
        #[arg(long)]
        key: String,
        /// Amount to claim (defaults to the whole granted allowance)
        amount: Option<u64>,
    },
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let output = match cli.command {
        Commands::Keygen => keygen(),
        Commands::Genesis => genesis(&config)?,
        Commands::Init { distribution } => init(&config, distribution)?,
        Commands::Balance { token, address } => {
            let owner = Address::from_hex(&address)?;
            let input = encode_params(&AccountQuery::balance(owner));
            let value = query(&config, token.contract(), "balanceOf", &input)?;
            json!({ "token": token_symbol(token), "address": owner.to_hex(), "balance": value })
        }
        Commands::Allowance { token, owner, spender } => {
            let owner = Address::from_hex(&owner)?;
            let spender = Address::from_hex(&spender)?;
            let input = encode_params(&AccountQuery::allowance(owner, spender));
            let value = query(&config, token.contract(), "allowance", &input)?;
            json!({ "token": token_symbol(token), "owner": owner.to_hex(), "spender": spender.to_hex(), "allowance": value })
        }
        Commands::Unbound { address } => {
            let owner = Address::from_hex(&address)?;
            let input = encode_params(&AccountQuery::balance(owner));
            let value = query(&config, GOVERNANCE_CONTRACT_ADDRESS, "unboundBalance", &input)?;
            json!({ "address": owner.to_hex(), "unbound": value })
        }
        Commands::Transfer { token, key, to, amount } => {
            let keypair = keypair_from_hex(&key)?;
            let params = Transfers {
                states: vec![State {
                    from: keypair.address(),
                    to: Address::from_hex(&to)?,
                    value: amount,
                }],
            };
            submit(&config, &keypair, token.contract(), "transfer", &encode_params(&params))?
        }
        Commands::Approve { token, key, spender, amount } => {
            let keypair = keypair_from_hex(&key)?;
            let params = State {
                from: keypair.address(),
                to: Address::from_hex(&spender)?,
                value: amount,
            };
            submit(&config, &keypair, token.contract(), "approve", &encode_params(&params))?
        }
        Commands::Claim { key, amount } => {
            let keypair = keypair_from_hex(&key)?;
            let owner = keypair.address();
            let value = match amount {
                Some(v) => v,
                None => {
                    let store = SqliteStore::open(&config.database.path)?;
                    ledger::get_allowance(&store, &UTILITY_CONTRACT_ADDRESS, &GOVERNANCE_CONTRACT_ADDRESS, &owner)?
                }
            };
            let params = TransferFrom {
                sender: owner,
                from: GOVERNANCE_CONTRACT_ADDRESS,
                to: owner,
                value,
            };
            submit(&config, &keypair, UTILITY_CONTRACT_ADDRESS, "transferFrom", &encode_params(&params))?
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn token_symbol(token: Token) -> &'static str {
    match token {
        Token::Ont => "ONT",
        Token::Ong => "ONG",
    }
}

fn keypair_from_hex(secret: &str) -> Result<KeyPair> {
    let bytes = hex::decode(secret.trim_start_matches("0x"))
        .map_err(|e| ChainError::CryptoError(format!("Invalid hex secret key: {}", e)))?;
    KeyPair::from_secret_bytes(&bytes)
}

fn now() -> Result<u32> {
    u32::try_from(chrono::Utc::now().timestamp())
        .map_err(|_| ChainError::ConfigError("system clock outside the u32 second range".to_string()))
}

fn keygen() -> serde_json::Value {
    let keypair = KeyPair::generate();
    json!({
        "secret_key": hex::encode(keypair.secret_key.secret_bytes()),
        "public_key": hex::encode(keypair.public_key_bytes()),
        "address": keypair.address().to_hex(),
    })
}

fn genesis(config: &Config) -> Result<serde_json::Value> {
    let block = build_genesis_block(&config.chain.book_keeper_keys()?)?;
    Ok(json!({
        "hash": hex::encode(block.hash()),
        "timestamp": block.header.timestamp,
        "next_book_keeper": block.header.next_book_keeper.to_hex(),
        "transactions": block.transactions.iter().map(|tx| tx.hash_str()).collect::<Vec<_>>(),
        "size": block.to_bytes().len(),
    }))
}

fn init(config: &Config, distribution: Option<String>) -> Result<serde_json::Value> {
    let path = distribution
        .or_else(|| config.chain.distribution.clone())
        .ok_or_else(|| ChainError::ConfigError("no distribution manifest given".to_string()))?;
    let distribution = load_distribution(&path)?;
    let block = build_genesis_block(&config.chain.book_keeper_keys()?)?;

    let registry = NativeRegistry::with_builtin_tokens();
    let mut db = OverlayDb::new(SqliteStore::open(&config.database.path)?);
    let mut sink = VecSink::default();
    let events = seed_ledger(&mut db, &registry, &block, &distribution, &mut sink)?;
    info!("genesis recorded at {}", config.database.path);

    let stored = db.backend().load_block(0)?.map(|b| hex::encode(b.hash()));
    Ok(json!({ "genesis": stored, "notifications": events }))
}

fn query(config: &Config, contract: Address, method: &str, input: &[u8]) -> Result<u64> {
    let registry = NativeRegistry::with_builtin_tokens();
    let mut db = OverlayDb::new(SqliteStore::open(&config.database.path)?);
    let witness = SignedWitnesses::default();
    let mut sink = VecSink::default();
    let output = registry.execute(&mut db, &witness, &mut sink, now()?, Invocation { contract, method, input })?;
    decode_u64(&output)
}

fn submit(config: &Config, keypair: &KeyPair, contract: Address, method: &str, input: &[u8]) -> Result<serde_json::Value> {
    let signature = keypair.sign(input)?;
    let witness = SignedWitnesses::verify(input, &[(keypair.public_key_bytes().to_vec(), signature.to_vec())])?;

    let registry = NativeRegistry::with_builtin_tokens();
    let mut db = OverlayDb::new(SqliteStore::open(&config.database.path)?);
    let mut sink = VecSink::default();
    let output = registry.execute(&mut db, &witness, &mut sink, now()?, Invocation { contract, method, input })?;

    let events: &[Notification] = &sink.events;
    Ok(json!({ "result": hex::encode(output), "notifications": events }))
}
