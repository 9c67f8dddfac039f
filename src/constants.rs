//! Chain-wide constants. Changing any of these changes consensus.

use crate::crypto::Address;

pub const GOVERNANCE_CONTRACT_ADDRESS: Address = Address::native(1);
pub const UTILITY_CONTRACT_ADDRESS: Address = Address::native(2);

pub const GOVERNANCE_NAME: &str = "ONT Token";
pub const GOVERNANCE_SYMBOL: &str = "ONT";
pub const GOVERNANCE_DECIMALS: u8 = 0;
pub const GOVERNANCE_TOTAL_SUPPLY: u64 = 1_000_000_000;

pub const UTILITY_NAME: &str = "ONG Token";
pub const UTILITY_SYMBOL: &str = "ONG";
pub const UTILITY_DECIMALS: u8 = 9;
/// Everything the unbinding schedule can ever release for the full
/// governance supply: `GOVERNANCE_TOTAL_SUPPLY * UNBOUND_INTERVAL * sum(GENERATION_AMOUNT)`.
pub const UTILITY_TOTAL_SUPPLY: u64 = 900_000_000_000_000_000;

/// Seconds covered by each entry of [`GENERATION_AMOUNT`].
pub const UNBOUND_INTERVAL: u32 = 2_000_000;

/// Utility units released per governance unit per second, one entry per interval.
pub const GENERATION_AMOUNT: [u64; 17] = [80, 70, 60, 50, 40, 30, 20, 10, 10, 10, 10, 10, 10, 10, 10, 10, 10];

/// Offset after which nothing more is released.
pub const UNBOUND_DEADLINE: u32 = UNBOUND_INTERVAL * GENERATION_AMOUNT.len() as u32;

pub const BLOCK_VERSION: u32 = 0;
/// 2017-02-23T00:00:00Z
pub const GENESIS_TIMESTAMP: u32 = 1_487_808_000;
pub const GENESIS_NONCE: u64 = 2_083_236_893;

/// Result of a successful boolean handler.
pub const BYTE_TRUE: [u8; 1] = [1];
pub const BYTE_FALSE: [u8; 1] = [0];
