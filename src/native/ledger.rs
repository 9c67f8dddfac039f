//! Account ledger: balance, allowance, total-supply and unbound-offset
//! records of the native token contracts.
//!
//! This is the only module that turns storage keys into amounts. Authorization
//! is checked by the handlers before they call in here.

use super::service::Notification;
use crate::arithmetic::{self, checked_sub};
use crate::crypto::Address;
use crate::error::{ChainError, Result};
use crate::storage::keys::{allowance_key, balance_key, total_supply_key, unbound_offset_key};
use crate::storage::Store;
use std::collections::BTreeMap;
use tracing::{debug, info};

fn read_u64(db: &dyn Store, key: &[u8]) -> Result<u64> {
    match db.get(key)? {
        None => Ok(0),
        Some(bytes) => {
            let array: [u8; 8] = bytes.as_slice().try_into().map_err(|_| {
                ChainError::CorruptRecord(format!(
                    "expected 8-byte amount at {}, found {} bytes",
                    hex::encode(key),
                    bytes.len()
                ))
            })?;
            Ok(u64::from_le_bytes(array))
        }
    }
}

/// Zero amounts are stored as an absent record.
fn write_u64(db: &mut dyn Store, key: &[u8], value: u64) -> Result<()> {
    if value == 0 {
        db.delete(key)
    } else {
        db.put(key, &value.to_le_bytes())
    }
}

pub fn get_balance(db: &dyn Store, contract: &Address, owner: &Address) -> Result<u64> {
    read_u64(db, &balance_key(contract, owner))
}

pub fn get_allowance(db: &dyn Store, contract: &Address, owner: &Address, spender: &Address) -> Result<u64> {
    read_u64(db, &allowance_key(contract, owner, spender))
}

/// Zero means the contract has not been initialized.
pub fn get_total_supply(db: &dyn Store, contract: &Address) -> Result<u64> {
    read_u64(db, &total_supply_key(contract))
}

/// Seconds since genesis up to which `owner` has been granted utility tokens.
pub fn get_unbound_offset(db: &dyn Store, contract: &Address, owner: &Address) -> Result<u32> {
    let key = unbound_offset_key(contract, owner);
    match db.get(&key)? {
        None => Ok(0),
        Some(bytes) => {
            let array: [u8; 4] = bytes.as_slice().try_into().map_err(|_| {
                ChainError::CorruptRecord(format!(
                    "expected 4-byte offset at {}, found {} bytes",
                    hex::encode(&key),
                    bytes.len()
                ))
            })?;
            Ok(u32::from_le_bytes(array))
        }
    }
}

pub fn set_unbound_offset(db: &mut dyn Store, contract: &Address, owner: &Address, offset: u32) -> Result<()> {
    db.put(&unbound_offset_key(contract, owner), &offset.to_le_bytes())
}

/// Moves `value` from `from` to `to` and returns the resulting
/// `(from_balance, to_balance)`. Nothing is written on failure.
pub fn transfer(
    db: &mut dyn Store,
    contract: &Address,
    from: &Address,
    to: &Address,
    value: u64,
) -> Result<(u64, u64)> {
    let from_balance = get_balance(db, contract, from)?;
    let (new_from, underflow) = checked_sub(from_balance, value);
    if underflow {
        return Err(ChainError::InsufficientBalance {
            balance: from_balance,
            required: value,
        });
    }
    if from == to {
        return Ok((from_balance, from_balance));
    }

    let to_balance = get_balance(db, contract, to)?;
    let new_to = arithmetic::add(to_balance, value)?;

    write_u64(db, &balance_key(contract, from), new_from)?;
    write_u64(db, &balance_key(contract, to), new_to)?;
    debug!("{}: {} -> {} value {}", contract, from, to, value);
    Ok((new_from, new_to))
}

/// Spends `value` of the `(from, to)` allowance and performs the transfer.
pub fn transfer_from(
    db: &mut dyn Store,
    contract: &Address,
    from: &Address,
    to: &Address,
    value: u64,
) -> Result<(u64, u64)> {
    let key = allowance_key(contract, from, to);
    let allowance = read_u64(db, &key)?;
    let (remaining, underflow) = checked_sub(allowance, value);
    if underflow {
        return Err(ChainError::InsufficientAllowance {
            allowance,
            required: value,
        });
    }

    let balances = transfer(db, contract, from, to, value)?;
    write_u64(db, &key, remaining)?;
    Ok(balances)
}

/// Overwrites the `(from, to)` allowance; the prior value is not consulted.
pub fn approve(db: &mut dyn Store, contract: &Address, from: &Address, to: &Address, value: u64) -> Result<()> {
    write_u64(db, &allowance_key(contract, from, to), value)
}

/// One-time initialization of a contract's supply from a distribution list.
///
/// Duplicate owners are merged. Balances are written, and notifications
/// returned, in ascending address order. Nothing is written on failure.
pub fn initialize_total_supply(
    db: &mut dyn Store,
    contract: &Address,
    distribution: &[(Address, u64)],
    expected_supply: u64,
) -> Result<Vec<Notification>> {
    if get_total_supply(db, contract)? > 0 {
        return Err(ChainError::AlreadyInitialized(contract.to_hex()));
    }

    let mut sum: u64 = 0;
    let mut merged: BTreeMap<Address, u64> = BTreeMap::new();
    for (owner, amount) in distribution {
        sum = arithmetic::add(sum, *amount)
            .map_err(|_| ChainError::ConfigOverflow(format!("distribution sum exceeds u64 at {}", owner)))?;
        let entry = merged.entry(*owner).or_insert(0);
        *entry = arithmetic::add(*entry, *amount)
            .map_err(|_| ChainError::ConfigOverflow(format!("allocation overflow for {}", owner)))?;
    }
    if sum != expected_supply {
        return Err(ChainError::SupplyMismatch {
            actual: sum,
            expected: expected_supply,
        });
    }

    let mut notifications = Vec::with_capacity(merged.len());
    for (owner, amount) in merged {
        write_u64(db, &balance_key(contract, &owner), amount)?;
        notifications.push(Notification {
            contract: *contract,
            from: Address::ZERO,
            to: owner,
            value: amount,
        });
    }
    write_u64(db, &total_supply_key(contract), expected_supply)?;
    info!(
        "initialized {} with total supply {} across {} accounts",
        contract,
        expected_supply,
        notifications.len()
    );
    Ok(notifications)
}
