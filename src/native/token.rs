//! Handlers of the governance and utility token contracts.
//!
//! Both contracts share transfer/approve/query semantics. Only the
//! governance token runs the unbinding grant on transfers, and the two differ
//! in how `init` seeds the supply.

use super::ledger;
use super::service::{Method, NativeContract, NativeService, Notification};
use super::states::{decode_params, encode_u64, AccountQuery, Distribution, State, TransferFrom, Transfers};
use super::unbind;
use crate::constants::*;
use crate::crypto::Address;
use crate::error::{ChainError, Result};
use tracing::info;

/// Static description of a native token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenInfo {
    pub name: &'static str,
    pub symbol: &'static str,
    pub decimals: u8,
    pub total_supply: u64,
    /// Transfers of this token release utility tokens to both parties.
    pub unbinding: bool,
}

pub const GOVERNANCE_TOKEN: TokenInfo = TokenInfo {
    name: GOVERNANCE_NAME,
    symbol: GOVERNANCE_SYMBOL,
    decimals: GOVERNANCE_DECIMALS,
    total_supply: GOVERNANCE_TOTAL_SUPPLY,
    unbinding: true,
};

pub const UTILITY_TOKEN: TokenInfo = TokenInfo {
    name: UTILITY_NAME,
    symbol: UTILITY_SYMBOL,
    decimals: UTILITY_DECIMALS,
    total_supply: UTILITY_TOTAL_SUPPLY,
    unbinding: false,
};

pub fn token_info(contract: &Address) -> Result<&'static TokenInfo> {
    match *contract {
        GOVERNANCE_CONTRACT_ADDRESS => Ok(&GOVERNANCE_TOKEN),
        UTILITY_CONTRACT_ADDRESS => Ok(&UTILITY_TOKEN),
        other => Err(ChainError::UnknownContract(other.to_hex())),
    }
}

pub fn register_governance(contract: &mut NativeContract) {
    contract.register(Method::Init, governance_init);
    register_common(contract);
    contract.register(Method::UnboundBalance, unbound_balance);
}

pub fn register_utility(contract: &mut NativeContract) {
    contract.register(Method::Init, utility_init);
    register_common(contract);
}

fn register_common(contract: &mut NativeContract) {
    contract.register(Method::Transfer, transfer);
    contract.register(Method::TransferFrom, transfer_from);
    contract.register(Method::Approve, approve);
    contract.register(Method::Name, name);
    contract.register(Method::Symbol, symbol);
    contract.register(Method::Decimals, decimals);
    contract.register(Method::TotalSupply, total_supply);
    contract.register(Method::BalanceOf, balance_of);
    contract.register(Method::Allowance, allowance);
}

fn current_token(service: &NativeService<'_>) -> Result<(Address, &'static TokenInfo)> {
    let contract = service.current_contract()?;
    Ok((contract, token_info(&contract)?))
}

fn check_cap(value: u64, info: &TokenInfo) -> Result<()> {
    if value > info.total_supply {
        return Err(ChainError::ValueTooLarge {
            value,
            cap: info.total_supply,
        });
    }
    Ok(())
}

fn require_witness(service: &NativeService<'_>, address: &Address) -> Result<()> {
    if service.check_witness(address) {
        Ok(())
    } else {
        Err(ChainError::Unauthorized(address.to_hex()))
    }
}

fn emit_all(service: &mut NativeService<'_>, notifications: Vec<Notification>) {
    for n in notifications {
        service.notify(n);
    }
}

fn governance_init(service: &mut NativeService<'_>, input: &[u8]) -> Result<Vec<u8>> {
    let contract = service.current_contract()?;
    if ledger::get_total_supply(service.db_ref(), &contract)? > 0 {
        return Err(ChainError::AlreadyInitialized(contract.to_hex()));
    }
    let distribution: Distribution = decode_params(input)?;
    let notifications =
        ledger::initialize_total_supply(service.db(), &contract, &distribution.entries, GOVERNANCE_TOTAL_SUPPLY)?;
    info!("{} distributed to {} holders", GOVERNANCE_SYMBOL, notifications.len());
    emit_all(service, notifications);
    Ok(BYTE_TRUE.to_vec())
}

/// The whole utility supply starts in the governance contract's account and
/// leaves it only through unbinding allowances.
fn utility_init(service: &mut NativeService<'_>, _input: &[u8]) -> Result<Vec<u8>> {
    let contract = service.current_contract()?;
    let notifications = ledger::initialize_total_supply(
        service.db(),
        &contract,
        &[(GOVERNANCE_CONTRACT_ADDRESS, UTILITY_TOTAL_SUPPLY)],
        UTILITY_TOTAL_SUPPLY,
    )?;
    emit_all(service, notifications);
    Ok(BYTE_TRUE.to_vec())
}

fn grant_both(service: &mut NativeService<'_>, contract: &Address, from: (Address, u64), to: (Address, u64)) -> Result<()> {
    unbind::grant(service, contract, &from.0, from.1)?;
    unbind::grant(service, contract, &to.0, to.1)
}

fn transfer(service: &mut NativeService<'_>, input: &[u8]) -> Result<Vec<u8>> {
    let transfers: Transfers = decode_params(input)?;
    let (contract, info) = current_token(service)?;

    for state in &transfers.states {
        if state.value == 0 {
            continue;
        }
        check_cap(state.value, info)?;
        require_witness(service, &state.from)?;

        let (from_balance, to_balance) =
            ledger::transfer(service.db(), &contract, &state.from, &state.to, state.value)?;
        if info.unbinding {
            grant_both(service, &contract, (state.from, from_balance), (state.to, to_balance))?;
        }
        service.notify(Notification {
            contract,
            from: state.from,
            to: state.to,
            value: state.value,
        });
    }
    Ok(BYTE_TRUE.to_vec())
}

fn transfer_from(service: &mut NativeService<'_>, input: &[u8]) -> Result<Vec<u8>> {
    let params: TransferFrom = decode_params(input)?;
    let (contract, info) = current_token(service)?;
    if params.value == 0 {
        return Ok(BYTE_FALSE.to_vec());
    }
    check_cap(params.value, info)?;
    require_witness(service, &params.sender)?;

    let (from_balance, to_balance) =
        ledger::transfer_from(service.db(), &contract, &params.from, &params.to, params.value)?;
    if info.unbinding {
        grant_both(service, &contract, (params.from, from_balance), (params.to, to_balance))?;
    }
    service.notify(Notification {
        contract,
        from: params.from,
        to: params.to,
        value: params.value,
    });
    Ok(BYTE_TRUE.to_vec())
}

fn approve(service: &mut NativeService<'_>, input: &[u8]) -> Result<Vec<u8>> {
    let state: State = decode_params(input)?;
    let (contract, info) = current_token(service)?;
    check_cap(state.value, info)?;
    require_witness(service, &state.from)?;
    ledger::approve(service.db(), &contract, &state.from, &state.to, state.value)?;
    Ok(BYTE_TRUE.to_vec())
}

fn name(service: &mut NativeService<'_>, _input: &[u8]) -> Result<Vec<u8>> {
    Ok(current_token(service)?.1.name.as_bytes().to_vec())
}

fn symbol(service: &mut NativeService<'_>, _input: &[u8]) -> Result<Vec<u8>> {
    Ok(current_token(service)?.1.symbol.as_bytes().to_vec())
}

fn decimals(service: &mut NativeService<'_>, _input: &[u8]) -> Result<Vec<u8>> {
    Ok(encode_u64(current_token(service)?.1.decimals as u64))
}

fn total_supply(service: &mut NativeService<'_>, _input: &[u8]) -> Result<Vec<u8>> {
    let contract = service.current_contract()?;
    Ok(encode_u64(ledger::get_total_supply(service.db_ref(), &contract)?))
}

fn balance_of(service: &mut NativeService<'_>, input: &[u8]) -> Result<Vec<u8>> {
    let owner = AccountQuery::decode_balance(input)?;
    let contract = service.current_contract()?;
    Ok(encode_u64(ledger::get_balance(service.db_ref(), &contract, &owner)?))
}

fn allowance(service: &mut NativeService<'_>, input: &[u8]) -> Result<Vec<u8>> {
    let (owner, spender) = AccountQuery::decode_allowance(input)?;
    let contract = service.current_contract()?;
    Ok(encode_u64(ledger::get_allowance(service.db_ref(), &contract, &owner, &spender)?))
}

fn unbound_balance(service: &mut NativeService<'_>, input: &[u8]) -> Result<Vec<u8>> {
    let owner = AccountQuery::decode_balance(input)?;
    let contract = service.current_contract()?;
    let value = unbind::unbound_entitlement(service.db_ref(), &contract, &owner, service.time)?;
    Ok(encode_u64(value))
}
