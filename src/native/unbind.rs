//! Utility-token unbinding: governance holders accrue a utility allowance
//! proportional to their balance and the time elapsed since genesis.

use super::ledger;
use super::service::{Method, NativeService};
use super::states::{encode_params, State};
use crate::arithmetic;
use crate::constants::{
    GENERATION_AMOUNT, GENESIS_TIMESTAMP, GOVERNANCE_CONTRACT_ADDRESS, UNBOUND_DEADLINE,
    UNBOUND_INTERVAL, UTILITY_CONTRACT_ADDRESS,
};
use crate::crypto::Address;
use crate::error::{ChainError, Result};
use crate::storage::Store;
use tracing::{debug, error};

/// Utility amount released to `balance` governance units over the offset
/// window `[start, end)`.
///
/// Each interval `i` of [`UNBOUND_INTERVAL`] seconds releases
/// `GENERATION_AMOUNT[i]` per unit per second; nothing is released after
/// [`UNBOUND_DEADLINE`]. Pure integer arithmetic.
pub fn calc_unbound(balance: u64, start: u32, end: u32) -> Result<u64> {
    if start >= end || start >= UNBOUND_DEADLINE {
        return Ok(0);
    }
    let end = end.min(UNBOUND_DEADLINE);

    let mut per_unit: u64 = 0;
    let mut cursor = start;
    while cursor < end {
        let index = cursor / UNBOUND_INTERVAL;
        let segment_end = end.min((index + 1) * UNBOUND_INTERVAL);
        let released = arithmetic::mul((segment_end - cursor) as u64, GENERATION_AMOUNT[index as usize])?;
        per_unit = arithmetic::add(per_unit, released)?;
        cursor = segment_end;
    }
    arithmetic::mul(per_unit, balance)
}

/// Elapsed seconds since genesis, or `None` while the chain is not live.
fn elapsed_since_genesis(now: u32) -> Option<u32> {
    if now <= GENESIS_TIMESTAMP {
        None
    } else {
        Some(now - GENESIS_TIMESTAMP)
    }
}

/// Grants `owner` whatever utility tokens accrued on `balance` since its
/// last checkpoint, then moves the checkpoint to now.
///
/// Called for both sides of every governance transfer with their resulting
/// balances.
pub fn grant(service: &mut NativeService<'_>, contract: &Address, owner: &Address, balance: u64) -> Result<()> {
    let start = ledger::get_unbound_offset(service.db_ref(), contract, owner)?;
    let end = match elapsed_since_genesis(service.time) {
        Some(end) => end,
        None => return Ok(()),
    };
    if end < start {
        error!("grant error: wrong timestamp end offset {} < start offset {}", end, start);
        return Err(ChainError::InvalidTimeOrdering { start, end });
    }
    if end == start {
        return Ok(());
    }

    if balance != 0 {
        let value = calc_unbound(balance, start, end)?;
        if value > 0 {
            let current = ledger::get_allowance(
                service.db_ref(),
                &UTILITY_CONTRACT_ADDRESS,
                &GOVERNANCE_CONTRACT_ADDRESS,
                owner,
            )?;
            let approve = State {
                from: GOVERNANCE_CONTRACT_ADDRESS,
                to: *owner,
                value: arithmetic::add(current, value)?,
            };
            debug!("unbinding {} utility units to {} ({}..{})", value, owner, start, end);
            service.native_call(UTILITY_CONTRACT_ADDRESS, Method::Approve, &encode_params(&approve))?;
        }
    }

    ledger::set_unbound_offset(service.db(), contract, owner, end)
}

/// What [`grant`] would add for `owner` at `now`, without writing anything.
pub fn unbound_entitlement(db: &dyn Store, contract: &Address, owner: &Address, now: u32) -> Result<u64> {
    let start = ledger::get_unbound_offset(db, contract, owner)?;
    let end = match elapsed_since_genesis(now) {
        Some(end) => end,
        None => return Ok(0),
    };
    if end < start {
        return Err(ChainError::InvalidTimeOrdering { start, end });
    }
    let balance = ledger::get_balance(db, contract, owner)?;
    calc_unbound(balance, start, end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{GOVERNANCE_TOTAL_SUPPLY, UTILITY_TOTAL_SUPPLY};
    use crate::crypto::address_from_string;
    use crate::native::service::{FixedWitnesses, NativeRegistry, VecSink};
    use crate::storage::MemoryStore;

    #[test]
    fn test_calc_within_first_interval() {
        assert_eq!(calc_unbound(1, 0, 100).unwrap(), 8_000);
        assert_eq!(calc_unbound(3, 0, 100).unwrap(), 24_000);
    }

    #[test]
    fn test_calc_across_interval_boundary() {
        let start = UNBOUND_INTERVAL - 10;
        let end = UNBOUND_INTERVAL + 10;
        assert_eq!(calc_unbound(1, start, end).unwrap(), 10 * 80 + 10 * 70);
    }

    #[test]
    fn test_calc_is_additive() {
        let whole = calc_unbound(7, 1_000, 9_000_000).unwrap();
        let split = calc_unbound(7, 1_000, 4_321_000).unwrap() + calc_unbound(7, 4_321_000, 9_000_000).unwrap();
        assert_eq!(whole, split);
    }

    #[test]
    fn test_calc_stops_at_deadline() {
        assert_eq!(calc_unbound(1, 0, UNBOUND_DEADLINE).unwrap(), 900_000_000);
        assert_eq!(calc_unbound(1, 0, u32::MAX).unwrap(), 900_000_000);
        assert_eq!(calc_unbound(1, UNBOUND_DEADLINE, UNBOUND_DEADLINE + 100).unwrap(), 0);
        assert_eq!(calc_unbound(1, UNBOUND_DEADLINE - 1, u32::MAX).unwrap(), 10);
    }

    #[test]
    fn test_calc_full_supply_matches_utility_supply() {
        assert_eq!(
            calc_unbound(GOVERNANCE_TOTAL_SUPPLY, 0, UNBOUND_DEADLINE).unwrap(),
            UTILITY_TOTAL_SUPPLY
        );
    }

    #[test]
    fn test_calc_empty_window_and_overflow() {
        assert_eq!(calc_unbound(5, 10, 10).unwrap(), 0);
        assert_eq!(calc_unbound(5, 20, 10).unwrap(), 0);
        assert_eq!(calc_unbound(0, 0, 1_000).unwrap(), 0);
        assert!(matches!(calc_unbound(u64::MAX, 0, 1_000), Err(ChainError::Overflow(_))));
    }

    fn run_grant(store: &mut MemoryStore, time: u32, owner: &Address, balance: u64) -> Result<()> {
        let registry = NativeRegistry::with_builtin_tokens();
        let witness = FixedWitnesses::none();
        let mut sink = VecSink::default();
        let mut service = NativeService::new(&registry, store, &witness, &mut sink, time);
        service.run_in_context(GOVERNANCE_CONTRACT_ADDRESS, |s| {
            grant(s, &GOVERNANCE_CONTRACT_ADDRESS, owner, balance)
        })
    }

    fn utility_allowance(store: &MemoryStore, owner: &Address) -> u64 {
        ledger::get_allowance(store, &UTILITY_CONTRACT_ADDRESS, &GOVERNANCE_CONTRACT_ADDRESS, owner).unwrap()
    }

    #[test]
    fn test_grant_before_genesis_is_noop() {
        let mut store = MemoryStore::new();
        let owner = address_from_string("owner");
        run_grant(&mut store, GENESIS_TIMESTAMP, &owner, 100).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_grant_accrues_and_checkpoints() {
        let mut store = MemoryStore::new();
        let owner = address_from_string("owner");

        run_grant(&mut store, GENESIS_TIMESTAMP + 100, &owner, 2).unwrap();
        assert_eq!(utility_allowance(&store, &owner), 2 * 100 * 80);
        assert_eq!(ledger::get_unbound_offset(&store, &GOVERNANCE_CONTRACT_ADDRESS, &owner).unwrap(), 100);

        run_grant(&mut store, GENESIS_TIMESTAMP + 150, &owner, 2).unwrap();
        assert_eq!(utility_allowance(&store, &owner), 2 * 150 * 80);
    }

    #[test]
    fn test_grant_same_offset_is_noop() {
        let mut store = MemoryStore::new();
        let owner = address_from_string("owner");
        run_grant(&mut store, GENESIS_TIMESTAMP + 100, &owner, 2).unwrap();
        let before = store.clone();

        run_grant(&mut store, GENESIS_TIMESTAMP + 100, &owner, 2).unwrap();
        assert_eq!(utility_allowance(&store, &owner), utility_allowance(&before, &owner));
        assert_eq!(store.len(), before.len());
    }

    #[test]
    fn test_grant_clock_regression_fails() {
        let mut store = MemoryStore::new();
        let owner = address_from_string("owner");
        run_grant(&mut store, GENESIS_TIMESTAMP + 100, &owner, 2).unwrap();

        let err = run_grant(&mut store, GENESIS_TIMESTAMP + 99, &owner, 2).unwrap_err();
        assert_eq!(err, ChainError::InvalidTimeOrdering { start: 100, end: 99 });
    }

    #[test]
    fn test_grant_allowance_overflow_keeps_checkpoint() {
        let mut store = MemoryStore::new();
        let owner = address_from_string("owner");
        ledger::approve(&mut store, &UTILITY_CONTRACT_ADDRESS, &GOVERNANCE_CONTRACT_ADDRESS, &owner, u64::MAX - 1)
            .unwrap();

        let err = run_grant(&mut store, GENESIS_TIMESTAMP + 100, &owner, 2).unwrap_err();
        assert!(matches!(err, ChainError::Overflow(_)));
        assert_eq!(utility_allowance(&store, &owner), u64::MAX - 1);
        assert_eq!(ledger::get_unbound_offset(&store, &GOVERNANCE_CONTRACT_ADDRESS, &owner).unwrap(), 0);
    }

    #[test]
    fn test_grant_zero_balance_still_checkpoints() {
        let mut store = MemoryStore::new();
        let owner = address_from_string("owner");
        run_grant(&mut store, GENESIS_TIMESTAMP + 500, &owner, 0).unwrap();
        assert_eq!(utility_allowance(&store, &owner), 0);
        assert_eq!(ledger::get_unbound_offset(&store, &GOVERNANCE_CONTRACT_ADDRESS, &owner).unwrap(), 500);
    }

    #[test]
    fn test_entitlement_query_matches_grant() {
        let mut store = MemoryStore::new();
        let owner = address_from_string("owner");
        ledger::initialize_total_supply(&mut store, &GOVERNANCE_CONTRACT_ADDRESS, &[(owner, 10)], 10).unwrap();

        let now = GENESIS_TIMESTAMP + 3_000_000;
        let expected = unbound_entitlement(&store, &GOVERNANCE_CONTRACT_ADDRESS, &owner, now).unwrap();
        assert_eq!(expected, 10 * (2_000_000 * 80 + 1_000_000 * 70));

        run_grant(&mut store, now, &owner, 10).unwrap();
        assert_eq!(utility_allowance(&store, &owner), expected);
        assert_eq!(unbound_entitlement(&store, &GOVERNANCE_CONTRACT_ADDRESS, &owner, now).unwrap(), 0);
    }
}
