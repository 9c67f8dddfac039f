//! Storage key layout for native contract records.
//!
//! `key = tag || contract || account*`. Addresses are fixed width and every
//! record kind has its own tag, so two distinct records never share a key.

use crate::crypto::{Address, ADDRESS_LEN};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RecordKind {
    Balance = 0x01,
    Allowance = 0x02,
    TotalSupply = 0x03,
    UnboundOffset = 0x04,
}

fn build(kind: RecordKind, contract: &Address, accounts: &[&Address]) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + ADDRESS_LEN * (1 + accounts.len()));
    key.push(kind as u8);
    key.extend_from_slice(contract.as_bytes());
    for account in accounts {
        key.extend_from_slice(account.as_bytes());
    }
    key
}

pub(crate) fn balance_key(contract: &Address, owner: &Address) -> Vec<u8> {
    build(RecordKind::Balance, contract, &[owner])
}

pub(crate) fn allowance_key(contract: &Address, owner: &Address, spender: &Address) -> Vec<u8> {
    build(RecordKind::Allowance, contract, &[owner, spender])
}

pub(crate) fn total_supply_key(contract: &Address) -> Vec<u8> {
    build(RecordKind::TotalSupply, contract, &[])
}

pub(crate) fn unbound_offset_key(contract: &Address, owner: &Address) -> Vec<u8> {
    build(RecordKind::UnboundOffset, contract, &[owner])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::address_from_string;
    use std::collections::HashSet;

    #[test]
    fn test_key_layout() {
        let contract = Address::native(1);
        let owner = address_from_string("owner");
        let key = balance_key(&contract, &owner);
        assert_eq!(key.len(), 1 + 2 * ADDRESS_LEN);
        assert_eq!(key[0], RecordKind::Balance as u8);
        assert_eq!(&key[1..21], contract.as_bytes());
        assert_eq!(&key[21..], owner.as_bytes());

        assert_eq!(total_supply_key(&contract).len(), 1 + ADDRESS_LEN);
        assert_eq!(allowance_key(&contract, &owner, &owner).len(), 1 + 3 * ADDRESS_LEN);
    }

    #[test]
    fn test_keys_are_distinct_across_kinds_and_accounts() {
        let contracts = [Address::native(1), Address::native(2)];
        let accounts = [address_from_string("a"), address_from_string("b")];
        let mut seen = HashSet::new();
        for c in &contracts {
            assert!(seen.insert(total_supply_key(c)));
            for a in &accounts {
                assert!(seen.insert(balance_key(c, a)));
                assert!(seen.insert(unbound_offset_key(c, a)));
                for b in &accounts {
                    assert!(seen.insert(allowance_key(c, a, b)));
                }
            }
        }
        assert_eq!(seen.len(), 2 * (1 + 2 + 2 + 4));
    }

    #[test]
    fn test_allowance_key_is_directional() {
        let c = Address::native(2);
        let a = address_from_string("a");
        let b = address_from_string("b");
        assert_ne!(allowance_key(&c, &a, &b), allowance_key(&c, &b, &a));
    }
}
