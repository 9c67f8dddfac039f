//! Native contract registry, invocation context and executor.

use crate::crypto::{address_from_pubkey, verify_signature, Address};
use crate::error::{ChainError, Result};
use crate::storage::{OverlayDb, Store};
use secp256k1::PublicKey;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// Wire-level method names of the native token contracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Method {
    Init,
    Transfer,
    TransferFrom,
    Approve,
    Name,
    Symbol,
    Decimals,
    TotalSupply,
    BalanceOf,
    Allowance,
    UnboundBalance,
}

impl Method {
    pub const ALL: [Method; 11] = [
        Method::Init,
        Method::Transfer,
        Method::TransferFrom,
        Method::Approve,
        Method::Name,
        Method::Symbol,
        Method::Decimals,
        Method::TotalSupply,
        Method::BalanceOf,
        Method::Allowance,
        Method::UnboundBalance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Init => "init",
            Method::Transfer => "transfer",
            Method::TransferFrom => "transferFrom",
            Method::Approve => "approve",
            Method::Name => "name",
            Method::Symbol => "symbol",
            Method::Decimals => "decimals",
            Method::TotalSupply => "totalSupply",
            Method::BalanceOf => "balanceOf",
            Method::Allowance => "allowance",
            Method::UnboundBalance => "unboundBalance",
        }
    }

    pub fn parse(name: &str) -> Option<Method> {
        Method::ALL.iter().copied().find(|m| m.as_str() == name)
    }
}

/// Confirms that the current transaction was authorized by an address.
pub trait WitnessChecker {
    fn check_witness(&self, address: &Address) -> bool;
}

/// Explicit set of authorized addresses.
#[derive(Debug, Clone, Default)]
pub struct FixedWitnesses(BTreeSet<Address>);

impl FixedWitnesses {
    pub fn new(addresses: impl IntoIterator<Item = Address>) -> Self {
        FixedWitnesses(addresses.into_iter().collect())
    }

    pub fn none() -> Self {
        Self::default()
    }
}

impl WitnessChecker for FixedWitnesses {
    fn check_witness(&self, address: &Address) -> bool {
        self.0.contains(address)
    }
}

/// Witnesses proven by secp256k1 signatures over the transaction message.
#[derive(Debug, Clone, Default)]
pub struct SignedWitnesses {
    addresses: BTreeSet<Address>,
}

impl SignedWitnesses {
    /// Verifies every `(public key, compact signature)` pair against
    /// `message`; any invalid signature rejects the whole set.
    pub fn verify(message: &[u8], signatures: &[(Vec<u8>, Vec<u8>)]) -> Result<Self> {
        let mut addresses = BTreeSet::new();
        for (public_key, signature) in signatures {
            verify_signature(public_key, message, signature)?;
            let key = PublicKey::from_slice(public_key)?;
            addresses.insert(address_from_pubkey(&key));
        }
        Ok(SignedWitnesses { addresses })
    }
}

impl WitnessChecker for SignedWitnesses {
    fn check_witness(&self, address: &Address) -> bool {
        self.addresses.contains(address)
    }
}

/// A `(contract, from, to, value)` transfer event for external indexing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub contract: Address,
    pub from: Address,
    pub to: Address,
    pub value: u64,
}

pub trait NotificationSink {
    fn notify(&mut self, notification: Notification);
}

#[derive(Debug, Clone, Default)]
pub struct VecSink {
    pub events: Vec<Notification>,
}

impl NotificationSink for VecSink {
    fn notify(&mut self, notification: Notification) {
        self.events.push(notification);
    }
}

pub type Handler = fn(&mut NativeService<'_>, &[u8]) -> Result<Vec<u8>>;

/// Dispatch table of one native contract.
#[derive(Default)]
pub struct NativeContract {
    handlers: BTreeMap<Method, Handler>,
}

impl NativeContract {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, method: Method, handler: Handler) {
        self.handlers.insert(method, handler);
    }

    pub fn handler(&self, method: Method) -> Option<Handler> {
        self.handlers.get(&method).copied()
    }
}

/// Contract address to dispatch table, built once at startup.
#[derive(Default)]
pub struct NativeRegistry {
    contracts: BTreeMap<Address, NativeContract>,
}

/// A single contract call delivered by the transaction executor.
#[derive(Debug, Clone, Copy)]
pub struct Invocation<'a> {
    pub contract: Address,
    pub method: &'a str,
    pub input: &'a [u8],
}

impl NativeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the governance and utility token contracts.
    pub fn with_builtin_tokens() -> Self {
        let mut registry = Self::new();
        registry.register(
            crate::constants::GOVERNANCE_CONTRACT_ADDRESS,
            super::token::register_governance,
        );
        registry.register(
            crate::constants::UTILITY_CONTRACT_ADDRESS,
            super::token::register_utility,
        );
        registry
    }

    pub fn register(&mut self, address: Address, init: fn(&mut NativeContract)) {
        let mut contract = NativeContract::new();
        init(&mut contract);
        self.contracts.insert(address, contract);
    }

    pub fn contract(&self, address: &Address) -> Option<&NativeContract> {
        self.contracts.get(address)
    }

    /// Runs one invocation against a transaction overlay. On success the
    /// overlay is committed and the buffered notifications are forwarded to
    /// `sink`; on failure both are discarded.
    pub fn execute<S: Store>(
        &self,
        db: &mut OverlayDb<S>,
        witness: &dyn WitnessChecker,
        sink: &mut dyn NotificationSink,
        time: u32,
        invocation: Invocation<'_>,
    ) -> Result<Vec<u8>> {
        let mut events = VecSink::default();
        let result = {
            let mut service = NativeService::new(self, db, witness, &mut events, time);
            service.invoke(invocation.contract, invocation.method, invocation.input)
        };

        match result {
            Ok(output) => {
                db.commit()?;
                for event in events.events {
                    sink.notify(event);
                }
                Ok(output)
            }
            Err(e) => {
                warn!(
                    "invocation {}::{} failed: {}",
                    invocation.contract, invocation.method, e
                );
                db.discard();
                Err(e)
            }
        }
    }
}

/// Execution context handed to native handlers for one transaction.
pub struct NativeService<'a> {
    registry: &'a NativeRegistry,
    db: &'a mut dyn Store,
    witness: &'a dyn WitnessChecker,
    notifications: &'a mut dyn NotificationSink,
    /// Block timestamp in seconds.
    pub time: u32,
    contexts: Vec<Address>,
}

impl<'a> NativeService<'a> {
    pub fn new(
        registry: &'a NativeRegistry,
        db: &'a mut dyn Store,
        witness: &'a dyn WitnessChecker,
        notifications: &'a mut dyn NotificationSink,
        time: u32,
    ) -> Self {
        NativeService {
            registry,
            db,
            witness,
            notifications,
            time,
            contexts: Vec::new(),
        }
    }

    pub fn invoke(&mut self, contract: Address, method: &str, input: &[u8]) -> Result<Vec<u8>> {
        let registry = self.registry;
        let table = registry
            .contract(&contract)
            .ok_or_else(|| ChainError::UnknownContract(contract.to_hex()))?;
        let handler = Method::parse(method)
            .and_then(|m| table.handler(m))
            .ok_or_else(|| ChainError::UnknownMethod {
                contract: contract.to_hex(),
                method: method.to_string(),
            })?;

        debug!("invoke {}::{} ({} bytes)", contract, method, input.len());
        self.run_in_context(contract, |service| handler(service, input))
    }

    /// Runs `f` with `contract` as the current contract context.
    pub fn run_in_context<T>(&mut self, contract: Address, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.contexts.push(contract);
        let result = f(self);
        self.contexts.pop();
        result
    }

    /// Cross-contract call; the caller's address passes the callee's
    /// witness checks for the duration of the call.
    pub fn native_call(&mut self, contract: Address, method: Method, args: &[u8]) -> Result<Vec<u8>> {
        self.invoke(contract, method.as_str(), args)
    }

    pub fn current_contract(&self) -> Result<Address> {
        self.contexts
            .last()
            .copied()
            .ok_or_else(|| ChainError::UnknownContract("no active contract context".to_string()))
    }

    pub fn calling_contract(&self) -> Option<Address> {
        let n = self.contexts.len();
        if n >= 2 {
            Some(self.contexts[n - 2])
        } else {
            None
        }
    }

    pub fn check_witness(&self, address: &Address) -> bool {
        self.calling_contract().as_ref() == Some(address) || self.witness.check_witness(address)
    }

    pub fn db(&mut self) -> &mut dyn Store {
        &mut *self.db
    }

    pub fn db_ref(&self) -> &dyn Store {
        &*self.db
    }

    pub fn notify(&mut self, notification: Notification) {
        self.notifications.notify(notification);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::BYTE_TRUE;
    use crate::crypto::{address_from_string, KeyPair};
    use crate::storage::MemoryStore;

    fn echo_caller(service: &mut NativeService<'_>, _input: &[u8]) -> Result<Vec<u8>> {
        Ok(service.calling_contract().map(|a| a.as_bytes().to_vec()).unwrap_or_default())
    }

    fn call_echo(service: &mut NativeService<'_>, input: &[u8]) -> Result<Vec<u8>> {
        service.native_call(Address::native(8), Method::Name, input)
    }

    fn write_then_fail(service: &mut NativeService<'_>, _input: &[u8]) -> Result<Vec<u8>> {
        service.db().put(b"partial", b"1")?;
        service.notify(Notification {
            contract: Address::native(9),
            from: Address::ZERO,
            to: Address::ZERO,
            value: 1,
        });
        Err(ChainError::Overflow("boom".to_string()))
    }

    fn write_ok(service: &mut NativeService<'_>, _input: &[u8]) -> Result<Vec<u8>> {
        service.db().put(b"done", b"1")?;
        Ok(BYTE_TRUE.to_vec())
    }

    fn test_registry() -> NativeRegistry {
        let mut registry = NativeRegistry::new();
        registry.register(Address::native(8), |c| c.register(Method::Name, echo_caller));
        registry.register(Address::native(9), |c| {
            c.register(Method::Symbol, call_echo);
            c.register(Method::Transfer, write_then_fail);
            c.register(Method::Approve, write_ok);
        });
        registry
    }

    #[test]
    fn test_method_names_round_trip() {
        for m in Method::ALL {
            assert_eq!(Method::parse(m.as_str()), Some(m));
        }
        assert_eq!(Method::parse("mint"), None);
    }

    #[test]
    fn test_unknown_contract_and_method() {
        let registry = test_registry();
        let mut db = OverlayDb::new(MemoryStore::new());
        let mut sink = VecSink::default();
        let witness = FixedWitnesses::none();

        let err = registry
            .execute(&mut db, &witness, &mut sink, 0, Invocation { contract: Address::native(7), method: "name", input: &[] })
            .unwrap_err();
        assert!(matches!(err, ChainError::UnknownContract(_)));

        let err = registry
            .execute(&mut db, &witness, &mut sink, 0, Invocation { contract: Address::native(8), method: "mint", input: &[] })
            .unwrap_err();
        assert!(matches!(err, ChainError::UnknownMethod { .. }));
    }

    #[test]
    fn test_native_call_exposes_caller() {
        let registry = test_registry();
        let mut store = MemoryStore::new();
        let mut sink = VecSink::default();
        let witness = FixedWitnesses::none();
        let mut service = NativeService::new(&registry, &mut store, &witness, &mut sink, 0);

        let direct = service.invoke(Address::native(8), "name", &[]).unwrap();
        assert!(direct.is_empty());

        let nested = service.invoke(Address::native(9), "symbol", &[]).unwrap();
        assert_eq!(nested, Address::native(9).as_bytes().to_vec());
    }

    #[test]
    fn test_failed_execution_discards_writes_and_events() {
        let registry = test_registry();
        let mut db = OverlayDb::new(MemoryStore::new());
        let mut sink = VecSink::default();
        let witness = FixedWitnesses::none();

        let result = registry.execute(
            &mut db,
            &witness,
            &mut sink,
            0,
            Invocation { contract: Address::native(9), method: "transfer", input: &[] },
        );
        assert!(result.is_err());
        assert!(sink.events.is_empty());
        assert_eq!(db.get(b"partial").unwrap(), None);
        assert!(db.backend().is_empty());

        registry
            .execute(&mut db, &witness, &mut sink, 0, Invocation { contract: Address::native(9), method: "approve", input: &[] })
            .unwrap();
        assert_eq!(db.backend().get(b"done").unwrap(), Some(b"1".to_vec()));
    }

    #[test]
    fn test_signed_witnesses() {
        let keypair = KeyPair::generate();
        let message = b"tx body";
        let signature = keypair.sign(message).unwrap();

        let witnesses = SignedWitnesses::verify(
            message,
            &[(keypair.public_key_bytes().to_vec(), signature.to_vec())],
        )
        .unwrap();
        assert!(witnesses.check_witness(&keypair.address()));
        assert!(!witnesses.check_witness(&address_from_string("other")));

        let forged = SignedWitnesses::verify(
            b"different body",
            &[(keypair.public_key_bytes().to_vec(), signature.to_vec())],
        );
        assert!(forged.is_err());
    }
}
