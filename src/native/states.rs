//! Parameter types decoded from native contract invocation input.

use crate::codec::{Decode, Encode, Sink, Source};
use crate::crypto::Address;
use crate::error::{ChainError, Result};
use serde::{Deserialize, Serialize};

/// Wraps encoded parameters in the var-bytes envelope handlers expect.
pub fn encode_params<T: Encode>(params: &T) -> Vec<u8> {
    let mut sink = Sink::new();
    sink.write_var_bytes(&params.to_bytes());
    sink.into_bytes()
}

/// Strips the var-bytes envelope. A length prefix running past the input is
/// malformed; bytes after the envelope are irregular.
pub fn unwrap_params(input: &[u8]) -> Result<&[u8]> {
    let mut source = Source::new(input);
    let params = source.next_var_bytes()?;
    source.expect_end()?;
    Ok(params)
}

/// Decodes a complete parameter envelope.
pub fn decode_params<T: Decode>(input: &[u8]) -> Result<T> {
    T::from_bytes(unwrap_params(input)?)
}

/// One from/to/value movement or approval request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    pub from: Address,
    pub to: Address,
    pub value: u64,
}

impl Encode for State {
    fn encode(&self, sink: &mut Sink) {
        sink.write_address(&self.from);
        sink.write_address(&self.to);
        sink.write_var_uint(self.value);
    }
}

impl Decode for State {
    fn decode(source: &mut Source<'_>) -> Result<Self> {
        Ok(State {
            from: source.next_address()?,
            to: source.next_address()?,
            value: source.next_var_uint()?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfers {
    pub states: Vec<State>,
}

impl Encode for Transfers {
    fn encode(&self, sink: &mut Sink) {
        sink.write_var_uint(self.states.len() as u64);
        for state in &self.states {
            state.encode(sink);
        }
    }
}

impl Decode for Transfers {
    fn decode(source: &mut Source<'_>) -> Result<Self> {
        let count = source.next_var_uint()?;
        let mut states = Vec::new();
        for _ in 0..count {
            states.push(State::decode(source)?);
        }
        Ok(Transfers { states })
    }
}

/// `sender` moves `value` from `from` to `to` out of the `(from, to)` allowance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferFrom {
    pub sender: Address,
    pub from: Address,
    pub to: Address,
    pub value: u64,
}

impl Encode for TransferFrom {
    fn encode(&self, sink: &mut Sink) {
        sink.write_address(&self.sender);
        sink.write_address(&self.from);
        sink.write_address(&self.to);
        sink.write_var_uint(self.value);
    }
}

impl Decode for TransferFrom {
    fn decode(source: &mut Source<'_>) -> Result<Self> {
        Ok(TransferFrom {
            sender: source.next_address()?,
            from: source.next_address()?,
            to: source.next_address()?,
            value: source.next_var_uint()?,
        })
    }
}

/// Initial distribution manifest: `count, (address, amount)*`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Distribution {
    pub entries: Vec<(Address, u64)>,
}

impl Distribution {
    pub fn new(entries: Vec<(Address, u64)>) -> Self {
        Distribution { entries }
    }
}

impl Encode for Distribution {
    fn encode(&self, sink: &mut Sink) {
        sink.write_var_uint(self.entries.len() as u64);
        for (address, amount) in &self.entries {
            sink.write_address(address);
            sink.write_var_uint(*amount);
        }
    }
}

impl Decode for Distribution {
    fn decode(source: &mut Source<'_>) -> Result<Self> {
        let count = source.next_var_uint()?;
        let mut entries = Vec::new();
        for _ in 0..count {
            let address = source.next_address()?;
            let amount = source.next_var_uint()?;
            entries.push((address, amount));
        }
        Ok(Distribution { entries })
    }
}

/// Owner (and optional spender) addressed by the read-only queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountQuery {
    pub owner: Address,
    pub spender: Option<Address>,
}

impl AccountQuery {
    pub fn balance(owner: Address) -> Self {
        AccountQuery { owner, spender: None }
    }

    pub fn allowance(owner: Address, spender: Address) -> Self {
        AccountQuery {
            owner,
            spender: Some(spender),
        }
    }

    pub fn decode_balance(input: &[u8]) -> Result<Address> {
        let mut source = Source::new(unwrap_params(input)?);
        let owner = source.next_address()?;
        source.expect_end()?;
        Ok(owner)
    }

    pub fn decode_allowance(input: &[u8]) -> Result<(Address, Address)> {
        let mut source = Source::new(unwrap_params(input)?);
        let owner = source.next_address()?;
        let spender = source.next_address()?;
        source.expect_end()?;
        Ok((owner, spender))
    }
}

impl Encode for AccountQuery {
    fn encode(&self, sink: &mut Sink) {
        sink.write_address(&self.owner);
        if let Some(spender) = &self.spender {
            sink.write_address(spender);
        }
    }
}

/// Numeric query results are 8-byte little endian.
pub fn encode_u64(v: u64) -> Vec<u8> {
    v.to_le_bytes().to_vec()
}

pub fn decode_u64(bytes: &[u8]) -> Result<u64> {
    let array: [u8; 8] = bytes.try_into().map_err(|_| {
        ChainError::MalformedInput(format!("expected 8-byte amount, got {} bytes", bytes.len()))
    })?;
    Ok(u64::from_le_bytes(array))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::address_from_string;

    #[test]
    fn test_state_wire_layout() {
        let state = State {
            from: Address::native(1),
            to: Address::native(2),
            value: 0xFD,
        };
        let bytes = state.to_bytes();
        assert_eq!(bytes.len(), 20 + 20 + 3);
        assert_eq!(&bytes[40..], &[0xFD, 0xFD, 0x00]);
    }

    #[test]
    fn test_transfers_decode() {
        let transfers = Transfers {
            states: vec![
                State { from: address_from_string("a"), to: address_from_string("b"), value: 5 },
                State { from: address_from_string("b"), to: address_from_string("c"), value: 70_000 },
            ],
        };
        let decoded: Transfers = decode_params(&encode_params(&transfers)).unwrap();
        assert_eq!(decoded, transfers);
    }

    #[test]
    fn test_envelope_length_past_input_is_malformed() {
        let mut input = encode_params(&Distribution::new(vec![(Address::native(3), 1)]));
        input.pop();
        assert!(matches!(decode_params::<Distribution>(&input), Err(ChainError::MalformedInput(_))));
    }

    #[test]
    fn test_bytes_after_envelope_are_irregular() {
        let mut input = encode_params(&State { from: Address::ZERO, to: Address::ZERO, value: 1 });
        input.push(0);
        assert!(matches!(decode_params::<State>(&input), Err(ChainError::DataIrregularity(_))));
    }

    #[test]
    fn test_envelope_content_longer_than_params_is_irregular() {
        let mut inner = State { from: Address::ZERO, to: Address::ZERO, value: 1 }.to_bytes();
        inner.push(7);
        let mut sink = Sink::new();
        sink.write_var_bytes(&inner);
        assert!(matches!(
            decode_params::<State>(sink.bytes()),
            Err(ChainError::DataIrregularity(_))
        ));
    }

    #[test]
    fn test_distribution_count_larger_than_content_is_malformed() {
        let mut sink = Sink::new();
        sink.write_var_uint(2);
        sink.write_address(&Address::native(5));
        sink.write_var_uint(10);
        let mut outer = Sink::new();
        outer.write_var_bytes(sink.bytes());
        assert!(matches!(
            decode_params::<Distribution>(outer.bytes()),
            Err(ChainError::MalformedInput(_))
        ));
    }

    #[test]
    fn test_account_queries() {
        let owner = address_from_string("owner");
        let spender = address_from_string("spender");
        let input = encode_params(&AccountQuery::allowance(owner, spender));
        assert_eq!(AccountQuery::decode_allowance(&input).unwrap(), (owner, spender));
        assert!(AccountQuery::decode_balance(&input).is_err());

        let input = encode_params(&AccountQuery::balance(owner));
        assert_eq!(AccountQuery::decode_balance(&input).unwrap(), owner);
    }

    #[test]
    fn test_u64_results() {
        assert_eq!(decode_u64(&encode_u64(42)).unwrap(), 42);
        assert!(decode_u64(&[1, 2, 3]).is_err());
    }
}
