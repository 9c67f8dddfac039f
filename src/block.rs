//! Block, header and transaction types with their canonical encoding.

use crate::codec::{Decode, Encode, Sink, Source};
use crate::crypto::Address;
use crate::error::{ChainError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub type Hash256 = [u8; 32];

const TX_TYPE_DEPLOY: u8 = 0xD0;
const TX_TYPE_INVOKE: u8 = 0xD1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VmType {
    Native,
    NeoVm,
}

impl VmType {
    fn as_byte(self) -> u8 {
        match self {
            VmType::Native => 0xFF,
            VmType::NeoVm => 0x80,
        }
    }

    fn from_byte(b: u8) -> Result<Self> {
        match b {
            0xFF => Ok(VmType::Native),
            0x80 => Ok(VmType::NeoVm),
            other => Err(ChainError::DataIrregularity(format!("unknown vm type {:#04x}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmCode {
    pub vm_type: VmType,
    pub code: Vec<u8>,
}

impl Encode for VmCode {
    fn encode(&self, sink: &mut Sink) {
        sink.write_u8(self.vm_type.as_byte());
        sink.write_var_bytes(&self.code);
    }
}

impl Decode for VmCode {
    fn decode(source: &mut Source<'_>) -> Result<Self> {
        let vm_type = VmType::from_byte(source.next_u8()?)?;
        let code = source.next_var_bytes()?.to_vec();
        Ok(VmCode { vm_type, code })
    }
}

/// Contract deployment metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployCode {
    pub code: VmCode,
    pub need_storage: bool,
    pub name: String,
    pub version: String,
    pub author: String,
    pub email: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Payload {
    Deploy(DeployCode),
    Invoke(VmCode),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub version: u8,
    pub payload: Payload,
}

impl Transaction {
    pub fn deploy(code: DeployCode) -> Self {
        Transaction {
            version: 0,
            payload: Payload::Deploy(code),
        }
    }

    pub fn invoke(code: VmCode) -> Self {
        Transaction {
            version: 0,
            payload: Payload::Invoke(code),
        }
    }

    pub fn hash(&self) -> Hash256 {
        Sha256::digest(self.to_bytes()).into()
    }

    pub fn hash_str(&self) -> String {
        hex::encode(self.hash())
    }
}

impl Encode for Transaction {
    fn encode(&self, sink: &mut Sink) {
        sink.write_u8(self.version);
        match &self.payload {
            Payload::Deploy(d) => {
                sink.write_u8(TX_TYPE_DEPLOY);
                d.code.encode(sink);
                sink.write_bool(d.need_storage);
                sink.write_string(&d.name);
                sink.write_string(&d.version);
                sink.write_string(&d.author);
                sink.write_string(&d.email);
                sink.write_string(&d.description);
            }
            Payload::Invoke(code) => {
                sink.write_u8(TX_TYPE_INVOKE);
                code.encode(sink);
            }
        }
    }
}

impl Decode for Transaction {
    fn decode(source: &mut Source<'_>) -> Result<Self> {
        let version = source.next_u8()?;
        let payload = match source.next_u8()? {
            TX_TYPE_DEPLOY => Payload::Deploy(DeployCode {
                code: VmCode::decode(source)?,
                need_storage: source.next_bool()?,
                name: source.next_string()?,
                version: source.next_string()?,
                author: source.next_string()?,
                email: source.next_string()?,
                description: source.next_string()?,
            }),
            TX_TYPE_INVOKE => Payload::Invoke(VmCode::decode(source)?),
            other => {
                return Err(ChainError::DataIrregularity(format!(
                    "unknown transaction type {:#04x}",
                    other
                )))
            }
        };
        Ok(Transaction { version, payload })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub version: u32,
    pub prev_block_hash: Hash256,
    pub transactions_root: Hash256,
    pub timestamp: u32,
    pub height: u32,
    pub consensus_data: u64,
    pub next_book_keeper: Address,
    pub book_keepers: Vec<Vec<u8>>,
    pub sig_data: Vec<Vec<u8>>,
}

impl Header {
    fn encode_unsigned(&self, sink: &mut Sink) {
        sink.write_u32(self.version);
        sink.write_bytes(&self.prev_block_hash);
        sink.write_bytes(&self.transactions_root);
        sink.write_u32(self.timestamp);
        sink.write_u32(self.height);
        sink.write_u64(self.consensus_data);
        sink.write_address(&self.next_book_keeper);
    }

    /// Hash over the unsigned part of the header.
    pub fn hash(&self) -> Hash256 {
        let mut sink = Sink::new();
        self.encode_unsigned(&mut sink);
        Sha256::digest(sink.bytes()).into()
    }
}

impl Encode for Header {
    fn encode(&self, sink: &mut Sink) {
        self.encode_unsigned(sink);
        sink.write_var_uint(self.book_keepers.len() as u64);
        for key in &self.book_keepers {
            sink.write_var_bytes(key);
        }
        sink.write_var_uint(self.sig_data.len() as u64);
        for sig in &self.sig_data {
            sink.write_var_bytes(sig);
        }
    }
}

fn decode_hash(source: &mut Source<'_>) -> Result<Hash256> {
    let mut out = [0u8; 32];
    out.copy_from_slice(source.next_bytes(32)?);
    Ok(out)
}

fn decode_byte_list(source: &mut Source<'_>) -> Result<Vec<Vec<u8>>> {
    let count = source.next_var_uint()?;
    let mut out = Vec::new();
    for _ in 0..count {
        out.push(source.next_var_bytes()?.to_vec());
    }
    Ok(out)
}

impl Decode for Header {
    fn decode(source: &mut Source<'_>) -> Result<Self> {
        Ok(Header {
            version: source.next_u32()?,
            prev_block_hash: decode_hash(source)?,
            transactions_root: decode_hash(source)?,
            timestamp: source.next_u32()?,
            height: source.next_u32()?,
            consensus_data: source.next_u64()?,
            next_book_keeper: source.next_address()?,
            book_keepers: decode_byte_list(source)?,
            sig_data: decode_byte_list(source)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header: Header,
    pub transactions: Vec<Transaction>,
}

impl Block {
    pub fn hash(&self) -> Hash256 {
        self.header.hash()
    }
}

impl Encode for Block {
    fn encode(&self, sink: &mut Sink) {
        self.header.encode(sink);
        sink.write_var_uint(self.transactions.len() as u64);
        for tx in &self.transactions {
            tx.encode(sink);
        }
    }
}

impl Decode for Block {
    fn decode(source: &mut Source<'_>) -> Result<Self> {
        let header = Header::decode(source)?;
        let count = source.next_var_uint()?;
        let mut transactions = Vec::new();
        for _ in 0..count {
            transactions.push(Transaction::decode(source)?);
        }
        Ok(Block { header, transactions })
    }
}
