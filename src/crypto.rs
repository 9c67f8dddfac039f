//! Cryptographic primitives: addresses, secp256k1 keys and book-keeper
//! address derivation.

use crate::codec::Sink;
use crate::error::{ChainError, Result};
use once_cell::sync::Lazy;
use rand::rngs::OsRng;
use secp256k1::{
    constants::{COMPACT_SIGNATURE_SIZE, PUBLIC_KEY_SIZE, SECRET_KEY_SIZE},
    ecdsa::Signature,
    All, Message, PublicKey, Secp256k1, SecretKey,
};
use sha2::{Digest, Sha256};
use std::fmt;

/// A thread-safe, lazily initialized Secp256k1 context.
static SECP256K1_CONTEXT: Lazy<Secp256k1<All>> = Lazy::new(Secp256k1::new);

pub const ADDRESS_LEN: usize = 20;

/// Upper bound on the book-keeper set a multi-signature program may cover.
pub const MAX_BOOK_KEEPERS: usize = 1024;

const OP_CHECKSIG: u8 = 0xAC;
const OP_CHECKMULTISIG: u8 = 0xAE;

/// Fixed-width account or contract identifier.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct Address(pub [u8; ADDRESS_LEN]);

impl Address {
    /// Null origin used for synthetic transfers (initial distribution).
    pub const ZERO: Address = Address([0u8; ADDRESS_LEN]);

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(hex_str: &str) -> Result<Self> {
        let bytes = hex::decode(hex_str.trim_start_matches("0x"))
            .map_err(|e| ChainError::CryptoError(format!("Invalid hex address: {}", e)))?;
        Self::from_slice(&bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let array: [u8; ADDRESS_LEN] = bytes.try_into().map_err(|_| {
            ChainError::CryptoError(format!(
                "Address must be {} bytes, got {}",
                ADDRESS_LEN,
                bytes.len()
            ))
        })?;
        Ok(Address(array))
    }

    /// Address of a verification program: the first 20 bytes of its SHA-256.
    pub fn from_program(program: &[u8]) -> Self {
        let digest = Sha256::digest(program);
        let mut out = [0u8; ADDRESS_LEN];
        out.copy_from_slice(&digest[..ADDRESS_LEN]);
        Address(out)
    }

    /// Well-known address of a native contract: the id in the last byte.
    pub const fn native(id: u8) -> Self {
        let mut out = [0u8; ADDRESS_LEN];
        out[ADDRESS_LEN - 1] = id;
        Address(out)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Convenience function to create an address from a string (hashes the string).
/// Useful for testing and debugging.
pub fn address_from_string(s: &str) -> Address {
    Address::from_program(s.as_bytes())
}

pub fn public_key_from_hex(hex_str: &str) -> Result<PublicKey> {
    let bytes = hex::decode(hex_str)
        .map_err(|e| ChainError::CryptoError(format!("Invalid hex public key: {}", e)))?;
    PublicKey::from_slice(&bytes)
        .map_err(|e| ChainError::CryptoError(format!("Invalid public key: {}", e)))
}

/// Single-signature verification program: `push(key) CHECKSIG`.
pub fn program_from_pubkey(public_key: &PublicKey) -> Vec<u8> {
    let mut sink = Sink::new();
    sink.write_var_bytes(&public_key.serialize());
    sink.write_u8(OP_CHECKSIG);
    sink.into_bytes()
}

pub fn address_from_pubkey(public_key: &PublicKey) -> Address {
    Address::from_program(&program_from_pubkey(public_key))
}

/// Derives the next book-keeper address for a consensus key set.
///
/// One key yields its single-signature address. Several keys yield an
/// `m`-of-`n` multi-signature program address with `m = n - (n - 1) / 3`,
/// keys sorted by their compressed encoding so the result does not depend on
/// the order the caller supplied.
pub fn address_from_book_keepers(book_keepers: &[PublicKey]) -> Result<Address> {
    match book_keepers.len() {
        0 => Err(ChainError::BookKeeperDerivation("empty book-keeper set".to_string())),
        1 => Ok(address_from_pubkey(&book_keepers[0])),
        n if n > MAX_BOOK_KEEPERS => Err(ChainError::BookKeeperDerivation(format!(
            "{} book-keepers exceed the limit of {}",
            n, MAX_BOOK_KEEPERS
        ))),
        n => {
            let mut keys: Vec<[u8; PUBLIC_KEY_SIZE]> =
                book_keepers.iter().map(|k| k.serialize()).collect();
            keys.sort_unstable();
            keys.dedup();
            if keys.len() != n {
                return Err(ChainError::BookKeeperDerivation(
                    "duplicate book-keeper public key".to_string(),
                ));
            }
            let m = n - (n - 1) / 3;

            let mut sink = Sink::new();
            sink.write_var_uint(m as u64);
            for key in &keys {
                sink.write_var_bytes(key);
            }
            sink.write_var_uint(n as u64);
            sink.write_u8(OP_CHECKMULTISIG);
            Ok(Address::from_program(sink.bytes()))
        }
    }
}

#[derive(Debug, Clone)]
pub struct KeyPair {
    pub secret_key: SecretKey,
    pub public_key: PublicKey,
}

impl KeyPair {
    /// Generates a new random KeyPair using the OS random number generator.
    pub fn generate() -> Self {
        let secret_key = SecretKey::new(&mut OsRng);
        Self::from_secret_key(secret_key)
    }

    pub fn from_secret_key(secret_key: SecretKey) -> Self {
        let public_key = PublicKey::from_secret_key(&SECP256K1_CONTEXT, &secret_key);
        KeyPair {
            secret_key,
            public_key,
        }
    }

    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self> {
        let secret_key = SecretKey::from_slice(bytes).map_err(|e| {
            if bytes.len() != SECRET_KEY_SIZE {
                ChainError::CryptoError(format!(
                    "Secret key must be {} bytes, got {}",
                    SECRET_KEY_SIZE,
                    bytes.len()
                ))
            } else {
                ChainError::CryptoError(format!("Invalid secret key bytes: {}", e))
            }
        })?;

        Ok(Self::from_secret_key(secret_key))
    }

    /// Single-signature program address of this key.
    pub fn address(&self) -> Address {
        address_from_pubkey(&self.public_key)
    }

    pub fn public_key_bytes(&self) -> [u8; PUBLIC_KEY_SIZE] {
        self.public_key.serialize()
    }

    /// Signs the SHA-256 of `message` and returns the compact signature.
    pub fn sign(&self, message: &[u8]) -> Result<[u8; COMPACT_SIGNATURE_SIZE]> {
        let digest = Sha256::digest(message);
        let message = Message::from_digest_slice(&digest)
            .map_err(|e| ChainError::CryptoError(format!("Failed to create message: {}", e)))?;
        let signature = SECP256K1_CONTEXT.sign_ecdsa(&message, &self.secret_key);
        Ok(signature.serialize_compact())
    }
}

/// Verifies an ECDSA signature given the raw public key bytes, message, and signature bytes.
pub fn verify_signature(
    public_key_bytes: &[u8],
    message: &[u8],
    signature_bytes: &[u8],
) -> Result<()> {
    if public_key_bytes.len() != PUBLIC_KEY_SIZE {
        return Err(ChainError::CryptoError(format!(
            "Public key must be exactly {} bytes (compressed), got {}",
            PUBLIC_KEY_SIZE,
            public_key_bytes.len()
        )));
    }
    if signature_bytes.len() != COMPACT_SIGNATURE_SIZE {
        return Err(ChainError::CryptoError(format!(
            "Signature must be exactly {} bytes (compact), got {}",
            COMPACT_SIGNATURE_SIZE,
            signature_bytes.len()
        )));
    }

    let public_key = PublicKey::from_slice(public_key_bytes)
        .map_err(|e| ChainError::CryptoError(format!("Invalid public key: {}", e)))?;

    let digest = Sha256::digest(message);
    let message = Message::from_digest_slice(&digest)
        .map_err(|e| ChainError::CryptoError(format!("Failed to create message: {}", e)))?;

    let signature = Signature::from_compact(signature_bytes)
        .map_err(|e| ChainError::CryptoError(format!("Invalid signature: {}", e)))?;

    SECP256K1_CONTEXT
        .verify_ecdsa(&message, &signature, &public_key)
        .map_err(|_| ChainError::CryptoError("Signature verification failed".to_string()))
}
