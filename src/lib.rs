//! Native Ledger - native governance and utility token contracts
//!
//! # Architecture
//!
//! The crate is organized into logical modules:
//!
//! ## Native Contracts
//! - [`native`] - Dispatch service, account ledger, unbinding and token handlers
//! - [`arithmetic`] - Overflow-checked amount arithmetic
//!
//! ## Chain Data
//! - [`block`] - Block, header and transaction types
//! - [`genesis`] - Genesis block assembly and initial ledger seeding
//! - [`codec`] - Canonical binary encoding
//!
//! ## Cryptography
//! - [`crypto`] - Addresses, secp256k1 keys and book-keeper derivation
//!
//! ## State Management
//! - [`storage`] - Storage keys, transaction overlay and SQLite backend
//!
//! ## Configuration & Utilities
//! - [`config`] - Configuration management
//! - [`constants`] - Token parameters and the emission schedule
//! - [`error`] - Error types

#![forbid(unsafe_code)]

// ============================================================================
// Native Contracts
// ============================================================================
pub mod arithmetic;
pub mod native;

// ============================================================================
// Chain Data
// ============================================================================
pub mod block;
pub mod codec;
pub mod genesis;

// ============================================================================
// Cryptography
// ============================================================================
pub mod crypto;

// ============================================================================
// State Management
// ============================================================================
pub mod storage;

// ============================================================================
// Configuration & Utilities
// ============================================================================
pub mod config;
pub mod constants;
pub mod error;
