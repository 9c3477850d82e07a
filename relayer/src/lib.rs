//! **coreumbridge-xrpl-relayer**
//!
//! The two long-running processes every federation member runs, plus the
//! shared arithmetic that keeps them in consensus:
//!
//! - the [ingest pipeline](processes::ingest) scans bridge-account
//!   transactions on the XRP Ledger and files typed evidence with the
//!   bridge contract on Coreum;
//! - the [sign-or-submit loop](processes::submitter) polls the contract's
//!   pending operations, contributes this relayer's signature and, once a
//!   quorum of the federation has signed, composes and submits the
//!   multi-signed ledger transaction;
//! - the [amount](amount) layer converts exactly between the ledger's
//!   mantissa/exponent values and the contract's fixed-point integers, and
//!   applies the sending-precision truncation that governs fees.
//!
//! Transports, the wasm contract and key material are injected through the
//! capability traits in [`coreum`] and [`xrpl`]; everything in this crate is
//! deterministic so that independent relayers observing the same state vote
//! and sign identically.

pub mod amount;
pub mod config;
pub mod coreum;
pub mod error;
pub mod evidence;
pub mod metrics;
pub mod processes;
pub mod xrpl;

pub use error::RelayerError;
