//! Classic XRP Ledger account addresses.
//!
//! Two levels of validation are offered. [`Address::new`] performs the cheap
//! shape check (prefix, length, alphabet) that is good enough for values the
//! ledger itself already validated, and accepts the reserved sentinel
//! accounts whose checksum is intentionally invalid. [`Address::checked`]
//! runs the full base58-check decoding and is what the relayer uses for
//! operator-supplied data such as the contract relayer registry.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Version byte prefixed to a 20-byte account id before base58-check
/// encoding. Yields the leading `r` of classic addresses.
const ACCOUNT_ID_VERSION: u8 = 0x00;

/// Raw account id length (RIPEMD160 of the SHA256 of the public key).
pub const ACCOUNT_ID_LEN: usize = 20;

const MIN_ADDRESS_LEN: usize = 23;
const MAX_ADDRESS_LEN: usize = 35;

/// The ledger's base58 dictionary. `bs58` ships it as `Alphabet::RIPPLE`.
const ALPHABET: &str = "rpshnaf39wBUDNEGHJKLM4PQRST7VWXYZ2bcdeCg65jkm8oFqi1tuvAxyz";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("address must start with 'r'")]
    BadPrefix,
    #[error("address length must be between {MIN_ADDRESS_LEN} and {MAX_ADDRESS_LEN} characters")]
    BadLength,
    #[error("address contains a character outside the ledger base58 alphabet")]
    BadCharacter,
    #[error("base58 check decoding failed: {0}")]
    BadChecksum(String),
    #[error("decoded payload is not a {ACCOUNT_ID_LEN}-byte account id")]
    BadPayload,
}

/// A classic (`r...`) ledger address.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    /// Shape-validate `s` without verifying the checksum.
    pub fn new(s: impl Into<String>) -> Result<Self, AddressError> {
        let s = s.into();
        if !s.starts_with('r') {
            return Err(AddressError::BadPrefix);
        }
        if s.len() < MIN_ADDRESS_LEN || s.len() > MAX_ADDRESS_LEN {
            return Err(AddressError::BadLength);
        }
        if s.chars().any(|c| !ALPHABET.contains(c)) {
            return Err(AddressError::BadCharacter);
        }
        Ok(Self(s))
    }

    /// Fully validate `s` including the 4-byte double-SHA256 checksum.
    pub fn checked(s: impl Into<String>) -> Result<Self, AddressError> {
        let address = Self::new(s)?;
        address.account_id()?;
        Ok(address)
    }

    /// Base58-check encode a raw 20-byte account id.
    pub fn from_account_id(account_id: [u8; ACCOUNT_ID_LEN]) -> Self {
        let encoded = bs58::encode(account_id)
            .with_alphabet(bs58::Alphabet::RIPPLE)
            .with_check_version(ACCOUNT_ID_VERSION)
            .into_string();
        Self(encoded)
    }

    /// Decode the raw account id, verifying the checksum.
    pub fn account_id(&self) -> Result<[u8; ACCOUNT_ID_LEN], AddressError> {
        let decoded = bs58::decode(&self.0)
            .with_alphabet(bs58::Alphabet::RIPPLE)
            .with_check(Some(ACCOUNT_ID_VERSION))
            .into_vec()
            .map_err(|err| AddressError::BadChecksum(err.to_string()))?;
        // First byte is the version, already verified above.
        let payload = &decoded[1..];
        payload
            .try_into()
            .map_err(|_| AddressError::BadPayload)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Address {
    type Error = AddressError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.0
    }
}
