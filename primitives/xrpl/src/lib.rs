//! **xrpl-primitives**
//!
//! Data model for the XRP Ledger side of the Coreum bridge: account
//! addresses, currencies, exact rational token values, transaction and
//! metadata records as delivered by a ledger scanner, engine result codes
//! (including the finality rules the relayer applies before attesting
//! anything), signer lists and the unsigned transaction templates the
//! federation multi-signs.
//!
//! Everything here is plain data plus pure functions. Transports, signing
//! key material and the home-chain contract live behind capability traits
//! in the relayer crate.

pub mod address;
pub mod amount;
pub mod result;
pub mod rpc;
pub mod tx;

pub use address::{Address, AddressError};
pub use amount::{Amount, AmountError, Currency, Value, ValueError, XRP_CURRENCY, XRP_ISSUER};
pub use result::{
    ResultClass, TransactionResult, TEF_MAX_LEDGER, TEF_NO_TICKET, TEF_PAST_SEQ, TEL_INSUF_FEE_P,
    TES_SUCCESS,
};
pub use rpc::{AccountData, AccountInfo, SignerEntry, SignerList, SubmitResult};
pub use tx::{
    bridge_recipient, AffectedNode, CreatedNode, Memo, NewFields, SignedTransaction, Signer,
    Transaction, TransactionMetadata, TransactionType, TransactionWithMetadata, TxSequenceRef,
    UnsignedTransaction, UnsignedTxKind, BRIDGE_MEMO_TYPE, TF_SET_NO_RIPPLE,
};

/// Hex-encoded transaction hash as reported by the ledger.
pub type TxHash = String;

/// Hex-encoded compressed public key of a signer.
pub type PublicKeyHex = String;

/// Hex-encoded transaction signature blob.
pub type SignatureHex = String;
