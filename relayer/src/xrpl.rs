//! Ledger-side capability traits.
//!
//! The concrete RPC transport, the historic-transaction scanner and the key
//! store are injected by the embedding binary; the processes only ever see
//! these seams. Integration tests drive them with in-memory fakes.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use xrpl_primitives::{
    AccountInfo, Address, SignedTransaction, Signer, SubmitResult, TransactionWithMetadata,
    UnsignedTransaction,
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("ledger rpc failed: {0}")]
    Rpc(String),
    #[error("scanner failed: {0}")]
    Scanner(String),
    #[error("signing failed: {0}")]
    Signing(String),
}

/// The two RPC methods the relayer needs.
#[async_trait]
pub trait LedgerRpc: Send + Sync {
    /// `account_info` with signer lists included.
    async fn account_info(&self, account: &Address) -> Result<AccountInfo, LedgerError>;

    /// Preliminary submission; finality is judged later from scanned
    /// transactions, never from this response.
    async fn submit(&self, tx: &SignedTransaction) -> Result<SubmitResult, LedgerError>;
}

/// A stream of bridge-account transactions.
///
/// `scan` pushes transactions into `out` strictly in delivery order and
/// returns when the underlying source is exhausted or fails. Whether a
/// restarted scan replays already-delivered transactions is implementation
/// defined; the ingest process is idempotent either way.
#[async_trait]
pub trait TransactionScanner: Send + Sync {
    async fn scan(&self, out: mpsc::Sender<TransactionWithMetadata>) -> Result<(), LedgerError>;
}

/// Multi-signing key material.
///
/// Stateless apart from the key itself and safe to share across tasks.
pub trait TransactionSigner: Send + Sync {
    /// This signer's ledger account.
    fn account(&self) -> Address;

    /// Produce this relayer's multi-signature over the template.
    fn sign(&self, tx: &UnsignedTransaction) -> Result<Signer, LedgerError>;

    /// Verify one attached multi-signature against a freshly built
    /// template.
    fn verify(&self, tx: &UnsignedTransaction, signer: &Signer) -> bool;
}
