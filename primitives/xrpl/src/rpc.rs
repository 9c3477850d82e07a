//! Request/response shapes of the ledger RPC methods the relayer consumes.
//!
//! Only `account_info` (with signer lists) and `submit` are needed; the
//! transports themselves live behind a capability trait in the relayer.

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use crate::address::Address;
use crate::result::TransactionResult;

/// `account_info` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub account_data: AccountData,
}

#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AccountData {
    pub account: Address,
    pub sequence: u32,
    /// An account owns at most one signer list; the ledger still returns
    /// an array.
    #[serde(default, rename = "signer_lists")]
    pub signer_lists: Vec<SignerList>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SignerList {
    pub signer_quorum: u32,
    pub signer_entries: Vec<SignerEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SignerEntry {
    pub account: Address,
    pub signer_weight: u16,
}

/// Preliminary `submit` response. The engine result is provisional: the
/// transaction only becomes final per the rules in [`crate::result`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitResult {
    pub engine_result: TransactionResult,
}
