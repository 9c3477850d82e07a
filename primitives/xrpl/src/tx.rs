//! Transactions as observed by the ledger scanner, and the unsigned
//! templates the federation multi-signs.
//!
//! Observed transactions mirror the ledger JSON (PascalCase fields, the
//! lowercase `delivered_amount` quirk in metadata, externally tagged
//! affected nodes). Templates are deliberately minimal: only the four
//! shapes the bridge contract can instruct, with the signing-relevant
//! fields and nothing else, so every relayer derives byte-identical bytes
//! for the same operation.

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use crate::address::Address;
use crate::amount::Amount;
use crate::result::TransactionResult;
use crate::rpc::SignerEntry;
use crate::{PublicKeyHex, SignatureHex, TxHash};

/// Memo type tag marking a payment as a bridge deposit. Stored hex-encoded
/// on the ledger like every memo field.
pub const BRIDGE_MEMO_TYPE: &str = "coreumbridge-xrpl-v1";

/// `tfSetNoRipple` flag on a TrustSet: the bridge account never allows
/// rippling through its trust lines.
pub const TF_SET_NO_RIPPLE: u32 = 0x0002_0000;

/// Transaction types the bridge account is expected to emit or receive.
/// Anything else observed outbound is treated as a hostile signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionType {
    Payment,
    TicketCreate,
    TrustSet,
    SignerListSet,
    AccountSet,
    #[serde(other)]
    Other,
}

/// An arbitrary memo attached to a transaction. Fields are hex-encoded.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Memo {
    pub memo_type: Option<String>,
    pub memo_data: Option<String>,
    pub memo_format: Option<String>,
}

impl Memo {
    /// The memo a depositor attaches to route funds to a home-chain
    /// recipient: the bridge tag plus the recipient's raw address bytes.
    pub fn bridge_deposit(recipient_bytes: &[u8]) -> Self {
        Self {
            memo_type: Some(hex::encode(BRIDGE_MEMO_TYPE)),
            memo_data: Some(hex::encode(recipient_bytes)),
            memo_format: None,
        }
    }

    fn bridge_recipient_bytes(&self) -> Option<Vec<u8>> {
        let memo_type = hex::decode(self.memo_type.as_deref()?).ok()?;
        if memo_type != BRIDGE_MEMO_TYPE.as_bytes() {
            return None;
        }
        let data = hex::decode(self.memo_data.as_deref()?).ok()?;
        if data.is_empty() {
            return None;
        }
        Some(data)
    }
}

/// Raw recipient bytes from the first well-formed bridge memo, if any.
pub fn bridge_recipient(memos: &[Memo]) -> Option<Vec<u8>> {
    memos.iter().find_map(Memo::bridge_recipient_bytes)
}

/// One contributed multi-signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Signer {
    pub account: Address,
    pub txn_signature: SignatureHex,
    pub signing_pub_key: PublicKeyHex,
}

/// A transaction as delivered by the scanner.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Transaction {
    #[serde(rename = "hash")]
    pub hash: TxHash,
    pub account: Address,
    pub transaction_type: TransactionType,
    /// Account sequence; zero when a ticket was consumed instead.
    #[serde(default)]
    pub sequence: u32,
    pub ticket_sequence: Option<u32>,
    pub signing_pub_key: Option<PublicKeyHex>,
    /// Fee in drops.
    pub fee: Option<String>,
    #[serde(default)]
    pub memos: Vec<Memo>,
    /// Multi-signature signers; empty on single-signed transactions.
    #[serde(default)]
    pub signers: Vec<Signer>,
    pub destination: Option<Address>,
    /// Headline amount of a payment. For delivered funds consult the
    /// metadata instead: partial payments may deliver less.
    pub amount: Option<Amount>,
}

/// Transaction metadata.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TransactionMetadata {
    pub transaction_result: TransactionResult,
    // The one lowercase field in ledger metadata.
    #[serde(rename = "delivered_amount")]
    pub delivered_amount: Option<Amount>,
    #[serde(default)]
    pub affected_nodes: Vec<AffectedNode>,
}

/// A ledger entry touched by the transaction, externally tagged as on the
/// ledger (`{"CreatedNode": {...}}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AffectedNode {
    CreatedNode(CreatedNode),
    ModifiedNode(serde_json::Value),
    DeletedNode(serde_json::Value),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreatedNode {
    pub ledger_entry_type: String,
    #[serde(default)]
    pub new_fields: NewFields,
}

#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NewFields {
    pub ticket_sequence: Option<u32>,
}

/// The scanner's unit of delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionWithMetadata {
    pub tx: Transaction,
    pub meta: TransactionMetadata,
}

impl TransactionWithMetadata {
    /// Ticket sequences created by this transaction, in order of
    /// appearance in the affected nodes.
    pub fn created_tickets(&self) -> Vec<u32> {
        self.meta
            .affected_nodes
            .iter()
            .filter_map(|node| match node {
                AffectedNode::CreatedNode(created) if created.ledger_entry_type == "Ticket" => {
                    created.new_fields.ticket_sequence
                }
                _ => None,
            })
            .collect()
    }
}

/// Either an account sequence or a pre-allocated ticket; a transaction
/// consumes exactly one of the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxSequenceRef {
    Account(u32),
    Ticket(u32),
}

impl TxSequenceRef {
    pub fn account_sequence(&self) -> Option<u32> {
        match self {
            Self::Account(sequence) => Some(*sequence),
            Self::Ticket(_) => None,
        }
    }

    pub fn ticket_sequence(&self) -> Option<u32> {
        match self {
            Self::Account(_) => None,
            Self::Ticket(ticket) => Some(*ticket),
        }
    }
}

/// An unsigned multi-signing template.
///
/// The signing public key of a multi-signed transaction is the empty
/// string by ledger convention; it is implicit here and supplied by the
/// signer implementation at encoding time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedTransaction {
    pub account: Address,
    /// Fee in drops.
    pub fee: u64,
    pub sequence_ref: TxSequenceRef,
    pub kind: UnsignedTxKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnsignedTxKind {
    TicketCreate {
        ticket_count: u32,
    },
    TrustSet {
        limit_amount: Amount,
        flags: u32,
    },
    Payment {
        destination: Address,
        amount: Amount,
        send_max: Option<Amount>,
    },
    SignerListSet {
        signer_quorum: u32,
        signer_entries: Vec<SignerEntry>,
    },
}

impl UnsignedTransaction {
    pub fn transaction_type(&self) -> TransactionType {
        match &self.kind {
            UnsignedTxKind::TicketCreate { .. } => TransactionType::TicketCreate,
            UnsignedTxKind::TrustSet { .. } => TransactionType::TrustSet,
            UnsignedTxKind::Payment { .. } => TransactionType::Payment,
            UnsignedTxKind::SignerListSet { .. } => TransactionType::SignerListSet,
        }
    }

    /// Deterministic byte form the signer implementations operate on.
    /// Struct field order is fixed, so two identical templates serialize
    /// identically.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).expect("template serialization is infallible")
    }

    /// Attach multi-signature signers. Consumes the template: a signed
    /// transaction is no longer signing-ready, callers rebuild from the
    /// operation instead of reusing it.
    pub fn into_multisigned(self, mut signers: Vec<Signer>) -> SignedTransaction {
        signers.sort_by(|a, b| a.account.as_str().cmp(b.account.as_str()));
        SignedTransaction { tx: self, signers }
    }
}

/// A template with its collected multi-signatures attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub tx: UnsignedTransaction,
    pub signers: Vec<Signer>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bridge_memo_round_trips() {
        let memo = Memo::bridge_deposit(&[1, 2, 3, 4]);
        assert_eq!(bridge_recipient(&[memo]), Some(vec![1, 2, 3, 4]));
    }

    #[test]
    fn foreign_memos_are_ignored() {
        let unrelated = Memo {
            memo_type: Some(hex::encode("totally-unrelated")),
            memo_data: Some(hex::encode([9u8; 4])),
            memo_format: None,
        };
        let malformed = Memo {
            memo_type: Some(hex::encode(BRIDGE_MEMO_TYPE)),
            memo_data: Some("zz-not-hex".to_owned()),
            memo_format: None,
        };
        assert_eq!(bridge_recipient(&[unrelated, malformed]), None);
        assert_eq!(bridge_recipient(&[]), None);
    }

    #[test]
    fn created_tickets_preserve_node_order() {
        let tickets = [3u32, 5, 7];
        let nodes = tickets
            .iter()
            .map(|seq| {
                AffectedNode::CreatedNode(CreatedNode {
                    ledger_entry_type: "Ticket".to_owned(),
                    new_fields: NewFields {
                        ticket_sequence: Some(*seq),
                    },
                })
            })
            .chain(std::iter::once(AffectedNode::ModifiedNode(
                serde_json::json!({"LedgerEntryType": "AccountRoot"}),
            )))
            .collect();
        let observed = TransactionWithMetadata {
            tx: sample_tx(TransactionType::TicketCreate),
            meta: TransactionMetadata {
                transaction_result: TransactionResult::new("tesSUCCESS"),
                delivered_amount: None,
                affected_nodes: nodes,
            },
        };
        assert_eq!(observed.created_tickets(), vec![3, 5, 7]);
    }

    #[test]
    fn unknown_transaction_types_deserialize_as_other() {
        let ty: TransactionType = serde_json::from_str("\"NFTokenMint\"").unwrap();
        assert_eq!(ty, TransactionType::Other);
    }

    #[test]
    fn multisigning_sorts_signers() {
        let template = UnsignedTransaction {
            account: Address::from_account_id([0u8; 20]),
            fee: 330,
            sequence_ref: TxSequenceRef::Ticket(9),
            kind: UnsignedTxKind::TicketCreate { ticket_count: 4 },
        };
        let one = signer([1u8; 20]);
        let two = signer([2u8; 20]);
        let signed_a = template.clone().into_multisigned(vec![two.clone(), one.clone()]);
        let signed_b = template.into_multisigned(vec![one, two]);
        assert_eq!(signed_a, signed_b);
    }

    fn signer(id: [u8; 20]) -> Signer {
        Signer {
            account: Address::from_account_id(id),
            txn_signature: "aa".to_owned(),
            signing_pub_key: "bb".to_owned(),
        }
    }

    fn sample_tx(transaction_type: TransactionType) -> Transaction {
        Transaction {
            hash: "AB".repeat(32),
            account: Address::from_account_id([8u8; 20]),
            transaction_type,
            sequence: 1,
            ticket_sequence: None,
            signing_pub_key: None,
            fee: None,
            memos: Vec::new(),
            signers: Vec::new(),
            destination: None,
            amount: None,
        }
    }
}
