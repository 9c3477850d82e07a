//! Builders and the deterministic fake signer shared by the tests.

use std::sync::Mutex;

use sha2::{Digest, Sha512};

use coreumbridge_xrpl_relayer::coreum::{BridgeConfig, CoreumAddress, RelayerRecord};
use coreumbridge_xrpl_relayer::metrics::MaliciousBehaviourRegistry;
use coreumbridge_xrpl_relayer::xrpl::{LedgerError, TransactionSigner};
use xrpl_primitives::{
    AccountData, AccountInfo, Address, AffectedNode, Amount, CreatedNode, Currency, Memo,
    NewFields, SignerEntry, SignerList, Signer, Transaction, TransactionMetadata,
    TransactionResult, TransactionType, TransactionWithMetadata, UnsignedTransaction, Value,
};

pub fn xrpl_account(index: u8) -> Address {
    Address::from_account_id([index; 20])
}

pub fn coreum_account(index: u8) -> CoreumAddress {
    CoreumAddress::from_bytes(&[index; 20]).expect("bech32 encoding")
}

pub fn relayer_pub_key(index: u8) -> String {
    hex::encode([index; 33])
}

pub fn relayer_record(index: u8) -> RelayerRecord {
    RelayerRecord {
        coreum_address: coreum_account(index),
        xrpl_address: xrpl_account(index).as_str().to_owned(),
        xrpl_pub_key: relayer_pub_key(index),
    }
}

pub fn bridge_address() -> Address {
    Address::from_account_id([0xbb; 20])
}

pub fn bridge_config(relayer_count: u8, evidence_threshold: u32) -> BridgeConfig {
    BridgeConfig {
        bridge_xrpl_address: bridge_address(),
        evidence_threshold,
        relayers: (1..=relayer_count).map(relayer_record).collect(),
    }
}

/// The bridge account as `account_info` reports it: current sequence plus
/// a unit-weight signer list over the federation.
pub fn bridge_account_info(sequence: u32, relayer_count: u8, quorum: u32) -> AccountInfo {
    AccountInfo {
        account_data: AccountData {
            account: bridge_address(),
            sequence,
            signer_lists: vec![SignerList {
                signer_quorum: quorum,
                signer_entries: (1..=relayer_count)
                    .map(|index| SignerEntry {
                        account: xrpl_account(index),
                        signer_weight: 1,
                    })
                    .collect(),
            }],
        },
    }
}

pub fn usd_issuer() -> Address {
    Address::from_account_id([0x77; 20])
}

pub fn usd(value: &str) -> Amount {
    Amount::issued(
        Value::parse(value, false).expect("test value"),
        Currency::new("USD").expect("currency"),
        usd_issuer(),
    )
}

/// An inbound deposit: a payment into the bridge account with an optional
/// routing memo.
pub fn payment_to_bridge(
    hash: &str,
    delivered: Option<Amount>,
    memo: Option<Memo>,
) -> TransactionWithMetadata {
    TransactionWithMetadata {
        tx: Transaction {
            hash: hash.to_owned(),
            account: xrpl_account(0x51),
            transaction_type: TransactionType::Payment,
            sequence: 900,
            ticket_sequence: None,
            signing_pub_key: Some("ED".repeat(17)),
            fee: Some("12".to_owned()),
            memos: memo.into_iter().collect(),
            signers: Vec::new(),
            destination: Some(bridge_address()),
            amount: delivered.clone(),
        },
        meta: TransactionMetadata {
            transaction_result: TransactionResult::new("tesSUCCESS"),
            delivered_amount: delivered,
            affected_nodes: Vec::new(),
        },
    }
}

/// An outbound TicketCreate from the bridge account, with the created
/// ticket sequences in its metadata when accepted.
pub fn ticket_create_from_bridge(
    hash: &str,
    account_sequence: u32,
    result: &str,
    created: &[u32],
) -> TransactionWithMetadata {
    TransactionWithMetadata {
        tx: Transaction {
            hash: hash.to_owned(),
            account: bridge_address(),
            transaction_type: TransactionType::TicketCreate,
            sequence: account_sequence,
            ticket_sequence: None,
            signing_pub_key: Some(String::new()),
            fee: Some("330".to_owned()),
            memos: Vec::new(),
            signers: vec![Signer {
                account: xrpl_account(1),
                txn_signature: "aa".to_owned(),
                signing_pub_key: relayer_pub_key(1),
            }],
            destination: None,
            amount: None,
        },
        meta: TransactionMetadata {
            transaction_result: TransactionResult::new(result),
            delivered_amount: None,
            affected_nodes: created
                .iter()
                .map(|sequence| {
                    AffectedNode::CreatedNode(CreatedNode {
                        ledger_entry_type: "Ticket".to_owned(),
                        new_fields: NewFields {
                            ticket_sequence: Some(*sequence),
                        },
                    })
                })
                .collect(),
        },
    }
}

/// The fake signature scheme: SHA-512-half over the canonical template
/// bytes, the signing account and its public key. Any party can recompute
/// it, so verification works across relayers exactly like the real thing,
/// while arbitrary blobs fail it.
pub fn fake_signature(tx: &UnsignedTransaction, account: &Address, pub_key: &str) -> String {
    let mut hasher = Sha512::new();
    hasher.update(tx.canonical_bytes());
    hasher.update(account.as_str().as_bytes());
    hasher.update(pub_key.as_bytes());
    hex::encode(&hasher.finalize()[..32])
}

/// One relayer's signing identity.
pub struct DeterministicSigner {
    account: Address,
    pub_key: String,
}

impl DeterministicSigner {
    pub fn new(index: u8) -> Self {
        Self {
            account: xrpl_account(index),
            pub_key: relayer_pub_key(index),
        }
    }
}

impl TransactionSigner for DeterministicSigner {
    fn account(&self) -> Address {
        self.account.clone()
    }

    fn sign(&self, tx: &UnsignedTransaction) -> Result<Signer, LedgerError> {
        Ok(Signer {
            account: self.account.clone(),
            txn_signature: fake_signature(tx, &self.account, &self.pub_key),
            signing_pub_key: self.pub_key.clone(),
        })
    }

    fn verify(&self, tx: &UnsignedTransaction, signer: &Signer) -> bool {
        signer.txn_signature == fake_signature(tx, &signer.account, &signer.signing_pub_key)
    }
}

/// Captures malicious-behaviour keys for assertions.
#[derive(Default)]
pub struct RecordingRegistry(Mutex<Vec<String>>);

impl RecordingRegistry {
    pub fn keys(&self) -> Vec<String> {
        self.0.lock().expect("registry lock").clone()
    }
}

impl MaliciousBehaviourRegistry for RecordingRegistry {
    fn register(&self, key: &str) {
        self.0.lock().expect("registry lock").push(key.to_owned());
    }
}
