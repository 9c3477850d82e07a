//! Home-chain side: contract records, the client capability trait and the
//! error taxonomy.
//!
//! The wire shapes follow the contract's cosmwasm JSON conventions:
//! snake_case tags, `uint128` fields as decimal strings, externally tagged
//! variants. Where the contract encodes "exactly one of ticket or account
//! sequence" as two optional fields, the types here keep a sum type and
//! translate at the serde boundary so an inconsistent payload fails to
//! deserialize instead of flowing onwards.

pub mod error;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};
use thiserror::Error;

use xrpl_primitives::{Address, Currency, SignatureHex, TxHash};

pub use error::ContractError;

/// Bech32 prefix of home-chain account addresses.
pub const COREUM_HRP: &str = "core";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreumAddressError {
    #[error("bech32 decoding failed: {0}")]
    Decode(String),
}

/// A bech32 home-chain account address.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CoreumAddress(String);

impl CoreumAddress {
    pub fn new(s: impl Into<String>) -> Result<Self, CoreumAddressError> {
        let s = s.into();
        bech32::decode(&s).map_err(|err| CoreumAddressError::Decode(err.to_string()))?;
        Ok(Self(s))
    }

    /// Encode raw account bytes under the [`COREUM_HRP`] prefix. This is
    /// how memo payloads turn back into addresses.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CoreumAddressError> {
        let hrp = bech32::Hrp::parse_unchecked(COREUM_HRP);
        let encoded = bech32::encode::<bech32::Bech32>(hrp, bytes)
            .map_err(|err| CoreumAddressError::Decode(err.to_string()))?;
        Ok(Self(encoded))
    }

    pub fn bytes(&self) -> Vec<u8> {
        // Valid by construction.
        bech32::decode(&self.0).map(|(_, data)| data).unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CoreumAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for CoreumAddress {
    type Error = CoreumAddressError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<CoreumAddress> for String {
    fn from(address: CoreumAddress) -> Self {
        address.0
    }
}

/// A home-chain coin.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    #[serde_as(as = "DisplayFromStr")]
    pub amount: u128,
}

/// The unique identity of a contract operation: the ticket it consumes or
/// the bridge-account sequence it occupies, never both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationId {
    AccountSequence(u32),
    TicketSequence(u32),
}

impl OperationId {
    pub fn value(self) -> u32 {
        match self {
            Self::AccountSequence(sequence) => sequence,
            Self::TicketSequence(ticket) => ticket,
        }
    }

    pub fn account_sequence(self) -> Option<u32> {
        match self {
            Self::AccountSequence(sequence) => Some(sequence),
            Self::TicketSequence(_) => None,
        }
    }

    pub fn ticket_sequence(self) -> Option<u32> {
        match self {
            Self::AccountSequence(_) => None,
            Self::TicketSequence(ticket) => Some(ticket),
        }
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

fn operation_id_from_wire(
    ticket_sequence: Option<u32>,
    account_sequence: Option<u32>,
) -> Result<OperationId, String> {
    match (ticket_sequence, account_sequence) {
        (Some(ticket), None) if ticket > 0 => Ok(OperationId::TicketSequence(ticket)),
        (None, Some(sequence)) if sequence > 0 => Ok(OperationId::AccountSequence(sequence)),
        (Some(0), _) | (_, Some(0)) => Err("zero operation id".to_owned()),
        (Some(_), Some(_)) => Err("operation carries both a ticket and an account sequence".to_owned()),
        (None, None) => Err("operation carries neither a ticket nor an account sequence".to_owned()),
        (Some(_), None) | (None, Some(_)) => unreachable!(),
    }
}

/// One relayer's partial signature as stored on the operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationSignature {
    pub relayer_coreum_address: CoreumAddress,
    pub signature: SignatureHex,
}

/// A relayer registry entry. The ledger address and public key arrive as
/// raw strings and are parsed loudly by the signer-set loader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayerRecord {
    pub coreum_address: CoreumAddress,
    pub xrpl_address: String,
    pub xrpl_pub_key: String,
}

/// A pending contract operation awaiting signatures or submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "OperationWire", into = "OperationWire")]
pub struct Operation {
    pub id: OperationId,
    pub version: u64,
    pub signatures: Vec<OperationSignature>,
    /// Base ledger fee (drops) the contract wants templates built with.
    pub xrpl_base_fee: u64,
    pub kind: OperationKind,
}

#[derive(Serialize, Deserialize)]
struct OperationWire {
    ticket_sequence: Option<u32>,
    account_sequence: Option<u32>,
    version: u64,
    #[serde(default)]
    signatures: Vec<OperationSignature>,
    xrpl_base_fee: u64,
    operation_type: OperationKind,
}

impl TryFrom<OperationWire> for Operation {
    type Error = String;

    fn try_from(wire: OperationWire) -> Result<Self, Self::Error> {
        Ok(Self {
            id: operation_id_from_wire(wire.ticket_sequence, wire.account_sequence)?,
            version: wire.version,
            signatures: wire.signatures,
            xrpl_base_fee: wire.xrpl_base_fee,
            kind: wire.operation_type,
        })
    }
}

impl From<Operation> for OperationWire {
    fn from(operation: Operation) -> Self {
        Self {
            ticket_sequence: operation.id.ticket_sequence(),
            account_sequence: operation.id.account_sequence(),
            version: operation.version,
            signatures: operation.signatures,
            xrpl_base_fee: operation.xrpl_base_fee,
            operation_type: operation.kind,
        }
    }
}

/// What the operation instructs the federation to do on the ledger.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    AllocateTickets {
        number: u32,
    },
    TrustSet {
        issuer: Address,
        currency: Currency,
        #[serde_as(as = "DisplayFromStr")]
        trust_set_limit_amount: u128,
    },
    CoreumToXrplTransfer {
        issuer: Address,
        currency: Currency,
        #[serde_as(as = "DisplayFromStr")]
        amount: u128,
        /// Delivery ceiling forwarded verbatim into the payment's SendMax
        /// when the trust line carries a transfer rate. Never recomputed
        /// here; `max_amount >= amount` is the contract's invariant.
        #[serde(default)]
        #[serde_as(as = "Option<DisplayFromStr>")]
        max_amount: Option<u128>,
        recipient: Address,
    },
    RotateKeys {
        new_relayers: Vec<RelayerRecord>,
        new_evidence_threshold: u32,
    },
}

impl OperationKind {
    /// Residual shape checks on top of what the sum type already
    /// guarantees. An operation failing these is malformed and the caller
    /// fails loudly.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Self::AllocateTickets { number } => {
                if *number == 0 {
                    return Err("ticket allocation with zero tickets".to_owned());
                }
            }
            Self::TrustSet { .. } => {}
            Self::CoreumToXrplTransfer { amount, .. } => {
                if *amount == 0 {
                    return Err("transfer with zero amount".to_owned());
                }
            }
            Self::RotateKeys {
                new_relayers,
                new_evidence_threshold,
            } => {
                if new_relayers.is_empty() {
                    return Err("key rotation with no relayers".to_owned());
                }
                if *new_evidence_threshold == 0 {
                    return Err("key rotation with zero threshold".to_owned());
                }
            }
        }
        Ok(())
    }
}

/// Registry state of a bridged token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenState {
    Enabled,
    Disabled,
    Processing,
}

/// An XRPL-originated token registered with the contract.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XrplToken {
    pub issuer: Address,
    pub currency: Currency,
    pub coreum_denom: String,
    pub sending_precision: i32,
    #[serde_as(as = "DisplayFromStr")]
    pub bridging_fee: u128,
    #[serde_as(as = "DisplayFromStr")]
    pub max_holding_amount: u128,
    pub state: TokenState,
}

/// A Coreum-originated token registered with the contract.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreumToken {
    pub denom: String,
    pub decimals: u32,
    pub xrpl_currency: Currency,
    pub sending_precision: i32,
    #[serde_as(as = "DisplayFromStr")]
    pub bridging_fee: u128,
    #[serde_as(as = "DisplayFromStr")]
    pub max_holding_amount: u128,
    pub state: TokenState,
}

/// A refund the contract holds for a user after a rejected transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRefund {
    pub id: String,
    pub coin: Coin,
    pub xrpl_tx_hash: Option<TxHash>,
}

/// Contract configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    pub bridge_xrpl_address: Address,
    pub evidence_threshold: u32,
    pub relayers: Vec<RelayerRecord>,
}

/// Outcome class of an observed ledger transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionResultType {
    Accepted,
    Rejected,
    /// The operation can never produce a ledger transaction (e.g. its
    /// account sequence is already stale); the contract should cancel it.
    Invalid,
}

/// Kind-specific payload of a result attestation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationResult {
    TicketsAllocation {
        /// Present only on accepted allocations, in ledger order.
        tickets: Option<Vec<u32>>,
    },
    TrustSet,
    CoreumToXrplTransfer,
    KeysRotation,
}

/// Attestation of the outcome of an operation's ledger transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TransactionResultEvidenceWire", into = "TransactionResultEvidenceWire")]
pub struct TransactionResultEvidence {
    /// Absent when no transaction exists, as for `Invalid` results.
    pub tx_hash: Option<TxHash>,
    pub operation_id: OperationId,
    pub transaction_result: TransactionResultType,
    pub operation_result: OperationResult,
}

#[derive(Serialize, Deserialize)]
struct TransactionResultEvidenceWire {
    tx_hash: Option<TxHash>,
    account_sequence: Option<u32>,
    ticket_sequence: Option<u32>,
    transaction_result: TransactionResultType,
    operation_result: OperationResult,
}

impl TryFrom<TransactionResultEvidenceWire> for TransactionResultEvidence {
    type Error = String;

    fn try_from(wire: TransactionResultEvidenceWire) -> Result<Self, Self::Error> {
        Ok(Self {
            tx_hash: wire.tx_hash,
            operation_id: operation_id_from_wire(wire.ticket_sequence, wire.account_sequence)?,
            transaction_result: wire.transaction_result,
            operation_result: wire.operation_result,
        })
    }
}

impl From<TransactionResultEvidence> for TransactionResultEvidenceWire {
    fn from(evidence: TransactionResultEvidence) -> Self {
        Self {
            tx_hash: evidence.tx_hash,
            account_sequence: evidence.operation_id.account_sequence(),
            ticket_sequence: evidence.operation_id.ticket_sequence(),
            transaction_result: evidence.transaction_result,
            operation_result: evidence.operation_result,
        }
    }
}

/// Evidence a relayer files with the contract.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Evidence {
    XrplToCoreumTransfer {
        tx_hash: TxHash,
        issuer: Address,
        currency: Currency,
        #[serde_as(as = "DisplayFromStr")]
        amount: u128,
        recipient: CoreumAddress,
    },
    XrplTransactionResult(TransactionResultEvidence),
}

impl Evidence {
    /// The attestation posted when pre-validation finds an operation that
    /// can no longer succeed on the ledger.
    pub fn invalid_ticket_allocation(operation_id: OperationId) -> Self {
        Self::XrplTransactionResult(TransactionResultEvidence {
            tx_hash: None,
            operation_id,
            transaction_result: TransactionResultType::Invalid,
            operation_result: OperationResult::TicketsAllocation { tickets: None },
        })
    }
}

/// The contract as seen by the relayer.
///
/// Implementations must serialize their own execute broadcasts: at most one
/// transaction in flight per relayer, or home-chain sequence numbers race.
#[async_trait]
pub trait ContractClient: Send + Sync {
    async fn config(&self) -> Result<BridgeConfig, ContractError>;
    async fn pending_operations(&self) -> Result<Vec<Operation>, ContractError>;
    async fn xrpl_tokens(
        &self,
        offset: Option<u64>,
        limit: Option<u32>,
    ) -> Result<Vec<XrplToken>, ContractError>;
    async fn coreum_tokens(
        &self,
        offset: Option<u64>,
        limit: Option<u32>,
    ) -> Result<Vec<CoreumToken>, ContractError>;
    async fn available_tickets(&self) -> Result<Vec<u32>, ContractError>;
    async fn pending_refunds(
        &self,
        address: &CoreumAddress,
    ) -> Result<Vec<PendingRefund>, ContractError>;

    async fn save_evidence(&self, evidence: &Evidence) -> Result<(), ContractError>;
    async fn save_signature(
        &self,
        operation_id: OperationId,
        operation_version: u64,
        signature: &str,
    ) -> Result<(), ContractError>;
    async fn send_to_xrpl(
        &self,
        recipient: &Address,
        coin: &Coin,
        deliver_amount: Option<u128>,
    ) -> Result<(), ContractError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticket_operation() -> Operation {
        Operation {
            id: OperationId::TicketSequence(7),
            version: 1,
            signatures: vec![],
            xrpl_base_fee: 10,
            kind: OperationKind::AllocateTickets { number: 5 },
        }
    }

    #[test]
    fn coreum_address_round_trips_through_bytes() {
        let address = CoreumAddress::from_bytes(&[9u8; 20]).unwrap();
        assert!(address.as_str().starts_with(COREUM_HRP));
        assert_eq!(address.bytes(), vec![9u8; 20]);
        assert_eq!(CoreumAddress::new(address.as_str().to_owned()).unwrap(), address);
    }

    #[test]
    fn coreum_address_rejects_garbage() {
        assert!(CoreumAddress::new("not-bech32").is_err());
    }

    #[test]
    fn operation_wire_enforces_exactly_one_sequence() {
        let json = serde_json::json!({
            "ticket_sequence": 7,
            "account_sequence": null,
            "version": 1,
            "signatures": [],
            "xrpl_base_fee": 10,
            "operation_type": {"allocate_tickets": {"number": 5}}
        });
        let operation: Operation = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(operation, ticket_operation());

        let mut both = json.clone();
        both["account_sequence"] = 3.into();
        assert!(serde_json::from_value::<Operation>(both).is_err());

        let mut neither = json.clone();
        neither["ticket_sequence"] = serde_json::Value::Null;
        assert!(serde_json::from_value::<Operation>(neither).is_err());

        let mut zero = json;
        zero["ticket_sequence"] = 0.into();
        assert!(serde_json::from_value::<Operation>(zero).is_err());
    }

    #[test]
    fn amounts_ride_the_wire_as_strings() {
        let kind = OperationKind::CoreumToXrplTransfer {
            issuer: Address::from_account_id([1u8; 20]),
            currency: Currency::new("USD").unwrap(),
            amount: u128::MAX,
            max_amount: Some(u128::MAX),
            recipient: Address::from_account_id([2u8; 20]),
        };
        let json = serde_json::to_value(&kind).unwrap();
        assert_eq!(
            json["coreum_to_xrpl_transfer"]["amount"],
            u128::MAX.to_string()
        );
        let back: OperationKind = serde_json::from_value(json).unwrap();
        assert_eq!(back, kind);
    }

    #[test]
    fn kind_validation_flags_degenerate_shapes() {
        assert!(OperationKind::AllocateTickets { number: 0 }.validate().is_err());
        assert!(OperationKind::AllocateTickets { number: 1 }.validate().is_ok());
        assert!(OperationKind::RotateKeys {
            new_relayers: vec![],
            new_evidence_threshold: 2
        }
        .validate()
        .is_err());
    }

    #[test]
    fn result_evidence_wire_carries_split_sequences() {
        let evidence = Evidence::invalid_ticket_allocation(OperationId::AccountSequence(11));
        let json = serde_json::to_value(&evidence).unwrap();
        let body = &json["xrpl_transaction_result"];
        assert_eq!(body["account_sequence"], 11);
        assert_eq!(body["ticket_sequence"], serde_json::Value::Null);
        assert_eq!(body["transaction_result"], "invalid");
        let back: Evidence = serde_json::from_value(json).unwrap();
        assert_eq!(back, evidence);
    }
}
