//! Turning observed ledger transactions into contract evidence.
//!
//! Callers feed only *final* transactions in here; everything that cannot
//! be attested is skipped silently, and the one shape the bridge account
//! must never produce raises the malicious-behaviour marker.

use tracing::{debug, warn};

use xrpl_primitives::{bridge_recipient, Address, TransactionType, TransactionWithMetadata};

use crate::amount::convert_xrpl_to_coreum;
use crate::coreum::{
    CoreumAddress, Evidence, OperationId, OperationResult, TransactionResultEvidence,
    TransactionResultType,
};
use crate::metrics::MaliciousBehaviourRegistry;

/// Build the evidence record for a final bridge-account transaction, or
/// `None` when there is nothing to attest.
pub fn build_evidence(
    bridge_address: &Address,
    observed: &TransactionWithMetadata,
    malicious: &dyn MaliciousBehaviourRegistry,
) -> Option<Evidence> {
    if observed.tx.account == *bridge_address {
        outbound_evidence(observed, malicious)
    } else {
        inbound_evidence(observed)
    }
}

/// A payment into the bridge account becomes a transfer attestation, if it
/// carries a routable memo and a representable amount.
fn inbound_evidence(observed: &TransactionWithMetadata) -> Option<Evidence> {
    if observed.tx.transaction_type != TransactionType::Payment {
        return None;
    }
    let hash = observed.tx.hash.as_str();

    // The headline Amount may overstate a partial payment; only the
    // delivered amount in the metadata is authoritative.
    let delivered = match &observed.meta.delivered_amount {
        Some(delivered) => delivered,
        None => {
            debug!(hash, "payment without delivered amount, skipping");
            return None;
        }
    };

    let Some(recipient_bytes) = bridge_recipient(&observed.tx.memos) else {
        debug!(hash, "payment without bridge memo, skipping");
        return None;
    };
    let recipient = match CoreumAddress::from_bytes(&recipient_bytes) {
        Ok(recipient) => recipient,
        Err(err) => {
            debug!(hash, %err, "memo recipient does not encode an address, skipping");
            return None;
        }
    };

    let amount = match convert_xrpl_to_coreum(Some(delivered)) {
        Ok(amount) => amount,
        Err(err) => {
            // Out-of-range input is attacker-controlled; no error surface.
            debug!(hash, %err, "delivered amount out of range, skipping");
            return None;
        }
    };
    if amount == 0 {
        debug!(hash, "zero delivered amount, skipping");
        return None;
    }

    Some(Evidence::XrplToCoreumTransfer {
        tx_hash: hash.to_owned(),
        issuer: delivered.issuer.clone(),
        currency: delivered.currency.clone(),
        amount,
        recipient,
    })
}

/// A transaction sent *by* the bridge account is the outcome of a contract
/// operation (or a bootstrap step, which is skipped).
fn outbound_evidence(
    observed: &TransactionWithMetadata,
    malicious: &dyn MaliciousBehaviourRegistry,
) -> Option<Evidence> {
    let tx = &observed.tx;
    let transaction_result = if observed.meta.transaction_result.is_success() {
        TransactionResultType::Accepted
    } else {
        TransactionResultType::Rejected
    };

    let operation_result = match tx.transaction_type {
        TransactionType::TicketCreate => {
            let tickets = (transaction_result == TransactionResultType::Accepted)
                .then(|| observed.created_tickets());
            OperationResult::TicketsAllocation { tickets }
        }
        TransactionType::TrustSet => OperationResult::TrustSet,
        TransactionType::Payment => OperationResult::CoreumToXrplTransfer,
        TransactionType::SignerListSet => {
            if tx.signers.is_empty() {
                // Single-signed: the bootstrap rotation, not an operation.
                debug!(hash = %tx.hash, "bootstrap signer list set, skipping");
                return None;
            }
            OperationResult::KeysRotation
        }
        TransactionType::AccountSet => {
            debug!(hash = %tx.hash, "bootstrap account set, skipping");
            return None;
        }
        TransactionType::Other => {
            // The federation never signs anything else from this account.
            malicious.register(&tx.hash);
            return None;
        }
    };

    let operation_id = match tx.ticket_sequence {
        Some(ticket) if ticket > 0 => OperationId::TicketSequence(ticket),
        _ if tx.sequence > 0 => OperationId::AccountSequence(tx.sequence),
        _ => {
            warn!(hash = %tx.hash, "outbound transaction without ticket or sequence, skipping");
            return None;
        }
    };

    Some(Evidence::XrplTransactionResult(TransactionResultEvidence {
        tx_hash: Some(tx.hash.clone()),
        operation_id,
        transaction_result,
        operation_result,
    }))
}
