//! Contract error taxonomy.
//!
//! Independent relayers race each other constantly: whoever is first to
//! file evidence or a signature wins and everyone else gets a rejection.
//! Those rejections are part of normal operation and must never kill a
//! process. A second family of rejections reflects asset-layer state on
//! the home chain (freezes, whitelists) and simply means the evidence is
//! dropped. A third family can only appear if someone is feeding the
//! contract inconsistent data, and is flagged before being propagated.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContractError {
    // Quiescent races and re-submissions.
    #[error("evidence already provided")]
    EvidenceAlreadyProvided,
    #[error("operation already executed")]
    OperationAlreadyExecuted,
    #[error("maximum bridged amount reached")]
    MaximumBridgedAmountReached,
    #[error("token not enabled")]
    TokenNotEnabled,
    #[error("prohibited address")]
    ProhibitedAddress,
    #[error("bridge halted")]
    BridgeHalted,
    #[error("amount is zero after truncation")]
    AmountSentIsZeroAfterTruncation,
    #[error("amount cannot cover bridging fees")]
    CannotCoverBridgingFees,
    #[error("wrong sequence")]
    WrongSequence,

    // Asset-layer state on the home chain.
    #[error("token is frozen for the account")]
    AssetFTFreezing,
    #[error("token is globally frozen")]
    AssetFTGlobalFreezing,
    #[error("whitelisted limit exceeded")]
    AssetFTWhitelistedLimitExceeded,
    #[error("recipient is blocked")]
    RecipientBlocked,

    // Token registry.
    #[error("token not registered")]
    TokenNotRegistered,

    // Signature registration races.
    #[error("signature already provided")]
    SignatureAlreadyProvided,
    #[error("operation version mismatch")]
    OperationVersionMismatch,

    // Either a benign race (signature registration) or an attack signal
    // (evidence paths); classified by the caller's context.
    #[error("pending operation not found")]
    PendingOperationNotFound,

    // Evidence the contract cannot reconcile with its own state.
    #[error("invalid operation result")]
    InvalidOperationResult,
    #[error("invalid transaction result evidence")]
    InvalidTransactionResultEvidence,
    #[error("invalid successful transaction result evidence")]
    InvalidSuccessfulTransactionResultEvidence,
    #[error("invalid failed transaction result evidence")]
    InvalidFailedTransactionResultEvidence,
    #[error("invalid ticket allocation evidence")]
    InvalidTicketAllocationEvidence,

    // Transport and everything else.
    #[error("contract query failed: {0}")]
    Query(String),
    #[error("contract execution failed: {0}")]
    Execution(String),
}

impl ContractError {
    /// Evidence re-submissions and quiescent races: swallow, log at debug.
    pub fn is_expected_evidence_submission(&self) -> bool {
        matches!(
            self,
            Self::EvidenceAlreadyProvided
                | Self::OperationAlreadyExecuted
                | Self::MaximumBridgedAmountReached
                | Self::TokenNotEnabled
                | Self::ProhibitedAddress
                | Self::BridgeHalted
                | Self::AmountSentIsZeroAfterTruncation
                | Self::CannotCoverBridgingFees
                | Self::WrongSequence
        )
    }

    /// Asset-layer rejections: drop the evidence, log at info.
    pub fn is_asset_rules(&self) -> bool {
        matches!(
            self,
            Self::AssetFTFreezing
                | Self::AssetFTGlobalFreezing
                | Self::AssetFTWhitelistedLimitExceeded
                | Self::RecipientBlocked
        )
    }

    /// Races on `save_signature`: the operation changed shape or was
    /// cancelled between the query and the post.
    pub fn is_expected_signature_registration(&self) -> bool {
        matches!(
            self,
            Self::SignatureAlreadyProvided
                | Self::PendingOperationNotFound
                | Self::OperationVersionMismatch
                | Self::BridgeHalted
        )
    }

    /// Rejections of evidence the contract cannot reconcile: flag the
    /// malicious-behaviour metric, then propagate.
    pub fn is_evidence_attack_signal(&self) -> bool {
        matches!(
            self,
            Self::PendingOperationNotFound
                | Self::InvalidOperationResult
                | Self::InvalidTransactionResultEvidence
                | Self::InvalidSuccessfulTransactionResultEvidence
                | Self::InvalidFailedTransactionResultEvidence
                | Self::InvalidTicketAllocationEvidence
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classes_are_disjoint_where_it_matters() {
        let all = [
            ContractError::EvidenceAlreadyProvided,
            ContractError::OperationAlreadyExecuted,
            ContractError::MaximumBridgedAmountReached,
            ContractError::TokenNotEnabled,
            ContractError::ProhibitedAddress,
            ContractError::BridgeHalted,
            ContractError::AmountSentIsZeroAfterTruncation,
            ContractError::CannotCoverBridgingFees,
            ContractError::WrongSequence,
            ContractError::AssetFTFreezing,
            ContractError::AssetFTGlobalFreezing,
            ContractError::AssetFTWhitelistedLimitExceeded,
            ContractError::RecipientBlocked,
            ContractError::TokenNotRegistered,
            ContractError::SignatureAlreadyProvided,
            ContractError::OperationVersionMismatch,
            ContractError::PendingOperationNotFound,
            ContractError::InvalidOperationResult,
            ContractError::InvalidTransactionResultEvidence,
            ContractError::InvalidSuccessfulTransactionResultEvidence,
            ContractError::InvalidFailedTransactionResultEvidence,
            ContractError::InvalidTicketAllocationEvidence,
            ContractError::Query("q".into()),
            ContractError::Execution("e".into()),
        ];
        for err in &all {
            // Evidence-expected and attack-signal classes never overlap.
            assert!(
                !(err.is_expected_evidence_submission() && err.is_evidence_attack_signal()),
                "{err:?} is in two evidence classes"
            );
            // Asset rules are their own class.
            assert!(
                !(err.is_asset_rules() && err.is_expected_evidence_submission()),
                "{err:?} is in two classes"
            );
        }
        // PendingOperationNotFound is deliberately dual: benign on
        // signature registration, hostile on evidence submission.
        let dual = ContractError::PendingOperationNotFound;
        assert!(dual.is_expected_signature_registration());
        assert!(dual.is_evidence_attack_signal());
    }
}
