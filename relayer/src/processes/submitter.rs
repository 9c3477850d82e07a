//! The sign-or-submit loop.
//!
//! Each cycle queries the contract's pending operations and, per operation,
//! either contributes this relayer's signature or, once the quorum of the
//! federation has signed, assembles the multi-signed transaction and
//! submits it to the ledger.
//!
//! Determinism is the load-bearing property here: every relayer observing
//! the same operation state must select the same subset of signatures, in
//! the same order, so the submitted transactions are byte-identical across
//! the federation and consume identical fees. The assembly loop therefore
//! iterates signatures exactly in operation order and short-circuits the
//! moment the quorum weight is reached; signer sets are rebuilt every cycle
//! so key rotations take effect immediately.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use xrpl_primitives::{
    Address, PublicKeyHex, SignedTransaction, Signer, SignerEntry, TxSequenceRef,
    UnsignedTransaction, UnsignedTxKind, TEF_NO_TICKET, TEF_PAST_SEQ, TEL_INSUF_FEE_P,
    TF_SET_NO_RIPPLE,
};

use crate::amount::convert_coreum_to_xrpl;
use crate::config::SubmitterConfig;
use crate::coreum::{
    BridgeConfig, ContractClient, CoreumAddress, Evidence, Operation, OperationId, OperationKind,
};
use crate::error::RelayerError;
use crate::metrics::MaliciousBehaviourRegistry;
use crate::processes::RunnableProcess;
use crate::xrpl::{LedgerRpc, TransactionSigner};

/// The ledger allows at most this many entries on a signer list. The
/// multi-signing fee is provisioned for the worst case so the fee field of
/// a template never depends on how many signatures end up attached.
pub const MAX_SIGNER_ENTRIES: u64 = 32;

pub fn multi_sign_fee(xrpl_base_fee: u64) -> u64 {
    xrpl_base_fee * (MAX_SIGNER_ENTRIES + 1)
}

/// The signer view for one cycle, derived from the on-ledger signer list
/// and the contract relayer registry. Never cached across cycles.
#[derive(Debug, Clone)]
pub struct SignerSet {
    pub weights: BTreeMap<Address, u16>,
    pub pubkeys: BTreeMap<Address, PublicKeyHex>,
    pub ledger_account_by_coreum: BTreeMap<CoreumAddress, Address>,
    pub quorum: u32,
}

/// Load the signer set for the bridge account.
///
/// The bridge account must carry exactly one signer list; registry entries
/// that fail to parse are a configuration fault and abort the cycle.
pub async fn load_signer_set<Ledger: LedgerRpc + ?Sized>(
    ledger: &Ledger,
    config: &BridgeConfig,
) -> Result<SignerSet, RelayerError> {
    let info = ledger.account_info(&config.bridge_xrpl_address).await?;
    let lists = &info.account_data.signer_lists;
    if lists.len() != 1 {
        return Err(RelayerError::SignerListCount(lists.len()));
    }
    let list = &lists[0];

    let mut weights = BTreeMap::new();
    for entry in &list.signer_entries {
        weights.insert(entry.account.clone(), entry.signer_weight);
    }

    let mut pubkeys = BTreeMap::new();
    let mut ledger_account_by_coreum = BTreeMap::new();
    for relayer in &config.relayers {
        let account = Address::checked(relayer.xrpl_address.clone()).map_err(|err| {
            RelayerError::SignerRegistry(format!(
                "relayer {} has unparseable ledger address: {err}",
                relayer.coreum_address
            ))
        })?;
        let key_bytes = hex::decode(&relayer.xrpl_pub_key).map_err(|err| {
            RelayerError::SignerRegistry(format!(
                "relayer {} has unparseable public key: {err}",
                relayer.coreum_address
            ))
        })?;
        if key_bytes.is_empty() {
            return Err(RelayerError::SignerRegistry(format!(
                "relayer {} has an empty public key",
                relayer.coreum_address
            )));
        }
        pubkeys.insert(account.clone(), relayer.xrpl_pub_key.clone());
        ledger_account_by_coreum.insert(relayer.coreum_address.clone(), account);
    }

    Ok(SignerSet {
        weights,
        pubkeys,
        ledger_account_by_coreum,
        quorum: list.signer_quorum,
    })
}

/// Build the unsigned template for an operation.
///
/// Deterministic by construction: the operation and the bridge address are
/// the only inputs.
pub fn build_transaction(
    bridge_address: &Address,
    operation: &Operation,
) -> Result<UnsignedTransaction, RelayerError> {
    let sequence_ref = match operation.id {
        OperationId::AccountSequence(sequence) => TxSequenceRef::Account(sequence),
        OperationId::TicketSequence(ticket) => TxSequenceRef::Ticket(ticket),
    };

    let kind = match &operation.kind {
        OperationKind::AllocateTickets { number } => UnsignedTxKind::TicketCreate {
            ticket_count: *number,
        },
        OperationKind::TrustSet {
            issuer,
            currency,
            trust_set_limit_amount,
        } => UnsignedTxKind::TrustSet {
            limit_amount: convert_coreum_to_xrpl(*trust_set_limit_amount, issuer, currency),
            flags: TF_SET_NO_RIPPLE,
        },
        OperationKind::CoreumToXrplTransfer {
            issuer,
            currency,
            amount,
            max_amount,
            recipient,
        } => UnsignedTxKind::Payment {
            destination: recipient.clone(),
            amount: convert_coreum_to_xrpl(*amount, issuer, currency),
            // Passed through untouched; computing it is the contract's job.
            send_max: max_amount.map(|max| convert_coreum_to_xrpl(max, issuer, currency)),
        },
        OperationKind::RotateKeys {
            new_relayers,
            new_evidence_threshold,
        } => {
            let signer_entries = new_relayers
                .iter()
                .map(|relayer| {
                    Ok(SignerEntry {
                        account: Address::checked(relayer.xrpl_address.clone()).map_err(|err| {
                            RelayerError::SignerRegistry(format!(
                                "rotation target {} has unparseable ledger address: {err}",
                                relayer.coreum_address
                            ))
                        })?,
                        signer_weight: 1,
                    })
                })
                .collect::<Result<Vec<_>, RelayerError>>()?;
            UnsignedTxKind::SignerListSet {
                signer_quorum: *new_evidence_threshold,
                signer_entries,
            }
        }
    };

    Ok(UnsignedTransaction {
        account: bridge_address.clone(),
        fee: multi_sign_fee(operation.xrpl_base_fee),
        sequence_ref,
        kind,
    })
}

pub struct SignOrSubmitProcess<Contract, Ledger, Signing> {
    contract: Arc<Contract>,
    ledger: Arc<Ledger>,
    signer: Arc<Signing>,
    /// This relayer's home-chain address, as registered with the contract.
    relayer_address: CoreumAddress,
    malicious: Arc<dyn MaliciousBehaviourRegistry>,
    config: SubmitterConfig,
}

impl<Contract, Ledger, Signing> SignOrSubmitProcess<Contract, Ledger, Signing>
where
    Contract: ContractClient,
    Ledger: LedgerRpc,
    Signing: TransactionSigner,
{
    pub fn new(
        contract: Arc<Contract>,
        ledger: Arc<Ledger>,
        signer: Arc<Signing>,
        relayer_address: CoreumAddress,
        malicious: Arc<dyn MaliciousBehaviourRegistry>,
        config: SubmitterConfig,
    ) -> Self {
        Self {
            contract,
            ledger,
            signer,
            relayer_address,
            malicious,
            config,
        }
    }

    /// One full cycle over the contract's pending operations.
    pub async fn run_cycle(&self) -> Result<(), RelayerError> {
        let operations = self.contract.pending_operations().await?;
        if operations.is_empty() {
            return Ok(());
        }
        let config = self.contract.config().await?;
        let signer_set = load_signer_set(self.ledger.as_ref(), &config).await?;
        for operation in operations {
            self.sign_or_submit(&operation, &config, &signer_set).await?;
        }
        Ok(())
    }

    async fn sign_or_submit(
        &self,
        operation: &Operation,
        config: &BridgeConfig,
        signer_set: &SignerSet,
    ) -> Result<(), RelayerError> {
        operation.kind.validate().map_err(RelayerError::MalformedOperation)?;

        if !self.pre_validate(operation, config).await? {
            return Ok(());
        }

        match self.assemble(operation, config, signer_set)? {
            Some(signed) => self.submit(operation, signed).await,
            None => self.register_signature(operation, config).await,
        }
    }

    /// Returns false when the operation can no longer produce a ledger
    /// transaction; Invalid result evidence is filed so the contract can
    /// cancel it.
    async fn pre_validate(
        &self,
        operation: &Operation,
        config: &BridgeConfig,
    ) -> Result<bool, RelayerError> {
        // Once our signature is on the operation the vote is committed;
        // never flip it on later contract state drift.
        let already_signed = operation
            .signatures
            .iter()
            .any(|signature| signature.relayer_coreum_address == self.relayer_address);
        if already_signed {
            return Ok(true);
        }

        if let (OperationKind::AllocateTickets { .. }, OperationId::AccountSequence(sequence)) =
            (&operation.kind, operation.id)
        {
            let info = self.ledger.account_info(&config.bridge_xrpl_address).await?;
            if info.account_data.sequence != sequence {
                info!(
                    operation = %operation.id,
                    ledger_sequence = info.account_data.sequence,
                    "ticket allocation is stale, filing invalid result"
                );
                let evidence = Evidence::invalid_ticket_allocation(operation.id);
                match self.contract.save_evidence(&evidence).await {
                    Ok(()) => {}
                    Err(err) if err.is_expected_evidence_submission() => {
                        debug!(operation = %operation.id, %err, "invalid result already handled");
                    }
                    Err(err) => return Err(err.into()),
                }
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Walk the operation's signatures in order, verify each against a
    /// fresh template, stop at quorum. Returns `None` when the collected
    /// weight falls short, in which case the caller signs locally instead.
    fn assemble(
        &self,
        operation: &Operation,
        config: &BridgeConfig,
        signer_set: &SignerSet,
    ) -> Result<Option<SignedTransaction>, RelayerError> {
        let mut collected: Vec<Signer> = Vec::new();
        let mut signed_weight: u32 = 0;

        for partial in &operation.signatures {
            if signed_weight >= signer_set.quorum {
                break;
            }
            let relayer = &partial.relayer_coreum_address;
            let Some(account) = signer_set.ledger_account_by_coreum.get(relayer) else {
                warn!(operation = %operation.id, %relayer, "signature from unknown relayer, skipping");
                continue;
            };
            let (Some(pubkey), Some(weight)) = (
                signer_set.pubkeys.get(account),
                signer_set.weights.get(account),
            ) else {
                warn!(
                    operation = %operation.id,
                    %relayer,
                    account = %account,
                    "relayer not on the ledger signer list, skipping"
                );
                continue;
            };

            let flagged = |reason: &str| {
                self.malicious.register(&format!(
                    "invalid_signature_for_operation_{}_relayer_{}",
                    operation.id, relayer
                ));
                debug!(operation = %operation.id, %relayer, reason, "discarding signature");
            };

            if partial.signature.is_empty() || hex::decode(&partial.signature).is_err() {
                flagged("malformed blob");
                continue;
            }

            let candidate = Signer {
                account: account.clone(),
                txn_signature: partial.signature.clone(),
                signing_pub_key: pubkey.clone(),
            };
            let probe = build_transaction(&config.bridge_xrpl_address, operation)?;
            if !self.signer.verify(&probe, &candidate) {
                flagged("verification failed");
                continue;
            }

            collected.push(candidate);
            signed_weight += u32::from(*weight);
        }

        if signed_weight < signer_set.quorum {
            return Ok(None);
        }

        // Attaching signers consumes the signing-ready template, so the
        // submittable transaction is rebuilt from scratch.
        let template = build_transaction(&config.bridge_xrpl_address, operation)?;
        Ok(Some(template.into_multisigned(collected)))
    }

    async fn submit(
        &self,
        operation: &Operation,
        signed: SignedTransaction,
    ) -> Result<(), RelayerError> {
        let result = self.ledger.submit(&signed).await?;
        let code = &result.engine_result;

        if code.is_success() {
            info!(operation = %operation.id, "transaction submitted");
            return Ok(());
        }
        match code.code() {
            TEF_NO_TICKET | TEF_PAST_SEQ => {
                debug!(operation = %operation.id, %code, "already submitted by another relayer");
                Ok(())
            }
            TEL_INSUF_FEE_P => {
                warn!(operation = %operation.id, %code, "fee too low, retrying next cycle");
                Ok(())
            }
            _ if code.class() == xrpl_primitives::ResultClass::ClaimedCostOnly => {
                // Applied but will revert; the ingest pipeline attests it.
                info!(operation = %operation.id, %code, "transaction accepted and will revert");
                Ok(())
            }
            _ => Err(RelayerError::SubmissionFailure(code.code().to_owned())),
        }
    }

    async fn register_signature(
        &self,
        operation: &Operation,
        config: &BridgeConfig,
    ) -> Result<(), RelayerError> {
        let template = build_transaction(&config.bridge_xrpl_address, operation)?;
        let signer = self.signer.sign(&template)?;
        match self
            .contract
            .save_signature(operation.id, operation.version, &signer.txn_signature)
            .await
        {
            Ok(()) => {
                debug!(operation = %operation.id, "signature registered");
                Ok(())
            }
            Err(err) if err.is_expected_signature_registration() => {
                // The operation changed shape or was cancelled between the
                // query and the post.
                debug!(operation = %operation.id, %err, "signature not registered");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }
}

#[async_trait]
impl<Contract, Ledger, Signing> RunnableProcess for SignOrSubmitProcess<Contract, Ledger, Signing>
where
    Contract: ContractClient + 'static,
    Ledger: LedgerRpc + 'static,
    Signing: TransactionSigner + 'static,
{
    async fn run(self: Arc<Self>, shutdown: CancellationToken) -> Result<(), RelayerError> {
        loop {
            self.run_cycle().await?;
            if !self.config.repeat {
                return Ok(());
            }
            tokio::select! {
                _ = shutdown.cancelled() => return Err(RelayerError::Cancelled),
                _ = tokio::time::sleep(self.config.poll_interval()) => {}
            }
        }
    }
}
