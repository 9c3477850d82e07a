//! The ingest pipeline: scan bridge-account transactions, attest them.
//!
//! Two cooperating tasks share a bounded channel. The scanner task streams
//! transactions from the ledger; the processor task classifies each final
//! transaction and files evidence with the contract, applying the error
//! taxonomy to the response. The channel bound is deliberately small so a
//! slow contract naturally throttles the scanner.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use xrpl_primitives::{Address, TransactionWithMetadata};

use crate::config::IngestConfig;
use crate::coreum::{ContractClient, ContractError};
use crate::error::RelayerError;
use crate::evidence::build_evidence;
use crate::metrics::MaliciousBehaviourRegistry;
use crate::processes::RunnableProcess;
use crate::xrpl::TransactionScanner;

pub struct IngestProcess<Contract, Scanner> {
    bridge_address: Address,
    contract: Arc<Contract>,
    scanner: Arc<Scanner>,
    malicious: Arc<dyn MaliciousBehaviourRegistry>,
    config: IngestConfig,
}

impl<Contract, Scanner> IngestProcess<Contract, Scanner>
where
    Contract: ContractClient,
    Scanner: TransactionScanner,
{
    pub fn new(
        bridge_address: Address,
        contract: Arc<Contract>,
        scanner: Arc<Scanner>,
        malicious: Arc<dyn MaliciousBehaviourRegistry>,
        config: IngestConfig,
    ) -> Self {
        Self {
            bridge_address,
            contract,
            scanner,
            malicious,
            config,
        }
    }

    async fn process_loop(
        &self,
        shutdown: &CancellationToken,
        receiver: &mut mpsc::Receiver<TransactionWithMetadata>,
    ) -> Result<(), RelayerError> {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => return Err(RelayerError::Cancelled),
                observed = receiver.recv() => match observed {
                    Some(observed) => self.process_transaction(&observed).await?,
                    None => return Err(RelayerError::Cancelled),
                },
            }
        }
    }

    /// Handle one scanned transaction: skip non-final results, build
    /// evidence, post it, classify the contract's answer.
    pub async fn process_transaction(
        &self,
        observed: &TransactionWithMetadata,
    ) -> Result<(), RelayerError> {
        let hash = observed.tx.hash.as_str();
        if !observed.meta.transaction_result.is_final() {
            debug!(
                hash,
                result = %observed.meta.transaction_result,
                "transaction not final yet, skipping"
            );
            return Ok(());
        }

        let Some(evidence) = build_evidence(&self.bridge_address, observed, self.malicious.as_ref())
        else {
            return Ok(());
        };

        match self.contract.save_evidence(&evidence).await {
            Ok(()) => {
                debug!(hash, "evidence saved");
                Ok(())
            }
            Err(err) if err.is_expected_evidence_submission() => {
                debug!(hash, %err, "evidence not accepted, nothing to do");
                Ok(())
            }
            Err(err) if err.is_asset_rules() => {
                info!(hash, %err, "evidence dropped by asset rules");
                Ok(())
            }
            Err(ContractError::TokenNotRegistered) => {
                debug!(hash, "token not registered, dropping evidence");
                Ok(())
            }
            Err(err) if err.is_evidence_attack_signal() => {
                self.malicious.register(hash);
                Err(err.into())
            }
            Err(err) => Err(err.into()),
        }
    }
}

#[async_trait]
impl<Contract, Scanner> RunnableProcess for IngestProcess<Contract, Scanner>
where
    Contract: ContractClient + 'static,
    Scanner: TransactionScanner + 'static,
{
    async fn run(self: Arc<Self>, shutdown: CancellationToken) -> Result<(), RelayerError> {
        let (sender, mut receiver) = mpsc::channel(self.config.channel_capacity.max(1));

        let scanner = Arc::clone(&self.scanner);
        let scan = async move {
            // Dropping `sender` on return closes the channel and with it
            // the processor task.
            scanner.scan(sender).await.map_err(RelayerError::from)
        };

        tokio::try_join!(scan, self.process_loop(&shutdown, &mut receiver)).map(|_| ())
    }
}
