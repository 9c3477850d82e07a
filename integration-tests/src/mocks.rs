//! In-memory stand-ins for the contract, the ledger and the scanner.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use coreumbridge_xrpl_relayer::coreum::{
    BridgeConfig, Coin, ContractClient, ContractError, CoreumAddress, CoreumToken, Evidence,
    Operation, OperationId, OperationSignature, PendingRefund, XrplToken,
};
use coreumbridge_xrpl_relayer::xrpl::{LedgerError, LedgerRpc, TransactionScanner};
use xrpl_primitives::{
    AccountInfo, Address, SignedTransaction, SubmitResult, TransactionResult,
    TransactionWithMetadata,
};

#[derive(Default)]
struct BridgeState {
    config: Option<BridgeConfig>,
    operations: Vec<Operation>,
    evidence: Vec<(CoreumAddress, Evidence)>,
    sends: Vec<(Address, Coin, Option<u128>)>,
    evidence_errors: VecDeque<ContractError>,
    signature_errors: VecDeque<ContractError>,
    xrpl_tokens: Vec<XrplToken>,
    coreum_tokens: Vec<CoreumToken>,
    available_tickets: Vec<u32>,
    refunds: Vec<(CoreumAddress, PendingRefund)>,
}

/// The shared bridge contract. Each relayer talks to it through its own
/// [`MockContractClient`] handle carrying that relayer's identity.
pub struct MockBridge {
    state: Arc<Mutex<BridgeState>>,
}

impl MockBridge {
    pub fn new(config: BridgeConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(BridgeState {
                config: Some(config),
                ..BridgeState::default()
            })),
        }
    }

    pub fn client(&self, caller: CoreumAddress) -> MockContractClient {
        MockContractClient {
            state: Arc::clone(&self.state),
            caller,
        }
    }

    pub fn push_operation(&self, operation: Operation) {
        self.lock().operations.push(operation);
    }

    pub fn operations(&self) -> Vec<Operation> {
        self.lock().operations.clone()
    }

    pub fn accepted_evidence(&self) -> Vec<(CoreumAddress, Evidence)> {
        self.lock().evidence.clone()
    }

    pub fn register_tokens(&self, xrpl: Vec<XrplToken>, coreum: Vec<CoreumToken>) {
        let mut state = self.lock();
        state.xrpl_tokens = xrpl;
        state.coreum_tokens = coreum;
    }

    pub fn set_available_tickets(&self, tickets: Vec<u32>) {
        self.lock().available_tickets = tickets;
    }

    pub fn add_refund(&self, owner: CoreumAddress, refund: PendingRefund) {
        self.lock().refunds.push((owner, refund));
    }

    /// What an attacker with a captured relayer key could do: append an
    /// arbitrary signature entry directly to an operation.
    pub fn append_raw_signature(&self, operation_id: OperationId, signature: OperationSignature) {
        let mut state = self.lock();
        let operation = state
            .operations
            .iter_mut()
            .find(|operation| operation.id == operation_id)
            .expect("operation exists");
        operation.signatures.push(signature);
    }

    /// Fail the next `save_evidence` call with `err`.
    pub fn script_evidence_error(&self, err: ContractError) {
        self.lock().evidence_errors.push_back(err);
    }

    /// Fail the next `save_signature` call with `err`.
    pub fn script_signature_error(&self, err: ContractError) {
        self.lock().signature_errors.push_back(err);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BridgeState> {
        self.state.lock().expect("bridge state lock")
    }
}

pub struct MockContractClient {
    state: Arc<Mutex<BridgeState>>,
    caller: CoreumAddress,
}

impl MockContractClient {
    fn lock(&self) -> std::sync::MutexGuard<'_, BridgeState> {
        self.state.lock().expect("bridge state lock")
    }
}

#[async_trait]
impl ContractClient for MockContractClient {
    async fn config(&self) -> Result<BridgeConfig, ContractError> {
        self.lock()
            .config
            .clone()
            .ok_or_else(|| ContractError::Query("no config".to_owned()))
    }

    async fn pending_operations(&self) -> Result<Vec<Operation>, ContractError> {
        Ok(self.lock().operations.clone())
    }

    async fn xrpl_tokens(
        &self,
        offset: Option<u64>,
        limit: Option<u32>,
    ) -> Result<Vec<XrplToken>, ContractError> {
        Ok(paginate(&self.lock().xrpl_tokens, offset, limit))
    }

    async fn coreum_tokens(
        &self,
        offset: Option<u64>,
        limit: Option<u32>,
    ) -> Result<Vec<CoreumToken>, ContractError> {
        Ok(paginate(&self.lock().coreum_tokens, offset, limit))
    }

    async fn available_tickets(&self) -> Result<Vec<u32>, ContractError> {
        Ok(self.lock().available_tickets.clone())
    }

    async fn pending_refunds(
        &self,
        address: &CoreumAddress,
    ) -> Result<Vec<PendingRefund>, ContractError> {
        Ok(self
            .lock()
            .refunds
            .iter()
            .filter(|(owner, _)| owner == address)
            .map(|(_, refund)| refund.clone())
            .collect())
    }

    async fn save_evidence(&self, evidence: &Evidence) -> Result<(), ContractError> {
        let mut state = self.lock();
        if let Some(err) = state.evidence_errors.pop_front() {
            return Err(err);
        }
        let duplicate = state
            .evidence
            .iter()
            .any(|(caller, existing)| caller == &self.caller && existing == evidence);
        if duplicate {
            return Err(ContractError::EvidenceAlreadyProvided);
        }
        state.evidence.push((self.caller.clone(), evidence.clone()));
        Ok(())
    }

    async fn save_signature(
        &self,
        operation_id: OperationId,
        operation_version: u64,
        signature: &str,
    ) -> Result<(), ContractError> {
        let mut state = self.lock();
        if let Some(err) = state.signature_errors.pop_front() {
            return Err(err);
        }
        let operation = state
            .operations
            .iter_mut()
            .find(|operation| operation.id == operation_id)
            .ok_or(ContractError::PendingOperationNotFound)?;
        if operation.version != operation_version {
            return Err(ContractError::OperationVersionMismatch);
        }
        let already = operation
            .signatures
            .iter()
            .any(|existing| existing.relayer_coreum_address == self.caller);
        if already {
            return Err(ContractError::SignatureAlreadyProvided);
        }
        operation.signatures.push(OperationSignature {
            relayer_coreum_address: self.caller.clone(),
            signature: signature.to_owned(),
        });
        Ok(())
    }

    async fn send_to_xrpl(
        &self,
        recipient: &Address,
        coin: &Coin,
        deliver_amount: Option<u128>,
    ) -> Result<(), ContractError> {
        self.lock()
            .sends
            .push((recipient.clone(), coin.clone(), deliver_amount));
        Ok(())
    }
}

fn paginate<T: Clone>(items: &[T], offset: Option<u64>, limit: Option<u32>) -> Vec<T> {
    let offset = offset.unwrap_or(0) as usize;
    let limit = limit.map(|limit| limit as usize).unwrap_or(usize::MAX);
    items.iter().skip(offset).take(limit).cloned().collect()
}

struct LedgerState {
    bridge_info: AccountInfo,
    submissions: Vec<SignedTransaction>,
    submit_results: VecDeque<TransactionResult>,
}

/// A ledger answering `account_info` for the bridge account and recording
/// every submission. Submission results default to `tesSUCCESS` unless
/// scripted otherwise.
pub struct MockLedger {
    state: Mutex<LedgerState>,
}

impl MockLedger {
    pub fn new(bridge_info: AccountInfo) -> Self {
        Self {
            state: Mutex::new(LedgerState {
                bridge_info,
                submissions: Vec::new(),
                submit_results: VecDeque::new(),
            }),
        }
    }

    pub fn set_bridge_sequence(&self, sequence: u32) {
        self.lock().bridge_info.account_data.sequence = sequence;
    }

    pub fn submissions(&self) -> Vec<SignedTransaction> {
        self.lock().submissions.clone()
    }

    pub fn script_submit_result(&self, code: &str) {
        self.lock()
            .submit_results
            .push_back(TransactionResult::new(code));
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LedgerState> {
        self.state.lock().expect("ledger state lock")
    }
}

#[async_trait]
impl LedgerRpc for MockLedger {
    async fn account_info(&self, account: &Address) -> Result<AccountInfo, LedgerError> {
        let state = self.lock();
        if *account != state.bridge_info.account_data.account {
            return Err(LedgerError::Rpc(format!("unknown account {account}")));
        }
        Ok(state.bridge_info.clone())
    }

    async fn submit(&self, tx: &SignedTransaction) -> Result<SubmitResult, LedgerError> {
        let mut state = self.lock();
        state.submissions.push(tx.clone());
        let engine_result = state
            .submit_results
            .pop_front()
            .unwrap_or_else(|| TransactionResult::new("tesSUCCESS"));
        Ok(SubmitResult { engine_result })
    }
}

/// Delivers a fixed script of transactions in order, then ends the stream.
pub struct ScriptedScanner {
    transactions: Vec<TransactionWithMetadata>,
}

impl ScriptedScanner {
    pub fn new(transactions: Vec<TransactionWithMetadata>) -> Self {
        Self { transactions }
    }
}

#[async_trait]
impl TransactionScanner for ScriptedScanner {
    async fn scan(&self, out: mpsc::Sender<TransactionWithMetadata>) -> Result<(), LedgerError> {
        for observed in &self.transactions {
            if out.send(observed.clone()).await.is_err() {
                // Receiver went away; nothing left to deliver.
                return Ok(());
            }
        }
        Ok(())
    }
}
