use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::system_program;
use spl_token::instruction::TokenInstruction;
use tokio::sync::{oneshot, watch};
use token_minter_core::constants::MINT_SIZE;
use token_minter_core::{
    derive_associated_address, AccountPolicy, CacheSink, MintError, MintToRequest, MintWorkflow,
    Notifier, PendingTransaction, QueryCache, QueryKey, RentOracle, SubmitError, TokenProgram,
    TransactionSigner, Wallet, WorkflowConfig, WorkflowState,
};

const ENDPOINT: &str = "http://127.0.0.1:8899";
const RENT: u64 = 1_461_600;

struct Submitted {
    payer: Pubkey,
    instructions: Vec<Instruction>,
    extra_signers: Vec<Pubkey>,
}

struct FakeSigner {
    identity: Pubkey,
    reject_with: Option<SubmitError>,
    submissions: Mutex<Vec<Submitted>>,
}

impl FakeSigner {
    fn new(reject_with: Option<SubmitError>) -> Arc<Self> {
        Arc::new(Self {
            identity: Pubkey::new_unique(),
            reject_with,
            submissions: Mutex::new(Vec::new()),
        })
    }

    fn submission_count(&self) -> usize {
        self.submissions.lock().unwrap().len()
    }
}

#[async_trait]
impl TransactionSigner for FakeSigner {
    fn identity(&self) -> Pubkey {
        self.identity
    }

    async fn submit(&self, transaction: PendingTransaction) -> Result<Signature, SubmitError> {
        self.submissions.lock().unwrap().push(Submitted {
            payer: *transaction.payer(),
            instructions: transaction.instructions().to_vec(),
            extra_signers: transaction.extra_signers(),
        });
        match &self.reject_with {
            Some(err) => Err(err.clone()),
            None => Ok(Signature::new_unique()),
        }
    }
}

#[derive(Default)]
struct CountingRent {
    calls: AtomicUsize,
}

#[async_trait]
impl RentOracle for CountingRent {
    async fn minimum_balance_for_size(&self, size: usize) -> Result<u64, SubmitError> {
        assert_eq!(size, MINT_SIZE);
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(RENT)
    }
}

#[derive(Default)]
struct RecordingCache {
    inner: QueryCache,
    calls: Mutex<Vec<Vec<QueryKey>>>,
}

impl CacheSink for RecordingCache {
    fn invalidate(&self, keys: &[QueryKey]) {
        self.calls.lock().unwrap().push(keys.to_vec());
        self.inner.invalidate(keys);
    }
}

#[derive(Default)]
struct RecordingNotifier {
    confirmed: Mutex<Vec<Signature>>,
    failed: Mutex<Vec<String>>,
}

impl Notifier for RecordingNotifier {
    fn transaction_confirmed(&self, signature: &Signature) {
        self.confirmed.lock().unwrap().push(*signature);
    }

    fn transaction_failed(&self, error: &MintError) {
        self.failed.lock().unwrap().push(error.to_string());
    }
}

/// Holds every call until the test releases it.
struct Gate(Mutex<Option<oneshot::Receiver<()>>>);

impl Gate {
    fn new() -> (oneshot::Sender<()>, Self) {
        let (release, held) = oneshot::channel();
        (release, Self(Mutex::new(Some(held))))
    }

    async fn pass(&self) {
        let held = self.0.lock().unwrap().take();
        if let Some(held) = held {
            let _ = held.await;
        }
    }
}

struct GatedRent(Gate);

#[async_trait]
impl RentOracle for GatedRent {
    async fn minimum_balance_for_size(&self, _size: usize) -> Result<u64, SubmitError> {
        self.0.pass().await;
        Ok(RENT)
    }
}

struct GatedSigner {
    identity: Pubkey,
    gate: Gate,
}

#[async_trait]
impl TransactionSigner for GatedSigner {
    fn identity(&self) -> Pubkey {
        self.identity
    }

    async fn submit(&self, _transaction: PendingTransaction) -> Result<Signature, SubmitError> {
        self.gate.pass().await;
        Ok(Signature::new_unique())
    }
}

struct FailingRent;

#[async_trait]
impl RentOracle for FailingRent {
    async fn minimum_balance_for_size(&self, _size: usize) -> Result<u64, SubmitError> {
        Err(SubmitError::Network("rent unavailable".into()))
    }
}

/// Records the workflow state current at each invalidation.
#[derive(Default)]
struct StateAtInvalidation {
    states: Mutex<Option<watch::Receiver<WorkflowState>>>,
    seen: Mutex<Vec<WorkflowState>>,
}

impl CacheSink for StateAtInvalidation {
    fn invalidate(&self, _keys: &[QueryKey]) {
        let state = self
            .states
            .lock()
            .unwrap()
            .as_ref()
            .map(|states| states.borrow().clone());
        self.seen.lock().unwrap().extend(state);
    }
}

struct Harness {
    signer: Arc<FakeSigner>,
    rent: Arc<CountingRent>,
    cache: Arc<RecordingCache>,
    notifier: Arc<RecordingNotifier>,
    workflow: MintWorkflow,
}

fn harness(reject_with: Option<SubmitError>, account_policy: AccountPolicy) -> Harness {
    let signer = FakeSigner::new(reject_with);
    let rent = Arc::new(CountingRent::default());
    let cache = Arc::new(RecordingCache::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let wallet = Wallet::connect(signer.clone()).into_connected().unwrap();
    let config = WorkflowConfig {
        account_policy,
        ..WorkflowConfig::new(ENDPOINT)
    };
    let workflow = MintWorkflow::new(
        wallet,
        rent.clone(),
        cache.clone(),
        notifier.clone(),
        config,
    );
    Harness {
        signer,
        rent,
        cache,
        notifier,
        workflow,
    }
}

#[tokio::test]
async fn create_mint_bundles_creation_and_invalidates_owner_queries() {
    let h = harness(None, AccountPolicy::Defer);
    let owner = h.signer.identity;

    let outcome = h.workflow.create_mint().await.unwrap();

    let submissions = h.signer.submissions.lock().unwrap();
    assert_eq!(submissions.len(), 1);
    let submitted = &submissions[0];
    assert_eq!(submitted.payer, owner);
    assert_eq!(submitted.instructions.len(), 2);
    assert_eq!(submitted.instructions[0].program_id, system_program::id());
    assert_eq!(submitted.extra_signers, vec![outcome.mint]);
    match TokenInstruction::unpack(&submitted.instructions[1].data).unwrap() {
        TokenInstruction::InitializeMint {
            decimals,
            mint_authority,
            ..
        } => {
            assert_eq!(decimals, 0);
            assert_eq!(mint_authority, owner);
        }
        other => panic!("unexpected instruction: {:?}", other),
    }

    assert_eq!(outcome.associated_account, None);
    assert_eq!(
        outcome.invalidated,
        vec![
            QueryKey::balance(ENDPOINT, &owner),
            QueryKey::signatures(ENDPOINT, &owner),
        ]
    );
    assert_eq!(h.cache.calls.lock().unwrap().len(), 1);
    assert_eq!(h.cache.inner.epoch(&QueryKey::balance(ENDPOINT, &owner)), 1);
    assert_eq!(*h.notifier.confirmed.lock().unwrap(), vec![outcome.signature]);
    assert_eq!(h.workflow.state(), WorkflowState::Confirmed(outcome.signature));
}

#[tokio::test]
async fn bundled_policy_provisions_owner_account() {
    let h = harness(None, AccountPolicy::Bundle);
    let owner = h.signer.identity;

    let outcome = h.workflow.create_mint().await.unwrap();

    let expected_ata = derive_associated_address(&owner, &outcome.mint, TokenProgram::Legacy);
    assert_eq!(outcome.associated_account, Some(expected_ata));
    assert_eq!(h.signer.submissions.lock().unwrap()[0].instructions.len(), 3);
    assert!(outcome
        .invalidated
        .contains(&QueryKey::balance(ENDPOINT, &expected_ata)));
}

#[tokio::test]
async fn rent_is_queried_for_every_creation() {
    let h = harness(None, AccountPolicy::Defer);

    let first = h.workflow.create_mint().await.unwrap();
    let second = h.workflow.create_mint().await.unwrap();

    assert_ne!(first.mint, second.mint);
    assert_eq!(h.rent.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn mint_to_existing_account() {
    let h = harness(None, AccountPolicy::Bundle);
    let owner = h.signer.identity;
    let mint = Pubkey::new_unique();
    let ata = derive_associated_address(&owner, &mint, TokenProgram::Legacy);

    let outcome = h
        .workflow
        .mint_to(MintToRequest {
            mint,
            recipient: None,
            destination: Some(ata),
            amount: 5,
        })
        .await
        .unwrap();

    let submissions = h.signer.submissions.lock().unwrap();
    assert_eq!(submissions.len(), 1);
    assert!(submissions[0].extra_signers.is_empty());
    let ix = &submissions[0].instructions[0];
    assert_eq!(submissions[0].instructions.len(), 1);
    assert_eq!(ix.accounts[0].pubkey, mint);
    assert_eq!(ix.accounts[1].pubkey, ata);
    assert_eq!(ix.accounts[2].pubkey, owner);
    match TokenInstruction::unpack(&ix.data).unwrap() {
        TokenInstruction::MintToChecked { amount, decimals } => {
            assert_eq!(amount, 5);
            assert_eq!(decimals, 0);
        }
        other => panic!("unexpected instruction: {:?}", other),
    }

    assert_eq!(outcome.destination, ata);
    assert_eq!(outcome.invalidated, vec![QueryKey::balance(ENDPOINT, &ata)]);
    assert_eq!(
        *h.cache.calls.lock().unwrap(),
        vec![vec![QueryKey::balance(ENDPOINT, &ata)]]
    );
}

#[tokio::test]
async fn signer_rejection_fails_without_invalidation() {
    let h = harness(
        Some(SubmitError::Rejected("User rejected the request".into())),
        AccountPolicy::Bundle,
    );
    let mut states = h.workflow.subscribe();

    let err = h.workflow.create_mint().await.unwrap_err();

    assert!(matches!(err, MintError::SignerRejected(_)));
    assert_eq!(h.signer.submission_count(), 1);
    assert!(h.cache.calls.lock().unwrap().is_empty());
    assert!(h.notifier.confirmed.lock().unwrap().is_empty());
    assert_eq!(h.notifier.failed.lock().unwrap().len(), 1);
    assert!(states.has_changed().unwrap());
    let state = states.borrow_and_update().clone();
    assert!(state.is_terminal());
    assert!(matches!(state, WorkflowState::Failed(ref reason) if reason.contains("User rejected")));
}

#[tokio::test]
async fn network_failure_is_reported_and_not_retried() {
    let h = harness(
        Some(SubmitError::Network("Blockhash not found".into())),
        AccountPolicy::Defer,
    );

    let err = h
        .workflow
        .mint_to(MintToRequest {
            mint: Pubkey::new_unique(),
            recipient: None,
            destination: None,
            amount: 1,
        })
        .await
        .unwrap_err();

    assert!(matches!(err, MintError::Network(_)));
    assert_eq!(h.signer.submission_count(), 1);
    assert!(h.cache.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn zero_amount_is_refused_before_submission() {
    let h = harness(None, AccountPolicy::Bundle);

    let err = h
        .workflow
        .mint_to(MintToRequest {
            mint: Pubkey::new_unique(),
            recipient: None,
            destination: None,
            amount: 0,
        })
        .await
        .unwrap_err();

    assert!(err.is_precondition());
    assert_eq!(h.signer.submission_count(), 0);
    assert!(h.cache.calls.lock().unwrap().is_empty());
    assert!(matches!(h.workflow.state(), WorkflowState::Failed(_)));
}

#[tokio::test]
async fn arbitrary_destination_is_refused() {
    let h = harness(None, AccountPolicy::Bundle);

    let err = h
        .workflow
        .mint_to(MintToRequest {
            mint: Pubkey::new_unique(),
            recipient: None,
            destination: Some(Pubkey::new_unique()),
            amount: 3,
        })
        .await
        .unwrap_err();

    assert!(matches!(err, MintError::NotAssociatedAccount { .. }));
    assert_eq!(h.signer.submission_count(), 0);
}

#[tokio::test]
async fn mint_to_other_recipient_uses_their_associated_account() {
    let h = harness(None, AccountPolicy::Bundle);
    let recipient = Pubkey::new_unique();
    let mint = Pubkey::new_unique();

    let outcome = h
        .workflow
        .mint_to(MintToRequest {
            mint,
            recipient: Some(recipient),
            destination: None,
            amount: 10,
        })
        .await
        .unwrap();

    assert_eq!(
        outcome.destination,
        derive_associated_address(&recipient, &mint, TokenProgram::Legacy)
    );
    let submissions = h.signer.submissions.lock().unwrap();
    assert_eq!(submissions[0].instructions[0].accounts[2].pubkey, h.signer.identity);
}

#[tokio::test]
async fn transitions_are_published_in_order() {
    let (release_rent, rent_gate) = Gate::new();
    let (release_signer, signer_gate) = Gate::new();
    let signer = Arc::new(GatedSigner {
        identity: Pubkey::new_unique(),
        gate: signer_gate,
    });
    let cache = Arc::new(StateAtInvalidation::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let workflow = Arc::new(MintWorkflow::new(
        Wallet::connect(signer).into_connected().unwrap(),
        Arc::new(GatedRent(rent_gate)),
        cache.clone(),
        notifier.clone(),
        WorkflowConfig::new(ENDPOINT),
    ));
    *cache.states.lock().unwrap() = Some(workflow.subscribe());
    let mut states = workflow.subscribe();
    assert_eq!(*states.borrow_and_update(), WorkflowState::Idle);

    let running = tokio::spawn({
        let workflow = workflow.clone();
        async move { workflow.create_mint().await }
    });

    states
        .wait_for(|state| *state == WorkflowState::Building)
        .await
        .unwrap();
    assert_eq!(workflow.state(), WorkflowState::Building);
    release_rent.send(()).unwrap();

    states
        .wait_for(|state| *state == WorkflowState::AwaitingSignature)
        .await
        .unwrap();
    assert_eq!(workflow.state(), WorkflowState::AwaitingSignature);
    assert!(workflow.state().signature().is_none());
    assert!(cache.seen.lock().unwrap().is_empty());
    assert!(notifier.confirmed.lock().unwrap().is_empty());
    release_signer.send(()).unwrap();

    let outcome = running.await.unwrap().unwrap();

    let seen = cache.seen.lock().unwrap().clone();
    assert_eq!(seen, vec![WorkflowState::Submitted(outcome.signature)]);
    assert_eq!(seen[0].signature(), Some(&outcome.signature));
    let settled = workflow.state();
    assert_eq!(settled, WorkflowState::Confirmed(outcome.signature));
    assert_eq!(settled.signature(), Some(&outcome.signature));
    assert_eq!(*notifier.confirmed.lock().unwrap(), vec![outcome.signature]);
}

#[tokio::test]
async fn rent_failure_fails_before_submission() {
    let signer = FakeSigner::new(None);
    let cache = Arc::new(RecordingCache::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let workflow = MintWorkflow::new(
        Wallet::connect(signer.clone()).into_connected().unwrap(),
        Arc::new(FailingRent),
        cache.clone(),
        notifier.clone(),
        WorkflowConfig::new(ENDPOINT),
    );

    let err = workflow.create_mint().await.unwrap_err();

    assert!(matches!(err, MintError::Network(ref reason) if reason == "rent unavailable"));
    assert_eq!(signer.submission_count(), 0);
    assert!(cache.calls.lock().unwrap().is_empty());
    assert!(notifier.confirmed.lock().unwrap().is_empty());
    assert_eq!(notifier.failed.lock().unwrap().len(), 1);
    let state = workflow.state();
    assert!(state.is_terminal());
    assert!(matches!(state, WorkflowState::Failed(_)));
    assert_eq!(state.signature(), None);
}

#[test]
fn disconnected_wallet_cannot_build_a_workflow() {
    assert!(matches!(
        Wallet::Disconnected.into_connected(),
        Err(MintError::WalletDisconnected)
    ));
    assert_eq!(Wallet::default().identity(), None);
}
