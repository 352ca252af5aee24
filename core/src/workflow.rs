use std::sync::Arc;

use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature, Signer};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::amount::Amount;
use crate::cache::{invalidation_keys, ConfirmedAction, QueryKey};
use crate::constants::MINT_SIZE;
use crate::errors::MintError;
use crate::instructions::{
    create_mint_instructions, derive_associated_address, mint_to_checked_instruction,
    AccountPolicy, CreateMintParams, MintToParams, TokenProgram,
};
use crate::ports::{CacheSink, Notifier, RentOracle};
use crate::state::WorkflowState;
use crate::transaction::PendingTransaction;
use crate::wallet::ConnectedWallet;

#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    /// RPC endpoint the query keys are scoped to.
    pub endpoint: String,
    pub token_program: TokenProgram,
    pub account_policy: AccountPolicy,
}

impl WorkflowConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            token_program: TokenProgram::default(),
            account_policy: AccountPolicy::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateMintOutcome {
    pub mint: Pubkey,
    pub associated_account: Option<Pubkey>,
    pub signature: Signature,
    pub invalidated: Vec<QueryKey>,
}

#[derive(Debug, Clone)]
pub struct MintToRequest {
    pub mint: Pubkey,
    /// Defaults to the connected wallet.
    pub recipient: Option<Pubkey>,
    /// Must equal the recipient's associated account when given.
    pub destination: Option<Pubkey>,
    pub amount: u64,
}

#[derive(Debug, Clone)]
pub struct MintToOutcome {
    pub destination: Pubkey,
    pub amount: Amount,
    pub signature: Signature,
    pub invalidated: Vec<QueryKey>,
}

/// Drives one create-mint or mint-to action at a time from `Idle` to
/// `Confirmed` or `Failed`. Every invocation builds a fresh transaction.
pub struct MintWorkflow {
    wallet: ConnectedWallet,
    rent: Arc<dyn RentOracle>,
    cache: Arc<dyn CacheSink>,
    notifier: Arc<dyn Notifier>,
    config: WorkflowConfig,
    state: watch::Sender<WorkflowState>,
}

impl MintWorkflow {
    pub fn new(
        wallet: ConnectedWallet,
        rent: Arc<dyn RentOracle>,
        cache: Arc<dyn CacheSink>,
        notifier: Arc<dyn Notifier>,
        config: WorkflowConfig,
    ) -> Self {
        let (state, _) = watch::channel(WorkflowState::Idle);
        Self {
            wallet,
            rent,
            cache,
            notifier,
            config,
            state,
        }
    }

    pub fn owner(&self) -> Pubkey {
        self.wallet.identity()
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    pub fn state(&self) -> WorkflowState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<WorkflowState> {
        self.state.subscribe()
    }

    pub async fn create_mint(&self) -> Result<CreateMintOutcome, MintError> {
        self.transition(WorkflowState::Idle);
        let result = self.run_create_mint().await;
        self.settle(result)
    }

    pub async fn mint_to(&self, request: MintToRequest) -> Result<MintToOutcome, MintError> {
        self.transition(WorkflowState::Idle);
        let result = self.run_mint_to(request).await;
        self.settle(result)
    }

    async fn run_create_mint(&self) -> Result<CreateMintOutcome, MintError> {
        self.transition(WorkflowState::Building);
        let owner = self.owner();
        let lamports = self.rent.minimum_balance_for_size(MINT_SIZE).await?;
        let mint_keypair = Keypair::new();
        let mint = mint_keypair.pubkey();

        let instructions = create_mint_instructions(&CreateMintParams {
            owner,
            mint,
            lamports,
            token_program: self.config.token_program,
            account_policy: self.config.account_policy,
        })?;
        let associated_account = match self.config.account_policy {
            AccountPolicy::Bundle => Some(derive_associated_address(
                &owner,
                &mint,
                self.config.token_program,
            )),
            AccountPolicy::Defer => None,
        };
        debug!(%mint, lamports, instructions = instructions.len(), "Built mint creation");

        let pending = PendingTransaction::new(owner, instructions).with_signer(mint_keypair);
        let signature = self.submit(pending).await?;
        let invalidated = self.confirm(
            signature,
            &ConfirmedAction::CreateMint {
                owner,
                associated_account,
            },
        );
        info!(%mint, %signature, "Token mint created");

        Ok(CreateMintOutcome {
            mint,
            associated_account,
            signature,
            invalidated,
        })
    }

    async fn run_mint_to(&self, request: MintToRequest) -> Result<MintToOutcome, MintError> {
        self.transition(WorkflowState::Building);
        let amount = Amount::new(request.amount)?;
        let params = MintToParams {
            mint: request.mint,
            recipient: request.recipient.unwrap_or_else(|| self.owner()),
            authority: self.owner(),
            amount,
            token_program: self.config.token_program,
        };
        let destination = params.destination();
        if let Some(actual) = request.destination {
            if actual != destination {
                return Err(MintError::NotAssociatedAccount {
                    expected: destination,
                    actual,
                });
            }
        }

        let ix = mint_to_checked_instruction(&params)?;
        debug!(mint = %request.mint, %destination, %amount, "Built mint-to");

        let signature = self
            .submit(PendingTransaction::new(self.owner(), vec![ix]))
            .await?;
        let invalidated = self.confirm(signature, &ConfirmedAction::MintTo { destination });
        info!(%destination, %amount, %signature, "Tokens minted");

        Ok(MintToOutcome {
            destination,
            amount,
            signature,
            invalidated,
        })
    }

    async fn submit(&self, pending: PendingTransaction) -> Result<Signature, MintError> {
        self.transition(WorkflowState::AwaitingSignature);
        let signature = self.wallet.signer().submit(pending).await?;
        self.transition(WorkflowState::Submitted(signature));
        Ok(signature)
    }

    fn confirm(&self, signature: Signature, action: &ConfirmedAction) -> Vec<QueryKey> {
        let keys = invalidation_keys(action, &self.config.endpoint);
        self.cache.invalidate(&keys);
        self.transition(WorkflowState::Confirmed(signature));
        self.notifier.transaction_confirmed(&signature);
        keys
    }

    fn settle<T>(&self, result: Result<T, MintError>) -> Result<T, MintError> {
        if let Err(err) = &result {
            warn!(error = %err, "Mint workflow failed");
            self.transition(WorkflowState::Failed(err.to_string()));
            self.notifier.transaction_failed(err);
        }
        result
    }

    fn transition(&self, next: WorkflowState) {
        debug!(state = %next, "Mint workflow transition");
        self.state.send_replace(next);
    }
}
