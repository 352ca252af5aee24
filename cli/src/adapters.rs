//! RPC- and keypair-backed implementations of the workflow's collaborators.

use async_trait::async_trait;
use solana_account_decoder::UiAccountEncoding;
use solana_client::client_error::ClientError;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::{RpcAccountInfoConfig, RpcProgramAccountsConfig};
use solana_client::rpc_filter::{Memcmp, RpcFilterType};
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::program_pack::Pack;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature, Signer};
use solana_sdk::signer::SignerError;
use spl_token_2022::extension::StateWithExtensions;
use spl_token_2022::state::Account as TokenAccount;
use std::sync::Arc;
use token_minter_core::{
    MintError, Notifier, PendingTransaction, RentOracle, SubmitError, TokenAccountSource,
    TokenAccountSummary, TokenProgram, TransactionSigner,
};
use tracing::{debug, error, info};

use crate::config::{explorer_url, ClusterInfo};

/// Byte offset of the owner field in the token account layout.
const TOKEN_ACCOUNT_OWNER_OFFSET: usize = 32;

fn network_error(err: ClientError) -> SubmitError {
    SubmitError::Network(err.to_string())
}

fn signing_error(err: SignerError) -> SubmitError {
    SubmitError::Signing(err.to_string())
}

/// Owner-filtered program-accounts query. Legacy token accounts are fixed
/// size, so the legacy query also filters out mints and multisigs by length.
/// Token-2022 accounts carry extensions and cannot be matched on size.
fn token_accounts_config(
    owner: &Pubkey,
    program: TokenProgram,
    commitment: CommitmentConfig,
) -> RpcProgramAccountsConfig {
    let mut filters = vec![RpcFilterType::Memcmp(Memcmp::new_base58_encoded(
        TOKEN_ACCOUNT_OWNER_OFFSET,
        owner.as_ref(),
    ))];
    if program == TokenProgram::Legacy {
        filters.push(RpcFilterType::DataSize(TokenAccount::LEN as u64));
    }
    RpcProgramAccountsConfig {
        filters: Some(filters),
        account_config: RpcAccountInfoConfig {
            encoding: Some(UiAccountEncoding::Base64),
            commitment: Some(commitment),
            data_slice: None,
            min_context_slot: None,
        },
        with_context: None,
    }
}

pub struct RpcSigner {
    client: Arc<RpcClient>,
    payer: Keypair,
}

impl RpcSigner {
    pub fn new(client: Arc<RpcClient>, payer: Keypair) -> Self {
        Self { client, payer }
    }
}

#[async_trait]
impl TransactionSigner for RpcSigner {
    fn identity(&self) -> Pubkey {
        self.payer.pubkey()
    }

    async fn submit(&self, transaction: PendingTransaction) -> Result<Signature, SubmitError> {
        let blockhash = self
            .client
            .get_latest_blockhash()
            .await
            .map_err(network_error)?;
        let transaction = transaction
            .sign(&self.payer, blockhash)
            .map_err(signing_error)?;
        debug!(%blockhash, "Submitting transaction");
        self.client
            .send_and_confirm_transaction(&transaction)
            .await
            .map_err(network_error)
    }
}

pub struct RpcRentOracle {
    client: Arc<RpcClient>,
}

impl RpcRentOracle {
    pub fn new(client: Arc<RpcClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RentOracle for RpcRentOracle {
    async fn minimum_balance_for_size(&self, size: usize) -> Result<u64, SubmitError> {
        self.client
            .get_minimum_balance_for_rent_exemption(size)
            .await
            .map_err(network_error)
    }
}

pub struct RpcTokenAccounts {
    client: Arc<RpcClient>,
    program: TokenProgram,
    commitment: CommitmentConfig,
}

impl RpcTokenAccounts {
    pub fn new(client: Arc<RpcClient>, program: TokenProgram, commitment: CommitmentConfig) -> Self {
        Self {
            client,
            program,
            commitment,
        }
    }
}

#[async_trait]
impl TokenAccountSource for RpcTokenAccounts {
    async fn token_accounts(
        &self,
        owner: &Pubkey,
    ) -> Result<Vec<TokenAccountSummary>, SubmitError> {
        let rpc_config = token_accounts_config(owner, self.program, self.commitment);
        let accounts = self
            .client
            .get_program_accounts_with_config(&self.program.id(), rpc_config)
            .await
            .map_err(network_error)?;

        let mut summaries = Vec::with_capacity(accounts.len());
        for (address, account) in accounts {
            match StateWithExtensions::<TokenAccount>::unpack(&account.data) {
                Ok(parsed) => summaries.push(TokenAccountSummary {
                    address,
                    mint: parsed.base.mint,
                    owner: parsed.base.owner,
                    amount: parsed.base.amount,
                }),
                Err(err) => debug!(%address, %err, "Skipping undecodable token account"),
            }
        }
        Ok(summaries)
    }
}

/// Reports outcomes on stderr through `tracing`, keeping stdout free for
/// command output.
pub struct TracingNotifier {
    cluster: ClusterInfo,
}

impl TracingNotifier {
    pub fn new(cluster: ClusterInfo) -> Self {
        Self { cluster }
    }

    fn confirmation_message(&self, signature: &Signature) -> String {
        match explorer_url(signature, &self.cluster) {
            Some(url) => format!("Transaction sent: {} ({})", signature, url),
            None => format!("Transaction sent: {}", signature),
        }
    }
}

impl Notifier for TracingNotifier {
    fn transaction_confirmed(&self, signature: &Signature) {
        info!(%signature, "{}", self.confirmation_message(signature));
    }

    fn transaction_failed(&self, error: &MintError) {
        error!(%error, "Transaction failed");
    }
}
