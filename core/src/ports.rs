//! Collaborators the workflow consumes but does not implement.

use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;

use crate::accounts::TokenAccountSummary;
use crate::cache::QueryKey;
use crate::errors::{MintError, SubmitError};
use crate::transaction::PendingTransaction;

/// A connected wallet able to sign and submit on behalf of its identity.
///
/// `submit` may pend for as long as the wallet waits on user approval. A
/// refusal is reported as `SubmitError::Rejected`.
#[async_trait]
pub trait TransactionSigner: Send + Sync {
    fn identity(&self) -> Pubkey;

    async fn submit(&self, transaction: PendingTransaction) -> Result<Signature, SubmitError>;
}

#[async_trait]
pub trait RentOracle: Send + Sync {
    async fn minimum_balance_for_size(&self, size: usize) -> Result<u64, SubmitError>;
}

/// Receives invalidations for cached read queries. Must be idempotent.
pub trait CacheSink: Send + Sync {
    fn invalidate(&self, keys: &[QueryKey]);
}

pub trait Notifier: Send + Sync {
    fn transaction_confirmed(&self, signature: &Signature);

    fn transaction_failed(&self, error: &MintError);
}

#[async_trait]
pub trait TokenAccountSource: Send + Sync {
    async fn token_accounts(&self, owner: &Pubkey)
        -> Result<Vec<TokenAccountSummary>, SubmitError>;
}
