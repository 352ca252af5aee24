//! Headless token minting: builds SPL token instructions, submits them
//! through a connected signer, and invalidates the cached queries a
//! confirmed submission affected.

pub mod accounts;
pub mod amount;
pub mod cache;
pub mod constants;
pub mod errors;
pub mod instructions;
pub mod ports;
pub mod state;
pub mod transaction;
pub mod wallet;
pub mod workflow;

pub use accounts::{list_token_accounts, AccountListing, TokenAccountSummary};
pub use amount::Amount;
pub use cache::{invalidation_keys, ConfirmedAction, QueryCache, QueryKey};
pub use errors::{MintError, SubmitError};
pub use instructions::{derive_associated_address, AccountPolicy, TokenProgram};
pub use ports::{CacheSink, Notifier, RentOracle, TokenAccountSource, TransactionSigner};
pub use state::WorkflowState;
pub use transaction::PendingTransaction;
pub use wallet::{ConnectedWallet, Wallet};
pub use workflow::{CreateMintOutcome, MintToOutcome, MintToRequest, MintWorkflow, WorkflowConfig};
