use solana_sdk::pubkey::Pubkey;

use crate::constants::ACCOUNT_PAGE_SIZE;
use crate::errors::MintError;
use crate::ports::TokenAccountSource;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenAccountSummary {
    pub address: Pubkey,
    pub mint: Pubkey,
    pub owner: Pubkey,
    pub amount: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountListing {
    pub accounts: Vec<TokenAccountSummary>,
    pub total: usize,
}

impl AccountListing {
    pub fn is_truncated(&self) -> bool {
        self.accounts.len() < self.total
    }
}

/// Largest balances first; only the first page unless `show_all`.
pub fn page_accounts(mut accounts: Vec<TokenAccountSummary>, show_all: bool) -> AccountListing {
    accounts.sort_by(|a, b| b.amount.cmp(&a.amount).then(a.address.cmp(&b.address)));
    let total = accounts.len();
    if !show_all {
        accounts.truncate(ACCOUNT_PAGE_SIZE);
    }
    AccountListing { accounts, total }
}

pub async fn list_token_accounts(
    source: &dyn TokenAccountSource,
    owner: &Pubkey,
    show_all: bool,
) -> Result<AccountListing, MintError> {
    let accounts = source.token_accounts(owner).await?;
    Ok(page_accounts(accounts, show_all))
}
