use anyhow::Result;
use serde::Serialize;
use token_minter_core::{QueryCache, QueryKey};

#[derive(Serialize)]
pub struct CreateMintOutput {
    pub mint: String,
    pub associated_account: Option<String>,
    pub signature: String,
    pub explorer: Option<String>,
    pub invalidated: Vec<InvalidatedQuery>,
}

#[derive(Serialize)]
pub struct MintOutput {
    pub mint: String,
    pub destination: String,
    pub amount: u64,
    pub signature: String,
    pub explorer: Option<String>,
    pub invalidated: Vec<InvalidatedQuery>,
}

#[derive(Serialize)]
pub struct InvalidatedQuery {
    #[serde(flatten)]
    pub key: QueryKey,
    pub epoch: u64,
}

pub fn invalidated_queries(keys: Vec<QueryKey>, cache: &QueryCache) -> Vec<InvalidatedQuery> {
    keys.into_iter()
        .map(|key| {
            let epoch = cache.epoch(&key);
            InvalidatedQuery { key, epoch }
        })
        .collect()
}

#[derive(Serialize)]
pub struct AccountsOutput {
    pub owner: String,
    pub total: usize,
    pub accounts: Vec<AccountInfo>,
}

#[derive(Serialize, Clone)]
pub struct AccountInfo {
    pub address: String,
    pub mint: String,
    pub amount: u64,
}

#[derive(Serialize)]
pub struct BalanceOutput {
    pub account: String,
    pub mint: String,
    pub amount: String,
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
