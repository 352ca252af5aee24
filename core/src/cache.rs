//! Query keys, the post-confirmation invalidation policy, and an in-memory
//! freshness cache.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, PoisonError};

use serde::Serialize;
use solana_sdk::pubkey::Pubkey;

use crate::constants::{BALANCE_QUERY, SIGNATURES_QUERY};
use crate::ports::CacheSink;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct QueryKey {
    pub name: String,
    pub endpoint: String,
    pub subject: String,
}

impl QueryKey {
    pub fn new(name: &str, endpoint: &str, subject: &Pubkey) -> Self {
        Self {
            name: name.to_string(),
            endpoint: endpoint.to_string(),
            subject: subject.to_string(),
        }
    }

    pub fn balance(endpoint: &str, account: &Pubkey) -> Self {
        Self::new(BALANCE_QUERY, endpoint, account)
    }

    pub fn signatures(endpoint: &str, address: &Pubkey) -> Self {
        Self::new(SIGNATURES_QUERY, endpoint, address)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}) @ {}", self.name, self.subject, self.endpoint)
    }
}

/// A submission the signer accepted, described by what it touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmedAction {
    CreateMint {
        owner: Pubkey,
        associated_account: Option<Pubkey>,
    },
    MintTo {
        destination: Pubkey,
    },
}

pub fn invalidation_keys(action: &ConfirmedAction, endpoint: &str) -> Vec<QueryKey> {
    match action {
        ConfirmedAction::CreateMint {
            owner,
            associated_account,
        } => {
            let mut keys = vec![
                QueryKey::balance(endpoint, owner),
                QueryKey::signatures(endpoint, owner),
            ];
            if let Some(account) = associated_account {
                keys.push(QueryKey::balance(endpoint, account));
            }
            keys
        }
        ConfirmedAction::MintTo { destination } => vec![QueryKey::balance(endpoint, destination)],
    }
}

/// Maps each query key to a monotonically increasing freshness epoch. A
/// reader that remembers the epoch it read at can tell whether its value
/// has since been invalidated.
#[derive(Debug, Default)]
pub struct QueryCache {
    epochs: Mutex<HashMap<QueryKey, u64>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn epoch(&self, key: &QueryKey) -> u64 {
        let epochs = self.epochs.lock().unwrap_or_else(PoisonError::into_inner);
        epochs.get(key).copied().unwrap_or(0)
    }

    pub fn is_fresh(&self, key: &QueryKey, read_at: u64) -> bool {
        self.epoch(key) == read_at
    }
}

impl CacheSink for QueryCache {
    fn invalidate(&self, keys: &[QueryKey]) {
        let mut epochs = self.epochs.lock().unwrap_or_else(PoisonError::into_inner);
        for key in keys {
            let epoch = epochs.entry(key.clone()).or_insert(0);
            *epoch = epoch.saturating_add(1);
        }
    }
}
