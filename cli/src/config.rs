use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use solana_sdk::commitment_config::{CommitmentConfig, CommitmentLevel};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use token_minter_core::{AccountPolicy, TokenProgram};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MinterConfig {
    pub network: Option<NetworkConfig>,
    pub token: Option<TokenConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NetworkConfig {
    pub cluster: Option<String>,
    pub keypair_path: Option<String>,
    pub commitment: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenConfig {
    pub program: Option<TokenProgram>,
    pub provision_account: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SolanaCliConfig {
    pub json_rpc_url: String,
    pub keypair_path: String,
    pub commitment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterInfo {
    pub url: String,
    pub label: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub cluster: ClusterInfo,
    pub keypair_path: Option<PathBuf>,
    pub commitment: CommitmentConfig,
    pub token_program: TokenProgram,
    pub account_policy: AccountPolicy,
}

/// Resolves each setting from the first source that provides it: command
/// line, then the minter config file, then the Solana CLI config.
pub fn resolve_settings(
    cluster_flag: Option<&str>,
    keypair_flag: Option<&str>,
    config: Option<&MinterConfig>,
    solana_config: Option<&SolanaCliConfig>,
) -> Result<Settings> {
    let network = config.and_then(|cfg| cfg.network.as_ref());
    let token = config.and_then(|cfg| cfg.token.as_ref());

    let cluster_value = if let Some(value) = cluster_flag {
        value.to_string()
    } else if let Some(value) = network.and_then(|cfg| cfg.cluster.as_deref()) {
        value.to_string()
    } else if let Some(config) = solana_config {
        config.json_rpc_url.clone()
    } else {
        "devnet".to_string()
    };
    let cluster = resolve_cluster(&cluster_value)?;

    let keypair_path = keypair_flag
        .or_else(|| network.and_then(|cfg| cfg.keypair_path.as_deref()))
        .or_else(|| solana_config.map(|cfg| cfg.keypair_path.as_str()))
        .map(expand_tilde);

    let commitment_value = network
        .and_then(|cfg| cfg.commitment.clone())
        .or_else(|| solana_config.and_then(|cfg| cfg.commitment.clone()));

    let account_policy = match token.and_then(|cfg| cfg.provision_account) {
        Some(false) => AccountPolicy::Defer,
        _ => AccountPolicy::Bundle,
    };

    Ok(Settings {
        cluster,
        keypair_path,
        commitment: parse_commitment(commitment_value.as_deref())?,
        token_program: token.and_then(|cfg| cfg.program).unwrap_or_default(),
        account_policy,
    })
}

fn read_config<T>(path: &Path, what: &str, parse: impl FnOnce(&str) -> Result<T>) -> Result<T> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}: {}", what, path.display()))?;
    parse(&contents).with_context(|| format!("Failed to parse {}: {}", what, path.display()))
}

pub fn load_minter_config(path: &str) -> Result<MinterConfig> {
    read_config(&expand_tilde(path), "minter config", |contents| {
        Ok(toml::from_str(contents)?)
    })
}

pub fn load_solana_cli_config() -> Result<SolanaCliConfig> {
    let path = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config/solana/cli/config.yml");
    read_config(&path, "Solana CLI config", |contents| {
        Ok(serde_yaml::from_str(contents)?)
    })
}

/// Public clusters as `(monikers, rpc url, explorer label)`.
const PUBLIC_CLUSTERS: &[(&[&str], &str, &str)] = &[
    (&["devnet"], "https://api.devnet.solana.com", "devnet"),
    (&["testnet"], "https://api.testnet.solana.com", "testnet"),
    (
        &["mainnet-beta", "mainnet"],
        "https://api.mainnet-beta.solana.com",
        "mainnet-beta",
    ),
];

const LOCALNET_URL: &str = "http://127.0.0.1:8899";

/// Accepts a cluster moniker or an RPC URL. URLs pointing at a public
/// cluster or at a local validator keep an explorer label.
pub fn resolve_cluster(input: &str) -> Result<ClusterInfo> {
    let lowered = input.to_lowercase();
    if lowered == "localnet" {
        return Ok(local_cluster(LOCALNET_URL));
    }
    if let Some((_, url, label)) = PUBLIC_CLUSTERS
        .iter()
        .find(|(monikers, _, _)| monikers.contains(&lowered.as_str()))
    {
        return Ok(ClusterInfo {
            url: url.to_string(),
            label: Some(label.to_string()),
        });
    }
    if !(lowered.starts_with("http://") || lowered.starts_with("https://")) {
        return Err(anyhow!("Unknown cluster: {}", input));
    }
    if lowered.contains("://localhost") || lowered.contains("://127.0.0.1") {
        return Ok(local_cluster(input));
    }
    let label = PUBLIC_CLUSTERS
        .iter()
        .find(|(monikers, _, _)| monikers.iter().any(|moniker| lowered.contains(moniker)))
        .map(|(_, _, label)| label.to_string());
    Ok(ClusterInfo {
        url: input.to_string(),
        label,
    })
}

fn local_cluster(url: &str) -> ClusterInfo {
    let encoded = url.replace(':', "%3A").replace('/', "%2F");
    ClusterInfo {
        url: url.to_string(),
        label: Some(format!("custom&customUrl={}", encoded)),
    }
}

/// Defaults to `confirmed`; an unrecognised level is an error rather than a
/// silent downgrade.
pub fn parse_commitment(value: Option<&str>) -> Result<CommitmentConfig> {
    let Some(value) = value else {
        return Ok(CommitmentConfig::confirmed());
    };
    let commitment = CommitmentLevel::from_str(value)
        .map_err(|_| anyhow!("Unknown commitment level: {}", value))?;
    Ok(CommitmentConfig { commitment })
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

pub fn parse_pubkey(value: &str) -> Result<Pubkey> {
    value
        .parse()
        .with_context(|| format!("Invalid pubkey: {}", value))
}

pub fn explorer_url(signature: &Signature, cluster: &ClusterInfo) -> Option<String> {
    let label = cluster.label.as_ref()?;
    Some(format!(
        "https://explorer.solana.com/tx/{}?cluster={}",
        signature, label
    ))
}
