mod adapters;
mod config;
mod output;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::read_keypair_file;
use std::sync::Arc;
use token_minter_core::{
    derive_associated_address, list_token_accounts, AccountPolicy, Amount, MintToRequest,
    MintWorkflow, QueryCache, Wallet, WorkflowConfig,
};
use tracing_subscriber::EnvFilter;

use crate::adapters::{RpcRentOracle, RpcSigner, RpcTokenAccounts, TracingNotifier};
use crate::config::{
    explorer_url, load_minter_config, load_solana_cli_config, parse_pubkey, resolve_settings,
    Settings,
};
use crate::output::{
    invalidated_queries, print_json, AccountInfo, AccountsOutput, BalanceOutput,
    CreateMintOutput, MintOutput,
};

#[derive(Parser)]
#[command(name = "token-minter", version, about = "Create SPL token mints and mint supply")]
struct Cli {
    #[arg(long)]
    cluster: Option<String>,

    #[arg(long)]
    keypair: Option<String>,

    #[arg(long)]
    config: Option<String>,

    #[arg(long, value_enum, default_value = "text")]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    CreateMint(CreateMintArgs),
    Mint(MintArgs),
    Accounts(AccountsArgs),
    Balance(BalanceArgs),
}

#[derive(Parser)]
struct CreateMintArgs {
    /// Skip creating the owner's associated token account
    #[arg(long)]
    no_account: bool,
}

#[derive(Parser)]
struct MintArgs {
    /// Whole number of tokens to mint
    amount: Amount,

    #[arg(long)]
    mint: String,

    /// Wallet receiving the tokens; defaults to the connected wallet
    #[arg(long)]
    recipient: Option<String>,

    /// Expected associated token account of the recipient
    #[arg(long)]
    account: Option<String>,
}

#[derive(Parser)]
struct AccountsArgs {
    #[arg(long)]
    owner: Option<String>,

    #[arg(long)]
    all: bool,
}

#[derive(Parser)]
struct BalanceArgs {
    #[arg(long)]
    mint: String,

    #[arg(long)]
    owner: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();
    run(cli).await
}

async fn run(cli: Cli) -> Result<()> {
    let solana_config = load_solana_cli_config().ok();
    let minter_config = cli
        .config
        .as_deref()
        .map(load_minter_config)
        .transpose()?;
    let settings = resolve_settings(
        cli.cluster.as_deref(),
        cli.keypair.as_deref(),
        minter_config.as_ref(),
        solana_config.as_ref(),
    )?;
    let ctx = AppContext::new(settings, cli.output)?;

    match &cli.command {
        Commands::CreateMint(args) => handle_create_mint(&ctx, args).await,
        Commands::Mint(args) => handle_mint(&ctx, args).await,
        Commands::Accounts(args) => handle_accounts(&ctx, args).await,
        Commands::Balance(args) => handle_balance(&ctx, args).await,
    }
}

struct AppContext {
    client: Arc<RpcClient>,
    wallet: Wallet,
    settings: Settings,
    output: OutputFormat,
    cache: Arc<QueryCache>,
}

impl AppContext {
    fn new(settings: Settings, output: OutputFormat) -> Result<Self> {
        let client = Arc::new(RpcClient::new_with_commitment(
            settings.cluster.url.clone(),
            settings.commitment,
        ));
        let wallet = match &settings.keypair_path {
            Some(path) => {
                let payer = read_keypair_file(path)
                    .map_err(|err| anyhow!("Failed to read keypair {}: {}", path.display(), err))?;
                Wallet::connect(Arc::new(RpcSigner::new(client.clone(), payer)))
            }
            None => Wallet::Disconnected,
        };
        Ok(Self {
            client,
            wallet,
            settings,
            output,
            cache: Arc::new(QueryCache::new()),
        })
    }

    fn workflow(&self, account_policy: AccountPolicy) -> Result<MintWorkflow> {
        let wallet = self
            .wallet
            .clone()
            .into_connected()
            .context("Missing keypair path. Use --keypair or Solana CLI config.")?;
        Ok(MintWorkflow::new(
            wallet,
            Arc::new(RpcRentOracle::new(self.client.clone())),
            self.cache.clone(),
            Arc::new(TracingNotifier::new(self.settings.cluster.clone())),
            WorkflowConfig {
                endpoint: self.settings.cluster.url.clone(),
                token_program: self.settings.token_program,
                account_policy,
            },
        ))
    }

    fn owner_or_wallet(&self, owner: Option<&str>) -> Result<Pubkey> {
        match owner {
            Some(value) => parse_pubkey(value),
            None => self
                .wallet
                .identity()
                .ok_or_else(|| anyhow!("Missing --owner and no wallet keypair configured")),
        }
    }
}

async fn handle_create_mint(ctx: &AppContext, args: &CreateMintArgs) -> Result<()> {
    let policy = if args.no_account {
        AccountPolicy::Defer
    } else {
        ctx.settings.account_policy
    };
    let workflow = ctx.workflow(policy)?;
    let outcome = workflow.create_mint().await?;
    let explorer = explorer_url(&outcome.signature, &ctx.settings.cluster);
    let signature = outcome.signature.to_string();

    if ctx.output == OutputFormat::Json {
        let output = CreateMintOutput {
            mint: outcome.mint.to_string(),
            associated_account: outcome.associated_account.map(|key| key.to_string()),
            signature,
            explorer,
            invalidated: invalidated_queries(outcome.invalidated, &ctx.cache),
        };
        print_json(&output)
    } else {
        println!("Token mint created");
        println!("Mint:      {}", outcome.mint);
        println!("Authority: {}", workflow.owner());
        if let Some(account) = outcome.associated_account {
            println!("Account:   {}", account);
        }
        println!("Program:   {}", workflow.config().token_program);
        println!("Tx:        {}", signature);
        if let Some(url) = explorer {
            println!("Explorer:  {}", url);
        }
        Ok(())
    }
}

async fn handle_mint(ctx: &AppContext, args: &MintArgs) -> Result<()> {
    let mint = parse_pubkey(&args.mint)?;
    let recipient = args.recipient.as_deref().map(parse_pubkey).transpose()?;
    let destination = args.account.as_deref().map(parse_pubkey).transpose()?;

    let workflow = ctx.workflow(ctx.settings.account_policy)?;
    let outcome = workflow
        .mint_to(MintToRequest {
            mint,
            recipient,
            destination,
            amount: args.amount.get(),
        })
        .await?;
    let explorer = explorer_url(&outcome.signature, &ctx.settings.cluster);
    let signature = outcome.signature.to_string();

    if ctx.output == OutputFormat::Json {
        let output = MintOutput {
            mint: mint.to_string(),
            destination: outcome.destination.to_string(),
            amount: outcome.amount.get(),
            signature,
            explorer,
            invalidated: invalidated_queries(outcome.invalidated, &ctx.cache),
        };
        print_json(&output)
    } else {
        println!("Minted {} tokens to {}", outcome.amount, outcome.destination);
        println!("Tx: {}", signature);
        if let Some(url) = explorer {
            println!("Explorer: {}", url);
        }
        Ok(())
    }
}

async fn handle_accounts(ctx: &AppContext, args: &AccountsArgs) -> Result<()> {
    let owner = ctx.owner_or_wallet(args.owner.as_deref())?;
    let source = RpcTokenAccounts::new(
        ctx.client.clone(),
        ctx.settings.token_program,
        ctx.settings.commitment,
    );
    let listing = list_token_accounts(&source, &owner, args.all).await?;
    let accounts: Vec<AccountInfo> = listing
        .accounts
        .iter()
        .map(|account| AccountInfo {
            address: account.address.to_string(),
            mint: account.mint.to_string(),
            amount: account.amount,
        })
        .collect();

    if ctx.output == OutputFormat::Json {
        let output = AccountsOutput {
            owner: owner.to_string(),
            total: listing.total,
            accounts,
        };
        print_json(&output)
    } else {
        if accounts.is_empty() {
            println!("No token accounts found.");
        } else {
            for account in accounts {
                println!("{} {} {}", account.address, account.mint, account.amount);
            }
            if listing.is_truncated() {
                println!(
                    "Showing {} of {} accounts (use --all)",
                    listing.accounts.len(),
                    listing.total
                );
            }
        }
        Ok(())
    }
}

async fn handle_balance(ctx: &AppContext, args: &BalanceArgs) -> Result<()> {
    let mint = parse_pubkey(&args.mint)?;
    let owner = ctx.owner_or_wallet(args.owner.as_deref())?;
    let account = derive_associated_address(&owner, &mint, ctx.settings.token_program);
    let balance = ctx
        .client
        .get_token_account_balance(&account)
        .await
        .with_context(|| format!("Failed to fetch balance of {}", account))?;

    if ctx.output == OutputFormat::Json {
        let output = BalanceOutput {
            account: account.to_string(),
            mint: mint.to_string(),
            amount: balance.amount,
        };
        print_json(&output)
    } else {
        println!("Account: {}", account);
        println!("Balance: {}", balance.ui_amount_string);
        Ok(())
    }
}
