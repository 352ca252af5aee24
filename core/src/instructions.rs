//! Pure builders for the instructions a mint workflow submits.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::system_instruction;
use spl_associated_token_account::get_associated_token_address_with_program_id;
use spl_associated_token_account::instruction::create_associated_token_account;

use crate::amount::Amount;
use crate::constants::{MINT_DECIMALS, MINT_SIZE};
use crate::errors::MintError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TokenProgram {
    #[default]
    Legacy,
    #[serde(rename = "token-2022")]
    Token2022,
}

impl TokenProgram {
    pub fn id(self) -> Pubkey {
        match self {
            TokenProgram::Legacy => spl_token::id(),
            TokenProgram::Token2022 => spl_token_2022::id(),
        }
    }
}

impl FromStr for TokenProgram {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "legacy" | "spl-token" => Ok(TokenProgram::Legacy),
            "token-2022" | "token2022" => Ok(TokenProgram::Token2022),
            _ => Err(format!("Unknown token program: {}", value)),
        }
    }
}

impl fmt::Display for TokenProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenProgram::Legacy => f.write_str("legacy"),
            TokenProgram::Token2022 => f.write_str("token-2022"),
        }
    }
}

/// Whether mint creation also provisions the owner's associated token account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AccountPolicy {
    #[default]
    Bundle,
    Defer,
}

pub fn derive_associated_address(owner: &Pubkey, mint: &Pubkey, program: TokenProgram) -> Pubkey {
    get_associated_token_address_with_program_id(owner, mint, &program.id())
}

pub struct CreateMintParams {
    pub owner: Pubkey,
    pub mint: Pubkey,
    /// Rent-exempt minimum for `MINT_SIZE`, queried right before the build.
    pub lamports: u64,
    pub token_program: TokenProgram,
    pub account_policy: AccountPolicy,
}

/// Create-account, initialize-mint and, under `AccountPolicy::Bundle`, the
/// owner's associated account, in submission order.
pub fn create_mint_instructions(params: &CreateMintParams) -> Result<Vec<Instruction>, MintError> {
    let program_id = params.token_program.id();
    let mut instructions = vec![
        system_instruction::create_account(
            &params.owner,
            &params.mint,
            params.lamports,
            MINT_SIZE as u64,
            &program_id,
        ),
        initialize_mint_instruction(params.token_program, &params.mint, &params.owner)?,
    ];

    if params.account_policy == AccountPolicy::Bundle {
        instructions.push(create_associated_token_account(
            &params.owner,
            &params.owner,
            &params.mint,
            &program_id,
        ));
    }

    Ok(instructions)
}

fn initialize_mint_instruction(
    program: TokenProgram,
    mint: &Pubkey,
    authority: &Pubkey,
) -> Result<Instruction, MintError> {
    let program_id = program.id();
    let ix = match program {
        TokenProgram::Legacy => spl_token::instruction::initialize_mint(
            &program_id,
            mint,
            authority,
            None,
            MINT_DECIMALS,
        )?,
        TokenProgram::Token2022 => spl_token_2022::instruction::initialize_mint(
            &program_id,
            mint,
            authority,
            None,
            MINT_DECIMALS,
        )?,
    };
    Ok(ix)
}

pub struct MintToParams {
    pub mint: Pubkey,
    /// Wallet whose associated account receives the tokens.
    pub recipient: Pubkey,
    pub authority: Pubkey,
    pub amount: Amount,
    pub token_program: TokenProgram,
}

impl MintToParams {
    pub fn destination(&self) -> Pubkey {
        derive_associated_address(&self.recipient, &self.mint, self.token_program)
    }
}

pub fn mint_to_checked_instruction(params: &MintToParams) -> Result<Instruction, MintError> {
    let program_id = params.token_program.id();
    let destination = params.destination();
    let ix = match params.token_program {
        TokenProgram::Legacy => spl_token::instruction::mint_to_checked(
            &program_id,
            &params.mint,
            &destination,
            &params.authority,
            &[],
            params.amount.get(),
            MINT_DECIMALS,
        )?,
        TokenProgram::Token2022 => spl_token_2022::instruction::mint_to_checked(
            &program_id,
            &params.mint,
            &destination,
            &params.authority,
            &[],
            params.amount.get(),
            MINT_DECIMALS,
        )?,
    };
    Ok(ix)
}
