use solana_sdk::program_pack::Pack;
use spl_token_2022::state::Mint;

/// Every mint created by this workflow counts whole, indivisible units.
pub const MINT_DECIMALS: u8 = 0;

/// Base mint layout size; identical for SPL Token and Token-2022 without extensions.
pub const MINT_SIZE: usize = Mint::LEN;

pub const BALANCE_QUERY: &str = "get-token-account-balance";
pub const SIGNATURES_QUERY: &str = "get-signatures";

pub const ACCOUNT_PAGE_SIZE: usize = 5;
