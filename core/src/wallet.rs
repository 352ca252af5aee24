use std::sync::Arc;

use solana_sdk::pubkey::Pubkey;

use crate::errors::MintError;
use crate::ports::TransactionSigner;

#[derive(Clone)]
pub struct ConnectedWallet {
    identity: Pubkey,
    signer: Arc<dyn TransactionSigner>,
}

impl ConnectedWallet {
    pub fn new(signer: Arc<dyn TransactionSigner>) -> Self {
        Self {
            identity: signer.identity(),
            signer,
        }
    }

    pub fn identity(&self) -> Pubkey {
        self.identity
    }

    pub fn signer(&self) -> &dyn TransactionSigner {
        self.signer.as_ref()
    }
}

#[derive(Clone, Default)]
pub enum Wallet {
    #[default]
    Disconnected,
    Connected(ConnectedWallet),
}

impl Wallet {
    pub fn connect(signer: Arc<dyn TransactionSigner>) -> Self {
        Wallet::Connected(ConnectedWallet::new(signer))
    }

    pub fn identity(&self) -> Option<Pubkey> {
        match self {
            Wallet::Connected(wallet) => Some(wallet.identity()),
            Wallet::Disconnected => None,
        }
    }

    pub fn into_connected(self) -> Result<ConnectedWallet, MintError> {
        match self {
            Wallet::Connected(wallet) => Ok(wallet),
            Wallet::Disconnected => Err(MintError::WalletDisconnected),
        }
    }
}
