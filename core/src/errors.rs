use solana_sdk::program_error::ProgramError;
use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MintError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Destination {actual} is not the associated token account {expected}")]
    NotAssociatedAccount { expected: Pubkey, actual: Pubkey },

    #[error("Wallet is not connected")]
    WalletDisconnected,

    #[error("Transaction rejected by signer: {0}")]
    SignerRejected(String),

    #[error("Failed to sign transaction: {0}")]
    Signing(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Failed to build instruction: {0}")]
    Instruction(#[from] ProgramError),
}

impl MintError {
    /// Errors raised locally before anything was handed to the signer.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            MintError::InvalidAmount(_)
                | MintError::NotAssociatedAccount { .. }
                | MintError::WalletDisconnected
                | MintError::Instruction(_)
        )
    }
}

/// Failure reported by an external collaborator (signer, RPC connection).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    #[error("{0}")]
    Rejected(String),

    /// The transaction could not be signed locally, e.g. a co-signer is missing.
    #[error("{0}")]
    Signing(String),

    #[error("{0}")]
    Network(String),
}

impl From<SubmitError> for MintError {
    fn from(err: SubmitError) -> Self {
        match err {
            SubmitError::Rejected(reason) => MintError::SignerRejected(reason),
            SubmitError::Signing(reason) => MintError::Signing(reason),
            SubmitError::Network(reason) => MintError::Network(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submit_errors_map_to_workflow_failures() {
        let rejected: MintError = SubmitError::Rejected("user declined".into()).into();
        assert!(matches!(rejected, MintError::SignerRejected(ref reason) if reason == "user declined"));
        assert!(!rejected.is_precondition());

        let network: MintError = SubmitError::Network("blockhash expired".into()).into();
        assert!(matches!(network, MintError::Network(_)));
        assert_eq!(network.to_string(), "Network error: blockhash expired");
    }

    #[test]
    fn local_signing_failure_is_not_a_rejection() {
        let signing: MintError = SubmitError::Signing("not enough signers".into()).into();
        assert!(matches!(signing, MintError::Signing(_)));
        assert!(!matches!(signing, MintError::SignerRejected(_)));
        assert_eq!(
            signing.to_string(),
            "Failed to sign transaction: not enough signers"
        );
    }

    #[test]
    fn local_errors_are_preconditions() {
        assert!(MintError::InvalidAmount("0".into()).is_precondition());
        assert!(MintError::WalletDisconnected.is_precondition());
        assert!(MintError::Instruction(ProgramError::IncorrectProgramId).is_precondition());
    }
}
