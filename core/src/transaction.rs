use solana_sdk::hash::Hash;
use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signer};
use solana_sdk::signer::SignerError;
use solana_sdk::transaction::Transaction;

/// Instructions for one logical action plus the keypairs that must co-sign
/// them. Consumed by value on submission so it can never be resent.
pub struct PendingTransaction {
    payer: Pubkey,
    instructions: Vec<Instruction>,
    signers: Vec<Keypair>,
}

impl PendingTransaction {
    pub fn new(payer: Pubkey, instructions: Vec<Instruction>) -> Self {
        Self {
            payer,
            instructions,
            signers: Vec::new(),
        }
    }

    pub fn with_signer(mut self, signer: Keypair) -> Self {
        self.signers.push(signer);
        self
    }

    pub fn payer(&self) -> &Pubkey {
        &self.payer
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn extra_signers(&self) -> Vec<Pubkey> {
        self.signers.iter().map(|signer| signer.pubkey()).collect()
    }

    pub fn sign(self, payer: &dyn Signer, blockhash: Hash) -> Result<Transaction, SignerError> {
        let mut transaction = Transaction::new_with_payer(&self.instructions, Some(&self.payer));
        let mut signers: Vec<&dyn Signer> = vec![payer];
        for signer in &self.signers {
            if signer.pubkey() != payer.pubkey() {
                signers.push(signer);
            }
        }
        transaction.try_sign(&signers, blockhash)?;
        Ok(transaction)
    }
}
