use std::fmt;

use solana_sdk::signature::Signature;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum WorkflowState {
    #[default]
    Idle,
    Building,
    AwaitingSignature,
    Submitted(Signature),
    Confirmed(Signature),
    Failed(String),
}

impl WorkflowState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkflowState::Confirmed(_) | WorkflowState::Failed(_))
    }

    pub fn signature(&self) -> Option<&Signature> {
        match self {
            WorkflowState::Submitted(signature) | WorkflowState::Confirmed(signature) => {
                Some(signature)
            }
            _ => None,
        }
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkflowState::Idle => f.write_str("idle"),
            WorkflowState::Building => f.write_str("building"),
            WorkflowState::AwaitingSignature => f.write_str("awaiting-signature"),
            WorkflowState::Submitted(_) => f.write_str("submitted"),
            WorkflowState::Confirmed(_) => f.write_str("confirmed"),
            WorkflowState::Failed(_) => f.write_str("failed"),
        }
    }
}
