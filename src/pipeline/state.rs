/*!
 * States of a single file run.
 */

use serde::Serialize;
use std::fmt;

/// Where a file run currently is
///
/// Runs move strictly forward through the states in declaration order;
/// `Failed` can be entered from any state except `Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Created,
    ConvertingIn,
    Extracting,
    Deciding,
    Reinserting,
    SavingIntermediate,
    ConvertingOut,
    Relocating,
    Done,
    Failed,
}

impl PipelineState {
    /// The state that follows this one on success
    pub fn next(&self) -> Option<PipelineState> {
        match self {
            Self::Created => Some(Self::ConvertingIn),
            Self::ConvertingIn => Some(Self::Extracting),
            Self::Extracting => Some(Self::Deciding),
            Self::Deciding => Some(Self::Reinserting),
            Self::Reinserting => Some(Self::SavingIntermediate),
            Self::SavingIntermediate => Some(Self::ConvertingOut),
            Self::ConvertingOut => Some(Self::Relocating),
            Self::Relocating => Some(Self::Done),
            Self::Done | Self::Failed => None,
        }
    }

    pub fn can_transition_to(&self, to: PipelineState) -> bool {
        if to == Self::Failed {
            return !self.is_terminal();
        }
        self.next() == Some(to)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::ConvertingIn => write!(f, "converting in"),
            Self::Extracting => write!(f, "extracting"),
            Self::Deciding => write!(f, "deciding"),
            Self::Reinserting => write!(f, "reinserting"),
            Self::SavingIntermediate => write!(f, "saving intermediate"),
            Self::ConvertingOut => write!(f, "converting out"),
            Self::Relocating => write!(f, "relocating"),
            Self::Done => write!(f, "done"),
            Self::Failed => write!(f, "failed"),
        }
    }
}
