//! Error and rejection types
//!
//! Only [`crate::catalog::CatalogError`] is meant to be fatal. Everything
//! here is a recoverable precondition failure handed back to the caller as
//! a value; none of them leave timers behind.

use thiserror::Error;

use crate::session::MatchPhase;

/// Catalog lookup miss
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown trait \"{key}\"")]
pub struct UnknownTraitError {
    pub key: String,
}

impl UnknownTraitError {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

/// Lifecycle action called from a state that doesn't accept it.
/// Callers treat this as a silent no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot {action} while {phase}")]
pub struct InvalidTransition {
    pub action: &'static str,
    pub phase: MatchPhase,
}

/// Stacking consume with no charges held
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{key} has no charges to consume")]
pub struct InsufficientCharge {
    pub key: String,
}

/// Why a swap was refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SwapNotAllowed {
    #[error("no match in progress")]
    MatchInactive,
    #[error("swap already used this match")]
    AlreadyUsed,
    #[error("no trait has been revealed yet")]
    NothingRevealed,
    #[error("{key} is already the active trait")]
    SameTrait { key: String },
    #[error(transparent)]
    UnknownTrait(#[from] UnknownTraitError),
}

/// Why a use or reuse was refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UseRejected {
    #[error(transparent)]
    UnknownTrait(#[from] UnknownTraitError),
    #[error("no match in progress")]
    MatchInactive,
    #[error("{key} is already revealed")]
    AlreadyRevealed { key: String },
    #[error("{revealed} is the revealed trait")]
    OtherTraitRevealed { revealed: String },
    #[error("{key} is on cooldown for {remaining_secs}s")]
    NotReady { key: String, remaining_secs: u32 },
    #[error(transparent)]
    InsufficientCharge(#[from] InsufficientCharge),
}
