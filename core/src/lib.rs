//! Per-guild trait cooldown engine
//!
//! Tracks one hidden "trait" per match, announces its countdown at fixed
//! marks, simulates stacking charges and converts remaining time on a
//! one-time swap. Everything runs in caller-supplied time and talks to the
//! outside only through [`sink::AnnouncementSink`] and [`sink::PanelSink`].

pub mod catalog;
pub mod clock;
pub mod convert;
pub mod cooldown;
pub mod cycle;
pub mod error;
pub mod session;
pub mod sink;
pub mod stacking;
pub mod timers;

// Re-exports for convenience
pub use catalog::{CatalogError, TraitCatalog, load_catalog};
pub use error::{InsufficientCharge, InvalidTransition, SwapNotAllowed, UnknownTraitError, UseRejected};
pub use session::{GuildStore, MatchPhase, MatchSession, MatchSnapshot, SwapReport, TraitActivation};
pub use sink::{Announcement, AnnouncementSink, Outbox, PanelSink};
