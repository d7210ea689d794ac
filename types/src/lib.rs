//! Shared configuration types for traitwatch
//!
//! Everything in this crate is plain data: trait definitions as they appear
//! in the catalog TOML, engine tuning knobs, the announcement vocabulary and
//! a few display helpers. Nothing here owns runtime state.

mod config;
mod definition;
pub mod formatting;
mod token;

pub use config::{ConversionConfig, EngineConfig};
pub use definition::{DefinitionConfig, StackingParams, TraitDefinition, TraitMode};
pub use token::Token;

/// Discord guild (server) identifier
pub type GuildId = u64;
