//! Per-guild session table
//!
//! Every guild gets its own [`MatchSession`], created the first time it is
//! referenced. Guilds share nothing mutable: the catalog and engine config
//! are handed out as `Arc`s.

use std::sync::Arc;

use hashbrown::HashMap;
use traitwatch_types::{EngineConfig, GuildId};

use super::{MatchSession, SwapReport, TraitActivation};
use crate::catalog::TraitCatalog;
use crate::error::{InvalidTransition, SwapNotAllowed, UseRejected};
use crate::sink::{AnnouncementSink, PanelSink};

#[derive(Debug)]
pub struct GuildStore {
    sessions: HashMap<GuildId, MatchSession>,
    catalog: Arc<TraitCatalog>,
    config: Arc<EngineConfig>,
}

impl GuildStore {
    pub fn new(catalog: Arc<TraitCatalog>, config: Arc<EngineConfig>) -> Self {
        Self {
            sessions: HashMap::new(),
            catalog,
            config,
        }
    }

    pub fn catalog(&self) -> &TraitCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Session for `guild_id`, created idle on first access
    pub fn session_mut(&mut self, guild_id: GuildId) -> &mut MatchSession {
        let catalog = &self.catalog;
        let config = &self.config;
        self.sessions.entry(guild_id).or_insert_with(|| {
            tracing::debug!(guild_id, "Creating guild session");
            MatchSession::new(guild_id, Arc::clone(catalog), Arc::clone(config))
        })
    }

    pub fn get(&self, guild_id: GuildId) -> Option<&MatchSession> {
        self.sessions.get(&guild_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    // ─── Action source entry points ─────────────────────────────────────────

    pub fn on_match_start(&mut self, guild_id: GuildId, now_ms: i64) -> Result<(), InvalidTransition> {
        self.session_mut(guild_id).start(now_ms).inspect_err(|e| {
            tracing::debug!(guild_id, error = %e, "Ignoring match start");
        })
    }

    pub fn on_match_end(&mut self, guild_id: GuildId, now_ms: i64) -> Result<(), InvalidTransition> {
        self.session_mut(guild_id).end(now_ms).inspect_err(|e| {
            tracing::debug!(guild_id, error = %e, "Ignoring match end");
        })
    }

    pub fn on_match_reset(&mut self, guild_id: GuildId, now_ms: i64) -> Result<(), InvalidTransition> {
        self.session_mut(guild_id).reset(now_ms)
    }

    pub fn on_trait_used(
        &mut self,
        guild_id: GuildId,
        key: &str,
        now_ms: i64,
    ) -> Result<TraitActivation, UseRejected> {
        self.session_mut(guild_id).use_trait(key, now_ms).inspect_err(|e| {
            tracing::debug!(guild_id, key, error = %e, "Use rejected");
        })
    }

    pub fn on_trait_reuse(
        &mut self,
        guild_id: GuildId,
        key: &str,
        now_ms: i64,
    ) -> Result<TraitActivation, UseRejected> {
        self.session_mut(guild_id).reuse_trait(key, now_ms).inspect_err(|e| {
            tracing::debug!(guild_id, key, error = %e, "Reuse rejected");
        })
    }

    pub fn on_swap(
        &mut self,
        guild_id: GuildId,
        new_key: &str,
        now_ms: i64,
    ) -> Result<SwapReport, SwapNotAllowed> {
        self.session_mut(guild_id).swap(new_key, now_ms).inspect_err(|e| {
            tracing::debug!(guild_id, new_key, error = %e, "Swap rejected");
        })
    }

    // ─── Time and output ────────────────────────────────────────────────────

    /// Advance every session to `now_ms`. Returns the callbacks dispatched.
    pub fn advance_all(&mut self, now_ms: i64) -> usize {
        self.sessions
            .values_mut()
            .map(|session| session.advance_to(now_ms))
            .sum()
    }

    /// Earliest pending timer across all guilds
    pub fn next_deadline(&self) -> Option<i64> {
        self.sessions.values().filter_map(MatchSession::next_deadline).min()
    }

    /// Drain every session's outbox into the sinks
    pub fn flush(&mut self, announcer: &mut dyn AnnouncementSink, panel: &mut dyn PanelSink) {
        for session in self.sessions.values_mut() {
            session.flush(announcer, panel);
        }
    }
}
