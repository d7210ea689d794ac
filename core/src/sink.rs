//! Output side of the core: announcements and panel refreshes.
//!
//! Sessions never call out while their state is borrowed. Outputs queue in
//! an [`Outbox`] and the host drains them into its sinks afterwards
//! (fire-and-forget: the core never learns whether delivery worked).

use serde::Serialize;
use traitwatch_types::{GuildId, Token};

/// Receives ordered token sequences to speak or display
pub trait AnnouncementSink {
    fn announce(&mut self, guild_id: GuildId, tokens: &[Token]);
}

/// Receives requests to redraw the guild's status panel. Must tolerate
/// redundant calls.
pub trait PanelSink {
    fn refresh_panel(&mut self, guild_id: GuildId);
}

/// One queued announcement
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Announcement {
    /// Virtual time the announcement was produced at
    pub at_ms: i64,
    pub tokens: Vec<Token>,
}

impl Announcement {
    /// Tokens joined by their stems, e.g. `kofun nokori 30byo`
    pub fn text(&self) -> String {
        self.tokens
            .iter()
            .map(|t| t.stem().into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Default)]
pub struct Outbox {
    announcements: Vec<Announcement>,
    panel_dirty: bool,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn announce(&mut self, at_ms: i64, tokens: Vec<Token>) {
        self.announcements.push(Announcement { at_ms, tokens });
    }

    pub fn refresh_panel(&mut self) {
        self.panel_dirty = true;
    }

    /// Take queued announcements (drains the queue)
    pub fn take_announcements(&mut self) -> Vec<Announcement> {
        std::mem::take(&mut self.announcements)
    }

    /// Whether a panel refresh was requested since the last take
    pub fn take_panel_refresh(&mut self) -> bool {
        std::mem::take(&mut self.panel_dirty)
    }

    pub fn is_empty(&self) -> bool {
        self.announcements.is_empty() && !self.panel_dirty
    }

    /// Deliver everything queued to the sinks. Redundant refreshes
    /// collapse into one call.
    pub fn flush(
        &mut self,
        guild_id: GuildId,
        announcer: &mut dyn AnnouncementSink,
        panel: &mut dyn PanelSink,
    ) {
        for announcement in self.take_announcements() {
            announcer.announce(guild_id, &announcement.tokens);
        }
        if self.take_panel_refresh() {
            panel.refresh_panel(guild_id);
        }
    }
}
