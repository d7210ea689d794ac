//! Terminal-side sinks: voice clip lookup and panel redraw requests

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use traitwatch_core::{AnnouncementSink, PanelSink};
use traitwatch_types::{GuildId, Token};

/// Clip extensions in lookup order
const AUDIO_EXTENSIONS: &[&str] = &["ogg", "wav"];

/// Resolves announcement tokens to voice clips and logs the sequence.
/// Playback itself is left to whatever consumes the log.
#[derive(Debug, Default)]
pub struct VoiceSink {
    audio_dir: Option<PathBuf>,
    /// Stems already reported missing, so each is warned about once
    missing: HashSet<String>,
}

impl VoiceSink {
    pub fn new(audio_dir: Option<PathBuf>) -> Self {
        Self {
            audio_dir,
            missing: HashSet::new(),
        }
    }

    /// Clip file for a stem, preferring `.ogg` over `.wav`
    pub fn resolve(&self, stem: &str) -> Option<PathBuf> {
        let dir = self.audio_dir.as_deref()?;
        resolve_in(dir, stem)
    }
}

fn resolve_in(dir: &Path, stem: &str) -> Option<PathBuf> {
    AUDIO_EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{stem}.{ext}")))
        .find(|path| path.is_file())
}

impl AnnouncementSink for VoiceSink {
    fn announce(&mut self, guild_id: GuildId, tokens: &[Token]) {
        let mut clips = Vec::with_capacity(tokens.len());
        for token in tokens {
            let stem = token.stem();
            match self.resolve(&stem) {
                Some(path) => clips.push(path),
                None => {
                    if self.audio_dir.is_some() && self.missing.insert(stem.to_string()) {
                        tracing::warn!(stem = %stem, "No voice clip for token");
                    }
                }
            }
        }

        let text = tokens.iter().map(Token::to_string).collect::<Vec<_>>().join(" ");
        tracing::info!(guild_id, %text, ?clips, "Announcement");
        println!("[{guild_id}] >> {text}");
    }
}

/// Collects redraw requests; the REPL renders them after each flush
#[derive(Debug, Default)]
pub struct PanelPrinter {
    dirty: Vec<GuildId>,
}

impl PanelPrinter {
    pub fn take_dirty(&mut self) -> Vec<GuildId> {
        std::mem::take(&mut self.dirty)
    }
}

impl PanelSink for PanelPrinter {
    fn refresh_panel(&mut self, guild_id: GuildId) {
        if !self.dirty.contains(&guild_id) {
            self.dirty.push(guild_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ogg_is_preferred_over_wav() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("kofun.wav"), b"").unwrap();
        std::fs::write(dir.path().join("nokori.ogg"), b"").unwrap();
        std::fs::write(dir.path().join("nokori.wav"), b"").unwrap();

        let sink = VoiceSink::new(Some(dir.path().to_path_buf()));
        assert_eq!(sink.resolve("kofun"), Some(dir.path().join("kofun.wav")));
        assert_eq!(sink.resolve("nokori"), Some(dir.path().join("nokori.ogg")));
        assert_eq!(sink.resolve("30byo"), None);
    }

    #[test]
    fn missing_clips_are_reported_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = VoiceSink::new(Some(dir.path().to_path_buf()));
        sink.announce(1, &[Token::for_trait("kofun"), Token::Ready]);
        sink.announce(1, &[Token::for_trait("kofun"), Token::Ready]);
        assert_eq!(sink.missing.len(), 2);
    }

    #[test]
    fn redraws_are_deduplicated() {
        let mut panel = PanelPrinter::default();
        panel.refresh_panel(1);
        panel.refresh_panel(2);
        panel.refresh_panel(1);
        assert_eq!(panel.take_dirty(), vec![1, 2]);
        assert!(panel.take_dirty().is_empty());
    }
}
