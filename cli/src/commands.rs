use std::sync::Arc;

use traitwatch_core::clock::epoch_millis;
use traitwatch_core::session::{MatchSnapshot, TraitView};
use traitwatch_core::{GuildStore, TraitCatalog};
use traitwatch_types::formatting::{format_charge, format_countdown, format_elapsed};
use traitwatch_types::{GuildId, TraitMode};

use crate::config::AppConfig;
use crate::sinks::{PanelPrinter, VoiceSink};

/// Everything the REPL acts on
pub struct Repl {
    pub store: GuildStore,
    pub guild_id: GuildId,
    pub config: AppConfig,
    voice: VoiceSink,
    panel: PanelPrinter,
}

impl Repl {
    pub fn new(config: AppConfig, catalog: TraitCatalog) -> Self {
        let store = GuildStore::new(Arc::new(catalog), Arc::new(config.engine.clone()));
        Self {
            store,
            guild_id: config.guild_id,
            voice: VoiceSink::new(config.audio_dir.clone()),
            panel: PanelPrinter::default(),
            config,
        }
    }

    /// Run due timers, deliver queued output and redraw dirty panels
    pub fn tick(&mut self, now_ms: i64) {
        self.store.advance_all(now_ms);
        self.flush(now_ms);
    }

    pub fn flush(&mut self, now_ms: i64) {
        self.store.flush(&mut self.voice, &mut self.panel);
        for guild_id in self.panel.take_dirty() {
            if let Some(session) = self.store.get(guild_id) {
                println!("{}", render_panel(&session.snapshot(now_ms)));
            }
        }
    }
}

// ─── Lifecycle ──────────────────────────────────────────────────────────────

pub fn start(repl: &mut Repl) -> Result<(), String> {
    report(repl.store.on_match_start(repl.guild_id, epoch_millis()));
    Ok(())
}

pub fn end(repl: &mut Repl) -> Result<(), String> {
    report(repl.store.on_match_end(repl.guild_id, epoch_millis()));
    Ok(())
}

pub fn next(repl: &mut Repl) -> Result<(), String> {
    report(repl.store.on_match_reset(repl.guild_id, epoch_millis()));
    Ok(())
}

// ─── Trait actions ──────────────────────────────────────────────────────────

pub fn use_trait(repl: &mut Repl, key: &str) -> Result<(), String> {
    match repl.store.on_trait_used(repl.guild_id, key, epoch_millis()) {
        Ok(activation) => println!("{activation:?}"),
        Err(e) => println!("ignored: {e}"),
    }
    Ok(())
}

pub fn reuse_trait(repl: &mut Repl, key: &str) -> Result<(), String> {
    match repl.store.on_trait_reuse(repl.guild_id, key, epoch_millis()) {
        Ok(activation) => println!("{activation:?}"),
        Err(e) => println!("ignored: {e}"),
    }
    Ok(())
}

pub fn swap(repl: &mut Repl, key: &str) -> Result<(), String> {
    match repl.store.on_swap(repl.guild_id, key, epoch_millis()) {
        Ok(report) => println!("swapped {} -> {} ({:?})", report.from, report.to, report.converted),
        Err(e) => println!("ignored: {e}"),
    }
    Ok(())
}

// ─── Inspection ─────────────────────────────────────────────────────────────

pub fn status(repl: &mut Repl, json: bool) -> Result<(), String> {
    let now = epoch_millis();
    let snapshot = repl.store.session_mut(repl.guild_id).snapshot(now);
    if json {
        let text = serde_json::to_string_pretty(&snapshot).map_err(|e| e.to_string())?;
        println!("{text}");
    } else {
        println!("{}", render_panel(&snapshot));
    }
    Ok(())
}

pub fn list_traits(repl: &Repl) -> Result<(), String> {
    for def in repl.store.catalog().iter() {
        let mode = match def.mode {
            TraitMode::Scalar {
                initial_secs,
                steady_secs,
                cap_secs,
            } => match cap_secs {
                Some(cap) => format!("{initial_secs}s / {steady_secs}s (cap {cap}s)"),
                None => format!("{initial_secs}s / {steady_secs}s"),
            },
            TraitMode::Stacking {
                max_stacks,
                first_charge_secs,
                charge_interval_secs,
            } => format!("{max_stacks} stacks, {first_charge_secs}s then {charge_interval_secs}s"),
        };
        println!("{:<12} {:<12} {}", def.key, def.name, mode);
    }
    Ok(())
}

pub fn set_guild(repl: &mut Repl, guild_id: GuildId) -> Result<(), String> {
    repl.guild_id = guild_id;
    repl.config.guild_id = guild_id;
    repl.config.store();
    println!("acting on guild {guild_id}");
    Ok(())
}

pub fn exit() {
    println!("bye");
}

fn report<E: std::fmt::Display>(result: Result<(), E>) {
    if let Err(e) = result {
        println!("ignored: {e}");
    }
}

/// Plain-text status block
pub fn render_panel(snapshot: &MatchSnapshot) -> String {
    let mut lines = vec![format!(
        "── guild {} ── {} {}{}",
        snapshot.guild_id,
        snapshot.phase,
        format_elapsed(snapshot.elapsed_ms),
        if snapshot.used_swap { " (swap used)" } else { "" },
    )];

    for headline in &snapshot.headline {
        lines.push(format!(
            "  {:<12} {}",
            headline.name,
            format_countdown(headline.remaining_secs, "READY")
        ));
    }

    for entry in &snapshot.traits {
        let marker = if entry.revealed { "*" } else { " " };
        let state = match &entry.view {
            TraitView::Scalar(view) => format_countdown(view.remaining_secs, "READY"),
            TraitView::Stacking(view) => format_charge(view.stacks, view.max_stacks, view.partial_progress),
        };
        lines.push(format!("{marker} {:<12} {state}", entry.name));
    }

    lines.join("\n")
}
