//! Lifecycle scenarios for a match session
//!
//! Everything runs in virtual time: each call passes an explicit `now_ms`.

use std::sync::Arc;

use traitwatch_types::{EngineConfig, Token, TraitDefinition, TraitMode};

use super::{MatchPhase, MatchSession, TraitActivation, TraitRuntime, TraitView};
use crate::catalog::TraitCatalog;
use crate::convert::Converted;
use crate::error::{SwapNotAllowed, UnknownTraitError, UseRejected};
use crate::timers::TimerOwner;

fn session() -> MatchSession {
    let catalog = TraitCatalog::builtin().unwrap();
    MatchSession::new(7, Arc::new(catalog), Arc::new(EngineConfig::default()))
}

/// Announcements as `(seconds, text)`, draining the outbox
fn spoken(session: &mut MatchSession) -> Vec<(i64, String)> {
    session
        .take_announcements()
        .into_iter()
        .map(|a| (a.at_ms / 1000, a.text()))
        .collect()
}

/// Seconds at which announcements about `token` were made
fn times_for(session: &mut MatchSession, token: &str) -> Vec<i64> {
    let trait_token = Token::for_trait(token);
    session
        .take_announcements()
        .into_iter()
        .filter(|a| a.tokens.first() == Some(&trait_token))
        .map(|a| a.at_ms / 1000)
        .collect()
}

// ─── Start / headline ────────────────────────────────────────────────────────

#[test]
fn start_seeds_headline_and_unlock() {
    let mut s = session();
    s.start(0).unwrap();
    assert_eq!(s.phase(), MatchPhase::Active);
    assert_eq!(s.timers().pending_for(&TimerOwner::Headline), 4);
    assert_eq!(s.timers().pending_for(&TimerOwner::Match), 1);
    assert!(s.take_panel_refresh());

    s.advance_to(200_000);
    assert_eq!(
        spoken(&mut s),
        vec![
            (0, "shiai_kaishi".to_string()),
            (40, "kofun tsukae_masu".to_string()),
            (45, "shunkan tsukae_masu".to_string()),
            (50, "ikei tsukae_masu".to_string()),
            (60, "shinshutsu tsukae_masu".to_string()),
            (120, "uramuki tsukae_masu".to_string()),
        ]
    );
    assert_eq!(s.timers().pending(), 0);
}

#[test]
fn start_twice_is_an_invalid_transition() {
    let mut s = session();
    s.start(0).unwrap();
    let pending = s.timers().pending();
    let err = s.start(1_000).unwrap_err();
    assert_eq!(err.phase, MatchPhase::Active);
    assert_eq!(s.timers().pending(), pending);
}

// ─── Use / reuse ─────────────────────────────────────────────────────────────

#[test]
fn reuse_at_ready_counts_down_through_every_mark() {
    let mut s = session();
    s.start(0).unwrap();

    let activation = s.reuse_trait("kofun", 40_000).unwrap();
    assert_eq!(
        activation,
        TraitActivation::Used {
            key: "kofun".to_string(),
            cycle_secs: 100
        }
    );
    s.take_announcements();

    s.advance_to(300_000);
    assert_eq!(times_for(&mut s, "kofun"), vec![80, 110, 130, 135, 137, 138, 139, 140]);
}

#[test]
fn use_announces_and_cancels_headline() {
    let mut s = session();
    s.start(0).unwrap();
    s.advance_to(41_000);
    s.take_announcements();

    s.use_trait("ijou", 41_000).unwrap();
    assert_eq!(spoken(&mut s), vec![(41, "hunter_ga ijou wo_shiyou".to_string())]);
    assert_eq!(s.timers().pending_for(&TimerOwner::Headline), 0);

    s.advance_to(70_000);
    assert!(times_for(&mut s, "shunkan").is_empty());
}

#[test]
fn early_reveal_runs_the_initial_cycle() {
    let mut s = session();
    s.start(0).unwrap();
    s.take_announcements();

    let activation = s.use_trait("shunkan", 12_300).unwrap();
    assert_eq!(
        activation,
        TraitActivation::Identified {
            key: "shunkan".to_string(),
            remaining_secs: 33
        }
    );
    assert!(spoken(&mut s).is_empty(), "identification is silent");

    s.advance_to(100_000);
    let announcements = s.take_announcements();
    let marks: Vec<_> = announcements
        .iter()
        .filter(|a| a.tokens.first() == Some(&Token::for_trait("shunkan")))
        .map(|a| a.tokens.clone())
        .collect();
    assert_eq!(marks.len(), 4, "30, 10, 5 and ready; no fine marks");
    assert_eq!(marks[3], vec![Token::for_trait("shunkan"), Token::Ready]);
    let ready_at = announcements
        .iter()
        .find(|a| a.tokens == vec![Token::for_trait("shunkan"), Token::Ready])
        .map(|a| a.at_ms);
    assert_eq!(ready_at, Some(45_000));
}

#[test]
fn reuse_cycle_has_fine_marks() {
    let mut s = session();
    s.start(0).unwrap();
    s.use_trait("junshisha", 10_000).unwrap();
    s.advance_to(30_000);

    s.reuse_trait("junshisha", 30_000).unwrap();
    s.take_announcements();
    s.advance_to(200_000);
    let times = times_for(&mut s, "junshisha");
    assert_eq!(times, vec![60, 90, 110, 115, 117, 118, 119, 120]);
}

#[test]
fn capped_trait_cycles_on_its_cap() {
    let capped = TraitDefinition {
        key: "listen".to_string(),
        name: "Listen".to_string(),
        token: "listen".to_string(),
        mode: TraitMode::Scalar {
            initial_secs: 20,
            steady_secs: 120,
            cap_secs: Some(80),
        },
    };
    let config = EngineConfig {
        headline_traits: Vec::new(),
        ..EngineConfig::default()
    };
    let catalog = TraitCatalog::from_definitions([capped]);
    let mut s = MatchSession::new(7, Arc::new(catalog), Arc::new(config));
    s.start(0).unwrap();

    assert_eq!(
        s.use_trait("listen", 30_000),
        Ok(TraitActivation::Used {
            key: "listen".to_string(),
            cycle_secs: 80
        })
    );
    assert_eq!(
        s.reuse_trait("listen", 110_000),
        Ok(TraitActivation::Used {
            key: "listen".to_string(),
            cycle_secs: 80
        })
    );
}

#[test]
fn reuse_before_ready_is_rejected() {
    let mut s = session();
    s.start(0).unwrap();
    s.use_trait("kofun", 40_000).unwrap();
    let pending = s.timers().pending();

    let err = s.reuse_trait("kofun", 50_000).unwrap_err();
    assert_eq!(
        err,
        UseRejected::NotReady {
            key: "kofun".to_string(),
            remaining_secs: 90
        }
    );
    assert_eq!(s.timers().pending(), pending);
}

#[test]
fn use_rejections() {
    let mut s = session();
    assert_eq!(s.use_trait("kofun", 0), Err(UseRejected::MatchInactive));

    s.start(0).unwrap();
    assert_eq!(
        s.use_trait("nope", 0),
        Err(UseRejected::UnknownTrait(UnknownTraitError::new("nope")))
    );

    s.use_trait("kofun", 50_000).unwrap();
    assert_eq!(
        s.use_trait("kofun", 51_000),
        Err(UseRejected::AlreadyRevealed {
            key: "kofun".to_string()
        })
    );
    assert_eq!(
        s.use_trait("ikei", 51_000),
        Err(UseRejected::OtherTraitRevealed {
            revealed: "kofun".to_string()
        })
    );
    assert_eq!(
        s.reuse_trait("ikei", 51_000),
        Err(UseRejected::OtherTraitRevealed {
            revealed: "kofun".to_string()
        })
    );
}

// ─── Stacking ────────────────────────────────────────────────────────────────

#[test]
fn stacking_trait_charges_and_consumes() {
    let mut s = session();
    s.start(0).unwrap();
    assert_eq!(
        s.use_trait("kanshisha", 0),
        Ok(TraitActivation::Charging {
            key: "kanshisha".to_string()
        })
    );

    let err = s.reuse_trait("kanshisha", 500).unwrap_err();
    assert!(matches!(err, UseRejected::InsufficientCharge(_)));

    s.take_announcements();
    s.advance_to(70_000);
    assert_eq!(
        spoken(&mut s),
        vec![
            (10, "kanshisha hitotsu_kaifuku".to_string()),
            (40, "kanshisha futatsu_kaifuku".to_string()),
            (70, "kanshisha mantan".to_string()),
        ]
    );

    assert_eq!(
        s.reuse_trait("kanshisha", 75_000),
        Ok(TraitActivation::Consumed {
            key: "kanshisha".to_string(),
            stacks_left: 2
        })
    );
    let Some(TraitRuntime::Stacking(state)) = s.trait_runtime("kanshisha") else {
        panic!("expected stacking runtime");
    };
    assert_eq!(state.stacks, 2);
    assert_eq!(state.remaining_to_full_ms(), 30_000);
}

// ─── Swap ────────────────────────────────────────────────────────────────────

#[test]
fn swap_carries_over_the_remaining_fraction() {
    let mut s = session();
    s.start(0).unwrap();
    s.use_trait("kofun", 40_000).unwrap();

    let report = s.swap("shinshutsu", 90_000).unwrap();
    assert_eq!(report.from, "kofun");
    assert_eq!(report.converted, Converted::Scalar { remaining_secs: 75 });
    assert!(s.state().used_swap);
    assert_eq!(s.state().revealed_trait.as_deref(), Some("shinshutsu"));
    assert!(s.trait_runtime("kofun").is_none());
    assert_eq!(s.timers().pending_for(&TimerOwner::for_trait("kofun")), 0);

    s.take_announcements();
    s.advance_to(400_000);
    let announcements = s.take_announcements();
    let about = |token: &str| -> Vec<i64> {
        let token = Token::for_trait(token);
        announcements
            .iter()
            .filter(|a| a.tokens.first() == Some(&token))
            .map(|a| a.at_ms / 1000)
            .collect()
    };
    assert!(about("kofun").is_empty());
    assert_eq!(about("shinshutsu").last(), Some(&165));

    assert_eq!(s.swap("ikei", 100_000), Err(SwapNotAllowed::AlreadyUsed));
}

#[test]
fn swap_to_stacking_seeds_the_charge() {
    let mut s = session();
    s.start(0).unwrap();
    s.use_trait("kofun", 40_000).unwrap();

    let report = s.swap("kanshisha", 90_000).unwrap();
    let Converted::Stacking { seed, .. } = report.converted else {
        panic!("expected stacking conversion");
    };
    // 50 of 100s left is 45 on the scale: 70 - 45 = 25s charged
    assert_eq!(seed.stacks, 1);
    assert_eq!(seed.partial_progress, 0.5);

    let snapshot = s.snapshot(90_000);
    assert_eq!(snapshot.traits.len(), 1);
    let TraitView::Stacking(view) = &snapshot.traits[0].view else {
        panic!("expected stacking view");
    };
    assert_eq!(view.stacks, 1);
    assert_eq!(view.partial_progress, 0.5);
    assert_eq!(view.remaining_to_full_secs, 45);
}

#[test]
fn swap_from_stacking_counts_charge_since_last_tick() {
    let mut s = session();
    s.start(0).unwrap();
    s.use_trait("kanshisha", 0).unwrap();

    // One charge at 10s, then 15.5s toward the next: 44.5s to full
    let report = s.swap("kofun", 25_500).unwrap();
    assert_eq!(report.converted, Converted::Scalar { remaining_secs: 63 });
    assert!(s.trait_runtime("kanshisha").is_none());
    assert_eq!(s.timers().pending_for(&TimerOwner::for_trait("kanshisha")), 0);
}

#[test]
fn swap_when_ready_announces_ready_and_schedules_no_marks() {
    let mut s = session();
    s.start(0).unwrap();
    s.use_trait("kofun", 40_000).unwrap();
    s.advance_to(150_000);
    s.take_announcements();

    let report = s.swap("ikei", 150_000).unwrap();
    assert_eq!(report.converted, Converted::Scalar { remaining_secs: 0 });
    assert_eq!(spoken(&mut s), vec![(150, "ikei tsukae_masu".to_string())]);
    let Some(TraitRuntime::Scalar(state)) = s.trait_runtime("ikei") else {
        panic!("expected scalar runtime");
    };
    assert_eq!(state.pending_marks(), 0);
    assert_eq!(s.timers().pending_for(&TimerOwner::for_trait("ikei")), 1);
}

#[test]
fn short_swapped_cycle_only_fires_ready() {
    let mut s = session();
    s.start(0).unwrap();
    s.use_trait("kofun", 40_000).unwrap();

    // 3s left on kofun, 3s on ijou's 90s base
    let report = s.swap("ijou", 137_000).unwrap();
    assert_eq!(report.converted, Converted::Scalar { remaining_secs: 3 });
    s.take_announcements();

    s.advance_to(200_000);
    assert_eq!(times_for(&mut s, "ijou"), vec![140]);
}

#[test]
fn swap_rejections() {
    let mut s = session();
    assert_eq!(s.swap("kofun", 0), Err(SwapNotAllowed::MatchInactive));

    s.start(0).unwrap();
    assert_eq!(s.swap("kofun", 1_000), Err(SwapNotAllowed::NothingRevealed));

    s.use_trait("ikei", 60_000).unwrap();
    assert_eq!(
        s.swap("ikei", 61_000),
        Err(SwapNotAllowed::SameTrait {
            key: "ikei".to_string()
        })
    );
    assert_eq!(
        s.swap("nope", 61_000),
        Err(SwapNotAllowed::UnknownTrait(UnknownTraitError::new("nope")))
    );
    assert!(!s.state().used_swap);
}

// ─── End / reset ─────────────────────────────────────────────────────────────

#[test]
fn nothing_fires_after_end() {
    let mut s = session();
    s.start(0).unwrap();
    s.use_trait("kanshisha", 5_000).unwrap();
    s.end(6_000).unwrap();

    assert_eq!(s.timers().pending(), 0);
    assert_eq!(s.state().revealed_trait.as_deref(), Some("kanshisha"));
    assert_eq!(spoken(&mut s).last(), Some(&(6, "shiai_shuuryou".to_string())));

    s.advance_to(10_000_000);
    assert!(s.take_announcements().is_empty());
    assert!(s.end(7_000).is_err());
}

#[test]
fn reset_restarts_from_a_clean_slate() {
    let mut s = session();
    s.start(0).unwrap();
    s.use_trait("kofun", 40_000).unwrap();
    s.swap("ikei", 50_000).unwrap();
    s.take_announcements();

    s.reset(60_000).unwrap();
    assert_eq!(
        spoken(&mut s),
        vec![(60, "shiai_shuuryou".to_string()), (60, "shiai_kaishi".to_string())]
    );
    assert!(s.is_active());
    assert!(!s.state().used_swap);
    assert_eq!(s.state().revealed_trait, None);
    assert!(s.trait_runtime("ikei").is_none());
    assert_eq!(s.timers().pending(), 5);

    s.end(70_000).unwrap();
    s.reset(80_000).unwrap();
    assert_eq!(s.state().started_at_ms, Some(80_000));
}

#[test]
fn start_after_end_discards_leftover_runtime() {
    let mut s = session();
    s.start(0).unwrap();
    s.use_trait("kofun", 40_000).unwrap();
    s.end(50_000).unwrap();

    s.start(60_000).unwrap();
    assert!(s.trait_runtime("kofun").is_none());
    assert_eq!(s.state().revealed_trait, None);
    assert!(s.use_trait("kofun", 61_000).is_ok());
}

// ─── Output ──────────────────────────────────────────────────────────────────

#[test]
fn panel_refreshes_periodically_while_a_cycle_runs() {
    let mut s = session();
    s.start(0).unwrap();
    s.use_trait("kofun", 40_000).unwrap();
    s.take_panel_refresh();

    s.advance_to(45_000);
    assert!(s.take_panel_refresh());
    s.advance_to(46_000);
    assert!(!s.take_panel_refresh());
}

#[test]
fn panel_keeps_refreshing_after_ready_until_the_match_ends() {
    let mut s = session();
    s.start(0).unwrap();
    s.use_trait("kofun", 40_000).unwrap();
    s.advance_to(140_000);
    assert!(s.take_announcements().iter().any(|a| a.tokens == vec![Token::for_trait("kofun"), Token::Ready]));
    s.take_panel_refresh();

    s.advance_to(200_000);
    assert!(s.is_active());
    assert!(s.take_panel_refresh());
    assert_eq!(s.timers().pending_for(&TimerOwner::for_trait("kofun")), 1);

    s.end(210_000).unwrap();
    s.take_panel_refresh();
    s.advance_to(300_000);
    assert!(!s.take_panel_refresh());
    assert_eq!(s.timers().pending(), 0);
}

#[test]
fn snapshot_serializes_for_the_panel() {
    let mut s = session();
    s.start(0).unwrap();

    let before = s.snapshot(10_000);
    assert_eq!(before.headline.len(), 4);
    assert_eq!(before.headline[0].remaining_secs, 30);
    assert_eq!(before.elapsed_ms, 10_000);

    s.use_trait("kofun", 40_000).unwrap();
    let json = serde_json::to_value(s.snapshot(50_000)).unwrap();
    assert_eq!(json["phase"], "active");
    assert_eq!(json["revealed_trait"], "kofun");
    assert_eq!(json["headline"].as_array().map(Vec::len), Some(0));
    assert_eq!(json["traits"][0]["view"]["mode"], "scalar");
    assert_eq!(json["traits"][0]["view"]["remaining_secs"], 90);
}
