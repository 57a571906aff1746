use chrono::{DateTime, TimeZone, Utc};
use shadow_game::constants::{PUZZLE_SOLVED, STORAGE_KEY};
use shadow_game::{
    CompanionSession, CosmeticCatalog, MemoryPhase, MemoryStore, MemoryTap, MinigameId,
    ProgressionEngine, Route, Snapshot,
};

fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 10, day, hour, minute, 0).unwrap()
}

fn guest_session(store: MemoryStore) -> CompanionSession<MemoryStore> {
    let mut session = CompanionSession::new(store, 0xC0FFEE, at(1, 18, 0));
    session.finish_splash(at(1, 18, 0));
    session.login_as_guest(at(1, 18, 0));
    session
}

#[test]
fn fifty_five_xp_from_fresh_state() {
    let mut engine = ProgressionEngine::new(CosmeticCatalog::default(), at(1, 0, 0));
    engine.apply_xp(55);
    assert_eq!(engine.state().level(), 2);
    assert_eq!(engine.state().xp(), 5);
    assert_eq!(engine.state().xp_to_next_level(), 75);
}

#[test]
fn solved_puzzle_is_an_immediate_win() {
    let mut session = guest_session(MemoryStore::new());
    session.start_puzzle_with_board(PUZZLE_SOLVED, at(1, 18, 5)).unwrap();
    let result = session.last_result().unwrap();
    assert!(result.won);
    assert_eq!(result.xp, 10);
    let puzzle = session.active_round().unwrap().as_puzzle().unwrap();
    assert_eq!(puzzle.moves(), 0);
    let record = session.history().iter().next().unwrap();
    assert_eq!(record.game_name, "Shadow Puzzle");
    assert_eq!(record.xp_earned, 10);
}

#[test]
fn memory_level_five_perfect_run_wins_ten_xp() {
    let mut session = guest_session(MemoryStore::new());
    let xp_before = session.engine().state().xp();
    let ticket = session.start_memory_at_level(5, at(1, 18, 10)).unwrap();
    while session.active_round().unwrap().as_memory().unwrap().phase() == MemoryPhase::Showing {
        session.advance(ticket, 100, at(1, 18, 10));
    }
    let sequence = session
        .active_round()
        .unwrap()
        .as_memory()
        .unwrap()
        .sequence()
        .to_vec();
    assert_eq!(sequence.len(), 7);
    let mut last = MemoryTap::Ignored;
    for candle in sequence {
        last = session.memory_tap(ticket, candle, at(1, 18, 11));
    }
    assert_eq!(last, MemoryTap::Won);
    let result = session.last_result().unwrap();
    assert!(result.won);
    assert_eq!(result.xp, 10);
    assert_eq!(session.engine().state().xp(), xp_before + 10);
}

#[test]
fn ghost_round_settles_at_timeout() {
    let mut session = guest_session(MemoryStore::new());
    let ticket = session.start_round(MinigameId::TapGhost, at(1, 19, 0)).unwrap();
    let mut settled = None;
    for _ in 0..400 {
        let ids: Vec<u64> = session
            .active_round()
            .and_then(|round| round.as_ghost())
            .map(|ghost| {
                if ghost.score() < 10 {
                    ghost.ghosts().iter().map(|g| g.id).take(1).collect()
                } else {
                    Vec::new()
                }
            })
            .unwrap_or_default();
        for id in ids {
            session.ghost_tap(ticket, id, at(1, 19, 0));
        }
        if let Some(result) = session.advance(ticket, 100, at(1, 19, 1)) {
            settled = Some(result);
            break;
        }
    }
    let result = settled.expect("round ends after thirty seconds");
    assert!((10..=12).contains(&result.score));
    assert_eq!(result.xp, 8);
    assert_eq!(session.history().len(), 1);
    assert_eq!(
        session.history().latest_for(MinigameId::TapGhost).unwrap().score,
        result.score
    );
}

#[test]
fn replaced_round_timers_never_reach_shared_state() {
    let mut session = guest_session(MemoryStore::new());
    let first = session.start_round(MinigameId::TapGhost, at(1, 20, 0)).unwrap();
    session.advance(first, 29_000, at(1, 20, 0));
    let second = session.start_round(MinigameId::ShadowPuzzle, at(1, 20, 1)).unwrap();

    // The first round would have timed out here.
    assert!(session.advance(first, 5_000, at(1, 20, 1)).is_none());
    assert_eq!(session.ghost_tap(first, 0, at(1, 20, 1)), None);
    assert!(session.history().is_empty());
    assert_eq!(session.active_ticket(), Some(second));

    session.navigate(Route::Home, at(1, 20, 2));
    assert!(session.active_round().is_none());
    assert!(session.advance(second, 1_000, at(1, 20, 2)).is_none());
    assert!(session.history().is_empty());
}

#[test]
fn diary_line_is_fixed_per_day() {
    let mut session = guest_session(MemoryStore::new());
    let today = at(1, 21, 0).date_naive();
    assert!(session.today_line(today).is_none());
    session.navigate(Route::Diary, at(1, 21, 0));
    let line = session.today_line(today).unwrap().to_string();
    for _ in 0..5 {
        assert_eq!(session.open_diary(today).line, line);
    }
    assert_eq!(session.diary().len(), 1);

    let tomorrow = at(2, 9, 0).date_naive();
    session.open_diary(tomorrow);
    assert_eq!(session.diary().len(), 2);
    assert_eq!(session.diary().entries()[0].date, tomorrow);
}

#[test]
fn snapshot_round_trip_keeps_invariants() {
    let store = MemoryStore::new();
    let mut session = guest_session(store.clone());
    for game in MinigameId::ALL {
        let ticket = session.start_round(game, at(1, 22, 0)).unwrap();
        session.advance(ticket, 40_000, at(1, 22, 1));
    }
    session.start_puzzle_with_board(PUZZLE_SOLVED, at(1, 22, 2)).unwrap();
    session.save().unwrap();

    let saved = Snapshot::from_json(&store.raw(STORAGE_KEY).unwrap()).unwrap();
    let reopened = CompanionSession::open(store, 0xC0FFEE);
    assert_eq!(reopened.snapshot(), saved);
    let state = reopened.engine().state();
    assert!(state.xp() < state.xp_to_next_level());
    assert_eq!(reopened.history().len(), session.history().len());
    assert_eq!(reopened.profile_summary(), session.profile_summary());
}

#[test]
fn old_snapshot_without_new_fields_loads() {
    let store = MemoryStore::new();
    store.put_raw(
        STORAGE_KEY,
        r#"{"companion":{"level":2,"xp":10,"xp_to_next_level":75,
            "current_skin":"classic","current_background":"graveyard",
            "unlocked_skins":["classic"],"unlocked_backgrounds":["haunted-house","graveyard"],
            "mood":"sleepy","last_interaction":"2025-09-30T12:00:00Z"}}"#,
    );
    let session = CompanionSession::open(store, 1);
    assert_eq!(session.engine().state().level(), 2);
    assert_eq!(session.engine().state().current_background(), "graveyard");
    assert!(session.settings().sound_enabled);
    assert!(!session.settings().festival_mode);
    assert_eq!(session.landing_route(), Route::Auth);
}
