//! Record, store and replay a play end to end.

use strumline_engine::{
    Chart, FiveFretEngine, FretMask, GameInput, GuitarAction, GuitarEngine,
    GuitarEngineParameters, GuitarNote, NoteKind, SyncTrack,
};
use strumline_replay::{
    ReplayRecorder, ReplayRunner, ReplaySlot, chart_hash, list_replays, load_replay,
    play_end_time, save_replay,
};
use tempfile::tempdir;

const CHART_JSON: &str = r#"{
    "notes": [
        {"time": 1.0, "tick": 480, "tick_end": 480, "note_mask": 1},
        {"time": 1.25, "tick": 600, "tick_end": 600, "note_mask": 2, "kind": "Hopo"},
        {"time": 1.5, "tick": 720, "tick_end": 720, "note_mask": 6},
        {"time": 2.0, "tick": 960, "tick_end": 1440, "note_mask": 8},
        {"time": 3.0, "tick": 1440, "tick_end": 1440, "note_mask": 64}
    ],
    "sync_track": {"resolution": 480, "tempos": [{"tick": 0, "bpm": 60.0}]}
}"#;

fn chart() -> Chart {
    serde_json::from_str(CHART_JSON).unwrap()
}

fn performance() -> Vec<GameInput> {
    vec![
        GameInput::press(0.98, GuitarAction::GreenFret),
        GameInput::press(1.01, GuitarAction::StrumDown),
        GameInput::release(1.03, GuitarAction::StrumDown),
        GameInput::press(1.24, GuitarAction::RedFret),
        GameInput::release(1.24, GuitarAction::GreenFret),
        GameInput::press(1.45, GuitarAction::YellowFret),
        GameInput::press(1.52, GuitarAction::StrumUp),
        GameInput::release(1.54, GuitarAction::StrumUp),
        // Overstrum between notes.
        GameInput::press(1.75, GuitarAction::StrumUp),
        GameInput::release(1.77, GuitarAction::StrumUp),
        GameInput::release(1.9, GuitarAction::RedFret),
        GameInput::release(1.9, GuitarAction::YellowFret),
        GameInput::press(1.95, GuitarAction::BlueFret),
        GameInput::press(2.0, GuitarAction::StrumDown),
        GameInput::release(2.02, GuitarAction::StrumDown),
        // Blue dropped halfway through its sustain.
        GameInput::release(2.5, GuitarAction::BlueFret),
        GameInput::press(3.02, GuitarAction::StrumDown),
        GameInput::release(3.04, GuitarAction::StrumDown),
    ]
}

/// Play `inputs` live, one update per input as a game loop would.
fn record(params: &GuitarEngineParameters, gamepad: bool) -> (ReplayRecorder, FiveFretEngine) {
    let chart = chart();
    let end_time = play_end_time(&chart, &performance());
    let mut recorder = ReplayRecorder::new(
        "player".to_string(),
        chart_hash(CHART_JSON.as_bytes()),
        params,
        gamepad,
        1.0,
    );
    let mut engine = FiveFretEngine::new(chart, params.clone(), false, gamepad).unwrap();

    for input in performance() {
        recorder.feed(&mut engine, input);
        engine.update(input.time);
    }
    engine.update(end_time);
    recorder.set_score(&engine);

    (recorder, engine)
}

// =========================================================================
// Recording
// =========================================================================

/// The scripted performance resolves every note the way it was played.
#[test]
fn test_recorded_performance() {
    let (recorder, engine) = record(&GuitarEngineParameters::default(), false);
    let stats = engine.stats();

    assert_eq!(stats.notes_hit, 5);
    assert_eq!(stats.notes_missed, 0);
    assert_eq!(stats.overstrums, 1);
    assert_eq!(stats.sustains_dropped, 1);
    assert_eq!(stats.max_combo, 3);
    assert_eq!(recorder.inputs().len(), performance().len());
}

// =========================================================================
// Storage and playback
// =========================================================================

/// A saved replay reproduces the recorded result exactly.
#[test]
fn test_saved_replay_reproduces_result() {
    let (recorder, _) = record(&GuitarEngineParameters::default(), false);
    let replay = recorder.into_replay_data();
    let recorded = replay.score.clone().unwrap();

    let dir = tempdir().unwrap();
    save_replay(dir.path(), &replay, ReplaySlot::SLOT_0).unwrap();
    let loaded = load_replay(dir.path(), &replay.chart_hash, ReplaySlot::SLOT_0)
        .unwrap()
        .unwrap();
    assert_eq!(loaded.inputs, performance());

    let mut runner = ReplayRunner::new(chart(), &loaded).unwrap();
    assert_eq!(runner.run_to_end(), recorded);
}

/// Tuning stored in the replay is what playback scores with.
#[test]
fn test_replay_uses_recorded_parameters() {
    let params = GuitarEngineParameters {
        max_multiplier: 1,
        strum_leniency: 0.0,
        strum_leniency_small: 0.0,
        ..Default::default()
    };
    let (recorder, _) = record(&params, false);
    let replay = recorder.into_replay_data();
    let recorded = replay.score.clone().unwrap();

    let mut runner = ReplayRunner::new(chart(), &replay).unwrap();
    assert_eq!(runner.run_to_end(), recorded);
    assert_eq!(runner.engine().state().params(), &params);
}

/// Gamepad replays keep gamepad semantics on playback.
#[test]
fn test_gamepad_replay() {
    let (recorder, engine) = record(&GuitarEngineParameters::default(), true);
    let replay = recorder.into_replay_data();
    assert!(replay.gamepad_mode);

    let mut runner = ReplayRunner::new(chart(), &replay).unwrap();
    let score = runner.run_to_end();
    assert!(runner.engine().is_gamepad_mode());
    assert_eq!(score.notes_hit, engine.stats().notes_hit);
    assert_eq!(Some(score), replay.score);
}

/// Several plays of one chart land in separate slots.
#[test]
fn test_multiple_slots() {
    let dir = tempdir().unwrap();
    let (first, _) = record(&GuitarEngineParameters::default(), false);
    let (second, _) = record(&GuitarEngineParameters::default(), true);
    let first = first.into_replay_data();
    let second = second.into_replay_data();

    save_replay(dir.path(), &first, ReplaySlot::SLOT_0).unwrap();
    save_replay(dir.path(), &second, ReplaySlot::SLOT_1).unwrap();

    let listed = list_replays(dir.path(), &first.chart_hash);
    assert_eq!(listed.len(), 2);
    assert!(!listed[0].1.gamepad_mode);
    assert!(listed[1].1.gamepad_mode);
}

/// Seeking backwards and forwards lands on the same events as a straight run.
#[test]
fn test_seek_matches_straight_run() {
    let (recorder, _) = record(&GuitarEngineParameters::default(), false);
    let replay = recorder.into_replay_data();

    let mut straight = ReplayRunner::new(chart(), &replay).unwrap();
    straight.advance_to(2.25);
    let expected = straight.drain_events();

    let mut seeking = ReplayRunner::new(chart(), &replay).unwrap();
    seeking.seek(2.75);
    seeking.seek(2.25);
    assert_eq!(seeking.drain_events(), expected);
    assert_eq!(seeking.current_time(), 2.25);
}

/// Chart files mark open notes with bit 6 and default to strum notes.
#[test]
fn test_chart_file_format() {
    let chart = chart();
    let open = &chart.notes()[4];
    assert_eq!(open.note_mask(), FretMask::OPEN);
    assert_eq!(open.kind(), NoteKind::Strum);

    let built = GuitarNote::new(3.0, 1440, FretMask::OPEN, NoteKind::Strum);
    assert_eq!(open.note_mask(), built.note_mask());
    assert_eq!(chart.sync_track(), &SyncTrack::constant(480, 60.0).unwrap());
}
