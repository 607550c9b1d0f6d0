//! Builders for test charts and input sequences.

#![allow(dead_code)]

use strumline_engine::{
    Chart, FiveFretEngine, GameInput, GuitarAction, GuitarEngine, GuitarEngineParameters,
    GuitarNote, NoteKind, SyncTrack,
};
use strumline_engine::{Fret, FretMask};

/// Ticks per beat of every test chart. At 60 bpm one beat is one second.
pub const RESOLUTION: u32 = 480;

pub fn tick(time: f64) -> u32 {
    (time * RESOLUTION as f64).round() as u32
}

/// Fluent builder for a 60 bpm chart.
#[derive(Debug, Default)]
pub struct ChartBuilder {
    notes: Vec<GuitarNote>,
}

impl ChartBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strum(self, time: f64, mask: FretMask) -> Self {
        self.note(time, mask, NoteKind::Strum)
    }

    pub fn hopo(self, time: f64, mask: FretMask) -> Self {
        self.note(time, mask, NoteKind::Hopo)
    }

    pub fn tap(self, time: f64, mask: FretMask) -> Self {
        self.note(time, mask, NoteKind::Tap)
    }

    pub fn note(mut self, time: f64, mask: FretMask, kind: NoteKind) -> Self {
        self.notes.push(GuitarNote::new(time, tick(time), mask, kind));
        self
    }

    /// Strum note sustained until `end` seconds.
    pub fn sustain(mut self, time: f64, end: f64, mask: FretMask, extended: bool) -> Self {
        let note = GuitarNote::new(time, tick(time), mask, NoteKind::Strum)
            .with_sustain(tick(end), extended);
        self.notes.push(note);
        self
    }

    pub fn build(self) -> Chart {
        let sync = SyncTrack::constant(RESOLUTION, 60.0).unwrap();
        Chart::new(self.notes, sync).unwrap()
    }
}

pub fn engine(chart: Chart) -> FiveFretEngine {
    FiveFretEngine::new(chart, GuitarEngineParameters::default(), false, false).unwrap()
}

pub fn engine_with(chart: Chart, params: GuitarEngineParameters) -> FiveFretEngine {
    FiveFretEngine::new(chart, params, false, false).unwrap()
}

pub fn gamepad_engine(chart: Chart, params: GuitarEngineParameters) -> FiveFretEngine {
    FiveFretEngine::new(chart, params, false, true).unwrap()
}

pub fn bot_engine(chart: Chart) -> FiveFretEngine {
    FiveFretEngine::new(chart, GuitarEngineParameters::default(), true, false).unwrap()
}

pub fn fret_action(fret: Fret) -> GuitarAction {
    GuitarAction::from_fret(fret)
}

/// Queue a press of every fret in `mask`.
pub fn press(engine: &mut impl GuitarEngine, time: f64, mask: FretMask) {
    for fret in mask.frets() {
        engine.queue_input(GameInput::press(time, fret_action(fret)));
    }
}

/// Queue a release of every fret in `mask`.
pub fn release(engine: &mut impl GuitarEngine, time: f64, mask: FretMask) {
    for fret in mask.frets() {
        engine.queue_input(GameInput::release(time, fret_action(fret)));
    }
}

pub fn strum(engine: &mut impl GuitarEngine, time: f64) {
    engine.queue_input(GameInput::press(time, GuitarAction::StrumDown));
    engine.queue_input(GameInput::release(time, GuitarAction::StrumDown));
}

