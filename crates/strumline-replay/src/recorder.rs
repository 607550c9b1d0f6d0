//! Replay recorder for capturing gameplay inputs.

use log::trace;
use strumline_engine::{GameInput, GuitarEngine, GuitarEngineParameters};

use super::replay_data::{ReplayData, ReplayScore};

/// Records inputs during gameplay for replay.
pub struct ReplayRecorder {
    replay_data: ReplayData,
}

impl ReplayRecorder {
    /// Create a new recorder for the given chart and engine setup.
    pub fn new(
        player: String,
        chart_hash: String,
        params: &GuitarEngineParameters,
        gamepad_mode: bool,
        speed: f64,
    ) -> Self {
        Self {
            replay_data: ReplayData::new(player, chart_hash, params, gamepad_mode, speed),
        }
    }

    /// Record an input without delivering it anywhere.
    pub fn record(&mut self, input: GameInput) {
        trace!("Recording {:?} at {}", input.action, input.time);
        self.replay_data.inputs.push(input);
    }

    /// Record an input and queue it on `engine`.
    pub fn feed<E: GuitarEngine + ?Sized>(&mut self, engine: &mut E, input: GameInput) {
        self.record(input);
        engine.queue_input(input);
    }

    pub fn inputs(&self) -> &[GameInput] {
        &self.replay_data.inputs
    }

    /// Store the final result of the play.
    pub fn set_score<E: GuitarEngine + ?Sized>(&mut self, engine: &E) {
        self.replay_data.score = Some(ReplayScore::from_engine(engine));
    }

    /// Take the completed replay data.
    pub fn into_replay_data(self) -> ReplayData {
        self.replay_data
    }
}
