//! Replay playback: drives an engine from a recorded input log.

use anyhow::{Context, Result, bail};
use log::{debug, trace};
use strumline_engine::{Chart, EngineEvent, FiveFretEngine, GameInput, GuitarEngine};

use super::replay_data::{REPLAY_VERSION, ReplayData, ReplayScore};

/// Time played past the last note or input before a replay counts as over.
const END_MARGIN: f64 = 1.0;

/// Time by which every note of `chart` and every input has been resolved.
pub fn play_end_time(chart: &Chart, inputs: &[GameInput]) -> f64 {
    let last_note = chart
        .notes()
        .last()
        .map(|note| {
            let end = chart.sync_track().tick_to_time(note.tick_end());
            end.max(note.time())
        })
        .unwrap_or(0.0);
    let last_input = inputs.iter().map(|input| input.time).fold(0.0, f64::max);
    last_note.max(last_input) + END_MARGIN
}

/// Feeds a recorded input log through a fresh engine.
///
/// Playback advances from one interesting instant to the next (a recorded
/// input or an engine wake-up from [`GuitarEngine::next_queued_update`]), so
/// the result never depends on how far each call advances.
pub struct ReplayRunner {
    engine: FiveFretEngine,
    inputs: Vec<GameInput>,
    next_input: usize,
    end_time: f64,
}

impl ReplayRunner {
    /// Build a runner with the engine setup stored in `replay`.
    pub fn new(chart: Chart, replay: &ReplayData) -> Result<Self> {
        if replay.version > REPLAY_VERSION {
            bail!("Unsupported replay version {}", replay.version);
        }
        if !(replay.speed > 0.0 && replay.speed.is_finite()) {
            bail!("Replay has invalid speed {}", replay.speed);
        }

        let mut replay = replay.clone();
        replay.expand().context("Failed to expand replay input log")?;

        let mut engine =
            FiveFretEngine::from_serialized(chart, replay.params, false, replay.gamepad_mode)
                .context("Failed to build engine from replay")?;
        engine.set_speed(replay.speed);

        let end_time = play_end_time(engine.chart(), &replay.inputs);

        debug!(
            "Replay of {} inputs over {} notes, ending at {end_time}",
            replay.inputs.len(),
            engine.chart().len()
        );

        Ok(Self {
            engine,
            inputs: replay.inputs,
            next_input: 0,
            end_time,
        })
    }

    pub fn engine(&self) -> &FiveFretEngine {
        &self.engine
    }

    pub fn current_time(&self) -> f64 {
        self.engine.current_time()
    }

    /// Time after which nothing more can happen.
    pub fn end_time(&self) -> f64 {
        self.end_time
    }

    pub fn is_finished(&self) -> bool {
        self.next_input >= self.inputs.len() && self.current_time() >= self.end_time
    }

    /// Advance to the next interesting instant at or before `target`.
    ///
    /// Returns the time reached, or `None` once the engine is at `target` with
    /// no input left to apply there.
    pub fn step(&mut self, target: f64) -> Option<f64> {
        let now = self.engine.current_time();
        let input_time = self
            .inputs
            .get(self.next_input)
            .map(|input| input.time.max(now))
            .filter(|&time| time <= target);
        if target <= now && input_time.is_none() {
            return None;
        }

        let time = [input_time, self.engine.next_queued_update(target)]
            .into_iter()
            .flatten()
            .fold(target, f64::min);

        while let Some(input) = self.inputs.get(self.next_input) {
            if input.time > time {
                break;
            }
            self.engine.queue_input(*input);
            self.next_input += 1;
        }

        trace!("Replay step to {time}");
        self.engine.update(time);
        Some(time)
    }

    /// Play every input and wake-up up to `target`.
    pub fn advance_to(&mut self, target: f64) {
        while self.step(target).is_some() {}
    }

    /// Play the whole replay and return its result.
    pub fn run_to_end(&mut self) -> ReplayScore {
        self.advance_to(self.end_time);
        self.score()
    }

    /// Jump to `time`. Seeking backwards restarts the play and replays the
    /// log from the beginning.
    pub fn seek(&mut self, time: f64) {
        if time < self.current_time() {
            debug!("Seeking back to {time}, restarting replay");
            self.engine.restart();
            self.next_input = 0;
        }
        self.advance_to(time);
    }

    pub fn score(&self) -> ReplayScore {
        ReplayScore::from_engine(&self.engine)
    }

    /// Take every engine event reported since the last call.
    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        self.engine.drain_events()
    }
}
