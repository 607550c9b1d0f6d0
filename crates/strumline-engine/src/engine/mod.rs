//! Engine capability trait and the shared driver loop.

mod bot;
mod five_fret;
mod ghost;
mod state;

pub use five_fret::FiveFretEngine;
pub use state::EngineState;

use log::{trace, warn};

use crate::chart::Chart;
use crate::events::EngineEvent;
use crate::input::GameInput;
use crate::mask::FretMask;
use crate::stats::GuitarStats;
use crate::sustain::burst_tick;
use crate::timer::EngineTimer;

/// One guitar instrument variant.
///
/// Implementors provide the per-variant decisions; the driver methods
/// (`queue_input`, `update`, `next_queued_update`, ...) are shared and fix the
/// ordering contract: every queued input dated at or before `t` is applied,
/// each followed by a hit-logic pass, before the engine settles at `t`. A pass
/// is repeated at the same instant while it requests a re-run.
pub trait GuitarEngine {
    fn state(&self) -> &EngineState;

    fn state_mut(&mut self) -> &mut EngineState;

    /// Apply one input to the held mask and the per-tick flags. No scanning.
    fn mutate_state_with_input(&mut self, input: &GameInput);

    /// One hit-logic pass at the current time.
    fn update_hit_logic(&mut self, time: f64);

    /// Whether the held frets satisfy note `index` right now.
    fn can_note_be_hit(&self, index: usize) -> bool;

    fn hit_note(&mut self, index: usize);

    fn miss_note(&mut self, index: usize);

    fn update_bot(&mut self, time: f64);

    /// Leniency timers owned by the variant rather than the shared state.
    fn variant_timers(&self) -> Vec<&EngineTimer> {
        Vec::new()
    }

    fn variant_timers_mut(&mut self) -> Vec<&mut EngineTimer> {
        Vec::new()
    }

    /// Reset variant-owned state. Called after the shared state was reset.
    fn reset_variant(&mut self) {}

    // =========================================================================
    // Driver
    // =========================================================================

    /// Queue an input. Inputs are applied in queue order on the next update.
    fn queue_input(&mut self, input: GameInput) {
        self.state_mut().input_queue.push_back(input);
    }

    /// Advance to `time`, applying every queued input dated at or before it.
    fn update(&mut self, time: f64) {
        let current = self.state().current_time;
        if time < current {
            warn!("Ignoring update to {time}, engine is already at {current}");
            return;
        }

        while let Some(input) = self.state_mut().pop_due_input(time) {
            let current = self.state().current_time;
            let input_time = if input.time < current {
                warn!(
                    "Input {:?} at {} is older than the engine time {current}",
                    input.action, input.time
                );
                current
            } else {
                input.time
            };

            run_queued_updates(self, input_time);
            self.state_mut().set_time(input_time);
            self.mutate_state_with_input(&input);
            run_hit_logic(self, input_time);
        }

        run_queued_updates(self, time);
        self.state_mut().set_time(time);
        run_hit_logic(self, time);
    }

    /// Earliest time strictly between now and `next_time` at which the engine
    /// must be updated even without input: a leniency timer ending, the cursor
    /// note's window opening or closing, a held sustain completing, or the
    /// cursor note becoming due for the bot.
    fn next_queued_update(&self, next_time: f64) -> Option<f64> {
        let state = self.state();
        let now = state.current_time;
        let is_between = |time: f64| time > now && time < next_time;

        let timers = [
            &state.strum_leniency,
            &state.hopo_leniency,
            &state.whammy_timer,
        ];
        let timer_ends = timers
            .into_iter()
            .chain(self.variant_timers())
            .filter(|timer| timer.is_active())
            .map(EngineTimer::end_time);

        let mut note_times = Vec::with_capacity(3);
        if let Some(note) = state.chart.notes().get(state.note_index) {
            if !note.was_hit_or_missed() {
                let index = state.note_index;
                note_times.push(note.time() + state.front_end(index));
                note_times.push(state.miss_time(index));
                if state.is_bot {
                    note_times.push(note.time());
                }
            }
        }

        let sync_track = state.chart.sync_track();
        let sustain_ends = state.sustains.iter().map(|sustain| {
            let note = &state.chart.notes()[sustain.note_index];
            let tick = burst_tick(note.tick(), note.tick_end(), state.sustain_burst_threshold());
            sync_track.tick_to_time(tick)
        });

        timer_ends
            .chain(note_times)
            .chain(sustain_ends)
            .filter(|&time| is_between(time))
            .min_by(f64::total_cmp)
    }

    /// Change playback speed at the current time. What remains of every live
    /// timer is rescaled together.
    fn set_speed(&mut self, speed: f64) {
        if !(speed > 0.0 && speed.is_finite()) {
            warn!("Ignoring invalid engine speed {speed}");
            return;
        }
        let now = self.state().current_time;
        self.state_mut().set_speed(speed);
        for timer in self.variant_timers_mut() {
            timer.set_speed(now, speed);
        }
    }

    /// Rewind to the start: cursor, timers, sustains, queued inputs and stats
    /// are reinitialized. Notes keep their recorded results.
    ///
    /// The note scan stops at the first resolved note, so after a bare reset
    /// on a played chart nothing more can be hit. Use [`restart`] to play the
    /// chart again.
    ///
    /// [`restart`]: GuitarEngine::restart
    fn reset(&mut self, keep_current_buttons: bool) {
        self.state_mut().reset(keep_current_buttons);
        self.reset_variant();
    }

    /// Reset and forget every note result, ready for a fresh play.
    fn restart(&mut self) {
        self.state_mut().chart.reset_note_states();
        self.reset(false);
    }

    /// Take every event reported since the last call.
    fn drain_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.state_mut().events)
    }

    fn chart(&self) -> &Chart {
        self.state().chart()
    }

    fn stats(&self) -> &GuitarStats {
        self.state().stats()
    }

    fn note_index(&self) -> usize {
        self.state().note_index()
    }

    fn current_time(&self) -> f64 {
        self.state().current_time()
    }

    fn button_mask(&self) -> FretMask {
        self.state().button_mask()
    }

    fn is_bot(&self) -> bool {
        self.state().is_bot()
    }
}

impl EngineState {
    fn pop_due_input(&mut self, time: f64) -> Option<GameInput> {
        match self.input_queue.front() {
            Some(input) if input.time <= time => self.input_queue.pop_front(),
            _ => None,
        }
    }
}

/// Run hit logic until no pass requests a re-run.
fn run_hit_logic<E: GuitarEngine + ?Sized>(engine: &mut E, time: f64) {
    loop {
        engine.state_mut().re_run = false;
        engine.update_hit_logic(time);
        if !engine.state().re_run {
            break;
        }
        trace!("Re-running hit logic at {time}");
    }
}

/// Settle every wake-up before `time`, earliest first.
fn run_queued_updates<E: GuitarEngine + ?Sized>(engine: &mut E, time: f64) {
    while let Some(update_time) = engine.next_queued_update(time) {
        trace!("Running queued update at {update_time}");
        engine.state_mut().set_time(update_time);
        run_hit_logic(engine, update_time);
    }
}

/// End sustains that were released or reached their end, and refresh the
/// pending sustain score.
pub(crate) fn update_sustains<E: GuitarEngine + ?Sized>(engine: &mut E) {
    let mut position = 0;
    while position < engine.state().sustains.len() {
        let state = engine.state();
        let index = state.sustains[position].note_index;
        let note = &state.chart.notes()[index];

        let burst = burst_tick(note.tick(), note.tick_end(), state.sustain_burst_threshold());
        let is_end = state.current_tick >= burst || state.current_tick >= note.tick_end();
        let dropped = !state.is_bot && !engine.can_note_be_hit(index);

        if dropped || is_end {
            engine.state_mut().end_sustain(position, dropped && !is_end, is_end);
        } else {
            position += 1;
        }
    }

    engine.state_mut().recompute_pending_score();
}
