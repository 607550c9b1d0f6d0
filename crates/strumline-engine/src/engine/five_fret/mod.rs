mod acceptance;

use log::trace;

use super::state::EngineState;
use super::{GuitarEngine, update_sustains};
use crate::chart::Chart;
use crate::error::EngineError;
use crate::events::EngineEvent;
use crate::hit_window::WindowPosition;
use crate::input::{GameInput, GuitarAction};
use crate::mask::FretMask;
use crate::params::{GuitarEngineParameters, SerializedGuitarEngineParameters};
use crate::timer::{EngineTimer, start_timer};

/// Five-fret guitar engine with an optional gamepad mode.
///
/// In gamepad mode every fret press (and optionally release) counts as a
/// strum, and two extra leniency timers take over the overstrum decisions:
/// chord leniency gives time to finish a chord, lifted-note leniency lets a
/// press after a release-hit land without overstrumming.
#[derive(Debug, Clone)]
pub struct FiveFretEngine {
    state: EngineState,
    is_gamepad_mode: bool,
    chord_leniency: EngineTimer,
    lifted_note_leniency: EngineTimer,
    /// Note hit by the release that started lifted-note leniency.
    lifted_note: Option<usize>,
    /// Sustain frets pressed in gamepad mode. Releasing one is not a strum.
    pressed_sustains_mask: FretMask,
}

impl FiveFretEngine {
    /// Build an engine. Bots never run in gamepad mode.
    pub fn new(
        chart: Chart,
        params: GuitarEngineParameters,
        is_bot: bool,
        is_gamepad_mode: bool,
    ) -> Result<Self, EngineError> {
        params.validate()?;
        chart.validate()?;

        let chord_leniency = EngineTimer::new(params.gamepad_mode_chord_leniency);
        Ok(Self {
            state: EngineState::new(chart, params, is_bot),
            is_gamepad_mode: !is_bot && is_gamepad_mode,
            chord_leniency,
            lifted_note_leniency: EngineTimer::new(0.0),
            lifted_note: None,
            pressed_sustains_mask: FretMask::EMPTY,
        })
    }

    /// Build an engine from persisted parameters, scoring exactly as the
    /// schema version they were stored under.
    pub fn from_serialized(
        chart: Chart,
        params: SerializedGuitarEngineParameters,
        is_bot: bool,
        is_gamepad_mode: bool,
    ) -> Result<Self, EngineError> {
        Self::new(chart, params.try_into()?, is_bot, is_gamepad_mode)
    }

    pub fn is_gamepad_mode(&self) -> bool {
        self.is_gamepad_mode
    }

    pub fn chord_leniency(&self) -> &EngineTimer {
        &self.chord_leniency
    }

    pub fn lifted_note_leniency(&self) -> &EngineTimer {
        &self.lifted_note_leniency
    }

    pub fn pressed_sustains_mask(&self) -> FretMask {
        self.pressed_sustains_mask
    }

    /// A gamepad fret release is being processed.
    fn is_gamepad_release(&self) -> bool {
        self.is_gamepad_mode && self.state.has_fretted && !self.state.is_fret_press
    }

    fn update_timers(&mut self) {
        let now = self.state.current_time;

        if self.state.hopo_leniency.is_expired(now) {
            trace!("Hopo leniency expired at {now}");
            self.state.hopo_leniency.disable();
            self.state.re_run = true;
        }

        if self.lifted_note_leniency.is_expired(now) {
            trace!("Lifted note leniency expired at {now}");
            self.lifted_note_leniency.disable();
            self.lifted_note = None;
            self.state.re_run = true;
        }

        if self.state.strum_leniency.is_expired(now) {
            trace!("Strum leniency expired at {now}");
            self.state.strum_leniency.disable();
            if self.is_gamepad_mode {
                self.chord_leniency.start(now);
            } else {
                self.state.overstrum();
                self.state.re_run = true;
            }
        }

        if self.chord_leniency.is_expired(now) {
            trace!("Chord leniency expired at {now}");
            self.state.overstrum();
            self.chord_leniency.disable();
            self.state.re_run = true;
        }

        if self.state.whammy_timer.is_expired(now) {
            self.state.whammy_timer.disable();
        }
    }

    /// Consume, penalize or open a window for this tick's strum.
    fn resolve_strum(&mut self) {
        let now = self.state.current_time;
        let gamepad_release = self.is_gamepad_release();
        let mut eaten = false;

        if self.state.hopo_leniency.is_active() {
            // A hopo can absorb one strum.
            trace!("Strum eaten by hopo leniency at {now}");
            self.state.strum_leniency.disable();
            self.state.hopo_leniency.disable();
            eaten = true;
            self.state.re_run = true;
        } else if self.state.is_fret_press
            && self.lifted_note_leniency.is_active()
            && self.lifted_note.is_some_and(|index| self.can_note_be_hit(index))
        {
            trace!("Strum eaten by lifted note leniency at {now}");
            self.state.strum_leniency.disable();
            self.lifted_note_leniency.disable();
            self.chord_leniency.disable();
            eaten = true;
            self.state.re_run = true;
        } else if self.state.strum_leniency.is_active() && !gamepad_release {
            trace!("Double strum at {now}");
            if self.is_gamepad_mode {
                self.chord_leniency.start(now);
            } else {
                self.state.overstrum();
            }
        }

        if !eaten && !gamepad_release {
            let index = self.state.note_index;
            let note_in_window =
                index < self.state.chart.len() && self.state.is_note_in_window(index);
            let offset = if note_in_window {
                0.0
            } else {
                self.state.params.strum_leniency_small
            };

            start_timer(&mut self.state.strum_leniency, now, offset);
            trace!(
                "Strum leniency until {}",
                self.state.strum_leniency.end_time()
            );
            self.state.re_run = true;
        }
    }

    /// Record the front-end expiry of a fret input and run ghost detection
    /// against the cursor note.
    fn handle_fret_input(&mut self) {
        let state = &mut self.state;
        let index = state.note_index;

        state.has_tapped = true;
        state.front_end_expire_time = state.current_time + state.front_end(index).abs();

        let ghosted = state.check_for_ghost_input(index);
        state.was_note_ghosted = state.params.anti_ghosting
            && !self.is_gamepad_mode
            && (ghosted || state.was_note_ghosted);

        if ghosted {
            trace!("Ghost input on note {index} at {}", state.current_time);
            state.stats.ghost_inputs += 1;
            state.events.push(EngineEvent::GhostInput {
                index,
                time: state.current_time,
            });
        }
    }

    /// Walk the chart from the cursor and take the first note the current
    /// input can hit.
    fn check_for_note_hit(&mut self) {
        let start = self.state.note_index;

        for index in start..self.state.chart.len() {
            let is_first = index == start;
            let note = &self.state.chart.notes()[index];
            if note.was_hit_or_missed() {
                break;
            }
            let (is_hopo, is_tap, note_time) = (note.is_hopo(), note.is_tap(), note.time());

            match self.state.window_position(index) {
                WindowPosition::Inside => {}
                WindowPosition::Missed => {
                    if is_first {
                        self.miss_note(index);
                    }
                    break;
                }
                WindowPosition::Early => break,
            }

            if !self.can_note_be_hit(index) {
                trace!(
                    "Can't hit note {index} at {} holding {}",
                    self.state.current_time, self.state.button_mask
                );
                // The opening hopo/tap can't be skipped.
                if (is_hopo || is_tap) && start == 0 {
                    break;
                }
                continue;
            }

            let state = &self.state;
            let combo = state.stats.combo;
            let hopo_condition = is_hopo && is_first && (combo > 0 || start == 0);
            let tap_condition = is_tap && (is_first || combo == 0);
            let front_end_open = state.params.infinite_front_end
                || note_time <= state.front_end_expire_time
                || start == 0;

            if state.has_tapped
                && (hopo_condition || tap_condition)
                && front_end_open
                && !state.was_note_ghosted
            {
                trace!("Hit note {index} at {} with hopo rules", state.current_time);
                self.hit_note(index);
                break;
            }

            if (state.has_strummed || state.strum_leniency.is_active())
                && (is_first || (start > 0 && combo == 0))
            {
                trace!("Hit note {index} at {} with a strum", state.current_time);
                self.hit_note(index);
                break;
            }
        }
    }
}

impl GuitarEngine for FiveFretEngine {
    fn state(&self) -> &EngineState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut EngineState {
        &mut self.state
    }

    fn mutate_state_with_input(&mut self, input: &GameInput) {
        let state = &mut self.state;

        match input.action {
            GuitarAction::StarPower => {
                state.is_star_power_input_active = input.button;
                if input.button {
                    state.stats.star_power_activations += 1;
                }
                state.events.push(EngineEvent::StarPowerInput {
                    time: state.current_time,
                    active: input.button,
                });
            }
            GuitarAction::Whammy => {
                state.last_whammy_timer_state = state.whammy_timer.is_active();
                state.whammy_timer.start(state.current_time);
                state.stats.whammy_inputs += 1;
            }
            GuitarAction::StrumUp | GuitarAction::StrumDown => {
                // Gamepad mode strums with the frets instead.
                if input.button && !self.is_gamepad_mode {
                    state.has_strummed = true;
                }
            }
            action => {
                state.last_button_mask = state.button_mask;
                state.has_fretted = true;
                state.is_fret_press = input.button;

                if let Some(fret) = action.fret() {
                    state.button_mask.set_fret(fret, input.button);
                }

                // Holding nothing holds the open note.
                state.button_mask = if state.button_mask.without_open().is_empty() {
                    state.button_mask.with_open()
                } else {
                    state.button_mask.without_open()
                };

                if self.is_gamepad_mode {
                    if input.button {
                        state.has_strummed = true;
                    } else if state.params.gamepad_mode_strum_on_release {
                        let released = state.last_button_mask & !state.button_mask;
                        if released.intersects(self.pressed_sustains_mask) {
                            self.pressed_sustains_mask &= !released;
                        } else {
                            state.has_strummed = true;
                        }
                    }
                }
            }
        }

        trace!(
            "Mutated input state: buttons {}, fretted {}, strummed {}",
            self.state.button_mask, self.state.has_fretted, self.state.has_strummed
        );
    }

    fn update_hit_logic(&mut self, time: f64) {
        self.update_timers();

        // Strums resolve even with no notes left so overstrums still count.
        if self.state.has_strummed {
            self.resolve_strum();
        }

        self.update_bot(time);

        if self.state.note_index >= self.state.chart.len() {
            self.state.clear_transient_flags();
            update_sustains(self);
            return;
        }

        if self.state.has_fretted {
            self.handle_fret_input();
        }

        self.check_for_note_hit();
        update_sustains(self);
        self.state.clear_transient_flags();
    }

    fn can_note_be_hit(&self, index: usize) -> bool {
        let held = if self.is_gamepad_release() {
            // The fret that hits the note was just released.
            self.state.last_button_mask
        } else {
            self.state.button_mask
        };

        acceptance::can_note_be_hit(
            &self.state.chart.notes()[index],
            held,
            self.state.extended_sustain_mask(),
            self.is_gamepad_mode,
        )
    }

    fn hit_note(&mut self, index: usize) {
        let now = self.state.current_time;
        let note = &self.state.chart.notes()[index];
        let note_mask = note.note_mask();
        let sustain_mask = note.sustain_mask();
        let is_chord = note.is_chord();
        let is_long_sustain = note.is_sustain() && note.tick_length() > 1;

        if note.is_strum() {
            // Lets a following hopo use the strum's press.
            self.state.has_tapped = true;
            self.state.front_end_expire_time = f64::INFINITY;
        } else {
            self.state.has_tapped = false;
            self.state.hopo_leniency.start(now);
        }

        self.state.strum_leniency.disable();
        if is_chord {
            self.chord_leniency.disable();
        }

        if self.is_gamepad_mode && self.state.has_fretted {
            if !self.state.is_fret_press {
                let until = self.state.miss_time(index);
                self.lifted_note = Some(index);
                self.lifted_note_leniency.start(until);
            } else if is_long_sustain {
                self.pressed_sustains_mask |= sustain_mask;
            }
        }

        let mut position = 0;
        while position < self.state.sustains.len() {
            let sustain_note = &self.state.chart.notes()[self.state.sustains[position].note_index];
            if sustain_note.sustain_mask().intersects(note_mask) {
                let finished = self.state.current_tick >= sustain_note.tick_end();
                self.state.end_sustain(position, true, finished);
            } else {
                position += 1;
            }
        }

        self.state.hit_note(index);
    }

    fn miss_note(&mut self, index: usize) {
        self.state.has_tapped = false;
        self.state.miss_note(index);
    }

    fn update_bot(&mut self, time: f64) {
        self.state.run_bot(time);
    }

    fn variant_timers(&self) -> Vec<&EngineTimer> {
        vec![&self.chord_leniency, &self.lifted_note_leniency]
    }

    fn variant_timers_mut(&mut self) -> Vec<&mut EngineTimer> {
        vec![&mut self.chord_leniency, &mut self.lifted_note_leniency]
    }

    fn reset_variant(&mut self) {
        self.chord_leniency.disable();
        self.lifted_note_leniency.disable();
        self.lifted_note = None;
        self.pressed_sustains_mask = FretMask::EMPTY;
    }
}
