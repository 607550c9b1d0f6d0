use std::collections::VecDeque;

use log::trace;

use crate::chart::Chart;
use crate::events::EngineEvent;
use crate::hit_window::{HitWindowPolicy, WindowPosition};
use crate::input::GameInput;
use crate::mask::FretMask;
use crate::params::GuitarEngineParameters;
use crate::stats::{GuitarStats, POINTS_PER_NOTE};
use crate::sustain::ActiveSustain;
use crate::timer::EngineTimer;

/// State shared by every guitar engine variant.
///
/// Variants own one of these and drive it through the [`super::GuitarEngine`]
/// capability methods. Transient per-tick flags are cleared at the end of
/// every hit-logic pass.
#[derive(Debug, Clone)]
pub struct EngineState {
    pub(crate) chart: Chart,
    pub(crate) params: GuitarEngineParameters,
    pub(crate) is_bot: bool,

    pub(crate) input_queue: VecDeque<GameInput>,
    pub(crate) events: Vec<EngineEvent>,
    pub(crate) stats: GuitarStats,
    pub(crate) sustains: Vec<ActiveSustain>,

    pub(crate) current_time: f64,
    pub(crate) current_tick: u32,
    /// First unresolved note. Only moves forward until a reset.
    pub(crate) note_index: usize,
    pub(crate) speed: f64,
    /// Set when a decision may unlock another one at the same instant.
    pub(crate) re_run: bool,

    pub(crate) button_mask: FretMask,
    /// Mask before the most recent fret input.
    pub(crate) last_button_mask: FretMask,
    pub(crate) has_strummed: bool,
    pub(crate) has_fretted: bool,
    pub(crate) is_fret_press: bool,
    /// A fresh press is available for hopo/tap hits.
    pub(crate) has_tapped: bool,
    pub(crate) was_note_ghosted: bool,
    /// Hopos/taps after this time cannot use the last press.
    pub(crate) front_end_expire_time: f64,
    pub(crate) is_star_power_input_active: bool,
    pub(crate) last_whammy_timer_state: bool,

    pub(crate) strum_leniency: EngineTimer,
    pub(crate) hopo_leniency: EngineTimer,
    pub(crate) whammy_timer: EngineTimer,

    /// Sustains complete this many ticks before their end.
    sustain_burst_threshold: u32,
}

impl EngineState {
    /// `params` must already be validated.
    pub(crate) fn new(chart: Chart, params: GuitarEngineParameters, is_bot: bool) -> Self {
        let sustain_burst_threshold = match params.sustain_burst_fraction {
            0 => 0,
            fraction => chart.sync_track().resolution() / fraction,
        };

        Self {
            strum_leniency: EngineTimer::new(params.strum_leniency),
            hopo_leniency: EngineTimer::new(params.hopo_leniency),
            whammy_timer: EngineTimer::new(params.star_power_whammy_buffer),
            chart,
            params,
            is_bot,
            input_queue: VecDeque::new(),
            events: Vec::new(),
            stats: GuitarStats::default(),
            sustains: Vec::new(),
            current_time: 0.0,
            current_tick: 0,
            note_index: 0,
            speed: 1.0,
            re_run: false,
            button_mask: FretMask::OPEN,
            last_button_mask: FretMask::OPEN,
            has_strummed: false,
            has_fretted: false,
            is_fret_press: false,
            has_tapped: false,
            was_note_ghosted: false,
            front_end_expire_time: f64::INFINITY,
            is_star_power_input_active: false,
            last_whammy_timer_state: false,
            sustain_burst_threshold,
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn chart(&self) -> &Chart {
        &self.chart
    }

    pub fn params(&self) -> &GuitarEngineParameters {
        &self.params
    }

    pub fn stats(&self) -> &GuitarStats {
        &self.stats
    }

    pub fn note_index(&self) -> usize {
        self.note_index
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    pub fn current_tick(&self) -> u32 {
        self.current_tick
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn is_bot(&self) -> bool {
        self.is_bot
    }

    pub fn button_mask(&self) -> FretMask {
        self.button_mask
    }

    pub fn last_button_mask(&self) -> FretMask {
        self.last_button_mask
    }

    pub fn active_sustains(&self) -> &[ActiveSustain] {
        &self.sustains
    }

    pub fn is_star_power_input_active(&self) -> bool {
        self.is_star_power_input_active
    }

    /// Whether whammy was already active before the latest whammy input.
    pub fn last_whammy_timer_state(&self) -> bool {
        self.last_whammy_timer_state
    }

    pub fn strum_leniency(&self) -> &EngineTimer {
        &self.strum_leniency
    }

    pub fn hopo_leniency(&self) -> &EngineTimer {
        &self.hopo_leniency
    }

    pub fn whammy_timer(&self) -> &EngineTimer {
        &self.whammy_timer
    }

    /// Score of hitting every note at 1x, used for star thresholds.
    pub fn base_score(&self) -> u64 {
        self.chart
            .notes()
            .iter()
            .map(|note| POINTS_PER_NOTE * note.note_count() as u64)
            .sum()
    }

    pub fn stars(&self) -> usize {
        self.stats
            .stars(self.base_score(), &self.params.star_multiplier_thresholds)
    }

    pub(crate) fn set_time(&mut self, time: f64) {
        self.current_time = time;
        self.current_tick = self.chart.sync_track().time_to_tick(time);
    }

    // =========================================================================
    // Hit windows
    // =========================================================================

    /// Mean spacing to the neighboring notes, used to size dynamic windows.
    pub(crate) fn average_note_distance(&self, index: usize) -> f64 {
        let notes = self.chart.notes();
        let time = notes[index].time();
        let fallback = self.params.hit_window.max_window / 2.0;

        let before = index
            .checked_sub(1)
            .map_or(fallback, |prev| (time - notes[prev].time()) / 2.0);
        let after = notes
            .get(index + 1)
            .map_or(fallback, |next| (next.time() - time) / 2.0);

        before + after
    }

    pub(crate) fn hit_window(&self, index: usize) -> f64 {
        self.params
            .hit_window
            .calculate_hit_window(self.average_note_distance(index))
    }

    pub(crate) fn front_end(&self, index: usize) -> f64 {
        self.params.hit_window.front_end(self.hit_window(index))
    }

    pub(crate) fn back_end(&self, index: usize) -> f64 {
        self.params.hit_window.back_end(self.hit_window(index))
    }

    pub(crate) fn window_position(&self, index: usize) -> WindowPosition {
        let note = &self.chart.notes()[index];
        self.params.hit_window.position(
            note.time(),
            self.average_note_distance(index),
            self.current_time,
        )
    }

    pub(crate) fn is_note_in_window(&self, index: usize) -> bool {
        self.window_position(index) == WindowPosition::Inside
    }

    /// First instant at which the note counts as missed.
    pub(crate) fn miss_time(&self, index: usize) -> f64 {
        self.chart.notes()[index].time() + self.back_end(index)
    }

    // =========================================================================
    // Results
    // =========================================================================

    /// Masks occupied by held extended sustains, or `None` with no sustains.
    pub(crate) fn extended_sustain_mask(&self) -> Option<FretMask> {
        if self.sustains.is_empty() {
            return None;
        }
        let notes = self.chart.notes();
        let mask = self
            .sustains
            .iter()
            .map(|sustain| &notes[sustain.note_index])
            .filter(|note| note.is_extended_sustain())
            .fold(FretMask::EMPTY, |mask, note| mask | note.sustain_mask());
        Some(mask)
    }

    /// Resolve `index` as hit. Unresolved notes skipped between the cursor and
    /// `index` are missed first.
    pub(crate) fn hit_note(&mut self, index: usize) {
        for skipped in self.note_index..index {
            self.miss_note(skipped);
        }

        if !self.chart.notes_mut()[index].set_hit() {
            return;
        }
        let note = &self.chart.notes()[index];
        let note_count = note.note_count() as u64;
        let is_sustain = note.is_sustain();
        let strummed_hopo = !note.is_strum() && self.has_strummed;

        self.stats.combo += 1;
        self.stats.max_combo = self.stats.max_combo.max(self.stats.combo);
        self.stats.notes_hit += 1;
        if strummed_hopo {
            self.stats.hopos_strummed += 1;
        }
        self.update_multiplier();
        self.stats.committed_score +=
            POINTS_PER_NOTE * note_count * self.stats.score_multiplier as u64;

        self.was_note_ghosted = false;
        self.note_index = self.note_index.max(index + 1);
        self.events.push(EngineEvent::NoteHit {
            index,
            time: self.current_time,
        });

        if is_sustain {
            self.start_sustain(index);
        }
    }

    pub(crate) fn miss_note(&mut self, index: usize) {
        if !self.chart.notes_mut()[index].set_missed() {
            return;
        }
        trace!("Missed note {index} at {}", self.current_time);

        self.stats.combo = 0;
        self.stats.notes_missed += 1;
        self.update_multiplier();

        self.was_note_ghosted = false;
        self.note_index = self.note_index.max(index + 1);
        self.events.push(EngineEvent::NoteMissed {
            index,
            time: self.current_time,
        });
    }

    pub(crate) fn overstrum(&mut self) {
        // Nothing to penalize before the first note is resolved.
        if self.note_index == 0 && !self.chart.is_empty() {
            trace!("Ignoring overstrum before the first note at {}", self.current_time);
            return;
        }
        trace!("Overstrum at {}", self.current_time);

        while !self.sustains.is_empty() {
            let tick_end = self.chart.notes()[self.sustains[0].note_index].tick_end();
            self.end_sustain(0, true, self.current_tick >= tick_end);
        }

        self.stats.combo = 0;
        self.stats.overstrums += 1;
        self.update_multiplier();
        self.events.push(EngineEvent::Overstrum {
            time: self.current_time,
        });
    }

    pub(crate) fn update_multiplier(&mut self) {
        let multiplier =
            GuitarStats::multiplier_for_combo(self.stats.combo, self.params.max_multiplier);
        if multiplier == self.stats.score_multiplier {
            return;
        }

        let resolution = self.chart.sync_track().resolution();
        let previous = self.stats.score_multiplier;
        for sustain in &mut self.sustains {
            let tick_end = self.chart.notes()[sustain.note_index].tick_end();
            sustain.rebase(self.current_tick.min(tick_end), resolution, previous);
        }
        self.stats.score_multiplier = multiplier;
    }

    // =========================================================================
    // Sustains
    // =========================================================================

    pub(crate) fn sustain_burst_threshold(&self) -> u32 {
        self.sustain_burst_threshold
    }

    pub(crate) fn start_sustain(&mut self, index: usize) {
        let note = &self.chart.notes()[index];
        let base_tick = self.current_tick.clamp(note.tick(), note.tick_end());
        trace!("Starting sustain {index} at tick {base_tick}");

        self.sustains.push(ActiveSustain::new(index, base_tick));
        self.events.push(EngineEvent::SustainStart {
            index,
            time: self.current_time,
        });
    }

    /// Remove the sustain at `position` in the active list and commit its score.
    pub(crate) fn end_sustain(&mut self, position: usize, dropped: bool, finished: bool) {
        let sustain = self.sustains.remove(position);
        let tick_end = self.chart.notes()[sustain.note_index].tick_end();
        let score_tick = if finished {
            tick_end
        } else {
            self.current_tick.min(tick_end)
        };
        let points = sustain.points_at(
            score_tick,
            self.chart.sync_track().resolution(),
            self.stats.score_multiplier,
        );
        self.stats.committed_score += points as u64;

        if finished {
            self.stats.sustains_completed += 1;
        } else {
            self.stats.sustains_dropped += 1;
        }
        trace!(
            "Ended sustain {} at tick {} (dropped: {dropped}, finished: {finished})",
            sustain.note_index, self.current_tick
        );
        self.events.push(EngineEvent::SustainEnd {
            index: sustain.note_index,
            time: self.current_time,
            dropped,
            finished,
        });
    }

    /// Refresh the pending score of held sustains.
    pub(crate) fn recompute_pending_score(&mut self) {
        let resolution = self.chart.sync_track().resolution();
        let pending: f64 = self
            .sustains
            .iter()
            .map(|sustain| {
                let tick_end = self.chart.notes()[sustain.note_index].tick_end();
                sustain.points_at(
                    self.current_tick.min(tick_end),
                    resolution,
                    self.stats.score_multiplier,
                )
            })
            .sum();
        self.stats.pending_sustain_score = pending as u64;
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    pub(crate) fn clear_transient_flags(&mut self) {
        self.has_strummed = false;
        self.has_fretted = false;
        self.is_fret_press = false;
    }

    /// Cursor, timers, sustains, queued inputs and stats back to their initial
    /// state. Note results are left alone.
    pub(crate) fn reset(&mut self, keep_current_buttons: bool) {
        if !keep_current_buttons {
            self.button_mask = FretMask::OPEN;
            self.last_button_mask = FretMask::OPEN;
        }

        self.input_queue.clear();
        self.events.clear();
        self.stats = GuitarStats::default();
        self.sustains.clear();

        self.current_time = 0.0;
        self.current_tick = 0;
        self.note_index = 0;
        self.re_run = false;

        self.clear_transient_flags();
        self.has_tapped = false;
        self.was_note_ghosted = false;
        self.front_end_expire_time = f64::INFINITY;
        self.is_star_power_input_active = false;
        self.last_whammy_timer_state = false;

        self.strum_leniency.disable();
        self.hopo_leniency.disable();
        self.whammy_timer.disable();
    }

    pub(crate) fn set_speed(&mut self, speed: f64) {
        let now = self.current_time;
        self.speed = speed;
        self.strum_leniency.set_speed(now, speed);
        self.hopo_leniency.set_speed(now, speed);
        self.whammy_timer.set_speed(now, speed);
    }
}
