use log::trace;

use super::state::EngineState;
use crate::mask::FretMask;

impl EngineState {
    /// Autoplay: once the cursor note is due, hold exactly its frets (plus
    /// any held extended sustains) as a synthetic press with strum leniency.
    pub(crate) fn run_bot(&mut self, time: f64) {
        if !self.is_bot {
            return;
        }
        let Some(note) = self.chart.notes().get(self.note_index) else {
            return;
        };
        if time < note.time() {
            return;
        }
        let note_mask = note.note_mask();

        self.last_button_mask = self.button_mask;
        self.button_mask = note_mask;
        trace!("[Bot] Set button mask to {note_mask}");

        self.has_tapped = self.button_mask != self.last_button_mask;
        self.is_fret_press = true;
        self.has_strummed = false;
        self.strum_leniency.start(time);

        let sustained = self.extended_sustain_mask().unwrap_or(FretMask::EMPTY);
        if !sustained.is_empty() {
            self.button_mask |= sustained;
            trace!("[Bot] Added sustain mask {sustained}, holding {}", self.button_mask);
        }
    }
}
