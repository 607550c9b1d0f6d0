use super::state::EngineState;

impl EngineState {
    /// Whether the latest fret press is a ghost against note `index`: a
    /// hammer-on to frets outside the note while the note is in its window.
    ///
    /// The opening note can never be ghosted, and releases never ghost.
    pub(crate) fn check_for_ghost_input(&self, index: usize) -> bool {
        if index == 0 || !self.is_fret_press {
            return false;
        }

        if !self.is_note_in_window(index) {
            return false;
        }

        let note = &self.chart.notes()[index];
        let is_hammer_on = self.button_mask.most_significant_bit()
            > self.last_button_mask.most_significant_bit();

        is_hammer_on && !self.button_mask.intersects(note.note_mask())
    }
}

#[cfg(test)]
mod tests {
    use crate::chart::{Chart, GuitarNote, NoteKind, SyncTrack};
    use crate::engine::state::EngineState;
    use crate::mask::FretMask;
    use crate::params::GuitarEngineParameters;

    fn state_with_two_notes() -> EngineState {
        let notes = vec![
            GuitarNote::new(1.0, 192, FretMask::GREEN, NoteKind::Strum),
            GuitarNote::new(2.0, 384, FretMask::RED, NoteKind::Hopo),
        ];
        let sync = SyncTrack::constant(192, 60.0).unwrap();
        let chart = Chart::new(notes, sync).unwrap();
        EngineState::new(chart, GuitarEngineParameters::default(), false)
    }

    fn press(state: &mut EngineState, last: FretMask, held: FretMask, time: f64) {
        state.set_time(time);
        state.last_button_mask = last;
        state.button_mask = held;
        state.is_fret_press = true;
    }

    #[test]
    fn wrong_hammer_on_in_window_is_ghost() {
        let mut state = state_with_two_notes();
        press(&mut state, FretMask::GREEN, FretMask::GREEN | FretMask::YELLOW, 2.0);
        assert!(state.check_for_ghost_input(1));
    }

    #[test]
    fn hammer_on_to_note_fret_is_not_ghost() {
        let mut state = state_with_two_notes();
        press(&mut state, FretMask::GREEN, FretMask::GREEN | FretMask::RED, 2.0);
        assert!(!state.check_for_ghost_input(1));
    }

    #[test]
    fn opening_note_is_never_ghosted() {
        let mut state = state_with_two_notes();
        press(&mut state, FretMask::RED, FretMask::RED | FretMask::BLUE, 1.0);
        assert!(!state.check_for_ghost_input(0));
    }

    #[test]
    fn press_outside_window_is_not_ghost() {
        let mut state = state_with_two_notes();
        press(&mut state, FretMask::GREEN, FretMask::GREEN | FretMask::YELLOW, 1.5);
        assert!(!state.check_for_ghost_input(1));
    }

    #[test]
    fn pull_off_is_not_ghost() {
        let mut state = state_with_two_notes();
        press(&mut state, FretMask::GREEN | FretMask::YELLOW, FretMask::GREEN, 2.0);
        state.is_fret_press = false;
        assert!(!state.check_for_ghost_input(1));
    }
}
