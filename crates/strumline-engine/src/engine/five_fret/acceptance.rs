//! Fret-mask acceptance rules for five-fret notes.

use crate::chart::GuitarNote;
use crate::mask::FretMask;

/// Whether `held` can hit `note`.
///
/// `sustained` is `None` with no active sustains, otherwise the frets
/// occupied by held extended sustains. Those frets are ignored for the first
/// comparison; if that fails the raw mask is tried, so holding a sustain
/// never blocks a note that the raw mask satisfies.
pub(crate) fn can_note_be_hit(
    note: &GuitarNote,
    held: FretMask,
    sustained: Option<FretMask>,
    is_gamepad_mode: bool,
) -> bool {
    let mut original = held;
    let mut masked = held;
    if let Some(occupied) = sustained {
        masked &= !occupied;
        if masked.is_empty() {
            masked = FretMask::OPEN;
        }
    }

    let note_mask = note.note_mask();
    if is_gamepad_mode && note_mask.has_open() {
        let frets = note_mask.without_open();
        if frets.is_empty() {
            // Any press hits a plain open note.
            original = note_mask;
        } else if frets == original || frets == masked {
            // Open chords need exactly their frets.
            original = note_mask;
            masked = note_mask;
        }
    }

    if sustained.is_some() {
        let unchanged = if masked == FretMask::OPEN {
            original.with_open()
        } else {
            original
        };
        if masked != unchanged && is_note_hittable(note, masked) {
            return true;
        }
    }

    is_note_hittable(note, original)
}

/// Exact match, or a valid anchor.
///
/// Strum chords need the exact mask. Hopo/tap chords tolerate extra frets
/// below their lowest fret; single notes tolerate extra frets below the note.
/// Open chords never anchor.
pub(crate) fn is_note_hittable(note: &GuitarNote, held: FretMask) -> bool {
    let use_disjoint = note.is_disjoint() && note.was_hit();
    let note_mask = if use_disjoint {
        note.disjoint_mask()
    } else {
        note.note_mask()
    };

    // A hit disjoint sustain stays held by its own string alone.
    if use_disjoint
        && (note_mask.intersects(held) || (note.note_mask().has_open() && held.has_open()))
    {
        return true;
    }

    if note_mask.has_open() && !note_mask.is_open_only() && held.with_open() == note_mask {
        return true;
    }

    if held == note_mask {
        return true;
    }

    let anchor = held ^ note_mask;

    if note.is_chord() {
        if note.is_strum() {
            return false;
        }

        let chord = i32::from(note.note_mask().bits());
        let lowest = i32::from(note.note_mask().lowest_fret().bits());
        let anchor = i32::from(anchor.bits());
        return lowest >= anchor && i32::from(held.bits()) - anchor == chord;
    }

    anchor.bits() < note_mask.without_open().bits()
}
