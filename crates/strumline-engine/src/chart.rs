use serde::{Deserialize, Serialize};

use crate::error::ChartError;
use crate::mask::FretMask;

/// How a note may be played.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum NoteKind {
    /// Needs a strum.
    #[default]
    Strum,
    /// Hammer-on/pull-off: a fret press is enough while the combo holds.
    Hopo,
    /// Tap: a fret press is always enough.
    Tap,
}

/// A single guitar note (or chord) in a chart.
///
/// Everything except the hit/miss flags is fixed once loaded. Each result
/// flag is set at most once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuitarNote {
    time: f64,
    tick: u32,
    tick_end: u32,
    note_mask: FretMask,
    #[serde(default)]
    disjoint_mask: FretMask,
    #[serde(default)]
    kind: NoteKind,
    #[serde(default)]
    is_extended_sustain: bool,
    #[serde(default)]
    is_disjoint: bool,
    #[serde(skip)]
    was_hit: bool,
    #[serde(skip)]
    was_missed: bool,
}

impl GuitarNote {
    pub fn new(time: f64, tick: u32, note_mask: FretMask, kind: NoteKind) -> Self {
        Self {
            time,
            tick,
            tick_end: tick,
            note_mask,
            disjoint_mask: note_mask,
            kind,
            is_extended_sustain: false,
            is_disjoint: false,
            was_hit: false,
            was_missed: false,
        }
    }

    /// Make this note a sustain ending at `tick_end`.
    pub fn with_sustain(mut self, tick_end: u32, extended: bool) -> Self {
        self.tick_end = tick_end;
        self.is_extended_sustain = extended && tick_end > self.tick;
        self
    }

    /// Mark this note as one string of a chord whose strings sustain
    /// independently, occupying `disjoint_mask` while held.
    pub fn with_disjoint(mut self, disjoint_mask: FretMask) -> Self {
        self.is_disjoint = true;
        self.disjoint_mask = disjoint_mask;
        self
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn tick(&self) -> u32 {
        self.tick
    }

    pub fn tick_end(&self) -> u32 {
        self.tick_end
    }

    pub fn tick_length(&self) -> u32 {
        self.tick_end.saturating_sub(self.tick)
    }

    pub fn note_mask(&self) -> FretMask {
        self.note_mask
    }

    pub fn disjoint_mask(&self) -> FretMask {
        self.disjoint_mask
    }

    /// Mask a held sustain of this note occupies.
    pub fn sustain_mask(&self) -> FretMask {
        if self.is_disjoint {
            self.disjoint_mask
        } else {
            self.note_mask
        }
    }

    pub fn kind(&self) -> NoteKind {
        self.kind
    }

    pub fn is_strum(&self) -> bool {
        self.kind == NoteKind::Strum
    }

    pub fn is_hopo(&self) -> bool {
        self.kind == NoteKind::Hopo
    }

    pub fn is_tap(&self) -> bool {
        self.kind == NoteKind::Tap
    }

    /// More than one bit set, where an open chord counts the open bit.
    pub fn is_chord(&self) -> bool {
        self.note_mask.count() > 1
    }

    pub fn is_sustain(&self) -> bool {
        self.tick_end > self.tick
    }

    pub fn is_extended_sustain(&self) -> bool {
        self.is_extended_sustain
    }

    pub fn is_disjoint(&self) -> bool {
        self.is_disjoint
    }

    pub fn was_hit(&self) -> bool {
        self.was_hit
    }

    pub fn was_missed(&self) -> bool {
        self.was_missed
    }

    pub fn was_hit_or_missed(&self) -> bool {
        self.was_hit || self.was_missed
    }

    /// Points-bearing note count: one per set bit.
    pub fn note_count(&self) -> u32 {
        self.note_mask.count()
    }

    /// Returns false if the note was already resolved.
    pub(crate) fn set_hit(&mut self) -> bool {
        if self.was_hit_or_missed() {
            return false;
        }
        self.was_hit = true;
        true
    }

    /// Returns false if the note was already resolved.
    pub(crate) fn set_missed(&mut self) -> bool {
        if self.was_hit_or_missed() {
            return false;
        }
        self.was_missed = true;
        true
    }

    fn reset_state(&mut self) {
        self.was_hit = false;
        self.was_missed = false;
    }
}

/// A tempo change starting at `tick`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TempoChange {
    pub tick: u32,
    pub bpm: f64,
}

/// Tick/time conversion for a chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SyncTrackData", into = "SyncTrackData")]
pub struct SyncTrack {
    resolution: u32,
    tempos: Vec<TempoChange>,
    /// Start time in seconds of each tempo change.
    tempo_times: Vec<f64>,
}

#[derive(Serialize, Deserialize)]
struct SyncTrackData {
    resolution: u32,
    tempos: Vec<TempoChange>,
}

impl TryFrom<SyncTrackData> for SyncTrack {
    type Error = ChartError;

    fn try_from(data: SyncTrackData) -> Result<Self, Self::Error> {
        Self::new(data.resolution, data.tempos)
    }
}

impl From<SyncTrack> for SyncTrackData {
    fn from(track: SyncTrack) -> Self {
        Self {
            resolution: track.resolution,
            tempos: track.tempos,
        }
    }
}

impl SyncTrack {
    /// Build a sync track. `tempos` must start at tick 0 and be sorted.
    pub fn new(resolution: u32, tempos: Vec<TempoChange>) -> Result<Self, ChartError> {
        if resolution == 0 {
            return Err(ChartError::ZeroResolution);
        }
        if tempos.first().is_none_or(|tempo| tempo.tick != 0) {
            return Err(ChartError::TempoMapOrder);
        }
        if tempos.windows(2).any(|pair| pair[0].tick >= pair[1].tick) {
            return Err(ChartError::TempoMapOrder);
        }
        if let Some(bad) = tempos.iter().find(|t| !(t.bpm > 0.0 && t.bpm.is_finite())) {
            return Err(ChartError::InvalidTempo {
                tick: bad.tick,
                bpm: bad.bpm,
            });
        }

        let mut tempo_times = Vec::with_capacity(tempos.len());
        let mut time = 0.0;
        for (i, tempo) in tempos.iter().enumerate() {
            if i > 0 {
                let prev = tempos[i - 1];
                time += ticks_to_seconds(tempo.tick - prev.tick, resolution, prev.bpm);
            }
            tempo_times.push(time);
        }

        Ok(Self {
            resolution,
            tempos,
            tempo_times,
        })
    }

    /// A single-tempo track.
    pub fn constant(resolution: u32, bpm: f64) -> Result<Self, ChartError> {
        Self::new(resolution, vec![TempoChange { tick: 0, bpm }])
    }

    /// Ticks per beat.
    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    pub fn tempos(&self) -> &[TempoChange] {
        &self.tempos
    }

    pub fn tick_to_time(&self, tick: u32) -> f64 {
        let index = self.tempos.partition_point(|t| t.tick <= tick).saturating_sub(1);
        let tempo = self.tempos[index];
        self.tempo_times[index] + ticks_to_seconds(tick - tempo.tick, self.resolution, tempo.bpm)
    }

    /// Last tick whose [`tick_to_time`](Self::tick_to_time) is at or before
    /// `time`. Times before zero map to tick 0.
    ///
    /// Exact at tick boundaries: `time_to_tick(tick_to_time(n)) == n`.
    pub fn time_to_tick(&self, time: f64) -> u32 {
        if time <= 0.0 {
            return 0;
        }
        let index = self
            .tempo_times
            .partition_point(|&t| t <= time)
            .saturating_sub(1);
        let tempo = self.tempos[index];
        let beats = (time - self.tempo_times[index]) * tempo.bpm / 60.0;
        let ticks = (beats * self.resolution as f64).floor();
        let tick = tempo.tick.saturating_add(ticks.min(u32::MAX as f64) as u32);

        // The float round trip can land one tick off in either direction.
        if tick > tempo.tick && self.tick_to_time(tick) > time {
            tick - 1
        } else if tick < u32::MAX && self.tick_to_time(tick + 1) <= time {
            tick + 1
        } else {
            tick
        }
    }
}

fn ticks_to_seconds(ticks: u32, resolution: u32, bpm: f64) -> f64 {
    ticks as f64 / resolution as f64 * 60.0 / bpm
}

/// The notes of one instrument difficulty plus the tempo map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chart {
    notes: Vec<GuitarNote>,
    sync_track: SyncTrack,
}

impl Chart {
    /// Build a chart. Notes must be in strictly increasing time order.
    pub fn new(notes: Vec<GuitarNote>, sync_track: SyncTrack) -> Result<Self, ChartError> {
        let chart = Self { notes, sync_track };
        chart.validate()?;
        Ok(chart)
    }

    /// Check the invariants of a chart (also needed after deserializing).
    pub fn validate(&self) -> Result<(), ChartError> {
        for (index, note) in self.notes.iter().enumerate() {
            if note.note_mask.is_empty() {
                return Err(ChartError::EmptyNoteMask { index });
            }
            if note.tick_end < note.tick {
                return Err(ChartError::InvalidSustain {
                    index,
                    tick: note.tick,
                    tick_end: note.tick_end,
                });
            }
            if index > 0 && !(note.time > self.notes[index - 1].time) {
                return Err(ChartError::NotesOutOfOrder {
                    index,
                    time: note.time,
                });
            }
        }
        Ok(())
    }

    pub fn notes(&self) -> &[GuitarNote] {
        &self.notes
    }

    pub(crate) fn notes_mut(&mut self) -> &mut [GuitarNote] {
        &mut self.notes
    }

    pub fn sync_track(&self) -> &SyncTrack {
        &self.sync_track
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Clear every hit/miss flag, for restarting a song from the top.
    pub fn reset_note_states(&mut self) {
        self.notes.iter_mut().for_each(GuitarNote::reset_state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sync() -> SyncTrack {
        SyncTrack::constant(480, 120.0).unwrap()
    }

    #[test]
    fn constant_tempo_conversion() {
        let track = sync();
        // 120 bpm, 480 ticks per beat -> 960 ticks per second
        assert_eq!(track.time_to_tick(1.0), 960);
        assert!((track.tick_to_time(480) - 0.5).abs() < 1e-9);
        assert_eq!(track.time_to_tick(-1.0), 0);
    }

    #[test]
    fn tick_boundaries_round_trip() {
        let track = sync();
        for tick in 0..3000 {
            assert_eq!(track.time_to_tick(track.tick_to_time(tick)), tick);
        }

        let track = SyncTrack::new(
            192,
            vec![
                TempoChange { tick: 0, bpm: 143.7 },
                TempoChange { tick: 768, bpm: 97.3 },
            ],
        )
        .unwrap();
        for tick in 0..3000 {
            let time = track.tick_to_time(tick);
            assert_eq!(track.time_to_tick(time), tick);
            if tick > 0 {
                assert_eq!(track.time_to_tick(time - 1e-9), tick - 1);
            }
        }
    }

    #[test]
    fn tempo_change_conversion() {
        let track = SyncTrack::new(
            480,
            vec![
                TempoChange { tick: 0, bpm: 120.0 },
                TempoChange { tick: 960, bpm: 60.0 },
            ],
        )
        .unwrap();
        // First 960 ticks take 1s, then 480 ticks per second
        assert!((track.tick_to_time(960) - 1.0).abs() < 1e-9);
        assert!((track.tick_to_time(1440) - 2.0).abs() < 1e-9);
        assert_eq!(track.time_to_tick(2.0), 1440);
    }

    #[test]
    fn rejects_bad_tempo_maps() {
        assert_eq!(SyncTrack::constant(0, 120.0), Err(ChartError::ZeroResolution));
        assert_eq!(SyncTrack::new(480, vec![]), Err(ChartError::TempoMapOrder));
        assert!(matches!(
            SyncTrack::constant(480, 0.0),
            Err(ChartError::InvalidTempo { .. })
        ));
    }

    #[test]
    fn rejects_unsorted_notes() {
        let notes = vec![
            GuitarNote::new(1.0, 960, FretMask::GREEN, NoteKind::Strum),
            GuitarNote::new(1.0, 960, FretMask::RED, NoteKind::Strum),
        ];
        assert_eq!(
            Chart::new(notes, sync()),
            Err(ChartError::NotesOutOfOrder { index: 1, time: 1.0 })
        );
    }

    #[test]
    fn rejects_empty_mask() {
        let notes = vec![GuitarNote::new(1.0, 960, FretMask::EMPTY, NoteKind::Strum)];
        assert_eq!(
            Chart::new(notes, sync()),
            Err(ChartError::EmptyNoteMask { index: 0 })
        );
    }

    #[test]
    fn result_flags_set_once() {
        let mut note = GuitarNote::new(1.0, 960, FretMask::GREEN, NoteKind::Strum);
        assert!(note.set_hit());
        assert!(!note.set_missed());
        assert!(!note.set_hit());
        assert!(note.was_hit());
        assert!(!note.was_missed());
    }

    #[test]
    fn chord_and_sustain_flags() {
        let open_chord = GuitarNote::new(0.5, 480, FretMask::OPEN | FretMask::RED, NoteKind::Hopo);
        assert!(open_chord.is_chord());

        let single = GuitarNote::new(0.5, 480, FretMask::RED, NoteKind::Strum)
            .with_sustain(960, true);
        assert!(!single.is_chord());
        assert!(single.is_sustain());
        assert!(single.is_extended_sustain());
        assert_eq!(single.tick_length(), 480);
        assert_eq!(single.sustain_mask(), FretMask::RED);
    }

    #[test]
    fn chart_deserializes_and_validates() {
        let json = r#"{
            "notes": [
                {"time": 1.0, "tick": 960, "tick_end": 960, "note_mask": 1},
                {"time": 1.5, "tick": 1440, "tick_end": 1440, "note_mask": 2, "kind": "Hopo"}
            ],
            "sync_track": {"resolution": 480, "tempos": [{"tick": 0, "bpm": 120.0}]}
        }"#;
        let chart: Chart = serde_json::from_str(json).unwrap();
        chart.validate().unwrap();
        assert_eq!(chart.len(), 2);
        assert!(chart.notes()[1].is_hopo());
        assert!(!chart.notes()[0].was_hit());
    }
}
