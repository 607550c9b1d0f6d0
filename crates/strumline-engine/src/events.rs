use serde::{Deserialize, Serialize};

/// Decisions reported by an engine, in the order they were made.
///
/// `index` always refers to the note's position in the engine's chart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum EngineEvent {
    NoteHit { index: usize, time: f64 },
    NoteMissed { index: usize, time: f64 },
    /// A strum that matched no hittable note.
    Overstrum { time: f64 },
    SustainStart { index: usize, time: f64 },
    /// `dropped`: released before its end. `finished`: reached its end tick.
    SustainEnd {
        index: usize,
        time: f64,
        dropped: bool,
        finished: bool,
    },
    /// A wrong hammer-on while `index` was in its window.
    GhostInput { index: usize, time: f64 },
    StarPowerInput { time: f64, active: bool },
}

impl EngineEvent {
    /// Song time at which the event was decided.
    pub fn time(&self) -> f64 {
        match *self {
            Self::NoteHit { time, .. }
            | Self::NoteMissed { time, .. }
            | Self::Overstrum { time }
            | Self::SustainStart { time, .. }
            | Self::SustainEnd { time, .. }
            | Self::GhostInput { time, .. }
            | Self::StarPowerInput { time, .. } => time,
        }
    }
}
