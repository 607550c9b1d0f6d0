//! Deterministic five-fret guitar hit detection.
//!
//! An external driver queues timestamped [`GameInput`]s and advances song time
//! with [`GuitarEngine::update`]; the engine resolves hits, misses, overstrums
//! and sustains against a [`Chart`] and reports them as [`EngineEvent`]s and
//! [`GuitarStats`].

pub mod chart;
pub mod engine;
pub mod error;
pub mod events;
pub mod hit_window;
pub mod input;
pub mod mask;
pub mod params;
pub mod stats;
pub mod sustain;
pub mod timer;

pub use chart::{Chart, GuitarNote, NoteKind, SyncTrack, TempoChange};
pub use engine::{EngineState, FiveFretEngine, GuitarEngine};
pub use error::{ChartError, EngineError};
pub use events::EngineEvent;
pub use hit_window::{HitWindowPolicy, HitWindowSettings, WindowPosition};
pub use input::{GameInput, GuitarAction};
pub use mask::{Fret, FretMask};
pub use params::{
    CURRENT_PARAMETERS_VERSION, GuitarEngineParameters, SerializedGuitarEngineParameters,
};
pub use stats::GuitarStats;
pub use timer::EngineTimer;
