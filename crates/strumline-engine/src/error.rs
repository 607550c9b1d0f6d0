use thiserror::Error;

/// Errors raised while building a chart.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChartError {
    #[error("note {index} at {time}s is not after the previous note")]
    NotesOutOfOrder { index: usize, time: f64 },

    #[error("note {index} has an empty fret mask")]
    EmptyNoteMask { index: usize },

    #[error("note {index} ends before it starts (tick {tick}, end {tick_end})")]
    InvalidSustain { index: usize, tick: u32, tick_end: u32 },

    #[error("tick resolution must be positive")]
    ZeroResolution,

    #[error("invalid tempo change at tick {tick}: {bpm} bpm")]
    InvalidTempo { tick: u32, bpm: f64 },

    #[error("tempo map must start at tick 0 and be sorted")]
    TempoMapOrder,
}

/// Errors raised while constructing an engine.
///
/// Construction is the only fallible step; once built an engine never fails.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("invalid hit window: {0}")]
    InvalidHitWindow(&'static str),

    #[error("max multiplier must be at least 1, got {0}")]
    InvalidMultiplier(u32),

    #[error("{name} must be a finite, non-negative duration, got {value}")]
    InvalidLeniency { name: &'static str, value: f64 },

    #[error("star multiplier thresholds must be ascending")]
    InvalidStarThresholds,

    #[error("unsupported engine parameter schema version {0}")]
    UnsupportedVersion(u16),

    #[error("schema version {version} requires field `{field}`")]
    MissingField { version: u16, field: &'static str },

    #[error(transparent)]
    Chart(#[from] ChartError),
}
