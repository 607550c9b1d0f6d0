use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::hit_window::HitWindowSettings;

/// Newest parameter schema version written by [`SerializedGuitarEngineParameters`].
pub const CURRENT_PARAMETERS_VERSION: u16 = 2;

/// Tuning for a five-fret engine. Immutable once an engine is built.
#[derive(Debug, Clone, PartialEq)]
pub struct GuitarEngineParameters {
    pub hit_window: HitWindowSettings,
    pub max_multiplier: u32,
    /// Score-to-base-score ratios needed for each star, ascending.
    pub star_multiplier_thresholds: Vec<f64>,
    /// How long a hit hopo/tap can absorb a following strum.
    pub hopo_leniency: f64,
    /// How long a strum waits for a note before it counts as an overstrum.
    pub strum_leniency: f64,
    /// Extra strum leniency when no note is in its window yet.
    pub strum_leniency_small: f64,
    /// How long one whammy movement keeps whammy active.
    pub star_power_whammy_buffer: f64,
    /// A sustain completes early once it is within `resolution / fraction`
    /// ticks of its end. 0 disables early completion.
    pub sustain_burst_fraction: u32,
    /// Hopos/taps may be hit with frets pressed any time before their window.
    pub infinite_front_end: bool,
    /// Block hopo/tap hits after a wrong hammer-on inside the note's window.
    pub anti_ghosting: bool,
    /// Gamepad mode: time to finish a chord before the strum becomes an overstrum.
    pub gamepad_mode_chord_leniency: f64,
    /// Gamepad mode: releasing a fret also counts as a strum.
    pub gamepad_mode_strum_on_release: bool,
}

impl GuitarEngineParameters {
    pub fn validate(&self) -> Result<(), EngineError> {
        self.hit_window.validate()?;

        if self.max_multiplier == 0 {
            return Err(EngineError::InvalidMultiplier(self.max_multiplier));
        }

        if self
            .star_multiplier_thresholds
            .windows(2)
            .any(|pair| !(pair[0] < pair[1]))
        {
            return Err(EngineError::InvalidStarThresholds);
        }

        let leniencies = [
            ("hopo_leniency", self.hopo_leniency),
            ("strum_leniency", self.strum_leniency),
            ("strum_leniency_small", self.strum_leniency_small),
            ("star_power_whammy_buffer", self.star_power_whammy_buffer),
            ("gamepad_mode_chord_leniency", self.gamepad_mode_chord_leniency),
        ];
        for (name, value) in leniencies {
            if !(value.is_finite() && value >= 0.0) {
                return Err(EngineError::InvalidLeniency { name, value });
            }
        }

        Ok(())
    }
}

impl Default for GuitarEngineParameters {
    fn default() -> Self {
        Self {
            hit_window: HitWindowSettings::default(),
            max_multiplier: 4,
            star_multiplier_thresholds: vec![0.21, 0.46, 0.77, 1.85, 3.08, 4.52],
            hopo_leniency: 0.08,
            strum_leniency: 0.05,
            strum_leniency_small: 0.025,
            star_power_whammy_buffer: 0.25,
            sustain_burst_fraction: 4,
            infinite_front_end: false,
            anti_ghosting: true,
            gamepad_mode_chord_leniency: 0.06,
            gamepad_mode_strum_on_release: false,
        }
    }
}

/// Persisted form of [`GuitarEngineParameters`], stored in replays.
///
/// Version 1 predates gamepad mode and has no gamepad fields; version 2 adds
/// them. Conversion copies every field verbatim so a replay always scores
/// with the tuning it was recorded under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedGuitarEngineParameters {
    pub version: u16,
    pub hit_window: HitWindowSettings,
    pub max_multiplier: u32,
    pub star_multiplier_thresholds: Vec<f64>,
    pub hopo_leniency: f64,
    pub strum_leniency: f64,
    pub strum_leniency_small: f64,
    pub star_power_whammy_buffer: f64,
    pub sustain_burst_fraction: u32,
    pub infinite_front_end: bool,
    pub anti_ghosting: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gamepad_mode_chord_leniency: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gamepad_mode_strum_on_release: Option<bool>,
}

impl From<&GuitarEngineParameters> for SerializedGuitarEngineParameters {
    fn from(params: &GuitarEngineParameters) -> Self {
        Self {
            version: CURRENT_PARAMETERS_VERSION,
            hit_window: params.hit_window.clone(),
            max_multiplier: params.max_multiplier,
            star_multiplier_thresholds: params.star_multiplier_thresholds.clone(),
            hopo_leniency: params.hopo_leniency,
            strum_leniency: params.strum_leniency,
            strum_leniency_small: params.strum_leniency_small,
            star_power_whammy_buffer: params.star_power_whammy_buffer,
            sustain_burst_fraction: params.sustain_burst_fraction,
            infinite_front_end: params.infinite_front_end,
            anti_ghosting: params.anti_ghosting,
            gamepad_mode_chord_leniency: Some(params.gamepad_mode_chord_leniency),
            gamepad_mode_strum_on_release: Some(params.gamepad_mode_strum_on_release),
        }
    }
}

impl TryFrom<SerializedGuitarEngineParameters> for GuitarEngineParameters {
    type Error = EngineError;

    fn try_from(data: SerializedGuitarEngineParameters) -> Result<Self, Self::Error> {
        let (chord_leniency, strum_on_release) = match data.version {
            // No gamepad mode existed; the values are never read by a
            // non-gamepad engine but must still be valid.
            1 => (0.0, false),
            2 => (
                data.gamepad_mode_chord_leniency.ok_or(EngineError::MissingField {
                    version: 2,
                    field: "gamepad_mode_chord_leniency",
                })?,
                data.gamepad_mode_strum_on_release
                    .ok_or(EngineError::MissingField {
                        version: 2,
                        field: "gamepad_mode_strum_on_release",
                    })?,
            ),
            other => return Err(EngineError::UnsupportedVersion(other)),
        };

        let params = Self {
            hit_window: data.hit_window,
            max_multiplier: data.max_multiplier,
            star_multiplier_thresholds: data.star_multiplier_thresholds,
            hopo_leniency: data.hopo_leniency,
            strum_leniency: data.strum_leniency,
            strum_leniency_small: data.strum_leniency_small,
            star_power_whammy_buffer: data.star_power_whammy_buffer,
            sustain_burst_fraction: data.sustain_burst_fraction,
            infinite_front_end: data.infinite_front_end,
            anti_ghosting: data.anti_ghosting,
            gamepad_mode_chord_leniency: chord_leniency,
            gamepad_mode_strum_on_release: strum_on_release,
        };
        params.validate()?;
        Ok(params)
    }
}
