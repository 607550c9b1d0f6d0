use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Where the current time sits relative to a note's timing window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowPosition {
    /// The window has not opened yet.
    Early,
    Inside,
    /// The window has fully elapsed.
    Missed,
}

/// Sizing policy for the asymmetric timing window around a note.
///
/// The engine only asks for a full window size from the spacing of
/// neighboring notes and splits it into a front end (negative, before the
/// note) and back end (positive, after it).
pub trait HitWindowPolicy {
    /// Full window size in seconds for a note whose neighbors are on average
    /// `average_time_distance` seconds away.
    fn calculate_hit_window(&self, average_time_distance: f64) -> f64;

    /// Offset of the window start relative to the note time (<= 0).
    fn front_end(&self, full_window: f64) -> f64;

    /// Offset of the window end relative to the note time (>= 0).
    fn back_end(&self, full_window: f64) -> f64;

    /// The window is `[time + front_end, time + back_end)`.
    fn position(&self, note_time: f64, average_time_distance: f64, now: f64) -> WindowPosition {
        let window = self.calculate_hit_window(average_time_distance);
        if now >= note_time + self.back_end(window) {
            WindowPosition::Missed
        } else if now < note_time + self.front_end(window) {
            WindowPosition::Early
        } else {
            WindowPosition::Inside
        }
    }
}

/// Static or note-density-scaled hit window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HitWindowSettings {
    /// Largest full window size in seconds.
    pub max_window: f64,
    /// Smallest full window size in seconds (dynamic windows only).
    pub min_window: f64,
    pub is_dynamic: bool,
    /// 1.0 = symmetric. Larger values move time from the back end to the front.
    pub front_to_back_ratio: f64,
    /// Density scale for dynamic windows: notes this many max-windows apart
    /// (on average) get the full window.
    pub dynamic_scale: f64,
    /// Curve exponent for dynamic windows.
    pub dynamic_gamma: f64,
}

impl HitWindowSettings {
    pub fn fixed(window: f64) -> Self {
        Self {
            max_window: window,
            min_window: window,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        let finite = [
            self.max_window,
            self.min_window,
            self.front_to_back_ratio,
            self.dynamic_scale,
            self.dynamic_gamma,
        ]
        .iter()
        .all(|v| v.is_finite());
        if !finite {
            return Err(EngineError::InvalidHitWindow("values must be finite"));
        }
        if self.max_window <= 0.0 {
            return Err(EngineError::InvalidHitWindow("max window must be positive"));
        }
        if self.is_dynamic && (self.min_window <= 0.0 || self.min_window > self.max_window) {
            return Err(EngineError::InvalidHitWindow(
                "min window must be positive and not above the max window",
            ));
        }
        if !(0.0..=2.0).contains(&self.front_to_back_ratio) {
            return Err(EngineError::InvalidHitWindow(
                "front to back ratio must be within 0..=2",
            ));
        }
        if self.is_dynamic && (self.dynamic_scale <= 0.0 || self.dynamic_gamma <= 0.0) {
            return Err(EngineError::InvalidHitWindow(
                "dynamic scale and gamma must be positive",
            ));
        }
        Ok(())
    }

    fn dynamic(&self, average_time_distance: f64) -> f64 {
        let density =
            (average_time_distance * self.dynamic_scale / self.max_window).clamp(0.0, 1.0);
        let size = self.min_window
            + (self.max_window - self.min_window) * density.powf(self.dynamic_gamma);
        size.clamp(self.min_window, self.max_window)
    }
}

impl Default for HitWindowSettings {
    fn default() -> Self {
        Self {
            max_window: 0.14,
            min_window: 0.1,
            is_dynamic: false,
            front_to_back_ratio: 1.0,
            dynamic_scale: 1.0,
            dynamic_gamma: 1.0,
        }
    }
}

impl HitWindowPolicy for HitWindowSettings {
    fn calculate_hit_window(&self, average_time_distance: f64) -> f64 {
        if self.is_dynamic {
            self.dynamic(average_time_distance)
        } else {
            self.max_window
        }
    }

    fn front_end(&self, full_window: f64) -> f64 {
        -(full_window / 2.0).abs() * self.front_to_back_ratio
    }

    fn back_end(&self, full_window: f64) -> f64 {
        (full_window / 2.0).abs() * (2.0 - self.front_to_back_ratio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symmetric_static_window() {
        let settings = HitWindowSettings::fixed(0.14);
        let window = settings.calculate_hit_window(0.5);
        assert!((window - 0.14).abs() < 1e-9);
        assert!((settings.front_end(window) + 0.07).abs() < 1e-9);
        assert!((settings.back_end(window) - 0.07).abs() < 1e-9);
    }

    #[test]
    fn ratio_shifts_window_forward() {
        let settings = HitWindowSettings {
            front_to_back_ratio: 1.5,
            ..HitWindowSettings::fixed(0.2)
        };
        assert!((settings.front_end(0.2) + 0.15).abs() < 1e-9);
        assert!((settings.back_end(0.2) - 0.05).abs() < 1e-9);
    }

    #[test]
    fn dynamic_window_shrinks_for_dense_notes() {
        let settings = HitWindowSettings {
            is_dynamic: true,
            max_window: 0.14,
            min_window: 0.08,
            ..HitWindowSettings::default()
        };
        let dense = settings.calculate_hit_window(0.01);
        let sparse = settings.calculate_hit_window(1.0);
        assert!(dense < sparse);
        assert!(dense >= 0.08);
        assert!((sparse - 0.14).abs() < 1e-9);
    }

    #[test]
    fn position_is_half_open() {
        let settings = HitWindowSettings::fixed(0.2);
        assert_eq!(settings.position(1.0, 0.5, 0.85), WindowPosition::Early);
        assert_eq!(settings.position(1.0, 0.5, 0.91), WindowPosition::Inside);
        assert_eq!(settings.position(1.0, 0.5, 1.09), WindowPosition::Inside);
        assert_eq!(settings.position(1.0, 0.5, 1.1), WindowPosition::Missed);
    }

    #[test]
    fn rejects_zero_window() {
        assert_eq!(
            HitWindowSettings::fixed(0.0).validate(),
            Err(EngineError::InvalidHitWindow("max window must be positive"))
        );
        let inverted = HitWindowSettings {
            is_dynamic: true,
            max_window: 0.1,
            min_window: 0.2,
            ..HitWindowSettings::default()
        };
        assert!(inverted.validate().is_err());
    }
}
