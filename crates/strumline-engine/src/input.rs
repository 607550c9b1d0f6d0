use serde::{Deserialize, Serialize};

use crate::mask::Fret;

/// Guitar controller actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum GuitarAction {
    GreenFret = 0,
    RedFret = 1,
    YellowFret = 2,
    BlueFret = 3,
    OrangeFret = 4,
    /// Explicit "no fret" input from controllers that expose one.
    OpenFret = 5,
    StrumUp = 6,
    StrumDown = 7,
    Whammy = 8,
    StarPower = 9,
}

impl GuitarAction {
    pub const ALL: [Self; 10] = [
        Self::GreenFret,
        Self::RedFret,
        Self::YellowFret,
        Self::BlueFret,
        Self::OrangeFret,
        Self::OpenFret,
        Self::StrumUp,
        Self::StrumDown,
        Self::Whammy,
        Self::StarPower,
    ];

    /// Stable numeric code used by the replay key log.
    pub const fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }

    pub fn from_fret(fret: Fret) -> Self {
        match fret {
            Fret::Green => Self::GreenFret,
            Fret::Red => Self::RedFret,
            Fret::Yellow => Self::YellowFret,
            Fret::Blue => Self::BlueFret,
            Fret::Orange => Self::OrangeFret,
        }
    }

    /// The colored fret this action drives, if any.
    pub fn fret(self) -> Option<Fret> {
        match self {
            Self::GreenFret => Some(Fret::Green),
            Self::RedFret => Some(Fret::Red),
            Self::YellowFret => Some(Fret::Yellow),
            Self::BlueFret => Some(Fret::Blue),
            Self::OrangeFret => Some(Fret::Orange),
            _ => None,
        }
    }

    /// Whether the action changes the held fret mask (open included).
    pub fn is_fret(self) -> bool {
        self.fret().is_some() || self == Self::OpenFret
    }

    pub fn is_strum(self) -> bool {
        matches!(self, Self::StrumUp | Self::StrumDown)
    }
}

/// A single timestamped controller event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GameInput {
    /// Song time in seconds.
    pub time: f64,
    pub action: GuitarAction,
    /// true = pressed, false = released.
    pub button: bool,
}

impl GameInput {
    pub fn new(time: f64, action: GuitarAction, button: bool) -> Self {
        Self {
            time,
            action,
            button,
        }
    }

    pub fn press(time: f64, action: GuitarAction) -> Self {
        Self::new(time, action, true)
    }

    pub fn release(time: f64, action: GuitarAction) -> Self {
        Self::new(time, action, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip() {
        for action in GuitarAction::ALL {
            assert_eq!(GuitarAction::from_code(action.code()), Some(action));
        }
        assert_eq!(GuitarAction::from_code(10), None);
    }

    #[test]
    fn open_fret_is_fret_input_without_color() {
        assert!(GuitarAction::OpenFret.is_fret());
        assert_eq!(GuitarAction::OpenFret.fret(), None);
        assert!(!GuitarAction::Whammy.is_fret());
        assert!(GuitarAction::StrumDown.is_strum());
    }

    #[test]
    fn fret_mapping_is_symmetric() {
        for fret in Fret::ALL {
            assert_eq!(GuitarAction::from_fret(fret).fret(), Some(fret));
        }
    }
}
