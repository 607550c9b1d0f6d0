use std::fmt;
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, BitXor, Not};

use serde::{Deserialize, Serialize};

/// One of the five colored frets, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum Fret {
    Green = 0,
    Red = 1,
    Yellow = 2,
    Blue = 3,
    Orange = 4,
}

impl Fret {
    pub const ALL: [Self; 5] = [
        Self::Green,
        Self::Red,
        Self::Yellow,
        Self::Blue,
        Self::Orange,
    ];

    /// Convert from a 0-based fret index.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn mask(self) -> FretMask {
        FretMask(1 << self as u8)
    }
}

/// Set of held (or required) frets.
///
/// Bits 0..=4 are the five frets; bit 6 is the reserved open bit, which sits
/// above every fret so that "highest held fret" comparisons treat an empty hand
/// as higher than any fret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FretMask(u8);

impl FretMask {
    pub const EMPTY: Self = Self(0);
    pub const OPEN: Self = Self(1 << 6);
    pub const GREEN: Self = Fret::Green.mask();
    pub const RED: Self = Fret::Red.mask();
    pub const YELLOW: Self = Fret::Yellow.mask();
    pub const BLUE: Self = Fret::Blue.mask();
    pub const ORANGE: Self = Fret::Orange.mask();

    /// Every fret bit, open bit excluded.
    pub const ALL_FRETS: Self = Self(0b1_1111);

    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub fn from_frets(frets: &[Fret]) -> Self {
        frets.iter().fold(Self::EMPTY, |mask, fret| mask | fret.mask())
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True if every bit of `other` is set in `self`.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    pub const fn has_open(self) -> bool {
        self.intersects(Self::OPEN)
    }

    /// Same mask with the open bit cleared.
    pub const fn without_open(self) -> Self {
        Self(self.0 & !Self::OPEN.0)
    }

    pub const fn with_open(self) -> Self {
        Self(self.0 | Self::OPEN.0)
    }

    /// Whether the mask is exactly the open bit.
    pub const fn is_open_only(self) -> bool {
        self.0 == Self::OPEN.0
    }

    pub fn is_held(self, fret: Fret) -> bool {
        self.contains(fret.mask())
    }

    /// Set or clear one fret bit.
    pub fn set_fret(&mut self, fret: Fret, held: bool) {
        if held {
            self.0 |= fret.mask().0;
        } else {
            self.0 &= !fret.mask().0;
        }
    }

    /// Number of set bits, open bit included.
    pub const fn count(self) -> u32 {
        self.0.count_ones()
    }

    /// 1-based position of the highest set bit, or 0 for an empty mask.
    pub const fn most_significant_bit(self) -> u32 {
        u8::BITS - self.0.leading_zeros()
    }

    /// Mask of the lowest fret in the set (open bit ignored), or empty.
    pub fn lowest_fret(self) -> Self {
        Fret::ALL
            .into_iter()
            .map(Fret::mask)
            .find(|&fret| self.contains(fret))
            .unwrap_or(Self::EMPTY)
    }

    pub fn frets(self) -> impl Iterator<Item = Fret> {
        Fret::ALL.into_iter().filter(move |&fret| self.is_held(fret))
    }
}

impl BitOr for FretMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for FretMask {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for FretMask {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl BitAndAssign for FretMask {
    fn bitand_assign(&mut self, rhs: Self) {
        self.0 &= rhs.0;
    }
}

impl BitXor for FretMask {
    type Output = Self;

    fn bitxor(self, rhs: Self) -> Self {
        Self(self.0 ^ rhs.0)
    }
}

impl Not for FretMask {
    type Output = Self;

    fn not(self) -> Self {
        Self(!self.0)
    }
}

impl From<Fret> for FretMask {
    fn from(fret: Fret) -> Self {
        fret.mask()
    }
}

/// Renders as `GRYBO` with `.` for released frets, plus `+open`.
impl fmt::Display for FretMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const LETTERS: [char; 5] = ['G', 'R', 'Y', 'B', 'O'];
        for (fret, letter) in Fret::ALL.into_iter().zip(LETTERS) {
            let c = if self.is_held(fret) { letter } else { '.' };
            write!(f, "{c}")?;
        }
        if self.has_open() {
            write!(f, "+open")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_bit_sits_above_every_fret() {
        for fret in Fret::ALL {
            assert!(FretMask::OPEN.bits() > fret.mask().bits());
        }
        assert_eq!(FretMask::OPEN.most_significant_bit(), 7);
    }

    #[test]
    fn most_significant_bit_is_one_based() {
        assert_eq!(FretMask::EMPTY.most_significant_bit(), 0);
        assert_eq!(FretMask::GREEN.most_significant_bit(), 1);
        assert_eq!((FretMask::GREEN | FretMask::BLUE).most_significant_bit(), 4);
    }

    #[test]
    fn lowest_fret_ignores_open() {
        let chord = FretMask::YELLOW | FretMask::ORANGE | FretMask::OPEN;
        assert_eq!(chord.lowest_fret(), FretMask::YELLOW);
        assert_eq!(FretMask::OPEN.lowest_fret(), FretMask::EMPTY);
    }

    #[test]
    fn set_fret_toggles_single_bit() {
        let mut mask = FretMask::OPEN;
        mask.set_fret(Fret::Red, true);
        assert_eq!(mask, FretMask::RED | FretMask::OPEN);
        mask.set_fret(Fret::Red, false);
        assert_eq!(mask, FretMask::OPEN);
    }

    #[test]
    fn display_marks_held_frets() {
        let mask = FretMask::from_frets(&[Fret::Green, Fret::Yellow]);
        assert_eq!(mask.to_string(), "G.Y..");
        assert_eq!(FretMask::OPEN.to_string(), ".....+open");
    }

    #[test]
    fn frets_iterates_low_to_high() {
        let mask = FretMask::ORANGE | FretMask::RED;
        let frets: Vec<_> = mask.frets().collect();
        assert_eq!(frets, vec![Fret::Red, Fret::Orange]);
    }
}
