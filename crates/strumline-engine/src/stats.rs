use serde::{Deserialize, Serialize};

/// Points for each note (chord notes count separately) before the multiplier.
pub const POINTS_PER_NOTE: u64 = 50;

/// Combo needed per multiplier step.
pub const COMBO_PER_MULTIPLIER: u32 = 10;

/// Cumulative results of a five-fret play. Counters only grow, except `combo`
/// and the multiplier which reset on a miss or overstrum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuitarStats {
    pub combo: u32,
    pub max_combo: u32,
    pub notes_hit: u32,
    pub notes_missed: u32,
    pub overstrums: u32,
    /// Wrong hammer-ons, counted whether or not anti-ghosting is enforced.
    pub ghost_inputs: u32,
    /// Hopos and taps that were hit by a strum instead of a press.
    pub hopos_strummed: u32,
    pub sustains_completed: u32,
    pub sustains_dropped: u32,
    /// Score from resolved notes and ended sustains.
    pub committed_score: u64,
    /// Score accrued by sustains that are still held.
    pub pending_sustain_score: u64,
    pub score_multiplier: u32,
    pub whammy_inputs: u32,
    pub star_power_activations: u32,
}

impl Default for GuitarStats {
    fn default() -> Self {
        Self {
            combo: 0,
            max_combo: 0,
            notes_hit: 0,
            notes_missed: 0,
            overstrums: 0,
            ghost_inputs: 0,
            hopos_strummed: 0,
            sustains_completed: 0,
            sustains_dropped: 0,
            committed_score: 0,
            pending_sustain_score: 0,
            score_multiplier: 1,
            whammy_inputs: 0,
            star_power_activations: 0,
        }
    }
}

impl GuitarStats {
    pub fn total_score(&self) -> u64 {
        self.committed_score + self.pending_sustain_score
    }

    /// Multiplier earned by the current combo.
    pub fn multiplier_for_combo(combo: u32, max_multiplier: u32) -> u32 {
        (combo / COMBO_PER_MULTIPLIER + 1).min(max_multiplier)
    }

    /// Stars earned: how many thresholds `total_score / base_score` reaches.
    pub fn stars(&self, base_score: u64, thresholds: &[f64]) -> usize {
        if base_score == 0 {
            return 0;
        }
        let ratio = self.total_score() as f64 / base_score as f64;
        thresholds.iter().take_while(|&&t| ratio >= t).count()
    }

    /// Fraction of resolved notes that were hit.
    pub fn hit_rate(&self) -> f64 {
        let resolved = self.notes_hit + self.notes_missed;
        if resolved == 0 {
            return 1.0;
        }
        self.notes_hit as f64 / resolved as f64
    }

    /// Every resolved note hit with no overstrum.
    pub fn is_full_combo(&self) -> bool {
        self.notes_missed == 0 && self.overstrums == 0 && self.notes_hit > 0
    }
}
