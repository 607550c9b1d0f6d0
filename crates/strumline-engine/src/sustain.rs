/// Sustain points per beat held, before the multiplier.
pub const SUSTAIN_POINTS_PER_BEAT: f64 = 25.0;

/// A hit sustain note that is still being held.
///
/// Score accrues from `base_tick` on top of `base_score`. Both are rebased
/// whenever the multiplier changes, so ticks already held keep the multiplier
/// they were held under.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveSustain {
    pub note_index: usize,
    pub base_tick: u32,
    pub base_score: f64,
}

impl ActiveSustain {
    pub fn new(note_index: usize, base_tick: u32) -> Self {
        Self {
            note_index,
            base_tick,
            base_score: 0.0,
        }
    }

    /// Points accrued by holding until `tick`.
    pub fn points_at(&self, tick: u32, resolution: u32, multiplier: u32) -> f64 {
        let held = tick.saturating_sub(self.base_tick) as f64;
        self.base_score + held / resolution as f64 * SUSTAIN_POINTS_PER_BEAT * multiplier as f64
    }

    pub fn rebase(&mut self, tick: u32, resolution: u32, multiplier: u32) {
        self.base_score = self.points_at(tick, resolution, multiplier);
        self.base_tick = self.base_tick.max(tick);
    }
}

/// Tick at which a sustain counts as complete.
///
/// Sustains end `threshold` ticks early; ones no longer than the threshold
/// complete as soon as they start.
pub fn burst_tick(tick: u32, tick_end: u32, threshold: u32) -> u32 {
    if tick_end - tick <= threshold {
        tick
    } else {
        tick_end - threshold
    }
}
