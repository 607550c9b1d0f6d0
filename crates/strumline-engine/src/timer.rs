/// Cancelable, speed-scaled countdown used for every leniency window.
///
/// Started at `start_time`, it ends at `start_time + (duration + offset) / speed`.
/// A disabled timer is never expired and stays disabled until started again.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineTimer {
    duration: f64,
    offset: f64,
    speed: f64,
    start_time: f64,
    end_time: f64,
    active: bool,
}

impl EngineTimer {
    pub fn new(duration: f64) -> Self {
        Self {
            duration: duration.max(0.0),
            offset: 0.0,
            speed: 1.0,
            start_time: 0.0,
            end_time: 0.0,
            active: false,
        }
    }

    /// Configured duration before speed scaling.
    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    pub fn end_time(&self) -> f64 {
        self.end_time
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_expired(&self, now: f64) -> bool {
        self.active && now >= self.end_time
    }

    pub fn start(&mut self, now: f64) {
        self.start_with_offset(now, 0.0);
    }

    /// Start the timer with its window widened by `offset` seconds.
    pub fn start_with_offset(&mut self, now: f64, offset: f64) {
        self.start_time = now;
        self.offset = offset.max(0.0);
        self.active = true;
        self.recompute_end();
    }

    pub fn disable(&mut self) {
        self.active = false;
    }

    /// Change the playback speed at `now`. An active timer keeps the time
    /// already elapsed; only what remains of it is rescaled.
    pub fn set_speed(&mut self, now: f64, speed: f64) {
        if speed <= 0.0 || !speed.is_finite() {
            log::warn!("Ignoring invalid timer speed {speed}");
            return;
        }
        if self.active {
            let remaining = (self.end_time - now).max(0.0);
            self.end_time = now + remaining * self.speed / speed;
        }
        self.speed = speed;
    }

    fn recompute_end(&mut self) {
        self.end_time = self.start_time + (self.duration + self.offset) / self.speed;
    }
}

/// Start `timer` at `now`, widening it by `offset` when positive.
pub fn start_timer(timer: &mut EngineTimer, now: f64, offset: f64) {
    if offset > 0.0 {
        timer.start_with_offset(now, offset);
    } else {
        timer.start(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inactive_until_started() {
        let timer = EngineTimer::new(0.05);
        assert!(!timer.is_active());
        assert!(!timer.is_expired(100.0));
    }

    #[test]
    fn expires_at_end_time() {
        let mut timer = EngineTimer::new(0.5);
        timer.start(1.0);
        assert!(timer.is_active());
        assert!(!timer.is_expired(1.25));
        assert!(timer.is_expired(1.5));
        assert!(timer.is_expired(2.0));
    }

    #[test]
    fn disable_is_final_until_restart() {
        let mut timer = EngineTimer::new(0.5);
        timer.start(1.0);
        timer.disable();
        assert!(!timer.is_active());
        assert!(!timer.is_expired(10.0));

        timer.set_speed(5.0, 2.0);
        assert!(!timer.is_active());

        timer.start(3.0);
        assert!(timer.is_active());
    }

    #[test]
    fn offset_widens_window() {
        let mut timer = EngineTimer::new(0.5);
        start_timer(&mut timer, 1.0, 0.25);
        assert!((timer.end_time() - 1.75).abs() < 1e-9);

        start_timer(&mut timer, 1.0, 0.0);
        assert!((timer.end_time() - 1.5).abs() < 1e-9);
    }

    #[test]
    fn speed_scales_window() {
        let mut timer = EngineTimer::new(0.5);
        timer.set_speed(0.0, 2.0);
        timer.start(1.0);
        assert!((timer.end_time() - 1.25).abs() < 1e-9);

        timer.set_speed(1.0, 0.5);
        assert!((timer.end_time() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn speed_change_rescales_remaining_time() {
        let mut timer = EngineTimer::new(0.5);
        timer.start(1.0);

        // 0.1s left at 1.4, halved by double speed.
        timer.set_speed(1.4, 2.0);
        assert!((timer.end_time() - 1.45).abs() < 1e-9);
        assert!(!timer.is_expired(1.44));
        assert!(timer.is_expired(1.45));

        // 0.05s left at 1.4, doubled by going back to normal speed.
        timer.set_speed(1.4, 1.0);
        assert!((timer.end_time() - 1.5).abs() < 1e-9);
    }

    #[test]
    fn invalid_speed_is_ignored() {
        let mut timer = EngineTimer::new(0.5);
        timer.set_speed(0.0, 0.0);
        assert!((timer.speed() - 1.0).abs() < f64::EPSILON);
        timer.set_speed(0.0, f64::NAN);
        assert!((timer.speed() - 1.0).abs() < f64::EPSILON);
    }
}
