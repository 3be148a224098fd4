// Escape from a search pinned at maximum duty

/// Tracks consecutive passes at maximum duty
pub struct BypassMonitor {
    stuck_passes: u16,
    recorded_battery_current: f32,
    stuck_limit: u16,
    grace: u16,
}

impl BypassMonitor {
    /// # Arguments
    /// * `stuck_limit` - Passes at maximum duty before bypass
    /// * `grace` - Passes before a battery current drop also triggers bypass
    pub const fn new(stuck_limit: u16, grace: u16) -> Self {
        Self {
            stuck_passes: 0,
            recorded_battery_current: 0.0,
            stuck_limit,
            grace,
        }
    }

    pub fn reset(&mut self) {
        self.stuck_passes = 0;
        self.recorded_battery_current = 0.0;
    }

    /// Observe one pass
    ///
    /// # Returns
    /// `true` when the converter should be bypassed
    pub fn observe(&mut self, at_max_duty: bool, battery_current: f32) -> bool {
        if !at_max_duty {
            self.stuck_passes = 0;
            return false;
        }

        if self.stuck_passes == 0 {
            self.recorded_battery_current = battery_current;
        }
        self.stuck_passes = self.stuck_passes.saturating_add(1);

        let timed_out = self.stuck_passes >= self.stuck_limit;
        let current_dropped =
            self.stuck_passes >= self.grace && battery_current < self.recorded_battery_current;

        if timed_out || current_dropped {
            warn!(
                "MPPT stuck at max duty for {} passes, bypassing",
                self.stuck_passes
            );
            self.reset();
            return true;
        }
        false
    }

    pub fn get_stuck_passes(&self) -> u16 {
        self.stuck_passes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_after_stuck_limit() {
        let mut m = BypassMonitor::new(600, 100);
        for _ in 0..599 {
            assert!(!m.observe(true, 1.0));
        }
        assert!(m.observe(true, 1.0));
        assert_eq!(m.get_stuck_passes(), 0);
    }

    #[test]
    fn test_counter_resets_off_max() {
        let mut m = BypassMonitor::new(600, 100);
        for _ in 0..500 {
            m.observe(true, 1.0);
        }
        assert!(!m.observe(false, 1.0));
        assert_eq!(m.get_stuck_passes(), 0);
    }

    #[test]
    fn test_current_drop_after_grace() {
        let mut m = BypassMonitor::new(600, 100);
        assert!(!m.observe(true, 2.0));
        // 猶予期間中の電流低下では発動しない
        for _ in 0..98 {
            assert!(!m.observe(true, 1.5));
        }
        assert!(m.observe(true, 1.5));
    }
}
