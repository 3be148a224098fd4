// MPPT duty-cycle controller
//
// Owns the converter duty. The charge state machine only reseeds it on
// (re)entry to active charging.

pub mod bypass;
pub mod constant_voltage;
#[cfg(feature = "incremental-conductance")]
pub mod incremental_conductance;
pub mod perturb_observe;

use crate::config::{MpptConfig, MpptStrategy};
use crate::measurement::MeasurementSnapshot;
use bypass::BypassMonitor;
use constant_voltage::ConstantVoltage;
#[cfg(feature = "incremental-conductance")]
use incremental_conductance::IncrementalConductance;
use perturb_observe::PerturbObserve;

/// Inclusive duty window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DutyBounds {
    pub min: u16,
    pub max: u16,
}

impl DutyBounds {
    pub fn clamp(&self, duty: u16) -> u16 {
        duty.clamp(self.min, self.max)
    }

    /// Apply a signed step and clamp
    pub fn apply(&self, duty: u16, delta: i32) -> u16 {
        let next = (duty as i32 + delta).clamp(self.min as i32, self.max as i32);
        next as u16
    }
}

/// Search algorithm in use
enum Tracker {
    PerturbObserve(PerturbObserve),
    ConstantVoltage(ConstantVoltage),
    #[cfg(feature = "incremental-conductance")]
    IncrementalConductance(IncrementalConductance),
}

impl Tracker {
    fn new(config: &MpptConfig) -> Self {
        match config.strategy {
            MpptStrategy::PerturbAndObserve => Tracker::PerturbObserve(PerturbObserve::new()),
            MpptStrategy::ConstantVoltage => {
                Tracker::ConstantVoltage(ConstantVoltage::new(config.period, config.cv_array_target_v))
            }
            #[cfg(feature = "incremental-conductance")]
            MpptStrategy::IncrementalConductance => {
                Tracker::IncrementalConductance(IncrementalConductance::new())
            }
        }
    }

    fn reset(&mut self) {
        match self {
            Tracker::PerturbObserve(t) => t.reset(),
            Tracker::ConstantVoltage(_) => {}
            #[cfg(feature = "incremental-conductance")]
            Tracker::IncrementalConductance(t) => t.reset(),
        }
    }

    fn step(&mut self, snapshot: &MeasurementSnapshot, duty: u16, bounds: DutyBounds) -> u16 {
        match self {
            Tracker::PerturbObserve(t) => {
                t.step(snapshot.array_voltage, snapshot.array_current, duty, bounds)
            }
            Tracker::ConstantVoltage(t) => t.step(snapshot.battery_voltage, bounds),
            #[cfg(feature = "incremental-conductance")]
            Tracker::IncrementalConductance(t) => {
                t.step(snapshot.array_voltage, snapshot.array_current, duty, bounds)
            }
        }
    }
}

/// Result of one MPPT pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MpptOutcome {
    /// Keep switching at this duty
    Track(u16),
    /// Stuck at maximum duty; stop switching for the cool-down
    Bypass,
}

/// Duty-cycle controller
pub struct MpptController {
    bounds: DutyBounds,
    seed: u16,
    max_pv_v: f32,
    duty: u16,
    tracker: Tracker,
    bypass: BypassMonitor,
}

impl MpptController {
    /// Create a new controller
    ///
    /// # Arguments
    /// * `config` - Duty window, seed, strategy and bypass limits
    /// * `max_pv_v` - Array voltage at which the search is reseeded
    pub fn new(config: &MpptConfig, max_pv_v: f32) -> Self {
        let bounds = DutyBounds {
            min: config.min_duty,
            max: config.max_duty,
        };
        let seed = bounds.clamp(config.seed_duty);
        Self {
            bounds,
            seed,
            max_pv_v,
            duty: seed,
            tracker: Tracker::new(config),
            bypass: BypassMonitor::new(config.stuck_limit_passes, config.grace_passes),
        }
    }

    /// Restart the search from the seed duty
    pub fn reseed(&mut self) -> u16 {
        self.duty = self.seed;
        self.tracker.reset();
        self.bypass.reset();
        self.duty
    }

    /// Run one search step on a fresh snapshot
    pub fn step(&mut self, snapshot: &MeasurementSnapshot) -> MpptOutcome {
        if snapshot.array_voltage >= self.max_pv_v {
            warn!("Array over-voltage, reseeding duty");
            return MpptOutcome::Track(self.reseed());
        }

        self.duty = self.tracker.step(snapshot, self.duty, self.bounds);
        trace!("MPPT duty {}", self.duty);

        if self.bypass.observe(self.duty >= self.bounds.max, snapshot.battery_current) {
            self.duty = self.seed;
            self.tracker.reset();
            return MpptOutcome::Bypass;
        }

        MpptOutcome::Track(self.duty)
    }

    pub fn get_duty(&self) -> u16 {
        self.duty
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(array_voltage: f32, array_current: f32, battery_current: f32) -> MeasurementSnapshot {
        MeasurementSnapshot {
            battery_voltage: 13.0,
            battery_current,
            array_voltage,
            array_current,
            ..Default::default()
        }
    }

    #[test]
    fn test_starts_at_seed() {
        let mppt = MpptController::new(&MpptConfig::default(), 21.0);
        assert_eq!(mppt.get_duty(), 205);
    }

    #[test]
    fn test_over_voltage_reseeds() {
        let mut mppt = MpptController::new(&MpptConfig::default(), 21.0);
        mppt.step(&snapshot(17.0, 1.0, 1.0));
        mppt.step(&snapshot(16.8, 1.2, 1.0));
        assert_eq!(mppt.get_duty(), 206);
        assert_eq!(mppt.step(&snapshot(21.5, 0.1, 1.0)), MpptOutcome::Track(205));
    }

    #[test]
    fn test_bypass_after_pinned_at_max() {
        let mut mppt = MpptController::new(&MpptConfig::default(), 21.0);
        // 電力上昇・電圧低下を繰り返してデューティを上限まで押し上げる
        let mut v = 18.0;
        let mut i = 0.5;
        let mut bypassed = false;
        for _ in 0..1_000 {
            v -= 0.001;
            i += 0.01;
            match mppt.step(&snapshot(v, i, 1.0)) {
                MpptOutcome::Track(duty) => assert!(duty >= 192 && duty <= 218),
                MpptOutcome::Bypass => {
                    bypassed = true;
                    break;
                }
            }
        }
        assert!(bypassed);
        assert_eq!(mppt.get_duty(), 205);
    }

    #[test]
    fn test_constant_voltage_strategy() {
        let config = MpptConfig {
            strategy: MpptStrategy::ConstantVoltage,
            ..MpptConfig::default()
        };
        let mut mppt = MpptController::new(&config, 21.0);
        assert_eq!(mppt.step(&snapshot(18.0, 1.0, 1.0)), MpptOutcome::Track(208));
    }
}
