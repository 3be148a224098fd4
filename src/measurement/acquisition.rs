// ADC sweep accumulation and averaging

use crate::config::ADC_CHANNEL_COUNT;

/// ADC channel order within one sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(usize)]
pub enum Channel {
    BatteryVoltage = 0,
    ArrayVoltage = 1,
    BatteryCurrent = 2,
    ArrayCurrent = 3,
    LoadVoltage = 4,
    AmbientTemp = 5,
    MosfetTemp = 6,
    LoadCurrent = 7,
}

/// One complete conversion of all channels, in `Channel` order
pub type Sweep = [u16; ADC_CHANNEL_COUNT];

/// Per-channel averages over a full set of sweeps
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawAverages {
    pub counts: [u16; ADC_CHANNEL_COUNT],
}

impl RawAverages {
    pub const fn new(counts: [u16; ADC_CHANNEL_COUNT]) -> Self {
        Self { counts }
    }

    pub fn get(&self, channel: Channel) -> u16 {
        self.counts[channel as usize]
    }
}

/// Accumulates a fixed number of sweeps and yields their average
///
/// Partial sums stay private; a `RawAverages` is only produced once the
/// configured number of sweeps has been pushed.
pub struct Acquisition {
    sums: [u32; ADC_CHANNEL_COUNT],
    sweeps: u8,
    target: u8,
}

impl Acquisition {
    /// Create a new accumulator
    ///
    /// # Arguments
    /// * `sweeps_per_sample` - Number of sweeps averaged per sample (clamped to at least 1)
    pub fn new(sweeps_per_sample: u8) -> Self {
        Self {
            sums: [0; ADC_CHANNEL_COUNT],
            sweeps: 0,
            target: sweeps_per_sample.max(1),
        }
    }

    /// Add one sweep
    ///
    /// # Returns
    /// * `Some(RawAverages)` when the set is complete (the accumulator is reset)
    /// * `None` while more sweeps are needed
    pub fn push_sweep(&mut self, sweep: &Sweep) -> Option<RawAverages> {
        for (sum, &value) in self.sums.iter_mut().zip(sweep.iter()) {
            *sum += value as u32;
        }
        self.sweeps += 1;

        if self.sweeps < self.target {
            return None;
        }

        let mut counts = [0u16; ADC_CHANNEL_COUNT];
        for (count, &sum) in counts.iter_mut().zip(self.sums.iter()) {
            *count = (sum / self.target as u32) as u16;
        }
        self.reset();

        Some(RawAverages { counts })
    }

    /// Discard any partial sweeps
    pub fn reset(&mut self) {
        self.sums = [0; ADC_CHANNEL_COUNT];
        self.sweeps = 0;
    }

    /// Number of sweeps per averaged sample
    pub fn sweeps_per_sample(&self) -> u8 {
        self.target
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_only_after_full_set() {
        let mut acq = Acquisition::new(4);
        let sweep = [100, 200, 300, 400, 500, 600, 700, 800];
        assert!(acq.push_sweep(&sweep).is_none());
        assert!(acq.push_sweep(&sweep).is_none());
        assert!(acq.push_sweep(&sweep).is_none());
        let avg = acq.push_sweep(&sweep).unwrap();
        assert_eq!(avg.counts, sweep);
    }

    #[test]
    fn test_average_truncates_and_resets() {
        let mut acq = Acquisition::new(2);
        acq.push_sweep(&[1, 0, 0, 0, 0, 0, 0, 4095]);
        let avg = acq.push_sweep(&[2, 0, 0, 0, 0, 0, 0, 4095]).unwrap();
        assert_eq!(avg.get(Channel::BatteryVoltage), 1);
        assert_eq!(avg.get(Channel::LoadCurrent), 4095);

        // 次のセットは前回の値を含まない
        acq.push_sweep(&[10; 8]);
        let avg = acq.push_sweep(&[10; 8]).unwrap();
        assert_eq!(avg.counts, [10; 8]);
    }

    #[test]
    fn test_full_scale_sum_does_not_overflow() {
        let mut acq = Acquisition::new(32);
        let mut result = None;
        for _ in 0..32 {
            result = acq.push_sweep(&[u16::MAX; 8]);
        }
        assert_eq!(result.unwrap().counts, [u16::MAX; 8]);
    }
}
