// Short-window averages for display and telemetry smoothing

use super::conditioning::MeasurementSnapshot;

/// Averaged values published at the end of each window
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DisplayAverages {
    pub battery_voltage: f32,
    pub battery_current: f32,
    pub array_voltage: f32,
    pub array_current: f32,
    pub load_voltage: f32,
    pub load_current: f32,
}

/// Accumulates one-second snapshots over a fixed window
///
/// Never used for control decisions; the charge logic reads the
/// instantaneous snapshot.
pub struct RollingAverage {
    sums: DisplayAverages,
    samples: u8,
    window: u8,
    latest: Option<DisplayAverages>,
}

impl RollingAverage {
    pub fn new(window: u8) -> Self {
        Self {
            sums: DisplayAverages::default(),
            samples: 0,
            window: window.max(1),
            latest: None,
        }
    }

    /// Add one sample
    ///
    /// # Returns
    /// * `Some(DisplayAverages)` when the window completes (accumulators are reset)
    /// * `None` otherwise
    pub fn push(&mut self, snapshot: &MeasurementSnapshot) -> Option<DisplayAverages> {
        self.sums.battery_voltage += snapshot.battery_voltage;
        self.sums.battery_current += snapshot.battery_current;
        self.sums.array_voltage += snapshot.array_voltage;
        self.sums.array_current += snapshot.array_current;
        self.sums.load_voltage += snapshot.load_voltage;
        self.sums.load_current += snapshot.load_current;
        self.samples += 1;

        if self.samples < self.window {
            return None;
        }

        let n = self.window as f32;
        let averages = DisplayAverages {
            battery_voltage: self.sums.battery_voltage / n,
            battery_current: self.sums.battery_current / n,
            array_voltage: self.sums.array_voltage / n,
            array_current: self.sums.array_current / n,
            load_voltage: self.sums.load_voltage / n,
            load_current: self.sums.load_current / n,
        };
        self.sums = DisplayAverages::default();
        self.samples = 0;
        self.latest = Some(averages);

        Some(averages)
    }

    /// Most recently flushed window, if any
    pub fn get_latest(&self) -> Option<DisplayAverages> {
        self.latest
    }
}
