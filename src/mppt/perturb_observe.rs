// Perturb-and-observe maximum power point search

use super::DutyBounds;

/// Hill-climbing tracker
///
/// Sign convention (buck converter with the array on the input side):
/// raising duty pulls the array voltage down.
/// * power up, voltage up: duty - 1
/// * power up, voltage down or flat: duty + 1
/// * power down: the opposite of the above
/// * power unchanged: duty held
pub struct PerturbObserve {
    /// Previous (power, voltage) sample
    previous: Option<(f32, f32)>,
}

impl PerturbObserve {
    pub const fn new() -> Self {
        Self { previous: None }
    }

    /// Forget the previous sample; the next step only records
    pub fn reset(&mut self) {
        self.previous = None;
    }

    /// Compute the next duty
    ///
    /// # Arguments
    /// * `array_voltage` - Array voltage [V]
    /// * `array_current` - Array current [A]
    /// * `duty` - Current duty
    /// * `bounds` - Allowed duty window
    ///
    /// # Returns
    /// Next duty, always within `bounds`
    pub fn step(&mut self, array_voltage: f32, array_current: f32, duty: u16, bounds: DutyBounds) -> u16 {
        let power = array_voltage * array_current;

        let delta = match self.previous {
            None => 0,
            Some((prev_power, prev_voltage)) => direction(power, array_voltage, prev_power, prev_voltage),
        };
        self.previous = Some((power, array_voltage));

        bounds.apply(duty, delta)
    }
}

fn direction(power: f32, voltage: f32, prev_power: f32, prev_voltage: f32) -> i32 {
    if power > prev_power {
        if voltage > prev_voltage {
            -1
        } else {
            1
        }
    } else if power < prev_power {
        if voltage > prev_voltage {
            1
        } else {
            -1
        }
    } else {
        0
    }
}
