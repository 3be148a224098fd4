// Fixed-ratio duty derived from battery voltage

use super::DutyBounds;

/// Holds the array near a fixed voltage by setting duty = period × Vbat / Vtarget
///
/// Not a power point search; useful with a well-characterised panel.
pub struct ConstantVoltage {
    period: u16,
    array_target_v: f32,
}

impl ConstantVoltage {
    pub const fn new(period: u16, array_target_v: f32) -> Self {
        Self {
            period,
            array_target_v,
        }
    }

    /// Duty for the given battery voltage, clamped to `bounds`
    pub fn step(&self, battery_voltage: f32, bounds: DutyBounds) -> u16 {
        if !(self.array_target_v > 0.0) || !(battery_voltage > 0.0) {
            return bounds.min;
        }
        let raw = self.period as f32 * battery_voltage / self.array_target_v;
        let duty = if raw >= u16::MAX as f32 { u16::MAX } else { raw as u16 };
        bounds.clamp(duty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOUNDS: DutyBounds = DutyBounds { min: 192, max: 218 };

    #[test]
    fn test_ratio_within_window() {
        let cv = ConstantVoltage::new(256, 16.0);
        // 13V / 16V * 256 = 208
        assert_eq!(cv.step(13.0, BOUNDS), 208);
    }

    #[test]
    fn test_ratio_clamped() {
        let cv = ConstantVoltage::new(256, 16.0);
        assert_eq!(cv.step(10.0, BOUNDS), 192);
        assert_eq!(cv.step(15.5, BOUNDS), 218);
        assert_eq!(cv.step(f32::NAN, BOUNDS), 192);
    }
}
