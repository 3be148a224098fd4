// Conversion from averaged ADC counts to calibrated physical values

use super::acquisition::{Channel, RawAverages};
use crate::config::{
    CalibrationOffsets, ADC_UNIT_V, BATTERY_VOLTAGE_GAIN, CURRENT_SENSE_GAIN, CURRENT_SENSE_OHMS,
    KELVIN_OFFSET, LOAD_VOLTAGE_GAIN, TEMP_SENSOR_V_PER_KELVIN, VOLTAGE_DIVIDER_RATIO,
};

/// Voltage at a divider-fed input
///
/// voltage = (raw × adcUnit) / gain / dividerRatio
pub fn counts_to_voltage(raw: u16, gain: f32) -> f32 {
    (raw as f32 * ADC_UNIT_V) / gain / VOLTAGE_DIVIDER_RATIO
}

/// Current through a sense resistor
///
/// current = (raw × adcUnit) / amplifierGain / Rsense
pub fn counts_to_current(raw: u16) -> f32 {
    (raw as f32 * ADC_UNIT_V) / CURRENT_SENSE_GAIN / CURRENT_SENSE_OHMS
}

/// LM335 reading in degrees Celsius
pub fn counts_to_celsius(raw: u16) -> f32 {
    (raw as f32 * ADC_UNIT_V) / TEMP_SENSOR_V_PER_KELVIN - KELVIN_OFFSET
}

/// Calibrated readings of one averaged sample
///
/// Only produced from a complete `RawAverages`, so consumers never see a
/// partially accumulated set.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MeasurementSnapshot {
    pub battery_voltage: f32,
    pub battery_current: f32,
    pub array_voltage: f32,
    pub array_current: f32,
    pub load_voltage: f32,
    pub load_current: f32,
    pub ambient_temp: f32,
    pub mosfet_temp: f32,
    /// Offset-corrected counts the values above were computed from
    pub raw: RawAverages,
}

/// Applies calibration offsets and scaling to averaged counts
pub struct Conditioner {
    offsets: CalibrationOffsets,
}

impl Conditioner {
    pub fn new(offsets: CalibrationOffsets) -> Self {
        Self { offsets }
    }

    /// Produce a snapshot from one complete averaged sample
    pub fn condition(&self, averages: &RawAverages) -> MeasurementSnapshot {
        let corrected = self.apply_offsets(averages);

        MeasurementSnapshot {
            battery_voltage: counts_to_voltage(
                corrected.get(Channel::BatteryVoltage),
                BATTERY_VOLTAGE_GAIN,
            ),
            battery_current: counts_to_current(corrected.get(Channel::BatteryCurrent)),
            array_voltage: counts_to_voltage(
                corrected.get(Channel::ArrayVoltage),
                BATTERY_VOLTAGE_GAIN,
            ),
            array_current: counts_to_current(corrected.get(Channel::ArrayCurrent)),
            load_voltage: counts_to_voltage(corrected.get(Channel::LoadVoltage), LOAD_VOLTAGE_GAIN),
            load_current: counts_to_current(corrected.get(Channel::LoadCurrent)),
            ambient_temp: counts_to_celsius(corrected.get(Channel::AmbientTemp)),
            mosfet_temp: counts_to_celsius(corrected.get(Channel::MosfetTemp)),
            raw: corrected,
        }
    }

    fn apply_offsets(&self, averages: &RawAverages) -> RawAverages {
        let mut counts = averages.counts;
        let pairs = [
            (Channel::BatteryVoltage, self.offsets.battery_voltage),
            (Channel::ArrayVoltage, self.offsets.array_voltage),
            (Channel::BatteryCurrent, self.offsets.battery_current),
            (Channel::ArrayCurrent, self.offsets.array_current),
            (Channel::LoadCurrent, self.offsets.load_current),
        ];
        for (channel, offset) in pairs {
            let count = &mut counts[channel as usize];
            *count = count.saturating_sub(offset);
        }
        RawAverages::new(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32, tol: f32) -> bool {
        (a - b).abs() <= tol
    }

    #[test]
    fn test_voltage_scaling() {
        // 2226カウント ≈ 14.4V（バッテリー電圧チャネル）
        assert!(approx(counts_to_voltage(2226, BATTERY_VOLTAGE_GAIN), 14.4, 0.01));
        // 1237カウント ≈ 8V
        assert!(approx(counts_to_voltage(1237, BATTERY_VOLTAGE_GAIN), 8.0, 0.01));
    }

    #[test]
    fn test_current_scaling() {
        // 49カウント ≈ 394mA
        assert!(approx(counts_to_current(49), 0.394, 0.001));
    }

    #[test]
    fn test_temperature_scaling() {
        // 3389カウント ≈ 0℃, 3885カウント ≈ 40℃
        assert!(approx(counts_to_celsius(3389), 0.0, 0.1));
        assert!(approx(counts_to_celsius(3885), 40.0, 0.1));
    }

    #[test]
    fn test_offsets_are_subtracted_and_saturate() {
        let conditioner = Conditioner::new(CalibrationOffsets {
            battery_voltage: 26,
            array_voltage: 0,
            battery_current: 100,
            array_current: 0,
            load_current: 0,
        });
        let raw = RawAverages::new([2252, 0, 50, 0, 0, 3389, 3389, 0]);
        let snapshot = conditioner.condition(&raw);

        assert_eq!(snapshot.raw.get(Channel::BatteryVoltage), 2226);
        assert_eq!(snapshot.raw.get(Channel::BatteryCurrent), 0);
        assert!(approx(snapshot.battery_voltage, 14.4, 0.01));
        assert_eq!(snapshot.battery_current, 0.0);
        // 温度チャネルにはオフセットを適用しない
        assert_eq!(snapshot.raw.get(Channel::AmbientTemp), 3389);
    }
}
