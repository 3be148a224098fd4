//! Temperature-compensated charge voltage tables
//!
//! Absorption and float ceilings follow a single linear slope between two
//! temperature breakpoints and are held constant outside them. The functions
//! are pure and may be called from any context.

use crate::config::ChargeProfile;

/// Clamp `temp_c` into the profile's compensation band
fn clamp_temperature(profile: &ChargeProfile, temp_c: f32) -> f32 {
    if temp_c.is_nan() {
        // 温度センサ異常時は基準温度で評価
        return 25.0;
    }
    temp_c.clamp(profile.low_breakpoint_c, profile.high_breakpoint_c)
}

fn compensate(profile: &ChargeProfile, reference_v: f32, temp_c: f32) -> f32 {
    let t = clamp_temperature(profile, temp_c);
    reference_v + profile.temp_coefficient_v_per_c * (t - 25.0)
}

/// Absorption ceiling for the given ambient temperature
///
/// # Arguments
/// * `profile` - Battery charge profile
/// * `temp_c` - Ambient temperature [°C]
///
/// # Returns
/// Absorption voltage [V]
pub fn absorption_voltage(profile: &ChargeProfile, temp_c: f32) -> f32 {
    compensate(profile, profile.absorption_v_25c, temp_c)
}

/// Float voltage for the given ambient temperature
///
/// # Arguments
/// * `profile` - Battery charge profile
/// * `temp_c` - Ambient temperature [°C]
///
/// # Returns
/// Float voltage [V]
pub fn float_voltage(profile: &ChargeProfile, temp_c: f32) -> f32 {
    compensate(profile, profile.float_v_25c, temp_c)
}

/// Both thresholds evaluated at one temperature
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChargeTargets {
    pub absorption_v: f32,
    pub float_v: f32,
}

impl ChargeTargets {
    pub fn at(profile: &ChargeProfile, temp_c: f32) -> Self {
        Self {
            absorption_v: absorption_voltage(profile, temp_c),
            float_v: float_voltage(profile, temp_c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-4;

    #[test]
    fn test_reference_values_at_25c() {
        let profile = ChargeProfile::flooded();
        assert!((absorption_voltage(&profile, 25.0) - 14.4).abs() < EPS);
        assert!((float_voltage(&profile, 25.0) - 13.5).abs() < EPS);

        let sealed = ChargeProfile::sealed();
        assert!((absorption_voltage(&sealed, 25.0) - 14.2).abs() < EPS);
        assert!((float_voltage(&sealed, 25.0) - 13.4).abs() < EPS);
    }

    #[test]
    fn test_clamped_below_low_breakpoint() {
        let profile = ChargeProfile::flooded();
        let ceiling_abs = absorption_voltage(&profile, -30.0);
        let ceiling_float = float_voltage(&profile, -30.0);
        // -30℃: 14.4 + 0.03 * 55 = 16.05
        assert!((ceiling_abs - 16.05).abs() < EPS);
        for t in [-31.0, -40.0, -100.0] {
            assert_eq!(absorption_voltage(&profile, t), ceiling_abs);
            assert_eq!(float_voltage(&profile, t), ceiling_float);
        }
    }

    #[test]
    fn test_clamped_above_high_breakpoint() {
        let profile = ChargeProfile::flooded();
        let floor_abs = absorption_voltage(&profile, 40.0);
        let floor_float = float_voltage(&profile, 40.0);
        // 40℃: 14.4 - 0.03 * 15 = 13.95
        assert!((floor_abs - 13.95).abs() < EPS);
        for t in [41.0, 60.0, 120.0] {
            assert_eq!(absorption_voltage(&profile, t), floor_abs);
            assert_eq!(float_voltage(&profile, t), floor_float);
        }
    }

    #[test]
    fn test_monotonic_between_breakpoints() {
        let profile = ChargeProfile::flooded();
        let mut t = -29.5;
        let mut prev_abs = absorption_voltage(&profile, -30.0);
        let mut prev_float = float_voltage(&profile, -30.0);
        while t < 40.0 {
            let abs = absorption_voltage(&profile, t);
            let float = float_voltage(&profile, t);
            assert!(abs < prev_abs);
            assert!(float < prev_float);
            prev_abs = abs;
            prev_float = float;
            t += 0.5;
        }
    }

    #[test]
    fn test_float_stays_below_absorption() {
        let profile = ChargeProfile::flooded();
        for t in [-50.0, 0.0, 25.0, 80.0] {
            let targets = ChargeTargets::at(&profile, t);
            assert!(targets.float_v < targets.absorption_v);
        }
    }

    #[test]
    fn test_nan_temperature_uses_reference() {
        let profile = ChargeProfile::flooded();
        assert!((absorption_voltage(&profile, f32::NAN) - 14.4).abs() < EPS);
    }
}
