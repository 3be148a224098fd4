//! Safety classification module
//!
//! バッテリー電圧帯の判定（ヒステリシス付き）と、MOSFET温度による
//! ファン制御・過温度保護を行います。計測のたびに `update` を呼び出します。

use crate::config::{battery, thermal};

/// バッテリー電圧帯
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BatteryWarning {
    /// 正常
    Normal,
    /// 過電圧（負荷遮断）
    HighVoltage,
    /// 低電圧（負荷遮断）
    LowVoltage,
    /// 過放電（外部充電器が必要）
    DeadBattery,
}

/// 電圧帯のしきい値
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandThresholds {
    pub high_trip_v: f32,
    pub high_release_v: f32,
    pub low_trip_v: f32,
    pub low_release_v: f32,
    pub dead_trip_v: f32,
    pub dead_release_v: f32,
}

impl BandThresholds {
    pub const fn default() -> Self {
        Self {
            high_trip_v: battery::V_MAX_LOAD_OFF,
            high_release_v: battery::V_MAX_LOAD_ON,
            low_trip_v: battery::V_MIN_LOAD_OFF,
            low_release_v: battery::V_MIN_LOAD_ON,
            dead_trip_v: battery::DROP_DEAD_V,
            dead_release_v: battery::DROP_DEAD_V,
        }
    }
}

/// 安全判定の状態
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SafetyState {
    pub warning: BatteryWarning,
    /// 負荷出力の許可
    pub load_allowed: bool,
    /// ファン出力
    pub fan_on: bool,
    /// MOSFET過温度
    pub over_temperature: bool,
}

impl SafetyState {
    pub const fn new() -> Self {
        Self {
            warning: BatteryWarning::Normal,
            load_allowed: true,
            fan_on: false,
            over_temperature: false,
        }
    }

    /// テレメトリのバッテリー異常フラグ
    pub fn battery_fault(&self) -> bool {
        self.warning != BatteryWarning::Normal
    }
}

/// ヒステリシス付き安全判定
pub struct SafetyMonitor {
    thresholds: BandThresholds,
    state: SafetyState,
}

impl SafetyMonitor {
    pub const fn new(thresholds: BandThresholds) -> Self {
        Self {
            thresholds,
            state: SafetyState::new(),
        }
    }

    /// 計測値から状態を更新
    ///
    /// 判定順は 過電圧 → 低電圧 → 過放電 の固定順。後段の判定が前段の結果を上書きする。
    ///
    /// # Arguments
    /// * `battery_v` - バッテリー電圧 [V]
    /// * `mosfet_temp_c` - MOSFET温度 [℃]
    ///
    /// # Returns
    /// 更新後の状態
    pub fn update(&mut self, battery_v: f32, mosfet_temp_c: f32) -> SafetyState {
        let previous = self.state.warning;
        let t = &self.thresholds;
        let mut warning = previous;

        // 過電圧
        if battery_v >= t.high_trip_v {
            warning = BatteryWarning::HighVoltage;
        } else if warning == BatteryWarning::HighVoltage && battery_v <= t.high_release_v {
            warning = BatteryWarning::Normal;
        }

        // 低電圧
        if battery_v <= t.low_trip_v {
            if warning != BatteryWarning::DeadBattery {
                warning = BatteryWarning::LowVoltage;
            }
        } else if warning == BatteryWarning::LowVoltage && battery_v >= t.low_release_v {
            warning = BatteryWarning::Normal;
        }

        // 過放電
        if battery_v < t.dead_trip_v {
            warning = BatteryWarning::DeadBattery;
        } else if warning == BatteryWarning::DeadBattery && battery_v >= t.dead_release_v {
            // 過放電から復帰しても低電圧帯の上限を超えるまでは負荷を戻さない
            warning = if battery_v >= t.low_release_v {
                BatteryWarning::Normal
            } else {
                BatteryWarning::LowVoltage
            };
        }

        if warning != previous {
            match warning {
                BatteryWarning::Normal => info!("Battery voltage back to normal"),
                BatteryWarning::HighVoltage => warn!("Battery over-voltage, load disconnected"),
                BatteryWarning::LowVoltage => warn!("Battery low, load disconnected"),
                BatteryWarning::DeadBattery => error!("Battery dead, external charger required"),
            }
        }

        self.state.warning = warning;
        self.state.load_allowed = warning == BatteryWarning::Normal;

        // ファン
        if mosfet_temp_c >= thermal::FAN_ON_C {
            self.state.fan_on = true;
        } else if mosfet_temp_c <= thermal::FAN_OFF_C {
            self.state.fan_on = false;
        }

        // 過温度
        if mosfet_temp_c >= thermal::OVER_TEMP_TRIP_C {
            if !self.state.over_temperature {
                error!("MOSFET over-temperature");
            }
            self.state.over_temperature = true;
        } else if self.state.over_temperature && mosfet_temp_c <= thermal::OVER_TEMP_RELEASE_C {
            info!("MOSFET temperature recovered");
            self.state.over_temperature = false;
        }

        self.state
    }

    pub fn get_state(&self) -> SafetyState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monitor() -> SafetyMonitor {
        SafetyMonitor::new(BandThresholds::default())
    }

    #[test]
    fn test_high_voltage_hysteresis_ramp() {
        let mut m = monitor();
        for v in [13.0, 14.0, 15.0, 15.4] {
            assert_eq!(m.update(v, 25.0).warning, BatteryWarning::Normal);
        }
        assert_eq!(m.update(15.5, 25.0).warning, BatteryWarning::HighVoltage);
        // トリップ点と解除点の間では状態を保持
        for v in [15.45, 15.4, 15.35, 15.31] {
            let state = m.update(v, 25.0);
            assert_eq!(state.warning, BatteryWarning::HighVoltage);
            assert!(!state.load_allowed);
        }
        let state = m.update(15.3, 25.0);
        assert_eq!(state.warning, BatteryWarning::Normal);
        assert!(state.load_allowed);
    }

    #[test]
    fn test_low_voltage_hysteresis_ramp() {
        let mut m = monitor();
        assert_eq!(m.update(11.0, 25.0).warning, BatteryWarning::Normal);
        assert_eq!(m.update(10.7, 25.0).warning, BatteryWarning::LowVoltage);
        for v in [10.9, 11.5, 11.99] {
            assert_eq!(m.update(v, 25.0).warning, BatteryWarning::LowVoltage);
        }
        assert_eq!(m.update(12.0, 25.0).warning, BatteryWarning::Normal);
    }

    #[test]
    fn test_dead_battery_band() {
        let mut m = monitor();
        assert_eq!(m.update(7.9, 25.0).warning, BatteryWarning::DeadBattery);
        assert_eq!(m.update(7.99, 25.0).warning, BatteryWarning::DeadBattery);
        // 8V以上で過放電は解除されるが、低電圧帯に留まる
        assert_eq!(m.update(8.0, 25.0).warning, BatteryWarning::LowVoltage);
        assert_eq!(m.update(12.1, 25.0).warning, BatteryWarning::Normal);
    }

    #[test]
    fn test_fan_hysteresis() {
        let mut m = monitor();
        assert!(!m.update(12.5, 45.0).fan_on);
        assert!(m.update(12.5, 50.0).fan_on);
        assert!(m.update(12.5, 40.0).fan_on);
        assert!(!m.update(12.5, 38.0).fan_on);
    }

    #[test]
    fn test_over_temperature_flag() {
        let mut m = monitor();
        assert!(m.update(12.5, 86.0).over_temperature);
        assert!(m.update(12.5, 75.0).over_temperature);
        assert!(!m.update(12.5, 70.0).over_temperature);
    }

    #[test]
    fn test_battery_fault_flag() {
        let mut m = monitor();
        assert!(!m.update(12.5, 25.0).battery_fault());
        assert!(m.update(16.0, 25.0).battery_fault());
    }
}
