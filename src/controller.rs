//! Controller context
//!
//! 計測・安全判定・充電ステートマシン・負荷監視・ハウスキーピングを
//! 1つの構造体にまとめます。制御周期（`control_pass`）と1秒周期
//! （`second_tick`）はそれぞれ自分の担当するフィールドだけを更新します。

use crate::charger::{ChargeActions, ChargeMode, ChargePhase, ChargeStateMachine};
use crate::config::{timing, CalibrationOffsets, ControllerConfig};
use crate::display::{render, DisplayPage, LcdLines};
use crate::housekeeping::{ChargeLed, PageRotation};
use crate::load::LoadSupervisor;
use crate::measurement::{
    Acquisition, Conditioner, DisplayAverages, MeasurementSnapshot, RawAverages, RollingAverage,
    Sweep,
};
use crate::safety::{BandThresholds, SafetyMonitor, SafetyState};
use crate::telemetry::{Command, StatusFields, TelemetryScheduler};
use crate::timers::Timers;

/// 制御周期の出力
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControlOutputs {
    pub charge: ChargeActions,
    pub load_on: bool,
    pub fan_on: bool,
    /// この周期で送信するステータス
    pub telemetry: Option<StatusFields>,
}

/// 1秒周期の出力
#[derive(Debug, Clone, PartialEq)]
pub struct SecondEvents {
    /// 描画するページと内容
    pub display: Option<(DisplayPage, LcdLines)>,
    pub charge_led: bool,
    /// 移動平均の窓が閉じた
    pub averages: Option<DisplayAverages>,
    /// 負荷出力（電源サイクル・ブラウンアウト復帰を反映）
    pub load_on: bool,
}

pub struct Controller {
    config: ControllerConfig,
    acquisition: Acquisition,
    conditioner: Conditioner,
    safety: SafetyMonitor,
    charger: ChargeStateMachine,
    load: LoadSupervisor,
    timers: Timers,
    rolling: RollingAverage,
    rotation: PageRotation,
    charge_led: ChargeLed,
    telemetry: TelemetryScheduler,
    snapshot: Option<MeasurementSnapshot>,
}

impl Controller {
    pub fn new(config: ControllerConfig, offsets: CalibrationOffsets) -> Self {
        if !config.is_valid() {
            warn!("Controller configuration is inconsistent");
        }
        if offsets.is_uncalibrated() {
            warn!("No calibration offsets stored, using zero");
        }

        Self {
            config,
            acquisition: Acquisition::new(config.sweeps_per_sample),
            conditioner: Conditioner::new(offsets),
            safety: SafetyMonitor::new(BandThresholds::default()),
            charger: ChargeStateMachine::new(config.profile, &config.mppt, config.limits),
            load: LoadSupervisor::new(),
            timers: Timers::new(),
            rolling: RollingAverage::new(timing::AVERAGE_WINDOW_S),
            rotation: PageRotation::new(timing::LCD_ROTATION_S),
            charge_led: ChargeLed::new(),
            telemetry: TelemetryScheduler::new(config.telemetry_every_passes),
            snapshot: None,
        }
    }

    /// ADCスイープを1回分追加し、平均化が完了したら制御周期を実行
    pub fn push_sweep(&mut self, sweep: &Sweep) -> Option<ControlOutputs> {
        let averages = self.acquisition.push_sweep(sweep)?;
        Some(self.control_pass(&averages))
    }

    /// 平均化済みの計測値で1制御周期を実行
    pub fn control_pass(&mut self, averages: &RawAverages) -> ControlOutputs {
        let snapshot = self.conditioner.condition(averages);
        self.snapshot = Some(snapshot);

        let safety = self
            .safety
            .update(snapshot.battery_voltage, snapshot.mosfet_temp);
        let load_on = self
            .load
            .update(safety.load_allowed, snapshot.load_voltage);
        let charge = self.charger.evaluate(&snapshot, &safety, &mut self.timers);

        trace!(
            "Vb={} Va={} Ia={} duty={}",
            snapshot.battery_voltage,
            snapshot.array_voltage,
            snapshot.array_current,
            self.charger.get_duty()
        );

        let telemetry = if self.telemetry.on_pass() {
            Some(StatusFields::from_measurements(&snapshot, &safety))
        } else {
            None
        };

        ControlOutputs {
            charge,
            load_on,
            fan_on: safety.fan_on,
            telemetry,
        }
    }

    /// 1秒ハウスキーピング
    pub fn second_tick(&mut self) -> SecondEvents {
        self.timers.advance(self.charger.timer_gates());
        self.load.second_tick();
        let load_on = self.load.update(
            self.safety.get_state().load_allowed,
            self.snapshot.map(|s| s.load_voltage).unwrap_or(0.0),
        );

        let averages = self.snapshot.and_then(|s| self.rolling.push(&s));

        let charging = self.charger.is_charging();
        let warning = self.safety.get_state().warning;
        let readings = self.display_readings();
        let display = self
            .rotation
            .advance(warning, charging)
            .map(|page| (page, render(page, &readings)));

        SecondEvents {
            display,
            charge_led: self.charge_led.on_second(charging),
            averages,
            load_on,
        }
    }

    /// ホストコマンドの反映
    pub fn handle_command(&mut self, command: Command) {
        info!("Host command: {}", command);
        match command {
            Command::PowerCycle {
                timeout_s,
                off_time_s,
            } => self.load.configure_power_cycle(timeout_s, off_time_s),
            Command::DisablePowerCycle => self.load.configure_power_cycle(0, 0),
        }
    }

    /// 表示用の値（移動平均がなければ最新の計測値）
    pub fn display_readings(&self) -> DisplayAverages {
        if let Some(averages) = self.rolling.get_latest() {
            return averages;
        }
        match self.snapshot {
            Some(s) => DisplayAverages {
                battery_voltage: s.battery_voltage,
                battery_current: s.battery_current,
                array_voltage: s.array_voltage,
                array_current: s.array_current,
                load_voltage: s.load_voltage,
                load_current: s.load_current,
            },
            None => DisplayAverages::default(),
        }
    }

    pub fn get_config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn get_snapshot(&self) -> Option<MeasurementSnapshot> {
        self.snapshot
    }

    pub fn get_safety(&self) -> SafetyState {
        self.safety.get_state()
    }

    pub fn get_phase(&self) -> ChargePhase {
        self.charger.get_phase()
    }

    pub fn get_mode(&self) -> ChargeMode {
        self.charger.get_mode()
    }

    pub fn get_charger(&self) -> &ChargeStateMachine {
        &self.charger
    }
}
