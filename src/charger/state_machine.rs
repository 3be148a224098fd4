//! 充電ステートマシン
//!
//! 制御周期ごとに `evaluate` を1回呼び出し、スナップショットと安全判定から
//! コンバータ・スイッチ出力を決定します。充電停止条件は `stop_reason` に
//! まとめ、Starting / Charging / BypassCooldown のすべての周期で評価します。

use super::mode::{ChargeMode, ModeFlags};
use crate::config::{ChargeLimits, ChargeProfile, MpptConfig};
use crate::measurement::MeasurementSnapshot;
use crate::mppt::{MpptController, MpptOutcome};
use crate::policy::ChargeTargets;
use crate::safety::{BatteryWarning, SafetyState};
use crate::timers::{TimerGates, Timers};

/// 充電シーケンスの状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChargePhase {
    /// 充電していない
    Idle,
    /// コンバータを起動し、アレイ電流の確認待ち
    Starting { settle_passes: u8 },
    /// MPPT動作中
    Charging,
    /// アレイ電流不足、再試行待ち
    LowCurrentBackoff,
    /// 最大デューティ張り付きによるコンバータ停止中
    BypassCooldown,
}

/// PWMドライバへの指令
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConverterCommand {
    /// 両チャネル停止
    Off,
    /// 停止状態から指定デューティで起動
    On(u16),
    /// 動作中のデューティ変更
    Update(u16),
}

/// 充電停止の理由
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StopReason {
    /// アレイ電圧とバッテリー電圧の差が不足
    HeadroomLost,
    /// 吸収電圧に到達
    AbsorptionReached,
    /// フロート維持中の上限電圧に到達
    FloatCeilingReached,
    /// バッテリー電圧が過放電しきい値未満
    BelowDropDead,
    /// 過電圧警告
    HighVoltage,
    /// 過放電警告
    DeadBattery,
    /// MOSFET過温度
    OverTemperature,
}

/// 1制御周期の出力
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChargeActions {
    pub converter: ConverterCommand,
    pub charger_switch: bool,
    pub array_switch: bool,
    /// 脱硫パルスを発行する
    pub desulfation_pulse: bool,
    /// 充電中（充電LED・表示用）
    pub charging: bool,
}

impl ChargeActions {
    const fn all_off() -> Self {
        Self {
            converter: ConverterCommand::Off,
            charger_switch: false,
            array_switch: false,
            desulfation_pulse: false,
            charging: false,
        }
    }
}

/// 充電ステートマシン
pub struct ChargeStateMachine {
    profile: ChargeProfile,
    limits: ChargeLimits,
    cooldown_s: u16,
    phase: ChargePhase,
    flags: ModeFlags,
    mppt: MpptController,
    can_charge: bool,
    converter_on: bool,
    pulse_armed: bool,
    last_stop: Option<StopReason>,
}

impl ChargeStateMachine {
    pub fn new(profile: ChargeProfile, mppt: &MpptConfig, limits: ChargeLimits) -> Self {
        Self {
            profile,
            limits,
            cooldown_s: mppt.cooldown_s,
            phase: ChargePhase::Idle,
            flags: ModeFlags::new(),
            mppt: MpptController::new(mppt, limits.max_pv_v),
            can_charge: false,
            converter_on: false,
            pulse_armed: false,
            last_stop: None,
        }
    }

    /// 1制御周期分の評価
    ///
    /// # Arguments
    /// * `snapshot` - 最新の計測値
    /// * `safety` - 同じ計測値に対する安全判定
    /// * `timers` - 1秒カウンタ（リセットのみ行う）
    ///
    /// # Returns
    /// この周期の出力
    pub fn evaluate(
        &mut self,
        snapshot: &MeasurementSnapshot,
        safety: &SafetyState,
        timers: &mut Timers,
    ) -> ChargeActions {
        self.flags.settle(&self.profile, timers);

        let vb = snapshot.battery_voltage;
        let va = snapshot.array_voltage;
        let targets = ChargeTargets::at(&self.profile, snapshot.ambient_temp);

        // 過放電: すべて停止
        if vb < self.limits.drop_dead_v {
            self.pulse_armed = false;
            timers.reset_pulse_interval();
            self.flags.clear_all(timers);
            self.shut_down(StopReason::BelowDropDead);
            return self.finish(ChargeActions::all_off());
        }

        // アレイ電圧がバッテリー電圧以下: 履歴もすべて消去
        if va <= vb {
            self.pulse_armed = false;
            timers.reset_pulse_interval();
            self.flags.clear_all(timers);
            self.shut_down(StopReason::HeadroomLost);
            return self.finish(ChargeActions::all_off());
        }

        self.pulse_armed = true;
        let pulse = self.pulse_due(timers);

        // 充電には不足だが脱硫パルスは可能
        if va < vb + self.limits.headroom_v {
            self.shut_down(StopReason::HeadroomLost);
            let mut actions = ChargeActions::all_off();
            actions.desulfation_pulse = pulse;
            return self.finish(actions);
        }

        let mut actions = match self.phase {
            ChargePhase::Idle => self.evaluate_idle(snapshot, safety, &targets, timers),
            ChargePhase::Starting { settle_passes } => {
                self.evaluate_starting(snapshot, safety, &targets, settle_passes, timers)
            }
            ChargePhase::Charging => self.evaluate_charging(snapshot, safety, &targets, timers),
            ChargePhase::LowCurrentBackoff => {
                if timers.get_low_current_retry_s() >= self.limits.low_current_retry_s {
                    debug!("Low current back-off elapsed, retrying");
                    timers.reset_low_current_retry();
                    self.phase = ChargePhase::Idle;
                    self.evaluate_idle(snapshot, safety, &targets, timers)
                } else {
                    ChargeActions::all_off()
                }
            }
            ChargePhase::BypassCooldown => self.evaluate_cooldown(snapshot, safety, &targets, timers),
        };
        actions.desulfation_pulse = pulse;
        self.finish(actions)
    }

    /// 充電を停止すべき理由（なければNone）
    ///
    /// 状態の深さに関係なく毎周期同じ条件で評価する。
    pub fn stop_reason(
        &self,
        snapshot: &MeasurementSnapshot,
        safety: &SafetyState,
        targets: &ChargeTargets,
    ) -> Option<StopReason> {
        let vb = snapshot.battery_voltage;
        let va = snapshot.array_voltage;

        if va < vb + self.limits.headroom_v {
            Some(StopReason::HeadroomLost)
        } else if vb < self.limits.drop_dead_v {
            Some(StopReason::BelowDropDead)
        } else if safety.warning == BatteryWarning::HighVoltage {
            Some(StopReason::HighVoltage)
        } else if safety.warning == BatteryWarning::DeadBattery {
            Some(StopReason::DeadBattery)
        } else if safety.over_temperature {
            Some(StopReason::OverTemperature)
        } else if vb >= targets.absorption_v {
            Some(StopReason::AbsorptionReached)
        } else if self.flags.absorption_complete
            && self.flags.float_active
            && vb >= targets.float_v + self.profile.float_margin_v
        {
            Some(StopReason::FloatCeilingReached)
        } else {
            None
        }
    }

    /// 1秒ハウスキーピングで進めるべきタイマ
    pub fn timer_gates(&self) -> TimerGates {
        TimerGates {
            low_current_backoff: self.phase == ChargePhase::LowCurrentBackoff,
            bypass_cooldown: self.phase == ChargePhase::BypassCooldown,
            pulse_armed: self.pulse_armed,
            ..self.flags.timer_gates()
        }
    }

    pub fn get_phase(&self) -> ChargePhase {
        self.phase
    }

    pub fn get_flags(&self) -> ModeFlags {
        self.flags
    }

    pub fn get_mode(&self) -> ChargeMode {
        self.flags.mode(self.is_charging())
    }

    /// 充電可能と判定されている（Starting以降へ進める）
    pub fn can_charge(&self) -> bool {
        self.can_charge
    }

    /// コンバータがMPPT動作中
    pub fn is_charging(&self) -> bool {
        matches!(self.phase, ChargePhase::Charging | ChargePhase::BypassCooldown)
    }

    pub fn get_duty(&self) -> u16 {
        self.mppt.get_duty()
    }

    /// 直近の停止理由
    pub fn get_last_stop(&self) -> Option<StopReason> {
        self.last_stop
    }

    fn evaluate_idle(
        &mut self,
        snapshot: &MeasurementSnapshot,
        safety: &SafetyState,
        targets: &ChargeTargets,
        timers: &mut Timers,
    ) -> ChargeActions {
        let vb = snapshot.battery_voltage;
        let p = self.profile;

        self.can_charge = if vb < targets.float_v - p.bulk_margin_v {
            self.flags.enter_bulk(timers);
            true
        } else if self.flags.absorption_active
            && self.flags.float_active
            && !self.flags.absorption_complete
        {
            vb <= targets.absorption_v - p.absorption_resume_margin_v
        } else if !self.flags.absorption_active
            && self.flags.float_active
            && self.flags.absorption_complete
        {
            vb <= targets.float_v - p.float_margin_v
        } else {
            false
        };

        if !self.can_charge {
            return ChargeActions::all_off();
        }

        if let Some(reason) = self.stop_reason(snapshot, safety, targets) {
            self.shut_down(reason);
            return ChargeActions::all_off();
        }

        info!("Charging possible, starting converter");
        self.phase = ChargePhase::Starting { settle_passes: 0 };
        self.starting_actions()
    }

    fn evaluate_starting(
        &mut self,
        snapshot: &MeasurementSnapshot,
        safety: &SafetyState,
        targets: &ChargeTargets,
        settle_passes: u8,
        timers: &mut Timers,
    ) -> ChargeActions {
        if let Some(reason) = self.stop_reason(snapshot, safety, targets) {
            self.shut_down(reason);
            return ChargeActions::all_off();
        }

        let settle_passes = settle_passes.saturating_add(1);
        if settle_passes < self.limits.start_settle_passes {
            self.phase = ChargePhase::Starting { settle_passes };
            return self.starting_actions();
        }

        if snapshot.array_current >= self.limits.min_charge_current_a {
            info!("Array current sufficient, charging");
            self.phase = ChargePhase::Charging;
            let duty = self.mppt.reseed();
            ChargeActions {
                converter: ConverterCommand::Update(duty),
                charger_switch: true,
                array_switch: true,
                desulfation_pulse: false,
                charging: true,
            }
        } else {
            self.enter_backoff(timers)
        }
    }

    fn evaluate_charging(
        &mut self,
        snapshot: &MeasurementSnapshot,
        safety: &SafetyState,
        targets: &ChargeTargets,
        timers: &mut Timers,
    ) -> ChargeActions {
        self.flags.on_charging_pass(
            snapshot.battery_voltage,
            targets.float_v,
            targets.absorption_v,
            timers,
        );

        if let Some(reason) = self.stop_reason(snapshot, safety, targets) {
            self.shut_down(reason);
            return ChargeActions::all_off();
        }

        if snapshot.array_current < self.limits.min_charge_current_a {
            return self.enter_backoff(timers);
        }

        match self.mppt.step(snapshot) {
            MpptOutcome::Track(duty) => ChargeActions {
                converter: ConverterCommand::Update(duty),
                charger_switch: true,
                array_switch: true,
                desulfation_pulse: false,
                charging: true,
            },
            MpptOutcome::Bypass => {
                timers.reset_bypass_cooldown();
                self.phase = ChargePhase::BypassCooldown;
                self.cooldown_actions()
            }
        }
    }

    fn evaluate_cooldown(
        &mut self,
        snapshot: &MeasurementSnapshot,
        safety: &SafetyState,
        targets: &ChargeTargets,
        timers: &mut Timers,
    ) -> ChargeActions {
        if let Some(reason) = self.stop_reason(snapshot, safety, targets) {
            self.shut_down(reason);
            return ChargeActions::all_off();
        }

        if timers.get_bypass_cooldown_s() < self.cooldown_s {
            return self.cooldown_actions();
        }

        info!("Bypass cool-down elapsed, resuming search");
        timers.reset_bypass_cooldown();
        self.phase = ChargePhase::Charging;
        let duty = self.mppt.reseed();
        ChargeActions {
            converter: ConverterCommand::Update(duty),
            charger_switch: true,
            array_switch: true,
            desulfation_pulse: false,
            charging: true,
        }
    }

    fn starting_actions(&mut self) -> ChargeActions {
        let duty = self.mppt.reseed();
        ChargeActions {
            converter: ConverterCommand::Update(duty),
            charger_switch: true,
            array_switch: false,
            desulfation_pulse: false,
            charging: false,
        }
    }

    fn cooldown_actions(&self) -> ChargeActions {
        ChargeActions {
            converter: ConverterCommand::Off,
            charger_switch: true,
            array_switch: true,
            desulfation_pulse: false,
            charging: true,
        }
    }

    fn enter_backoff(&mut self, timers: &mut Timers) -> ChargeActions {
        warn!("Array current below threshold, backing off");
        timers.reset_low_current_retry();
        self.phase = ChargePhase::LowCurrentBackoff;
        self.can_charge = false;
        ChargeActions::all_off()
    }

    /// 充電中であれば停止する（低電流待機は維持）
    fn shut_down(&mut self, reason: StopReason) {
        match self.phase {
            ChargePhase::Starting { .. } | ChargePhase::Charging | ChargePhase::BypassCooldown => {
                info!("Charging stopped: {}", reason);
                self.phase = ChargePhase::Idle;
                self.last_stop = Some(reason);
            }
            ChargePhase::Idle | ChargePhase::LowCurrentBackoff => {}
        }
        self.can_charge = false;
    }

    fn pulse_due(&mut self, timers: &mut Timers) -> bool {
        if timers.get_pulse_interval_s() >= self.limits.pulse_interval_s {
            timers.reset_pulse_interval();
            debug!("Desulfation pulse");
            true
        } else {
            false
        }
    }

    /// 停止→起動の遷移を `On` に変換し、コンバータ状態を記録
    fn finish(&mut self, mut actions: ChargeActions) -> ChargeActions {
        actions.converter = match actions.converter {
            ConverterCommand::Off => ConverterCommand::Off,
            ConverterCommand::On(duty) | ConverterCommand::Update(duty) => {
                if self.converter_on {
                    ConverterCommand::Update(duty)
                } else {
                    ConverterCommand::On(duty)
                }
            }
        };
        self.converter_on = actions.converter != ConverterCommand::Off;
        actions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::safety::{BandThresholds, SafetyMonitor};

    struct Rig {
        machine: ChargeStateMachine,
        safety: SafetyMonitor,
        timers: Timers,
    }

    impl Rig {
        fn new() -> Self {
            Self {
                machine: ChargeStateMachine::new(
                    ChargeProfile::flooded(),
                    &MpptConfig::default(),
                    ChargeLimits::default(),
                ),
                safety: SafetyMonitor::new(BandThresholds::default()),
                timers: Timers::new(),
            }
        }

        fn pass(&mut self, snapshot: &MeasurementSnapshot) -> ChargeActions {
            let safety = self.safety.update(snapshot.battery_voltage, snapshot.mosfet_temp);
            self.machine.evaluate(snapshot, &safety, &mut self.timers)
        }

        fn second(&mut self) {
            self.timers.advance(self.machine.timer_gates());
        }

        /// Idle → Starting → Charging
        fn start_charging(&mut self, snapshot: &MeasurementSnapshot) {
            for _ in 0..=ChargeLimits::default().start_settle_passes {
                self.pass(snapshot);
            }
            assert_eq!(self.machine.get_phase(), ChargePhase::Charging);
        }
    }

    fn snapshot(battery_voltage: f32, array_voltage: f32, array_current: f32) -> MeasurementSnapshot {
        MeasurementSnapshot {
            battery_voltage,
            battery_current: array_current,
            array_voltage,
            array_current,
            ambient_temp: 25.0,
            mosfet_temp: 30.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_low_battery_with_headroom_sets_can_charge() {
        let mut rig = Rig::new();
        rig.machine.flags = ModeFlags {
            absorption_active: true,
            absorption_complete: false,
            float_active: true,
        };

        let actions = rig.pass(&snapshot(11.0, 14.0, 1.0));

        assert!(rig.machine.can_charge());
        assert!(!rig.machine.get_flags().absorption_active);
        assert!(!rig.machine.get_flags().float_active);
        assert_eq!(actions.converter, ConverterCommand::On(205));
        assert!(actions.charger_switch);
        assert!(!actions.array_switch);
    }

    #[test]
    fn test_starting_promotes_to_charging_with_current() {
        let mut rig = Rig::new();
        let s = snapshot(12.0, 17.0, 1.0);
        rig.start_charging(&s);
        let actions = rig.pass(&s);
        assert!(actions.array_switch);
        assert!(actions.charging);
        assert!(matches!(actions.converter, ConverterCommand::Update(_)));
    }

    #[test]
    fn test_low_current_backoff() {
        let mut rig = Rig::new();
        rig.start_charging(&snapshot(12.0, 17.0, 1.0));

        // 充電中に電流がしきい値を下回る → 同じ周期で停止
        let weak = snapshot(12.0, 17.0, 0.2);
        let actions = rig.pass(&weak);
        assert_eq!(actions.converter, ConverterCommand::Off);
        assert!(!actions.array_switch);
        assert!(!actions.charger_switch);
        assert_eq!(rig.machine.get_phase(), ChargePhase::LowCurrentBackoff);

        // 再試行時間が経過するまで再起動しない（電流が戻っても）
        let strong = snapshot(12.0, 17.0, 1.0);
        for _ in 0..ChargeLimits::default().low_current_retry_s {
            for _ in 0..10 {
                let actions = rig.pass(&strong);
                assert_eq!(actions.converter, ConverterCommand::Off);
            }
            rig.second();
        }

        let actions = rig.pass(&strong);
        assert!(matches!(rig.machine.get_phase(), ChargePhase::Starting { .. }));
        assert_eq!(actions.converter, ConverterCommand::On(205));
    }

    #[test]
    fn test_starting_without_current_backs_off() {
        let mut rig = Rig::new();
        let s = snapshot(12.0, 17.0, 0.1);
        for _ in 0..=ChargeLimits::default().start_settle_passes {
            rig.pass(&s);
        }
        assert_eq!(rig.machine.get_phase(), ChargePhase::LowCurrentBackoff);
    }

    #[test]
    fn test_headroom_lost_stops_immediately() {
        let mut rig = Rig::new();
        rig.start_charging(&snapshot(12.0, 17.0, 1.0));
        let actions = rig.pass(&snapshot(12.0, 13.5, 1.0));
        assert_eq!(actions.converter, ConverterCommand::Off);
        assert_eq!(rig.machine.get_phase(), ChargePhase::Idle);
        assert_eq!(rig.machine.get_last_stop(), Some(StopReason::HeadroomLost));
    }

    #[test]
    fn test_over_temperature_stops_charging() {
        let mut rig = Rig::new();
        rig.start_charging(&snapshot(12.0, 17.0, 1.0));
        let mut hot = snapshot(12.0, 17.0, 1.0);
        hot.mosfet_temp = 90.0;
        let actions = rig.pass(&hot);
        assert_eq!(actions.converter, ConverterCommand::Off);
        assert_eq!(rig.machine.get_last_stop(), Some(StopReason::OverTemperature));
    }

    #[test]
    fn test_array_below_battery_clears_history() {
        let mut rig = Rig::new();
        rig.machine.flags = ModeFlags {
            absorption_active: false,
            absorption_complete: true,
            float_active: true,
        };
        let actions = rig.pass(&snapshot(12.5, 12.0, 0.0));
        assert_eq!(actions, ChargeActions::all_off());
        assert_eq!(rig.machine.get_flags(), ModeFlags::new());
    }

    #[test]
    fn test_desulfation_pulse_without_headroom() {
        let mut rig = Rig::new();
        // アレイ > バッテリー、ただし2V未満
        let s = snapshot(12.5, 13.5, 0.0);
        for _ in 0..ChargeLimits::default().pulse_interval_s {
            let actions = rig.pass(&s);
            assert!(!actions.desulfation_pulse);
            rig.second();
        }
        let actions = rig.pass(&s);
        assert!(actions.desulfation_pulse);
        assert_eq!(actions.converter, ConverterCommand::Off);
        assert_eq!(rig.timers.get_pulse_interval_s(), 0);
    }

    #[test]
    fn test_absorption_hold_exact_dwell() {
        let mut rig = Rig::new();
        let profile = ChargeProfile::flooded();

        // バルク → フロート到達 → 吸収電圧到達
        rig.start_charging(&snapshot(12.8, 17.0, 1.0));
        rig.pass(&snapshot(13.6, 17.0, 1.0));
        assert!(rig.machine.get_flags().float_active);
        let actions = rig.pass(&snapshot(14.4, 17.5, 1.0));
        assert!(rig.machine.get_flags().absorption_active);
        assert_eq!(actions.converter, ConverterCommand::Off);
        assert_eq!(rig.machine.get_last_stop(), Some(StopReason::AbsorptionReached));

        // 吸収電圧付近を保持（電圧低下なし）
        let holding = snapshot(14.1, 17.5, 1.0);
        for second in 0..profile.absorption_dwell_s {
            rig.pass(&holding);
            assert!(
                !rig.machine.get_flags().absorption_complete,
                "completed early at {} s",
                second
            );
            rig.second();
        }
        rig.pass(&holding);
        assert!(rig.machine.get_flags().absorption_complete);
        assert!(!rig.machine.get_flags().absorption_active);
    }

    #[test]
    fn test_absorption_resumes_below_margin() {
        let mut rig = Rig::new();
        rig.machine.flags = ModeFlags {
            absorption_active: true,
            absorption_complete: false,
            float_active: true,
        };
        // 14.4 - 0.5 = 13.9V以下で再開
        rig.pass(&snapshot(14.0, 17.0, 1.0));
        assert!(!rig.machine.can_charge());
        rig.pass(&snapshot(13.8, 17.0, 1.0));
        assert!(rig.machine.can_charge());
    }

    #[test]
    fn test_float_trickle_ceiling() {
        let mut rig = Rig::new();
        rig.machine.flags = ModeFlags {
            absorption_active: false,
            absorption_complete: true,
            float_active: true,
        };
        // 13.5 - 0.25 = 13.25V以下で再開
        rig.pass(&snapshot(13.3, 17.0, 1.0));
        assert!(!rig.machine.can_charge());
        rig.start_charging(&snapshot(13.2, 17.0, 1.0));
        // 13.5 + 0.25 = 13.75V以上で停止
        let actions = rig.pass(&snapshot(13.8, 17.0, 1.0));
        assert_eq!(actions.converter, ConverterCommand::Off);
        assert_eq!(rig.machine.get_last_stop(), Some(StopReason::FloatCeilingReached));
    }

    #[test]
    fn test_dead_battery_withholds_charge() {
        let mut rig = Rig::new();
        let actions = rig.pass(&snapshot(7.5, 17.0, 1.0));
        assert_eq!(actions, ChargeActions::all_off());
        assert!(!rig.machine.can_charge());
    }

    #[test]
    fn test_dead_battery_clears_all_flags() {
        let mut rig = Rig::new();
        rig.machine.flags = ModeFlags {
            absorption_active: true,
            absorption_complete: true,
            float_active: true,
        };
        for _ in 0..3 {
            rig.second();
        }
        assert_eq!(rig.timers.get_absorption_hold_s(), 3);
        assert_eq!(rig.timers.get_absorption_lockout_s(), 3);

        let dead = snapshot(7.5, 14.0, 1.0);
        rig.pass(&dead);
        assert_eq!(rig.machine.get_flags(), ModeFlags::new());
        assert_eq!(rig.timers.get_absorption_hold_s(), 0);
        assert_eq!(rig.timers.get_absorption_lockout_s(), 0);

        // 過放電が続く間はどちらのタイマも進まない
        for _ in 0..5 {
            rig.second();
            rig.pass(&dead);
        }
        assert_eq!(rig.machine.get_flags(), ModeFlags::new());
        assert_eq!(rig.timers.get_absorption_hold_s(), 0);
        assert_eq!(rig.timers.get_absorption_lockout_s(), 0);
    }

    #[test]
    fn test_dead_battery_stops_active_charging() {
        let mut rig = Rig::new();
        rig.start_charging(&snapshot(12.0, 17.0, 1.0));

        let actions = rig.pass(&snapshot(7.5, 17.0, 1.0));

        assert_eq!(actions.converter, ConverterCommand::Off);
        assert_eq!(actions, ChargeActions::all_off());
        assert_eq!(rig.machine.get_phase(), ChargePhase::Idle);
        assert_eq!(rig.machine.get_last_stop(), Some(StopReason::BelowDropDead));
        assert!(!rig.machine.can_charge());
    }

    #[test]
    fn test_bypass_cooldown_then_resume() {
        let mut rig = Rig::new();
        rig.start_charging(&snapshot(12.0, 18.0, 0.5));

        // 電力上昇・電圧低下でデューティを上限に張り付かせる
        let mut v = 18.0;
        let mut i = 0.5;
        let mut entered = false;
        for _ in 0..1_000 {
            v -= 0.001;
            i += 0.01;
            let mut s = snapshot(12.0, v, i);
            s.battery_current = 1.0;
            let actions = rig.pass(&s);
            if rig.machine.get_phase() == ChargePhase::BypassCooldown {
                assert_eq!(actions.converter, ConverterCommand::Off);
                entered = true;
                break;
            }
        }
        assert!(entered);

        let s = snapshot(12.0, 17.0, 1.0);
        for _ in 0..MpptConfig::default().cooldown_s {
            let actions = rig.pass(&s);
            assert_eq!(actions.converter, ConverterCommand::Off);
            rig.second();
        }
        let actions = rig.pass(&s);
        assert_eq!(rig.machine.get_phase(), ChargePhase::Charging);
        assert_eq!(actions.converter, ConverterCommand::On(205));
    }
}
