//! Tick-owned counters
//!
//! 1秒ハウスキーピングでのみ加算されるカウンタ群です。
//! 加算は `advance` だけが行い、リセットは充電ステートマシンが行います。

/// どのカウンタを進めるかの条件（ステートマシンの状態から求める）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimerGates {
    /// 吸収充電保持中
    pub absorption_active: bool,
    /// 吸収充電完了（ロックアウト中）
    pub absorption_complete: bool,
    /// 低電流待機中
    pub low_current_backoff: bool,
    /// バイパス冷却中
    pub bypass_cooldown: bool,
    /// アレイ電圧がバッテリー電圧を上回っている（パルス周期を計時）
    pub pulse_armed: bool,
}

/// 秒単位のカウンタ
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Timers {
    absorption_hold_s: u16,
    absorption_lockout_s: u16,
    low_current_retry_s: u16,
    bypass_cooldown_s: u16,
    pulse_interval_s: u16,
}

impl Timers {
    pub const fn new() -> Self {
        Self {
            absorption_hold_s: 0,
            absorption_lockout_s: 0,
            low_current_retry_s: 0,
            bypass_cooldown_s: 0,
            pulse_interval_s: 0,
        }
    }

    /// 1秒分進める
    pub fn advance(&mut self, gates: TimerGates) {
        if gates.absorption_active {
            self.absorption_hold_s = self.absorption_hold_s.saturating_add(1);
        }
        if gates.absorption_complete {
            self.absorption_lockout_s = self.absorption_lockout_s.saturating_add(1);
        }
        if gates.low_current_backoff {
            self.low_current_retry_s = self.low_current_retry_s.saturating_add(1);
        }
        if gates.bypass_cooldown {
            self.bypass_cooldown_s = self.bypass_cooldown_s.saturating_add(1);
        }
        if gates.pulse_armed {
            self.pulse_interval_s = self.pulse_interval_s.saturating_add(1);
        }
    }

    pub fn get_absorption_hold_s(&self) -> u16 {
        self.absorption_hold_s
    }

    pub fn get_absorption_lockout_s(&self) -> u16 {
        self.absorption_lockout_s
    }

    pub fn get_low_current_retry_s(&self) -> u16 {
        self.low_current_retry_s
    }

    pub fn get_bypass_cooldown_s(&self) -> u16 {
        self.bypass_cooldown_s
    }

    pub fn get_pulse_interval_s(&self) -> u16 {
        self.pulse_interval_s
    }

    pub(crate) fn reset_absorption_hold(&mut self) {
        self.absorption_hold_s = 0;
    }

    pub(crate) fn reset_absorption_lockout(&mut self) {
        self.absorption_lockout_s = 0;
    }

    pub(crate) fn reset_low_current_retry(&mut self) {
        self.low_current_retry_s = 0;
    }

    pub(crate) fn reset_bypass_cooldown(&mut self) {
        self.bypass_cooldown_s = 0;
    }

    pub(crate) fn reset_pulse_interval(&mut self) {
        self.pulse_interval_s = 0;
    }
}
