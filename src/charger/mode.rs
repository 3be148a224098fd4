//! 充電モード（バルク → 吸収 → フロート）の履歴フラグ
//!
//! 3つのフラグと2つのタイマで吸収充電の進行を記録します。
//! タイマの加算は1秒ハウスキーピング、フラグの変更はステートマシンのみが行います。

use crate::config::ChargeProfile;
use crate::timers::{TimerGates, Timers};

/// 現在の充電モード（表示・テレメトリ用）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChargeMode {
    /// 充電していない
    Idle,
    /// バルク充電（フラグなし）
    Bulk,
    /// フロート電圧に到達、吸収電圧へ向けて充電中
    AbsorptionPending,
    /// 吸収電圧に到達、保持時間を計時中
    AbsorptionHolding,
    /// 吸収充電完了、フロート維持（ロックアウト中）
    Float,
}

/// 吸収/フロートの履歴フラグ
///
/// `absorption_active` と `absorption_complete` が同時に真になることはない。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ModeFlags {
    pub absorption_active: bool,
    pub absorption_complete: bool,
    pub float_active: bool,
}

impl ModeFlags {
    pub const fn new() -> Self {
        Self {
            absorption_active: false,
            absorption_complete: false,
            float_active: false,
        }
    }

    /// 表示用のモード
    pub fn mode(&self, charging: bool) -> ChargeMode {
        if self.absorption_complete {
            ChargeMode::Float
        } else if self.absorption_active {
            ChargeMode::AbsorptionHolding
        } else if !charging {
            ChargeMode::Idle
        } else if self.float_active {
            ChargeMode::AbsorptionPending
        } else {
            ChargeMode::Bulk
        }
    }

    /// このフラグ状態で進めるべきタイマ
    pub fn timer_gates(&self) -> TimerGates {
        TimerGates {
            absorption_active: self.absorption_active,
            absorption_complete: self.absorption_complete,
            ..Default::default()
        }
    }

    /// バルク充電への復帰（吸収・フロート履歴を消去）
    pub fn enter_bulk(&mut self, timers: &mut Timers) {
        self.absorption_active = false;
        self.float_active = false;
        timers.reset_absorption_hold();
    }

    /// すべての履歴を消去
    pub fn clear_all(&mut self, timers: &mut Timers) {
        self.enter_bulk(timers);
        self.clear_complete(timers);
    }

    /// 完了フラグのみ消去
    pub fn clear_complete(&mut self, timers: &mut Timers) {
        self.absorption_complete = false;
        timers.reset_absorption_lockout();
    }

    /// 充電中のフラグ遷移
    ///
    /// # Arguments
    /// * `battery_v` - バッテリー電圧 [V]
    /// * `float_v` - フロート電圧 [V]
    /// * `absorption_v` - 吸収電圧 [V]
    pub fn on_charging_pass(
        &mut self,
        battery_v: f32,
        float_v: f32,
        absorption_v: f32,
        timers: &mut Timers,
    ) {
        if battery_v < float_v {
            if self.absorption_active || self.float_active {
                debug!("Battery below float voltage, back to bulk");
            }
            self.enter_bulk(timers);
        }

        if !self.absorption_active
            && !self.absorption_complete
            && !self.float_active
            && battery_v >= float_v
        {
            info!("Float voltage reached");
            self.float_active = true;
        }

        if !self.absorption_active
            && !self.absorption_complete
            && self.float_active
            && battery_v >= absorption_v
        {
            info!("Absorption voltage reached, holding");
            self.absorption_active = true;
            timers.reset_absorption_hold();
        }
    }

    /// タイマ満了による遷移（毎制御周期の最初に評価）
    pub fn settle(&mut self, profile: &ChargeProfile, timers: &mut Timers) {
        if self.absorption_active && timers.get_absorption_hold_s() >= profile.absorption_dwell_s {
            info!("Absorption complete");
            self.absorption_active = false;
            self.absorption_complete = true;
            timers.reset_absorption_hold();
            timers.reset_absorption_lockout();
        }

        if self.absorption_complete
            && timers.get_absorption_lockout_s() >= profile.absorption_lockout_s
        {
            info!("Absorption lockout elapsed");
            self.clear_complete(timers);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_charging_pass_progression() {
        let mut flags = ModeFlags::new();
        let mut timers = Timers::new();

        flags.on_charging_pass(12.0, 13.5, 14.4, &mut timers);
        assert_eq!(flags.mode(true), ChargeMode::Bulk);

        flags.on_charging_pass(13.6, 13.5, 14.4, &mut timers);
        assert_eq!(flags.mode(true), ChargeMode::AbsorptionPending);

        flags.on_charging_pass(14.4, 13.5, 14.4, &mut timers);
        assert!(flags.absorption_active);
        assert_eq!(flags.mode(false), ChargeMode::AbsorptionHolding);
    }

    #[test]
    fn test_drop_below_float_clears_history() {
        let mut flags = ModeFlags {
            absorption_active: true,
            absorption_complete: false,
            float_active: true,
        };
        let mut timers = Timers::new();
        timers.advance(flags.timer_gates());

        flags.on_charging_pass(13.0, 13.5, 14.4, &mut timers);
        assert!(!flags.absorption_active);
        assert!(!flags.float_active);
        assert_eq!(timers.get_absorption_hold_s(), 0);
    }

    #[test]
    fn test_settle_marks_complete_and_clears_after_lockout() {
        let profile = ChargeProfile::flooded();
        let mut flags = ModeFlags {
            absorption_active: true,
            absorption_complete: false,
            float_active: true,
        };
        let mut timers = Timers::new();

        for _ in 0..profile.absorption_dwell_s {
            flags.settle(&profile, &mut timers);
            assert!(!flags.absorption_complete);
            timers.advance(flags.timer_gates());
        }
        flags.settle(&profile, &mut timers);
        assert!(flags.absorption_complete);
        assert!(!flags.absorption_active);

        for _ in 0..profile.absorption_lockout_s {
            assert!(flags.absorption_complete);
            timers.advance(flags.timer_gates());
        }
        flags.settle(&profile, &mut timers);
        assert!(!flags.absorption_complete);
        assert!(flags.float_active);
    }
}
