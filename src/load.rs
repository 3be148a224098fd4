//! Load output supervision
//!
//! ホストから設定される電源サイクルウォッチドッグと、負荷電圧の
//! ブラウンアウト検出を行い、負荷スイッチの最終状態を決定します。

use crate::config::load as params;

/// 電源サイクル指令の「無効」を表すタイムアウト値
const TIMEOUT_DISABLED_LOW: u16 = 0x0000;
const TIMEOUT_DISABLED_HIGH: u16 = 0xFFFF;

/// 電源サイクルウォッチドッグ
///
/// 有効化後、`timeout_s` 秒経過すると負荷を切り、`off_time_s` 秒後に
/// 負荷を戻して無効状態に戻る（単発）。再度指令を受けるまで動作しない。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PowerCycleWatchdog {
    armed: bool,
    timeout_s: u16,
    off_time_s: u8,
    elapsed_s: u16,
    off_elapsed_s: u16,
    forcing_off: bool,
}

impl PowerCycleWatchdog {
    pub const fn new() -> Self {
        Self {
            armed: false,
            timeout_s: 0,
            off_time_s: 0,
            elapsed_s: 0,
            off_elapsed_s: 0,
            forcing_off: false,
        }
    }

    /// ホスト指令の反映
    ///
    /// タイムアウト 0x0000 / 0xFFFF は無効化、それ以外は有効化してカウンタをリセット。
    pub fn configure(&mut self, timeout_s: u16, off_time_s: u8) {
        if timeout_s == TIMEOUT_DISABLED_LOW || timeout_s == TIMEOUT_DISABLED_HIGH {
            info!("Power cycle disabled");
            self.armed = false;
            return;
        }

        info!("Power cycle armed: timeout={}s off={}s", timeout_s, off_time_s);
        self.armed = true;
        self.timeout_s = timeout_s;
        self.off_time_s = off_time_s;
        self.elapsed_s = 0;
        self.off_elapsed_s = 0;
        self.forcing_off = false;
    }

    /// 1秒分進める
    pub fn tick(&mut self) {
        if self.forcing_off {
            self.off_elapsed_s = self.off_elapsed_s.saturating_add(1);
            if self.off_elapsed_s >= self.off_time_s as u16 {
                info!("Power cycle complete, load restored");
                self.forcing_off = false;
                self.elapsed_s = 0;
                self.off_elapsed_s = 0;
            }
        } else if self.armed {
            self.elapsed_s = self.elapsed_s.saturating_add(1);
            if self.elapsed_s >= self.timeout_s {
                warn!("Power cycle timeout, load off");
                self.armed = false;
                self.forcing_off = true;
                self.off_elapsed_s = 0;
            }
        }
    }

    /// 有効化されている、または負荷を切っている最中
    pub fn is_pending(&self) -> bool {
        self.armed || self.forcing_off
    }

    pub fn is_forcing_off(&self) -> bool {
        self.forcing_off
    }

    pub fn get_elapsed_s(&self) -> u16 {
        self.elapsed_s
    }
}

/// 負荷電圧のブラウンアウト検出
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BrownOutGuard {
    recovery_s: u16,
    remaining_s: u16,
}

impl BrownOutGuard {
    pub const fn new(recovery_s: u16) -> Self {
        Self {
            recovery_s,
            remaining_s: 0,
        }
    }

    /// 負荷電圧の判定
    ///
    /// # Arguments
    /// * `load_on` - 負荷スイッチがオン
    /// * `power_cycle_pending` - 電源サイクル動作中
    /// * `load_voltage` - 負荷電圧 [V]
    pub fn check(&mut self, load_on: bool, power_cycle_pending: bool, load_voltage: f32) {
        if self.remaining_s > 0 || !load_on || power_cycle_pending {
            return;
        }
        if load_voltage > params::BROWNOUT_MIN_V && load_voltage < params::BROWNOUT_MAX_V {
            warn!("Load brown-out, cycling load");
            self.remaining_s = self.recovery_s;
        }
    }

    /// 1秒分進める
    pub fn tick(&mut self) {
        self.remaining_s = self.remaining_s.saturating_sub(1);
    }

    pub fn is_recovering(&self) -> bool {
        self.remaining_s > 0
    }
}

/// 負荷スイッチの最終判定
pub struct LoadSupervisor {
    watchdog: PowerCycleWatchdog,
    brown_out: BrownOutGuard,
    output: bool,
}

impl LoadSupervisor {
    pub const fn new() -> Self {
        Self {
            watchdog: PowerCycleWatchdog::new(),
            brown_out: BrownOutGuard::new(params::BROWNOUT_RECOVERY_S),
            output: true,
        }
    }

    /// 電源サイクル指令
    pub fn configure_power_cycle(&mut self, timeout_s: u16, off_time_s: u8) {
        self.watchdog.configure(timeout_s, off_time_s);
    }

    /// 計測ごとの評価
    ///
    /// # Arguments
    /// * `safety_allows` - 電圧帯判定による負荷許可
    /// * `load_voltage` - 負荷電圧 [V]
    ///
    /// # Returns
    /// 負荷スイッチ出力
    pub fn update(&mut self, safety_allows: bool, load_voltage: f32) -> bool {
        self.brown_out
            .check(self.output, self.watchdog.is_pending(), load_voltage);
        self.output = self.resolve(safety_allows);
        self.output
    }

    /// 1秒ハウスキーピング
    pub fn second_tick(&mut self) {
        self.watchdog.tick();
        self.brown_out.tick();
    }

    pub fn get_output(&self) -> bool {
        self.output
    }

    fn resolve(&self, safety_allows: bool) -> bool {
        safety_allows && !self.watchdog.is_forcing_off() && !self.brown_out.is_recovering()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_power_cycle_sequence() {
        let mut wd = PowerCycleWatchdog::new();
        wd.configure(3, 2);
        wd.tick();
        wd.tick();
        assert!(!wd.is_forcing_off());
        wd.tick();
        assert!(wd.is_forcing_off());
        wd.tick();
        assert!(wd.is_forcing_off());
        wd.tick();
        assert!(!wd.is_forcing_off());
        assert!(!wd.is_pending());

        // 単発動作: 再指令なしでは再度切らない
        for _ in 0..10 {
            wd.tick();
        }
        assert!(!wd.is_forcing_off());
    }

    #[test]
    fn test_rearm_resets_counters() {
        let mut wd = PowerCycleWatchdog::new();
        wd.configure(5, 1);
        for _ in 0..4 {
            wd.tick();
        }
        wd.configure(5, 1);
        assert_eq!(wd.get_elapsed_s(), 0);
        for _ in 0..4 {
            wd.tick();
        }
        assert!(!wd.is_forcing_off());
    }

    #[test]
    fn test_disable_values() {
        let mut wd = PowerCycleWatchdog::new();
        wd.configure(0xFFFF, 5);
        assert!(!wd.is_pending());
        wd.configure(10, 5);
        assert!(wd.is_pending());
        wd.configure(0x0000, 5);
        assert!(!wd.is_pending());
    }

    #[test]
    fn test_brown_out_cycles_load() {
        let mut load = LoadSupervisor::new();
        assert!(load.update(true, 12.0));
        assert!(!load.update(true, 7.0));
        for _ in 0..params::BROWNOUT_RECOVERY_S - 1 {
            load.second_tick();
            assert!(!load.update(true, 0.0));
        }
        load.second_tick();
        assert!(load.update(true, 12.0));
    }

    #[test]
    fn test_brown_out_ignored_during_power_cycle() {
        let mut load = LoadSupervisor::new();
        load.configure_power_cycle(100, 5);
        assert!(load.update(true, 7.0));
    }

    #[test]
    fn test_safety_blocks_load() {
        let mut load = LoadSupervisor::new();
        assert!(!load.update(false, 12.0));
        // 負荷オフ中はブラウンアウト判定しない
        assert!(!load.update(false, 7.0));
        assert!(load.update(true, 12.0));
    }
}
