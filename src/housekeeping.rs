//! Periodic housekeeping
//!
//! 1kHzのティックを計測周期（100ms）と1秒周期に分周し、
//! LCDページのローテーションと状態表示LEDの点滅を管理します。

use crate::config::timing;
use crate::display::{select_page, DisplayPage};
use crate::safety::BatteryWarning;

/// 1ティックで発生するイベント
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TickEvents {
    /// 計測・制御を1回行う
    pub sample: bool,
    /// 1秒ハウスキーピングを行う
    pub second: bool,
    /// 外部ウォッチドッグへのピン出力レベル（毎ティック反転）
    pub watchdog_level: bool,
}

/// ティック分周器
pub struct TickDivider {
    sample_every: u16,
    second_every: u16,
    sample_count: u16,
    second_count: u16,
    watchdog_level: bool,
}

impl TickDivider {
    pub const fn new(sample_every: u16, second_every: u16) -> Self {
        Self {
            sample_every,
            second_every,
            sample_count: 0,
            second_count: 0,
            watchdog_level: false,
        }
    }

    pub const fn default() -> Self {
        Self::new(timing::SAMPLE_EVERY_TICKS, timing::SECOND_EVERY_TICKS)
    }

    /// 1ティック進める
    pub fn on_tick(&mut self) -> TickEvents {
        self.sample_count += 1;
        self.second_count += 1;
        self.watchdog_level = !self.watchdog_level;

        let sample = self.sample_count >= self.sample_every;
        if sample {
            self.sample_count = 0;
        }
        let second = self.second_count >= self.second_every;
        if second {
            self.second_count = 0;
        }

        TickEvents {
            sample,
            second,
            watchdog_level: self.watchdog_level,
        }
    }
}

/// LCDページのローテーション（0..=12、1/5/9で描画）
pub struct PageRotation {
    index: u8,
    last: u8,
}

impl PageRotation {
    pub const fn new(last: u8) -> Self {
        Self { index: 0, last }
    }

    /// 1秒進め、描画すべきページを返す
    ///
    /// 充電中は警告がなければロゴ（位置1）を飛ばして位置4から再開する。
    pub fn advance(&mut self, warning: BatteryWarning, charging: bool) -> Option<DisplayPage> {
        self.index += 1;
        let page = select_page(self.index, warning, charging);

        if self.index > self.last {
            let show_banner = matches!(
                warning,
                BatteryWarning::HighVoltage | BatteryWarning::LowVoltage
            );
            self.index = if charging && !show_banner { 4 } else { 0 };
        }

        page
    }

    pub fn get_index(&self) -> u8 {
        self.index
    }
}

/// 充電LED（充電中は点灯、それ以外は1秒ごとに点滅）
pub struct ChargeLed {
    level: bool,
}

impl ChargeLed {
    pub const fn new() -> Self {
        Self { level: true }
    }

    pub fn on_second(&mut self, charging: bool) -> bool {
        self.level = if charging { true } else { !self.level };
        self.level
    }
}
