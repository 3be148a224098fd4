//! 16x2キャラクタLCDの表示内容
//!
//! ページの選択と2行分の文字列生成のみを行い、描画はドライバに任せます。

use crate::measurement::DisplayAverages;
use crate::safety::BatteryWarning;
use core::fmt::Write;
use heapless::String;

/// LCDの桁数
pub const LCD_COLUMNS: usize = 16;

pub type LcdLine = String<LCD_COLUMNS>;

const LOGO: &str = "SOLAR TECH";
const VERSION: &str = "MPPT EMS VER 1.0";
const BATTERY_TITLE: &str = "BATTERY BANK";
const ARRAY_TITLE: &str = "SOLAR ARRAY";
const BATTERY_HIGH: &str = "HIGH VOLTAGE!";
const BATTERY_LOW: &str = "LOW VOLTAGE!";
const BATTERY_DEAD: &str = "BELOW 8 VOLTS!";
const CHARGER_LINE1: &str = "PLEASE CONNECT";
const CHARGER_LINE2: &str = "EXTERNAL CHARGER";

/// 表示ページ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DisplayPage {
    /// ロゴとバージョン
    Splash,
    /// 電圧帯の警告
    Warning(BatteryWarning),
    /// バッテリー電圧・電流
    BatteryInfo,
    /// アレイ電圧・電流
    ArrayInfo,
    /// 外部充電器の接続要求
    ExternalChargerRequired,
}

/// ローテーション位置から表示ページを決める
///
/// # Arguments
/// * `index` - ページローテーション位置（1, 5, 9で描画）
/// * `warning` - 電圧帯判定
/// * `charging` - 充電中
pub fn select_page(index: u8, warning: BatteryWarning, charging: bool) -> Option<DisplayPage> {
    match index {
        1 => Some(match warning {
            BatteryWarning::Normal if charging => DisplayPage::BatteryInfo,
            BatteryWarning::Normal => DisplayPage::Splash,
            other => DisplayPage::Warning(other),
        }),
        5 => Some(if warning == BatteryWarning::DeadBattery {
            DisplayPage::ExternalChargerRequired
        } else {
            DisplayPage::ArrayInfo
        }),
        9 => Some(DisplayPage::BatteryInfo),
        _ => None,
    }
}

/// 2行分の表示内容
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LcdLines {
    pub top: LcdLine,
    pub bottom: LcdLine,
}

/// ページの文字列を生成
pub fn render(page: DisplayPage, readings: &DisplayAverages) -> LcdLines {
    match page {
        DisplayPage::Splash => lines(LOGO, VERSION),
        DisplayPage::Warning(warning) => {
            let text = match warning {
                BatteryWarning::HighVoltage => BATTERY_HIGH,
                BatteryWarning::LowVoltage => BATTERY_LOW,
                BatteryWarning::DeadBattery => BATTERY_DEAD,
                BatteryWarning::Normal => "",
            };
            lines(BATTERY_TITLE, text)
        }
        DisplayPage::BatteryInfo => {
            let mut out = lines(BATTERY_TITLE, "");
            out.bottom = volts_amps(readings.battery_voltage, readings.battery_current);
            out
        }
        DisplayPage::ArrayInfo => {
            let mut out = lines(ARRAY_TITLE, "");
            out.bottom = volts_amps(readings.array_voltage, readings.array_current);
            out
        }
        DisplayPage::ExternalChargerRequired => lines(CHARGER_LINE1, CHARGER_LINE2),
    }
}

fn line(text: &str) -> LcdLine {
    let mut out = LcdLine::new();
    for c in text.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

fn lines(top: &str, bottom: &str) -> LcdLines {
    LcdLines {
        top: line(top),
        bottom: line(bottom),
    }
}

/// "12.60 V 1.53 A" 形式（値は桁あふれしない範囲に制限）
fn volts_amps(volts: f32, amps: f32) -> LcdLine {
    let mut out = LcdLine::new();
    let v = clamp_for_display(volts);
    let a = clamp_for_display(amps);
    if write!(out, "{:.2} V {:.2} A", v, a).is_err() {
        out.clear();
    }
    out
}

fn clamp_for_display(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(-9.99, 99.99)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_selection() {
        use BatteryWarning::*;
        assert_eq!(select_page(1, Normal, false), Some(DisplayPage::Splash));
        assert_eq!(select_page(1, Normal, true), Some(DisplayPage::BatteryInfo));
        assert_eq!(select_page(1, LowVoltage, true), Some(DisplayPage::Warning(LowVoltage)));
        assert_eq!(select_page(5, DeadBattery, false), Some(DisplayPage::ExternalChargerRequired));
        assert_eq!(select_page(5, Normal, false), Some(DisplayPage::ArrayInfo));
        assert_eq!(select_page(9, HighVoltage, false), Some(DisplayPage::BatteryInfo));
        assert_eq!(select_page(3, Normal, false), None);
    }

    #[test]
    fn test_render_battery_info() {
        let readings = DisplayAverages {
            battery_voltage: 12.6,
            battery_current: 1.53,
            ..Default::default()
        };
        let out = render(DisplayPage::BatteryInfo, &readings);
        assert_eq!(out.top.as_str(), "BATTERY BANK");
        assert_eq!(out.bottom.as_str(), "12.60 V 1.53 A");
    }

    #[test]
    fn test_render_never_overflows() {
        let readings = DisplayAverages {
            array_voltage: 1234.5,
            array_current: -50.0,
            ..Default::default()
        };
        let out = render(DisplayPage::ArrayInfo, &readings);
        assert_eq!(out.bottom.as_str(), "99.99 V -9.99 A");
        let out = render(DisplayPage::ExternalChargerRequired, &readings);
        assert_eq!(out.bottom.as_str(), "EXTERNAL CHARGER");
    }
}
