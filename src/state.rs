//! タスク間通信
//!
//! 制御ロジック（`Controller`）は制御タスクが単独で所有し、
//! 他のタスクとはシグナルとチャネルでやり取りします。

use embassy_sync::blocking_mutex::raw::ThreadModeRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;

use mppt_charger::display::LcdLines;
use mppt_charger::telemetry::{Command, StatusFields};

/// 100ms周期の計測要求（ティックタスク → 制御タスク）
pub static SAMPLE_REQUEST: Signal<ThreadModeRawMutex, ()> = Signal::new();

/// 1秒周期のハウスキーピング要求（ティックタスク → 制御タスク）
pub static SECOND_TICK: Signal<ThreadModeRawMutex, ()> = Signal::new();

/// 送信待ちのステータス（制御タスク → 送信タスク）
pub static TELEMETRY: Channel<ThreadModeRawMutex, StatusFields, 2> = Channel::new();

/// 受信したホストコマンド（受信タスク → 制御タスク）
pub static COMMANDS: Channel<ThreadModeRawMutex, Command, 4> = Channel::new();

/// LCDに描画する内容（制御タスク → 表示タスク）
pub static DISPLAY: Signal<ThreadModeRawMutex, LcdLines> = Signal::new();
