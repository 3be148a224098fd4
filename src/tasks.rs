//! タスクモジュール
//!
//! 各タスクの実装を分離して管理します。

pub mod control;
pub mod display;
pub mod telemetry;
pub mod tick;

// タスク関数を再エクスポート
pub use control::control_task;
pub use display::display_task;
pub use telemetry::{command_rx_task, telemetry_tx_task};
pub use tick::tick_task;
