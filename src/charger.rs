//! Charger module
//!
//! バルク / 吸収 / フロートの3段階充電シーケンスと、
//! コンバータ・スイッチ出力を決定するステートマシンを提供します。

pub mod mode;
pub mod state_machine;

pub use mode::{ChargeMode, ModeFlags};
pub use state_machine::{ChargeActions, ChargePhase, ChargeStateMachine, ConverterCommand, StopReason};
