//! Solar MPPT charge controller core
//!
//! ハードウェアに依存しない制御ロジック一式です。ファームウェア
//! （`src/main.rs`）はペリフェラルとこのライブラリを接続するだけです。

#![cfg_attr(not(test), no_std)]

pub(crate) mod fmt;

pub mod charger;
pub mod config;
pub mod controller;
pub mod display;
pub mod housekeeping;
pub mod load;
pub mod measurement;
pub mod mppt;
pub mod policy;
pub mod safety;
pub mod telemetry;
pub mod timers;

pub use controller::{ControlOutputs, Controller, SecondEvents};
