//! Configuration module
//!
//! このモジュールは充電制御とハードウェアの設定、
//! およびキャリブレーションオフセットの読み込みを提供します。

pub mod calibration;
pub mod params;
pub mod profile;

// params.rsから主要な定数を再エクスポート
pub use params::*;

pub use calibration::CalibrationOffsets;
pub use profile::{ChargeLimits, ChargeProfile, ControllerConfig, FrameFormat, MpptConfig, MpptStrategy};
