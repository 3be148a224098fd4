//! Measurement module
//!
//! ADCスイープの平均化、キャリブレーション済み物理量への変換、
//! 表示・テレメトリ用の移動平均を提供します。

pub mod acquisition;
pub mod conditioning;
pub mod rolling_average;

pub use acquisition::{Acquisition, Channel, RawAverages, Sweep};
pub use conditioning::{Conditioner, MeasurementSnapshot};
pub use rolling_average::{DisplayAverages, RollingAverage};
