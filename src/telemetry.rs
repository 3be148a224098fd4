//! Telemetry module
//!
//! ホストコントローラとのシリアル通信を扱います。
//! - ステータスフレームの生成（エスケープ・CRC付き）
//! - ホストからのコマンドフレームの復号

pub mod command;
pub mod crc;
pub mod frame;

pub use command::{parse_command, Command, CommandDecoder, CommandError};
pub use crc::crc16_ccitt_false;
pub use frame::{
    build_status_frame, decode_status_frame, encode_status_frame, escape, unescape, EscapedFrame,
    FrameError, RawFrame, StatusFields,
};

/// 制御周期を数えてステータス送信タイミングを決める
pub struct TelemetryScheduler {
    every_passes: u16,
    passes: u16,
}

impl TelemetryScheduler {
    pub const fn new(every_passes: u16) -> Self {
        Self {
            every_passes,
            passes: 0,
        }
    }

    /// 1制御周期を数え、送信すべき周期ならtrue
    pub fn on_pass(&mut self) -> bool {
        self.passes = self.passes.saturating_add(1);
        if self.passes >= self.every_passes.max(1) {
            self.passes = 0;
            true
        } else {
            false
        }
    }
}
