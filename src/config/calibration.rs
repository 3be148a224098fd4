//! ADCキャリブレーションオフセット
//!
//! フラッシュ（セクタ4先頭）に書き込まれた5つの16ビットオフセットを保持します。
//! 書き込みは外部ツールの責務で、本ファームウェアは起動時に読み込むだけです。

/// オフセット格納領域の先頭アドレス
pub const OFFSETS_BASE_ADDRESS: u32 = 0x0801_0000;

/// 各オフセットの格納位置（先頭からのバイトオフセット）
pub mod layout {
    pub const BATTERY_VOLTAGE: u32 = 0x0;
    pub const ARRAY_VOLTAGE: u32 = 0x2;
    pub const ARRAY_CURRENT: u32 = 0x4;
    pub const BATTERY_CURRENT: u32 = 0x6;
    pub const LOAD_CURRENT: u32 = 0x8;
}

/// 格納領域の大きさ [バイト]
pub const OFFSETS_LEN: usize = 10;

/// 未書き込みのフラッシュが返す値
const ERASED_HALFWORD: u16 = 0xFFFF;

/// ADC生値から差し引くオフセット [カウント]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibrationOffsets {
    pub battery_voltage: u16,
    pub array_voltage: u16,
    pub battery_current: u16,
    pub array_current: u16,
    pub load_current: u16,
}

impl CalibrationOffsets {
    /// オフセットなし
    pub const fn zero() -> Self {
        Self {
            battery_voltage: 0,
            array_voltage: 0,
            battery_current: 0,
            array_current: 0,
            load_current: 0,
        }
    }

    /// フラッシュ領域のバイト列（リトルエンディアン）から復元
    ///
    /// 消去状態（0xFFFF）のワードは未キャリブレーションとして0に置き換える。
    ///
    /// # Returns
    /// * `Some(CalibrationOffsets)` - 復元成功
    /// * `None` - バイト列が短すぎる
    pub fn from_flash_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < OFFSETS_LEN {
            return None;
        }

        let word = |offset: u32| {
            let i = offset as usize;
            sanitize(u16::from_le_bytes([bytes[i], bytes[i + 1]]))
        };

        Some(Self {
            battery_voltage: word(layout::BATTERY_VOLTAGE),
            array_voltage: word(layout::ARRAY_VOLTAGE),
            battery_current: word(layout::BATTERY_CURRENT),
            array_current: word(layout::ARRAY_CURRENT),
            load_current: word(layout::LOAD_CURRENT),
        })
    }

    /// すべてのオフセットが0か（未キャリブレーション）
    pub fn is_uncalibrated(&self) -> bool {
        *self == Self::zero()
    }
}

fn sanitize(raw: u16) -> u16 {
    if raw == ERASED_HALFWORD {
        0
    } else {
        raw
    }
}
