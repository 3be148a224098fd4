//! フラッシュからのキャリブレーションオフセット読み込み
//!
//! STM32F410RBのセクタ4先頭（0x0801_0000）に外部ツールで書き込まれた
//! オフセットを起動時に1回だけ読み込みます。

use mppt_charger::config::calibration::{OFFSETS_BASE_ADDRESS, OFFSETS_LEN};
use mppt_charger::config::CalibrationOffsets;

/// フラッシュメモリからオフセットを読み込む
///
/// # Returns
/// 復元したオフセット（未書き込みのワードは0）
pub fn read_offsets() -> CalibrationOffsets {
    info!("Reading calibration offsets from flash at 0x{:08X}", OFFSETS_BASE_ADDRESS);

    let mut buffer = [0u8; OFFSETS_LEN];
    let src_addr = OFFSETS_BASE_ADDRESS as usize;
    for (i, byte) in buffer.iter_mut().enumerate() {
        let addr = (src_addr + i) as *const u8;
        // SAFETY: 内蔵フラッシュのマップ済み領域で、読み込み中に書き換えられない
        *byte = unsafe { core::ptr::read_volatile(addr) };
    }

    let offsets = CalibrationOffsets::from_flash_bytes(&buffer).unwrap_or(CalibrationOffsets::zero());
    info!(
        "Offsets: Vb={} Va={} Ib={} Ia={} Il={}",
        offsets.battery_voltage,
        offsets.array_voltage,
        offsets.battery_current,
        offsets.array_current,
        offsets.load_current
    );
    offsets
}
