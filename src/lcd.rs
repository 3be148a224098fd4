//! HD44780 キャラクタLCDドライバ（4ビットモード、書き込みのみ）
//!
//! - PC0: RS
//! - PC1: R/W（常にLow）
//! - PC2: E
//! - PC3..PC6: D4..D7

use embassy_stm32::gpio::Output;
use embassy_time::{Duration, Timer};

use mppt_charger::display::{LcdLines, LCD_COLUMNS};

use crate::hardware::set_level;

const CLEAR_DISPLAY: u8 = 0x01;
const ENTRY_MODE_SET: u8 = 0x04;
const DISPLAY_CONTROL: u8 = 0x08;
const FUNCTION_SET: u8 = 0x20;
const SET_DDRAM_ADDRESS: u8 = 0x80;

const ENTRY_INCREMENT: u8 = 0x02;
const DISPLAY_ON: u8 = 0x04;
const TWO_LINES: u8 = 0x08;

/// 行ごとのDDRAM先頭アドレス
const ROW_OFFSETS: [u8; 2] = [0x00, 0x40];

pub struct Hd44780 {
    rs: Output<'static>,
    rw: Output<'static>,
    enable: Output<'static>,
    data: [Output<'static>; 4],
}

impl Hd44780 {
    /// # Arguments
    /// * `data` - D4, D5, D6, D7 の順
    pub fn new(
        rs: Output<'static>,
        rw: Output<'static>,
        enable: Output<'static>,
        data: [Output<'static>; 4],
    ) -> Self {
        Self {
            rs,
            rw,
            enable,
            data,
        }
    }

    /// 4ビットモードへの初期化シーケンス
    pub async fn init(&mut self) {
        self.rw.set_low();
        self.rs.set_low();
        Timer::after(Duration::from_millis(40)).await;

        for _ in 0..3 {
            self.write_nibble(0x03).await;
            Timer::after(Duration::from_micros(4_500)).await;
        }
        self.write_nibble(0x02).await;

        self.command(FUNCTION_SET | TWO_LINES).await;
        self.command(DISPLAY_CONTROL | DISPLAY_ON).await;
        self.clear().await;
        self.command(ENTRY_MODE_SET | ENTRY_INCREMENT).await;
    }

    pub async fn clear(&mut self) {
        self.command(CLEAR_DISPLAY).await;
        Timer::after(Duration::from_millis(2)).await;
    }

    /// 画面を消去して2行を描画
    pub async fn show(&mut self, lines: &LcdLines) {
        self.clear().await;
        self.write_row(0, lines.top.as_str()).await;
        self.write_row(1, lines.bottom.as_str()).await;
    }

    async fn write_row(&mut self, row: usize, text: &str) {
        self.command(SET_DDRAM_ADDRESS | ROW_OFFSETS[row]).await;
        self.rs.set_high();
        for byte in text.bytes().take(LCD_COLUMNS) {
            self.write_byte(byte).await;
        }
        self.rs.set_low();
    }

    async fn command(&mut self, command: u8) {
        self.rs.set_low();
        self.write_byte(command).await;
    }

    async fn write_byte(&mut self, byte: u8) {
        self.write_nibble(byte >> 4).await;
        self.write_nibble(byte & 0x0F).await;
    }

    async fn write_nibble(&mut self, nibble: u8) {
        for (bit, pin) in self.data.iter_mut().enumerate() {
            set_level(pin, nibble & (1 << bit) != 0);
        }
        Timer::after(Duration::from_micros(50)).await;
        self.enable.set_high();
        Timer::after(Duration::from_micros(50)).await;
        self.enable.set_low();
        Timer::after(Duration::from_micros(50)).await;
    }
}
