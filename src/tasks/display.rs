//! LCD表示タスク

use crate::lcd::Hd44780;
use crate::state::DISPLAY;

/// 制御タスクから届いた内容をLCDに描画
#[embassy_executor::task]
pub async fn display_task(mut lcd: Hd44780) {
    lcd.init().await;
    info!("LCD initialized");

    loop {
        let lines = DISPLAY.wait().await;
        lcd.show(&lines).await;
    }
}
