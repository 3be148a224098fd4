//! ティックタスク
//!
//! 1kHzで外部ウォッチドッグを叩き、計測周期と1秒周期を通知します。

use embassy_stm32::gpio::Output;
use embassy_time::{Duration, Ticker};

use mppt_charger::config::timing;
use mppt_charger::housekeeping::TickDivider;

use crate::hardware::set_level;
use crate::state::{SAMPLE_REQUEST, SECOND_TICK};

/// ティックタスク
///
/// PC11: 外部ウォッチドッグ
#[embassy_executor::task]
pub async fn tick_task(mut watchdog: Output<'static>) {
    info!("Tick task started: {}Hz", timing::TICK_HZ);

    let mut divider = TickDivider::default();
    let mut ticker = Ticker::every(Duration::from_hz(timing::TICK_HZ as u64));

    loop {
        ticker.next().await;

        let events = divider.on_tick();
        set_level(&mut watchdog, events.watchdog_level);

        if events.sample {
            SAMPLE_REQUEST.signal(());
        }
        if events.second {
            SECOND_TICK.signal(());
        }
    }
}
