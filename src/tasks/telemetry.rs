//! ホスト通信タスク
//!
//! USART1経由でステータスフレームを送信し、ホストからのコマンドを受信します。

use embassy_stm32::{
    mode::Async,
    usart::{UartRx, UartTx},
};

use mppt_charger::config::FrameFormat;
use mppt_charger::telemetry::{build_status_frame, parse_command, CommandDecoder};

use crate::state::{COMMANDS, TELEMETRY};

/// 受信バッファサイズ
const RX_CHUNK: usize = 16;

/// ステータス送信タスク
#[embassy_executor::task]
pub async fn telemetry_tx_task(mut tx: UartTx<'static, Async>, format: FrameFormat) {
    info!("Telemetry TX task started");

    loop {
        let status = TELEMETRY.receive().await;

        let frame = match build_status_frame(&status, format) {
            Ok(frame) => frame,
            Err(e) => {
                error!("Failed to build status frame: {}", e);
                continue;
            }
        };

        if let Err(e) = tx.write(&frame).await {
            error!("UART TX error: {}", e);
        }
    }
}

/// コマンド受信タスク
#[embassy_executor::task]
pub async fn command_rx_task(mut rx: UartRx<'static, Async>) {
    info!("Command RX task started");

    let mut decoder = CommandDecoder::new();
    let mut buffer = [0u8; RX_CHUNK];

    loop {
        let received = match rx.read_until_idle(&mut buffer).await {
            Ok(n) => n,
            Err(e) => {
                warn!("UART RX error: {}", e);
                decoder.reset();
                continue;
            }
        };

        for &byte in &buffer[..received] {
            match decoder.push(byte) {
                Ok(Some(frame)) => match parse_command(&frame) {
                    Ok(command) => {
                        if COMMANDS.try_send(command).is_err() {
                            warn!("Command queue full, command dropped");
                        }
                    }
                    Err(e) => warn!("Invalid command frame: {}", e),
                },
                Ok(None) => {}
                Err(e) => warn!("Command decode error: {}", e),
            }
        }
    }
}
