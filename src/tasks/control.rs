//! 制御タスク
//!
//! 計測要求ごとにADCスイープを取得して制御周期を実行し、
//! 1秒ごとにハウスキーピングを行います。出力ピンはすべてこのタスクが所有します。

use embassy_futures::select::{select, Either};
use embassy_stm32::{
    adc::{Adc, AnyAdcChannel},
    gpio::Output,
    peripherals,
};

use mppt_charger::charger::ChargeMode;
use mppt_charger::measurement::Sweep;
use mppt_charger::{ControlOutputs, Controller, SecondEvents};

use crate::hardware::{set_level, PowerStage};
use crate::state::{COMMANDS, DISPLAY, SAMPLE_REQUEST, SECOND_TICK, TELEMETRY};

/// ADC入力（`Channel` の順: PA0, PA1, PA2, PA3, PA4, PA6, PA7, PB0）
pub type AdcInputs = [AnyAdcChannel<peripherals::ADC1>; 8];

/// 制御タスク以外から触らない出力ピン
pub struct Indicators {
    /// PB1: 負荷スイッチ
    pub load: Output<'static>,
    /// PB2: 冷却ファン
    pub fan: Output<'static>,
    /// PC10: 充電LED
    pub charge_led: Output<'static>,
}

/// 制御タスク
#[embassy_executor::task]
pub async fn control_task(
    mut controller: Controller,
    mut adc: Adc<'static, peripherals::ADC1>,
    mut inputs: AdcInputs,
    mut stage: PowerStage,
    mut indicators: Indicators,
) {
    info!(
        "Control task started: {} sweeps per sample",
        controller.get_config().sweeps_per_sample
    );

    loop {
        match select(SAMPLE_REQUEST.wait(), SECOND_TICK.wait()).await {
            Either::First(()) => {
                while let Ok(command) = COMMANDS.try_receive() {
                    controller.handle_command(command);
                }

                let outputs = loop {
                    let sweep = read_sweep(&mut adc, &mut inputs);
                    if let Some(outputs) = controller.push_sweep(&sweep) {
                        break outputs;
                    }
                };
                apply_outputs(&outputs, &mut stage, &mut indicators).await;
            }
            Either::Second(()) => {
                let events = controller.second_tick();
                apply_second(&events, controller.get_mode(), &mut indicators);
            }
        }
    }
}

fn read_sweep(adc: &mut Adc<'static, peripherals::ADC1>, inputs: &mut AdcInputs) -> Sweep {
    let mut sweep: Sweep = [0; 8];
    for (slot, input) in sweep.iter_mut().zip(inputs.iter_mut()) {
        *slot = adc.blocking_read(input);
    }
    sweep
}

async fn apply_outputs(
    outputs: &ControlOutputs,
    stage: &mut PowerStage,
    indicators: &mut Indicators,
) {
    stage.apply(&outputs.charge);
    set_level(&mut indicators.load, outputs.load_on);
    set_level(&mut indicators.fan, outputs.fan_on);

    if outputs.charge.desulfation_pulse {
        stage.desulfation_pulse().await;
    }

    if let Some(status) = outputs.telemetry {
        if TELEMETRY.try_send(status).is_err() {
            warn!("Telemetry queue full, status dropped");
        }
    }
}

fn apply_second(events: &SecondEvents, mode: ChargeMode, indicators: &mut Indicators) {
    set_level(&mut indicators.charge_led, events.charge_led);
    set_level(&mut indicators.load, events.load_on);

    if let Some((page, lines)) = &events.display {
        debug!("LCD page: {}", page);
        DISPLAY.signal(lines.clone());
    }

    if let Some(avg) = events.averages {
        info!(
            "[Average] {} Vb={}V Ib={}A Va={}V Ia={}A Vl={}V Il={}A",
            mode,
            avg.battery_voltage,
            avg.battery_current,
            avg.array_voltage,
            avg.array_current,
            avg.load_voltage,
            avg.load_current
        );
    }
}
