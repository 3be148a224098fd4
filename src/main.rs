#![no_std]
#![no_main]

mod fmt;

mod calibration_store;
mod hardware;
mod lcd;
mod state;
mod tasks;

#[cfg(not(feature = "defmt"))]
use panic_halt as _;
#[cfg(feature = "defmt")]
use {defmt_rtt as _, panic_probe as _};

use embassy_executor::Spawner;
use embassy_stm32::{
    adc::{Adc, AdcChannel, SampleTime},
    gpio::{Level, Output, OutputType, Speed},
    time::Hertz,
    timer::{
        complementary_pwm::{ComplementaryPwm, ComplementaryPwmPin},
        low_level::CountingMode,
        simple_pwm::PwmPin,
    },
    usart::{Config as UartConfig, Uart},
};

use mppt_charger::config::{telemetry, ChargeProfile, ControllerConfig, MpptStrategy};
use mppt_charger::Controller;

use hardware::{Irqs, PowerStage};
use lcd::Hd44780;
use tasks::{command_rx_task, control_task, display_task, telemetry_tx_task, tick_task};

/// TIM1 周期256カウント（センターアライン、100MHz）
const PWM_FREQUENCY: Hertz = Hertz(195_312);

/// 起動時に選択するバッテリープロファイルとMPPTアルゴリズム
const fn controller_config() -> ControllerConfig {
    #[cfg(not(feature = "sealed-battery"))]
    let profile = ChargeProfile::flooded();
    #[cfg(feature = "sealed-battery")]
    let profile = ChargeProfile::sealed();

    #[cfg(not(feature = "incremental-conductance"))]
    let strategy = MpptStrategy::PerturbAndObserve;
    #[cfg(feature = "incremental-conductance")]
    let strategy = MpptStrategy::IncrementalConductance;

    ControllerConfig::default()
        .with_profile(profile)
        .with_strategy(strategy)
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    // ハードウェア初期化
    let config = hardware::create_clock_config();
    let p = embassy_stm32::init(config);

    info!("════════════════════════════════════════");
    info!("   MPPT EMS • STM32F410RB @ 100MHz");
    info!("════════════════════════════════════════");

    // 診断LEDは消灯のまま
    let _diag_led = Output::new(p.PB15, Level::Low, Speed::Low);

    // キャリブレーションオフセットをフラッシュから読み込み
    let offsets = calibration_store::read_offsets();
    let controller_config = controller_config();
    let controller = Controller::new(controller_config, offsets);

    // PWM初期化（TIM1 CH1/CH2 相補出力）
    let bridge = ComplementaryPwm::new(
        p.TIM1,
        Some(PwmPin::new(p.PA8, OutputType::PushPull)),
        Some(ComplementaryPwmPin::new(p.PB13, OutputType::PushPull)),
        Some(PwmPin::new(p.PA9, OutputType::PushPull)),
        Some(ComplementaryPwmPin::new(p.PB14, OutputType::PushPull)),
        None,
        None,
        None,
        None,
        PWM_FREQUENCY,
        CountingMode::CenterAlignedBothInterrupts,
    );
    let stage = PowerStage::new(
        bridge,
        Output::new(p.PB5, Level::Low, Speed::Low),
        Output::new(p.PC9, Level::Low, Speed::Low),
        Output::new(p.PB10, Level::High, Speed::Low),
        Output::new(p.PB11, Level::Low, Speed::Low),
    );

    // ADC初期化（チャネル0..4, 6..8）
    let mut adc = Adc::new(p.ADC1);
    adc.set_sample_time(SampleTime::CYCLES144);
    let inputs = [
        p.PA0.degrade_adc(),
        p.PA1.degrade_adc(),
        p.PA2.degrade_adc(),
        p.PA3.degrade_adc(),
        p.PA4.degrade_adc(),
        p.PA6.degrade_adc(),
        p.PA7.degrade_adc(),
        p.PB0.degrade_adc(),
    ];

    let indicators = tasks::control::Indicators {
        load: Output::new(p.PB1, Level::High, Speed::Low),
        fan: Output::new(p.PB2, Level::Low, Speed::Low),
        charge_led: Output::new(p.PC10, Level::High, Speed::Low),
    };

    spawner
        .spawn(control_task(controller, adc, inputs, stage, indicators))
        .unwrap();

    // USART1初期化＆通信タスク起動
    let mut uart_config = UartConfig::default();
    uart_config.baudrate = telemetry::BAUD_RATE;
    let uart = Uart::new(
        p.USART1,
        p.PB7,
        p.PB6,
        Irqs,
        p.DMA2_CH7,
        p.DMA2_CH2,
        uart_config,
    )
    .unwrap();
    let (uart_tx, uart_rx) = uart.split();
    spawner
        .spawn(telemetry_tx_task(uart_tx, controller_config.frame_format))
        .unwrap();
    spawner.spawn(command_rx_task(uart_rx)).unwrap();
    info!("USART1 started at {} baud", telemetry::BAUD_RATE);

    // LCD初期化＆表示タスク起動
    let lcd = Hd44780::new(
        Output::new(p.PC0, Level::Low, Speed::Low),
        Output::new(p.PC1, Level::Low, Speed::Low),
        Output::new(p.PC2, Level::Low, Speed::Low),
        [
            Output::new(p.PC3, Level::Low, Speed::Low),
            Output::new(p.PC4, Level::Low, Speed::Low),
            Output::new(p.PC5, Level::Low, Speed::Low),
            Output::new(p.PC6, Level::Low, Speed::Low),
        ],
    );
    spawner.spawn(display_task(lcd)).unwrap();

    // 最後にティックを開始（外部ウォッチドッグの監視開始）
    let watchdog = Output::new(p.PC11, Level::Low, Speed::Low);
    spawner.spawn(tick_task(watchdog)).unwrap();

    info!("All tasks started");
}
