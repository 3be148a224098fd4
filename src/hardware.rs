//! ハードウェア初期化モジュール
//!
//! クロック設定と、充電段（相補PWM・スイッチ・脱硫パルス回路）の
//! 出力ドライバをまとめます。

use embassy_stm32::{
    bind_interrupts,
    gpio::Output,
    peripherals,
    timer::{complementary_pwm::ComplementaryPwm, Channel},
    usart, Config,
};
use embassy_time::{Duration, Timer};

use mppt_charger::charger::{ChargeActions, ConverterCommand};
use mppt_charger::config::{pwm, timing};

// USARTの割り込みをバインド
bind_interrupts!(pub struct Irqs {
    USART1 => usart::InterruptHandler<peripherals::USART1>;
});

/// RCCクロック設定を初期化
///
/// HSI(16MHz) → PLL（÷8 × 100 ÷ 2）で100MHz生成
pub fn create_clock_config() -> Config {
    let mut config = Config::default();
    {
        use embassy_stm32::rcc::{
            AHBPrescaler, APBPrescaler, Pll, PllMul, PllPDiv, PllPreDiv, PllQDiv, PllSource,
            Sysclk,
        };

        config.rcc.hsi = true;
        config.rcc.pll_src = PllSource::HSI;
        config.rcc.pll = Some(Pll {
            prediv: PllPreDiv::DIV8,
            mul: PllMul::MUL100,
            divp: Some(PllPDiv::DIV2),
            divq: Some(PllQDiv::DIV4),
            divr: None,
        });
        config.rcc.sys = Sysclk::PLL1_P;
        config.rcc.ahb_pre = AHBPrescaler::DIV1;
        config.rcc.apb1_pre = APBPrescaler::DIV2;
        config.rcc.apb2_pre = APBPrescaler::DIV1;
    }
    config
}

/// 充電段の出力
///
/// - TIM1 CH1/CH1N, CH2/CH2N: 降圧コンバータの相補PWM（CH2はCH1の反転デューティ）
/// - PB5: 充電器スイッチ
/// - PC9: アレイスイッチ
/// - PB10: 脱硫コンデンサ接続（Highで接続）
/// - PB11: 脱硫パルス
pub struct PowerStage {
    bridge: ComplementaryPwm<'static, peripherals::TIM1>,
    charger_switch: Output<'static>,
    array_switch: Output<'static>,
    capacitors: Output<'static>,
    pulse: Output<'static>,
    running: bool,
}

impl PowerStage {
    pub fn new(
        mut bridge: ComplementaryPwm<'static, peripherals::TIM1>,
        charger_switch: Output<'static>,
        array_switch: Output<'static>,
        mut capacitors: Output<'static>,
        mut pulse: Output<'static>,
    ) -> Self {
        capacitors.set_high();
        bridge.disable(Channel::Ch1);
        bridge.disable(Channel::Ch2);
        bridge.set_dead_time(pwm::DEAD_TIME);
        pulse.set_low();

        info!(
            "Power stage initialized: max_duty={}, dead_time={}",
            bridge.get_max_duty(),
            pwm::DEAD_TIME
        );

        Self {
            bridge,
            charger_switch,
            array_switch,
            capacitors,
            pulse,
            running: false,
        }
    }

    /// 制御周期の出力を反映
    ///
    /// 停止時はPWMを先に止めてからスイッチを開き、起動時はスイッチを
    /// 閉じてからデューティを設定してPWMを有効にする。
    pub fn apply(&mut self, actions: &ChargeActions) {
        match actions.converter {
            ConverterCommand::Off => {
                self.stop();
                set_level(&mut self.charger_switch, actions.charger_switch);
                set_level(&mut self.array_switch, actions.array_switch);
            }
            ConverterCommand::On(duty) => {
                set_level(&mut self.charger_switch, actions.charger_switch);
                set_level(&mut self.array_switch, actions.array_switch);
                self.set_duty(duty);
                if !self.running {
                    self.bridge.enable(Channel::Ch1);
                    self.bridge.enable(Channel::Ch2);
                    self.running = true;
                }
            }
            ConverterCommand::Update(duty) => {
                set_level(&mut self.charger_switch, actions.charger_switch);
                set_level(&mut self.array_switch, actions.array_switch);
                self.set_duty(duty);
            }
        }
    }

    /// PWMを停止（スイッチは触らない）
    pub fn stop(&mut self) {
        if self.running {
            self.bridge.disable(Channel::Ch1);
            self.bridge.disable(Channel::Ch2);
            self.running = false;
        }
    }

    /// 脱硫パルスを発行
    ///
    /// コンデンサを切り離し、パルスピンを半周期ごとに反転させたあと
    /// Lowに戻してコンデンサを再接続する。
    pub async fn desulfation_pulse(&mut self) {
        debug!("Desulfation pulse");
        self.capacitors.set_low();
        for _ in 0..timing::PULSE_TOGGLES {
            self.pulse.toggle();
            Timer::after(Duration::from_micros(timing::PULSE_HALF_PERIOD_US)).await;
        }
        self.pulse.set_low();
        self.capacitors.set_high();
    }

    fn set_duty(&mut self, duty: u16) {
        // 制御側のデューティ（0..PERIOD）をタイマーの分解能に換算
        let max = self.bridge.get_max_duty() as u32;
        let scaled = (duty.min(pwm::PERIOD) as u32 * max / pwm::PERIOD as u32) as u16;
        self.bridge.set_duty(Channel::Ch1, scaled);
        self.bridge.set_duty(Channel::Ch2, max as u16 - scaled);
    }
}

pub fn set_level(pin: &mut Output<'static>, high: bool) {
    if high {
        pin.set_high();
    } else {
        pin.set_low();
    }
}
