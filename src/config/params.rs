//! 充電コントローラとハードウェアの設定パラメータ（デフォルト値）

/// ADC 1カウントあたりの電圧 [V]（Vref 3.3V / 4096）
pub const ADC_UNIT_V: f32 = 0.000806;

/// 電圧検出の分圧比（入力1Vあたり 0.0623V）
pub const VOLTAGE_DIVIDER_RATIO: f32 = 0.0623;

/// バッテリー/アレイ電圧チャネルのアンプゲイン
pub const BATTERY_VOLTAGE_GAIN: f32 = 2.0;

/// 負荷電圧チャネルのアンプゲイン
pub const LOAD_VOLTAGE_GAIN: f32 = 1.0;

/// 電流センスアンプ（INA213）のゲイン
pub const CURRENT_SENSE_GAIN: f32 = 50.0;

/// 電流検出抵抗 [Ω]
pub const CURRENT_SENSE_OHMS: f32 = 0.002;

/// LM335 の出力 [V/K]
pub const TEMP_SENSOR_V_PER_KELVIN: f32 = 0.010;

/// 0℃ の絶対温度 [K]
pub const KELVIN_OFFSET: f32 = 273.15;

/// 1回の計測で平均化するADCスイープ数
pub const DEFAULT_SWEEPS_PER_SAMPLE: u8 = 32;

/// ADCチャネル数（1スイープあたり）
pub const ADC_CHANNEL_COUNT: usize = 8;

/// バッテリー電圧の保護しきい値 [V]
pub mod battery {
    /// この電圧以上で高電圧警告（負荷OFF）
    pub const V_MAX_LOAD_OFF: f32 = 15.5;
    /// 高電圧警告からの復帰電圧
    pub const V_MAX_LOAD_ON: f32 = 15.3;
    /// この電圧以下で低電圧警告（負荷OFF）
    pub const V_MIN_LOAD_OFF: f32 = 10.7;
    /// 低電圧警告からの復帰電圧
    pub const V_MIN_LOAD_ON: f32 = 12.0;
    /// これ未満では充電しない（過放電バッテリー保護）
    pub const DROP_DEAD_V: f32 = 8.0;
}

/// MOSFET温度しきい値 [℃]
pub mod thermal {
    /// ファンON温度
    pub const FAN_ON_C: f32 = 50.0;
    /// ファンOFF温度
    pub const FAN_OFF_C: f32 = 38.0;
    /// 過熱フラグのトリップ温度（充電停止）
    pub const OVER_TEMP_TRIP_C: f32 = 85.0;
    /// 過熱フラグの解除温度
    pub const OVER_TEMP_RELEASE_C: f32 = 70.0;
}

/// ソーラーアレイ関連のしきい値
pub mod array {
    /// 充電開始に必要なアレイ電圧の余裕（バッテリー電圧 + 2V）
    pub const CHARGE_HEADROOM_V: f32 = 2.0;
    /// この電圧以上ではデューティ比を初期値に戻す
    pub const MAX_PV_V: f32 = 21.0;
    /// 充電継続に必要な最小アレイ電流 [A]
    pub const MIN_CHARGE_CURRENT_A: f32 = 0.394;
}

/// PWM / デューティ比の設定（TIM1 周期 256 カウント）
pub mod pwm {
    /// PWM周期 [カウント]
    pub const PERIOD: u16 = 256;
    /// 最小デューティ（周期の75%）
    pub const MIN_DUTY: u16 = 192;
    /// 最大デューティ（周期の85%）
    pub const MAX_DUTY: u16 = 218;
    /// 初期デューティ（周期の80%）
    pub const SEED_DUTY: u16 = 205;
    /// 相補PWMのデッドタイム（約50ns、変更禁止: 貫通電流防止）
    pub const DEAD_TIME: u16 = 22;
    /// 定電圧モードで保持するアレイ電圧 [V]
    pub const CV_ARRAY_TARGET_V: f32 = 16.0;
}

/// MPPTバイパス（最大デューティ張り付き）の設定
pub mod bypass {
    /// 最大デューティ張り付きの許容制御周期数
    pub const STUCK_LIMIT_PASSES: u16 = 600;
    /// バッテリー電流低下を判定するまでの猶予周期数
    pub const GRACE_PASSES: u16 = 100;
    /// コンバータ停止時間 [s]
    pub const COOLDOWN_S: u16 = 30;
}

/// 時間関連の設定
pub mod timing {
    /// ティック周波数 [Hz]
    pub const TICK_HZ: u32 = 1_000;
    /// サンプリング周期 [ティック]（100ms）
    pub const SAMPLE_EVERY_TICKS: u16 = 100;
    /// ハウスキーピング周期 [ティック]（1s）
    pub const SECOND_EVERY_TICKS: u16 = 1_000;
    /// コンバータ起動後、アレイ電流を確認するまでの制御周期数（約1秒）
    pub const START_SETTLE_PASSES: u8 = 10;
    /// アレイ電流不足時の再試行待ち [s]
    pub const LOW_CURRENT_RETRY_S: u16 = 10;
    /// デサルフェーションパルスの間隔 [s]
    pub const PULSE_INTERVAL_S: u16 = 120;
    /// デサルフェーションパルスのトグル回数
    pub const PULSE_TOGGLES: u8 = 10;
    /// デサルフェーションパルスの半周期 [μs]
    pub const PULSE_HALF_PERIOD_US: u64 = 100;
    /// 移動平均ウィンドウ [s]
    pub const AVERAGE_WINDOW_S: u8 = 5;
    /// LCDページのローテーション周期 [s]
    pub const LCD_ROTATION_S: u8 = 12;
}

/// 負荷保護の設定
pub mod load {
    /// ブラウンアウト判定帯の下限 [V]
    pub const BROWNOUT_MIN_V: f32 = 5.0;
    /// ブラウンアウト判定帯の上限 [V]
    pub const BROWNOUT_MAX_V: f32 = 10.0;
    /// ブラウンアウト時の負荷OFF時間 [s]
    pub const BROWNOUT_RECOVERY_S: u16 = 5;
}

/// ホスト通信の設定
pub mod telemetry {
    /// ステータス送信周期 [制御周期]
    pub const SEND_EVERY_PASSES: u16 = 150;
    /// USARTボーレート
    pub const BAUD_RATE: u32 = 115_200;
}
