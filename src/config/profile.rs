//! 充電プロファイルとコントローラ設定
//!
//! 鉛蓄電池の種類ごとの電圧・時間パラメータと、MPPT / サンプリング周期などの
//! 実行時設定をまとめた構造体です。

use super::params;

/// MPPT探索アルゴリズム
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MpptStrategy {
    /// 山登り法（Perturb and Observe）
    PerturbAndObserve,
    /// アレイ電圧を一定に保つ簡易制御（MPPTではない）
    ConstantVoltage,
    /// インクリメンタルコンダクタンス法（実験的、未検証）
    #[cfg(feature = "incremental-conductance")]
    IncrementalConductance,
}

/// ホストへ送るステータスフレームの形式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameFormat {
    /// 6フィールド + フラグ（現行）
    Current,
    /// 4フィールドのみ（旧ホスト互換）
    Legacy,
}

/// 充電プロファイル（バッテリー種別ごとのパラメータ）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChargeProfile {
    /// 25℃における吸収充電電圧 [V]
    pub absorption_v_25c: f32,
    /// 25℃におけるフロート電圧 [V]
    pub float_v_25c: f32,
    /// 温度係数 [V/℃]（吸収・フロート共通）
    pub temp_coefficient_v_per_c: f32,
    /// 低温側の折れ点 [℃]（これ以下は一定）
    pub low_breakpoint_c: f32,
    /// 高温側の折れ点 [℃]（これ以上は一定）
    pub high_breakpoint_c: f32,
    /// バルク充電に入るフロート電圧からの余裕 [V]
    pub bulk_margin_v: f32,
    /// 吸収充電を再開する吸収電圧からの余裕 [V]
    pub absorption_resume_margin_v: f32,
    /// フロート充電を再開/停止するフロート電圧からの余裕 [V]
    pub float_margin_v: f32,
    /// 吸収充電の保持時間 [s]
    pub absorption_dwell_s: u16,
    /// 吸収充電完了後、次の吸収充電を禁止する時間 [s]
    pub absorption_lockout_s: u16,
}

impl ChargeProfile {
    /// 開放型（液式）鉛蓄電池
    pub const fn flooded() -> Self {
        Self {
            absorption_v_25c: 14.4,
            float_v_25c: 13.5,
            temp_coefficient_v_per_c: -0.03,
            low_breakpoint_c: -30.0,
            high_breakpoint_c: 40.0,
            bulk_margin_v: 0.5,
            absorption_resume_margin_v: 0.5,
            float_margin_v: 0.25,
            absorption_dwell_s: 3_600,
            absorption_lockout_s: 28_800,
        }
    }

    /// 密閉型鉛蓄電池
    pub const fn sealed() -> Self {
        Self {
            absorption_v_25c: 14.2,
            float_v_25c: 13.4,
            absorption_dwell_s: 9_000,
            ..Self::flooded()
        }
    }
}

/// MPPT制御の設定
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MpptConfig {
    pub strategy: MpptStrategy,
    pub min_duty: u16,
    pub max_duty: u16,
    pub seed_duty: u16,
    pub period: u16,
    /// 定電圧モードの目標アレイ電圧 [V]
    pub cv_array_target_v: f32,
    /// 最大デューティ張り付きの許容制御周期数
    pub stuck_limit_passes: u16,
    /// 電流低下判定までの猶予制御周期数
    pub grace_passes: u16,
    /// バイパス時のコンバータ停止時間 [s]
    pub cooldown_s: u16,
}

impl MpptConfig {
    pub const fn default() -> Self {
        Self {
            strategy: MpptStrategy::PerturbAndObserve,
            min_duty: params::pwm::MIN_DUTY,
            max_duty: params::pwm::MAX_DUTY,
            seed_duty: params::pwm::SEED_DUTY,
            period: params::pwm::PERIOD,
            cv_array_target_v: params::pwm::CV_ARRAY_TARGET_V,
            stuck_limit_passes: params::bypass::STUCK_LIMIT_PASSES,
            grace_passes: params::bypass::GRACE_PASSES,
            cooldown_s: params::bypass::COOLDOWN_S,
        }
    }
}

/// 充電状態遷移に使う電圧/電流しきい値
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChargeLimits {
    pub drop_dead_v: f32,
    pub headroom_v: f32,
    pub max_pv_v: f32,
    pub min_charge_current_a: f32,
    pub start_settle_passes: u8,
    pub low_current_retry_s: u16,
    pub pulse_interval_s: u16,
}

impl ChargeLimits {
    pub const fn default() -> Self {
        Self {
            drop_dead_v: params::battery::DROP_DEAD_V,
            headroom_v: params::array::CHARGE_HEADROOM_V,
            max_pv_v: params::array::MAX_PV_V,
            min_charge_current_a: params::array::MIN_CHARGE_CURRENT_A,
            start_settle_passes: params::timing::START_SETTLE_PASSES,
            low_current_retry_s: params::timing::LOW_CURRENT_RETRY_S,
            pulse_interval_s: params::timing::PULSE_INTERVAL_S,
        }
    }
}

/// コントローラ全体の設定
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerConfig {
    pub profile: ChargeProfile,
    pub mppt: MpptConfig,
    pub limits: ChargeLimits,
    /// 1回の計測で平均化するADCスイープ数
    pub sweeps_per_sample: u8,
    /// ステータス送信周期 [制御周期]
    pub telemetry_every_passes: u16,
    pub frame_format: FrameFormat,
}

impl ControllerConfig {
    /// デフォルト設定を生成（params.rsの値、開放型プロファイル）
    pub const fn default() -> Self {
        Self {
            profile: ChargeProfile::flooded(),
            mppt: MpptConfig::default(),
            limits: ChargeLimits::default(),
            sweeps_per_sample: params::DEFAULT_SWEEPS_PER_SAMPLE,
            telemetry_every_passes: params::telemetry::SEND_EVERY_PASSES,
            frame_format: FrameFormat::Current,
        }
    }

    /// プロファイルを差し替えた設定を返す
    pub const fn with_profile(mut self, profile: ChargeProfile) -> Self {
        self.profile = profile;
        self
    }

    /// MPPTアルゴリズムを差し替えた設定を返す
    pub const fn with_strategy(mut self, strategy: MpptStrategy) -> Self {
        self.mppt.strategy = strategy;
        self
    }

    /// 設定値の整合性を検証
    pub fn is_valid(&self) -> bool {
        self.mppt.min_duty <= self.mppt.seed_duty
            && self.mppt.seed_duty <= self.mppt.max_duty
            && self.mppt.max_duty <= self.mppt.period
            && self.sweeps_per_sample > 0
            && self.profile.low_breakpoint_c < self.profile.high_breakpoint_c
            && self.profile.float_v_25c < self.profile.absorption_v_25c
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ControllerConfig::default();
        assert!(config.is_valid());
        assert_eq!(config.profile.absorption_dwell_s, 3_600);
        assert_eq!(config.mppt.seed_duty, 205);
        assert_eq!(config.sweeps_per_sample, 32);
    }

    #[test]
    fn test_sealed_profile_keeps_shared_limits() {
        let sealed = ChargeProfile::sealed();
        assert_eq!(sealed.absorption_dwell_s, 9_000);
        assert_eq!(sealed.absorption_lockout_s, 28_800);
        assert_eq!(sealed.temp_coefficient_v_per_c, -0.03);
    }

    #[test]
    fn test_builders_replace_profile_and_strategy() {
        let config = ControllerConfig::default()
            .with_profile(ChargeProfile::sealed())
            .with_strategy(MpptStrategy::ConstantVoltage);
        assert!(config.is_valid());
        assert_eq!(config.profile, ChargeProfile::sealed());
        assert_eq!(config.mppt.strategy, MpptStrategy::ConstantVoltage);
    }

    #[test]
    fn test_invalid_duty_window_rejected() {
        let mut config = ControllerConfig::default();
        config.mppt.seed_duty = 230;
        assert!(!config.is_valid());
    }
}
