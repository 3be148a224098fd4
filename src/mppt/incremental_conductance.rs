// Incremental conductance search (experimental)
//
// Compares dI/dV with -I/V. Not validated on hardware.

use super::DutyBounds;
use libm::fabsf;

/// Tolerance for treating two conductances (or a voltage step) as equal
const EPSILON: f32 = 1e-3;

pub struct IncrementalConductance {
    /// Previous (voltage, current) sample
    previous: Option<(f32, f32)>,
}

impl IncrementalConductance {
    pub const fn new() -> Self {
        Self { previous: None }
    }

    pub fn reset(&mut self) {
        self.previous = None;
    }

    /// Compute the next duty; same sign convention as perturb-and-observe
    pub fn step(&mut self, array_voltage: f32, array_current: f32, duty: u16, bounds: DutyBounds) -> u16 {
        let delta = match self.previous {
            None => 0,
            Some((prev_v, prev_i)) => {
                let dv = array_voltage - prev_v;
                let di = array_current - prev_i;
                direction(array_voltage, array_current, dv, di)
            }
        };
        self.previous = Some((array_voltage, array_current));

        bounds.apply(duty, delta)
    }
}

fn direction(v: f32, i: f32, dv: f32, di: f32) -> i32 {
    if fabsf(dv) < EPSILON {
        // 電圧変化なし: 電流変化の符号で判定
        if fabsf(di) < EPSILON {
            0
        } else if di > 0.0 {
            -1
        } else {
            1
        }
    } else if !(v > 0.0) {
        0
    } else {
        let incremental = di / dv;
        let instantaneous = -i / v;
        if fabsf(incremental - instantaneous) < EPSILON {
            0
        } else if incremental > instantaneous {
            // MPPより低電圧側 → 電圧を上げる
            -1
        } else {
            1
        }
    }
}
