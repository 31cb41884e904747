// ==============================================================================
// longitudinal.rs — LONGITUDINAL CAPACITY + MODE RESOLUTION
// ==============================================================================
// Capacity:
// - Scans a fixed, ascending grid of slip ratios (1% .. 30%, 50 points) and
//   keeps the first point with the highest force. Grid search, not a solve.
// - A slip angle above ~0.5 deg de-rates the peak through the combined-slip
//   cosine; the report says how much of the pure capacity survives.
//
// Mode resolution:
// - Turns a LongitudinalMode + capacity into a desired Fx:
//     accelerate  -> +max
//     brake       -> -max
//     maintain    ->  0
//     match_speed -> (target - current)/buffer * max, clamped to +-max,
//                    zero inside the buffer band
// - An optional drive limit (motor torque at the wheel) caps positive demand.
// ==============================================================================

use serde::Serialize;

use crate::tire::magic_formula::MagicFormula;
use crate::tire::types::{LongitudinalMode, Real};

pub const SLIP_SCAN_MIN: Real = 0.01;
pub const SLIP_SCAN_MAX: Real = 0.30;
pub const SLIP_SCAN_POINTS: usize = 50;

/// Slip angle above which lateral slip counts as limiting longitudinal grip.
pub const LATERAL_LIMIT_ALPHA: Real = 0.01; // rad

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LongitudinalCapacity {
    pub max_fx: Real,       // N, after combined-slip de-rating
    pub optimal_slip: Real, // slip ratio at the peak
    pub max_fx_pure: Real,  // N, no lateral slip
    pub limited_by_lateral: bool,
    pub available_percentage: Real, // % of max_fx_pure
    pub temperature_effect: Real,
    pub vertical_load: Real, // N
}

#[inline]
fn scan_slip(i: usize) -> Real {
    SLIP_SCAN_MIN + (SLIP_SCAN_MAX - SLIP_SCAN_MIN) * i as Real / (SLIP_SCAN_POINTS - 1) as Real
}

impl MagicFormula {
    /// Slip ratio on the scan grid giving the most longitudinal force.
    pub fn optimal_slip_ratio(&self, fz: Real, alpha: Real, temperature: Real) -> Real {
        let mut best_slip = scan_slip(0);
        let mut best_fx = Real::NEG_INFINITY;

        for i in 0..SLIP_SCAN_POINTS {
            let kappa = scan_slip(i);
            let mut fx = self.pure_longitudinal(fz, kappa, temperature);
            if alpha.abs() > 1e-6 {
                fx = self.combined_longitudinal(alpha, fx);
            }
            // strict: ties keep the lower slip
            if fx > best_fx {
                best_fx = fx;
                best_slip = kappa;
            }
        }

        best_slip
    }

    pub fn max_longitudinal(&self, fz: Real, alpha: Real, temperature: Real) -> LongitudinalCapacity {
        let temperature_effect = self.temperature_factor(temperature);
        let limited_by_lateral = alpha.abs() > LATERAL_LIMIT_ALPHA;

        let optimal_slip = self.optimal_slip_ratio(fz, alpha, temperature);
        let max_fx_pure = self.pure_longitudinal(fz, optimal_slip, temperature);

        let max_fx = if limited_by_lateral {
            self.combined_longitudinal(alpha, max_fx_pure)
        } else {
            max_fx_pure
        };

        let available_percentage = if max_fx_pure > 0.0 {
            100.0 * max_fx / max_fx_pure
        } else {
            0.0
        };

        LongitudinalCapacity {
            max_fx,
            optimal_slip,
            max_fx_pure,
            limited_by_lateral,
            available_percentage,
            temperature_effect,
            vertical_load: fz,
        }
    }
}

// ====================================================================
// Mode -> desired Fx
// ====================================================================

pub fn resolve_desired_fx(
    mode: &LongitudinalMode,
    max_fx: Real,
    current_speed: Real,
    drive_limit: Option<Real>,
) -> Real {
    let max_fx = max_fx.max(0.0);

    let desired = match *mode {
        LongitudinalMode::Accelerate => max_fx,
        LongitudinalMode::Brake => -max_fx,
        LongitudinalMode::Maintain => 0.0,
        LongitudinalMode::MatchSpeed { target_speed, speed_buffer } => {
            let error = target_speed - current_speed;
            if error.abs() <= speed_buffer {
                0.0
            } else {
                let ratio = if speed_buffer > 0.0 {
                    (error / speed_buffer).clamp(-1.0, 1.0)
                } else {
                    error.signum()
                };
                ratio * max_fx
            }
        }
    };

    match drive_limit {
        Some(limit) if desired > limit => limit.max(0.0),
        _ => desired,
    }
}
