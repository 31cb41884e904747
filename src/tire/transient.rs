// ==============================================================================
// transient.rs — TRANSIENT SLIP (SINGLE CONTACT POINT) + TEMPERATURE + WEAR
// ==============================================================================
// Carcass deflections u (longitudinal) and v (lateral) follow first-order lags:
//     du/dt = -|Vx| * u / sigma_k + |Vx| * kappa
//     dv/dt = -|Vx| * v / sigma_a + |Vx| * tan(alpha)
// stepped with the exact exponential solution over dt, so the deflection
// decays toward sigma * slip at any speed, either direction of travel.
// with relaxation lengths from the stiffness ratio:
//     sigma_k = C_Fx / (2 C_Fy),   sigma_a = C_Fy / (2 C_Fx)
// Transient slip fed back into the steady-state formula:
//     kappa' = u / sigma_k,   alpha' = atan(v / sigma_a)
//
// Each advance also:
// - heats the tire by slip work, cools it at a constant rate, never below ambient
// - accumulates wear at rate k * (|kappa| + |alpha|)^n, clamped to 1.0
//
// Below MIN_SLIP_SPEED the slip ratio/angle are taken as zero instead of
// dividing by a vanishing Vx.
// ==============================================================================

use serde::Serialize;

use crate::tire::magic_formula::{MagicFormula, TireForces};
use crate::tire::params::TireParams;
use crate::tire::types::Real;

pub const MIN_SLIP_SPEED: Real = 0.1; // m/s

/// Contact-patch kinematics for one transient step.
#[derive(Debug, Clone, Copy, Default)]
pub struct SlipVelocity {
    pub vx: Real,  // m/s, wheel-centre forward speed
    pub vsx: Real, // m/s, longitudinal slip velocity
    pub vsy: Real, // m/s, lateral slip velocity
    pub gamma: Real, // rad
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TransientSlip {
    pub kappa_prime: Real,
    pub alpha_prime: Real,
    pub gamma_prime: Real,
    pub temperature: Real,
    pub wear: Real,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransientState {
    pub u: Real, // m
    pub v: Real, // m
    pub temperature: Real, // °C
    pub wear: Real, // [0, 1]
}

impl TransientState {
    pub fn new(params: &TireParams) -> Self {
        Self {
            u: 0.0,
            v: 0.0,
            temperature: params.initial_temperature,
            wear: 0.0,
        }
    }

    pub fn reset(&mut self, params: &TireParams) {
        *self = Self::new(params);
    }

    pub fn advance(&mut self, params: &TireParams, slip: SlipVelocity, dt: Real) -> TransientSlip {
        let sigma_kappa = params.c_fx / (2.0 * params.c_fy);
        let sigma_alpha = params.c_fy / (2.0 * params.c_fx);

        let vx = slip.vx;
        let (kappa, alpha) = if vx.abs() < MIN_SLIP_SPEED {
            (0.0, 0.0)
        } else {
            (-slip.vsx / vx.abs(), -slip.vsy.atan2(vx.abs()))
        };

        // --- carcass deflection ---
        let u_ss = sigma_kappa * kappa;
        let v_ss = sigma_alpha * alpha.tan();
        self.u = u_ss + (self.u - u_ss) * (-vx.abs() * dt / sigma_kappa).exp();
        self.v = v_ss + (self.v - v_ss) * (-vx.abs() * dt / sigma_alpha).exp();

        // --- thermal ---
        let slip_work = (slip.vsx * kappa).abs() + (slip.vsy * alpha).abs();
        self.temperature += (params.heating_coefficient * slip_work - params.cooling_rate) * dt;
        self.temperature = self.temperature.max(params.ambient_temperature);

        // --- wear ---
        let wear_rate = params.wear_constant * (kappa.abs() + alpha.abs()).powf(params.wear_exponent);
        self.wear = (self.wear + wear_rate * dt).min(1.0);

        TransientSlip {
            kappa_prime: self.u / sigma_kappa,
            alpha_prime: (self.v / sigma_alpha).atan(),
            gamma_prime: slip.gamma,
            temperature: self.temperature,
            wear: self.wear,
        }
    }
}

impl MagicFormula {
    /// Steady-state forces evaluated at the transient slip pair.
    pub fn transient_forces(&self, fz: Real, slip: &TransientSlip) -> TireForces {
        self.steady_state(fz, slip.kappa_prime, slip.alpha_prime, slip.gamma_prime, slip.temperature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng, rngs::StdRng};

    #[test]
    fn wear_is_monotonic_and_bounded() {
        let params = TireParams {
            wear_constant: 0.5,
            ..TireParams::default()
        };
        let mut state = TransientState::new(&params);
        let mut rng = StdRng::seed_from_u64(7);

        let mut prev = state.wear;
        for _ in 0..2000 {
            let slip = SlipVelocity {
                vx: rng.gen_range(0.0..40.0),
                vsx: rng.gen_range(-8.0..8.0),
                vsy: rng.gen_range(-4.0..4.0),
                gamma: 0.0,
            };
            let out = state.advance(&params, slip, rng.gen_range(0.001..0.05));
            assert!(out.wear >= prev);
            assert!((0.0..=1.0).contains(&out.wear));
            prev = out.wear;
        }
        assert_eq!(state.wear, 1.0);
    }

    #[test]
    fn temperature_never_drops_below_ambient() {
        let params = TireParams::default();
        let mut state = TransientState::new(&params);
        for _ in 0..1000 {
            state.advance(&params, SlipVelocity { vx: 10.0, ..Default::default() }, 0.01);
        }
        assert_eq!(state.temperature, params.ambient_temperature);
    }

    #[test]
    fn sliding_heats_the_tire() {
        let params = TireParams {
            heating_coefficient: 0.1,
            ..TireParams::default()
        };
        let mut state = TransientState::new(&params);
        let slip = SlipVelocity { vx: 20.0, vsx: -6.0, vsy: 0.0, gamma: 0.0 };
        for _ in 0..100 {
            state.advance(&params, slip, 0.01);
        }
        assert!(state.temperature > params.initial_temperature);
    }

    #[test]
    fn deflection_relaxes_toward_steady_slip() {
        let params = TireParams::default();
        let mut state = TransientState::new(&params);
        // kappa = 0.05 held constant
        let slip = SlipVelocity { vx: 10.0, vsx: -0.5, vsy: 0.0, gamma: 0.0 };

        let mut last = state.advance(&params, slip, 0.01);
        assert!(last.kappa_prime > 0.0 && last.kappa_prime < 0.05);
        for _ in 0..500 {
            last = state.advance(&params, slip, 0.01);
        }
        assert!((last.kappa_prime - 0.05).abs() < 1e-4);
        assert_eq!(last.alpha_prime, 0.0);
    }

    #[test]
    fn reversing_keeps_deflection_bounded() {
        let params = TireParams::default();
        let mut state = TransientState::new(&params);
        // kappa = -0.05, alpha = atan(1 / 33) while rolling backwards
        let slip = SlipVelocity { vx: -33.0, vsx: 1.65, vsy: -1.0, gamma: 0.0 };

        let mut last = state.advance(&params, slip, 0.01);
        for _ in 0..600 {
            last = state.advance(&params, slip, 0.01);
            assert!(state.u.is_finite() && state.v.is_finite());
            assert!(last.kappa_prime.abs() <= 0.05 + 1e-9);
            assert!(last.alpha_prime.abs() <= 0.5);
        }
        assert!((last.kappa_prime + 0.05).abs() < 1e-6);
        assert!((last.alpha_prime - (1.0_f64 / 33.0).atan()).abs() < 1e-6);
    }

    #[test]
    fn transient_forces_build_up_with_deflection() {
        let params = TireParams::default();
        let model = MagicFormula::new(params.clone());
        let mut state = TransientState::new(&params);
        let slip = SlipVelocity { vx: 10.0, vsx: -0.5, vsy: 0.0, gamma: 0.0 };

        let first = model.transient_forces(3000.0, &state.advance(&params, slip, 0.01));
        let mut last = first;
        for _ in 0..500 {
            last = model.transient_forces(3000.0, &state.advance(&params, slip, 0.01));
        }
        let steady = model.steady_state(3000.0, 0.05, 0.0, 0.0, state.temperature);

        assert!(first.fx > 0.0 && first.fx < last.fx);
        assert!((last.fx - steady.fx).abs() / steady.fx < 0.01);
    }

    #[test]
    fn standstill_is_zero_slip() {
        let params = TireParams::default();
        let mut state = TransientState::new(&params);
        let out = state.advance(&params, SlipVelocity { vx: 0.0, vsx: 3.0, vsy: 1.0, gamma: 0.0 }, 0.01);
        assert_eq!(out.kappa_prime, 0.0);
        assert_eq!(out.alpha_prime, 0.0);
        assert_eq!(out.wear, 0.0);
    }

    #[test]
    fn reset_restores_initial_state() {
        let params = TireParams::default();
        let mut state = TransientState::new(&params);
        state.advance(&params, SlipVelocity { vx: 20.0, vsx: -4.0, vsy: 2.0, gamma: 0.0 }, 0.05);
        assert_ne!(state, TransientState::new(&params));
        state.reset(&params);
        assert_eq!(state, TransientState::new(&params));
    }
}
