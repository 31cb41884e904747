// ==============================================================================
// magic_formula.rs — STEADY-STATE TIRE FORCES (SIMPLIFIED PACEJKA)
// ==============================================================================
// Pure slip:
//     F = D * sin(C * atan(B*s - E*(B*s - atan(B*s))))
// with s = kappa for Fx0 and s = alpha for Fy0. B, C, D, E come from the shape,
// peak and curvature coefficients, the normalized load dfz = (Fz - Fz0)/Fz0 and
// the temperature grip multiplier. Fy0 adds a camber thrust term ~ gamma * Fz.
//
// Combined slip is a cosine de-rating of each pure force by the other slip:
//     Fx = Fx0 * cos(rBx * |alpha|)
//     Fy = Fy0 * cos(rBy * |kappa|)
// This approximates the friction-ellipse coupling; it does not enforce
// Fx^2 + Fy^2 <= (mu*Fz)^2. The coupling argument is capped at pi/2 so a large
// slip never flips the sign of the other channel.
//
// Moments are small linear terms (pneumatic trail, rolling resistance arm,
// camber overturning) returned alongside Fx/Fy.
// ==============================================================================

use std::f64::consts::FRAC_PI_2;

use serde::Serialize;

use crate::tire::params::TireParams;
use crate::tire::types::Real;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TireForces {
    pub fx: Real, // N
    pub fy: Real, // N
    pub fz: Real, // N
    pub mx: Real, // N*m, overturning
    pub my: Real, // N*m, rolling resistance
    pub mz: Real, // N*m, self-aligning
}

#[derive(Debug, Clone)]
pub struct MagicFormula {
    params: TireParams,
}

#[inline]
fn magic_formula(b: Real, c: Real, d: Real, e: Real, s: Real) -> Real {
    let bs = b * s;
    d * (c * (bs - e * (bs - bs.atan())).atan()).sin()
}

#[inline]
fn cosine_derate(coefficient: Real, other_slip: Real) -> Real {
    (coefficient * other_slip.abs()).min(FRAC_PI_2).cos()
}

impl MagicFormula {
    pub fn new(params: TireParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &TireParams {
        &self.params
    }

    /// Bell-curve grip multiplier around the optimal temperature, in [0.5, 1.0].
    pub fn temperature_factor(&self, temperature: Real) -> Real {
        let p = &self.params;
        let dt = temperature - p.temp_opt;
        let effect = 1.0 - p.grip_temp_factor * (dt * dt) / (p.temp_range * p.temp_range);
        effect.clamp(0.5, 1.0)
    }

    pub fn normalized_load(&self, fz: Real) -> Real {
        (fz - self.params.f_z0) / self.params.f_z0
    }

    /// Longitudinal peak factor D at this load and temperature.
    pub fn peak_longitudinal(&self, fz: Real, temperature: Real) -> Real {
        if fz <= 0.0 {
            return 0.0;
        }
        let p = &self.params;
        let dfz = self.normalized_load(fz);
        p.p_dx1 * fz * (1.0 + p.p_dx2 * dfz) * p.lambda_mux * self.temperature_factor(temperature)
    }

    /// Lateral peak factor D at this load and temperature (no camber).
    pub fn peak_lateral(&self, fz: Real, temperature: Real) -> Real {
        if fz <= 0.0 {
            return 0.0;
        }
        let p = &self.params;
        let dfz = self.normalized_load(fz);
        p.p_dy1.abs() * fz * (1.0 + p.p_dy2 * dfz) * p.lambda_muy * self.temperature_factor(temperature)
    }

    /// Pure longitudinal force Fx0.
    pub fn pure_longitudinal(&self, fz: Real, kappa: Real, temperature: Real) -> Real {
        if fz <= 0.0 {
            return 0.0;
        }
        let p = &self.params;
        let dfz = self.normalized_load(fz);

        let b = p.p_kx1 * (1.0 + p.p_kx2 * dfz) * fz / (p.p_cx1 * p.p_dx1 * fz);
        let c = p.p_cx1;
        let d = self.peak_longitudinal(fz, temperature);
        let e = p.p_ex1;

        magic_formula(b, c, d, e, kappa)
    }

    /// Pure lateral force Fy0, including camber thrust.
    pub fn pure_lateral(&self, fz: Real, alpha: Real, gamma: Real, temperature: Real) -> Real {
        if fz <= 0.0 {
            return 0.0;
        }
        let p = &self.params;

        // p_dy1 < 0 makes B negative: positive alpha gives negative Fy
        let b = p.p_ky1 * fz / (p.p_cy1 * p.p_dy1 * fz * p.p_ky2);
        let c = p.p_cy1;
        let d = self.peak_lateral(fz, temperature);
        let e = p.p_ey1;

        magic_formula(b, c, d, e, alpha) + p.camber_thrust * gamma * fz
    }

    pub fn combined_longitudinal(&self, alpha: Real, fx0: Real) -> Real {
        fx0 * cosine_derate(self.params.r_bx1, alpha)
    }

    pub fn combined_lateral(&self, kappa: Real, fy0: Real) -> Real {
        fy0 * cosine_derate(self.params.r_by1, kappa)
    }

    pub fn steady_state(
        &self,
        fz: Real,
        kappa: Real,
        alpha: Real,
        gamma: Real,
        temperature: Real,
    ) -> TireForces {
        if fz <= 0.0 {
            return TireForces::default();
        }
        let p = &self.params;

        let fx0 = self.pure_longitudinal(fz, kappa, temperature);
        let fy0 = self.pure_lateral(fz, alpha, gamma, temperature);

        let fx = self.combined_longitudinal(alpha, fx0);
        let fy = self.combined_lateral(kappa, fy0);

        TireForces {
            fx,
            fy,
            fz,
            mx: 0.01 * fz * gamma,
            my: -0.01 * fz * p.r_e,
            mz: -0.05 * fy * p.r_0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> MagicFormula {
        MagicFormula::new(TireParams::default())
    }

    #[test]
    fn zero_slip_gives_zero_force() {
        let mf = model();
        for fz in [500.0, 4000.0, 9000.0] {
            assert_eq!(mf.pure_longitudinal(fz, 0.0, 85.0), 0.0);
            assert_eq!(mf.pure_lateral(fz, 0.0, 0.0, 85.0), 0.0);
            let f = mf.steady_state(fz, 0.0, 0.0, 0.0, 85.0);
            assert_eq!(f.fx, 0.0);
            assert_eq!(f.fy, 0.0);
        }
    }

    #[test]
    fn temperature_factor_peaks_at_optimum() {
        let mf = model();
        let opt = mf.params().temp_opt;
        assert_eq!(mf.temperature_factor(opt), 1.0);

        let mut prev_hot = 1.0;
        let mut prev_cold = 1.0;
        for step in 1..=5 {
            let d = step as Real * 5.0;
            let hot = mf.temperature_factor(opt + d);
            let cold = mf.temperature_factor(opt - d);
            assert!(hot < prev_hot, "hot side must strictly decrease");
            assert!(cold < prev_cold, "cold side must strictly decrease");
            assert!((hot - cold).abs() < 1e-12);
            prev_hot = hot;
            prev_cold = cold;
        }

        assert_eq!(mf.temperature_factor(opt + 500.0), 0.5);
        assert_eq!(mf.temperature_factor(-200.0), 0.5);
    }

    #[test]
    fn longitudinal_force_follows_slip_sign() {
        let mf = model();
        let drive = mf.pure_longitudinal(4000.0, 0.08, 85.0);
        let brake = mf.pure_longitudinal(4000.0, -0.08, 85.0);
        assert!(drive > 0.0);
        assert!((drive + brake).abs() < 1e-9);
    }

    #[test]
    fn lateral_force_opposes_slip_angle() {
        let mf = model();
        assert!(mf.pure_lateral(4000.0, 0.05, 0.0, 85.0) < 0.0);
        assert!(mf.pure_lateral(4000.0, -0.05, 0.0, 85.0) > 0.0);
    }

    #[test]
    fn camber_adds_thrust() {
        let mf = model();
        let thrust = mf.pure_lateral(4000.0, 0.0, 0.02, 85.0);
        assert!((thrust - 0.1 * 0.02 * 4000.0).abs() < 1e-9);
    }

    #[test]
    fn combined_slip_derates_but_never_flips() {
        let mf = model();
        let pure = mf.steady_state(4000.0, 0.1, 0.0, 0.0, 85.0).fx;
        let combined = mf.steady_state(4000.0, 0.1, 0.05, 0.0, 85.0).fx;
        assert!(combined < pure && combined > 0.0);

        let saturated = mf.steady_state(4000.0, 0.1, 0.4, 0.0, 85.0).fx;
        assert!(saturated >= 0.0 && saturated < 1e-6 * pure.abs().max(1.0) + 1e-9);
    }

    #[test]
    fn non_positive_load_is_inert() {
        let mf = model();
        assert_eq!(mf.steady_state(0.0, 0.2, 0.1, 0.0, 85.0), TireForces::default());
        assert_eq!(mf.steady_state(-100.0, 0.2, 0.1, 0.0, 85.0), TireForces::default());
    }

    #[test]
    fn moments_are_linear_side_terms() {
        let mf = model();
        let f = mf.steady_state(4000.0, 0.0, 0.05, 0.0, 85.0);
        assert!((f.mz + 0.05 * f.fy * 0.330).abs() < 1e-9);
        assert!((f.my + 0.01 * 4000.0 * 0.315).abs() < 1e-9);
        assert_eq!(f.mx, 0.0);
    }
}
