// ==============================================================================
// params.rs — STATIC TIRE PARAMETERS
// ------------------------------------------------------------------------------
// Simplified Magic Formula coefficient set for a racing slick, plus the thermal,
// wear and grip-scaling constants and the numeric settings for the force->slip
// solver and its lookup tables. Defaults are a Hoosier-like race tire.
// ==============================================================================

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::tire::types::Real;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TireParams {
    // --- dimensions ---
    pub r_0: Real,   // unloaded radius [m]
    pub r_e: Real,   // effective rolling radius [m]
    pub f_z0: Real,  // nominal load [N]
    pub v_0: Real,   // reference velocity [m/s]

    // --- carcass stiffness (relaxation lengths derive from their ratio) ---
    pub c_fx: Real,  // longitudinal [N]
    pub c_fy: Real,  // lateral [N]

    // --- longitudinal ---
    pub p_cx1: Real, // shape
    pub p_dx1: Real, // peak
    pub p_dx2: Real, // load dependency of peak
    pub p_ex1: Real, // curvature
    pub p_kx1: Real, // slip stiffness
    pub p_kx2: Real, // load dependency of slip stiffness

    // --- lateral ---
    pub p_cy1: Real,
    pub p_dy1: Real,
    pub p_dy2: Real,
    pub p_ey1: Real,
    pub p_ky1: Real, // cornering stiffness
    pub p_ky2: Real, // load at which cornering stiffness peaks
    pub camber_thrust: Real, // Fy per (rad * N)

    // --- combined slip (cosine de-rating) ---
    pub r_bx1: Real,
    pub r_by1: Real,

    // --- thermal ---
    pub temp_opt: Real,           // [°C]
    pub temp_range: Real,         // [°C]
    pub grip_temp_factor: Real,   // grip lost at one temp_range away
    pub ambient_temperature: Real,// [°C], cooling floor
    pub initial_temperature: Real,// [°C]
    pub heating_coefficient: Real,// °C per unit slip work
    pub cooling_rate: Real,       // °C/s

    // --- wear ---
    pub wear_constant: Real,
    pub wear_exponent: Real,

    // --- grip scaling ---
    pub lambda_mux: Real,
    pub lambda_muy: Real,

    pub table: SlipTableConfig,
    pub solver: SolverConfig,
}

impl Default for TireParams {
    fn default() -> Self {
        Self {
            r_0: 0.330,
            r_e: 0.315,
            f_z0: 4500.0,
            v_0: 30.0,

            c_fx: 500_000.0,
            c_fy: 180_000.0,

            p_cx1: 1.65,
            p_dx1: 1.35,
            p_dx2: -0.1,
            p_ex1: 0.5,
            p_kx1: 25.0,
            p_kx2: -0.2,

            p_cy1: 1.3,
            p_dy1: -1.1,
            p_dy2: -0.1,
            p_ey1: -0.8,
            p_ky1: 20.0,
            p_ky2: 1.5,
            camber_thrust: 0.1,

            r_bx1: 12.0,
            r_by1: 10.0,

            temp_opt: 85.0,
            temp_range: 30.0,
            grip_temp_factor: 0.2,
            ambient_temperature: 20.0,
            initial_temperature: 20.0,
            heating_coefficient: 0.001,
            cooling_rate: 0.1,

            wear_constant: 0.0001,
            wear_exponent: 2.0,

            lambda_mux: 1.2,
            lambda_muy: 1.2,

            table: SlipTableConfig::default(),
            solver: SolverConfig::default(),
        }
    }
}

impl TireParams {
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("f_z0", self.f_z0),
            ("c_fx", self.c_fx),
            ("c_fy", self.c_fy),
            ("temp_range", self.temp_range),
            ("r_0", self.r_0),
            ("r_e", self.r_e),
        ];
        for (name, value) in positive {
            if !(value > 0.0) {
                return Err(SimError::config("tire", format!("{name} must be positive, got {value}")));
            }
        }

        // B divides by these
        let nonzero = [
            ("p_cx1", self.p_cx1),
            ("p_dx1", self.p_dx1),
            ("p_cy1", self.p_cy1),
            ("p_dy1", self.p_dy1),
            ("p_ky2", self.p_ky2),
        ];
        for (name, value) in nonzero {
            if value == 0.0 || !value.is_finite() {
                return Err(SimError::config("tire", format!("{name} must be finite and non-zero")));
            }
        }

        if self.wear_constant < 0.0 || self.wear_exponent < 0.0 {
            return Err(SimError::config("tire", "wear constants must be non-negative"));
        }
        if self.initial_temperature < self.ambient_temperature {
            return Err(SimError::config(
                "tire",
                "initial_temperature is below ambient_temperature",
            ));
        }

        self.table.validate()?;
        self.solver.validate()
    }
}

/// Force->slip lookup table layout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlipTableConfig {
    pub grid_points: usize,       // per axis
    pub load_bucket: Real,        // N
    pub temperature_bucket: Real, // °C
}

impl Default for SlipTableConfig {
    fn default() -> Self {
        Self {
            grid_points: 21,
            load_bucket: 250.0,
            temperature_bucket: 10.0,
        }
    }
}

impl SlipTableConfig {
    fn validate(&self) -> Result<()> {
        if self.grid_points < 2 {
            return Err(SimError::config("tire.table", "grid_points must be at least 2"));
        }
        if !(self.load_bucket > 0.0) || !(self.temperature_bucket > 0.0) {
            return Err(SimError::config("tire.table", "bucket widths must be positive"));
        }
        Ok(())
    }
}

/// Iteration budgets for the force->slip inversion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub newton_iterations: usize,
    pub fallback_iterations: usize,
    pub tolerance: Real, // N, per force component
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            newton_iterations: 50,
            fallback_iterations: 200,
            tolerance: 1.0,
        }
    }
}

impl SolverConfig {
    fn validate(&self) -> Result<()> {
        if self.newton_iterations == 0 && self.fallback_iterations == 0 {
            return Err(SimError::config("tire.solver", "iteration budget is empty"));
        }
        if !(self.tolerance > 0.0) {
            return Err(SimError::config("tire.solver", "tolerance must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(TireParams::default().validate().is_ok());
    }

    #[test]
    fn zero_peak_factor_is_rejected() {
        let params = TireParams { p_dx1: 0.0, ..TireParams::default() };
        assert!(matches!(params.validate(), Err(SimError::Config { .. })));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let params: TireParams = toml::from_str("temp_opt = 90.0\n[solver]\ntolerance = 0.5\n").unwrap();
        assert_eq!(params.temp_opt, 90.0);
        assert_eq!(params.solver.tolerance, 0.5);
        assert_eq!(params.solver.newton_iterations, 50);
        assert_eq!(params.f_z0, 4500.0);
    }
}
