// ==============================================================================
// config.rs — SIMULATION CONFIGURATION (TOML)
// ------------------------------------------------------------------------------
// SimConfig
// - vehicle: mass + planar geometry, tire mounting, timestep/lag, resistances
// - tire:    Magic Formula parameter set (tire::params)
// - motor:   optional torque source; omitted section -> Emrax 208
// - run:     driving directive and stop conditions
//
// Every section is #[serde(default)]: a TOML file only lists what it changes.
// validate() rejects anything that would make the physics ill-defined; it is
// run by from_path() and again by VehicleBody::new().
// ==============================================================================

use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::load_transfer::LoadGeometry;
use crate::motor::MotorConfig;
use crate::tire::params::TireParams;
use crate::tire::types::{LongitudinalMode, Real, Tick};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleConfig {
    pub name: Cow<'static, str>,
    pub mass: Real,           // kg
    pub dist_f: Real,         // m, CG -> front axle
    pub dist_r: Real,         // m, CG -> rear axle
    pub wheelbase: Real,      // m
    pub h_cog: Real,          // m
    pub track_width: Real,    // m

    // --- wheels ---
    pub tire_radius: Real,      // m
    pub tire_inertia: Real,     // kg*m^2
    pub smoothing_factor: Real, // s, force smoothing per tick is min(1, s/dt)

    // --- stepping ---
    pub timestep: Real,  // s
    pub force_lag: Real, // s, tire force -> load transfer delay

    // --- resistances ---
    pub crr: Real,              // rolling resistance coefficient
    pub drag_coefficient: Real,
    pub frontal_area: Real,     // m^2
    pub air_density: Real,      // kg/m^3

    // --- drivetrain ---
    pub gear_ratio: Real,

    pub carcass_compliance: bool, // advance transient slip every tick
}

/// Electric formula-student car: 280 kg with driver, rear-biased, rear drive.
pub const FS_EV: VehicleConfig = VehicleConfig {
    name: Cow::Borrowed("fs_ev"),
    mass: 280.0,
    dist_f: 0.9,
    dist_r: 0.7,
    wheelbase: 1.6,
    h_cog: 0.3,
    track_width: 1.2,

    tire_radius: 0.33,
    tire_inertia: 1.5,
    smoothing_factor: 0.2,

    timestep: 0.01,
    force_lag: 0.05,

    crr: 0.015,
    drag_coefficient: 1.2,
    frontal_area: 1.1,
    air_density: 1.225,

    gear_ratio: 4.0,

    carcass_compliance: false,
};

impl Default for VehicleConfig {
    fn default() -> Self {
        FS_EV
    }
}

fn positive(component: &str, field: &str, value: Real) -> Result<()> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(SimError::config(component, format!("{field} must be positive, got {value}")))
    }
}

impl VehicleConfig {
    pub fn validate(&self) -> Result<()> {
        let c = self.name.as_ref();
        positive(c, "mass", self.mass)?;
        positive(c, "dist_f", self.dist_f)?;
        positive(c, "dist_r", self.dist_r)?;
        positive(c, "wheelbase", self.wheelbase)?;
        positive(c, "h_cog", self.h_cog)?;
        positive(c, "track_width", self.track_width)?;
        positive(c, "tire_radius", self.tire_radius)?;
        positive(c, "tire_inertia", self.tire_inertia)?;
        positive(c, "timestep", self.timestep)?;
        positive(c, "gear_ratio", self.gear_ratio)?;

        if ((self.dist_f + self.dist_r) - self.wheelbase).abs() > 1e-6 {
            return Err(SimError::config(
                c,
                format!(
                    "dist_f + dist_r ({}) does not match wheelbase ({})",
                    self.dist_f + self.dist_r,
                    self.wheelbase
                ),
            ));
        }
        for (field, value) in [
            ("smoothing_factor", self.smoothing_factor),
            ("crr", self.crr),
            ("drag_coefficient", self.drag_coefficient),
            ("frontal_area", self.frontal_area),
            ("air_density", self.air_density),
        ] {
            if !(value >= 0.0) {
                return Err(SimError::config(c, format!("{field} must be non-negative, got {value}")));
            }
        }

        self.lag_ticks()?;
        Ok(())
    }

    /// Force lag as a whole number of ticks (at least one).
    pub fn lag_ticks(&self) -> Result<Tick> {
        let ratio = self.force_lag / self.timestep;
        let ticks = ratio.round();
        if !ratio.is_finite() || ticks < 1.0 || (ratio - ticks).abs() > 1e-6 {
            return Err(SimError::config(
                self.name.as_ref(),
                format!(
                    "force_lag ({}) must be a positive whole multiple of timestep ({})",
                    self.force_lag, self.timestep
                ),
            ));
        }
        Ok(ticks as Tick)
    }

    pub fn geometry(&self) -> LoadGeometry {
        LoadGeometry {
            mass: self.mass,
            dist_f: self.dist_f,
            dist_r: self.dist_r,
            wheelbase: self.wheelbase,
            h_cog: self.h_cog,
            track_width: self.track_width,
        }
    }

    /// Planar yaw inertia of a uniform wheelbase x track plate.
    pub fn yaw_inertia(&self) -> Real {
        self.mass * (self.wheelbase * self.wheelbase + self.track_width * self.track_width) / 12.0
    }
}

// ====================================================================
// Run directive
// ====================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub mode: LongitudinalMode,
    pub lateral_demand: Real, // N, total across the driven axle
    pub max_distance: Real,   // m
    pub max_time: Real,       // s
    pub export_csv: Option<PathBuf>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            mode: LongitudinalMode::Accelerate,
            lateral_demand: 0.0,
            max_distance: 75.0, // acceleration event
            max_time: 10.0,
            export_csv: None,
        }
    }
}

impl RunConfig {
    pub fn validate(&self) -> Result<()> {
        positive("run", "max_distance", self.max_distance)?;
        positive("run", "max_time", self.max_time)?;
        if let LongitudinalMode::MatchSpeed { speed_buffer, .. } = self.mode {
            if !(speed_buffer >= 0.0) {
                return Err(SimError::config("run", "match_speed buffer must be non-negative"));
            }
        }
        Ok(())
    }
}

// ====================================================================
// Top level
// ====================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub vehicle: VehicleConfig,
    pub tire: TireParams,
    pub motor: Option<MotorConfig>,
    pub run: RunConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            vehicle: FS_EV,
            tire: TireParams::default(),
            motor: Some(MotorConfig::emrax_208()),
            run: RunConfig::default(),
        }
    }
}

impl SimConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: SimConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        self.vehicle.validate()?;
        self.tire.validate()?;
        if let Some(motor) = &self.motor {
            motor.build()?;
        }
        self.run.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preset_is_valid() {
        SimConfig::default().validate().unwrap();
        assert_eq!(FS_EV.lag_ticks().unwrap(), 5);
    }

    #[test]
    fn axle_distances_must_sum_to_wheelbase() {
        let cfg = VehicleConfig { dist_f: 1.0, ..FS_EV };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("wheelbase"), "{err}");
    }

    #[test]
    fn lag_must_be_whole_ticks() {
        assert!(VehicleConfig { force_lag: 0.025, timestep: 0.01, ..FS_EV }.lag_ticks().is_err());
        assert!(VehicleConfig { force_lag: 0.0, ..FS_EV }.lag_ticks().is_err());
        assert_eq!(VehicleConfig { force_lag: 0.05, timestep: 0.05, ..FS_EV }.lag_ticks().unwrap(), 1);
    }

    #[test]
    fn non_positive_geometry_is_rejected() {
        assert!(VehicleConfig { mass: 0.0, ..FS_EV }.validate().is_err());
        assert!(VehicleConfig { tire_radius: -0.3, ..FS_EV }.validate().is_err());
        assert!(VehicleConfig { timestep: 0.0, ..FS_EV }.validate().is_err());
    }

    #[test]
    fn toml_overrides_only_what_it_lists() {
        let cfg = SimConfig::from_toml_str(
            r#"
            [vehicle]
            name = "heavy"
            mass = 320.0

            [tire]
            lambda_mux = 1.0

            [run]
            max_distance = 40.0
            mode = { kind = "match_speed", target_speed = 15.0, speed_buffer = 1.0 }
            "#,
        )
        .unwrap();

        assert_eq!(cfg.vehicle.name, "heavy");
        assert_eq!(cfg.vehicle.mass, 320.0);
        assert_eq!(cfg.vehicle.wheelbase, FS_EV.wheelbase);
        assert_eq!(cfg.tire.lambda_mux, 1.0);
        assert_eq!(cfg.tire.lambda_muy, 1.2);
        assert_eq!(cfg.run.max_distance, 40.0);
        assert!(matches!(cfg.run.mode, LongitudinalMode::MatchSpeed { .. }));
        assert!(cfg.motor.is_some());
    }

    #[test]
    fn invalid_toml_is_a_parse_error() {
        let err = SimConfig::from_toml_str("[vehicle]\nmass = \"heavy\"").unwrap_err();
        assert!(matches!(err, SimError::Toml(_)));
    }

    #[test]
    fn yaw_inertia_uses_planar_plate() {
        let expected = 280.0 * (1.6 * 1.6 + 1.2 * 1.2) / 12.0;
        assert!((FS_EV.yaw_inertia() - expected).abs() < 1e-9);
    }
}
