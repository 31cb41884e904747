// Shared fixtures for scenario tests.
#![allow(dead_code)]

use lapsim_physics::body::{DriveCommand, StepReport, VehicleBody};
use lapsim_physics::config::{FS_EV, SimConfig};
use lapsim_physics::motor::MotorConfig;
use lapsim_physics::tire::{LongitudinalMode, Real, TireParams};
use tracing::Span;

pub const WARM: Real = 85.0; // °C

pub struct Fixture {
    config: SimConfig,
}

impl Fixture {
    /// FS_EV with warm tires and no motor: traction is tire-limited.
    pub fn fs_ev() -> Self {
        Self {
            config: SimConfig {
                vehicle: FS_EV,
                tire: TireParams {
                    initial_temperature: WARM,
                    ..TireParams::default()
                },
                motor: None,
                ..SimConfig::default()
            },
        }
    }

    pub fn with_motor(mut self, motor: MotorConfig) -> Self {
        self.config.motor = Some(motor);
        self
    }

    pub fn with_compliance(mut self) -> Self {
        self.config.vehicle.carcass_compliance = true;
        self
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn build(&self) -> VehicleBody {
        VehicleBody::from_config(&self.config, Span::none()).expect("fixture config is valid")
    }

    pub fn initialized(&self) -> VehicleBody {
        let mut body = self.build();
        body.initialize().expect("initialize");
        body
    }
}

pub fn command(mode: LongitudinalMode, lateral_demand: Real) -> DriveCommand {
    DriveCommand { mode, lateral_demand }
}

pub fn drive(body: &mut VehicleBody, cmd: &DriveCommand, steps: usize) -> Vec<StepReport> {
    (0..steps).map(|_| body.step(cmd).expect("step")).collect()
}

pub fn mean(values: impl IntoIterator<Item = Real>) -> Real {
    let (sum, n) = values.into_iter().fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    sum / n.max(1) as Real
}
