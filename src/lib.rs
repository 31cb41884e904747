//! lapsim_physics - tire forces, load transfer and planar integration for lap / acceleration runs

pub mod tire;
pub mod series;
pub mod contact;
pub mod load_transfer;
pub mod motor;
pub mod config;
pub mod body;
pub mod sim;
pub mod export;
pub mod error;

pub use body::{BodyPhase, DriveCommand, Kinematics, StepReport, VehicleBody};
pub use config::{FS_EV, RunConfig, SimConfig, VehicleConfig};
pub use contact::{ContactPoint, ForceChannel};
pub use error::{Result, SimError};
pub use sim::{RunSummary, run, run_scenario};
pub use tire::{LongitudinalMode, Real, Tick, TireParams, WheelId};
