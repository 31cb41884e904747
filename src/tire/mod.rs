//! tire - Magic Formula tire model (pure types, force curves, slip solver, allocation)

pub mod types;
pub mod params;
pub mod magic_formula;
pub mod longitudinal;
pub mod solve;
pub mod transient;
pub mod allocation;

pub use types::*;
pub use params::TireParams;
pub use magic_formula::{MagicFormula, TireForces};
pub use longitudinal::LongitudinalCapacity;
pub use solve::{InversionError, SlipSolution, invert_forces};
pub use transient::{SlipVelocity, TransientSlip};
pub use allocation::{AllocationRequest, AllocationResult, SlipSource, Tire, WheelState};
