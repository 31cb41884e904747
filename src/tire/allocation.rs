// ==============================================================================
// allocation.rs — PER-WHEEL FORCE ALLOCATION (MODE -> Fx, SMOOTHING, SLIP)
// ==============================================================================
// A Tire owns one MagicFormula, its transient state, wheel spin state and a
// cache of force->slip tables. allocate_forces() runs, in order:
//
// 1) Smooth the desired Fy toward last tick's realized Fy, saturated just
//    under the pure lateral peak so the pair stays invertible.
// 2) Estimate alpha for that Fy (table at Fx = 0).
// 3) Longitudinal capacity at the estimated alpha.
// 4) Mode -> desired Fx (capped by the drive limit when driving).
// 5) Smooth Fx the same way, then clamp |Fx| <= max_fx.
// 6) Slip for the smoothed pair: table -> direct inversion -> previous slip.
// 7) Recompute forces at that slip; realized Fx saturates at max_fx.
// 8) Wheel spin: omega += Fx * r / I * dt.
//
// A failed alpha estimate holds the previous slip angle and is reported as a
// Previous slip source, same as a failed slip inversion.
//
// Smoothing: alpha = min(1, smoothing_factor / dt), so a given smoothing
// factor behaves the same for any timestep.
// ==============================================================================

use serde::Serialize;
use tracing::warn;

use crate::error::{Result, SimError};
use crate::tire::longitudinal::{LongitudinalCapacity, resolve_desired_fx};
use crate::tire::magic_formula::MagicFormula;
use crate::tire::params::TireParams;
use crate::tire::solve::{SlipTableCache, invert_forces};
use crate::tire::transient::{SlipVelocity, TransientSlip, TransientState};
use crate::tire::types::{LongitudinalMode, Real};

/// Fraction of the pure lateral peak a smoothed Fy demand is held under.
pub const LATERAL_SATURATION: Real = 0.98;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct WheelState {
    pub angular_velocity: Real, // rad/s
    pub slip_ratio: Real,
    pub slip_angle: Real, // rad
    pub fz: Real,
    pub vx: Real,
    pub fx: Real,
    pub fy: Real,
    pub mz: Real,
    pub max_fx: Real,
    pub desired_fx: Real,
    pub desired_fy: Real,
    pub previous_fx: Real,
    pub previous_fy: Real,
}

#[derive(Debug, Clone, Copy)]
pub struct AllocationRequest {
    pub desired_fy: Real,    // N
    pub fz: Real,            // N
    pub vx: Real,            // m/s, wheel forward speed
    pub mode: LongitudinalMode,
    pub current_speed: Real, // m/s, vehicle speed for match_speed
    pub dt: Real,            // s
    pub drive_limit: Option<Real>, // N, tractive cap from the drivetrain
}

/// Where the slip pair of an allocation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlipSource {
    Table,
    Direct,
    Previous,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct AllocationResult {
    pub fx: Real,
    pub fy: Real,
    pub mz: Real,
    pub max_fx: Real,
    pub slip_ratio: Real,
    pub slip_angle: Real,
    pub capacity: LongitudinalCapacity,
    pub slip_source: SlipSource,
    pub alpha_source: SlipSource, // slip angle estimate feeding the capacity
}

impl AllocationResult {
    /// Whether either inversion fell back to the previous slip.
    pub fn fell_back(&self) -> bool {
        self.slip_source == SlipSource::Previous || self.alpha_source == SlipSource::Previous
    }
}

#[derive(Debug, Clone)]
pub struct Tire {
    model: MagicFormula,
    pub radius: Real,           // m
    pub inertia: Real,          // kg*m^2
    pub smoothing_factor: Real, // s
    state: WheelState,
    transient: TransientState,
    tables: SlipTableCache,
}

impl Tire {
    pub fn new(params: TireParams, radius: Real, inertia: Real, smoothing_factor: Real) -> Result<Self> {
        params.validate()?;
        if !(radius > 0.0) {
            return Err(SimError::config("tire", format!("radius must be positive, got {radius}")));
        }
        if !(inertia > 0.0) {
            return Err(SimError::config("tire", format!("inertia must be positive, got {inertia}")));
        }
        if !(smoothing_factor >= 0.0) {
            return Err(SimError::config(
                "tire",
                format!("smoothing factor must be non-negative, got {smoothing_factor}"),
            ));
        }

        let transient = TransientState::new(&params);
        Ok(Self {
            model: MagicFormula::new(params),
            radius,
            inertia,
            smoothing_factor,
            state: WheelState::default(),
            transient,
            tables: SlipTableCache::default(),
        })
    }

    pub fn model(&self) -> &MagicFormula {
        &self.model
    }

    pub fn state(&self) -> &WheelState {
        &self.state
    }

    pub fn transient(&self) -> &TransientState {
        &self.transient
    }

    pub fn temperature(&self) -> Real {
        self.transient.temperature
    }

    pub fn cached_tables(&self) -> usize {
        self.tables.len()
    }

    fn smooth(&self, desired: Real, previous: Real, dt: Real) -> Real {
        let alpha = if dt > 0.0 {
            (self.smoothing_factor / dt).min(1.0)
        } else {
            1.0
        };
        previous + alpha * (desired - previous)
    }

    fn table_slip(&mut self, fx: Real, fy: Real, fz: Real) -> Option<(Real, Real)> {
        let temperature = self.transient.temperature;
        let params = self.model.params();
        let table = self
            .tables
            .table(&self.model, &params.table, &params.solver, fz, temperature);

        // tables are built at the bucket's load/temperature: map the demand
        // onto the table's curve by the ratio of peak forces
        let sx = table.fx_range().1 / self.model.peak_longitudinal(fz, temperature).max(1.0);
        let sy = table.fy_range().1 / self.model.peak_lateral(fz, temperature).max(1.0);
        table.lookup(fx * sx, fy * sy)
    }

    /// Slip for a force pair: table, then direct inversion, then the last slip.
    fn resolve_slip(&mut self, fx: Real, fy: Real, fz: Real) -> (Real, Real, SlipSource) {
        if let Some((kappa, alpha)) = self.table_slip(fx, fy, fz) {
            return (kappa, alpha, SlipSource::Table);
        }

        let temperature = self.transient.temperature;
        match invert_forces(&self.model, &self.model.params().solver, fx, fy, fz, temperature) {
            Ok(sol) => (sol.kappa, sol.alpha, SlipSource::Direct),
            Err(e) => {
                warn!(fx, fy, fz, error = %e, "slip inversion failed, holding previous slip");
                (self.state.slip_ratio, self.state.slip_angle, SlipSource::Previous)
            }
        }
    }

    pub fn allocate_forces(&mut self, req: &AllocationRequest) -> AllocationResult {
        let temperature = self.transient.temperature;
        self.state.fz = req.fz;
        self.state.vx = req.vx;

        // --------------------------------------------------
        // Lateral demand + capacity at the implied slip angle
        // --------------------------------------------------
        self.state.desired_fy = req.desired_fy;
        let fy_limit = LATERAL_SATURATION * self.model.peak_lateral(req.fz, temperature);
        let smoothed_fy = self
            .smooth(req.desired_fy, self.state.previous_fy, req.dt)
            .clamp(-fy_limit, fy_limit);

        let (estimated_alpha, alpha_source) = match self.table_slip(0.0, smoothed_fy, req.fz) {
            Some((_, alpha)) => (alpha, SlipSource::Table),
            None => match invert_forces(
                &self.model,
                &self.model.params().solver,
                0.0,
                smoothed_fy,
                req.fz,
                temperature,
            ) {
                Ok(sol) => (sol.alpha, SlipSource::Direct),
                Err(e) => {
                    warn!(fy = smoothed_fy, fz = req.fz, error = %e, "slip angle estimate failed, holding previous angle");
                    (self.state.slip_angle, SlipSource::Previous)
                }
            },
        };

        let capacity = self.model.max_longitudinal(req.fz, estimated_alpha, temperature);
        let max_fx = capacity.max_fx.abs();
        self.state.max_fx = capacity.max_fx;

        // --------------------------------------------------
        // Longitudinal demand
        // --------------------------------------------------
        let desired_fx = resolve_desired_fx(&req.mode, max_fx, req.current_speed, req.drive_limit);
        self.state.desired_fx = desired_fx;

        let smoothed_fx = self
            .smooth(desired_fx, self.state.previous_fx, req.dt)
            .clamp(-max_fx, max_fx);

        // --------------------------------------------------
        // Slip + realized forces
        // --------------------------------------------------
        let (kappa, alpha, slip_source) = self.resolve_slip(smoothed_fx, smoothed_fy, req.fz);
        let forces = self.model.steady_state(req.fz, kappa, alpha, 0.0, temperature);
        let fx = forces.fx.clamp(-max_fx, max_fx);

        self.state.slip_ratio = kappa;
        self.state.slip_angle = alpha;
        self.state.fx = fx;
        self.state.fy = forces.fy;
        self.state.mz = forces.mz;

        // --- wheel spin ---
        let wheel_torque = fx * self.radius;
        self.state.angular_velocity += wheel_torque / self.inertia * req.dt;

        self.state.previous_fx = self.state.fx;
        self.state.previous_fy = self.state.fy;

        AllocationResult {
            fx,
            fy: forces.fy,
            mz: forces.mz,
            max_fx: capacity.max_fx,
            slip_ratio: kappa,
            slip_angle: alpha,
            capacity,
            slip_source,
            alpha_source,
        }
    }

    /// Advance carcass deflection, temperature and wear from contact kinematics.
    pub fn advance_transient(&mut self, slip: SlipVelocity, dt: Real) -> TransientSlip {
        self.transient.advance(self.model.params(), slip, dt)
    }

    pub fn reset_state(&mut self) {
        self.transient.reset(self.model.params());
        self.state = WheelState::default();
    }
}
