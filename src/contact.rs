// ==============================================================================
// contact.rs — CONTACT POINTS (TIRE PATCHES + CENTER OF GRAVITY)
// ==============================================================================
// A ContactPoint is a named location in the vehicle frame (x fwd, y left, z up;
// origin at the rear-axle midpoint on the ground) with a declared set of force
// channels, each acting along one axis.
//
// Tire points:  vertical_load (z), x_friction (x), y_friction (y),
//               rolling_resistance (x) + an owned Tire and its history
// CG point:     vertical_load (z), longitudinal_load (x), lateral_load (y)
//
// Completeness:
// - Every declared channel must hold a value at a tick before that tick's
//   resultant is computed. total_force() refuses to sum a gap as zero; it
//   returns SimError::MissingForce naming the unset channels.
// ==============================================================================

use std::fmt;

use nalgebra::Vector3;
use serde::Serialize;

use crate::error::{Result, SimError};
use crate::series::{Record, TimeSeries, TireRecord};
use crate::tire::allocation::{AllocationRequest, AllocationResult, Tire};
use crate::tire::transient::{SlipVelocity, TransientSlip};
use crate::tire::types::{Axis, Real, Tick};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ForceChannel {
    VerticalLoad,
    XFriction,
    YFriction,
    RollingResistance,
    LongitudinalLoad,
    LateralLoad,
}

impl ForceChannel {
    pub const COUNT: usize = 6;
    pub const ALL: [ForceChannel; Self::COUNT] = [
        ForceChannel::VerticalLoad,
        ForceChannel::XFriction,
        ForceChannel::YFriction,
        ForceChannel::RollingResistance,
        ForceChannel::LongitudinalLoad,
        ForceChannel::LateralLoad,
    ];
    const NAMES: [&'static str; Self::COUNT] = [
        "vertical_load",
        "x_friction",
        "y_friction",
        "rolling_resistance",
        "longitudinal_load",
        "lateral_load",
    ];

    pub fn index(&self) -> usize {
        match self {
            ForceChannel::VerticalLoad => 0,
            ForceChannel::XFriction => 1,
            ForceChannel::YFriction => 2,
            ForceChannel::RollingResistance => 3,
            ForceChannel::LongitudinalLoad => 4,
            ForceChannel::LateralLoad => 5,
        }
    }

    pub fn as_str(&self) -> &'static str {
        Self::NAMES[self.index()]
    }
}

impl fmt::Display for ForceChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const TIRE_CHANNELS: [(ForceChannel, Axis); 4] = [
    (ForceChannel::VerticalLoad, Axis::Z),
    (ForceChannel::XFriction, Axis::X),
    (ForceChannel::YFriction, Axis::Y),
    (ForceChannel::RollingResistance, Axis::X),
];

pub const CG_CHANNELS: [(ForceChannel, Axis); 3] = [
    (ForceChannel::VerticalLoad, Axis::Z),
    (ForceChannel::LongitudinalLoad, Axis::X),
    (ForceChannel::LateralLoad, Axis::Y),
];

// ====================================================================
// Force record (one slot per channel)
// ====================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ForceRecord {
    slots: [Option<Real>; ForceChannel::COUNT],
}

impl ForceRecord {
    pub fn with(mut self, channel: ForceChannel, value: Real) -> Self {
        self.slots[channel.index()] = Some(value);
        self
    }

    pub fn channel(&self, channel: ForceChannel) -> Option<Real> {
        self.slots[channel.index()]
    }
}

impl Record for ForceRecord {
    const FIELDS: &'static [&'static str] = &ForceChannel::NAMES;

    fn zeroed() -> Self {
        Self { slots: [Some(0.0); ForceChannel::COUNT] }
    }

    fn merge(&mut self, partial: &Self) {
        for (slot, new) in self.slots.iter_mut().zip(partial.slots) {
            if new.is_some() {
                *slot = new;
            }
        }
    }

    fn values(&self) -> Vec<Option<Real>> {
        self.slots.to_vec()
    }
}

// ====================================================================
// Contact point
// ====================================================================

#[derive(Debug, Clone)]
pub struct ContactPoint {
    pub name: String,
    pub location: Vector3<Real>, // m, vehicle frame
    channels: Vec<(ForceChannel, Axis)>,
    forces: TimeSeries<ForceRecord>,
    tire: Option<Tire>,
    tire_history: TimeSeries<TireRecord>,
}

impl ContactPoint {
    pub fn new(
        name: impl Into<String>,
        location: Vector3<Real>,
        channels: &[(ForceChannel, Axis)],
        tire: Option<Tire>,
    ) -> Self {
        Self {
            name: name.into(),
            location,
            channels: channels.to_vec(),
            forces: TimeSeries::new(),
            tire,
            tire_history: TimeSeries::new(),
        }
    }

    pub fn tire_point(name: impl Into<String>, location: Vector3<Real>, tire: Tire) -> Self {
        Self::new(name, location, &TIRE_CHANNELS, Some(tire))
    }

    pub fn cg_point(name: impl Into<String>, location: Vector3<Real>) -> Self {
        Self::new(name, location, &CG_CHANNELS, None)
    }

    pub fn channels(&self) -> &[(ForceChannel, Axis)] {
        &self.channels
    }

    pub fn declares(&self, channel: ForceChannel) -> bool {
        self.channels.iter().any(|(c, _)| *c == channel)
    }

    pub fn forces(&self) -> &TimeSeries<ForceRecord> {
        &self.forces
    }

    pub fn record(&mut self, tick: Tick, values: &[(ForceChannel, Real)]) -> Result<()> {
        let mut partial = ForceRecord::default();
        for &(channel, value) in values {
            if !self.declares(channel) {
                return Err(SimError::UndeclaredChannel {
                    point: self.name.clone(),
                    channel,
                });
            }
            partial = partial.with(channel, value);
        }
        self.forces.update(tick, partial);
        Ok(())
    }

    pub fn force(&self, channel: ForceChannel, tick: Tick) -> Option<Real> {
        self.forces.get(tick)?.channel(channel)
    }

    pub fn missing_channels(&self, tick: Tick) -> Vec<ForceChannel> {
        self.channels
            .iter()
            .map(|(c, _)| *c)
            .filter(|c| self.force(*c, tick).is_none())
            .collect()
    }

    pub fn forces_incomplete(&self, tick: Tick) -> bool {
        !self.missing_channels(tick).is_empty()
    }

    fn missing_error(&self, tick: Tick, missing: Vec<ForceChannel>) -> SimError {
        SimError::MissingForce {
            point: self.name.clone(),
            tick,
            missing,
        }
    }

    /// Sum of every declared channel acting along `axis`.
    pub fn total_force(&self, axis: Axis, tick: Tick) -> Result<Real> {
        let mut total = 0.0;
        let mut missing = Vec::new();
        for &(channel, a) in &self.channels {
            if a != axis {
                continue;
            }
            match self.force(channel, tick) {
                Some(v) => total += v,
                None => missing.push(channel),
            }
        }
        if missing.is_empty() {
            Ok(total)
        } else {
            Err(self.missing_error(tick, missing))
        }
    }

    pub fn force_vector(&self, tick: Tick) -> Result<Vector3<Real>> {
        let missing = self.missing_channels(tick);
        if !missing.is_empty() {
            return Err(self.missing_error(tick, missing));
        }
        Ok(Vector3::new(
            self.total_force(Axis::X, tick)?,
            self.total_force(Axis::Y, tick)?,
            self.total_force(Axis::Z, tick)?,
        ))
    }

    // -------------------------
    // Tire access
    // -------------------------

    pub fn is_tire(&self) -> bool {
        self.tire.is_some()
    }

    pub fn tire(&self) -> Result<&Tire> {
        self.tire.as_ref().ok_or_else(|| SimError::NotATire { point: self.name.clone() })
    }

    pub fn tire_mut(&mut self) -> Result<&mut Tire> {
        let name = &self.name;
        self.tire.as_mut().ok_or_else(|| SimError::NotATire { point: name.clone() })
    }

    pub fn tire_history(&self) -> &TimeSeries<TireRecord> {
        &self.tire_history
    }

    /// Runs the tire's force allocation and records friction + tire state.
    pub fn allocate(&mut self, tick: Tick, request: &AllocationRequest) -> Result<AllocationResult> {
        let tire = self.tire_mut()?;
        let out = tire.allocate_forces(request);
        let state = *tire.state();
        let transient = tire.transient().clone();

        self.record(
            tick,
            &[
                (ForceChannel::XFriction, out.fx),
                (ForceChannel::YFriction, out.fy),
            ],
        )?;

        self.tire_history.update(
            tick,
            TireRecord {
                vertical_load: Some(request.fz),
                vx: Some(request.vx),
                fx: Some(out.fx),
                fy: Some(out.fy),
                mz: Some(out.mz),
                max_fx: Some(out.max_fx),
                desired_fx: Some(state.desired_fx),
                desired_fy: Some(state.desired_fy),
                slip_ratio: Some(out.slip_ratio),
                slip_angle: Some(out.slip_angle),
                angular_velocity: Some(state.angular_velocity),
                temperature: Some(transient.temperature),
                wear: Some(transient.wear),
                ..Default::default()
            },
        );

        Ok(out)
    }

    /// Advances the carcass at `fz` and records the transient slip pair with
    /// the forces it would produce.
    pub fn advance_transient(&mut self, tick: Tick, slip: SlipVelocity, fz: Real, dt: Real) -> Result<TransientSlip> {
        let tire = self.tire_mut()?;
        let out = tire.advance_transient(slip, dt);
        let forces = tire.model().transient_forces(fz, &out);
        self.tire_history.update(
            tick,
            TireRecord {
                kappa_prime: Some(out.kappa_prime),
                alpha_prime: Some(out.alpha_prime),
                transient_fx: Some(forces.fx),
                transient_fy: Some(forces.fy),
                temperature: Some(out.temperature),
                wear: Some(out.wear),
                ..Default::default()
            },
        );
        Ok(out)
    }
}
