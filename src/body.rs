// ==============================================================================
// body.rs — VEHICLE BODY: LOAD TRANSFER -> ALLOCATION -> RESULTANT -> INTEGRATE
// ==============================================================================
// Phases: Uninitialized -> Initializing -> Running
//
// initialize():
//   tick 0: static wheel loads, CG carries -W, first resultant, zero-order
//   motion seeded; then tick = 1 and Running.
//
// step(cmd), per tick:
//   1) Vertical loads from tire x/y forces at tick - lag (tick 0 before the
//      first lag window, i.e. static loads).
//   2) Allocation on the driven (rear) wheels with the commanded mode, half
//      the lateral demand each and the drivetrain's tractive limit. Undriven
//      wheels get zero friction entries. Rolling resistance on every tire,
//      aero drag on the CG.
//   3) Completeness gate: every declared channel of every point must be set.
//   4) Resultant force + torque about the CG (sum of r x F).
//   5) Integration in the ground plane:
//        a = F/m (z pinned), p += v dt + a dt^2/2, v += a dt
//        yaw_acc = Tz/Izz, yaw += r dt + yaw_acc dt^2/2, r += yaw_acc dt
//      Acceleration + resultant are recorded at `tick`; velocity, position and
//      yaw at `tick + 1`.
//
// Frames: contact points live in the vehicle frame; kinematics are world frame
// (rotated by yaw about z). Yaw is reported in degrees in [0, 360).
// ==============================================================================

use std::f64::consts::TAU;

use nalgebra::Vector3;
use serde::Serialize;
use tracing::{Span, debug, error, info, warn};

use crate::config::{SimConfig, VehicleConfig};
use crate::contact::{ContactPoint, ForceChannel};
use crate::error::{Result, SimError};
use crate::load_transfer::{AxleForces, LoadGeometry, WheelLoads, static_loads, transfer_loads};
use crate::motor::Drivetrain;
use crate::series::{BodyRecord, TimeSeries};
use crate::tire::allocation::{AllocationRequest, Tire};
use crate::tire::params::TireParams;
use crate::tire::transient::{MIN_SLIP_SPEED, SlipVelocity};
use crate::tire::types::{Axis, LongitudinalMode, Real, Tick, WheelId};

pub const CG_POINT: &str = "cnt_grav";
const CG_INDEX: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyPhase {
    Uninitialized,
    Initializing,
    Running,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Kinematics {
    pub position: Vector3<Real>,     // m, world
    pub velocity: Vector3<Real>,     // m/s, world
    pub acceleration: Vector3<Real>, // m/s^2, world
    pub yaw: Real,                   // rad, [0, 2pi)
    pub yaw_rate: Real,              // rad/s
    pub yaw_accel: Real,             // rad/s^2
}

impl Kinematics {
    /// Velocity along the vehicle's heading.
    pub fn forward_speed(&self) -> Real {
        self.velocity.x * self.yaw.cos() + self.velocity.y * self.yaw.sin()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DriveCommand {
    pub mode: LongitudinalMode,
    pub lateral_demand: Real, // N, split evenly over the driven wheels
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct StepReport {
    pub tick: Tick,
    pub time: Real, // s
    pub loads: WheelLoads,
    pub force_x: Real,  // N, vehicle frame
    pub force_y: Real,  // N
    pub torque_z: Real, // N*m
    pub accel_x: Real,  // m/s^2, vehicle frame
    pub speed: Real,    // m/s, forward speed after the step
    pub distance: Real, // m
    pub fallbacks: usize,
}

pub struct VehicleBody {
    config: VehicleConfig,
    geometry: LoadGeometry,
    lag: Tick,
    yaw_inertia: Real,
    phase: BodyPhase,
    tick: Tick,
    points: Vec<ContactPoint>, // WheelId::index order, then the CG
    kin: Kinematics,
    history: TimeSeries<BodyRecord>,
    drivetrain: Option<Drivetrain>,
    distance: Real,
    fallbacks: usize,
    span: Span,
}

impl VehicleBody {
    pub fn new(
        config: &VehicleConfig,
        tire: &TireParams,
        drivetrain: Option<Drivetrain>,
        span: Span,
    ) -> Result<Self> {
        config.validate()?;
        let lag = config.lag_ticks()?;

        let half_track = config.track_width / 2.0;
        let mut points = Vec::with_capacity(5);
        for wheel in WheelId::ALL {
            let x = if wheel.is_front() { config.wheelbase } else { 0.0 };
            let y = if wheel.is_left() { half_track } else { -half_track };
            let t = Tire::new(tire.clone(), config.tire_radius, config.tire_inertia, config.smoothing_factor)?;
            points.push(ContactPoint::tire_point(wheel.as_str(), Vector3::new(x, y, 0.0), t));
        }
        points.push(ContactPoint::cg_point(
            CG_POINT,
            Vector3::new(config.dist_r, 0.0, config.h_cog),
        ));

        Ok(Self {
            config: config.clone(),
            geometry: config.geometry(),
            lag,
            yaw_inertia: config.yaw_inertia(),
            phase: BodyPhase::Uninitialized,
            tick: 0,
            points,
            kin: Kinematics::default(),
            history: TimeSeries::new(),
            drivetrain,
            distance: 0.0,
            fallbacks: 0,
            span,
        })
    }

    pub fn from_config(config: &SimConfig, span: Span) -> Result<Self> {
        config.validate()?;
        let drivetrain = config
            .motor
            .as_ref()
            .map(|m| {
                Drivetrain::rear_drive(m.build()?, config.vehicle.gear_ratio, config.vehicle.tire_radius)
            })
            .transpose()?;
        Self::new(&config.vehicle, &config.tire, drivetrain, span)
    }

    // -------------------------
    // Accessors
    // -------------------------

    pub fn config(&self) -> &VehicleConfig {
        &self.config
    }

    pub fn phase(&self) -> BodyPhase {
        self.phase
    }

    pub fn tick(&self) -> Tick {
        self.tick
    }

    pub fn time(&self) -> Real {
        self.tick as Real * self.config.timestep
    }

    pub fn lag(&self) -> Tick {
        self.lag
    }

    pub fn yaw_inertia(&self) -> Real {
        self.yaw_inertia
    }

    pub fn kinematics(&self) -> &Kinematics {
        &self.kin
    }

    pub fn history(&self) -> &TimeSeries<BodyRecord> {
        &self.history
    }

    pub fn distance(&self) -> Real {
        self.distance
    }

    pub fn fallbacks(&self) -> usize {
        self.fallbacks
    }

    pub fn drivetrain(&self) -> Option<&Drivetrain> {
        self.drivetrain.as_ref()
    }

    pub fn points(&self) -> &[ContactPoint] {
        &self.points
    }

    pub fn wheel(&self, wheel: WheelId) -> &ContactPoint {
        &self.points[wheel.index()]
    }

    pub fn cg(&self) -> &ContactPoint {
        &self.points[CG_INDEX]
    }

    pub fn point(&self, name: &str) -> Option<&ContactPoint> {
        self.points.iter().find(|p| p.name == name)
    }

    pub fn point_mut(&mut self, name: &str) -> Option<&mut ContactPoint> {
        self.points.iter_mut().find(|p| p.name == name)
    }

    fn cg_location(&self) -> Vector3<Real> {
        self.points[CG_INDEX].location
    }

    // ====================================================================
    // Initialization
    // ====================================================================

    pub fn initialize(&mut self) -> Result<()> {
        let span = self.span.clone();
        let _enter = span.enter();

        if self.phase != BodyPhase::Uninitialized {
            return Ok(());
        }
        self.phase = BodyPhase::Initializing;
        self.tick = 0;

        let loads = static_loads(&self.geometry);
        for wheel in WheelId::ALL {
            self.points[wheel.index()].record(0, &[(ForceChannel::VerticalLoad, loads.get(wheel))])?;
        }
        self.points[CG_INDEX].record(
            0,
            &[
                (ForceChannel::VerticalLoad, -self.geometry.weight()),
                (ForceChannel::LongitudinalLoad, 0.0),
                (ForceChannel::LateralLoad, 0.0),
            ],
        )?;

        let (force, torque) = self.resultant(0)?;
        self.integrate(0, force, torque);

        self.tick = 1;
        self.phase = BodyPhase::Running;
        info!(
            vehicle = %self.config.name,
            front = loads.front(),
            rear = loads.rear(),
            lag_ticks = self.lag,
            "vehicle initialized"
        );
        Ok(())
    }

    // ====================================================================
    // 1) Vertical load transfer
    // ====================================================================

    pub fn compute_vertical_loads(&mut self, tick: Tick) -> Result<WheelLoads> {
        let lagged = tick.saturating_sub(self.lag);

        let mut forces = AxleForces::default();
        for wheel in WheelId::ALL {
            let p = &self.points[wheel.index()];
            let fx = p.total_force(Axis::X, lagged)?;
            let fy = p.total_force(Axis::Y, lagged)?;
            if wheel.is_front() {
                forces.front_x += fx;
            } else {
                forces.rear_x += fx;
            }
            if wheel.is_left() {
                forces.left_y += fy;
            } else {
                forces.right_y += fy;
            }
        }

        let loads = transfer_loads(&self.geometry, &forces);
        for wheel in WheelId::ALL {
            self.points[wheel.index()].record(tick, &[(ForceChannel::VerticalLoad, loads.get(wheel))])?;
        }
        for wheel in loads.lifted() {
            warn!(tick, wheel = %wheel, "wheel unloaded, vertical load floored at zero");
        }

        debug!(
            tick,
            lagged,
            fl = loads.get(WheelId::FL),
            fr = loads.get(WheelId::FR),
            rl = loads.get(WheelId::RL),
            rr = loads.get(WheelId::RR),
            "vertical loads"
        );
        Ok(loads)
    }

    // ====================================================================
    // 4) Resultant
    // ====================================================================

    /// Net force and torque about the CG at `tick`, vehicle frame.
    pub fn resultant(&self, tick: Tick) -> Result<(Vector3<Real>, Vector3<Real>)> {
        let cg = self.cg_location();
        let mut force = Vector3::zeros();
        let mut torque = Vector3::zeros();

        for p in &self.points {
            let f = p.force_vector(tick)?;
            force += f;
            torque += (p.location - cg).cross(&f);
        }

        Ok((force, torque))
    }

    // ====================================================================
    // 5) Integration
    // ====================================================================

    fn integrate(&mut self, tick: Tick, force: Vector3<Real>, torque: Vector3<Real>) {
        let dt = self.config.timestep;
        let (sin, cos) = self.kin.yaw.sin_cos();

        let world_force = Vector3::new(
            force.x * cos - force.y * sin,
            force.x * sin + force.y * cos,
            0.0,
        );
        let accel = world_force / self.config.mass;

        let mut position = self.kin.position + self.kin.velocity * dt + accel * (0.5 * dt * dt);
        let mut velocity = self.kin.velocity + accel * dt;
        position.z = 0.0;
        velocity.z = 0.0;

        let yaw_accel = torque.z / self.yaw_inertia;
        let yaw = (self.kin.yaw + self.kin.yaw_rate * dt + 0.5 * yaw_accel * dt * dt).rem_euclid(TAU);
        let yaw_rate = self.kin.yaw_rate + yaw_accel * dt;

        self.distance += (position - self.kin.position).norm();

        self.history.update(
            tick,
            BodyRecord {
                accel_x: Some(accel.x),
                accel_y: Some(accel.y),
                accel_z: Some(0.0),
                yaw_accel: Some(yaw_accel),
                force_x: Some(force.x),
                force_y: Some(force.y),
                force_z: Some(force.z),
                torque_x: Some(torque.x),
                torque_y: Some(torque.y),
                torque_z: Some(torque.z),
                ..Default::default()
            },
        );
        self.history.update(
            tick + 1,
            BodyRecord {
                vel_x: Some(velocity.x),
                vel_y: Some(velocity.y),
                vel_z: Some(0.0),
                pos_x: Some(position.x),
                pos_y: Some(position.y),
                pos_z: Some(0.0),
                yaw_deg: Some(yaw.to_degrees().rem_euclid(360.0)),
                yaw_rate: Some(yaw_rate),
                ..Default::default()
            },
        );

        self.kin = Kinematics {
            position,
            velocity,
            acceleration: accel,
            yaw,
            yaw_rate,
            yaw_accel,
        };
    }

    // ====================================================================
    // Per-tick step
    // ====================================================================

    pub fn step(&mut self, cmd: &DriveCommand) -> Result<StepReport> {
        let span = self.span.clone();
        let _enter = span.enter();

        if self.phase != BodyPhase::Running {
            return Err(SimError::NotInitialized);
        }

        let tick = self.tick;
        let dt = self.config.timestep;
        let speed = self.kin.forward_speed();

        // 1) vertical loads
        let loads = self.compute_vertical_loads(tick)?;

        // 2) allocation
        let drive_limit = self.drivetrain.as_ref().map(|d| d.drive_limit_per_wheel(speed));
        let driven: Vec<WheelId> = match &self.drivetrain {
            Some(d) => d.driven_wheels.clone(),
            None => vec![WheelId::RL, WheelId::RR],
        };
        let per_wheel_fy = cmd.lateral_demand / driven.len().max(1) as Real;

        let mut slips = [(0.0, 0.0); 4];
        let mut tractive = 0.0;
        let mut fallbacks = 0;
        for wheel in WheelId::ALL {
            let point = &mut self.points[wheel.index()];
            if driven.contains(&wheel) {
                let req = AllocationRequest {
                    desired_fy: per_wheel_fy,
                    fz: loads.get(wheel),
                    vx: speed,
                    mode: cmd.mode,
                    current_speed: speed,
                    dt,
                    drive_limit,
                };
                let out = point.allocate(tick, &req)?;
                if out.fell_back() {
                    fallbacks += 1;
                }
                tractive += out.fx.max(0.0);
                slips[wheel.index()] = (out.slip_ratio, out.slip_angle);
            } else {
                point.record(tick, &[(ForceChannel::XFriction, 0.0), (ForceChannel::YFriction, 0.0)])?;
            }

            let rolling = if speed.abs() < MIN_SLIP_SPEED {
                0.0
            } else {
                -self.config.crr * loads.get(wheel) * speed.signum()
            };
            point.record(tick, &[(ForceChannel::RollingResistance, rolling)])?;
        }
        self.fallbacks += fallbacks;

        if let Some(d) = self.drivetrain.as_mut() {
            d.deliver(speed, tractive, tick);
        }

        let drag = -0.5
            * self.config.air_density
            * self.config.drag_coefficient
            * self.config.frontal_area
            * speed
            * speed.abs();
        self.points[CG_INDEX].record(
            tick,
            &[
                (ForceChannel::VerticalLoad, -self.geometry.weight()),
                (ForceChannel::LongitudinalLoad, drag),
                (ForceChannel::LateralLoad, 0.0),
            ],
        )?;

        // carcass / thermal / wear
        if self.config.carcass_compliance {
            let vx = speed.abs();
            for wheel in WheelId::ALL {
                let (kappa, alpha) = slips[wheel.index()];
                let slip = SlipVelocity {
                    vx: speed,
                    vsx: -kappa * vx,
                    vsy: -alpha.tan() * vx,
                    gamma: 0.0,
                };
                self.points[wheel.index()].advance_transient(tick, slip, loads.get(wheel), dt)?;
            }
        }

        // 3) completeness gate
        for p in &self.points {
            let missing = p.missing_channels(tick);
            if !missing.is_empty() {
                error!(tick, point = %p.name, ?missing, "incomplete forces, refusing to integrate");
                return Err(SimError::MissingForce {
                    point: p.name.clone(),
                    tick,
                    missing,
                });
            }
        }

        // 4) + 5)
        let (force, torque) = self.resultant(tick)?;
        self.integrate(tick, force, torque);
        self.tick += 1;

        let report = StepReport {
            tick,
            time: tick as Real * dt,
            loads,
            force_x: force.x,
            force_y: force.y,
            torque_z: torque.z,
            accel_x: force.x / self.config.mass,
            speed: self.kin.forward_speed(),
            distance: self.distance,
            fallbacks,
        };
        debug!(
            tick,
            fx = report.force_x,
            accel = report.accel_x,
            speed = report.speed,
            "step"
        );
        Ok(report)
    }

    /// Restores every tire's transient state and wheel spin.
    pub fn reset_tires(&mut self) -> Result<()> {
        for wheel in WheelId::ALL {
            self.points[wheel.index()].tire_mut()?.reset_state();
        }
        Ok(())
    }
}
