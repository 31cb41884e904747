// ==============================================================================
// sim.rs — RUN DRIVER (ONE VEHICLE, ONE SEQUENTIAL RUN)
// ==============================================================================
// run():
//   initialize the body if needed, then step with the configured directive
//   until distance >= max_distance or simulated time >= max_time.
//
// run_scenario():
//   SimConfig -> run id + `vehicle` span -> VehicleBody -> run -> optional CSV.
//   Independent scenarios may run on separate workers; a single run never
//   overlaps ticks.
// ==============================================================================

use serde::Serialize;
use tracing::{Span, info, info_span};
use uuid::Uuid;

use crate::body::{BodyPhase, DriveCommand, VehicleBody};
use crate::config::{RunConfig, SimConfig};
use crate::error::Result;
use crate::export;
use crate::tire::types::{Real, Tick};

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub vehicle: String,
    pub mode: String,
    pub ticks: Tick,
    pub elapsed: Real,     // s, simulated
    pub distance: Real,    // m
    pub final_speed: Real, // m/s
    pub peak_accel: Real,  // m/s^2, longitudinal
    pub inversion_fallbacks: usize,
}

/// The span every body of a run is created under.
pub fn vehicle_span(run_id: Uuid, vehicle: &str) -> Span {
    info_span!("vehicle", %run_id, vehicle)
}

pub fn run(body: &mut VehicleBody, config: &RunConfig, run_id: Uuid) -> Result<RunSummary> {
    config.validate()?;
    if body.phase() != BodyPhase::Running {
        body.initialize()?;
    }

    let cmd = DriveCommand {
        mode: config.mode,
        lateral_demand: config.lateral_demand,
    };
    info!(%run_id, mode = %config.mode, max_distance = config.max_distance, max_time = config.max_time, "run started");

    let start_fallbacks = body.fallbacks();
    let mut ticks: Tick = 0;
    let mut peak_accel: Real = 0.0;

    while body.distance() < config.max_distance && body.time() < config.max_time {
        let report = body.step(&cmd)?;
        ticks += 1;
        if report.accel_x.abs() > peak_accel.abs() {
            peak_accel = report.accel_x;
        }
    }

    let summary = RunSummary {
        run_id,
        vehicle: body.config().name.to_string(),
        mode: config.mode.to_string(),
        ticks,
        elapsed: body.time(),
        distance: body.distance(),
        final_speed: body.kinematics().forward_speed(),
        peak_accel,
        inversion_fallbacks: body.fallbacks() - start_fallbacks,
    };
    info!(
        %run_id,
        ticks,
        elapsed = summary.elapsed,
        distance = summary.distance,
        final_speed = summary.final_speed,
        "run finished"
    );
    Ok(summary)
}

pub fn run_scenario(config: &SimConfig) -> Result<(RunSummary, VehicleBody)> {
    let run_id = Uuid::new_v4();
    let span = vehicle_span(run_id, &config.vehicle.name);
    let mut body = VehicleBody::from_config(config, span)?;

    let summary = run(&mut body, &config.run, run_id)?;

    if let Some(dir) = &config.run.export_csv {
        let path = dir.join(format!("{}-{run_id}.csv", config.vehicle.name));
        export::export_to_path(&body, &path)?;
    }

    Ok((summary, body))
}
