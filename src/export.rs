// ==============================================================================
// export.rs — COMBINED HISTORY -> CSV
// ==============================================================================
// Columns:
//   time                        s, tick * timestep
//   <point>_<channel>           every declared force channel of every point
//   <tire point>_<field>        TireRecord fields
//   body_<field>                BodyRecord fields
//   motor_<field>               MotorRecord fields (when a drivetrain exists)
//
// One row per tick over the union of all series' ticks; a cell with no value
// is written empty.
// ==============================================================================

use std::collections::BTreeSet;
use std::io;
use std::path::Path;

use tracing::info;

use crate::body::VehicleBody;
use crate::error::Result;
use crate::series::{BodyRecord, MotorRecord, Record, TimeSeries, TireRecord};
use crate::tire::types::Tick;

fn cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn push_series<R: Record>(row: &mut Vec<String>, series: &TimeSeries<R>, tick: Tick) {
    match series.get(tick) {
        Some(r) => row.extend(r.values().into_iter().map(cell)),
        None => row.extend(std::iter::repeat_n(String::new(), R::FIELDS.len())),
    }
}

pub fn header(body: &VehicleBody) -> Vec<String> {
    let mut header = vec!["time".to_string()];
    for p in body.points() {
        header.extend(p.channels().iter().map(|(c, _)| format!("{}_{}", p.name, c)));
    }
    for p in body.points().iter().filter(|p| p.is_tire()) {
        header.extend(TireRecord::FIELDS.iter().map(|f| format!("{}_{f}", p.name)));
    }
    header.extend(BodyRecord::FIELDS.iter().map(|f| format!("body_{f}")));
    if body.drivetrain().is_some() {
        header.extend(MotorRecord::FIELDS.iter().map(|f| format!("motor_{f}")));
    }
    header
}

fn all_ticks(body: &VehicleBody) -> BTreeSet<Tick> {
    let mut ticks: BTreeSet<Tick> = body.history().ticks().collect();
    for p in body.points() {
        ticks.extend(p.forces().ticks());
        if p.is_tire() {
            ticks.extend(p.tire_history().ticks());
        }
    }
    if let Some(d) = body.drivetrain() {
        ticks.extend(d.motor.usage().ticks());
    }
    ticks
}

pub fn write_csv<W: io::Write>(body: &VehicleBody, writer: W) -> Result<usize> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(header(body))?;

    let dt = body.config().timestep;
    let mut rows = 0;
    for tick in all_ticks(body) {
        let mut row = vec![(tick as f64 * dt).to_string()];
        for p in body.points() {
            row.extend(p.channels().iter().map(|(c, _)| cell(p.force(*c, tick))));
        }
        for p in body.points().iter().filter(|p| p.is_tire()) {
            push_series(&mut row, p.tire_history(), tick);
        }
        push_series(&mut row, body.history(), tick);
        if let Some(d) = body.drivetrain() {
            push_series(&mut row, d.motor.usage(), tick);
        }
        wtr.write_record(&row)?;
        rows += 1;
    }

    wtr.flush()?;
    Ok(rows)
}

pub fn export_to_path(body: &VehicleBody, path: impl AsRef<Path>) -> Result<usize> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let file = std::fs::File::create(path)?;
    let rows = write_csv(body, io::BufWriter::new(file))?;
    info!(path = %path.display(), rows, "history exported");
    Ok(rows)
}
