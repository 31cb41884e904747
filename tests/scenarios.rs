use std::path::PathBuf;

use lapsim_physics::tire::LongitudinalMode;
use lapsim_physics::{SimConfig, run_scenario};

fn scenario(name: &str) -> SimConfig {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("scenarios").join(name);
    SimConfig::from_path(&path).unwrap_or_else(|e| panic!("{}: {e}", path.display()))
}

#[test]
fn shipped_scenarios_parse() {
    let accel = scenario("acceleration.toml");
    assert_eq!(accel.run.mode, LongitudinalMode::Accelerate);
    assert_eq!(accel.tire.initial_temperature, 85.0);
    assert!(accel.motor.is_some());

    let cruise = scenario("cruise.toml");
    assert!(cruise.vehicle.carcass_compliance);
    assert!(matches!(cruise.run.mode, LongitudinalMode::MatchSpeed { target_speed, .. } if target_speed == 15.0));
}

#[test]
fn short_acceleration_run_exports_history() {
    let dir = std::env::temp_dir().join(format!("lapsim-export-{}", std::process::id()));
    let mut config = scenario("acceleration.toml");
    config.run.max_distance = 10.0;
    config.run.export_csv = Some(dir.clone());

    let (summary, body) = run_scenario(&config).unwrap();
    assert!(summary.distance >= 10.0);
    assert!(summary.final_speed > 0.0);
    assert_eq!(summary.inversion_fallbacks, body.fallbacks());

    let file = dir.join(format!("fs_ev-{}.csv", summary.run_id));
    let mut rdr = csv::Reader::from_path(&file).unwrap();
    let headers = rdr.headers().unwrap().clone();
    assert!(headers.iter().any(|h| h == "motor_torque"));
    assert_eq!(rdr.records().count() as u64, body.tick() + 1);

    std::fs::remove_dir_all(&dir).ok();
}
