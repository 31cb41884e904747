mod support;

use lapsim_physics::SimError;
use lapsim_physics::body::CG_POINT;
use lapsim_physics::contact::ForceChannel;
use lapsim_physics::tire::{GRAVITY, LongitudinalMode, WheelId};
use support::{Fixture, command, drive};

#[test]
fn omitted_channel_blocks_integration() {
    let mut body = Fixture::fs_ev().initialized();
    drive(&mut body, &command(LongitudinalMode::Accelerate, 0.0), 3);

    let tick = body.tick();
    body.compute_vertical_loads(tick).unwrap();
    for wheel in WheelId::ALL {
        let p = body.point_mut(wheel.as_str()).unwrap();
        p.record(
            tick,
            &[
                (ForceChannel::XFriction, 0.0),
                (ForceChannel::YFriction, 0.0),
                (ForceChannel::RollingResistance, 0.0),
            ],
        )
        .unwrap();
    }
    // the CG never gets its drag entry this tick
    body.point_mut(CG_POINT)
        .unwrap()
        .record(tick, &[(ForceChannel::VerticalLoad, -1.0), (ForceChannel::LateralLoad, 0.0)])
        .unwrap();

    match body.resultant(tick) {
        Err(SimError::MissingForce { point, tick: t, missing }) => {
            assert_eq!(point, CG_POINT);
            assert_eq!(t, tick);
            assert_eq!(missing, vec![ForceChannel::LongitudinalLoad]);
        }
        other => panic!("expected MissingForce, got {other:?}"),
    }

    // the history before the gap is untouched
    assert!(body.history().value(tick, "accel_x").is_none());
    assert!(body.history().value(tick - 1, "accel_x").is_some());
}

#[test]
fn undeclared_channel_is_rejected() {
    let mut body = Fixture::fs_ev().initialized();
    let err = body
        .point_mut(CG_POINT)
        .unwrap()
        .record(1, &[(ForceChannel::XFriction, 10.0)])
        .unwrap_err();
    assert!(matches!(err, SimError::UndeclaredChannel { .. }));
}

#[test]
fn straight_line_loads_stay_symmetric_and_conserved() {
    let mut body = Fixture::fs_ev().initialized();
    let weight = body.config().mass * GRAVITY;

    for r in drive(&mut body, &command(LongitudinalMode::Accelerate, 0.0), 60) {
        assert!((r.loads.get(WheelId::FL) - r.loads.get(WheelId::FR)).abs() < 1e-6);
        assert!((r.loads.get(WheelId::RL) - r.loads.get(WheelId::RR)).abs() < 1e-6);
        assert!((r.loads.total() - weight).abs() < 1e-6);
    }
}

#[test]
fn leftward_demand_loads_the_right_wheels() {
    let mut body = Fixture::fs_ev().initialized();
    let lag = body.lag() as usize;
    let reports = drive(&mut body, &command(LongitudinalMode::Maintain, 800.0), lag + 5);

    let first = &reports[0];
    assert!((first.loads.get(WheelId::RL) - first.loads.get(WheelId::RR)).abs() < 1e-9);

    let last = reports.last().unwrap();
    assert!(last.loads.get(WheelId::RR) > last.loads.get(WheelId::RL));
    assert!(last.loads.get(WheelId::FR) > last.loads.get(WheelId::FL));
    assert!(last.force_y > 0.0);
}

#[test]
fn realized_force_never_exceeds_capacity_in_a_corner() {
    let mut body = Fixture::fs_ev().initialized();
    drive(&mut body, &command(LongitudinalMode::Accelerate, 1200.0), 80);

    for wheel in [WheelId::RL, WheelId::RR] {
        for (tick, row) in body.wheel(wheel).tire_history().rows().skip(1) {
            let fx = row.fx.unwrap();
            let cap = row.max_fx.unwrap();
            assert!(fx <= cap + 1e-9, "{wheel} tick {tick}: {fx} > {cap}");
        }
    }
}
