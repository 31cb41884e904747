// ==============================================================================
// motor.rs — MOTOR CHARACTERISTICS + DRIVETRAIN
// ==============================================================================
// Motor:
// - Electric: continuous + peak torque curves; requests are capped by peak,
//   usage is flagged continuous when the continuous curve still covers it.
// - Combustion: a single torque curve.
// - Curves are (rpm, Nm) points, linearly interpolated; zero outside the
//   curve's rpm range.
// - Drivetrain loss: the motor must supply requested / (1 - loss) and the
//   output side receives actual * (1 - loss).
// - Every request is recorded per tick; skipped ticks are zero-filled.
//
// Drivetrain:
// - Converts vehicle speed to motor rpm through the gear ratio and wheel
//   radius, and motor torque to a tractive force limit per driven wheel.
// ==============================================================================

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::series::{MotorRecord, TimeSeries};
use crate::tire::types::{Real, Tick, WheelId};

// ====================================================================
// Torque curve
// ====================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct TorqueCurve {
    points: Vec<(Real, Real)>, // (rpm, Nm), rpm strictly ascending
}

impl TorqueCurve {
    pub fn new(points: Vec<(Real, Real)>) -> Result<Self> {
        if points.is_empty() {
            return Err(SimError::config("motor", "torque curve is empty"));
        }
        if points.windows(2).any(|w| !(w[1].0 > w[0].0)) {
            return Err(SimError::config("motor", "torque curve rpm must be strictly ascending"));
        }
        Ok(Self { points })
    }

    pub fn min_rpm(&self) -> Real {
        self.points[0].0
    }

    pub fn max_rpm(&self) -> Real {
        self.points[self.points.len() - 1].0
    }

    pub fn torque_at(&self, rpm: Real) -> Real {
        if rpm < self.min_rpm() || rpm > self.max_rpm() {
            return 0.0;
        }
        for w in self.points.windows(2) {
            let ((r0, t0), (r1, t1)) = (w[0], w[1]);
            if rpm <= r1 {
                return t0 + (t1 - t0) * (rpm - r0) / (r1 - r0);
            }
        }
        // single-point curve
        self.points[0].1
    }
}

// ====================================================================
// Motor
// ====================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum MotorKind {
    Electric { continuous: TorqueCurve, peak: TorqueCurve },
    Combustion { curve: TorqueCurve },
}

#[derive(Debug, Clone)]
pub struct Motor {
    kind: MotorKind,
    drivetrain_loss_percent: Real,
    usage: TimeSeries<MotorRecord>,
    last_tick: Option<Tick>,
}

impl Motor {
    pub fn new(kind: MotorKind, drivetrain_loss_percent: Real) -> Result<Self> {
        if !(0.0..100.0).contains(&drivetrain_loss_percent) {
            return Err(SimError::config(
                "motor",
                format!("drivetrain loss must be in [0, 100), got {drivetrain_loss_percent}"),
            ));
        }
        Ok(Self {
            kind,
            drivetrain_loss_percent,
            usage: TimeSeries::new(),
            last_tick: None,
        })
    }

    pub fn kind(&self) -> &MotorKind {
        &self.kind
    }

    pub fn usage(&self) -> &TimeSeries<MotorRecord> {
        &self.usage
    }

    fn efficiency(&self) -> Real {
        1.0 - self.drivetrain_loss_percent / 100.0
    }

    /// Motor-side torque available at this rpm (peak curve for electric).
    pub fn available_torque(&self, rpm: Real) -> Real {
        match &self.kind {
            MotorKind::Electric { peak, .. } => peak.torque_at(rpm),
            MotorKind::Combustion { curve } => curve.torque_at(rpm),
        }
    }

    /// Output-side torque after drivetrain losses.
    pub fn output_torque(&self, rpm: Real) -> Real {
        self.available_torque(rpm) * self.efficiency()
    }

    /// Delivers up to `requested` Nm at the drivetrain output and records usage.
    pub fn request_torque(&mut self, rpm: Real, requested: Real, tick: Tick) -> Real {
        let required = requested.max(0.0) / self.efficiency();
        let actual = required.min(self.available_torque(rpm));

        let continuous = match &self.kind {
            MotorKind::Electric { continuous, .. } => Some(if continuous.torque_at(rpm) > actual { 1.0 } else { 0.0 }),
            MotorKind::Combustion { .. } => None,
        };

        self.fill_missing(tick);
        self.usage.update(
            tick,
            MotorRecord {
                torque: Some(actual),
                rpm: Some(rpm),
                continuous,
            },
        );
        self.last_tick = Some(tick);

        actual * self.efficiency()
    }

    fn fill_missing(&mut self, tick: Tick) {
        let Some(last) = self.last_tick else { return };
        for t in (last + 1)..tick {
            if self.usage.get(t).is_none() {
                self.usage.update(
                    t,
                    MotorRecord {
                        torque: Some(0.0),
                        rpm: Some(0.0),
                        continuous: None,
                    },
                );
            }
        }
    }
}

// ====================================================================
// Configuration
// ====================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MotorConfig {
    Electric {
        continuous: Vec<(Real, Real)>,
        peak: Vec<(Real, Real)>,
        #[serde(default)]
        drivetrain_loss_percent: Real,
    },
    Combustion {
        curve: Vec<(Real, Real)>,
        #[serde(default)]
        drivetrain_loss_percent: Real,
    },
}

impl MotorConfig {
    /// Emrax 208 axial-flux motor with 5% drivetrain loss.
    pub fn emrax_208() -> Self {
        MotorConfig::Electric {
            continuous: vec![
                (0.0, 60.0),
                (1000.0, 66.0),
                (2000.0, 67.0),
                (3000.0, 66.0),
                (4000.0, 64.0),
                (5000.0, 58.0),
                (6000.0, 55.0),
            ],
            peak: vec![
                (0.0, 140.0),
                (1000.0, 138.0),
                (2000.0, 136.0),
                (3000.0, 133.0),
                (4000.0, 130.0),
                (5000.0, 125.0),
                (6000.0, 120.0),
            ],
            drivetrain_loss_percent: 5.0,
        }
    }

    pub fn build(&self) -> Result<Motor> {
        match self {
            MotorConfig::Electric { continuous, peak, drivetrain_loss_percent } => Motor::new(
                MotorKind::Electric {
                    continuous: TorqueCurve::new(continuous.clone())?,
                    peak: TorqueCurve::new(peak.clone())?,
                },
                *drivetrain_loss_percent,
            ),
            MotorConfig::Combustion { curve, drivetrain_loss_percent } => Motor::new(
                MotorKind::Combustion { curve: TorqueCurve::new(curve.clone())? },
                *drivetrain_loss_percent,
            ),
        }
    }
}

// ====================================================================
// Drivetrain
// ====================================================================

#[derive(Debug, Clone)]
pub struct Drivetrain {
    pub motor: Motor,
    pub gear_ratio: Real,
    pub wheel_radius: Real, // m
    pub driven_wheels: Vec<WheelId>,
}

impl Drivetrain {
    pub fn rear_drive(motor: Motor, gear_ratio: Real, wheel_radius: Real) -> Result<Self> {
        if !(gear_ratio > 0.0) {
            return Err(SimError::config("drivetrain", format!("gear ratio must be positive, got {gear_ratio}")));
        }
        if !(wheel_radius > 0.0) {
            return Err(SimError::config("drivetrain", format!("wheel radius must be positive, got {wheel_radius}")));
        }
        Ok(Self {
            motor,
            gear_ratio,
            wheel_radius,
            driven_wheels: vec![WheelId::RL, WheelId::RR],
        })
    }

    pub fn drives(&self, wheel: WheelId) -> bool {
        self.driven_wheels.contains(&wheel)
    }

    pub fn motor_rpm(&self, speed: Real) -> Real {
        speed.max(0.0) / self.wheel_radius * self.gear_ratio * 60.0 / (2.0 * PI)
    }

    /// Largest tractive force one driven wheel can receive at this speed.
    pub fn drive_limit_per_wheel(&self, speed: Real) -> Real {
        let n = self.driven_wheels.len().max(1) as Real;
        let wheel_torque = self.motor.output_torque(self.motor_rpm(speed)) * self.gear_ratio;
        wheel_torque / self.wheel_radius / n
    }

    /// Requests the total tractive force from the motor; returns what it delivered.
    pub fn deliver(&mut self, speed: Real, tractive_force: Real, tick: Tick) -> Real {
        let rpm = self.motor_rpm(speed);
        let output_torque = tractive_force.max(0.0) * self.wheel_radius / self.gear_ratio;
        let delivered = self.motor.request_torque(rpm, output_torque, tick);
        delivered * self.gear_ratio / self.wheel_radius
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emrax() -> Motor {
        MotorConfig::emrax_208().build().unwrap()
    }

    #[test]
    fn curve_interpolates_and_zeroes_outside() {
        let curve = TorqueCurve::new(vec![(0.0, 100.0), (1000.0, 80.0), (2000.0, 60.0)]).unwrap();
        assert_eq!(curve.torque_at(0.0), 100.0);
        assert_eq!(curve.torque_at(500.0), 90.0);
        assert_eq!(curve.torque_at(2000.0), 60.0);
        assert_eq!(curve.torque_at(2000.1), 0.0);
        assert_eq!(curve.torque_at(-1.0), 0.0);
    }

    #[test]
    fn bad_curves_are_rejected() {
        assert!(TorqueCurve::new(vec![]).is_err());
        assert!(TorqueCurve::new(vec![(0.0, 10.0), (0.0, 12.0)]).is_err());
        assert!(Motor::new(MotorKind::Combustion { curve: TorqueCurve::new(vec![(0.0, 1.0)]).unwrap() }, 100.0).is_err());
    }

    #[test]
    fn request_is_capped_by_peak_and_losses() {
        let mut m = emrax();
        // 100 Nm at the output needs 105.26 Nm at the motor, still under peak
        let out = m.request_torque(0.0, 100.0, 1);
        assert!((out - 100.0).abs() < 1e-9);

        // 200 Nm is capped to 140 Nm at the motor, 133 Nm at the output
        let out = m.request_torque(0.0, 200.0, 2);
        assert!((out - 133.0).abs() < 1e-9);
        assert_eq!(m.usage().value(2, "torque"), Some(140.0));
        assert_eq!(m.usage().value(2, "continuous"), Some(0.0));

        let out = m.request_torque(3000.0, 30.0, 3);
        assert!(out > 0.0);
        assert_eq!(m.usage().value(3, "continuous"), Some(1.0));
    }

    #[test]
    fn skipped_ticks_are_zero_filled() {
        let mut m = emrax();
        m.request_torque(1000.0, 50.0, 2);
        m.request_torque(1000.0, 50.0, 6);
        for t in 3..6 {
            assert_eq!(m.usage().value(t, "torque"), Some(0.0));
            assert_eq!(m.usage().value(t, "rpm"), Some(0.0));
        }
        assert!(m.usage().get(1).is_none());
    }

    #[test]
    fn combustion_has_no_continuous_flag() {
        let cfg = MotorConfig::Combustion {
            curve: vec![(1000.0, 80.0), (6000.0, 120.0)],
            drivetrain_loss_percent: 0.0,
        };
        let mut m = cfg.build().unwrap();
        assert_eq!(m.available_torque(500.0), 0.0);
        assert_eq!(m.request_torque(3500.0, 500.0, 1), 100.0);
        assert_eq!(m.usage().value(1, "continuous"), None);
    }

    #[test]
    fn drivetrain_converts_speed_and_force() {
        let mut dt = Drivetrain::rear_drive(emrax(), 4.0, 0.33).unwrap();
        assert!(dt.drives(WheelId::RL) && !dt.drives(WheelId::FL));

        // one wheel revolution per second -> 4 motor revolutions per second
        let speed = 2.0 * PI * 0.33;
        assert!((dt.motor_rpm(speed) - 240.0).abs() < 1e-9);

        let limit = dt.drive_limit_per_wheel(0.0);
        assert!((limit - 140.0 * 0.95 * 4.0 / 0.33 / 2.0).abs() < 1e-9);

        let delivered = dt.deliver(0.0, 10_000.0, 1);
        assert!((delivered - 2.0 * limit).abs() < 1e-9);
        assert_eq!(dt.deliver(0.0, -50.0, 2), 0.0);
    }

    #[test]
    fn motor_config_parses_from_toml() {
        let cfg: MotorConfig = toml::from_str(
            r#"
            kind = "combustion"
            curve = [[1000.0, 80.0], [6000.0, 120.0]]
            drivetrain_loss_percent = 8.0
            "#,
        )
        .unwrap();
        assert!(matches!(cfg, MotorConfig::Combustion { .. }));
        assert!(cfg.build().is_ok());
    }
}
