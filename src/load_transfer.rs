// ==============================================================================
// load_transfer.rs — STATIC + LAGGED LOAD TRANSFER (RIGID, NO SUSPENSION)
// ------------------------------------------------------------------------------
// Static:
//     Fz_front_wheel = W * dist_r / wheelbase / 2
//     Fz_rear_wheel  = W * dist_f / wheelbase / 2
//
// Longitudinal (tire x forces at tick - lag):
//     d_accel = F_rear,x  * h / wheelbase
//     d_brake = F_front,x * h / wheelbase
//   Positive x force moves load rearward, negative (braking) moves it forward.
//   The axle total is split evenly across its two wheels.
//
// Lateral (tire y forces at tick - lag):
//     d_left  = F_left,y  * h / track
//     d_right = F_right,y * h / track
//   Positive (leftward) force moves load onto the right wheels, split evenly
//   across front/rear.
//
// Transfers never create or remove load: the four wheels always sum to W
// unless a wheel would go negative, in which case it is floored at 0.
// ==============================================================================

use serde::Serialize;

use crate::tire::types::{GRAVITY, Real, WheelId};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadGeometry {
    pub mass: Real,        // kg
    pub dist_f: Real,      // m, CG -> front axle
    pub dist_r: Real,      // m, CG -> rear axle
    pub wheelbase: Real,   // m
    pub h_cog: Real,       // m
    pub track_width: Real, // m
}

impl LoadGeometry {
    pub fn weight(&self) -> Real {
        self.mass * GRAVITY
    }
}

/// Lagged tire force totals feeding the transfer.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AxleForces {
    pub front_x: Real, // N, FL + FR
    pub rear_x: Real,  // N, RL + RR
    pub left_y: Real,  // N, FL + RL
    pub right_y: Real, // N, FR + RR
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct WheelLoads {
    loads: [Real; 4], // N, by WheelId::index
}

impl WheelLoads {
    pub fn get(&self, wheel: WheelId) -> Real {
        self.loads[wheel.index()]
    }

    pub fn total(&self) -> Real {
        self.loads.iter().sum()
    }

    pub fn front(&self) -> Real {
        self.get(WheelId::FL) + self.get(WheelId::FR)
    }

    pub fn rear(&self) -> Real {
        self.get(WheelId::RL) + self.get(WheelId::RR)
    }

    /// Wheels whose load was floored at zero.
    pub fn lifted(&self) -> impl Iterator<Item = WheelId> + '_ {
        WheelId::ALL.into_iter().filter(|w| self.get(*w) <= 0.0)
    }
}

pub fn static_loads(geom: &LoadGeometry) -> WheelLoads {
    let w = geom.weight();
    let front = w * geom.dist_r / geom.wheelbase / 2.0;
    let rear = w * geom.dist_f / geom.wheelbase / 2.0;
    WheelLoads { loads: [front, front, rear, rear] }
}

pub fn transfer_loads(geom: &LoadGeometry, forces: &AxleForces) -> WheelLoads {
    let base = static_loads(geom);

    let d_accel = forces.rear_x * geom.h_cog / geom.wheelbase;
    let d_brake = forces.front_x * geom.h_cog / geom.wheelbase;
    let d_long = (d_accel + d_brake) / 2.0;

    let d_left = forces.left_y * geom.h_cog / geom.track_width;
    let d_right = forces.right_y * geom.h_cog / geom.track_width;
    let d_lat = (d_left + d_right) / 2.0;

    let mut loads = [0.0; 4];
    for wheel in WheelId::ALL {
        let long = if wheel.is_front() { -d_long } else { d_long };
        let lat = if wheel.is_left() { -d_lat } else { d_lat };
        loads[wheel.index()] = (base.get(wheel) + long + lat).max(0.0);
    }

    WheelLoads { loads }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GEOM: LoadGeometry = LoadGeometry {
        mass: 280.0,
        dist_f: 0.85,
        dist_r: 0.75,
        wheelbase: 1.6,
        h_cog: 0.3,
        track_width: 1.2,
    };

    fn close(a: Real, b: Real) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn static_split_follows_axle_distances() {
        let s = static_loads(&GEOM);
        assert!(close(s.total(), GEOM.weight()));
        assert!(close(s.front(), GEOM.weight() * 0.75 / 1.6));
        assert_eq!(s.get(WheelId::FL), s.get(WheelId::FR));
        assert_eq!(s.get(WheelId::RL), s.get(WheelId::RR));
    }

    #[test]
    fn no_lateral_force_keeps_sides_equal() {
        let forces = AxleForces { front_x: -300.0, rear_x: 1800.0, ..Default::default() };
        let l = transfer_loads(&GEOM, &forces);
        assert!(close(l.get(WheelId::FL), l.get(WheelId::FR)));
        assert!(close(l.get(WheelId::RL), l.get(WheelId::RR)));
        assert!(close(l.total(), GEOM.weight()));
    }

    #[test]
    fn no_longitudinal_force_keeps_axle_totals() {
        let forces = AxleForces { left_y: 900.0, right_y: 700.0, ..Default::default() };
        let l = transfer_loads(&GEOM, &forces);
        let s = static_loads(&GEOM);
        assert!(close(l.front(), s.front()));
        assert!(close(l.rear(), s.rear()));
    }

    #[test]
    fn drive_moves_load_rearward_and_braking_forward() {
        let s = static_loads(&GEOM);

        let accel = transfer_loads(&GEOM, &AxleForces { rear_x: 2000.0, ..Default::default() });
        assert!(accel.rear() > s.rear());
        assert!(close(accel.rear() - s.rear(), 2000.0 * 0.3 / 1.6));

        let brake = transfer_loads(&GEOM, &AxleForces { front_x: -2000.0, rear_x: -1000.0, ..Default::default() });
        assert!(brake.front() > s.front());
        assert!(close(brake.front() - s.front(), 3000.0 * 0.3 / 1.6));
    }

    #[test]
    fn leftward_force_loads_right_wheels() {
        let l = transfer_loads(&GEOM, &AxleForces { left_y: 600.0, right_y: 600.0, ..Default::default() });
        assert!(l.get(WheelId::FR) > l.get(WheelId::FL));
        assert!(l.get(WheelId::RR) > l.get(WheelId::RL));
        let right = l.get(WheelId::FR) + l.get(WheelId::RR);
        let s = static_loads(&GEOM);
        assert!(close(right - s.total() / 2.0, 1200.0 * 0.3 / 1.2));
    }

    #[test]
    fn wheel_lift_floors_at_zero() {
        let l = transfer_loads(&GEOM, &AxleForces { left_y: 20000.0, right_y: 20000.0, ..Default::default() });
        assert_eq!(l.get(WheelId::FL), 0.0);
        assert_eq!(l.get(WheelId::RL), 0.0);
        assert_eq!(l.lifted().collect::<Vec<_>>(), vec![WheelId::FL, WheelId::RL]);
    }
}
