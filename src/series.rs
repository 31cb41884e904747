// ==============================================================================
// series.rs — TIME-INDEXED HISTORY (FIXED-SCHEMA RECORDS)
// ==============================================================================
// A TimeSeries maps integer ticks to one record per tick. Every record type has
// a fixed set of optional scalar fields; 3-D quantities are stored as three
// fields (x/y/z), never as one cell.
//
// update(tick, partial):
// - new tick      -> the partial record is stored as-is
// - existing tick -> only fields that are Some in `partial` are overwritten
//
// Each series starts with an all-zero row at tick 0.
// ==============================================================================

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use serde::Serialize;

use crate::tire::types::{Real, Tick};

pub trait Record: Clone + Default {
    /// Column names, in the order `values()` yields them.
    const FIELDS: &'static [&'static str];

    fn zeroed() -> Self;
    fn merge(&mut self, partial: &Self);
    fn values(&self) -> Vec<Option<Real>>;

    fn get(&self, field: &str) -> Option<Real> {
        let i = Self::FIELDS.iter().position(|f| *f == field)?;
        self.values()[i]
    }
}

macro_rules! record {
    ($(#[$meta:meta])* $name:ident { $($field:ident),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
        pub struct $name {
            $(pub $field: Option<Real>,)+
        }

        impl Record for $name {
            const FIELDS: &'static [&'static str] = &[$(stringify!($field)),+];

            fn zeroed() -> Self {
                Self { $($field: Some(0.0),)+ }
            }

            fn merge(&mut self, partial: &Self) {
                $(
                    if partial.$field.is_some() {
                        self.$field = partial.$field;
                    }
                )+
            }

            fn values(&self) -> Vec<Option<Real>> {
                vec![$(self.$field),+]
            }
        }
    };
}

record! {
    /// Per-tick tire state, written by the owning contact point.
    TireRecord {
        vertical_load,
        vx,
        fx,
        fy,
        mz,
        max_fx,
        desired_fx,
        desired_fy,
        slip_ratio,
        slip_angle,
        angular_velocity,
        temperature,
        wear,
        kappa_prime,
        alpha_prime,
        transient_fx,
        transient_fy,
    }
}

record! {
    /// Body kinematics and resultant. Acceleration and resultant are written
    /// at the tick that produced them; velocity and position one tick ahead.
    BodyRecord {
        accel_x,
        accel_y,
        accel_z,
        vel_x,
        vel_y,
        vel_z,
        pos_x,
        pos_y,
        pos_z,
        yaw_deg,
        yaw_rate,
        yaw_accel,
        force_x,
        force_y,
        force_z,
        torque_x,
        torque_y,
        torque_z,
    }
}

record! {
    /// Motor usage; `continuous` is 1.0 when within the continuous curve.
    MotorRecord {
        torque,
        rpm,
        continuous,
    }
}

#[derive(Debug, Clone)]
pub struct TimeSeries<R: Record> {
    rows: BTreeMap<Tick, R>,
}

impl<R: Record> Default for TimeSeries<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Record> TimeSeries<R> {
    pub fn new() -> Self {
        let mut rows = BTreeMap::new();
        rows.insert(0, R::zeroed());
        Self { rows }
    }

    pub fn update(&mut self, tick: Tick, partial: R) {
        match self.rows.entry(tick) {
            Entry::Occupied(mut row) => row.get_mut().merge(&partial),
            Entry::Vacant(slot) => {
                slot.insert(partial);
            }
        }
    }

    pub fn get(&self, tick: Tick) -> Option<&R> {
        self.rows.get(&tick)
    }

    pub fn value(&self, tick: Tick, field: &str) -> Option<Real> {
        self.rows.get(&tick)?.get(field)
    }

    pub fn latest(&self) -> Option<(Tick, &R)> {
        self.rows.iter().next_back().map(|(t, r)| (*t, r))
    }

    pub fn ticks(&self) -> impl Iterator<Item = Tick> + '_ {
        self.rows.keys().copied()
    }

    pub fn rows(&self) -> impl Iterator<Item = (Tick, &R)> + '_ {
        self.rows.iter().map(|(t, r)| (*t, r))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_with_zero_row() {
        let s: TimeSeries<MotorRecord> = TimeSeries::new();
        assert_eq!(s.len(), 1);
        assert_eq!(s.value(0, "torque"), Some(0.0));
        assert_eq!(s.value(0, "rpm"), Some(0.0));
    }

    #[test]
    fn update_merges_only_supplied_fields() {
        let mut s: TimeSeries<MotorRecord> = TimeSeries::new();
        s.update(3, MotorRecord { torque: Some(120.0), ..Default::default() });
        assert_eq!(s.value(3, "torque"), Some(120.0));
        assert_eq!(s.value(3, "rpm"), None);

        s.update(3, MotorRecord { rpm: Some(4000.0), ..Default::default() });
        assert_eq!(s.value(3, "torque"), Some(120.0));
        assert_eq!(s.value(3, "rpm"), Some(4000.0));

        s.update(0, MotorRecord { torque: Some(5.0), ..Default::default() });
        assert_eq!(s.value(0, "torque"), Some(5.0));
        assert_eq!(s.value(0, "rpm"), Some(0.0));
    }

    #[test]
    fn random_access_and_latest() {
        let mut s: TimeSeries<BodyRecord> = TimeSeries::new();
        s.update(10, BodyRecord { vel_x: Some(2.0), ..Default::default() });
        s.update(4, BodyRecord { vel_x: Some(1.0), ..Default::default() });

        assert_eq!(s.ticks().collect::<Vec<_>>(), vec![0, 4, 10]);
        let (tick, row) = s.latest().unwrap();
        assert_eq!(tick, 10);
        assert_eq!(row.vel_x, Some(2.0));
        assert!(s.get(7).is_none());
        assert_eq!(s.value(4, "no_such_field"), None);
    }

    #[test]
    fn field_names_follow_declaration_order() {
        assert_eq!(MotorRecord::FIELDS, &["torque", "rpm", "continuous"]);
        assert_eq!(BodyRecord::FIELDS.len(), BodyRecord::zeroed().values().len());
        assert_eq!(TireRecord::FIELDS.len(), TireRecord::zeroed().values().len());
    }
}
