//! Core shared types for the tire model and the vehicle body.
// tire/types.rs
use std::fmt;

use serde::{Deserialize, Serialize};

/// Scalar type used throughout the physics core.
pub type Real = f64;

/// Discrete simulation time key. Seconds = tick * timestep.
pub type Tick = u64;

pub const GRAVITY: Real = 9.81; // m/s^2

// ============================================
// Wheel identification
// ============================================

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum WheelId { FL, FR, RL, RR }

impl WheelId {
    pub const ALL: [WheelId; 4] = [WheelId::FL, WheelId::FR, WheelId::RL, WheelId::RR];

    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "front_left" => Some(WheelId::FL),
            "front_right" => Some(WheelId::FR),
            "rear_left" => Some(WheelId::RL),
            "rear_right" => Some(WheelId::RR),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WheelId::FL => "front_left",
            WheelId::FR => "front_right",
            WheelId::RL => "rear_left",
            WheelId::RR => "rear_right",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            WheelId::FL => 0,
            WheelId::FR => 1,
            WheelId::RL => 2,
            WheelId::RR => 3,
        }
    }

    pub fn is_front(&self) -> bool {
        matches!(self, WheelId::FL | WheelId::FR)
    }

    pub fn is_rear(&self) -> bool {
        matches!(self, WheelId::RL | WheelId::RR)
    }

    pub fn is_left(&self) -> bool {
        matches!(self, WheelId::FL | WheelId::RL)
    }
}

impl fmt::Display for WheelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================
// Force axes (vehicle frame: x fwd, y left, z up)
// ============================================

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Axis { X, Y, Z }

// ============================================
// Longitudinal driving directive
// ============================================

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LongitudinalMode {
    #[default]
    Accelerate,
    Brake,
    Maintain,
    MatchSpeed {
        target_speed: Real, // m/s
        speed_buffer: Real, // m/s, dead band around target
    },
}

impl fmt::Display for LongitudinalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LongitudinalMode::Accelerate => write!(f, "accelerate"),
            LongitudinalMode::Brake => write!(f, "brake"),
            LongitudinalMode::Maintain => write!(f, "maintain"),
            LongitudinalMode::MatchSpeed { target_speed, .. } => {
                write!(f, "match_speed({target_speed:.2} m/s)")
            }
        }
    }
}
