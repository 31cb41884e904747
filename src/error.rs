use std::io;

use thiserror::Error;

use crate::contact::ForceChannel;
use crate::tire::types::Tick;

pub type Result<T> = std::result::Result<T, SimError>;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("invalid configuration for `{component}`: {reason}")]
    Config { component: String, reason: String },

    #[error("contact point `{point}` is missing {missing:?} at tick {tick}")]
    MissingForce {
        point: String,
        tick: Tick,
        missing: Vec<ForceChannel>,
    },

    #[error("contact point `{point}` does not declare force channel `{channel}`")]
    UndeclaredChannel { point: String, channel: ForceChannel },

    #[error("contact point `{point}` has no tire")]
    NotATire { point: String },

    #[error("vehicle body must be initialized before stepping")]
    NotInitialized,

    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),
}

impl SimError {
    pub fn config(component: impl Into<String>, reason: impl Into<String>) -> Self {
        SimError::Config {
            component: component.into(),
            reason: reason.into(),
        }
    }
}
