//! Run configuration, loaded from YAML.
use std::time::Duration;

use chp8::prelude::*;
use serde::Deserialize;

use crate::error::AppError;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CliConf {
    pub vm: Chp8Conf,
    /// Stop the machine after this many milliseconds of wall time.
    /// Runs until a fault when not set.
    pub run_for_ms: Option<u64>,
    /// Rate at which the machine is ticked and the display refreshed.
    pub frame_rate: Hz,
    /// Keys held down for the whole run.
    pub held_keys: Vec<KeyCode>,
}

impl Default for CliConf {
    fn default() -> Self {
        Self {
            vm: Chp8Conf::default(),
            run_for_ms: None,
            frame_rate: Hz(60),
            held_keys: vec![],
        }
    }
}

impl CliConf {
    pub fn from_file(filepath: &str) -> Result<Self, AppError> {
        let mut file = std::fs::File::open(filepath)?;

        let conf: CliConf = serde_yaml::from_reader(&mut file)?;
        log::debug!("loaded config: {:#?}", conf);

        Ok(conf)
    }

    pub fn run_for(&self) -> Option<Duration> {
        self.run_for_ms.map(Duration::from_millis)
    }

    pub fn frame_time(&self) -> Duration {
        self.frame_rate.into()
    }
}
