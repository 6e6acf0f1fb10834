use anyhow::{Context, Result};
use std::env::var;
use std::path::PathBuf;

/// Runtime settings, read from the environment
pub struct Config {
    pub data_dir: PathBuf,
    pub candidates: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let data_dir = match var("ZKBALLOT_DATA_DIR") {
            Ok(val) => crate::expand(&val),
            Err(_e) => crate::expand("~/.zkballot"),
        };

        let candidates: usize = match var("ZKBALLOT_CANDIDATES") {
            Ok(val) => val
                .parse()
                .with_context(|| format!("ZKBALLOT_CANDIDATES is not a number: {}", val))?,
            Err(_e) => 3,
        };

        Ok(Config {
            data_dir: PathBuf::from(data_dir),
            candidates,
        })
    }

    /// Path of a named artifact inside the data directory
    pub fn path(&self, name: &str) -> PathBuf {
        self.data_dir.join(name)
    }
}
