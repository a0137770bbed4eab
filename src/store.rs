use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::reading::Reading;

/// Where successful readings go.
pub trait Sink {
    fn store(&mut self, reading: &Reading) -> Result<()>;
}

/// Keeps only the latest reading: the file is truncated and rewritten each time.
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Sink for JsonFileSink {
    fn store(&mut self, reading: &Reading) -> Result<()> {
        let json = reading.to_json().context("cannot serialize reading")?;
        fs::write(&self.path, json)
            .with_context(|| format!("cannot write data file {}", self.path.display()))?;
        Ok(())
    }
}
