//! Pipeline configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::batch::BatchSize;
use crate::{ConfigError, ValidationError};

/// Tuning knobs for an enrichment run.
///
/// Memory is bounded by roughly `batch_size * (max_in_flight_batches + 1)`
/// records: the batches being resolved plus the one being assembled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Records per batched cache lookup.
    pub batch_size: BatchSize,
    /// Batches allowed to be resolving or awaiting emission at once.
    pub max_in_flight_batches: usize,
}

impl PipelineConfig {
    pub const DEFAULT_MAX_IN_FLIGHT: usize = 2;

    pub fn new(batch_size: usize, max_in_flight_batches: usize) -> Result<Self, ValidationError> {
        let config = Self {
            batch_size: BatchSize::new(batch_size)?,
            max_in_flight_batches,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_in_flight_batches == 0 {
            return Err(ValidationError::ZeroInFlight);
        }
        Ok(())
    }

    /// Load a JSON config file; absent fields keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: BatchSize::default(),
            max_in_flight_batches: Self::DEFAULT_MAX_IN_FLIGHT,
        }
    }
}
