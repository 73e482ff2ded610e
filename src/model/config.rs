//! Run Configuration Module
//!
//! Defines the configuration of a training run: data locations, batch sizes,
//! the train/validation split, the learning-rate schedule, optimizer settings
//! and the model architecture. The defaults reproduce the reference run.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::cnn::CifarNetConfig;
use crate::dataset::split::SplitConfig;
use crate::training::scheduler::LrSchedule;
use crate::utils::error::{CifarError, Result};

/// SGD settings
///
/// Both fields default to `None`, which gives plain SGD.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OptimizerSettings {
    /// Momentum factor (no dampening, no Nesterov)
    pub momentum: Option<f64>,
    /// L2 penalty
    pub weight_decay: Option<f32>,
}

/// Training configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Directory holding the CIFAR-10 binary batches
    pub data_dir: PathBuf,

    /// Directory for history, checkpoint and config output
    pub output_dir: PathBuf,

    /// Batch size for training
    pub batch_size: usize,

    /// Batch size for validation and test passes
    pub eval_batch_size: usize,

    /// Train/validation split
    pub split: SplitConfig,

    /// Ordered learning-rate phases
    pub schedule: LrSchedule,

    /// Optimizer settings
    pub optimizer: OptimizerSettings,

    /// Model architecture
    pub model: CifarNetConfig,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("output"),
            batch_size: 128,
            eval_batch_size: 256,
            split: SplitConfig::default(),
            schedule: LrSchedule::default(),
            optimizer: OptimizerSettings::default(),
            model: CifarNetConfig::new(),
        }
    }
}

impl TrainingConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 || self.eval_batch_size == 0 {
            return Err(CifarError::Config("batch sizes must be greater than 0".to_string()));
        }

        if let Some(momentum) = self.optimizer.momentum {
            if !(0.0..1.0).contains(&momentum) {
                return Err(CifarError::Config(format!(
                    "momentum must be in range [0.0, 1.0), got {}",
                    momentum
                )));
            }
        }

        if let Some(decay) = self.optimizer.weight_decay {
            if !decay.is_finite() || decay < 0.0 {
                return Err(CifarError::Config(format!(
                    "weight_decay must be non-negative, got {}",
                    decay
                )));
            }
        }

        self.schedule.validate()?;
        self.model.validate()
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}
