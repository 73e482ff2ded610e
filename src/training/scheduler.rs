//! Learning Rate Schedule Module
//!
//! Training runs as an ordered list of phases, each a number of epochs at a
//! constant learning rate. The default schedule divides the rate by ten every
//! ten epochs.

use serde::{Deserialize, Serialize};

use crate::utils::error::{CifarError, Result};

/// A run of epochs at one learning rate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    pub epochs: usize,
    pub learning_rate: f64,
}

impl Phase {
    pub fn new(epochs: usize, learning_rate: f64) -> Self {
        Self {
            epochs,
            learning_rate,
        }
    }
}

/// Ordered sequence of training phases
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LrSchedule {
    pub phases: Vec<Phase>,
}

impl Default for LrSchedule {
    fn default() -> Self {
        Self::new(vec![
            Phase::new(10, 1e-1),
            Phase::new(10, 1e-2),
            Phase::new(10, 1e-3),
            Phase::new(10, 1e-4),
        ])
    }
}

impl LrSchedule {
    pub fn new(phases: Vec<Phase>) -> Self {
        Self { phases }
    }

    /// A single phase at a constant learning rate
    pub fn constant(epochs: usize, learning_rate: f64) -> Self {
        Self::new(vec![Phase::new(epochs, learning_rate)])
    }

    /// Parse a list like `10:0.1,10:0.01`
    pub fn parse(s: &str) -> Result<Self> {
        let phases = s
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| {
                let (epochs, lr) = part.split_once(':').ok_or_else(|| {
                    CifarError::Config(format!("phase '{}' must look like EPOCHS:LR", part))
                })?;
                let epochs = epochs.trim().parse::<usize>().map_err(|e| {
                    CifarError::Config(format!("invalid epoch count in '{}': {}", part, e))
                })?;
                let learning_rate = lr.trim().parse::<f64>().map_err(|e| {
                    CifarError::Config(format!("invalid learning rate in '{}': {}", part, e))
                })?;
                Ok(Phase::new(epochs, learning_rate))
            })
            .collect::<Result<Vec<_>>>()?;

        let schedule = Self::new(phases);
        schedule.validate()?;
        Ok(schedule)
    }

    /// Validate the schedule
    pub fn validate(&self) -> Result<()> {
        if self.phases.is_empty() {
            return Err(CifarError::Config("schedule has no phases".to_string()));
        }

        for (i, phase) in self.phases.iter().enumerate() {
            if phase.epochs == 0 {
                return Err(CifarError::Config(format!("phase {} has zero epochs", i + 1)));
            }
            if !phase.learning_rate.is_finite() || phase.learning_rate <= 0.0 {
                return Err(CifarError::Config(format!(
                    "phase {} has invalid learning rate {}",
                    i + 1,
                    phase.learning_rate
                )));
            }
        }

        Ok(())
    }

    /// Total number of epochs over all phases
    pub fn total_epochs(&self) -> usize {
        self.phases.iter().map(|p| p.epochs).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Phase> {
        self.phases.iter()
    }
}
