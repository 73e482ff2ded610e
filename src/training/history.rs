//! Training history and progress reporting
//!
//! The history is append-only: every finished epoch pushes one record and
//! records are never changed afterwards.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::scheduler::Phase;
use crate::utils::error::Result;
use crate::utils::metrics::EvalMetrics;

/// Metrics of one finished epoch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochRecord {
    /// Epoch index, counted across all phases from 0
    pub epoch: usize,
    /// Index of the phase the epoch belongs to
    pub phase: usize,
    /// Epoch index within its phase, restarting from 0 every phase
    pub phase_epoch: usize,
    pub learning_rate: f64,
    /// Mean training loss over the epoch's batches
    pub train_loss: f64,
    pub val_loss: f64,
    pub val_acc: f64,
}

/// Ordered record of all finished epochs
///
/// `baseline` holds the validation metrics of the model before its first
/// optimizer step, when they were measured.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct History {
    #[serde(default)]
    baseline: Option<EvalMetrics>,
    records: Vec<EpochRecord>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_baseline(&mut self, metrics: EvalMetrics) {
        self.baseline = Some(metrics);
    }

    pub fn baseline(&self) -> Option<&EvalMetrics> {
        self.baseline.as_ref()
    }

    pub fn push(&mut self, record: EpochRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[EpochRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn last(&self) -> Option<&EpochRecord> {
        self.records.last()
    }

    /// Epoch with the highest validation accuracy
    pub fn best(&self) -> Option<&EpochRecord> {
        self.records
            .iter()
            .max_by(|a, b| a.val_acc.total_cmp(&b.val_acc))
    }

    /// Write the baseline and all records as pretty-printed JSON
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// Observer of training progress
///
/// All methods default to doing nothing.
pub trait Reporter {
    fn phase_started(&mut self, _index: usize, _phase: &Phase) {}

    fn epoch_started(&mut self, _epoch: usize, _num_batches: usize) {}

    fn batch_finished(&mut self, _batch: usize, _loss: f64) {}

    fn epoch_finished(&mut self, _record: &EpochRecord) {}
}

/// Reporter that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentReporter;

impl Reporter for SilentReporter {}
