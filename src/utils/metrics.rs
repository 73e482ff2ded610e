//! Metrics Module
//!
//! Per-batch and per-partition classification metrics.

use std::fmt;

use burn::tensor::{backend::Backend, ElementConversion, Int, Tensor};
use serde::{Deserialize, Serialize};

/// Loss and accuracy of a single evaluated batch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepMetrics {
    /// Mean cross-entropy loss over the batch
    pub loss: f64,
    /// Fraction of correct predictions in the batch
    pub accuracy: f64,
}

/// Aggregated metrics over a whole partition
///
/// Both values are the mean of per-batch values, so a short final batch
/// weighs as much as a full one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvalMetrics {
    pub val_loss: f64,
    pub val_acc: f64,
}

impl EvalMetrics {
    /// Average a sequence of batch metrics. Returns `None` for an empty sequence.
    pub fn from_steps(steps: &[StepMetrics]) -> Option<Self> {
        if steps.is_empty() {
            return None;
        }

        let n = steps.len() as f64;
        let val_loss = steps.iter().map(|s| s.loss).sum::<f64>() / n;
        let val_acc = steps.iter().map(|s| s.accuracy).sum::<f64>() / n;

        Some(Self { val_loss, val_acc })
    }
}

impl fmt::Display for EvalMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{'val_loss': {}, 'val_acc': {}}}",
            self.val_loss, self.val_acc
        )
    }
}

/// Fraction of rows whose highest-scoring class equals the target
pub fn batch_accuracy<B: Backend>(logits: Tensor<B, 2>, targets: Tensor<B, 1, Int>) -> f64 {
    let [batch_size, _] = logits.dims();
    if batch_size == 0 {
        return 0.0;
    }

    let predictions = logits.argmax(1).reshape([batch_size]);
    let correct: i64 = predictions
        .equal(targets)
        .int()
        .sum()
        .into_scalar()
        .elem();

    correct as f64 / batch_size as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::TensorData;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_batch_accuracy() {
        let device = Default::default();
        let logits = Tensor::<TestBackend, 2>::from_data(
            TensorData::new(vec![0.9f32, 0.1, 0.2, 0.8, 0.7, 0.3, 0.4, 0.6], [4, 2]),
            &device,
        );
        let targets = Tensor::<TestBackend, 1, Int>::from_data(
            TensorData::new(vec![0i64, 1, 1, 1], [4]),
            &device,
        );

        let acc = batch_accuracy(logits, targets);
        assert!((acc - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_from_steps_averages_batches() {
        let steps = [
            StepMetrics { loss: 2.0, accuracy: 0.5 },
            StepMetrics { loss: 1.0, accuracy: 1.0 },
        ];
        let metrics = EvalMetrics::from_steps(&steps).unwrap();
        assert!((metrics.val_loss - 1.5).abs() < 1e-12);
        assert!((metrics.val_acc - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_from_steps_empty() {
        assert!(EvalMetrics::from_steps(&[]).is_none());
    }

    #[test]
    fn test_display_matches_summary_format() {
        let metrics = EvalMetrics {
            val_loss: 0.5,
            val_acc: 0.25,
        };
        assert_eq!(metrics.to_string(), "{'val_loss': 0.5, 'val_acc': 0.25}");
    }
}
