//! Model evaluation
//!
//! Computes mean loss and mean accuracy over a partition. The model is taken
//! by reference and no parameter is touched, so evaluating twice without
//! training in between gives the same numbers.

use burn::tensor::backend::Backend;
use tracing::debug;

use crate::dataset::loader::BatchLoader;
use crate::model::classifier::ImageClassifier;
use crate::utils::error::{CifarError, Result};
use crate::utils::metrics::{EvalMetrics, StepMetrics};

/// Evaluate `model` on every batch of `loader`
///
/// Metrics are the mean of per-batch means. Pass an inference-mode model
/// (`AutodiffModule::valid()`), so dropout is off and batch norm uses its
/// running statistics.
pub fn evaluate<B, M>(model: &M, loader: &mut BatchLoader<B>) -> Result<EvalMetrics>
where
    B: Backend,
    M: ImageClassifier<B>,
{
    let mut steps: Vec<StepMetrics> = Vec::with_capacity(loader.num_batches());
    for batch in loader.iter() {
        steps.push(model.validation_step(&batch)?);
    }

    let metrics = EvalMetrics::from_steps(&steps)
        .ok_or_else(|| CifarError::EmptyPartition(loader.partition().name().to_string()))?;

    debug!(
        "Evaluated {} batches of '{}': loss {:.4}, acc {:.4}",
        steps.len(),
        loader.partition().name(),
        metrics.val_loss,
        metrics.val_acc
    );

    Ok(metrics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{CifarItem, Partition, IMAGE_BYTES};
    use crate::model::cnn::CifarNetConfig;
    use burn_ndarray::NdArray;
    use std::sync::Arc;

    type TestBackend = NdArray;

    fn loader(n: usize, batch_size: usize) -> BatchLoader<TestBackend> {
        let items = (0..n)
            .map(|i| CifarItem::new(vec![(i * 13 % 256) as u8; IMAGE_BYTES], i % 10).unwrap())
            .collect();
        let partition = Partition::full("validation", Arc::new(items));
        BatchLoader::new(partition, batch_size, Default::default()).unwrap()
    }

    #[test]
    fn test_metrics_in_range() {
        let model = CifarNetConfig::new().init::<TestBackend>(&Default::default());
        let metrics = evaluate(&model, &mut loader(10, 4)).unwrap();

        assert!(metrics.val_loss >= 0.0);
        assert!((0.0..=1.0).contains(&metrics.val_acc));
    }

    #[test]
    fn test_evaluation_is_idempotent() {
        let model = CifarNetConfig::new().init::<TestBackend>(&Default::default());
        let mut loader = loader(9, 4);

        let first = evaluate(&model, &mut loader).unwrap();
        let second = evaluate(&model, &mut loader).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_partition_is_an_error() {
        let model = CifarNetConfig::new().init::<TestBackend>(&Default::default());
        let partition = Partition::full("validation", Arc::new(Vec::new()));
        let mut loader =
            BatchLoader::<TestBackend>::new(partition, 8, Default::default()).unwrap();

        match evaluate(&model, &mut loader) {
            Err(CifarError::EmptyPartition(name)) => assert_eq!(name, "validation"),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
