//! Classifier capability shared by the training loop and the evaluator
//!
//! A model only has to provide `forward` and an input check; the loss and
//! metric computations for a batch come with the trait.

use burn::{
    nn::loss::CrossEntropyLossConfig,
    tensor::{backend::Backend, ElementConversion, Tensor},
};

use super::cnn::CifarNet;
use crate::dataset::CifarBatch;
use crate::utils::error::Result;
use crate::utils::metrics::{batch_accuracy, StepMetrics};

/// An image classifier producing one logit per class
pub trait ImageClassifier<B: Backend> {
    /// Images [batch_size, channels, height, width] -> logits [batch_size, num_classes]
    fn logits(&self, images: Tensor<B, 4>) -> Tensor<B, 2>;

    /// Reject a batch layout the model cannot consume
    fn check_input(&self, dims: [usize; 4]) -> Result<()>;

    /// Mean cross-entropy loss of a batch, ready for `backward()`
    fn training_step(&self, batch: &CifarBatch<B>) -> Result<Tensor<B, 1>> {
        self.check_input(batch.images.dims())?;

        let logits = self.logits(batch.images.clone());
        let loss = CrossEntropyLossConfig::new()
            .init(&logits.device())
            .forward(logits, batch.targets.clone());

        Ok(loss)
    }

    /// Loss and accuracy of a batch as plain numbers
    fn validation_step(&self, batch: &CifarBatch<B>) -> Result<StepMetrics> {
        self.check_input(batch.images.dims())?;

        let logits = self.logits(batch.images.clone()).detach();
        let loss = CrossEntropyLossConfig::new()
            .init(&logits.device())
            .forward(logits.clone(), batch.targets.clone());

        Ok(StepMetrics {
            loss: loss.into_scalar().elem::<f64>(),
            accuracy: batch_accuracy(logits, batch.targets.clone()),
        })
    }
}

impl<B: Backend> ImageClassifier<B> for CifarNet<B> {
    fn logits(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        self.forward(images)
    }

    fn check_input(&self, dims: [usize; 4]) -> Result<()> {
        CifarNet::check_input(self, dims)
    }
}
