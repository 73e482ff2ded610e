//! Training Loop Module
//!
//! This module implements the multi-phase training loop using the Burn
//! framework directly: one SGD update per training batch, a full validation
//! pass after every epoch, and one history record per epoch.

use std::marker::PhantomData;
use std::path::Path;

use burn::{
    module::{AutodiffModule, Module},
    optim::{
        decay::WeightDecayConfig, momentum::MomentumConfig, GradientsParams, Optimizer, SgdConfig,
    },
    record::CompactRecorder,
    tensor::{
        backend::{AutodiffBackend, Backend},
        ElementConversion,
    },
};
use tracing::{debug, info};

use super::evaluator::evaluate;
use super::history::{EpochRecord, History, Reporter};
use super::scheduler::LrSchedule;
use crate::dataset::{BatchLoader, CifarBatch};
use crate::model::classifier::ImageClassifier;
use crate::model::config::OptimizerSettings;
use crate::utils::error::{CifarError, Result};
use crate::utils::metrics::EvalMetrics;

/// Where the loop currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Between epochs, parameters are stable
    EpochBoundary,
    /// Applying optimizer steps over training batches
    Training,
    /// Running the validation pass of the current epoch
    Validating,
    /// Every phase of the schedule has finished
    Done,
}

/// Build the SGD optimizer described by `settings`
pub fn sgd_optimizer<B, M>(settings: &OptimizerSettings) -> impl Optimizer<M, B>
where
    B: AutodiffBackend,
    M: AutodiffModule<B>,
{
    let mut config = SgdConfig::new();
    if let Some(momentum) = settings.momentum {
        config = config.with_momentum(Some(
            MomentumConfig::new()
                .with_momentum(momentum)
                .with_dampening(0.0),
        ));
    }
    if let Some(penalty) = settings.weight_decay {
        config = config.with_weight_decay(Some(WeightDecayConfig::new(penalty)));
    }
    config.init()
}

/// Owns the model and optimizer for the whole run
///
/// The optimizer is shared by every phase, only the learning rate changes.
pub struct Trainer<B, M, O>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + ImageClassifier<B>,
    O: Optimizer<M, B>,
{
    model: M,
    optimizer: O,
    history: History,
    state: LoopState,
    _backend: PhantomData<B>,
}

impl<B, M, O> Trainer<B, M, O>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + ImageClassifier<B>,
    O: Optimizer<M, B>,
{
    pub fn new(model: M, optimizer: O) -> Self {
        Self {
            model,
            optimizer,
            history: History::new(),
            state: LoopState::EpochBoundary,
            _backend: PhantomData,
        }
    }

    /// One forward/backward pass and parameter update; returns the batch loss
    pub fn train_step(&mut self, batch: &CifarBatch<B>, learning_rate: f64) -> Result<f64> {
        let loss = self.model.training_step(batch)?;
        let loss_value: f64 = loss.clone().into_scalar().elem();

        let grads = loss.backward();
        let grads = GradientsParams::from_grads(grads, &self.model);
        self.model = self.optimizer.step(learning_rate, self.model.clone(), grads);

        Ok(loss_value)
    }

    /// Run every phase of `schedule`
    ///
    /// Epoch indices continue from the current history, so calling `fit`
    /// again extends the same history.
    pub fn fit<R: Reporter>(
        &mut self,
        schedule: &LrSchedule,
        train_loader: &mut BatchLoader<B>,
        val_loader: &mut BatchLoader<B::InnerBackend>,
        reporter: &mut R,
    ) -> Result<&History>
    where
        M::InnerModule: ImageClassifier<B::InnerBackend>,
    {
        schedule.validate()?;
        if train_loader.is_empty() {
            return Err(CifarError::EmptyPartition(
                train_loader.partition().name().to_string(),
            ));
        }

        info!(
            "Training for {} epochs in {} phases ({} batches per epoch)",
            schedule.total_epochs(),
            schedule.phases.len(),
            train_loader.num_batches()
        );

        for (phase_index, phase) in schedule.iter().enumerate() {
            reporter.phase_started(phase_index, phase);

            for phase_epoch in 0..phase.epochs {
                let epoch = self.history.len();

                self.state = LoopState::Training;
                reporter.epoch_started(epoch, train_loader.num_batches());

                let mut loss_sum = 0.0;
                let mut num_batches = 0usize;
                for (batch_index, batch) in train_loader.iter().enumerate() {
                    let loss = self.train_step(&batch, phase.learning_rate)?;
                    reporter.batch_finished(batch_index, loss);
                    loss_sum += loss;
                    num_batches += 1;
                }

                self.state = LoopState::Validating;
                let metrics = self.validate(val_loader)?;

                let record = EpochRecord {
                    epoch,
                    phase: phase_index,
                    phase_epoch,
                    learning_rate: phase.learning_rate,
                    train_loss: loss_sum / num_batches.max(1) as f64,
                    val_loss: metrics.val_loss,
                    val_acc: metrics.val_acc,
                };
                debug!("Finished epoch {:?}", record);

                reporter.epoch_finished(&record);
                self.history.push(record);
                self.state = LoopState::EpochBoundary;
            }
        }

        self.state = LoopState::Done;
        Ok(&self.history)
    }

    /// Evaluate the current parameters in inference mode
    pub fn validate(&self, loader: &mut BatchLoader<B::InnerBackend>) -> Result<EvalMetrics>
    where
        M::InnerModule: ImageClassifier<B::InnerBackend>,
    {
        evaluate(&self.model.valid(), loader)
    }

    /// Evaluate the untrained parameters and keep the result in the history
    pub fn evaluate_baseline(
        &mut self,
        loader: &mut BatchLoader<B::InnerBackend>,
    ) -> Result<EvalMetrics>
    where
        M::InnerModule: ImageClassifier<B::InnerBackend>,
    {
        let metrics = self.validate(loader)?;
        info!("Baseline before training: {}", metrics);
        self.history.set_baseline(metrics);
        Ok(metrics)
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn into_model(self) -> M {
        self.model
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn state(&self) -> LoopState {
        self.state
    }
}

/// Save module parameters with the compact (half precision) recorder
pub fn save_checkpoint<B: Backend, M: Module<B>>(model: M, path: &Path) -> Result<()> {
    model
        .save_file(path.to_path_buf(), &CompactRecorder::new())
        .map_err(|e| CifarError::Checkpoint(format!("Failed to save model: {:?}", e)))
}

/// Load parameters saved by `save_checkpoint` into `model`
pub fn load_checkpoint<B: Backend, M: Module<B>>(
    model: M,
    path: &Path,
    device: &B::Device,
) -> Result<M> {
    model
        .load_file(path.to_path_buf(), &CompactRecorder::new(), device)
        .map_err(|e| CifarError::Checkpoint(format!("Failed to load model: {:?}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{CifarItem, Partition, IMAGE_BYTES};
    use crate::model::cnn::{CifarNet, CifarNetConfig};
    use crate::training::history::SilentReporter;
    use crate::training::scheduler::Phase;
    use burn::backend::Autodiff;
    use burn_ndarray::NdArray;
    use std::sync::Arc;
    use tempfile::tempdir;

    type InnerBackend = NdArray;
    type TestBackend = Autodiff<InnerBackend>;

    fn partition(name: &str, n: usize, offset: usize) -> Partition {
        let items = (0..n)
            .map(|i| {
                let value = ((i + offset) * 29 % 256) as u8;
                CifarItem::new(vec![value; IMAGE_BYTES], (i + offset) % 10).unwrap()
            })
            .collect();
        Partition::full(name, Arc::new(items))
    }

    fn trainer(
        settings: &OptimizerSettings,
    ) -> Trainer<
        TestBackend,
        CifarNet<TestBackend>,
        impl Optimizer<CifarNet<TestBackend>, TestBackend>,
    > {
        let model = CifarNetConfig::new().init::<TestBackend>(&Default::default());
        trainer_with(model, settings)
    }

    fn trainer_with(
        model: CifarNet<TestBackend>,
        settings: &OptimizerSettings,
    ) -> Trainer<
        TestBackend,
        CifarNet<TestBackend>,
        impl Optimizer<CifarNet<TestBackend>, TestBackend>,
    > {
        Trainer::new(
            model,
            sgd_optimizer::<TestBackend, CifarNet<TestBackend>>(settings),
        )
    }

    fn fc2_weights(model: &CifarNet<TestBackend>) -> Vec<f32> {
        model.fc2.weight.val().into_data().to_vec::<f32>().unwrap()
    }

    #[test]
    fn test_train_step_updates_parameters() {
        let mut trainer = trainer(&OptimizerSettings::default());
        let mut loader =
            BatchLoader::<TestBackend>::new(partition("train", 4, 0), 4, Default::default())
                .unwrap();
        let batch = loader.iter().next().unwrap();

        let before = fc2_weights(trainer.model());
        let loss = trainer.train_step(&batch, 0.1).unwrap();
        let after = fc2_weights(trainer.model());

        assert!(loss > 0.0);
        assert_ne!(before, after);
    }

    #[test]
    fn test_fit_runs_every_phase() {
        let mut trainer = trainer(&OptimizerSettings {
            momentum: Some(0.9),
            weight_decay: None,
        });
        assert_eq!(trainer.state(), LoopState::EpochBoundary);

        let mut train_loader =
            BatchLoader::<TestBackend>::new(partition("train", 6, 0), 4, Default::default())
                .unwrap()
                .shuffled(43);
        let mut val_loader = BatchLoader::<InnerBackend>::new(
            partition("validation", 4, 6),
            4,
            Default::default(),
        )
        .unwrap();

        let schedule = LrSchedule::new(vec![Phase::new(2, 0.1), Phase::new(1, 0.01)]);
        let history = trainer
            .fit(&schedule, &mut train_loader, &mut val_loader, &mut SilentReporter)
            .unwrap();

        assert_eq!(history.len(), 3);
        let phases: Vec<usize> = history.records().iter().map(|r| r.phase).collect();
        assert_eq!(phases, vec![0, 0, 1]);
        let epochs: Vec<usize> = history.records().iter().map(|r| r.epoch).collect();
        assert_eq!(epochs, vec![0, 1, 2]);
        let phase_epochs: Vec<usize> = history.records().iter().map(|r| r.phase_epoch).collect();
        assert_eq!(phase_epochs, vec![0, 1, 0]);

        for record in history.records() {
            assert!(record.train_loss >= 0.0);
            assert!(record.val_loss >= 0.0);
            assert!((0.0..=1.0).contains(&record.val_acc));
        }
        assert_eq!(trainer.state(), LoopState::Done);
    }

    #[test]
    fn test_momentum_carries_across_phases() {
        let settings = OptimizerSettings {
            momentum: Some(0.9),
            weight_decay: None,
        };
        let model = CifarNetConfig::new()
            .with_dropout(0.0)
            .init::<TestBackend>(&Default::default());
        let loaders = || {
            (
                BatchLoader::<TestBackend>::new(partition("train", 4, 0), 4, Default::default())
                    .unwrap(),
                BatchLoader::<InnerBackend>::new(
                    partition("validation", 2, 4),
                    2,
                    Default::default(),
                )
                .unwrap(),
            )
        };
        let one_epoch = LrSchedule::constant(1, 0.1);

        // One trainer, one optimizer for both phases
        let mut kept = trainer_with(model.clone(), &settings);
        let (mut train_loader, mut val_loader) = loaders();
        kept.fit(
            &LrSchedule::new(vec![Phase::new(1, 0.1), Phase::new(1, 0.1)]),
            &mut train_loader,
            &mut val_loader,
            &mut SilentReporter,
        )
        .unwrap();

        // A fresh optimizer for the second phase
        let (mut train_loader, mut val_loader) = loaders();
        let mut first = trainer_with(model, &settings);
        first
            .fit(&one_epoch, &mut train_loader, &mut val_loader, &mut SilentReporter)
            .unwrap();
        let mut second = trainer_with(first.into_model(), &settings);
        second
            .fit(&one_epoch, &mut train_loader, &mut val_loader, &mut SilentReporter)
            .unwrap();

        assert_eq!(kept.history().len(), 2);
        assert_ne!(fc2_weights(kept.model()), fc2_weights(second.model()));
    }

    #[test]
    fn test_baseline_is_kept_in_history() {
        let mut trainer = trainer(&OptimizerSettings::default());
        let mut val_loader = BatchLoader::<InnerBackend>::new(
            partition("validation", 3, 0),
            2,
            Default::default(),
        )
        .unwrap();
        assert!(trainer.history().baseline().is_none());

        let baseline = trainer.evaluate_baseline(&mut val_loader).unwrap();
        assert_eq!(trainer.history().baseline(), Some(&baseline));
        assert!(trainer.history().is_empty());
        assert_eq!(trainer.state(), LoopState::EpochBoundary);
    }

    #[test]
    fn test_validate_does_not_change_parameters() {
        let trainer = trainer(&OptimizerSettings::default());
        let mut val_loader = BatchLoader::<InnerBackend>::new(
            partition("validation", 5, 0),
            2,
            Default::default(),
        )
        .unwrap();

        let before = fc2_weights(trainer.model());
        let first = trainer.validate(&mut val_loader).unwrap();
        let second = trainer.validate(&mut val_loader).unwrap();

        assert_eq!(first, second);
        assert_eq!(before, fc2_weights(trainer.model()));
    }

    #[test]
    fn test_fit_rejects_invalid_schedule() {
        let mut trainer = trainer(&OptimizerSettings::default());
        let mut train_loader =
            BatchLoader::<TestBackend>::new(partition("train", 2, 0), 2, Default::default())
                .unwrap();
        let mut val_loader =
            BatchLoader::<InnerBackend>::new(partition("validation", 2, 2), 2, Default::default())
                .unwrap();

        let result = trainer.fit(
            &LrSchedule::constant(1, -1.0),
            &mut train_loader,
            &mut val_loader,
            &mut SilentReporter,
        );
        assert!(matches!(result, Err(CifarError::Config(_))));
        assert!(trainer.history().is_empty());
    }

    #[test]
    fn test_checkpoint_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("model");
        let device = Default::default();

        let model = CifarNetConfig::new().init::<InnerBackend>(&device);
        let expected = model.fc1.bias.as_ref().map(|b| b.val().dims());
        save_checkpoint(model, &path).unwrap();

        let fresh = CifarNetConfig::new().init::<InnerBackend>(&device);
        let loaded = load_checkpoint(fresh, &path, &device).unwrap();
        assert_eq!(loaded.fc1.bias.as_ref().map(|b| b.val().dims()), expected);
    }

    #[test]
    fn test_missing_checkpoint_is_reported() {
        let dir = tempdir().unwrap();
        let device = Default::default();
        let model = CifarNetConfig::new().init::<InnerBackend>(&device);

        let result = load_checkpoint(model, &dir.path().join("absent"), &device);
        assert!(matches!(result, Err(CifarError::Checkpoint(_))));
    }
}
