//! CIFAR-10 Classifier CLI
//!
//! Entry point for training and evaluating the batch-normalized CIFAR-10 CNN
//! with the Burn framework.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use burn::module::{AutodiffModule, Module};
use chrono::Local;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::info;

use cifar_bn::backend::{backend_name, default_device, DefaultBackend, TrainingBackend};
use cifar_bn::dataset::{class_name, BatchLoader, Cifar10, Split, SplitConfig, TrainValSplit};
use cifar_bn::model::{CifarNet, CifarNetConfig, OptimizerSettings, TrainingConfig};
use cifar_bn::training::{
    evaluate, load_checkpoint, save_checkpoint, sgd_optimizer, LrSchedule, Trainer,
};
use cifar_bn::utils::logging::{init_logging, LogConfig, TrainingLogger};
use cifar_bn::utils::{format_duration, format_number};

/// CIFAR-10 Image Classification
///
/// Trains a six-convolution CNN with batch normalization on CIFAR-10 using a
/// multi-phase SGD schedule.
#[derive(Parser, Debug)]
#[command(name = "cifar_bn")]
#[command(version)]
#[command(about = "CIFAR-10 CNN with batch normalization, trained with Burn", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, default_value = "false")]
    verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Train the model and report validation metrics per epoch
    Train {
        /// Directory holding cifar-10-batches-bin
        #[arg(short, long, default_value = "data")]
        data_dir: PathBuf,

        /// Output directory for history, config and checkpoint
        #[arg(short, long, default_value = "output")]
        output_dir: PathBuf,

        /// Batch size for training
        #[arg(short, long, default_value = "128")]
        batch_size: usize,

        /// Batch size for validation and test passes
        #[arg(long, default_value = "256")]
        eval_batch_size: usize,

        /// Learning-rate phases as EPOCHS:LR pairs
        #[arg(long, default_value = "10:0.1,10:0.01,10:0.001,10:0.0001")]
        schedule: String,

        /// Images held out from the training corpus for validation
        #[arg(long, default_value = "5000")]
        validation_size: usize,

        /// Random seed for the split and the epoch shuffles
        #[arg(long, default_value = "43")]
        seed: u64,

        /// SGD momentum (plain SGD when omitted)
        #[arg(long)]
        momentum: Option<f64>,

        /// L2 weight decay
        #[arg(long)]
        weight_decay: Option<f32>,

        /// Give every convolution its own BatchNorm layer
        #[arg(long, default_value = "false")]
        separate_norms: bool,

        /// Load the whole run configuration from a JSON file instead
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Hide the per-batch progress bar
        #[arg(long, default_value = "false")]
        no_progress: bool,
    },

    /// Evaluate a saved checkpoint on the test split
    Evaluate {
        /// Path to the model checkpoint
        #[arg(short, long)]
        model: PathBuf,

        /// Directory holding cifar-10-batches-bin
        #[arg(short, long, default_value = "data")]
        data_dir: PathBuf,

        /// Run configuration saved next to the checkpoint
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Batch size for the test pass
        #[arg(long, default_value = "256")]
        eval_batch_size: usize,
    },

    /// Show dataset statistics
    Stats {
        /// Directory holding cifar-10-batches-bin
        #[arg(short, long, default_value = "data")]
        data_dir: PathBuf,

        /// Images held out for validation
        #[arg(long, default_value = "5000")]
        validation_size: usize,

        /// Random seed for the split
        #[arg(long, default_value = "43")]
        seed: u64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_config = if cli.verbose {
        LogConfig::verbose()
    } else {
        LogConfig::default()
    };

    let _ = init_logging(&log_config);

    print_banner();

    match cli.command {
        Commands::Train {
            data_dir,
            output_dir,
            batch_size,
            eval_batch_size,
            schedule,
            validation_size,
            seed,
            momentum,
            weight_decay,
            separate_norms,
            config,
            no_progress,
        } => {
            let config = match config {
                Some(path) => TrainingConfig::load(&path)
                    .with_context(|| format!("Failed to read config {}", path.display()))?,
                None => TrainingConfig {
                    data_dir,
                    output_dir,
                    batch_size,
                    eval_batch_size,
                    split: SplitConfig {
                        validation_size,
                        seed,
                    },
                    schedule: LrSchedule::parse(&schedule)?,
                    optimizer: OptimizerSettings {
                        momentum,
                        weight_decay,
                    },
                    model: CifarNetConfig::new().with_shared_stage_norm(!separate_norms),
                },
            };

            cmd_train(&config, !no_progress)?;
        }

        Commands::Evaluate {
            model,
            data_dir,
            config,
            eval_batch_size,
        } => {
            cmd_evaluate(&model, &data_dir, config.as_deref(), eval_batch_size)?;
        }

        Commands::Stats {
            data_dir,
            validation_size,
            seed,
        } => {
            cmd_stats(&data_dir, &SplitConfig { validation_size, seed })?;
        }
    }

    Ok(())
}

fn print_banner() {
    println!(
        "{}",
        r#"
 +--------------------------------------------------------------+
 |   CIFAR-10 Image Classification                              |
 |   Convolutional network with batch normalization, on Burn    |
 +--------------------------------------------------------------+
  "#
        .green()
    );
}

fn print_class_distribution(title: &str, counts: &[usize]) {
    println!("{}", title.cyan().bold());
    for (label, count) in counts.iter().enumerate() {
        println!(
            "  {:>2} {:<12} {:>7}",
            label,
            class_name(label).unwrap_or("?"),
            format_number(*count)
        );
    }
}

fn cmd_train(config: &TrainingConfig, show_progress: bool) -> Result<()> {
    config.validate()?;

    println!("{}", "Initializing Training...".green().bold());
    let device = default_device();
    println!("  Backend: {}", backend_name());

    std::fs::create_dir_all(&config.output_dir).with_context(|| {
        format!("Failed to create output directory {}", config.output_dir.display())
    })?;

    // Load the dataset
    println!("{}", "Loading Dataset...".cyan());
    let train_corpus = Cifar10::load(&config.data_dir, Split::Train)?;
    let test_corpus = Cifar10::load(&config.data_dir, Split::Test)?;
    println!("  Training corpus: {} images", format_number(train_corpus.len()));
    println!("  Test corpus:     {} images", format_number(test_corpus.len()));
    print_class_distribution(
        "Images per class (training corpus):",
        &train_corpus.class_distribution(),
    );

    let split = TrainValSplit::new(&train_corpus, &config.split)?;
    println!();
    println!("{}", "Dataset Splits:".cyan().bold());
    println!(
        "  Training samples:   {}",
        format_number(split.train.indices().len())
    );
    println!(
        "  Validation samples: {}",
        format_number(split.validation.indices().len())
    );
    println!("  Test samples:       {}", format_number(test_corpus.len()));

    let mut train_loader =
        BatchLoader::<TrainingBackend>::new(split.train, config.batch_size, device.clone())?
            .shuffled(config.split.seed);
    let mut val_loader = BatchLoader::<DefaultBackend>::new(
        split.validation,
        config.eval_batch_size,
        device.clone(),
    )?;
    let mut test_loader = BatchLoader::<DefaultBackend>::new(
        test_corpus.partition(),
        config.eval_batch_size,
        device.clone(),
    )?;

    // Create model
    println!();
    println!("{}", "Creating Model...".cyan());
    let model = config.model.init::<TrainingBackend>(&device);
    println!("  Trainable parameters: {}", format_number(model.num_params()));
    let norms = if config.model.shared_stage_norm {
        "shared"
    } else {
        "separate"
    };
    println!("  Stage norms: {}", norms);

    let optimizer =
        sgd_optimizer::<TrainingBackend, CifarNet<TrainingBackend>>(&config.optimizer);
    let mut trainer = Trainer::<TrainingBackend, _, _>::new(model, optimizer);

    // Print training config
    println!();
    println!("{}", "Training Configuration:".cyan().bold());
    println!("  Epochs:          {}", config.schedule.total_epochs());
    for (i, phase) in config.schedule.iter().enumerate() {
        println!(
            "    Phase {}: {} epochs at lr {}",
            i + 1,
            phase.epochs,
            phase.learning_rate
        );
    }
    println!("  Batch size:      {}", config.batch_size);
    println!("  Eval batch size: {}", config.eval_batch_size);
    println!("  Seed:            {}", config.split.seed);
    println!();

    let baseline = trainer.evaluate_baseline(&mut val_loader)?;
    println!("{} {}", "Before training:".yellow(), baseline);
    println!();

    println!("{}", "Starting Training...".green().bold());
    let started = std::time::Instant::now();
    let mut logger = TrainingLogger::new(config.schedule.total_epochs());
    if !show_progress {
        logger = logger.without_progress();
    }
    trainer.fit(&config.schedule, &mut train_loader, &mut val_loader, &mut logger)?;
    info!("Training took {}", format_duration(started.elapsed().as_secs_f64()));

    // Save history, config and model
    println!();
    println!("{}", "Saving Results...".cyan());
    let history_path = config.output_dir.join("history.json");
    trainer.history().save_json(&history_path)?;
    println!("  History: {:?}", history_path);

    let config_path = config.output_dir.join("config.json");
    config.save(&config_path)?;
    println!("  Config:  {:?}", config_path);

    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let checkpoint_path = config.output_dir.join(format!("cifar_net_{}", timestamp));
    let model = trainer.model().valid();
    save_checkpoint(model.clone(), &checkpoint_path)?;
    println!("  Model:   {:?}", checkpoint_path);

    if let Some(best) = trainer.history().best() {
        println!();
        println!("{}", "Training Complete!".green().bold());
        println!(
            "  Best validation accuracy: {:.4} (epoch {})",
            best.val_acc, best.epoch
        );
    }

    // Final evaluation on the held-out test split
    let test_metrics = evaluate(&model, &mut test_loader)?;
    println!();
    println!("{}", "Test Set:".cyan().bold());
    println!("{}", test_metrics);

    Ok(())
}

fn cmd_evaluate(
    model_path: &Path,
    data_dir: &Path,
    config_path: Option<&Path>,
    eval_batch_size: usize,
) -> Result<()> {
    let model_config = match config_path {
        Some(path) => {
            TrainingConfig::load(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?
                .model
        }
        None => CifarNetConfig::new(),
    };
    model_config.validate()?;

    let device = default_device();
    let model = model_config.init::<DefaultBackend>(&device);
    let model = load_checkpoint(model, model_path, &device)?;
    info!("Loaded model from {}", model_path.display());

    let test_corpus = Cifar10::load(data_dir, Split::Test)?;
    let mut loader =
        BatchLoader::<DefaultBackend>::new(test_corpus.partition(), eval_batch_size, device)?;

    println!("{}", "Evaluating on test split...".cyan());
    let metrics = evaluate(&model, &mut loader)?;
    println!("{}", metrics);

    Ok(())
}

fn cmd_stats(data_dir: &Path, split_config: &SplitConfig) -> Result<()> {
    info!("Computing dataset statistics for: {}", data_dir.display());

    let train_corpus = Cifar10::load(data_dir, Split::Train)?;
    let test_corpus = Cifar10::load(data_dir, Split::Test)?;

    println!("{}", "Dataset Statistics:".cyan().bold());
    println!("  Number of classes: {}", cifar_bn::dataset::NUM_CLASSES);
    println!("  Training corpus:   {} images", format_number(train_corpus.len()));
    println!("  Test corpus:       {} images", format_number(test_corpus.len()));
    println!();
    print_class_distribution(
        "Images per class (training corpus):",
        &train_corpus.class_distribution(),
    );
    println!();
    print_class_distribution(
        "Images per class (test corpus):",
        &test_corpus.class_distribution(),
    );

    let split = TrainValSplit::new(&train_corpus, split_config)?;
    println!();
    println!("{}", format!("Split (seed {}):", split_config.seed).cyan().bold());
    println!("  Training:   {}", format_number(split.train.indices().len()));
    println!(
        "  Validation: {}",
        format_number(split.validation.indices().len())
    );
    print_class_distribution(
        "Images per class (validation):",
        &split.validation.class_distribution(),
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_train_defaults() {
        let cli = Cli::try_parse_from(["cifar_bn", "train"]).unwrap();
        match cli.command {
            Commands::Train {
                batch_size,
                eval_batch_size,
                schedule,
                seed,
                validation_size,
                separate_norms,
                ..
            } => {
                assert_eq!(batch_size, 128);
                assert_eq!(eval_batch_size, 256);
                assert_eq!(seed, 43);
                assert_eq!(validation_size, 5000);
                assert!(!separate_norms);
                assert_eq!(LrSchedule::parse(&schedule).unwrap(), LrSchedule::default());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_evaluate_requires_model() {
        assert!(Cli::try_parse_from(["cifar_bn", "evaluate"]).is_err());
        assert!(Cli::try_parse_from(["cifar_bn", "evaluate", "--model", "out/model"]).is_ok());
    }

    #[test]
    fn test_verbose_flag() {
        let cli = Cli::try_parse_from(["cifar_bn", "-v", "stats"]).unwrap();
        assert!(cli.verbose);
    }
}
