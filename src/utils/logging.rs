//! Logging Module
//!
//! Provides structured logging utilities using the `tracing` crate, and the
//! console reporter that prints per-epoch validation metrics during training.

use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use crate::training::history::{EpochRecord, Reporter};
use crate::training::scheduler::Phase;

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Minimum log level to display
    pub level: LogLevel,
    /// Whether to include target (module path)
    pub include_target: bool,
    /// Whether to use ANSI colors
    pub ansi_colors: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            include_target: false,
            ansi_colors: true,
        }
    }
}

impl LogConfig {
    /// Create a verbose logging config for debugging
    pub fn verbose() -> Self {
        Self {
            level: LogLevel::Debug,
            include_target: true,
            ansi_colors: true,
        }
    }
}

/// Log level enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Convert to tracing Level
    pub fn to_tracing_level(&self) -> Level {
        match self {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

/// Initialize logging with the given configuration
///
/// Fails if a global subscriber has already been installed.
pub fn init_logging(config: &LogConfig) -> Result<(), String> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.level.to_tracing_level())
        .with_ansi(config.ansi_colors)
        .with_target(config.include_target)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| format!("Failed to initialize logging: {}", e))?;

    Ok(())
}

/// The per-epoch console line
///
/// The epoch number restarts from 0 in every phase.
pub fn format_epoch_line(record: &EpochRecord) -> String {
    format!(
        "Epoch [{}], val_loss: {:.4}, val_acc: {:.4}",
        record.phase_epoch, record.val_loss, record.val_acc
    )
}

/// Console reporter for training runs
///
/// Prints one `Epoch [n], val_loss: .., val_acc: ..` line per epoch and shows a
/// progress bar over the training batches of the current epoch.
pub struct TrainingLogger {
    total_epochs: usize,
    show_progress: bool,
    progress: Option<ProgressBar>,
    epoch_start: Instant,
    training_start: Instant,
}

impl TrainingLogger {
    /// Create a new training logger
    pub fn new(total_epochs: usize) -> Self {
        Self {
            total_epochs,
            show_progress: true,
            progress: None,
            epoch_start: Instant::now(),
            training_start: Instant::now(),
        }
    }

    /// Disable the per-batch progress bar
    pub fn without_progress(mut self) -> Self {
        self.show_progress = false;
        self
    }

    fn progress_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("  {spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .map(|style| style.progress_chars("#>-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar())
    }
}

impl Reporter for TrainingLogger {
    fn phase_started(&mut self, index: usize, phase: &Phase) {
        tracing::info!(
            "Phase {}: {} epochs at lr = {}",
            index + 1,
            phase.epochs,
            phase.learning_rate
        );
    }

    fn epoch_started(&mut self, epoch: usize, num_batches: usize) {
        self.epoch_start = Instant::now();
        tracing::debug!("Epoch {}/{} started", epoch + 1, self.total_epochs);

        if self.show_progress {
            let pb = ProgressBar::new(num_batches as u64);
            pb.set_style(Self::progress_style());
            self.progress = Some(pb);
        }
    }

    fn batch_finished(&mut self, _batch: usize, loss: f64) {
        if let Some(pb) = &self.progress {
            pb.set_message(format!("loss {:.4}", loss));
            pb.inc(1);
        }
    }

    fn epoch_finished(&mut self, record: &EpochRecord) {
        if let Some(pb) = self.progress.take() {
            pb.finish_and_clear();
        }

        println!("{}", format_epoch_line(record));

        let epochs_done = record.epoch + 1;
        let avg_epoch_secs = self.training_start.elapsed().as_secs_f64() / epochs_done as f64;
        let eta_secs = self.total_epochs.saturating_sub(epochs_done) as f64 * avg_epoch_secs;

        tracing::info!(
            "Epoch {}/{} completed in {:.1}s | Train loss: {:.4} | LR: {} | ETA: {:.0}s",
            epochs_done,
            self.total_epochs,
            self.epoch_start.elapsed().as_secs_f64(),
            record.train_loss,
            record.learning_rate,
            eta_secs
        );
    }
}
