//! # CIFAR-10 Classifier with Batch Normalization
//!
//! A Rust library for training a small convolutional image classifier on
//! CIFAR-10 using the Burn framework.
//!
//! ## Features
//!
//! - **CIFAR-10 binary corpus** reader with a seeded train/validation split
//! - **Burn framework** CNN with batch normalization, trained on the CPU (NdArray) backend
//! - **Multi-phase SGD** driven by an explicit learning-rate schedule
//! - **History** of per-epoch validation metrics, saved as JSON
//!
//! ## Modules
//!
//! - `dataset`: Corpus reading, splitting, batching and loaders
//! - `model`: CNN architecture, classifier trait and run configuration
//! - `training`: Training loop, schedules, evaluation and history
//! - `utils`: Errors, logging, metrics and helper functions
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cifar_bn::backend::{default_device, TrainingBackend};
//! use cifar_bn::dataset::{Cifar10, Split};
//! use cifar_bn::model::CifarNetConfig;
//!
//! let train = Cifar10::load("data", Split::Train)?;
//! let model = CifarNetConfig::new().init::<TrainingBackend>(&default_device());
//! // ... split, build loaders and call Trainer::fit
//! ```

pub mod backend;
pub mod dataset;
pub mod model;
pub mod training;
pub mod utils;

// Re-export commonly used items for convenience
pub use dataset::{
    BatchLoader, Cifar10, CifarBatch, CifarBatcher, CifarItem, Partition, Split, SplitConfig,
    TrainValSplit,
};
pub use model::{CifarNet, CifarNetConfig, ImageClassifier, TrainingConfig};
pub use training::{evaluate, History, LrSchedule, Phase, Trainer};
pub use utils::error::{CifarError, Result};
pub use utils::metrics::EvalMetrics;

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
