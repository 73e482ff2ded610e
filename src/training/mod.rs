//! Training module for the CIFAR-10 classifier
//!
//! This module provides:
//! - The multi-phase SGD training loop
//! - Learning-rate phase schedules
//! - Partition evaluation
//! - The per-epoch history and progress reporting hooks

pub mod evaluator;
pub mod history;
pub mod scheduler;
pub mod trainer;

// Re-export main types for convenience
pub use evaluator::evaluate;
pub use history::{EpochRecord, History, Reporter, SilentReporter};
pub use scheduler::{LrSchedule, Phase};
pub use trainer::{load_checkpoint, save_checkpoint, sgd_optimizer, LoopState, Trainer};
