//! Model module for the CIFAR-10 CNN using the Burn framework
//!
//! This module provides:
//! - The CNN architecture with batch normalization
//! - The classifier trait used by training and evaluation
//! - Run configuration and hyperparameters

pub mod classifier;
pub mod cnn;
pub mod config;

// Re-export main types for convenience
pub use classifier::ImageClassifier;
pub use cnn::{CifarNet, CifarNetConfig};
pub use config::{OptimizerSettings, TrainingConfig};
