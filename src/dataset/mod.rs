//! Dataset module for CIFAR-10 data handling
//!
//! This module provides functionality for:
//! - Reading the CIFAR-10 binary corpus from local storage
//! - Splitting the training corpus into training and validation partitions
//! - Batching partitions into tensors for Burn
//!
//! ## Partitions
//!
//! 1. **Training** (45 000 images): seeded subset of the training corpus, reshuffled every epoch
//! 2. **Validation** (5 000 images): the rest of the training corpus, stable order
//! 3. **Test** (10 000 images): `test_batch.bin`, stable order, only used for the final report

pub mod burn_dataset;
pub mod cifar10;
pub mod loader;
pub mod split;

// Re-export main types for convenience
pub use burn_dataset::{CifarBatch, CifarBatcher, CifarItem, Partition};
pub use cifar10::{Cifar10, Split};
pub use loader::{BatchIter, BatchLoader};
pub use split::{split_indices, SplitConfig, SplitIndices, TrainValSplit};

/// Number of CIFAR-10 classes
pub const NUM_CLASSES: usize = 10;

/// Image width and height in pixels
pub const IMAGE_SIZE: usize = 32;

/// Colour channels per image
pub const CHANNELS: usize = 3;

/// Bytes per image (3 * 32 * 32)
pub const IMAGE_BYTES: usize = CHANNELS * IMAGE_SIZE * IMAGE_SIZE;

/// CIFAR-10 class names, indexed by label
pub const CLASS_NAMES: [&str; NUM_CLASSES] = [
    "airplane",
    "automobile",
    "bird",
    "cat",
    "deer",
    "dog",
    "frog",
    "horse",
    "ship",
    "truck",
];

/// Get the class name for a given label index
pub fn class_name(label: usize) -> Option<&'static str> {
    CLASS_NAMES.get(label).copied()
}
