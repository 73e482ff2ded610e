//! Burn Dataset Integration for CIFAR-10
//!
//! This module implements Burn's Dataset trait over index views of a shared
//! in-memory corpus, and the Batcher that turns items into tensors.

use std::sync::Arc;

use burn::data::dataloader::batcher::Batcher;
use burn::data::dataset::Dataset;
use burn::prelude::*;
use serde::{Deserialize, Serialize};

use super::{CHANNELS, IMAGE_BYTES, IMAGE_SIZE, NUM_CLASSES};
use crate::utils::error::{CifarError, Result};

/// A single CIFAR-10 sample
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CifarItem {
    /// Raw pixels in CHW order (all red, then green, then blue), 3 * 32 * 32 bytes
    pub image: Vec<u8>,
    /// Class label (0-9)
    pub label: usize,
}

impl CifarItem {
    /// Create an item, checking pixel count and label range
    pub fn new(image: Vec<u8>, label: usize) -> Result<Self> {
        if image.len() != IMAGE_BYTES {
            return Err(CifarError::Dataset(format!(
                "image has {} bytes, expected {}",
                image.len(),
                IMAGE_BYTES
            )));
        }
        if label >= NUM_CLASSES {
            return Err(CifarError::Dataset(format!(
                "label {} out of range 0..{}",
                label, NUM_CLASSES
            )));
        }
        Ok(Self { image, label })
    }

    /// Pixel values scaled to [0, 1]
    pub fn normalized(&self) -> impl Iterator<Item = f32> + '_ {
        self.image.iter().map(|&p| p as f32 / 255.0)
    }
}

/// An ordered view over a shared corpus
///
/// Partitions created from the same corpus share the underlying items; only
/// the index list is owned.
#[derive(Clone, Debug)]
pub struct Partition {
    name: String,
    source: Arc<Vec<CifarItem>>,
    indices: Vec<usize>,
}

impl Partition {
    /// A partition covering the whole corpus in its stored order
    pub fn full(name: impl Into<String>, source: Arc<Vec<CifarItem>>) -> Self {
        let indices = (0..source.len()).collect();
        Self {
            name: name.into(),
            source,
            indices,
        }
    }

    /// A partition over the given corpus positions
    pub fn from_indices(
        name: impl Into<String>,
        source: Arc<Vec<CifarItem>>,
        indices: Vec<usize>,
    ) -> Result<Self> {
        let name = name.into();
        if let Some(&bad) = indices.iter().find(|&&i| i >= source.len()) {
            return Err(CifarError::Dataset(format!(
                "partition '{}' refers to index {} but corpus has {} items",
                name,
                bad,
                source.len()
            )));
        }
        Ok(Self {
            name,
            source,
            indices,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Corpus positions of this partition, in order
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Borrow the item at partition position `index`
    pub fn item(&self, index: usize) -> Option<&CifarItem> {
        self.indices.get(index).and_then(|&i| self.source.get(i))
    }

    /// Per-class item counts
    pub fn class_distribution(&self) -> [usize; NUM_CLASSES] {
        let mut counts = [0usize; NUM_CLASSES];
        for &i in &self.indices {
            counts[self.source[i].label] += 1;
        }
        counts
    }
}

impl Dataset<CifarItem> for Partition {
    fn get(&self, index: usize) -> Option<CifarItem> {
        self.item(index).cloned()
    }

    fn len(&self) -> usize {
        self.indices.len()
    }
}

/// A batch of CIFAR-10 images
#[derive(Clone, Debug)]
pub struct CifarBatch<B: Backend> {
    /// Images with shape [batch_size, 3, 32, 32], values in [0, 1]
    pub images: Tensor<B, 4>,
    /// Labels with shape [batch_size]
    pub targets: Tensor<B, 1, Int>,
}

/// Batcher turning CIFAR-10 items into tensors on a given device
#[derive(Clone, Debug, Default)]
pub struct CifarBatcher;

impl CifarBatcher {
    pub fn new() -> Self {
        Self
    }
}

impl<B: Backend> Batcher<B, CifarItem, CifarBatch<B>> for CifarBatcher {
    fn batch(&self, items: Vec<CifarItem>, device: &B::Device) -> CifarBatch<B> {
        let batch_size = items.len();

        let images_data: Vec<f32> = items.iter().flat_map(|item| item.normalized()).collect();
        let images = Tensor::<B, 4>::from_data(
            TensorData::new(images_data, [batch_size, CHANNELS, IMAGE_SIZE, IMAGE_SIZE]),
            device,
        );

        let targets_data: Vec<i64> = items.iter().map(|item| item.label as i64).collect();
        let targets =
            Tensor::<B, 1, Int>::from_data(TensorData::new(targets_data, [batch_size]), device);

        CifarBatch { images, targets }
    }
}
