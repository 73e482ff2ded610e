//! Mini-batch loading
//!
//! A `BatchLoader` produces a lazy, restartable sequence of batches over one
//! partition. Training loaders draw a fresh permutation from their own seeded
//! RNG each time `iter` is called; evaluation loaders always iterate in
//! partition order. Batches are materialised one at a time on the loader's
//! device.

use burn::data::dataloader::batcher::Batcher;
use burn::data::dataset::Dataset;
use burn::tensor::backend::Backend;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use super::burn_dataset::{CifarBatch, CifarBatcher, CifarItem, Partition};
use crate::utils::error::{CifarError, Result};

/// Batch loader over a single partition
pub struct BatchLoader<B: Backend> {
    partition: Partition,
    batch_size: usize,
    batcher: CifarBatcher,
    device: B::Device,
    rng: Option<ChaCha8Rng>,
}

impl<B: Backend> BatchLoader<B> {
    /// Create a loader that iterates in partition order
    pub fn new(partition: Partition, batch_size: usize, device: B::Device) -> Result<Self> {
        if batch_size == 0 {
            return Err(CifarError::Config("batch size must be greater than 0".to_string()));
        }

        Ok(Self {
            partition,
            batch_size,
            batcher: CifarBatcher::new(),
            device,
            rng: None,
        })
    }

    /// Reshuffle on every pass, starting from `seed`
    pub fn shuffled(mut self, seed: u64) -> Self {
        self.rng = Some(ChaCha8Rng::seed_from_u64(seed));
        self
    }

    pub fn is_shuffled(&self) -> bool {
        self.rng.is_some()
    }

    pub fn partition(&self) -> &Partition {
        &self.partition
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn device(&self) -> &B::Device {
        &self.device
    }

    /// Number of items per pass
    pub fn len(&self) -> usize {
        self.partition.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partition.is_empty()
    }

    /// Number of batches per pass; the last one may be short
    pub fn num_batches(&self) -> usize {
        self.len().div_ceil(self.batch_size)
    }

    /// Partition positions for the next pass
    ///
    /// Advances the RNG of a shuffled loader.
    pub fn next_order(&mut self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.partition.len()).collect();
        if let Some(rng) = self.rng.as_mut() {
            order.shuffle(rng);
        }
        order
    }

    /// Start a new pass over the partition
    pub fn iter(&mut self) -> BatchIter<'_, B> {
        let order = self.next_order();
        BatchIter {
            loader: self,
            order,
            cursor: 0,
        }
    }

    fn make_batch(&self, positions: &[usize]) -> CifarBatch<B> {
        let items: Vec<CifarItem> = positions
            .iter()
            .filter_map(|&i| self.partition.get(i))
            .collect();

        <CifarBatcher as Batcher<B, CifarItem, CifarBatch<B>>>::batch(
            &self.batcher,
            items,
            &self.device,
        )
    }
}

/// One pass over a loader's partition
pub struct BatchIter<'a, B: Backend> {
    loader: &'a BatchLoader<B>,
    order: Vec<usize>,
    cursor: usize,
}

impl<B: Backend> Iterator for BatchIter<'_, B> {
    type Item = CifarBatch<B>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor >= self.order.len() {
            return None;
        }

        let end = (self.cursor + self.loader.batch_size).min(self.order.len());
        let batch = self.loader.make_batch(&self.order[self.cursor..end]);
        self.cursor = end;

        Some(batch)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.order.len() - self.cursor).div_ceil(self.loader.batch_size);
        (remaining, Some(remaining))
    }
}

impl<B: Backend> ExactSizeIterator for BatchIter<'_, B> {}
