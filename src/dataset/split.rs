//! Train/validation splitting
//!
//! The 50 000-image training corpus is divided into a training partition and
//! a validation partition with a seeded permutation, so the same seed always
//! produces the same validation set. The test partition is read from its own
//! file and is never part of this split.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::burn_dataset::Partition;
use super::cifar10::Cifar10;
use crate::utils::error::{CifarError, Result};

/// Configuration for the train/validation split
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SplitConfig {
    /// Number of images held out for validation
    pub validation_size: usize,
    /// Random seed for the permutation
    pub seed: u64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            validation_size: 5000,
            seed: 43,
        }
    }
}

/// Corpus positions of the two partitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub validation: Vec<usize>,
}

/// Seeded split of `len` positions
///
/// A random permutation of `0..len` is drawn; the first `len - validation_size`
/// positions form the training partition and the rest the validation partition.
pub fn split_indices(len: usize, validation_size: usize, seed: u64) -> Result<SplitIndices> {
    if validation_size > len {
        return Err(CifarError::Config(format!(
            "validation size {} exceeds corpus size {}",
            validation_size, len
        )));
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut indices: Vec<usize> = (0..len).collect();
    indices.shuffle(&mut rng);

    let validation = indices.split_off(len - validation_size);

    Ok(SplitIndices {
        train: indices,
        validation,
    })
}

/// Training and validation partitions over one corpus
#[derive(Debug, Clone)]
pub struct TrainValSplit {
    pub train: Partition,
    pub validation: Partition,
}

impl TrainValSplit {
    /// Split a loaded corpus according to `config`
    pub fn new(corpus: &Cifar10, config: &SplitConfig) -> Result<Self> {
        let SplitIndices { train, validation } =
            split_indices(corpus.len(), config.validation_size, config.seed)?;

        let train = Partition::from_indices("train", corpus.items(), train)?;
        let validation = Partition::from_indices("validation", corpus.items(), validation)?;

        info!(
            "Split {} images (seed {}): {} train / {} validation",
            corpus.len(),
            config.seed,
            train.indices().len(),
            validation.indices().len()
        );

        Ok(Self { train, validation })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::burn_dataset::CifarItem;
    use crate::dataset::cifar10::Split;
    use crate::dataset::IMAGE_BYTES;
    use burn::data::dataset::Dataset;
    use std::collections::HashSet;

    #[test]
    fn test_sizes_add_up_and_partitions_are_disjoint() {
        let split = split_indices(1000, 100, 7).unwrap();
        assert_eq!(split.train.len() + split.validation.len(), 1000);

        let train: HashSet<_> = split.train.iter().copied().collect();
        let validation: HashSet<_> = split.validation.iter().copied().collect();
        assert!(train.is_disjoint(&validation));
        assert_eq!(train.len() + validation.len(), 1000);
    }

    #[test]
    fn test_split_is_reproducible() {
        let a = split_indices(500, 50, 43).unwrap();
        let b = split_indices(500, 50, 43).unwrap();
        assert_eq!(a, b);

        let c = split_indices(500, 50, 44).unwrap();
        assert_ne!(a.validation, c.validation);
    }

    #[test]
    fn test_full_corpus_default_split() {
        let config = SplitConfig::default();
        let split = split_indices(50_000, config.validation_size, config.seed).unwrap();
        assert_eq!(split.validation.len(), 5000);
        assert_eq!(split.train.len(), 45_000);
    }

    #[test]
    fn test_validation_larger_than_corpus() {
        assert!(matches!(
            split_indices(10, 11, 0),
            Err(CifarError::Config(_))
        ));
        let all = split_indices(10, 10, 0).unwrap();
        assert!(all.train.is_empty());
    }

    #[test]
    fn test_partitions_from_corpus() {
        let items = (0..20)
            .map(|i| CifarItem::new(vec![0; IMAGE_BYTES], i % 10).unwrap())
            .collect();
        let corpus = Cifar10::from_items(items, Split::Train);

        let split = TrainValSplit::new(
            &corpus,
            &SplitConfig {
                validation_size: 4,
                seed: 43,
            },
        )
        .unwrap();

        assert_eq!(split.train.len(), 16);
        assert_eq!(split.validation.len(), 4);
        assert_eq!(split.validation.name(), "validation");
    }
}
