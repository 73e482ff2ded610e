//! CIFAR-10 binary corpus reader
//!
//! Reads the "binary version" of CIFAR-10 from local storage. The corpus
//! consists of five training files and one test file, each a sequence of
//! 3073-byte records: one label byte followed by 1024 red, 1024 green and 1024
//! blue pixel bytes.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use super::burn_dataset::{CifarItem, Partition};
use super::{IMAGE_BYTES, NUM_CLASSES};
use crate::utils::error::{CifarError, Result};

/// Size of one record in a batch file
pub const RECORD_SIZE: usize = 1 + IMAGE_BYTES;

/// Directory created by extracting `cifar-10-binary.tar.gz`
pub const BATCHES_DIR: &str = "cifar-10-batches-bin";

/// Which half of the corpus to read
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Split {
    /// 50 000 images in `data_batch_1.bin` .. `data_batch_5.bin`
    Train,
    /// 10 000 images in `test_batch.bin`
    Test,
}

impl Split {
    /// Batch file names making up this split
    pub fn file_names(&self) -> Vec<String> {
        match self {
            Split::Train => (1..=5).map(|i| format!("data_batch_{}.bin", i)).collect(),
            Split::Test => vec!["test_batch.bin".to_string()],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Test => "test",
        }
    }
}

/// An in-memory CIFAR-10 split
#[derive(Clone, Debug)]
pub struct Cifar10 {
    items: Arc<Vec<CifarItem>>,
    split: Split,
}

impl Cifar10 {
    /// Load a split from `root`
    ///
    /// `root` may either be the extracted `cifar-10-batches-bin` directory or
    /// its parent.
    pub fn load(root: impl AsRef<Path>, split: Split) -> Result<Self> {
        let dir = resolve_batches_dir(root.as_ref());
        let mut items = Vec::new();

        for name in split.file_names() {
            let path = dir.join(&name);
            let bytes = read_batch_file(&path)?;
            let records = parse_records(&bytes)
                .map_err(|e| CifarError::Dataset(format!("{}: {}", path.display(), e)))?;
            debug!("Read {} records from {}", records.len(), path.display());
            items.extend(records);
        }

        info!("Loaded CIFAR-10 {} split: {} images", split.name(), items.len());

        Ok(Self::from_items(items, split))
    }

    /// Wrap already decoded items
    pub fn from_items(items: Vec<CifarItem>, split: Split) -> Self {
        Self {
            items: Arc::new(items),
            split,
        }
    }

    pub fn split(&self) -> Split {
        self.split
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Shared handle to the decoded items
    pub fn items(&self) -> Arc<Vec<CifarItem>> {
        Arc::clone(&self.items)
    }

    /// The whole split as a single partition in file order
    pub fn partition(&self) -> Partition {
        Partition::full(self.split.name(), self.items())
    }

    /// Number of images per class
    pub fn class_distribution(&self) -> [usize; NUM_CLASSES] {
        let mut counts = [0usize; NUM_CLASSES];
        for item in self.items.iter() {
            counts[item.label] += 1;
        }
        counts
    }
}

fn resolve_batches_dir(root: &Path) -> PathBuf {
    let nested = root.join(BATCHES_DIR);
    if nested.is_dir() {
        nested
    } else {
        root.to_path_buf()
    }
}

fn read_batch_file(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => CifarError::MissingFile(path.to_path_buf()),
        _ => CifarError::Io(e),
    })
}

/// Decode a buffer of consecutive records
pub fn parse_records(bytes: &[u8]) -> Result<Vec<CifarItem>> {
    if bytes.is_empty() || bytes.len() % RECORD_SIZE != 0 {
        return Err(CifarError::Dataset(format!(
            "invalid size {} bytes (must be a positive multiple of {})",
            bytes.len(),
            RECORD_SIZE
        )));
    }

    bytes
        .chunks_exact(RECORD_SIZE)
        .enumerate()
        .map(|(i, record)| {
            let label = record[0] as usize;
            CifarItem::new(record[1..].to_vec(), label)
                .map_err(|e| CifarError::Dataset(format!("record {}: {}", i, e)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::data::dataset::Dataset;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn record(label: u8, fill: u8) -> Vec<u8> {
        let mut bytes = vec![label];
        bytes.extend(std::iter::repeat(fill).take(IMAGE_BYTES));
        bytes
    }

    fn write_file(dir: &Path, name: &str, records: &[Vec<u8>]) {
        let mut file = File::create(dir.join(name)).unwrap();
        for r in records {
            file.write_all(r).unwrap();
        }
    }

    #[test]
    fn test_parse_records() {
        let mut bytes = record(3, 10);
        bytes.extend(record(9, 20));

        let items = parse_records(&bytes).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].label, 3);
        assert_eq!(items[1].label, 9);
        assert!(items[1].image.iter().all(|&p| p == 20));
    }

    #[test]
    fn test_parse_keeps_channel_planes() {
        let mut bytes = vec![0u8];
        bytes.extend(std::iter::repeat(1).take(1024));
        bytes.extend(std::iter::repeat(2).take(1024));
        bytes.extend(std::iter::repeat(3).take(1024));

        let items = parse_records(&bytes).unwrap();
        assert_eq!(items[0].image[0], 1);
        assert_eq!(items[0].image[1024], 2);
        assert_eq!(items[0].image[3071], 3);
    }

    #[test]
    fn test_parse_rejects_truncated_buffer() {
        let mut bytes = record(1, 0);
        bytes.pop();
        assert!(matches!(parse_records(&bytes), Err(CifarError::Dataset(_))));
        assert!(parse_records(&[]).is_err());
    }

    #[test]
    fn test_parse_rejects_bad_label() {
        let bytes = record(10, 0);
        assert!(matches!(parse_records(&bytes), Err(CifarError::Dataset(_))));
    }

    #[test]
    fn test_load_test_split_from_nested_dir() {
        let root = tempdir().unwrap();
        let dir = root.path().join(BATCHES_DIR);
        fs::create_dir_all(&dir).unwrap();
        write_file(&dir, "test_batch.bin", &[record(0, 1), record(5, 2), record(5, 3)]);

        let test = Cifar10::load(root.path(), Split::Test).unwrap();
        assert_eq!(test.len(), 3);
        assert_eq!(test.split(), Split::Test);

        let counts = test.class_distribution();
        assert_eq!(counts[0], 1);
        assert_eq!(counts[5], 2);
    }

    #[test]
    fn test_load_train_split_concatenates_files() {
        let dir = tempdir().unwrap();
        for name in Split::Train.file_names() {
            write_file(dir.path(), &name, &[record(1, 0), record(2, 0)]);
        }

        let train = Cifar10::load(dir.path(), Split::Train).unwrap();
        assert_eq!(train.len(), 10);
        assert_eq!(train.partition().len(), 10);
    }

    #[test]
    fn test_missing_file_is_reported() {
        let dir = tempdir().unwrap();
        let err = Cifar10::load(dir.path(), Split::Test).unwrap_err();
        match err {
            CifarError::MissingFile(path) => assert!(path.ends_with("test_batch.bin")),
            other => panic!("unexpected error: {other}"),
        }
    }
}
