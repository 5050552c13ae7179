use std::fs;
use std::path::Path;

use image::{DynamicImage, RgbImage};

use super::{ImageItem, Split};
use crate::transform::{Mapper, MapperDataset};
use crate::{Dataset, DatasetError, DatasetResult, DatasetStorage, InMemDataset};

/// CIFAR-10 binary distribution.
pub const CIFAR10_URL: &str = "https://www.cs.toronto.edu/~kriz/cifar-10-binary.tar.gz";
/// CIFAR-100 binary distribution.
pub const CIFAR100_URL: &str = "https://www.cs.toronto.edu/~kriz/cifar-100-binary.tar.gz";

/// Folder created by unpacking the CIFAR-10 archive.
pub const CIFAR10_DIR: &str = "cifar-10-batches-bin";
/// Folder created by unpacking the CIFAR-100 archive.
pub const CIFAR100_DIR: &str = "cifar-100-binary";

/// Side of a CIFAR image.
pub const CIFAR_SIZE: usize = 32;
const PIXELS: usize = CIFAR_SIZE * CIFAR_SIZE;
const IMAGE_BYTES: usize = 3 * PIXELS;

const CIFAR10_TRAIN_FILES: [&str; 5] = [
    "data_batch_1.bin",
    "data_batch_2.bin",
    "data_batch_3.bin",
    "data_batch_4.bin",
    "data_batch_5.bin",
];
const CIFAR10_TEST_FILE: &str = "test_batch.bin";
const CIFAR10_META_FILE: &str = "batches.meta.txt";

const CIFAR100_TRAIN_FILE: &str = "train.bin";
const CIFAR100_TEST_FILE: &str = "test.bin";
const CIFAR100_META_FILE: &str = "fine_label_names.txt";

/// Binary record layout of a CIFAR file.
#[derive(Debug, Clone, Copy)]
struct RecordLayout {
    /// Number of label bytes preceding the pixels.
    label_bytes: usize,
    /// Offset of the label used as class index.
    label_offset: usize,
    num_classes: usize,
}

impl RecordLayout {
    const CIFAR10: Self = Self {
        label_bytes: 1,
        label_offset: 0,
        num_classes: 10,
    };

    // Coarse label first, fine label second.
    const CIFAR100: Self = Self {
        label_bytes: 2,
        label_offset: 1,
        num_classes: 100,
    };

    fn record_size(&self) -> usize {
        self.label_bytes + IMAGE_BYTES
    }

    /// Splits a CIFAR binary file into raw items.
    fn read(&self, path: &Path, items: &mut Vec<CifarItemRaw>) -> DatasetResult<()> {
        let bytes = fs::read(path).map_err(|err| DatasetError::io(path, err))?;

        if bytes.len() % self.record_size() != 0 {
            return Err(DatasetError::format(
                path,
                format!(
                    "size {} is not a multiple of the record size {}",
                    bytes.len(),
                    self.record_size()
                ),
            ));
        }

        for record in bytes.chunks_exact(self.record_size()) {
            let label = record[self.label_offset] as usize;
            if label >= self.num_classes {
                return Err(DatasetError::format(
                    path,
                    format!("label {label} out of range for {} classes", self.num_classes),
                ));
            }

            items.push(CifarItemRaw {
                image_bytes: record[self.label_bytes..].to_vec(),
                label,
            });
        }

        Ok(())
    }
}

#[derive(Debug, Clone)]
struct CifarItemRaw {
    /// Red, green then blue planes, row major.
    image_bytes: Vec<u8>,
    label: usize,
}

struct BytesToImage;

impl Mapper<CifarItemRaw, ImageItem> for BytesToImage {
    /// Interleaves the planar channels of a raw record into an RGB image.
    fn map(&self, item: &CifarItemRaw) -> ImageItem {
        debug_assert_eq!(item.image_bytes.len(), IMAGE_BYTES);

        let (red, rest) = item.image_bytes.split_at(PIXELS);
        let (green, blue) = rest.split_at(PIXELS);

        let image = RgbImage::from_fn(CIFAR_SIZE as u32, CIFAR_SIZE as u32, |x, y| {
            let i = y as usize * CIFAR_SIZE + x as usize;
            image::Rgb([red[i], green[i], blue[i]])
        });

        ImageItem {
            image: DynamicImage::ImageRgb8(image),
            label: item.label,
        }
    }
}

type MappedDataset = MapperDataset<InMemDataset<CifarItemRaw>, BytesToImage, CifarItemRaw>;

/// Reads the non-empty lines of a label names file.
fn read_class_names(path: &Path) -> DatasetResult<Vec<String>> {
    let content = fs::read_to_string(path).map_err(|err| DatasetError::io(path, err))?;

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// The CIFAR-10 dataset consists of 60,000 32x32 color images in 10 classes, with 6,000
/// images per class. There are 50,000 training images and 10,000 test images.
///
/// The [binary version](https://www.cs.toronto.edu/~kriz/cifar.html) is downloaded into
/// `cifar-10-batches-bin/` of the [storage](DatasetStorage) root.
pub struct Cifar10Dataset {
    dataset: MappedDataset,
    classes: Vec<String>,
}

impl Dataset<ImageItem> for Cifar10Dataset {
    fn get(&self, index: usize) -> Option<ImageItem> {
        self.dataset.get(index)
    }

    fn len(&self) -> usize {
        self.dataset.len()
    }
}

impl Cifar10Dataset {
    /// Creates the train dataset.
    pub fn train(storage: &DatasetStorage) -> DatasetResult<Self> {
        Self::new(storage, Split::Train)
    }

    /// Creates the test dataset.
    pub fn test(storage: &DatasetStorage) -> DatasetResult<Self> {
        Self::new(storage, Split::Test)
    }

    /// Creates the dataset of the given split, downloading the archive if needed.
    pub fn new(storage: &DatasetStorage, split: Split) -> DatasetResult<Self> {
        let mut expected = CIFAR10_TRAIN_FILES.to_vec();
        expected.extend([CIFAR10_TEST_FILE, CIFAR10_META_FILE]);
        let root = storage.fetch_archive(CIFAR10_URL, CIFAR10_DIR, &expected)?;

        let files = match split {
            Split::Train => CIFAR10_TRAIN_FILES.to_vec(),
            Split::Test => vec![CIFAR10_TEST_FILE],
        };

        let mut items = Vec::new();
        for file in files {
            RecordLayout::CIFAR10.read(&root.join(file), &mut items)?;
        }
        log::debug!("Loaded {} CIFAR-10 {split} images", items.len());

        Ok(Self {
            dataset: MapperDataset::new(InMemDataset::new(items), BytesToImage),
            classes: read_class_names(&root.join(CIFAR10_META_FILE))?,
        })
    }

    /// Class names, indexed by label.
    pub fn classes(&self) -> &[String] {
        &self.classes
    }
}

/// The CIFAR-100 dataset has 100 classes containing 600 32x32 color images each, split in
/// 500 training images and 100 test images per class.
///
/// Items are labeled with the fine class. The binary version is downloaded into
/// `cifar-100-binary/` of the [storage](DatasetStorage) root.
pub struct Cifar100Dataset {
    dataset: MappedDataset,
    classes: Vec<String>,
}

impl Dataset<ImageItem> for Cifar100Dataset {
    fn get(&self, index: usize) -> Option<ImageItem> {
        self.dataset.get(index)
    }

    fn len(&self) -> usize {
        self.dataset.len()
    }
}

impl Cifar100Dataset {
    /// Creates the train dataset.
    pub fn train(storage: &DatasetStorage) -> DatasetResult<Self> {
        Self::new(storage, Split::Train)
    }

    /// Creates the test dataset.
    pub fn test(storage: &DatasetStorage) -> DatasetResult<Self> {
        Self::new(storage, Split::Test)
    }

    /// Creates the dataset of the given split, downloading the archive if needed.
    pub fn new(storage: &DatasetStorage, split: Split) -> DatasetResult<Self> {
        let root = storage.fetch_archive(
            CIFAR100_URL,
            CIFAR100_DIR,
            &[CIFAR100_TRAIN_FILE, CIFAR100_TEST_FILE, CIFAR100_META_FILE],
        )?;

        let file = match split {
            Split::Train => CIFAR100_TRAIN_FILE,
            Split::Test => CIFAR100_TEST_FILE,
        };

        let mut items = Vec::new();
        RecordLayout::CIFAR100.read(&root.join(file), &mut items)?;
        log::debug!("Loaded {} CIFAR-100 {split} images", items.len());

        Ok(Self {
            dataset: MapperDataset::new(InMemDataset::new(items), BytesToImage),
            classes: read_class_names(&root.join(CIFAR100_META_FILE))?,
        })
    }

    /// Fine class names, indexed by label.
    pub fn classes(&self) -> &[String] {
        &self.classes
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::fake::{cifar100_archive, cifar10_archive, FakeFetcher};

    fn storage(root: &Path, fetcher: FakeFetcher) -> DatasetStorage {
        DatasetStorage::new(root, Arc::new(fetcher))
    }

    #[test]
    fn cifar10_splits_have_expected_sizes() {
        let tmp = tempfile::tempdir().unwrap();
        let fetcher = FakeFetcher::new().with_file(CIFAR10_URL, cifar10_archive(3, 4).unwrap());
        let storage = storage(tmp.path(), fetcher);

        let train = Cifar10Dataset::train(&storage).unwrap();
        let test = Cifar10Dataset::test(&storage).unwrap();

        assert_eq!(train.len(), 15);
        assert_eq!(test.len(), 4);
        assert_eq!(train.classes().len(), 10);
        assert_eq!(train.classes()[0], "airplane");
    }

    #[test]
    fn cifar10_planes_are_interleaved() {
        let tmp = tempfile::tempdir().unwrap();
        let fetcher = FakeFetcher::new().with_file(CIFAR10_URL, cifar10_archive(1, 2).unwrap());
        let storage = storage(tmp.path(), fetcher);

        let item = Cifar10Dataset::test(&storage).unwrap().get(1).unwrap();
        let image = item.image.to_rgb8();

        assert_eq!(item.label, 1);
        assert_eq!(image.dimensions(), (32, 32));
        // Synthetic records hold constant planes: red = index, green = 100, blue = 200.
        assert_eq!(image.get_pixel(5, 7).0, [1, 100, 200]);
    }

    #[test]
    fn cifar100_uses_fine_labels() {
        let tmp = tempfile::tempdir().unwrap();
        let fetcher = FakeFetcher::new().with_file(CIFAR100_URL, cifar100_archive(120, 3).unwrap());
        let storage = storage(tmp.path(), fetcher);

        let train = Cifar100Dataset::train(&storage).unwrap();

        assert_eq!(train.len(), 120);
        assert_eq!(train.get(99).unwrap().label, 99);
        assert_eq!(train.get(101).unwrap().label, 1);
        assert_eq!(train.classes().len(), 100);
    }

    #[test]
    fn truncated_record_is_a_format_error() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join(CIFAR100_DIR);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(CIFAR100_TRAIN_FILE), vec![0u8; 100]).unwrap();
        fs::write(dir.join(CIFAR100_TEST_FILE), vec![0u8; 0]).unwrap();
        fs::write(dir.join(CIFAR100_META_FILE), "apple\n").unwrap();
        let storage = storage(tmp.path(), FakeFetcher::new());

        let result = Cifar100Dataset::train(&storage);

        assert!(matches!(result, Err(DatasetError::Format { .. })));
    }
}
