use std::fs;
use std::path::Path;

use image::{DynamicImage, GrayImage};

use super::{ImageItem, Split};
use crate::transform::{Mapper, MapperDataset};
use crate::{Dataset, DatasetError, DatasetResult, DatasetStorage, InMemDataset};

/// Base url of the gzip compressed Fashion-MNIST files.
pub const FASHION_MNIST_URL: &str = "http://fashion-mnist.s3-website.eu-central-1.amazonaws.com/";

/// Folder holding the decompressed Fashion-MNIST files.
pub const FASHION_MNIST_DIR: &str = "FashionMNIST/raw";

/// Names of the decompressed files, in `train images, train labels, test images, test labels`
/// order.
pub const FASHION_MNIST_FILES: [&str; 4] = [
    TRAIN_IMAGES,
    TRAIN_LABELS,
    TEST_IMAGES,
    TEST_LABELS,
];

const TRAIN_IMAGES: &str = "train-images-idx3-ubyte";
const TRAIN_LABELS: &str = "train-labels-idx1-ubyte";
const TEST_IMAGES: &str = "t10k-images-idx3-ubyte";
const TEST_LABELS: &str = "t10k-labels-idx1-ubyte";

const IMAGES_MAGIC: u32 = 2051;
const LABELS_MAGIC: u32 = 2049;

/// Class names of Fashion-MNIST, indexed by label.
pub const FASHION_MNIST_CLASSES: [&str; 10] = [
    "T-shirt/top",
    "Trouser",
    "Pullover",
    "Dress",
    "Coat",
    "Sandal",
    "Shirt",
    "Sneaker",
    "Bag",
    "Ankle boot",
];

#[derive(Debug, Clone)]
struct FashionMnistItemRaw {
    image_bytes: Vec<u8>,
    label: usize,
}

struct BytesToImage {
    width: u32,
    height: u32,
}

impl Mapper<FashionMnistItemRaw, ImageItem> for BytesToImage {
    fn map(&self, item: &FashionMnistItemRaw) -> ImageItem {
        let image = GrayImage::from_fn(self.width, self.height, |x, y| {
            image::Luma([item.image_bytes[(y * self.width + x) as usize]])
        });

        ImageItem {
            image: DynamicImage::ImageLuma8(image),
            label: item.label,
        }
    }
}

type MappedDataset =
    MapperDataset<InMemDataset<FashionMnistItemRaw>, BytesToImage, FashionMnistItemRaw>;

/// Fashion-MNIST is a dataset of Zalando's article images: 28x28 grayscale images in 10
/// classes, with 60,000 training images and 10,000 test images.
///
/// The four IDX files are downloaded gzip compressed and stored decompressed in
/// `FashionMNIST/raw/` of the [storage](DatasetStorage) root.
pub struct FashionMnistDataset {
    dataset: MappedDataset,
}

impl Dataset<ImageItem> for FashionMnistDataset {
    fn get(&self, index: usize) -> Option<ImageItem> {
        self.dataset.get(index)
    }

    fn len(&self) -> usize {
        self.dataset.len()
    }
}

impl FashionMnistDataset {
    /// Creates the train dataset.
    pub fn train(storage: &DatasetStorage) -> DatasetResult<Self> {
        Self::new(storage, Split::Train)
    }

    /// Creates the test dataset.
    pub fn test(storage: &DatasetStorage) -> DatasetResult<Self> {
        Self::new(storage, Split::Test)
    }

    /// Creates the dataset of the given split, downloading the files if needed.
    pub fn new(storage: &DatasetStorage, split: Split) -> DatasetResult<Self> {
        let root = storage.fetch_gz_files(FASHION_MNIST_URL, FASHION_MNIST_DIR, &FASHION_MNIST_FILES)?;

        let (images_file, labels_file) = match split {
            Split::Train => (TRAIN_IMAGES, TRAIN_LABELS),
            Split::Test => (TEST_IMAGES, TEST_LABELS),
        };

        let (width, height, images) = read_images(&root.join(images_file))?;
        let labels = read_labels(&root.join(labels_file))?;

        if images.len() != labels.len() {
            return Err(DatasetError::format(
                root.join(labels_file),
                format!("{} labels for {} images", labels.len(), images.len()),
            ));
        }

        let items: Vec<_> = images
            .into_iter()
            .zip(labels)
            .map(|(image_bytes, label)| FashionMnistItemRaw { image_bytes, label })
            .collect();
        log::debug!("Loaded {} Fashion-MNIST {split} images", items.len());

        let dataset = MapperDataset::new(InMemDataset::new(items), BytesToImage { width, height });

        Ok(Self { dataset })
    }

    /// Class names, indexed by label.
    pub fn classes(&self) -> &'static [&'static str] {
        &FASHION_MNIST_CLASSES
    }
}

/// Reads the big-endian `u32` header fields of an IDX file.
fn read_header<const N: usize>(path: &Path, bytes: &[u8]) -> DatasetResult<[u32; N]> {
    if bytes.len() < 4 * N {
        return Err(DatasetError::format(path, "truncated header"));
    }

    let mut header = [0u32; N];
    for (field, chunk) in header.iter_mut().zip(bytes.chunks_exact(4)) {
        *field = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }

    Ok(header)
}

/// Reads an IDX image file: 16-byte header (magic, count, rows, columns) then pixels.
fn read_images(path: &Path) -> DatasetResult<(u32, u32, Vec<Vec<u8>>)> {
    let bytes = fs::read(path).map_err(|err| DatasetError::io(path, err))?;
    let [magic, size, rows, cols] = read_header::<4>(path, &bytes)?;

    if magic != IMAGES_MAGIC {
        return Err(DatasetError::format(
            path,
            format!("magic number {magic}, expected {IMAGES_MAGIC}"),
        ));
    }

    let pixels = &bytes[16..];
    let layout_error = || {
        DatasetError::format(
            path,
            format!("{} pixel bytes for {size} images of {rows}x{cols}", pixels.len()),
        )
    };
    let image_size = (rows as usize)
        .checked_mul(cols as usize)
        .ok_or_else(layout_error)?;
    let total_size = image_size
        .checked_mul(size as usize)
        .ok_or_else(layout_error)?;
    if image_size == 0 || pixels.len() != total_size {
        return Err(layout_error());
    }

    let images = pixels
        .chunks_exact(image_size)
        .map(|chunk| chunk.to_vec())
        .collect();

    Ok((cols, rows, images))
}

/// Reads an IDX label file: 8-byte header (magic, count) then one byte per label.
fn read_labels(path: &Path) -> DatasetResult<Vec<usize>> {
    let bytes = fs::read(path).map_err(|err| DatasetError::io(path, err))?;
    let [magic, size] = read_header::<2>(path, &bytes)?;

    if magic != LABELS_MAGIC {
        return Err(DatasetError::format(
            path,
            format!("magic number {magic}, expected {LABELS_MAGIC}"),
        ));
    }

    let labels = &bytes[8..];
    if labels.len() != size as usize {
        return Err(DatasetError::format(
            path,
            format!("{} label bytes, header announces {size}", labels.len()),
        ));
    }

    labels
        .iter()
        .map(|&label| match label as usize {
            label if label < FASHION_MNIST_CLASSES.len() => Ok(label),
            label => Err(DatasetError::format(path, format!("label {label} out of range"))),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::fake::{fashion_mnist_files, FakeFetcher};

    #[test]
    fn fashion_mnist_items_are_single_channel() {
        let tmp = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(FakeFetcher::new().with_files(fashion_mnist_files(6, 3).unwrap()));
        let storage = DatasetStorage::new(tmp.path(), fetcher.clone());

        let train = FashionMnistDataset::train(&storage).unwrap();
        let test = FashionMnistDataset::test(&storage).unwrap();

        assert_eq!(train.len(), 6);
        assert_eq!(test.len(), 3);
        assert_eq!(fetcher.num_fetches(), 4);

        let item = test.get(2).unwrap();
        assert_eq!(item.label, 2);
        assert_eq!(item.image.color(), image::ColorType::L8);
        assert_eq!((item.image.width(), item.image.height()), (28, 28));
        assert_eq!(item.image.to_luma8().get_pixel(3, 4).0, [2]);
    }

    #[test]
    fn wrong_magic_number_is_a_format_error() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join(FASHION_MNIST_DIR);
        fs::create_dir_all(&dir).unwrap();
        for name in FASHION_MNIST_FILES {
            fs::write(dir.join(name), 1234u32.to_be_bytes().repeat(4)).unwrap();
        }
        let storage = DatasetStorage::new(tmp.path(), Arc::new(FakeFetcher::new()));

        let result = FashionMnistDataset::test(&storage);

        assert!(matches!(result, Err(DatasetError::Format { .. })));
    }
    #[test]
    fn oversized_header_is_a_format_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("images");
        let mut bytes = Vec::new();
        for field in [IMAGES_MAGIC, u32::MAX, u32::MAX, u32::MAX] {
            bytes.extend(field.to_be_bytes());
        }
        bytes.extend([0u8; 16]);
        fs::write(&path, bytes).unwrap();

        let result = read_images(&path);

        assert!(matches!(result, Err(DatasetError::Format { .. })));
    }
}
