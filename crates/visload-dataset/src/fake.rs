//! Offline doubles for the network layer.
//!
//! The [FakeFetcher] serves in-memory files and counts how many were requested. The
//! archive builders produce small synthetic versions of the supported datasets that follow
//! the upstream binary layouts.

use std::collections::HashMap;
use std::io::{self, Write};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use flate2::write::GzEncoder;
use flate2::Compression;

use crate::network::Fetcher;
use crate::vision::{
    CIFAR100_DIR, CIFAR100_URL, CIFAR10_DIR, CIFAR10_URL, FASHION_MNIST_FILES, FASHION_MNIST_URL,
};
use crate::{DatasetError, DatasetResult};

const CIFAR10_CLASSES: [&str; 10] = [
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

/// Fetcher serving registered files from memory.
#[derive(Debug, Default)]
pub struct FakeFetcher {
    files: HashMap<String, Vec<u8>>,
    fetches: AtomicUsize,
    requested: Mutex<Vec<String>>,
}

impl FakeFetcher {
    /// Creates a fetcher without any file.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a fetcher serving the three synthetic datasets, with `train` and `test`
    /// items per split.
    ///
    /// CIFAR-10 gets `train` items per training batch file, so five times as many in total.
    pub fn with_datasets(train: usize, test: usize) -> io::Result<Self> {
        Ok(Self::new()
            .with_file(CIFAR10_URL, cifar10_archive(train, test)?)
            .with_file(CIFAR100_URL, cifar100_archive(train, test)?)
            .with_files(fashion_mnist_files(train, test)?))
    }

    /// Registers `bytes` as the content of `url`.
    pub fn with_file(mut self, url: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.files.insert(url.into(), bytes);
        self
    }

    /// Registers every `(url, bytes)` pair.
    pub fn with_files(mut self, files: impl IntoIterator<Item = (String, Vec<u8>)>) -> Self {
        self.files.extend(files);
        self
    }

    /// Number of calls to [fetch](Fetcher::fetch), failed ones included.
    pub fn num_fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Requested urls, in call order.
    pub fn requested(&self) -> Vec<String> {
        match self.requested.lock() {
            Ok(requested) => requested.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl Fetcher for FakeFetcher {
    fn fetch(&self, url: &str, _name: &str) -> DatasetResult<Vec<u8>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requested) = self.requested.lock() {
            requested.push(url.to_string());
        }

        self.files
            .get(url)
            .cloned()
            .ok_or_else(|| DatasetError::Download {
                url: url.to_string(),
                reason: "404 Not Found".to_string(),
            })
    }
}

/// Compresses `bytes` with gzip.
pub fn gzip(bytes: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::fast());
    encoder.write_all(bytes)?;
    encoder.finish()
}

/// Builds a gzip compressed tar archive holding the `(path, content)` entries.
pub fn tar_gz<P: AsRef<Path>>(
    entries: impl IntoIterator<Item = (P, Vec<u8>)>,
) -> io::Result<Vec<u8>> {
    let mut builder = tar::Builder::new(Vec::new());

    for (path, content) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, path, content.as_slice())?;
    }

    gzip(&builder.into_inner()?)
}

/// A CIFAR record whose red plane is filled with `index`, green with 100 and blue with 200.
fn cifar_record(labels: &[u8], index: usize) -> Vec<u8> {
    let mut record = labels.to_vec();
    record.extend(std::iter::repeat(index as u8).take(1024));
    record.extend(std::iter::repeat(100u8).take(1024));
    record.extend(std::iter::repeat(200u8).take(1024));
    record
}

/// Synthetic CIFAR-10 archive with `per_batch` items in each of the five training files
/// and `test` items in the test file. Item `i` of a split is labeled `i % 10`.
pub fn cifar10_archive(per_batch: usize, test: usize) -> io::Result<Vec<u8>> {
    let split = |offset: usize, size: usize| -> Vec<u8> {
        (offset..offset + size)
            .flat_map(|i| cifar_record(&[(i % 10) as u8], i))
            .collect()
    };

    let mut entries: Vec<(String, Vec<u8>)> = (0..5)
        .map(|batch| {
            (
                format!("{CIFAR10_DIR}/data_batch_{}.bin", batch + 1),
                split(batch * per_batch, per_batch),
            )
        })
        .collect();
    entries.push((format!("{CIFAR10_DIR}/test_batch.bin"), split(0, test)));
    entries.push((
        format!("{CIFAR10_DIR}/batches.meta.txt"),
        CIFAR10_CLASSES.join("\n").into_bytes(),
    ));

    tar_gz(entries)
}

/// Synthetic CIFAR-100 archive with `train` and `test` items. Item `i` of a split has the
/// fine label `i % 100` and the coarse label `i % 20`.
pub fn cifar100_archive(train: usize, test: usize) -> io::Result<Vec<u8>> {
    let split = |size: usize| -> Vec<u8> {
        (0..size)
            .flat_map(|i| cifar_record(&[(i % 20) as u8, (i % 100) as u8], i))
            .collect()
    };
    let names: Vec<String> = (0..100).map(|i| format!("class_{i}")).collect();

    tar_gz([
        (format!("{CIFAR100_DIR}/train.bin"), split(train)),
        (format!("{CIFAR100_DIR}/test.bin"), split(test)),
        (
            format!("{CIFAR100_DIR}/fine_label_names.txt"),
            names.join("\n").into_bytes(),
        ),
    ])
}

fn idx_images(size: usize) -> Vec<u8> {
    let mut bytes = Vec::new();
    for field in [2051u32, size as u32, 28, 28] {
        bytes.extend(field.to_be_bytes());
    }
    for i in 0..size {
        bytes.extend(std::iter::repeat(i as u8).take(28 * 28));
    }
    bytes
}

fn idx_labels(size: usize) -> Vec<u8> {
    let mut bytes = Vec::new();
    for field in [2049u32, size as u32] {
        bytes.extend(field.to_be_bytes());
    }
    bytes.extend((0..size).map(|i| (i % 10) as u8));
    bytes
}

/// Synthetic Fashion-MNIST files as `(url, gzip bytes)` pairs. Image `i` of a split is
/// filled with the value `i` and labeled `i % 10`.
pub fn fashion_mnist_files(train: usize, test: usize) -> io::Result<Vec<(String, Vec<u8>)>> {
    let contents = [
        idx_images(train),
        idx_labels(train),
        idx_images(test),
        idx_labels(test),
    ];

    FASHION_MNIST_FILES
        .iter()
        .zip(contents)
        .map(|(name, content)| {
            gzip(&content).map(|bytes| (format!("{FASHION_MNIST_URL}{name}.gz"), bytes))
        })
        .collect()
}
