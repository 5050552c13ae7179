use std::fmt;

use image::DynamicImage;

/// Labeled image of a classification dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageItem {
    /// Decoded image.
    pub image: DynamicImage,

    /// Class index of the image.
    pub label: usize,
}

/// Partition of a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Split {
    /// Training partition.
    Train,
    /// Evaluation partition.
    Test,
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Split::Train => f.write_str("train"),
            Split::Test => f.write_str("test"),
        }
    }
}
