/// Data loader module.
pub mod dataloader;

/// Dataset module.
pub mod dataset {
    pub use visload_dataset::*;
}
