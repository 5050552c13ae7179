mod fetcher;

#[cfg(feature = "network")]
mod downloader;

pub use fetcher::*;

#[cfg(feature = "network")]
pub use downloader::*;
