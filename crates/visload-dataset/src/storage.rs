use std::fmt;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use flate2::read::GzDecoder;
use tar::Archive;

use crate::network::Fetcher;
use crate::{DatasetError, DatasetResult};

/// Dataset download lock.
///
/// Only one thread of the process fetches and unpacks raw files at a time.
static DOWNLOAD_LOCK: Mutex<()> = Mutex::new(());

/// On-disk cache of raw dataset files.
///
/// Files are looked up under [root](DatasetStorage::root) first; the [fetcher](Fetcher)
/// is only called for files that are missing.
#[derive(Clone)]
pub struct DatasetStorage {
    root: PathBuf,
    fetcher: Arc<dyn Fetcher>,
    download: bool,
}

impl fmt::Debug for DatasetStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatasetStorage")
            .field("root", &self.root)
            .field("download", &self.download)
            .finish_non_exhaustive()
    }
}

impl DatasetStorage {
    /// Creates a storage rooted at `root`, fetching missing files with `fetcher`.
    pub fn new(root: impl Into<PathBuf>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            root: root.into(),
            fetcher,
            download: true,
        }
    }

    /// Creates a storage rooted at `root` that downloads missing files over HTTP.
    #[cfg(feature = "network")]
    pub fn http(root: impl Into<PathBuf>) -> Self {
        Self::new(root, Arc::new(crate::network::HttpFetcher))
    }

    /// Creates an HTTP storage in the `visload` folder of the user cache directory.
    #[cfg(feature = "network")]
    pub fn user_cache() -> DatasetResult<Self> {
        let cache_dir = dirs::cache_dir().ok_or_else(|| DatasetError::NotFound {
            path: PathBuf::from("<user cache directory>"),
        })?;

        Ok(Self::http(cache_dir.join("visload")))
    }

    /// Enables or disables downloading of missing files.
    pub fn with_download(mut self, download: bool) -> Self {
        self.download = download;
        self
    }

    /// Root directory of the cache.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether missing files are downloaded.
    pub fn download_enabled(&self) -> bool {
        self.download
    }

    /// Makes sure the `expected` files of a gzip compressed tar archive are present under
    /// `root/dir`, downloading and unpacking the archive into `root` otherwise.
    ///
    /// The archive is expected to contain `dir` as its top-level folder.
    pub fn fetch_archive(&self, url: &str, dir: &str, expected: &[&str]) -> DatasetResult<PathBuf> {
        let target = self.root.join(dir);

        if missing_file(&target, expected).is_none() {
            log::debug!("Using cached {dir} at {}", target.display());
            return Ok(target);
        }

        let _lock = DOWNLOAD_LOCK.lock().unwrap_or_else(PoisonError::into_inner);

        // Another thread may have completed the download while we were waiting.
        let Some(missing) = missing_file(&target, expected) else {
            return Ok(target);
        };
        if !self.download {
            return Err(DatasetError::NotFound { path: missing });
        }

        fs::create_dir_all(&self.root).map_err(|err| DatasetError::io(&self.root, err))?;

        let bytes = self.fetcher.fetch(url, dir)?;
        log::info!("Unpacking {dir} into {}", self.root.display());

        let mut archive = Archive::new(GzDecoder::new(&bytes[..]));
        archive
            .unpack(&self.root)
            .map_err(|source| DatasetError::Archive {
                path: self.root.clone(),
                source,
            })?;

        match missing_file(&target, expected) {
            Some(missing) => Err(DatasetError::format(
                url,
                format!("archive does not contain `{}`", missing.display()),
            )),
            None => Ok(target),
        }
    }

    /// Makes sure every file of `names` is present under `root/dir`, downloading
    /// `{base_url}{name}.gz` and decompressing it for each missing one.
    pub fn fetch_gz_files(&self, base_url: &str, dir: &str, names: &[&str]) -> DatasetResult<PathBuf> {
        let target = self.root.join(dir);

        if missing_file(&target, names).is_none() {
            log::debug!("Using cached {dir} at {}", target.display());
            return Ok(target);
        }

        let _lock = DOWNLOAD_LOCK.lock().unwrap_or_else(PoisonError::into_inner);

        for name in names {
            let file_name = target.join(name);
            if file_name.exists() {
                continue;
            }
            if !self.download {
                return Err(DatasetError::NotFound { path: file_name });
            }

            fs::create_dir_all(&target).map_err(|err| DatasetError::io(&target, err))?;

            let bytes = self.fetcher.fetch(&format!("{base_url}{name}.gz"), name)?;

            // Decode into a partial file first so an interrupted write is never
            // mistaken for a cached file.
            let partial = target.join(format!("{name}.part"));
            let mut output_file =
                File::create(&partial).map_err(|err| DatasetError::io(&partial, err))?;
            let mut gz_buffer = GzDecoder::new(&bytes[..]);
            std::io::copy(&mut gz_buffer, &mut output_file)
                .map_err(|err| DatasetError::format(&partial, format!("invalid gzip: {err}")))?;
            fs::rename(&partial, &file_name).map_err(|err| DatasetError::io(&file_name, err))?;
        }

        Ok(target)
    }
}

/// First of the `names` that does not exist under `dir`.
fn missing_file(dir: &Path, names: &[&str]) -> Option<PathBuf> {
    names
        .iter()
        .map(|name| dir.join(name))
        .find(|path| !path.is_file())
}
