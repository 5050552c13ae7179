use std::cmp::min;
use std::io::Read;

use indicatif::{ProgressBar, ProgressStyle};

use super::Fetcher;
use crate::{DatasetError, DatasetResult};

const DOWNLOAD_CHUNK_SIZE: usize = 1024;

/// Download the file at the specified url to a bytes vector.
/// File download progress is reported with the help of a [progress bar](indicatif).
///
/// # Arguments
///
/// * `url` - The file URL to download.
/// * `message` - The message to display on the progress bar during download.
///
/// # Returns
///
/// A vector of bytes containing the downloaded file data.
pub fn download_file_as_bytes(url: &str, message: &str) -> DatasetResult<Vec<u8>> {
    let download_error = |reason: String| DatasetError::Download {
        url: url.to_string(),
        reason,
    };

    // Get file from web
    let mut response = reqwest::blocking::get(url)
        .and_then(|response| response.error_for_status())
        .map_err(|err| download_error(err.to_string()))?;
    let total_size = response.content_length();

    // Pretty progress bar
    let pb = match total_size {
        Some(size) => ProgressBar::new(size),
        None => ProgressBar::new_spinner(),
    };
    let msg = message.to_owned();
    if let Ok(style) = ProgressStyle::with_template(
        "{msg}\n    {wide_bar:.cyan/blue} {bytes}/{total_bytes} ({eta})",
    ) {
        pb.set_style(style.progress_chars("█  "));
    }
    pb.set_message(msg.clone());

    // Read stream into bytes
    let mut bytes: Vec<u8> = Vec::with_capacity(total_size.unwrap_or_default() as usize);
    let mut buffer = [0; DOWNLOAD_CHUNK_SIZE];
    let mut downloaded: u64 = 0;
    loop {
        let bytes_read = response
            .read(&mut buffer)
            .map_err(|err| download_error(err.to_string()))?;
        if bytes_read == 0 {
            break;
        }
        bytes.extend_from_slice(&buffer[..bytes_read]);

        downloaded += bytes_read as u64;
        pb.set_position(match total_size {
            Some(size) => min(downloaded, size),
            None => downloaded,
        });
    }

    if let Some(size) = total_size {
        if downloaded != size {
            return Err(download_error(format!(
                "expected {size} bytes, received {downloaded}"
            )));
        }
    }

    pb.finish_with_message(msg);

    Ok(bytes)
}

/// Fetches files over HTTP(S).
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpFetcher;

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str, name: &str) -> DatasetResult<Vec<u8>> {
        log::info!("Downloading {name} from {url}");
        download_file_as_bytes(url, &format!("Downloading {name}"))
    }
}
