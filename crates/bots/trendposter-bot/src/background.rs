use std::path::{Path, PathBuf};

use image::ImageFormat;
use snafu::{ResultExt as _, Snafu};
use tracing::{debug, warn};
use trendposter_text::safe_filename_from_url;
use trendposter_util_error::FmtCompact as _;

use crate::scraper::{ScrapeError, WebSource};

#[derive(Debug, Snafu)]
pub enum BackgroundError {
    #[snafu(display("Failed to download image: {source}"))]
    Download { source: ScrapeError },
    #[snafu(display("Failed to decode image: {source}"))]
    Decode { source: image::ImageError },
    #[snafu(display("Failed to save {}: {source}", path.display()))]
    Save {
        path: PathBuf,
        source: image::ImageError,
    },
}

pub type BackgroundResult<T> = std::result::Result<T, BackgroundError>;

/// Download `image_url` and store it as an RGB JPEG in `dir`.
pub async fn download_background(
    source: &dyn WebSource,
    image_url: &str,
    dir: &Path,
) -> BackgroundResult<PathBuf> {
    let bytes = source.fetch_bytes(image_url).await.context(DownloadSnafu)?;
    let rgb = image::load_from_memory(&bytes)
        .context(DecodeSnafu)?
        .into_rgb8();

    let path = dir.join(format!("{}.jpg", safe_filename_from_url(image_url)));
    rgb.save_with_format(&path, ImageFormat::Jpeg)
        .context(SaveSnafu { path: &path })?;

    debug!(path = %path.display(), "Background downloaded");
    Ok(path)
}

/// The article's own image when available, `default` otherwise.
pub async fn prepare_background(
    source: &dyn WebSource,
    image_url: Option<&str>,
    default: &Path,
    dir: &Path,
) -> PathBuf {
    let Some(image_url) = image_url.filter(|u| !u.is_empty()) else {
        return default.to_owned();
    };

    match download_background(source, image_url, dir).await {
        Ok(path) => path,
        Err(err) => {
            warn!(
                url = %image_url,
                err = %err.fmt_compact(),
                "Failed to get background image, using default"
            );
            default.to_owned()
        }
    }
}
