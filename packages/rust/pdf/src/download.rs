//! Document downloads into the local cache directory.

use std::path::{Path, PathBuf};

use reqwest::Client;
use tracing::{debug, info};

use campuscorpus_shared::{CorpusError, Result};

/// Download `url` to `dest` unless it already exists.
///
/// The body goes to a temporary sibling first and is renamed into place,
/// so `dest` is either absent or complete. Returns whether a download
/// happened.
pub async fn download_if_absent(client: &Client, url: &str, dest: &Path) -> Result<bool> {
    if tokio::fs::try_exists(dest).await.unwrap_or(false) {
        debug!(path = %dest.display(), "document already cached");
        return Ok(false);
    }

    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| CorpusError::io(parent, e))?;
    }

    let response = client
        .get(url)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| CorpusError::Network(format!("{url}: {e}")))?;
    let bytes = response
        .bytes()
        .await
        .map_err(|e| CorpusError::Network(format!("{url}: {e}")))?;

    let tmp = partial_path(dest);
    tokio::fs::write(&tmp, &bytes)
        .await
        .map_err(|e| CorpusError::io(&tmp, e))?;
    tokio::fs::rename(&tmp, dest)
        .await
        .map_err(|e| CorpusError::io(dest, e))?;

    info!(%url, path = %dest.display(), bytes = bytes.len(), "document downloaded");
    Ok(true)
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    dest.with_file_name(name)
}
