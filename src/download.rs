use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::blocking::Client;
use url::Url;

use crate::{temp_path, OuiError, Result};

pub(crate) fn http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("ouimap/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|err| OuiError::Config {
            reason: format!("http client: {err}").into(),
        })
}

/// Local file name for a source URL: its last non-empty path segment.
pub(crate) fn file_name_for_url(url: &str) -> Result<String> {
    let parsed = Url::parse(url).map_err(|err| OuiError::Config {
        reason: format!("invalid source URL {url:?}: {err}").into(),
    })?;
    parsed
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).next_back())
        .map(str::to_string)
        .ok_or_else(|| OuiError::Config {
            reason: format!("source URL {url:?} has no file name").into(),
        })
}

pub(crate) fn local_path(data_dir: &Path, url: &str) -> Result<PathBuf> {
    Ok(data_dir.join(file_name_for_url(url)?))
}

/// Fetch `url` into `dest_dir`, replacing any previous copy only once the
/// body has been received completely.
pub(crate) fn download_file(client: &Client, url: &str, dest_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dest_dir).map_err(|err| OuiError::io(err, dest_dir))?;
    let dest = local_path(dest_dir, url)?;
    tracing::info!(url, dest = %dest.display(), "downloading");

    let download_err = |reason: String| OuiError::Download {
        url: url.to_string(),
        reason,
    };
    let mut response = client
        .get(url)
        .send()
        .map_err(|err| download_err(err.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        return Err(download_err(format!("HTTP {status}")));
    }

    let part = temp_path(&dest);
    let mut file = File::create(&part).map_err(|err| OuiError::io(err, &part))?;
    let bytes = response.copy_to(&mut file).map_err(|err| {
        let _ = fs::remove_file(&part);
        download_err(err.to_string())
    })?;
    drop(file);
    fs::rename(&part, &dest).map_err(|err| OuiError::io(err, &dest))?;

    tracing::info!(dest = %dest.display(), bytes, "download complete");
    Ok(dest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name_for_url() {
        assert_eq!(
            file_name_for_url("http://standards-oui.ieee.org/oui36/oui36.csv").unwrap(),
            "oui36.csv"
        );
        assert_eq!(
            file_name_for_url("https://macaddress.io/database/macaddress.io-db.xml?x=1").unwrap(),
            "macaddress.io-db.xml"
        );
        assert_eq!(
            file_name_for_url("https://example.com/exports/").unwrap(),
            "exports"
        );
        assert!(file_name_for_url("https://example.com/").is_err());
        assert!(file_name_for_url("not a url").is_err());
    }

    #[test]
    fn test_local_path() {
        let path = local_path(Path::new("data"), "http://standards-oui.ieee.org/iab/iab.csv").unwrap();
        assert_eq!(path, Path::new("data").join("iab.csv"));
    }
}
