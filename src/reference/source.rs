//! Reading reference inputs from disk or, for polygon datasets, over HTTP.

use super::types::GeoError;
use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::Path;
use std::time::Duration;

const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(60);

pub fn is_url(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

/// Read a whole text file, or fetch it if `location` is an http(s) URL.
pub fn read_text(location: &str, timeout: Option<Duration>) -> Result<String, GeoError> {
    if is_url(location) {
        return fetch(location, timeout.unwrap_or(DEFAULT_FETCH_TIMEOUT));
    }
    fs::read_to_string(location).map_err(|e| map_io(e, Path::new(location)))
}

/// Open a local file for streaming parsers.
pub fn open(path: &Path) -> Result<BufReader<File>, GeoError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|e| map_io(e, path))
}

fn map_io(e: io::Error, path: &Path) -> GeoError {
    if e.kind() == io::ErrorKind::NotFound {
        GeoError::FileNotFound(path.to_path_buf())
    } else {
        GeoError::Io(e)
    }
}

fn fetch(url: &str, timeout: Duration) -> Result<String, GeoError> {
    tracing::info!(%url, "fetching reference file");
    let agent = ureq::AgentBuilder::new()
        .timeout(timeout)
        .user_agent(concat!("geo-reference/", env!("CARGO_PKG_VERSION")))
        .build();

    let resp = agent.get(url).call().map_err(|e| match e {
        ureq::Error::Status(404, _) => GeoError::FileNotFound(url.into()),
        other => GeoError::Http(other.to_string()),
    })?;

    // `into_string` caps bodies at 10 MB; polygon files are larger.
    let mut text = String::new();
    resp.into_reader()
        .read_to_string(&mut text)
        .map_err(|e| GeoError::Http(format!("{}: {}", url, e)))?;
    Ok(text)
}
