//! Socket endpoint resolution
//!
//! The dashboard connects back to the host it was served from: the socket
//! URL reuses the origin's host and port, with `http` mapped to `ws` and
//! `https` to `wss`.

use url::Url;

/// Default socket path on the telemetry server
pub const DEFAULT_PATH: &str = "/ws";

/// Endpoint resolution errors
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum EndpointError {
    #[error("Invalid origin {origin:?}: {reason}")]
    InvalidOrigin { origin: String, reason: String },

    #[error("Unsupported origin scheme: {0}")]
    UnsupportedScheme(String),

    #[error("Origin has no host: {0}")]
    MissingHost(String),
}

/// Build the socket URL from the application's origin and a path
pub fn resolve_endpoint(origin: &str, path: &str) -> Result<Url, EndpointError> {
    let mut url = Url::parse(origin.trim()).map_err(|e| EndpointError::InvalidOrigin {
        origin: origin.to_string(),
        reason: e.to_string(),
    })?;

    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => return Err(EndpointError::UnsupportedScheme(other.to_string())),
    };

    if url.host_str().map_or(true, str::is_empty) {
        return Err(EndpointError::MissingHost(origin.to_string()));
    }

    url.set_scheme(scheme)
        .map_err(|()| EndpointError::UnsupportedScheme(url.scheme().to_string()))?;

    let path = path.trim();
    if path.is_empty() {
        url.set_path(DEFAULT_PATH);
    } else if path.starts_with('/') {
        url.set_path(path);
    } else {
        url.set_path(&format!("/{}", path));
    }
    url.set_query(None);
    url.set_fragment(None);

    Ok(url)
}
