//! HTTP transport to the card bridge over its unix socket.

use anyhow::{Context, Result, bail, ensure};
use reqwest::{Client, Response};
use std::path::Path;

/// Filesystem path of a bridge address given as `/path` or `unix:///path`
pub fn bridge_socket_path(address: &str) -> &Path {
    Path::new(address.strip_prefix("unix://").unwrap_or(address))
}

/// Client sending every request to the card bridge at `address`.
///
/// Fails when no socket exists at that path, e.g. while the bridge is not
/// running. Request URLs only need a path; the host part is ignored.
pub fn unix_socket_client(address: &str) -> Result<Client> {
    let socket = bridge_socket_path(address);

    let exists = socket
        .try_exists()
        .context(format!("failed to access card bridge socket {}", socket.display()))?;
    ensure!(exists, "card bridge socket {} not found", socket.display());

    Client::builder()
        .unix_socket(socket)
        .build()
        .context("failed to build card bridge client")
}

/// Raw body of a bridge reply.
///
/// A non-2xx reply becomes an error carrying `request`, the status and the
/// bridge's message.
pub async fn response_body(res: Response, request: &str) -> Result<Vec<u8>> {
    let status = res.status();
    let body = res
        .bytes()
        .await
        .context(format!("{request}: failed to read reply"))?;

    if !status.is_success() {
        bail!(
            "{request} answered {status}: {}",
            String::from_utf8_lossy(&body).trim_end()
        );
    }

    Ok(body.to_vec())
}
