use std::ffi::OsString;
use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::core::error::{LauncherError, LauncherResult};

/// What the server told us about a completed transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOutcome {
    pub bytes_written: u64,
    pub content_length: Option<u64>,
}

/// Streaming HTTP fetcher. Cloning shares the underlying connection pool.
#[derive(Debug, Clone)]
pub struct Downloader {
    client: Client,
}

impl Downloader {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    // ── Single file download ────────────────────────────

    /// Stream `url` into `dest`, calling `on_chunk` with the size of every
    /// chunk written. The body lands in a `.part` sibling that is renamed
    /// over `dest` only once the transfer finished; a failed transfer
    /// leaves nothing at `dest`.
    pub async fn fetch_to_file<F>(
        &self,
        url: &str,
        dest: &Path,
        on_chunk: F,
    ) -> LauncherResult<FetchOutcome>
    where
        F: FnMut(u64),
    {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| LauncherError::io(parent, e))?;
        }

        let response = self.send(url).await?;
        let content_length = response.content_length();
        let partial = partial_path(dest);

        let bytes_written = match stream_body(url, response, &partial, on_chunk).await {
            Ok(n) => n,
            Err(e) => {
                let _ = tokio::fs::remove_file(&partial).await;
                return Err(e);
            }
        };
        if let Some(expected) = content_length.filter(|&len| len != bytes_written) {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(LauncherError::Fetch {
                url: url.to_string(),
                reason: format!("body ended after {bytes_written} of {expected} bytes"),
            });
        }
        tokio::fs::rename(&partial, dest)
            .await
            .map_err(|e| LauncherError::io(dest, e))?;

        debug!("Downloaded: {} -> {:?} ({} bytes)", url, dest, bytes_written);
        Ok(FetchOutcome {
            bytes_written,
            content_length,
        })
    }

    pub async fn fetch_text(&self, url: &str) -> LauncherResult<String> {
        let response = self.send(url).await?;
        response.text().await.map_err(|e| fetch_error(url, e))
    }

    pub async fn fetch_json<T: DeserializeOwned>(&self, url: &str) -> LauncherResult<T> {
        let body = self.fetch_text(url).await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn send(&self, url: &str) -> LauncherResult<reqwest::Response> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| fetch_error(url, e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(LauncherError::Fetch {
                url: url.to_string(),
                reason: format!("HTTP {}", status.as_u16()),
            });
        }
        Ok(response)
    }
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().map(OsString::from).unwrap_or_default();
    name.push(".part");
    dest.with_file_name(name)
}

async fn stream_body<F>(
    url: &str,
    response: reqwest::Response,
    partial: &Path,
    mut on_chunk: F,
) -> LauncherResult<u64>
where
    F: FnMut(u64),
{
    let mut file = tokio::fs::File::create(partial)
        .await
        .map_err(|e| LauncherError::io(partial, e))?;
    let mut bytes_written = 0u64;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| fetch_error(url, e))?;
        file.write_all(&chunk)
            .await
            .map_err(|e| LauncherError::io(partial, e))?;
        bytes_written += chunk.len() as u64;
        on_chunk(chunk.len() as u64);
    }
    file.flush().await.map_err(|e| LauncherError::io(partial, e))?;
    Ok(bytes_written)
}

fn fetch_error(url: &str, err: reqwest::Error) -> LauncherError {
    let reason = if err.is_timeout() {
        format!("timed out: {err}")
    } else {
        err.to_string()
    };
    LauncherError::Fetch {
        url: url.to_string(),
        reason,
    }
}
