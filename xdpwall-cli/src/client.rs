//! HTTP client for the daemon control API.
//!
//! One method per endpoint. Success bodies are decoded into the shared wire
//! types from `xdpwall_core::api`; error bodies become [`CliError::Api`].

use std::time::Duration;

use reqwest::{Client, Response, Url};
use serde::Serialize;
use tracing::debug;

use xdpwall_core::api::{BlockRequest, ErrorBody, LoadRequest, StatusReport, UnloadRequest};

use crate::error::CliError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Control API client.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base: Url,
    http: Client,
}

impl ApiClient {
    /// Create a client for `server`.
    ///
    /// `server` may omit the scheme (`10.0.0.1:8080`), in which case `http`
    /// is assumed.
    pub fn new(server: &str) -> Result<Self, CliError> {
        let base = normalize_server(server)?;
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("xdpwall-cli/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CliError::Http(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { base, http })
    }

    /// Base URL every endpoint is resolved against.
    pub fn base(&self) -> &Url {
        &self.base
    }

    /// `POST /load`
    pub async fn load(&self, interfaces: &str, mode: &str) -> Result<(), CliError> {
        let body = LoadRequest {
            interfaces: interfaces.to_owned(),
            mode: mode.to_owned(),
        };
        self.post_json("load", &body).await?;
        Ok(())
    }

    /// `POST /unload`
    ///
    /// Returns the interfaces the daemon reported as having nothing loaded.
    pub async fn unload(&self, interfaces: &str) -> Result<Vec<String>, CliError> {
        let body = UnloadRequest {
            interfaces: interfaces.to_owned(),
        };
        let text = self.post_json("unload", &body).await?.text().await?;
        Ok(text
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(str::to_owned)
            .collect())
    }

    /// `POST /block` with `action = "block"` or `"allow"`.
    pub async fn set_action(
        &self,
        target: &str,
        action: &str,
        timeout: u64,
    ) -> Result<(), CliError> {
        let body = BlockRequest {
            target: target.to_owned(),
            action: action.to_owned(),
            timeout,
        };
        self.post_json("block", &body).await?;
        Ok(())
    }

    /// `GET /status`
    pub async fn status(&self) -> Result<StatusReport, CliError> {
        let url = self.endpoint("status")?;
        debug!(url = %url, "GET");
        let response = check(self.http.get(url).send().await?).await?;
        response
            .json::<StatusReport>()
            .await
            .map_err(|e| CliError::Http(format!("bad JSON returned from the server: {e}")))
    }

    /// `POST /flushblocked`
    pub async fn flush_blocked(&self) -> Result<(), CliError> {
        self.post_empty("flushblocked").await
    }

    /// `POST /flushstatus`
    pub async fn flush_stats(&self) -> Result<(), CliError> {
        self.post_empty("flushstatus").await
    }

    fn endpoint(&self, path: &str) -> Result<Url, CliError> {
        self.base
            .join(path)
            .map_err(|_| CliError::InvalidServer(self.base.to_string()))
    }

    async fn post_json<T: Serialize>(&self, path: &str, body: &T) -> Result<Response, CliError> {
        let url = self.endpoint(path)?;
        debug!(url = %url, "POST");
        check(self.http.post(url).json(body).send().await?).await
    }

    async fn post_empty(&self, path: &str) -> Result<(), CliError> {
        let url = self.endpoint(path)?;
        debug!(url = %url, "POST");
        check(self.http.post(url).send().await?).await?;
        Ok(())
    }
}

/// Parse `server` into a base URL ending in `/`.
fn normalize_server(server: &str) -> Result<Url, CliError> {
    let trimmed = server.trim();
    let with_scheme = if trimmed.contains("://") {
        trimmed.to_owned()
    } else {
        format!("http://{trimmed}")
    };

    let mut url =
        Url::parse(&with_scheme).map_err(|_| CliError::InvalidServer(server.to_owned()))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(CliError::InvalidServer(server.to_owned()));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Turn non-2xx responses into [`CliError::Api`].
async fn check(response: Response) -> Result<Response, CliError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let raw = response.bytes().await?;
    match serde_json::from_slice::<ErrorBody>(&raw) {
        Ok(body) => Err(CliError::Api {
            status: status.as_u16(),
            message: body.message,
            completed: body.completed,
        }),
        Err(e) => Err(CliError::Http(format!(
            "bad JSON returned from the server (HTTP {status}): {e}"
        ))),
    }
}
