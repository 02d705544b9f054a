use std::time::Duration;

use reqwest::{Client, StatusCode, Url};
use tokio::time::sleep;
use tracing::warn;

use crate::core::error::AppError;

const RETRY_ATTEMPTS: usize = 3;
const RETRY_DELAY_MS: u64 = 500;

pub fn build_http_client(disable_proxy: bool) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .user_agent("openparliament-scraper/1.0")
        .timeout(Duration::from_secs(10));

    if disable_proxy {
        builder = builder.no_proxy();
    }

    builder.build()
}

/// Fetches documents from the upstream parliamentary sites.
#[derive(Clone)]
pub struct SourceClient {
    http_client: Client,
}

impl SourceClient {
    pub fn new(disable_proxy: bool) -> Result<Self, AppError> {
        let http_client = build_http_client(disable_proxy)
            .map_err(|err| AppError::internal(format!("failed to build HTTP client: {err}")))?;
        Ok(Self { http_client })
    }

    pub fn http(&self) -> &Client {
        &self.http_client
    }

    /// Returns the body of a successful response; any other status is an error.
    pub async fn get_bytes(&self, url: &Url) -> Result<Vec<u8>, AppError> {
        let (status, body) = self.get_with_status(url).await?;
        if !status.is_success() {
            let snippet = String::from_utf8_lossy(&body)
                .chars()
                .take(512)
                .collect::<String>();
            return Err(AppError::upstream(format!(
                "request to {url} failed with {status}: {snippet}"
            )));
        }
        Ok(body)
    }

    /// Like `get_bytes`, but a 404 is `Ok(None)`.
    pub async fn get_optional(&self, url: &Url) -> Result<Option<Vec<u8>>, AppError> {
        let (status, body) = self.get_with_status(url).await?;
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(AppError::upstream(format!("request to {url} failed with {status}")));
        }
        Ok(Some(body))
    }

    pub async fn get_text(&self, url: &Url) -> Result<String, AppError> {
        let body = self.get_bytes(url).await?;
        String::from_utf8(body)
            .map_err(|err| AppError::parse(format!("response from {url} is not UTF-8: {err}")))
    }

    /// Network failures and 5xx responses are retried; the final status is returned.
    pub async fn get_with_status(&self, url: &Url) -> Result<(StatusCode, Vec<u8>), AppError> {
        let mut last_error: Option<AppError> = None;

        for attempt in 0..RETRY_ATTEMPTS {
            match self.http_client.get(url.clone()).send().await {
                Ok(resp) if resp.status().is_server_error() => {
                    let status = resp.status();
                    warn!(%url, %status, attempt, "upstream server error");
                    last_error = Some(AppError::upstream(format!(
                        "request to {url} failed with {status}"
                    )));
                }
                Ok(resp) => {
                    let status = resp.status();
                    let body = resp.bytes().await.map_err(|err| {
                        AppError::upstream(format!("failed to read body from {url}: {err}"))
                    })?;
                    return Ok((status, body.to_vec()));
                }
                Err(err) => {
                    last_error = Some(AppError::upstream(format!(
                        "network error contacting {url}: {err}"
                    )));
                }
            }

            if attempt < RETRY_ATTEMPTS - 1 {
                sleep(Duration::from_millis(RETRY_DELAY_MS * (attempt as u64 + 1))).await;
            }
        }

        Err(last_error.unwrap_or_else(|| AppError::internal("request failed".to_string())))
    }
}

pub fn parse_url(value: &str) -> Result<Url, AppError> {
    Url::parse(value).map_err(|err| AppError::internal(format!("invalid url {value}: {err}")))
}
