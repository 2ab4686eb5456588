//! HTTP transport for the PRISM challenge server.
//!
//! The rest of the crate only sees the `Transport` trait: fetch a path, or
//! submit a JSON payload, and get back either the body text or a
//! `TransportError`. Retries and backoff live entirely in `PrismClient`.

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, ClientBuilder, Method, StatusCode};
use serde_json::Value;
use std::time::Duration;

use crate::config::ClientConfig;
use crate::error::TransportError;
use crate::portfolio::Position;

const API_CODE_HEADER: &str = "X-API-Code";

#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch(&self, path: &str) -> Result<String, TransportError>;

    async fn submit(&self, path: &str, payload: &Value) -> Result<String, TransportError>;

    /// Ask the server for a client brief to build a portfolio for.
    async fn get_context(&self) -> Result<String, TransportError> {
        self.fetch("/request").await
    }

    /// Team / account status.
    async fn get_my_current_information(&self) -> Result<String, TransportError> {
        self.fetch("/info").await
    }

    /// Submit positions as `[{"ticker": .., "quantity": ..}, ..]` for scoring.
    async fn send_portfolio(&self, positions: &[Position]) -> Result<String, TransportError> {
        let payload = serde_json::to_value(positions)?;
        self.submit("/submit", &payload).await
    }
}

/// Statuses worth another attempt: rate limiting and gateway/server hiccups.
pub fn is_retryable_status(status: StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 502 | 503 | 504)
}

/// Error body text, or a note saying why it could not be read.
fn body_or_diagnostic<E: std::fmt::Display>(read: Result<String, E>) -> String {
    match read {
        Ok(text) => text,
        Err(e) => {
            debug!("Failed to read error body: {}", e);
            format!("<unreadable body: {}>", e)
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Verb {
    Get,
    Post,
}

impl Verb {
    fn as_str(&self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Post => "POST",
        }
    }

    fn method(&self) -> Method {
        match self {
            Verb::Get => Method::GET,
            Verb::Post => Method::POST,
        }
    }
}

pub struct PrismClient {
    http: Client,
    config: ClientConfig,
}

impl PrismClient {
    pub fn new(config: ClientConfig) -> Result<Self, TransportError> {
        Self::from_builder(config, Client::builder())
    }

    pub fn from_builder(config: ClientConfig, builder: ClientBuilder) -> Result<Self, TransportError> {
        let mut code = HeaderValue::from_str(&config.api_code)?;
        code.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(API_CODE_HEADER, code);

        let http = builder.default_headers(headers).build()?;
        Ok(Self { http, config })
    }

    async fn send_get_request(&self, path: &str) -> Result<String, TransportError> {
        self.execute(Verb::Get, path, None, self.config.get_timeout).await
    }

    async fn send_post_request(&self, path: &str, data: &Value) -> Result<String, TransportError> {
        let body = serde_json::to_vec(data)?;
        self.execute(Verb::Post, path, Some(body), self.config.post_timeout)
            .await
    }

    async fn execute(
        &self,
        verb: Verb,
        path: &str,
        body: Option<Vec<u8>>,
        timeout: Duration,
    ) -> Result<String, TransportError> {
        let url = self.config.url(path);
        let policy = self.config.retry;
        let mut retry = 0;

        loop {
            let mut req = self.http.request(verb.method(), &url).timeout(timeout);
            if let Some(body) = &body {
                req = req
                    .header(CONTENT_TYPE, "application/json")
                    .body(body.clone());
            }
            debug!("{} {} (attempt {})", verb.as_str(), url, retry + 1);

            match req.send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if status == StatusCode::OK {
                        return Ok(resp.text().await?);
                    }
                    if is_retryable_status(status) && retry < policy.max_retries {
                        retry += 1;
                        let delay = policy.delay(retry);
                        warn!(
                            "{} {} -> {}, retry {}/{} in {:?}",
                            verb.as_str(),
                            path,
                            status.as_u16(),
                            retry,
                            policy.max_retries,
                            delay
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return Err(TransportError::Status {
                        method: verb.as_str(),
                        path: path.to_string(),
                        status: status.as_u16(),
                        body: body_or_diagnostic(resp.text().await),
                    });
                }
                Err(e) if (e.is_connect() || e.is_timeout()) && retry < policy.max_retries => {
                    retry += 1;
                    let delay = policy.delay(retry);
                    warn!(
                        "{} {} failed ({}), retry {}/{} in {:?}",
                        verb.as_str(),
                        path,
                        e,
                        retry,
                        policy.max_retries,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

#[async_trait]
impl Transport for PrismClient {
    async fn fetch(&self, path: &str) -> Result<String, TransportError> {
        self.send_get_request(path).await
    }

    async fn submit(&self, path: &str, payload: &Value) -> Result<String, TransportError> {
        self.send_post_request(path, payload).await
    }
}
