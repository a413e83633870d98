//! Implements the `Transport` trait with `reqwest` against a live portal.

use crate::api::envelope::status_error;
use crate::api::{Method, Request, Transport};
use crate::{Config, Result};
use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, COOKIE};
use reqwest::{Client, ClientBuilder};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, trace, warn};
use url::Url;

const TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Sends requests to the portal over HTTP. The session cookie, when configured, is attached to
/// every request, which is what a browser does for `credentials: "include"`.
pub(super) struct HttpTransport {
    client: Client,
    base: Url,
}

impl HttpTransport {
    pub(super) async fn new(config: &Config) -> Result<Self> {
        Self::build(config, Client::builder()).await
    }

    async fn build(config: &Config, builder: ClientBuilder) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        match config.session().await? {
            Some(cookie) => {
                let mut value = HeaderValue::from_str(&cookie)
                    .context("The session cookie contains characters that cannot be sent")?;
                value.set_sensitive(true);
                headers.insert(COOKIE, value);
            }
            None => warn!(
                "No session cookie found at {}, requests will be sent unauthenticated",
                config.session_path().display()
            ),
        }

        let client = builder
            .user_agent(USER_AGENT)
            .timeout(TIMEOUT)
            .default_headers(headers)
            .build()
            .context("Failed to create the HTTP client")?;

        Ok(Self {
            client,
            base: config.api_url().clone(),
        })
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base
            .join(path.trim_start_matches('/'))
            .with_context(|| format!("Unable to build a URL for {path}"))
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn send(&mut self, request: Request) -> Result<Value> {
        let url = self.url(&request.path)?;
        debug!("{} {}", request.method, url);
        trace!("{request:?}");

        let builder = match request.method {
            Method::Get => self.client.get(url.clone()),
            Method::Post => self.client.post(url.clone()),
            Method::Put => self.client.put(url.clone()),
        };
        let builder = builder.query(&request.query);
        let builder = match &request.body {
            Some(body) => builder.json(body),
            None => builder,
        };

        let response = builder
            .send()
            .await
            .with_context(|| format!("Unable to reach the portal at {url}"))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .with_context(|| format!("Failed to read the response from {url}"))?;
        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            match serde_json::from_str(&text) {
                Ok(v) => v,
                Err(e) if status.is_success() => {
                    return Err(e).with_context(|| format!("The response from {url} is not JSON"))
                }
                // Error pages are often HTML; keep the status and drop the body.
                Err(_) => Value::Null,
            }
        };

        if !status.is_success() {
            return Err(status_error(
                request.method,
                &request.path,
                status.as_u16(),
                &body,
            ));
        }
        Ok(body)
    }
}
