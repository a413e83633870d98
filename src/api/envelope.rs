//! The `{ success, data, ...pagination }` wrapper used by every portal response.

use crate::api::Method;
use crate::pager::Page;
use crate::Result;
use anyhow::{bail, Context};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Envelope<T> {
    pub(crate) success: bool,
    pub(crate) data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) total: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) message: Option<String>,
}

impl<T> Envelope<T> {
    pub(crate) fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            total: None,
            page: None,
            limit: None,
            message: None,
        }
    }

    pub(crate) fn paged(data: T, total: u64, page: u32, limit: u32) -> Self {
        Self {
            total: Some(total),
            page: Some(page),
            limit: Some(limit),
            ..Self::ok(data)
        }
    }
}

impl<T> Envelope<T>
where
    T: DeserializeOwned,
{
    /// Parses a response body into an envelope. A body that says `success: false` is an error
    /// even when the HTTP status was OK.
    pub(crate) fn parse(what: &str, body: Value) -> Result<Self> {
        if body.get("success").and_then(Value::as_bool) == Some(false) {
            let message = error_message(&body).unwrap_or_else(|| "no message given".to_string());
            bail!("The portal rejected {what}: {message}");
        }
        serde_json::from_value(body).with_context(|| format!("Unexpected response for {what}"))
    }

    pub(crate) fn into_data(self, what: &str) -> Result<T> {
        self.data
            .with_context(|| format!("The response for {what} had no data"))
    }
}

impl<R> Envelope<Vec<R>>
where
    R: DeserializeOwned,
{
    /// Converts a list response into a `Page`. When the portal omits pagination fields the page
    /// is taken to be the last one.
    pub(crate) fn into_page(self, what: &str, page: u32, limit: u32) -> Result<Page<R>> {
        let page = self.page.unwrap_or(page);
        let limit = self.limit.unwrap_or(limit);
        let total = self.total;
        let rows = self.into_data(what)?;
        let total = total.unwrap_or_else(|| {
            u64::from(page.saturating_sub(1)) * u64::from(limit) + rows.len() as u64
        });
        Ok(Page::new(rows, page, limit, total))
    }
}

/// Pulls a human readable message out of an error body, looking at `message` and then `error`.
pub(crate) fn error_message(body: &Value) -> Option<String> {
    ["message", "error"]
        .iter()
        .filter_map(|k| body.get(*k))
        .find_map(|v| match v {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Object(_) => error_message(v),
            _ => None,
        })
}

/// Builds the error for a non-OK response. Both transports report failures this way.
pub(crate) fn status_error(method: Method, path: &str, status: u16, body: &Value) -> anyhow::Error {
    let message = error_message(body).unwrap_or_else(|| "no message given".to_string());
    anyhow::anyhow!("{method} {path} failed with status {status}: {message}")
}
