//! Access to the portal's REST API.
//!
//! Two layers are used. The `Transport` trait moves JSON requests and responses; there is an HTTP
//! implementation and an in-memory implementation for tests. The `Portal` trait is built on any
//! `Transport` and speaks in terms of the data model.

mod envelope;
mod http;
mod portal;
mod sources;
mod test_transport;

use crate::model::{
    Car, CellChange, Client, HistoryEntry, HistoryFilter, LedgerCell, Notification, Payment,
    PaymentFilter, TuroTrip, User, YearLedger,
};
use crate::nav::QuickLink;
use crate::pager::Page;
use crate::{Config, Result};
use serde::Serialize;
use serde_json::Value;
use std::fmt::{Display, Formatter};

pub(crate) use envelope::Envelope;
pub use sources::{HistorySource, NotificationSource, PaymentSource, TripSource};
pub use test_transport::{TestState, TestTransport};

pub(crate) const CARS: &str = "/api/cars";
pub(crate) const CLIENTS: &str = "/api/clients";
pub(crate) const USERS: &str = "/api/admin/users";
pub(crate) const INCOME_EXPENSE: &str = "/api/income-expense";
pub(crate) const PAYMENTS_SEARCH: &str = "/api/payments/search";
pub(crate) const TURO_TRIPS: &str = "/api/turo-trips";
pub(crate) const NOTIFICATIONS: &str = "/api/notifications";
pub(crate) const QUICK_LINKS: &str = "/api/quick-links";

/// The path of a car's ledger for one year.
pub(crate) fn ledger_path(car_id: &str, year: i32) -> String {
    format!("{INCOME_EXPENSE}/{car_id}/{year}")
}

/// The path of a car's ledger audit log for one year.
pub(crate) fn history_path(car_id: &str, year: i32) -> String {
    format!("{}/history", ledger_path(car_id, year))
}

/// Whether we talk to a real portal or to the in-memory one.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub enum Mode {
    #[default]
    Http,
    Testing,
}

impl Mode {
    /// Returns `Mode::Testing` when `FLEETDESK_IN_TEST_MODE` is set to a non-empty value, so that
    /// the whole program can be run without a portal.
    pub fn from_env() -> Self {
        match std::env::var("FLEETDESK_IN_TEST_MODE") {
            Ok(v) if !v.is_empty() => Mode::Testing,
            _ => Mode::Http,
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
pub enum Method {
    Get,
    Post,
    Put,
}

impl Display for Method {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
        })
    }
}

/// A JSON request to the portal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Request {
    pub method: Method,
    /// Absolute API path, e.g. `/api/cars`.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl Request {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            query: Vec::new(),
            body: Some(body),
        }
    }

    pub fn put(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Put,
            path: path.into(),
            query: Vec::new(),
            body: Some(body),
        }
    }

    pub fn with_query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    /// Looks up a query parameter by name.
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Sends requests to the portal. Implementations return the JSON body of a successful response
/// and an error for anything else; a non-OK status becomes an error whose message is taken from
/// the response body when it has one.
#[async_trait::async_trait]
pub trait Transport {
    async fn send(&mut self, request: Request) -> Result<Value>;
}

/// The portal's operations, expressed in terms of the data model.
#[async_trait::async_trait]
pub trait Portal {
    async fn cars(&mut self) -> Result<Vec<Car>>;

    async fn clients(&mut self) -> Result<Vec<Client>>;

    async fn users(&mut self) -> Result<Vec<User>>;

    /// Fetches a car's ledger for `year`. The portal creates zero-valued cells the first time a
    /// year is queried.
    async fn ledger(&mut self, car_id: &str, year: i32) -> Result<YearLedger>;

    /// Saves one cell and returns the portal's copy of it.
    async fn update_cell(
        &mut self,
        car_id: &str,
        year: i32,
        change: &CellChange,
    ) -> Result<LedgerCell>;

    async fn ledger_history(
        &mut self,
        car_id: &str,
        year: i32,
        filter: &HistoryFilter,
        page: u32,
        limit: u32,
    ) -> Result<Page<HistoryEntry>>;

    async fn search_payments(
        &mut self,
        filter: &PaymentFilter,
        page: u32,
        limit: u32,
    ) -> Result<Page<Payment>>;

    async fn turo_trips(&mut self, page: u32, limit: u32) -> Result<Page<TuroTrip>>;

    async fn notifications(&mut self, page: u32, limit: u32) -> Result<Page<Notification>>;

    async fn quick_links(&mut self) -> Result<Vec<QuickLink>>;
}

/// Creates the transport for `mode`.
pub async fn transport(config: &Config, mode: Mode) -> Result<Box<dyn Transport + Send>> {
    Ok(match mode {
        Mode::Http => Box::new(http::HttpTransport::new(config).await?),
        Mode::Testing => Box::new(TestTransport::new(config.api_url().as_str())),
    })
}

/// Wraps a transport in the `Portal` implementation.
pub fn portal(transport: Box<dyn Transport + Send>) -> Box<dyn Portal + Send> {
    Box::new(portal::PortalImpl::new(transport))
}

/// Creates a `Portal` for the configured API in `mode`.
pub async fn connect(config: &Config, mode: Mode) -> Result<Box<dyn Portal + Send>> {
    Ok(portal(transport(config, mode).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        assert_eq!(ledger_path("car-7", 2024), "/api/income-expense/car-7/2024");
        assert_eq!(
            history_path("car-7", 2024),
            "/api/income-expense/car-7/2024/history"
        );
    }

    #[test]
    fn test_request_query() {
        let r = Request::get(TURO_TRIPS)
            .with_query("page", 2)
            .with_query("limit", 25);
        assert_eq!(r.query_value("page"), Some("2"));
        assert_eq!(r.query_value("limit"), Some("25"));
        assert_eq!(r.query_value("sort"), None);
        assert_eq!(r.method.to_string(), "GET");
    }
}
