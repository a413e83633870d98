//! Implements the `Portal` trait on top of any `Transport`.

use crate::api::{
    history_path, ledger_path, Envelope, Portal, Request, Transport, CARS, CLIENTS,
    NOTIFICATIONS, PAYMENTS_SEARCH, QUICK_LINKS, TURO_TRIPS, USERS,
};
use crate::model::{
    Car, CellChange, Client, HistoryEntry, HistoryFilter, LedgerCell, Notification, Payment,
    PaymentFilter, TuroTrip, User, YearLedger,
};
use crate::nav::QuickLink;
use crate::pager::Page;
use crate::Result;
use anyhow::{ensure, Context};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;

/// Implements the `Portal` trait by decoding envelopes returned through a dynamically-dispatched
/// `Transport`.
pub(super) struct PortalImpl {
    transport: Box<dyn Transport + Send>,
}

impl PortalImpl {
    pub(super) fn new(transport: Box<dyn Transport + Send>) -> Self {
        Self { transport }
    }

    async fn data<T>(&mut self, what: &str, request: Request) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let body = self.transport.send(request).await?;
        Envelope::<T>::parse(what, body)?.into_data(what)
    }

    async fn page<T>(&mut self, what: &str, request: Request, page: u32, limit: u32) -> Result<Page<T>>
    where
        T: DeserializeOwned,
    {
        let body = self.transport.send(request).await?;
        let page = Envelope::<Vec<T>>::parse(what, body)?.into_page(what, page, limit)?;
        debug!(
            "Fetched page {} of {what}: {} rows of {} total",
            page.page(),
            page.rows().len(),
            page.total()
        );
        Ok(page)
    }
}

fn check_paging(page: u32, limit: u32) -> Result<()> {
    ensure!(page >= 1, "Pages are numbered from 1, got {page}");
    ensure!(limit >= 1, "The page size must be at least 1");
    Ok(())
}

#[async_trait::async_trait]
impl Portal for PortalImpl {
    async fn cars(&mut self) -> Result<Vec<Car>> {
        self.data("the car list", Request::get(CARS)).await
    }

    async fn clients(&mut self) -> Result<Vec<Client>> {
        self.data("the client list", Request::get(CLIENTS)).await
    }

    async fn users(&mut self) -> Result<Vec<User>> {
        self.data("the user list", Request::get(USERS)).await
    }

    async fn ledger(&mut self, car_id: &str, year: i32) -> Result<YearLedger> {
        let what = format!("the {year} ledger of car {car_id}");
        self.data(&what, Request::get(ledger_path(car_id, year)))
            .await
    }

    async fn update_cell(
        &mut self,
        car_id: &str,
        year: i32,
        change: &CellChange,
    ) -> Result<LedgerCell> {
        let what = format!("the update of {}", change.key());
        let body = serde_json::to_value(change).context("Unable to serialize the cell change")?;
        let cell: LedgerCell = self
            .data(&what, Request::put(ledger_path(car_id, year), body))
            .await?;
        ensure!(
            cell.key == change.key(),
            "The portal answered the update of {} with cell {}",
            change.key(),
            cell.key
        );
        Ok(cell)
    }

    async fn ledger_history(
        &mut self,
        car_id: &str,
        year: i32,
        filter: &HistoryFilter,
        page: u32,
        limit: u32,
    ) -> Result<Page<HistoryEntry>> {
        check_paging(page, limit)?;
        let mut request = Request::get(history_path(car_id, year))
            .with_query("page", page)
            .with_query("limit", limit);
        if let Some(category) = filter.category {
            request = request.with_query("category", category);
        }
        if let Some(month) = filter.month {
            request = request.with_query("month", month.number());
        }
        self.page("the ledger history", request, page, limit).await
    }

    async fn search_payments(
        &mut self,
        filter: &PaymentFilter,
        page: u32,
        limit: u32,
    ) -> Result<Page<Payment>> {
        check_paging(page, limit)?;
        let mut body = serde_json::to_value(filter).context("Unable to serialize the filter")?;
        if let Some(obj) = body.as_object_mut() {
            obj.insert("page".to_string(), json!(page));
            obj.insert("limit".to_string(), json!(limit));
        }
        self.page(
            "the payment search",
            Request::post(PAYMENTS_SEARCH, body),
            page,
            limit,
        )
        .await
    }

    async fn turo_trips(&mut self, page: u32, limit: u32) -> Result<Page<TuroTrip>> {
        check_paging(page, limit)?;
        let request = Request::get(TURO_TRIPS)
            .with_query("page", page)
            .with_query("limit", limit);
        self.page("the Turo trips", request, page, limit).await
    }

    async fn notifications(&mut self, page: u32, limit: u32) -> Result<Page<Notification>> {
        check_paging(page, limit)?;
        let request = Request::get(NOTIFICATIONS)
            .with_query("page", page)
            .with_query("limit", limit);
        self.page("the notifications", request, page, limit).await
    }

    async fn quick_links(&mut self) -> Result<Vec<QuickLink>> {
        self.data("the quick links", Request::get(QUICK_LINKS)).await
    }
}
