//! `PageSource` implementations for the portal's paginated endpoints.

use crate::api::Portal;
use crate::model::{HistoryEntry, HistoryFilter, Notification, Payment, PaymentFilter, TuroTrip};
use crate::pager::{Page, PageSource};
use crate::Result;

/// The audit log of one car's ledger for one year.
pub struct HistorySource<'a> {
    portal: &'a mut (dyn Portal + Send),
    car_id: String,
    year: i32,
    filter: HistoryFilter,
}

impl<'a> HistorySource<'a> {
    pub fn new(
        portal: &'a mut (dyn Portal + Send),
        car_id: impl Into<String>,
        year: i32,
        filter: HistoryFilter,
    ) -> Self {
        Self {
            portal,
            car_id: car_id.into(),
            year,
            filter,
        }
    }
}

#[async_trait::async_trait]
impl PageSource<HistoryEntry> for HistorySource<'_> {
    async fn fetch_page(&mut self, page: u32, page_size: u32) -> Result<Page<HistoryEntry>> {
        self.portal
            .ledger_history(&self.car_id, self.year, &self.filter, page, page_size)
            .await
    }
}

/// The payments search with a fixed set of filters.
pub struct PaymentSource<'a> {
    portal: &'a mut (dyn Portal + Send),
    filter: PaymentFilter,
}

impl<'a> PaymentSource<'a> {
    pub fn new(portal: &'a mut (dyn Portal + Send), filter: PaymentFilter) -> Self {
        Self { portal, filter }
    }
}

#[async_trait::async_trait]
impl PageSource<Payment> for PaymentSource<'_> {
    async fn fetch_page(&mut self, page: u32, page_size: u32) -> Result<Page<Payment>> {
        self.portal
            .search_payments(&self.filter, page, page_size)
            .await
    }
}

pub struct TripSource<'a> {
    portal: &'a mut (dyn Portal + Send),
}

impl<'a> TripSource<'a> {
    pub fn new(portal: &'a mut (dyn Portal + Send)) -> Self {
        Self { portal }
    }
}

#[async_trait::async_trait]
impl PageSource<TuroTrip> for TripSource<'_> {
    async fn fetch_page(&mut self, page: u32, page_size: u32) -> Result<Page<TuroTrip>> {
        self.portal.turo_trips(page, page_size).await
    }
}

pub struct NotificationSource<'a> {
    portal: &'a mut (dyn Portal + Send),
}

impl<'a> NotificationSource<'a> {
    pub fn new(portal: &'a mut (dyn Portal + Send)) -> Self {
        Self { portal }
    }
}

#[async_trait::async_trait]
impl PageSource<Notification> for NotificationSource<'_> {
    async fn fetch_page(&mut self, page: u32, page_size: u32) -> Result<Page<Notification>> {
        self.portal.notifications(page, page_size).await
    }
}
