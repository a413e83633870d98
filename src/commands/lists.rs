//! The paginated lists: payments, Turo trips and notifications.

use crate::api::{connect, Mode, NotificationSource, PaymentSource, TripSource};
use crate::args::{PageArgs, PaymentsArgs};
use crate::commands::{load_pages, showing, table, Out};
use crate::error::{ErrorType, IntoResult};
use crate::model::{Notification, Payment, PaymentFilter, TuroTrip};
use crate::{Config, Result};

/// Searches payments. The filters are sent to the portal, which does the matching.
pub async fn payments(config: Config, mode: Mode, args: PaymentsArgs) -> Result<Out<Vec<Payment>>> {
    let filter = PaymentFilter {
        status: args.status(),
        month: args.month(),
        year: args.year(),
        search: args.search().map(String::from),
    };
    let mut portal = connect(&config, mode).await.pub_result(ErrorType::Config)?;
    let mut source = PaymentSource::new(portal.as_mut(), filter);
    let loader = load_pages(&config, args.paging(), &mut source)
        .await
        .pub_result(ErrorType::Request)?;

    let summary = showing(&loader, "payments");
    let payments = loader.into_rows();
    let rows: Vec<Vec<String>> = payments
        .iter()
        .map(|p| {
            vec![
                p.id.clone(),
                p.car_id.clone(),
                format!("{} {}", p.month, p.year),
                p.amount.to_string(),
                p.status.to_string(),
                p.paid_on.map(|d| d.to_string()).unwrap_or_default(),
                p.note.clone(),
            ]
        })
        .collect();
    let message = format!(
        "{summary}\n{}",
        table(
            &["ID", "Car", "Period", "Amount", "Status", "Paid on", "Note"],
            &rows
        )
    );
    Ok(Out::new(message, payments))
}

pub async fn trips(config: Config, mode: Mode, args: PageArgs) -> Result<Out<Vec<TuroTrip>>> {
    let mut portal = connect(&config, mode).await.pub_result(ErrorType::Config)?;
    let mut source = TripSource::new(portal.as_mut());
    let loader = load_pages(&config, &args, &mut source)
        .await
        .pub_result(ErrorType::Request)?;

    let summary = showing(&loader, "trips");
    let trips = loader.into_rows();
    let rows: Vec<Vec<String>> = trips
        .iter()
        .map(|t| {
            vec![
                t.reservation_id.clone(),
                t.car_id.clone(),
                t.guest_name.clone(),
                format!("{} to {}", t.start_date, t.end_date),
                t.days().to_string(),
                t.earnings.to_string(),
                t.status.clone(),
            ]
        })
        .collect();
    let message = format!(
        "{summary}\n{}",
        table(
            &["Reservation", "Car", "Guest", "Dates", "Days", "Earnings", "Status"],
            &rows
        )
    );
    Ok(Out::new(message, trips))
}

pub async fn notifications(
    config: Config,
    mode: Mode,
    args: PageArgs,
) -> Result<Out<Vec<Notification>>> {
    let mut portal = connect(&config, mode).await.pub_result(ErrorType::Config)?;
    let mut source = NotificationSource::new(portal.as_mut());
    let loader = load_pages(&config, &args, &mut source)
        .await
        .pub_result(ErrorType::Request)?;

    let summary = showing(&loader, "notifications");
    let notifications = loader.into_rows();
    let unread = notifications.iter().filter(|n| !n.read).count();
    let rows: Vec<Vec<String>> = notifications
        .iter()
        .map(|n| {
            vec![
                n.created_at.format("%Y-%m-%d %H:%M").to_string(),
                if n.read { "" } else { "*" }.to_string(),
                n.title.clone(),
                n.message.clone(),
            ]
        })
        .collect();
    let message = format!(
        "{summary}, {unread} unread\n{}",
        table(&["When", "New", "Title", "Message"], &rows)
    );
    Ok(Out::new(message, notifications))
}
