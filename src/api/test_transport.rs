//! Implements the `Transport` trait with an in-memory portal.
//!
//! Note: this is compiled even in the "production" version of this app so that we can run the whole
//! app, top-to-bottom, without a portal (see `Mode::Testing`).

use crate::api::envelope::status_error;
use crate::api::{Envelope, Method, Request, Transport};
use crate::model::{
    Amount, Car, CellChange, CellKey, Client, HistoryEntry, HistoryFilter, LedgerCategory,
    LedgerCell, Month, Notification, Payment, PaymentFilter, PaymentStatus, TuroTrip, User,
    YearLedger,
};
use crate::nav::QuickLink;
use crate::Result;
use chrono::{Duration, NaiveDate, TimeZone, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use tracing::trace;
use uuid::Uuid;

const DEFAULT_LIMIT: u32 = 25;

/// The fields each category of a fresh ledger starts with.
const LEDGER_TEMPLATE: &[(LedgerCategory, &[&str])] = &[
    (LedgerCategory::Income, &["rentalIncome", "deliveryIncome"]),
    (LedgerCategory::Cogs, &["autoBodyShop", "tires", "oilChange"]),
    (LedgerCategory::DirectDelivery, &["fuel", "cleaning"]),
    (LedgerCategory::ParkingFeeLabor, &["parkingFee", "labor"]),
    (LedgerCategory::ReimbursedBills, &["tolls", "tickets"]),
    (LedgerCategory::OperatingExpense, &["insurance", "registration"]),
];

/// Everything the in-memory portal knows, plus a log of the requests it has received.
#[derive(Debug, Clone)]
pub struct TestState {
    pub cars: Vec<Car>,
    pub clients: Vec<Client>,
    pub users: Vec<User>,
    pub ledgers: BTreeMap<(String, i32), YearLedger>,
    pub history: Vec<HistoryEntry>,
    pub payments: Vec<Payment>,
    pub trips: Vec<TuroTrip>,
    pub notifications: Vec<Notification>,
    pub quick_links: Vec<QuickLink>,
    /// The user recorded as the author of ledger history rows.
    pub acting_user: String,
    /// Every request received, in order.
    pub requests: Vec<Request>,
    failures: VecDeque<(u16, String)>,
}

impl TestState {
    /// Makes the next request fail with `status` and a body carrying `message`.
    pub fn fail_next(&mut self, status: u16, message: impl Into<String>) {
        self.failures.push_back((status, message.into()));
    }

    /// The requests received for `method` and `path`.
    pub fn requests_to(&self, method: Method, path: &str) -> Vec<&Request> {
        self.requests
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .collect()
    }
}

impl Default for TestState {
    /// Seeds the portal with a small fleet.
    fn default() -> Self {
        seed()
    }
}

/// An implementation of the `Transport` trait that answers requests from a `TestState` held in
/// memory. Transports created with the same key share their state, so a test can create one,
/// hand a copy to the code under test and inspect the state afterwards.
#[derive(Debug, Clone)]
pub struct TestTransport {
    state: Arc<Mutex<TestState>>,
}

fn registry() -> &'static Mutex<HashMap<String, Arc<Mutex<TestState>>>> {
    static REGISTRY: OnceLock<Mutex<HashMap<String, Arc<Mutex<TestState>>>>> = OnceLock::new();
    REGISTRY.get_or_init(|| Mutex::new(HashMap::new()))
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl TestTransport {
    /// Returns a transport for the portal registered under `key`, seeding it on first use.
    pub fn new(key: &str) -> Self {
        let state = lock(registry())
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(TestState::default())))
            .clone();
        Self { state }
    }

    /// Returns a transport with its own, unregistered state.
    pub fn isolated(state: TestState) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Runs `f` with exclusive access to the state.
    pub fn with_state<R>(&self, f: impl FnOnce(&mut TestState) -> R) -> R {
        f(&mut lock(&self.state))
    }

    /// A copy of the current state.
    pub fn snapshot(&self) -> TestState {
        lock(&self.state).clone()
    }

    fn respond(&self, request: Request) -> Result<Value> {
        let mut state = lock(&self.state);
        trace!("test transport: {} {}", request.method, request.path);
        state.requests.push(request.clone());
        if let Some((status, message)) = state.failures.pop_front() {
            let body = json!({"success": false, "message": message});
            return Err(status_error(request.method, &request.path, status, &body));
        }
        route(&mut state, &request)
            .map_err(|(status, body)| status_error(request.method, &request.path, status, &body))
    }
}

#[async_trait::async_trait]
impl Transport for TestTransport {
    async fn send(&mut self, request: Request) -> Result<Value> {
        self.respond(request)
    }
}

type Response = std::result::Result<Value, (u16, Value)>;

fn fail(status: u16, message: impl AsRef<str>) -> (u16, Value) {
    (status, json!({"success": false, "message": message.as_ref()}))
}

fn ok<T: Serialize>(data: T) -> Response {
    serde_json::to_value(Envelope::ok(data)).map_err(|e| fail(500, e.to_string()))
}

fn paged<T: Serialize + Clone>(rows: &[T], page: u32, limit: u32) -> Response {
    if page == 0 || limit == 0 {
        return Err(fail(400, "page and limit must be positive"));
    }
    let start = (page as usize - 1).saturating_mul(limit as usize);
    let slice: Vec<T> = rows
        .iter()
        .skip(start)
        .take(limit as usize)
        .cloned()
        .collect();
    serde_json::to_value(Envelope::paged(slice, rows.len() as u64, page, limit))
        .map_err(|e| fail(500, e.to_string()))
}

fn query_number(request: &Request, key: &str, default: u32) -> std::result::Result<u32, (u16, Value)> {
    match request.query_value(key) {
        None => Ok(default),
        Some(v) => v
            .parse()
            .map_err(|_| fail(400, format!("'{key}' must be a number, got '{v}'"))),
    }
}

fn route(state: &mut TestState, request: &Request) -> Response {
    let segments: Vec<&str> = request
        .path
        .trim_matches('/')
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();

    match (request.method, segments.as_slice()) {
        (Method::Get, ["api", "cars"]) => ok(&state.cars),
        (Method::Get, ["api", "clients"]) => ok(&state.clients),
        (Method::Get, ["api", "admin", "users"]) => ok(&state.users),
        (Method::Get, ["api", "quick-links"]) => ok(&state.quick_links),
        (Method::Get, ["api", "income-expense", car_id, year]) => {
            let year = parse_year(year)?;
            let ledger = ledger_mut(state, car_id, year)?;
            ok(&*ledger)
        }
        (Method::Put, ["api", "income-expense", car_id, year]) => {
            let year = parse_year(year)?;
            update_cell(state, car_id, year, request.body.as_ref())
        }
        (Method::Get, ["api", "income-expense", car_id, year, "history"]) => {
            let year = parse_year(year)?;
            let filter = HistoryFilter {
                category: request
                    .query_value("category")
                    .map(|c| c.parse::<LedgerCategory>())
                    .transpose()
                    .map_err(|e| fail(400, e.to_string()))?,
                month: request
                    .query_value("month")
                    .map(|m| m.parse::<Month>())
                    .transpose()
                    .map_err(|e| fail(400, e.to_string()))?,
            };
            // Newest first.
            let rows: Vec<HistoryEntry> = state
                .history
                .iter()
                .rev()
                .filter(|h| h.car_id == *car_id && h.year == year && filter.matches(h))
                .cloned()
                .collect();
            paged(
                &rows,
                query_number(request, "page", 1)?,
                query_number(request, "limit", DEFAULT_LIMIT)?,
            )
        }
        (Method::Post, ["api", "payments", "search"]) => search_payments(state, request),
        (Method::Get, ["api", "turo-trips"]) => paged(
            &state.trips,
            query_number(request, "page", 1)?,
            query_number(request, "limit", DEFAULT_LIMIT)?,
        ),
        (Method::Get, ["api", "notifications"]) => paged(
            &state.notifications,
            query_number(request, "page", 1)?,
            query_number(request, "limit", DEFAULT_LIMIT)?,
        ),
        _ => Err(fail(404, format!("No route for {}", request.path))),
    }
}

fn parse_year(s: &str) -> std::result::Result<i32, (u16, Value)> {
    s.parse()
        .map_err(|_| fail(400, format!("'{s}' is not a year")))
}

/// Returns the ledger of a car, creating a zero-valued one the first time a year is asked for.
fn ledger_mut<'a>(
    state: &'a mut TestState,
    car_id: &str,
    year: i32,
) -> std::result::Result<&'a mut YearLedger, (u16, Value)> {
    if !state.cars.iter().any(|c| c.id == car_id) {
        return Err(fail(404, format!("Car {car_id} not found")));
    }
    Ok(state
        .ledgers
        .entry((car_id.to_string(), year))
        .or_insert_with(|| zero_ledger(car_id, year)))
}

fn zero_ledger(car_id: &str, year: i32) -> YearLedger {
    let cells = LEDGER_TEMPLATE.iter().flat_map(|(category, fields)| {
        fields.iter().flat_map(move |field| {
            Month::all().map(move |month| LedgerCell::zero(CellKey::new(*category, *field, month)))
        })
    });
    YearLedger::new(car_id, year, cells)
}

fn update_cell(state: &mut TestState, car_id: &str, year: i32, body: Option<&Value>) -> Response {
    let body = body.ok_or_else(|| fail(400, "A cell change is required"))?;
    let change: CellChange = serde_json::from_value(body.clone())
        .map_err(|e| fail(400, format!("Invalid cell change: {e}")))?;
    let acting_user = state.acting_user.clone();

    let ledger = ledger_mut(state, car_id, year)?;
    let key = change.key();
    let mut cell = ledger
        .cell(&key)
        .cloned()
        .unwrap_or_else(|| LedgerCell::zero(key.clone()));
    let old_value = cell.value;
    cell.value = change.value;
    cell.remark = change.remark.clone();
    ledger.upsert(cell.clone());

    state.history.push(HistoryEntry {
        id: Uuid::new_v4().to_string(),
        car_id: car_id.to_string(),
        year,
        category: key.category,
        field: key.field,
        month: key.month,
        old_value,
        new_value: change.value,
        remark: change.remark,
        changed_by: acting_user,
        changed_at: Utc::now(),
    });
    ok(cell)
}

fn search_payments(state: &TestState, request: &Request) -> Response {
    let body = request.body.clone().unwrap_or_else(|| json!({}));
    let filter: PaymentFilter = serde_json::from_value(body.clone())
        .map_err(|e| fail(400, format!("Invalid payment filter: {e}")))?;
    let number = |key: &str, default: u32| match body.get(key) {
        None => Ok(default),
        Some(v) => v
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| fail(400, format!("'{key}' must be a positive number"))),
    };
    let page = number("page", 1)?;
    let limit = number("limit", DEFAULT_LIMIT)?;

    let needle = filter.search.as_deref().map(str::to_ascii_lowercase);
    let rows: Vec<Payment> = state
        .payments
        .iter()
        .filter(|p| filter.matches(p))
        .filter(|p| match &needle {
            None => true,
            Some(n) => [p.id.as_str(), p.car_id.as_str(), p.note.as_str()]
                .iter()
                .any(|s| s.to_ascii_lowercase().contains(n)),
        })
        .cloned()
        .collect();
    paged(&rows, page, limit)
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
}

fn seed() -> TestState {
    let cars = vec![
        car("car-1", "Toyota", "Corolla", 2022, "7XYZ221", None),
        car("car-2", "Tesla", "Model 3", 2021, "8ABC123", Some("client-1")),
        car("car-3", "Honda", "Civic", 2020, "6DEF450", Some("client-2")),
    ];

    let clients = vec![
        Client {
            id: "client-1".into(),
            first_name: "Maria".into(),
            last_name: "Lopez".into(),
            email: "maria@example.com".into(),
            phone: "555-0101".into(),
        },
        Client {
            id: "client-2".into(),
            first_name: "Devon".into(),
            last_name: "Price".into(),
            email: "devon@example.com".into(),
            phone: "555-0102".into(),
        },
    ];

    let users = vec![
        user("user-1", "Alex Admin", "alex@fleet.example", "admin"),
        user("user-2", "Sam Staff", "sam@fleet.example", "staff"),
        user("user-3", "Ola Owner", "ola@fleet.example", "owner"),
    ];

    let statuses = [
        PaymentStatus::Paid,
        PaymentStatus::Pending,
        PaymentStatus::Overdue,
        PaymentStatus::Paid,
    ];
    let mut payments = Vec::new();
    for (ix, month) in Month::all().take(6).enumerate() {
        for (car_ix, car) in cars.iter().enumerate() {
            let status = statuses[(ix + car_ix) % statuses.len()];
            payments.push(Payment {
                id: format!("pay-{}-{}", car.id, month.number()),
                car_id: car.id.clone(),
                client_id: car.owner_id.clone(),
                amount: Amount::from(400 + 25 * car_ix as i64),
                status,
                month,
                year: 2025,
                paid_on: (status == PaymentStatus::Paid)
                    .then(|| date(2025, u32::from(month.number()), 5)),
                note: format!("{} rent", month.abbrev()),
            });
        }
    }

    let first_day = date(2025, 1, 2);
    let trips = (0..32)
        .map(|i: i64| {
            let start = first_day + Duration::days(i * 3);
            TuroTrip {
                id: format!("trip-{:03}", i + 1),
                reservation_id: format!("R-{}", 10_000 + i),
                car_id: cars[(i as usize) % cars.len()].id.clone(),
                guest_name: format!("Guest {}", i + 1),
                start_date: start,
                end_date: start + Duration::days(2),
                earnings: Amount::from(150 + 10 * (i % 5)),
                status: "completed".into(),
            }
        })
        .collect();

    let notifications = (0..5)
        .map(|i: i64| Notification {
            id: format!("note-{}", i + 1),
            title: format!("Inspection form {} submitted", i + 1),
            message: "A staff member submitted an inspection form".into(),
            read: i > 1,
            created_at: Utc
                .with_ymd_and_hms(2025, 6, 1, 9, 0, 0)
                .single()
                .unwrap_or_default()
                + Duration::hours(i),
        })
        .collect();

    let quick_links = vec![
        QuickLink {
            title: "Turo host dashboard".into(),
            url: "https://turo.com/host".into(),
            roles: vec![],
        },
        QuickLink {
            title: "Insurance portal".into(),
            url: "https://insurer.example.com".into(),
            roles: vec!["admin".into(), "owner".into()],
        },
        QuickLink {
            title: "Staff handbook".into(),
            url: "https://docs.example.com/handbook".into(),
            roles: vec!["staff".into()],
        },
    ];

    TestState {
        cars,
        clients,
        users,
        ledgers: BTreeMap::new(),
        history: Vec::new(),
        payments,
        trips,
        notifications,
        quick_links,
        acting_user: "alex@fleet.example".into(),
        requests: Vec::new(),
        failures: VecDeque::new(),
    }
}

fn car(id: &str, make: &str, model: &str, year: i32, plate: &str, owner: Option<&str>) -> Car {
    Car {
        id: id.into(),
        make: make.into(),
        model: model.into(),
        year,
        license_plate: plate.into(),
        vin: None,
        status: "active".into(),
        owner_id: owner.map(String::from),
    }
}

fn user(id: &str, name: &str, email: &str, role: &str) -> User {
    User {
        id: id.into(),
        name: name.into(),
        email: email.into(),
        role: role.into(),
        is_active: true,
    }
}
