//! These structs provide the CLI interface for the fleetdesk CLI.

use crate::model::{Amount, LedgerCategory, Month, NegativeStyle, PaymentStatus};
use crate::nav::Role;
use chrono::Datelike;
use clap::{Parser, Subcommand};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing_subscriber::filter::LevelFilter;

/// fleetdesk: A command-line client for the fleet management portal.
///
/// The portal keeps track of cars, the clients who own them, payments, Turo trips and a monthly
/// income and expense ledger for every car. This program reads and edits that data through the
/// portal's REST API.
///
/// The portal's login is not handled here. Log in with a browser, copy the session cookie into a
/// file and pass it to `fleetdesk init --session-file`.
#[derive(Debug, Parser, Clone)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn new(common: Common, command: Command) -> Self {
        Self { common, command }
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the data directory and initialize the configuration files.
    ///
    /// This is the first command you should run. Pass the portal's address as --api-url and,
    /// optionally, a file holding the session cookie of a logged-in browser as --session-file.
    /// The cookie is copied into the secrets directory of --fleetdesk-home.
    Init(InitArgs),
    /// List the cars in the fleet.
    Cars,
    /// List the clients.
    Clients,
    /// List the portal's employee and admin accounts.
    Users,
    /// Show, edit, audit or export a car's income and expense ledger.
    Ledger(LedgerArgs),
    /// Search payments by status, month, year and free text.
    Payments(PaymentsArgs),
    /// List Turo trips.
    Trips(PageArgs),
    /// List notifications.
    Notifications(PageArgs),
    /// Show the navigation entries and quick links visible to a role.
    Nav(NavArgs),
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where fleetdesk configuration is held. Defaults to ~/fleetdesk
    #[arg(long, env = "FLEETDESK_HOME", default_value_t = default_fleetdesk_home())]
    fleetdesk_home: DisplayPath,

    /// Print the command's data as JSON to stdout.
    #[arg(long)]
    json: bool,
}

impl Common {
    pub fn new(log_level: LevelFilter, fleetdesk_home: PathBuf) -> Self {
        Self {
            log_level,
            fleetdesk_home: fleetdesk_home.into(),
            json: false,
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn fleetdesk_home(&self) -> &DisplayPath {
        &self.fleetdesk_home
    }

    pub fn json(&self) -> bool {
        self.json
    }
}

/// Args for the `fleetdesk init` command.
#[derive(Debug, Parser, Clone)]
pub struct InitArgs {
    /// The base URL of the portal, e.g. https://portal.example.com
    #[arg(long)]
    api_url: String,

    /// A file holding the value of the portal's `Cookie` header.
    #[arg(long)]
    session_file: Option<PathBuf>,
}

impl InitArgs {
    pub fn new(api_url: impl Into<String>, session_file: Option<PathBuf>) -> Self {
        Self {
            api_url: api_url.into(),
            session_file,
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn session_file(&self) -> Option<&Path> {
        self.session_file.as_deref()
    }
}

/// How many pages of a list to load.
#[derive(Debug, Parser, Clone, Default)]
pub struct PageArgs {
    /// Rows per page. Defaults to `page_size` from config.json.
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    page_size: Option<u32>,

    /// The number of pages to load, starting from the first.
    #[arg(long, default_value_t = 1)]
    pages: u32,

    /// Load every page.
    #[arg(long, conflicts_with = "pages")]
    all: bool,
}

impl PageArgs {
    pub fn new(page_size: Option<u32>, pages: u32, all: bool) -> Self {
        Self {
            page_size,
            pages,
            all,
        }
    }

    pub fn page_size(&self) -> Option<u32> {
        self.page_size
    }

    pub fn pages(&self) -> u32 {
        self.pages
    }

    pub fn all(&self) -> bool {
        self.all
    }
}

#[derive(Debug, Parser, Clone)]
pub struct LedgerArgs {
    #[command(subcommand)]
    command: LedgerCommand,
}

impl LedgerArgs {
    pub fn command(&self) -> &LedgerCommand {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum LedgerCommand {
    /// Print the ledger of a car for one year.
    Show(LedgerShowArgs),
    /// Save the value of one ledger cell.
    ///
    /// Expense categories only accept values of zero or more. Income and reimbursed bills accept
    /// negative adjustments.
    Set(LedgerSetArgs),
    /// List the changes made to a car's ledger, newest first.
    History(LedgerHistoryArgs),
    /// Write the ledger of a car for one year to a CSV file.
    Export(LedgerExportArgs),
}

#[derive(Debug, Parser, Clone)]
pub struct LedgerShowArgs {
    /// The car's ID.
    #[arg(long)]
    car: String,

    /// Defaults to the current year.
    #[arg(long, default_value_t = current_year())]
    year: i32,

    /// Write negative amounts in parentheses, e.g. ($60.00).
    #[arg(long)]
    parentheses: bool,
}

impl LedgerShowArgs {
    pub fn new(car: impl Into<String>, year: i32, parentheses: bool) -> Self {
        Self {
            car: car.into(),
            year,
            parentheses,
        }
    }

    pub fn car(&self) -> &str {
        &self.car
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn negative_style(&self) -> NegativeStyle {
        if self.parentheses {
            NegativeStyle::Parentheses
        } else {
            NegativeStyle::Sign
        }
    }
}

#[derive(Debug, Parser, Clone)]
pub struct LedgerSetArgs {
    /// The car's ID.
    #[arg(long)]
    car: String,

    /// Defaults to the current year.
    #[arg(long, default_value_t = current_year())]
    year: i32,

    /// One of: income, cogs, directDelivery, parkingFeeLabor, reimbursedBills, operatingExpense
    #[arg(long)]
    category: LedgerCategory,

    /// The field within the category, e.g. `tires`.
    #[arg(long)]
    field: String,

    /// A month number (1-12) or name.
    #[arg(long)]
    month: Month,

    /// The new value, e.g. 1250, $1,250.00 or (40.00).
    #[arg(long, allow_hyphen_values = true)]
    value: Amount,

    /// A note saved with the value.
    #[arg(long)]
    remark: Option<String>,
}

impl LedgerSetArgs {
    pub fn new(
        car: impl Into<String>,
        year: i32,
        category: LedgerCategory,
        field: impl Into<String>,
        month: Month,
        value: Amount,
        remark: Option<String>,
    ) -> Self {
        Self {
            car: car.into(),
            year,
            category,
            field: field.into(),
            month,
            value,
            remark,
        }
    }

    pub fn car(&self) -> &str {
        &self.car
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn category(&self) -> LedgerCategory {
        self.category
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn month(&self) -> Month {
        self.month
    }

    pub fn value(&self) -> Amount {
        self.value
    }

    pub fn remark(&self) -> Option<&str> {
        self.remark.as_deref()
    }
}

#[derive(Debug, Parser, Clone)]
pub struct LedgerHistoryArgs {
    /// The car's ID.
    #[arg(long)]
    car: String,

    /// Defaults to the current year.
    #[arg(long, default_value_t = current_year())]
    year: i32,

    /// Only show changes in this category.
    #[arg(long)]
    category: Option<LedgerCategory>,

    /// Only show changes in this month.
    #[arg(long)]
    month: Option<Month>,

    #[clap(flatten)]
    paging: PageArgs,
}

impl LedgerHistoryArgs {
    pub fn new(
        car: impl Into<String>,
        year: i32,
        category: Option<LedgerCategory>,
        month: Option<Month>,
        paging: PageArgs,
    ) -> Self {
        Self {
            car: car.into(),
            year,
            category,
            month,
            paging,
        }
    }

    pub fn car(&self) -> &str {
        &self.car
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn category(&self) -> Option<LedgerCategory> {
        self.category
    }

    pub fn month(&self) -> Option<Month> {
        self.month
    }

    pub fn paging(&self) -> &PageArgs {
        &self.paging
    }
}

#[derive(Debug, Parser, Clone)]
pub struct LedgerExportArgs {
    /// The car's ID.
    #[arg(long)]
    car: String,

    /// Defaults to the current year.
    #[arg(long, default_value_t = current_year())]
    year: i32,

    /// The CSV file to write.
    #[arg(long, short)]
    output: PathBuf,
}

impl LedgerExportArgs {
    pub fn new(car: impl Into<String>, year: i32, output: impl Into<PathBuf>) -> Self {
        Self {
            car: car.into(),
            year,
            output: output.into(),
        }
    }

    pub fn car(&self) -> &str {
        &self.car
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn output(&self) -> &Path {
        &self.output
    }
}

#[derive(Debug, Parser, Clone)]
pub struct PaymentsArgs {
    /// One of: paid, pending, overdue, refunded
    #[arg(long)]
    status: Option<PaymentStatus>,

    /// A month number (1-12) or name.
    #[arg(long)]
    month: Option<Month>,

    #[arg(long)]
    year: Option<i32>,

    /// Free text matched by the portal.
    #[arg(long)]
    search: Option<String>,

    #[clap(flatten)]
    paging: PageArgs,
}

impl PaymentsArgs {
    pub fn new(
        status: Option<PaymentStatus>,
        month: Option<Month>,
        year: Option<i32>,
        search: Option<&str>,
        paging: PageArgs,
    ) -> Self {
        Self {
            status,
            month,
            year,
            search: search.map(String::from),
            paging,
        }
    }

    pub fn status(&self) -> Option<PaymentStatus> {
        self.status
    }

    pub fn month(&self) -> Option<Month> {
        self.month
    }

    pub fn year(&self) -> Option<i32> {
        self.year
    }

    pub fn search(&self) -> Option<&str> {
        self.search.as_deref().filter(|s| !s.trim().is_empty())
    }

    pub fn paging(&self) -> &PageArgs {
        &self.paging
    }
}

#[derive(Debug, Parser, Clone)]
pub struct NavArgs {
    /// The role to show navigation for, e.g. admin, staff or owner.
    #[arg(long)]
    role: Role,
}

impl NavArgs {
    pub fn role(&self) -> &Role {
        &self.role
    }
}

fn current_year() -> i32 {
    chrono::Local::now().year()
}

fn default_fleetdesk_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join("fleetdesk"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --fleetdesk-home or FLEETDESK_HOME instead of relying on the \
                default fleetdesk home directory.",
            );
            PathBuf::from("fleetdesk")
        }
    })
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn path(&self) -> &Path {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        let mut all = vec!["fleetdesk", "--fleetdesk-home", "/tmp/fd"];
        all.extend_from_slice(args);
        Args::try_parse_from(all).unwrap()
    }

    #[test]
    fn test_ledger_set_negative_value() {
        let args = parse(&[
            "ledger", "set", "--car", "car-1", "--year", "2025", "--category", "income",
            "--field", "rentalIncome", "--month", "mar", "--value", "-40",
        ]);
        let Command::Ledger(ledger) = args.command() else {
            panic!("expected the ledger command");
        };
        let LedgerCommand::Set(set) = ledger.command() else {
            panic!("expected ledger set");
        };
        assert_eq!(set.value(), Amount::from(-40));
        assert_eq!(set.month().number(), 3);
        assert_eq!(set.category(), LedgerCategory::Income);
        assert_eq!(args.common().fleetdesk_home().path(), Path::new("/tmp/fd"));
    }

    #[test]
    fn test_payments_filters() {
        let args = parse(&["payments", "--status", "overdue", "--month", "4", "--all"]);
        let Command::Payments(p) = args.command() else {
            panic!("expected payments");
        };
        assert_eq!(p.status(), Some(PaymentStatus::Overdue));
        assert_eq!(p.month().map(|m| m.number()), Some(4));
        assert!(p.paging().all());
    }

    #[test]
    fn test_bad_values_are_rejected() {
        let base = ["fleetdesk", "ledger", "set", "--car", "c", "--field", "f", "--value", "1"];
        let mut bad_month = base.to_vec();
        bad_month.extend(["--category", "cogs", "--month", "13"]);
        assert!(Args::try_parse_from(bad_month).is_err());

        let mut bad_category = base.to_vec();
        bad_category.extend(["--category", "fuel", "--month", "1"]);
        assert!(Args::try_parse_from(bad_category).is_err());

        assert!(Args::try_parse_from(["fleetdesk", "trips", "--page-size", "0"]).is_err());
    }

    #[test]
    fn test_defaults() {
        let args = parse(&["trips"]);
        assert_eq!(args.common().log_level(), LevelFilter::INFO);
        assert!(!args.common().json());
        let Command::Trips(paging) = args.command() else {
            panic!("expected trips");
        };
        assert_eq!(paging.pages(), 1);
        assert_eq!(paging.page_size(), None);
    }
}
