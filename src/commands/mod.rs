//! Command handlers for the fleetdesk CLI.
//!
//! Each portal page has a command here. Commands connect to the portal in the given `Mode`, do
//! their work and return an `Out` holding a printable message and the structured data behind it.

mod fleet;
mod init;
mod ledger;
mod lists;
mod nav;

use crate::args::PageArgs;
use crate::pager::{PageLoader, PageSource};
use crate::{Config, Result};
use serde::Serialize;
use std::fmt::Debug;
use tracing::{debug, info, warn};

pub use fleet::{cars, clients, users};
pub use init::init;
pub use ledger::{ledger_export, ledger_history, ledger_set, ledger_show};
pub use lists::{notifications, payments, trips};
pub use nav::nav;

/// The output type for a command. This allows the command to return a consistent message and,
/// optionally, structured data.
#[derive(Debug, Clone, Serialize)]
pub struct Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// A message that can be printed to the user regarding the outcome of the command execution.
    message: String,

    /// Any structured data that needs to be output from the call.
    structure: Option<T>,
}

impl<T, S> From<S> for Out<T>
where
    T: Debug + Clone + Serialize,
    S: Into<String>,
{
    fn from(value: S) -> Self {
        Out::new_message(value)
    }
}

impl<T> Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// Create a new `Out` object that has `Some(structure)`.
    pub fn new<S>(message: S, structure: T) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: Some(structure),
        }
    }

    /// Create a new `Out` object that has `None` for `structure`.
    pub fn new_message<S>(message: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: None,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn structure(&self) -> Option<&T> {
        self.structure.as_ref()
    }

    /// Print the message to `info!` and the structured data (if it exists) as JSON to `debug!`.
    /// With `json` set, the structured data is written to stdout instead.
    pub fn print(&self, json: bool) {
        info!("{}", self.message);
        if let Some(s) = self.render() {
            if json {
                println!("{s}");
            } else {
                debug!("Command output:\n\n{s}\n\n");
            }
        }
    }

    /// The structured data as pretty JSON. A structure that cannot be serialized is logged and
    /// skipped.
    fn render(&self) -> Option<String> {
        let structure = self.structure()?;
        match serde_json::to_string_pretty(structure) {
            Ok(s) => Some(s),
            Err(e) => {
                warn!("Unable to write the command output as JSON: {e}");
                None
            }
        }
    }
}

/// Renders rows as a Markdown table.
pub(crate) fn table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (ix, cell) in row.iter().enumerate().take(widths.len()) {
            widths[ix] = widths[ix].max(cell.chars().count());
        }
    }

    let line = |cells: Vec<&str>| {
        let padded: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{c:<width$}", width = *w))
            .collect();
        format!("| {} |", padded.join(" | "))
    };

    let mut out = Vec::with_capacity(rows.len() + 2);
    out.push(line(headers.to_vec()));
    out.push(format!(
        "|{}|",
        widths
            .iter()
            .map(|w| "-".repeat(w + 2))
            .collect::<Vec<_>>()
            .join("|")
    ));
    for row in rows {
        let mut cells: Vec<&str> = row.iter().map(String::as_str).collect();
        cells.resize(headers.len(), "");
        out.push(line(cells));
    }
    out.join("\n")
}

/// Loads the pages `args` asks for from `source`.
async fn load_pages<T, S>(config: &Config, args: &PageArgs, source: &mut S) -> Result<PageLoader<T>>
where
    S: PageSource<T> + ?Sized,
{
    let mut loader = PageLoader::new(args.page_size().unwrap_or(config.page_size()));
    if args.all() {
        loader.load_all(source).await?;
    } else {
        for _ in 0..args.pages() {
            if !loader.has_next_page() {
                break;
            }
            loader.load_next(source).await?;
        }
    }
    Ok(loader)
}

/// A summary such as `Showing 25 of 31 payments`.
fn showing<T>(loader: &PageLoader<T>, what: &str) -> String {
    let shown = loader.rows().len();
    match loader.total() {
        Some(total) if total > shown as u64 => format!("Showing {shown} of {total} {what}"),
        _ => format!("Showing {shown} {what}"),
    }
}
