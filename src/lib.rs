//! A client for the fleet management portal: cars, clients, the per-car income and expense
//! ledger, payments, Turo trips and notifications.
//!
//! The `api` module talks to the portal. `editor` holds the edit state of the ledger, `pager`
//! loads the paginated lists and `nav` decides what each role may see. The `commands` module puts
//! these together for the `fleetdesk` binary.

pub mod api;
pub mod args;
pub mod cache;
pub mod commands;
mod config;
pub mod editor;
mod error;
pub mod model;
pub mod nav;
pub mod pager;
mod utils;

#[cfg(test)]
mod test;

pub use api::Mode;
pub use config::Config;
pub use error::Error;
pub use error::Result;
