use clap::Parser;
use fleetdesk::args::{Args, Command, LedgerCommand};
use fleetdesk::{commands, Config, Mode, Result};
use std::process::ExitCode;
use tracing::{debug, error, trace};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let log_level = args.common().log_level();
    init_logger(log_level);
    debug!("Log level set to {}", log_level.to_string().to_lowercase());

    match main_inner(args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Exiting with error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

pub async fn main_inner(args: Args) -> Result<()> {
    trace!("{args:?}");
    let home = args.common().fleetdesk_home().path();
    let json = args.common().json();

    // When FLEETDESK_IN_TEST_MODE is set and non-empty, requests are answered by a seeded
    // in-memory portal instead of the configured API.
    let mode = Mode::from_env();

    let _: () = match args.command() {
        Command::Init(init_args) => {
            commands::init(home, init_args.api_url(), init_args.session_file())
                .await?
                .print(json)
        }

        Command::Cars => commands::cars(Config::load(home).await?, mode)
            .await?
            .print(json),

        Command::Clients => commands::clients(Config::load(home).await?, mode)
            .await?
            .print(json),

        Command::Users => commands::users(Config::load(home).await?, mode)
            .await?
            .print(json),

        Command::Ledger(ledger_args) => {
            let config = Config::load(home).await?;
            match ledger_args.command() {
                LedgerCommand::Show(args) => commands::ledger_show(config, mode, args.clone())
                    .await?
                    .print(json),
                LedgerCommand::Set(args) => commands::ledger_set(config, mode, args.clone())
                    .await?
                    .print(json),
                LedgerCommand::History(args) => {
                    commands::ledger_history(config, mode, args.clone())
                        .await?
                        .print(json)
                }
                LedgerCommand::Export(args) => {
                    commands::ledger_export(config, mode, args.clone())
                        .await?
                        .print(json)
                }
            }
        }

        Command::Payments(payments_args) => {
            let config = Config::load(home).await?;
            commands::payments(config, mode, payments_args.clone())
                .await?
                .print(json)
        }

        Command::Trips(page_args) => {
            let config = Config::load(home).await?;
            commands::trips(config, mode, page_args.clone())
                .await?
                .print(json)
        }

        Command::Notifications(page_args) => {
            let config = Config::load(home).await?;
            commands::notifications(config, mode, page_args.clone())
                .await?
                .print(json)
        }

        Command::Nav(nav_args) => {
            let config = Config::load(home).await?;
            commands::nav(config, mode, nav_args.role().clone())
                .await?
                .print(json)
        }
    };
    Ok(())
}

/// Initializes the tracing subscriber.
pub fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => {
            // RUST_LOG exists; use it.
            EnvFilter::from_default_env()
        }
        None => {
            // RUST_LOG does not exist; use default log level for this crate only.
            EnvFilter::new(format!(
                "{}={},{}={}",
                env!("CARGO_CRATE_NAME"),
                level,
                env!("CARGO_BIN_NAME"),
                level
            ))
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
