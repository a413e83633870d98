//! The income and expense ledger of a car: show, edit, audit log and CSV export.

use crate::api::{connect, HistorySource, Mode};
use crate::args::{LedgerExportArgs, LedgerHistoryArgs, LedgerSetArgs, LedgerShowArgs};
use crate::commands::fleet::plural;
use crate::commands::{load_pages, showing, table, Out};
use crate::editor::LedgerEditor;
use crate::error::{ErrorType, IntoResult};
use crate::model::{
    Amount, CellKey, HistoryEntry, HistoryFilter, LedgerCategory, LedgerCell, Month,
    NegativeStyle, YearLedger,
};
use crate::{utils, Config, Result};
use anyhow::anyhow;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Prints a car's ledger for one year with per-field and per-category totals.
pub async fn ledger_show(
    config: Config,
    mode: Mode,
    args: LedgerShowArgs,
) -> Result<Out<YearLedger>> {
    let mut portal = connect(&config, mode).await.pub_result(ErrorType::Config)?;
    let ledger = portal
        .ledger(args.car(), args.year())
        .await
        .pub_result(ErrorType::Request)?;
    let message = render(&ledger, args.negative_style());
    Ok(Out::new(message, ledger))
}

fn render(ledger: &YearLedger, style: NegativeStyle) -> String {
    let mut headers = vec!["Field"];
    headers.extend(Month::all().map(|m| m.abbrev()));
    headers.push("Total");

    let mut sections = vec![format!(
        "Ledger of car {} for {}",
        ledger.car_id(),
        ledger.year()
    )];
    for category in LedgerCategory::ALL {
        let mut rows: Vec<Vec<String>> = ledger
            .fields(category)
            .into_iter()
            .map(|field| {
                let mut row = vec![field.to_string()];
                row.extend(ledger.row(category, field).iter().map(|a| a.format(style)));
                row.push(ledger.field_total(category, field).format(style));
                row
            })
            .collect();
        let mut total = vec!["Total".to_string()];
        total.extend(
            Month::all().map(|m| ledger.month_total(category, m).format(style)),
        );
        total.push(ledger.category_total(category).format(style));
        rows.push(total);
        sections.push(format!("{}\n{}", category.title(), table(&headers, &rows)));
    }

    let mut net = vec!["Net".to_string()];
    net.extend(Month::all().map(|m| ledger.net(m).format(style)));
    net.push(ledger.yearly_net().format(style));
    sections.push(format!("Net income\n{}", table(&headers, &[net])));
    sections.join("\n\n")
}

/// Saves one ledger cell.
///
/// The value is checked against the category's sign policy before anything is sent. The change
/// is sent once; a failure is reported and nothing is retried.
pub async fn ledger_set(config: Config, mode: Mode, args: LedgerSetArgs) -> Result<Out<LedgerCell>> {
    let mut portal = connect(&config, mode).await.pub_result(ErrorType::Config)?;
    let mut editor = LedgerEditor::new();
    editor.select(args.car(), args.year());

    let key = CellKey::new(args.category(), args.field(), args.month());
    let ledger = editor
        .ledger(portal.as_mut())
        .await
        .pub_result(ErrorType::Request)?;
    if ledger.cell(&key).is_none() {
        warn!("{key} does not exist yet in this ledger, it will be created");
    }
    let before = ledger.value(&key);

    editor.set_editing_cell(Some(key.clone()));
    editor
        .update_cell(args.value(), args.remark().map(String::from))
        .pub_result(ErrorType::Validation)?;
    let cell = editor
        .save_changes(portal.as_mut())
        .await
        .pub_result(ErrorType::Request)?;

    Ok(Out::new(
        format!(
            "Saved {key} of car {} for {}: {before} -> {}",
            args.car(),
            args.year(),
            cell.value
        ),
        cell,
    ))
}

/// Lists the audit log of a car's ledger, newest first.
pub async fn ledger_history(
    config: Config,
    mode: Mode,
    args: LedgerHistoryArgs,
) -> Result<Out<Vec<HistoryEntry>>> {
    let mut portal = connect(&config, mode).await.pub_result(ErrorType::Config)?;
    let filter = HistoryFilter {
        category: args.category(),
        month: args.month(),
    };
    let mut source = HistorySource::new(portal.as_mut(), args.car(), args.year(), filter);
    let loader = load_pages(&config, args.paging(), &mut source)
        .await
        .pub_result(ErrorType::Request)?;

    let summary = showing(&loader, "changes");
    let entries = loader.into_rows();
    let rows: Vec<Vec<String>> = entries
        .iter()
        .map(|h| {
            vec![
                h.changed_at.format("%Y-%m-%d %H:%M").to_string(),
                format!("{}/{}/{}", h.category, h.field, h.month),
                h.old_value.to_string(),
                h.new_value.to_string(),
                h.delta().to_string(),
                h.changed_by.clone(),
                h.remark.clone().unwrap_or_default(),
            ]
        })
        .collect();
    let message = format!(
        "{summary}\n{}",
        table(
            &["When", "Cell", "Old", "New", "Change", "By", "Remark"],
            &rows
        )
    );
    Ok(Out::new(message, entries))
}

/// Writes a car's ledger for one year to a CSV file, one row per field.
pub async fn ledger_export(
    config: Config,
    mode: Mode,
    args: LedgerExportArgs,
) -> Result<Out<PathBuf>> {
    let mut portal = connect(&config, mode).await.pub_result(ErrorType::Config)?;
    let ledger = portal
        .ledger(args.car(), args.year())
        .await
        .pub_result(ErrorType::Request)?;

    let (csv, count) = to_csv(&ledger).pub_result(ErrorType::Output)?;
    let path = args.output().to_path_buf();
    debug!("Writing {} bytes to {}", csv.len(), path.display());
    utils::write(&path, csv)
        .await
        .pub_result(ErrorType::Output)?;

    Ok(Out::new(
        format!("Exported {count} row{} to {}", plural(count), path.display()),
        path,
    ))
}

/// The amount as a bare number, e.g. `-1234.5`.
fn plain(amount: Amount) -> String {
    let rounded = amount.round();
    if rounded.is_zero() {
        return "0".to_string();
    }
    rounded.value().normalize().to_string()
}

/// Returns the CSV text and the number of field rows in it. The trailing `net` row is not counted.
fn to_csv(ledger: &YearLedger) -> Result<(Vec<u8>, usize)> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    let mut header = vec!["category", "field"];
    header.extend(Month::all().map(|m| m.abbrev()));
    header.push("total");
    writer.write_record(&header)?;

    let mut count = 0;
    for category in LedgerCategory::ALL {
        for field in ledger.fields(category) {
            let mut record = vec![category.to_string(), field.to_string()];
            record.extend(ledger.row(category, field).into_iter().map(plain));
            record.push(plain(ledger.field_total(category, field)));
            writer.write_record(&record)?;
            count += 1;
        }
    }

    let mut net = vec!["net".to_string(), String::new()];
    net.extend(Month::all().map(|m| plain(ledger.net(m))));
    net.push(plain(ledger.yearly_net()));
    writer.write_record(&net)?;

    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow!("Unable to finish writing the CSV data: {}", e.error()))?;
    Ok((bytes, count))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ledger_path, Method};
    use crate::args::PageArgs;
    use crate::test::TestEnv;

    fn set_args(category: LedgerCategory, field: &str, month: u8, value: &str) -> LedgerSetArgs {
        LedgerSetArgs::new(
            "car-1",
            2025,
            category,
            field,
            Month::new(month).unwrap(),
            value.parse().unwrap(),
            None,
        )
    }

    #[tokio::test]
    async fn test_set_then_show() {
        let env = TestEnv::new().await;
        let out = ledger_set(
            env.config(),
            Mode::Testing,
            set_args(LedgerCategory::Income, "rentalIncome", 3, "1250"),
        )
        .await
        .unwrap();
        assert_eq!(
            out.message(),
            "Saved income/rentalIncome/Mar of car car-1 for 2025: $0.00 -> $1,250.00"
        );
        ledger_set(
            env.config(),
            Mode::Testing,
            set_args(LedgerCategory::Cogs, "tires", 3, "2000"),
        )
        .await
        .unwrap();

        let out = ledger_show(
            env.config(),
            Mode::Testing,
            LedgerShowArgs::new("car-1", 2025, true),
        )
        .await
        .unwrap();
        assert_eq!(out.structure().unwrap().yearly_net(), Amount::from(-750));
        assert!(out.message().contains("($750.00)"), "{}", out.message());
        assert!(out.message().contains("$1,250.00"));
    }

    #[tokio::test]
    async fn test_set_rejects_negative_expense_without_sending() {
        let env = TestEnv::new().await;
        let err = ledger_set(
            env.config(),
            Mode::Testing,
            set_args(LedgerCategory::Cogs, "tires", 3, "-20"),
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "Validation error");
        let state = env.snapshot();
        assert!(state
            .requests_to(Method::Put, &ledger_path("car-1", 2025))
            .is_empty());
    }

    #[tokio::test]
    async fn test_history_lists_changes() {
        let env = TestEnv::new().await;
        for value in ["10", "20", "30"] {
            ledger_set(
                env.config(),
                Mode::Testing,
                set_args(LedgerCategory::DirectDelivery, "fuel", 5, value),
            )
            .await
            .unwrap();
        }
        let args = LedgerHistoryArgs::new(
            "car-1",
            2025,
            Some(LedgerCategory::DirectDelivery),
            None,
            PageArgs::new(Some(2), 1, false),
        );
        let out = ledger_history(env.config(), Mode::Testing, args).await.unwrap();
        let entries = out.structure().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].new_value, Amount::from(30));
        assert!(out.message().starts_with("Showing 2 of 3 changes"));
    }

    #[tokio::test]
    async fn test_export_csv() {
        let env = TestEnv::new().await;
        ledger_set(
            env.config(),
            Mode::Testing,
            set_args(LedgerCategory::OperatingExpense, "insurance", 1, "99.5"),
        )
        .await
        .unwrap();
        let output = env.config().root().join("ledger.csv");
        let out = ledger_export(
            env.config(),
            Mode::Testing,
            LedgerExportArgs::new("car-1", 2025, output.clone()),
        )
        .await
        .unwrap();
        assert_eq!(out.message(), format!("Exported 13 rows to {}", output.display()));

        let text = std::fs::read_to_string(&output).unwrap();
        // Header, one line per field and the net line.
        assert_eq!(text.lines().count(), 15);
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "category,field,Jan,Feb,Mar,Apr,May,Jun,Jul,Aug,Sep,Oct,Nov,Dec,total"
        );
        assert!(text.contains("\noperatingExpense,insurance,99.5,0,0,0,0,0,0,0,0,0,0,0,99.5\n"));
        assert!(text.ends_with("net,,-99.5,0,0,0,0,0,0,0,0,0,0,0,-99.5\n"));
    }
}
