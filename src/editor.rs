//! Edit state for the income and expense ledger.
//!
//! At most one cell is edited at a time. A value is staged with `update_cell` and sent with
//! `save_changes`; the edit is only closed once the portal has accepted the change, after which
//! the cached ledger is dropped so the next read comes from the portal.

use crate::api::Portal;
use crate::cache::{QueryCache, QueryKey};
use crate::model::{Amount, CellChange, CellKey, LedgerCell, YearLedger};
use crate::Result;
use anyhow::{anyhow, Context};
use tracing::{debug, info, warn};

/// The car and year being viewed.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Selection {
    pub car_id: String,
    pub year: i32,
}

/// The cell being edited and whatever has been staged for it.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Edit {
    pub key: CellKey,
    pub value: Option<Amount>,
    pub remark: Option<String>,
}

#[derive(Debug, Default)]
pub struct LedgerEditor {
    selection: Option<Selection>,
    editing: Option<Edit>,
    cache: QueryCache<YearLedger>,
    last_error: Option<String>,
}

impl LedgerEditor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Switches to another car or year. Any open edit is discarded.
    pub fn select(&mut self, car_id: impl Into<String>, year: i32) {
        let selection = Selection {
            car_id: car_id.into(),
            year,
        };
        if self.selection.as_ref() != Some(&selection) {
            self.editing = None;
        }
        self.selection = Some(selection);
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn editing(&self) -> Option<&Edit> {
        self.editing.as_ref()
    }

    /// Sets or clears the cell being edited. Choosing another cell discards what was staged for
    /// the previous one.
    pub fn set_editing_cell(&mut self, cell: Option<CellKey>) {
        if let Some(old) = &self.editing {
            if old.value.is_some() && cell.as_ref() != Some(&old.key) {
                debug!("Discarding the staged value of {}", old.key);
            }
        }
        self.editing = cell.map(|key| match self.editing.take() {
            Some(same) if same.key == key => same,
            _ => Edit {
                key,
                value: None,
                remark: None,
            },
        });
    }

    /// Stages a value and remark for the cell being edited.
    pub fn update_cell(&mut self, value: Amount, remark: Option<String>) -> Result<()> {
        let result = self.stage(value, remark);
        if let Err(e) = &result {
            self.last_error = Some(format!("{e:#}"));
        }
        result
    }

    fn stage(&mut self, value: Amount, remark: Option<String>) -> Result<()> {
        let edit = self
            .editing
            .as_mut()
            .context("No cell is being edited")?;
        edit.key.category.validate(value)?;
        edit.value = Some(value);
        edit.remark = remark.filter(|r| !r.trim().is_empty());
        Ok(())
    }

    /// The change `save_changes` would send, if a value has been staged.
    pub fn pending_change(&self) -> Option<CellChange> {
        let edit = self.editing.as_ref()?;
        Some(CellChange {
            category: edit.key.category,
            field: edit.key.field.clone(),
            month: edit.key.month,
            value: edit.value?,
            remark: edit.remark.clone(),
        })
    }

    /// The message of the last failed edit or save, cleared by a successful save.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Returns the ledger of the selected car and year, from the cache when it has one.
    pub async fn ledger(&mut self, portal: &mut (dyn Portal + Send)) -> Result<YearLedger> {
        let selection = self
            .selection
            .clone()
            .context("No car and year are selected")?;
        let key = QueryKey::ledger(&selection.car_id, selection.year);
        if let Some(ledger) = self.cache.get(&key) {
            return Ok(ledger);
        }
        let ledger = portal.ledger(&selection.car_id, selection.year).await?;
        self.cache.put(key, ledger.clone());
        Ok(ledger)
    }

    /// Sends the staged change to the portal once. On success the cached ledger is dropped and
    /// the edit is closed; on failure the edit stays open and the error is kept in `last_error`.
    pub async fn save_changes(&mut self, portal: &mut (dyn Portal + Send)) -> Result<LedgerCell> {
        let result = self.save(portal).await;
        match &result {
            Ok(cell) => {
                info!("Saved {} = {}", cell.key, cell.value);
                self.last_error = None;
            }
            Err(e) => {
                warn!("Unable to save the ledger edit: {e:#}");
                self.last_error = Some(format!("{e:#}"));
            }
        }
        result
    }

    async fn save(&mut self, portal: &mut (dyn Portal + Send)) -> Result<LedgerCell> {
        let selection = self
            .selection
            .clone()
            .context("No car and year are selected")?;
        let change = self.pending_change().ok_or_else(|| match &self.editing {
            None => anyhow!("No cell is being edited"),
            Some(edit) => anyhow!("No value has been entered for {}", edit.key),
        })?;

        let cell = portal
            .update_cell(&selection.car_id, selection.year, &change)
            .await?;

        let dropped = self
            .cache
            .invalidate_prefix(&QueryKey::ledger(&selection.car_id, selection.year));
        debug!("Dropped {dropped} cached ledger(s) after saving {}", cell.key);
        self.editing = None;
        Ok(cell)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ledger_path, portal, Method, TestState, TestTransport};
    use crate::model::{LedgerCategory, Month};

    fn key(category: LedgerCategory, field: &str, month: u8) -> CellKey {
        CellKey::new(category, field, Month::new(month).unwrap())
    }

    fn setup() -> (TestTransport, Box<dyn Portal + Send>, LedgerEditor) {
        let transport = TestTransport::isolated(TestState::default());
        let p = portal(Box::new(transport.clone()));
        let mut editor = LedgerEditor::new();
        editor.select("car-1", 2025);
        (transport, p, editor)
    }

    fn puts(transport: &TestTransport) -> Vec<crate::api::Request> {
        transport
            .snapshot()
            .requests_to(Method::Put, &ledger_path("car-1", 2025))
            .into_iter()
            .cloned()
            .collect()
    }

    #[tokio::test]
    async fn test_save_sends_once_and_closes_edit() {
        let (transport, mut p, mut editor) = setup();
        let target = key(LedgerCategory::Cogs, "tires", 4);

        let before = editor.ledger(p.as_mut()).await.unwrap();
        assert!(before.value(&target).is_zero());

        editor.set_editing_cell(Some(target.clone()));
        editor
            .update_cell("315.20".parse::<Amount>().unwrap(), Some("new tires".into()))
            .unwrap();
        let cell = editor.save_changes(p.as_mut()).await.unwrap();
        assert_eq!(cell.value, "315.20".parse::<Amount>().unwrap());
        assert!(editor.editing().is_none());
        assert!(editor.last_error().is_none());

        let sent = puts(&transport);
        assert_eq!(sent.len(), 1);
        let body = sent[0].body.as_ref().unwrap();
        assert_eq!(body["category"], "cogs");
        assert_eq!(body["field"], "tires");
        assert_eq!(body["month"], 4);
        assert_eq!(body["value"], 315.2);
        assert_eq!(body["remark"], "new tires");

        // The cache was dropped so this read goes to the portal.
        let after = editor.ledger(p.as_mut()).await.unwrap();
        assert_eq!(after.value(&target), "315.20".parse::<Amount>().unwrap());
        let gets = transport
            .snapshot()
            .requests_to(Method::Get, &ledger_path("car-1", 2025))
            .len();
        assert_eq!(gets, 2);
    }

    #[tokio::test]
    async fn test_failed_save_keeps_edit() {
        let (transport, mut p, mut editor) = setup();
        let target = key(LedgerCategory::Income, "rentalIncome", 1);
        editor.set_editing_cell(Some(target.clone()));
        editor.update_cell(Amount::from(-50), None).unwrap();

        transport.with_state(|s| s.fail_next(500, "Database unavailable"));
        assert!(editor.save_changes(p.as_mut()).await.is_err());
        assert_eq!(puts(&transport).len(), 1);
        let edit = editor.editing().unwrap();
        assert_eq!(edit.key, target);
        assert_eq!(edit.value, Some(Amount::from(-50)));
        assert!(editor
            .last_error()
            .unwrap()
            .contains("Database unavailable"));

        // Resubmitting is up to the user.
        editor.save_changes(p.as_mut()).await.unwrap();
        assert_eq!(puts(&transport).len(), 2);
        assert!(editor.editing().is_none());
        assert!(editor.last_error().is_none());
    }

    #[tokio::test]
    async fn test_nothing_to_save() {
        let (transport, mut p, mut editor) = setup();
        assert!(editor.save_changes(p.as_mut()).await.is_err());
        editor.set_editing_cell(Some(key(LedgerCategory::Cogs, "tires", 2)));
        let err = editor.save_changes(p.as_mut()).await.unwrap_err();
        assert_eq!(err.to_string(), "No value has been entered for cogs/tires/Feb");
        assert!(puts(&transport).is_empty());
    }

    #[test]
    fn test_update_requires_target_and_sign() {
        let mut editor = LedgerEditor::new();
        assert!(editor.update_cell(Amount::from(10), None).is_err());
        assert_eq!(editor.last_error(), Some("No cell is being edited"));

        editor.set_editing_cell(Some(key(LedgerCategory::OperatingExpense, "insurance", 3)));
        assert!(editor.update_cell(Amount::from(-10), None).is_err());
        assert_eq!(editor.editing().unwrap().value, None);
        editor.update_cell(Amount::from(10), Some("  ".into())).unwrap();
        assert_eq!(editor.pending_change().unwrap().remark, None);
    }

    #[test]
    fn test_single_edit_target() {
        let mut editor = LedgerEditor::new();
        let first = key(LedgerCategory::Cogs, "tires", 1);
        let second = key(LedgerCategory::Cogs, "tires", 2);
        editor.set_editing_cell(Some(first.clone()));
        editor.update_cell(Amount::from(5), None).unwrap();

        // Re-selecting the same cell keeps the staged value.
        editor.set_editing_cell(Some(first));
        assert_eq!(editor.editing().unwrap().value, Some(Amount::from(5)));

        editor.set_editing_cell(Some(second.clone()));
        let edit = editor.editing().unwrap();
        assert_eq!(edit.key, second);
        assert_eq!(edit.value, None);

        editor.set_editing_cell(None);
        assert!(editor.editing().is_none());
    }

    #[test]
    fn test_select_other_car_closes_edit() {
        let mut editor = LedgerEditor::new();
        editor.select("car-1", 2025);
        editor.set_editing_cell(Some(key(LedgerCategory::Cogs, "tires", 1)));
        editor.select("car-1", 2025);
        assert!(editor.editing().is_some());
        editor.select("car-2", 2025);
        assert!(editor.editing().is_none());
    }
}
