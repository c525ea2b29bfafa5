use thiserror::Error;
use tracing::{debug, warn};

use crate::draft::{DraftStore, ItemField};
use crate::profile::NewItemPosition;
use crate::record::{HeaderPatch, LineItem, ListRecord, RepairPart};
use crate::service::{EntityService, ServiceError};
use crate::sync::{FormSnapshot, Totals, pull, totals_for_items};
use crate::validation::{ItemValidationError, ValidationPolicy, validate_items};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommitError {
    #[error("{} line item(s) failed validation", .0.len())]
    Validation(Vec<ItemValidationError>),
    #[error("儲存失敗：{0}")]
    Service(#[from] ServiceError),
    #[error("找不到資料：{0}")]
    NotFound(String),
    #[error("儲存中，請稍候")]
    InFlight,
}

impl CommitError {
    /// One notification line for the user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(errors) => errors
                .first()
                .map_or_else(|| self.to_string(), ToString::to_string),
            other => other.to_string(),
        }
    }

    #[must_use]
    pub fn focus(&self) -> Option<(usize, ItemField)> {
        match self {
            Self::Validation(errors) => errors.iter().find_map(ItemValidationError::focus),
            Self::Service(_) | Self::NotFound(_) | Self::InFlight => None,
        }
    }
}

/// The one open detail view of a module and the draft behind it.
#[derive(Debug, Clone)]
pub struct DetailEditor<R: ListRecord> {
    drafts: DraftStore,
    active: Option<R>,
    policy: ValidationPolicy,
    /// Id of the record whose save is awaiting the service.
    committing: Option<String>,
}

impl<R: ListRecord> Default for DetailEditor<R> {
    fn default() -> Self {
        Self::new(DraftStore::default(), ValidationPolicy::default())
    }
}

impl<R: ListRecord> DetailEditor<R> {
    #[must_use]
    pub fn new(drafts: DraftStore, policy: ValidationPolicy) -> Self {
        Self {
            drafts,
            active: None,
            policy,
            committing: None,
        }
    }

    /// Opens `record`, seeding its draft unless one is already held.
    /// A different previously open entity loses its draft.
    pub fn open(&mut self, record: R) -> Option<&[LineItem]> {
        if record.id().trim().is_empty() {
            return None;
        }
        if let Some(previous) = self.active.take()
            && previous.id() != record.id()
        {
            self.drafts.discard(previous.id());
        }
        let record = self.active.insert(record);
        self.drafts.ensure(record.id(), record.items())
    }

    /// Discards the open draft. Returns the id that was open.
    pub fn close(&mut self) -> Option<String> {
        let record = self.active.take()?;
        self.drafts.discard(record.id());
        Some(record.id().to_string())
    }

    #[must_use]
    pub fn active_id(&self) -> Option<&str> {
        self.active.as_ref().map(ListRecord::id)
    }

    #[must_use]
    pub fn active(&self) -> Option<&R> {
        self.active.as_ref()
    }

    #[must_use]
    pub fn draft(&self) -> Option<&[LineItem]> {
        self.drafts.get(self.active_id()?)
    }

    #[must_use]
    pub fn drafts(&self) -> &DraftStore {
        &self.drafts
    }

    #[must_use]
    pub fn totals(&self) -> Option<Totals> {
        self.draft().map(totals_for_items)
    }

    /// Folds the form into the draft. Without a form the draft is returned as is.
    pub fn pull(&mut self, snapshot: Option<&FormSnapshot>) -> Option<&[LineItem]> {
        let record = self.active.as_ref()?;
        match snapshot {
            Some(snapshot) => pull(&mut self.drafts, record.id(), record.items(), snapshot),
            None => self.drafts.ensure(record.id(), record.items()),
        }
    }

    pub fn update_field(&mut self, index: usize, field: ItemField, raw: Option<&str>) -> bool {
        let Some(record) = self.active.as_ref() else {
            return false;
        };
        self.drafts.ensure(record.id(), record.items());
        self.drafts.update_field(record.id(), index, field, raw)
    }

    /// Adds a placeholder row after pulling the form, at the end the module's
    /// profile names. Returns the index to focus.
    pub fn add_item(&mut self, snapshot: Option<&FormSnapshot>) -> Option<usize> {
        self.pull(snapshot)?;
        let id = self.active_id()?.to_string();
        match R::profile().new_item_position {
            NewItemPosition::Back => self.drafts.add_item(&id),
            NewItemPosition::Front => self.drafts.insert_item(&id, 0).then_some(0),
        }
    }

    pub fn remove_item(&mut self, snapshot: Option<&FormSnapshot>, index: usize) -> bool {
        if self.pull(snapshot).is_none() {
            return false;
        }
        let Some(id) = self.active.as_ref().map(|record| record.id().to_string()) else {
            return false;
        };
        self.drafts.remove_item(&id, index)
    }

    /// Overwrites the draft with the importable parts. Returns how many were taken.
    /// Replaces the open draft with the importable `parts`. With none
    /// importable the draft is kept and `Some(0)` is returned.
    pub fn import_repair_parts(&mut self, parts: &[RepairPart]) -> Option<usize> {
        let id = self.active_id()?.to_string();
        let items: Vec<LineItem> = parts.iter().filter_map(RepairPart::to_line_item).collect();
        let count = items.len();
        if count > 0 {
            self.drafts.replace(&id, items);
        }
        Some(count)
    }

    #[must_use]
    pub fn is_committing(&self) -> bool {
        self.committing.is_some()
    }

    /// Pulls, validates and builds the replacement record. Nothing is
    /// persisted and the draft survives on failure.
    ///
    /// A successful call marks the save as in flight until
    /// [`complete_commit`](Self::complete_commit) or
    /// [`abort_commit`](Self::abort_commit); further calls fail with
    /// [`CommitError::InFlight`] meanwhile.
    pub fn prepare_commit(
        &mut self,
        snapshot: Option<&FormSnapshot>,
        patch: &HeaderPatch,
    ) -> Result<R, CommitError> {
        if let Some(pending) = &self.committing {
            debug!(id = %pending, "save already in flight");
            return Err(CommitError::InFlight);
        }
        let Some(record) = self.active.as_ref() else {
            return Err(CommitError::NotFound(String::new()));
        };
        let id = record.id().to_string();
        let draft = match snapshot {
            Some(snapshot) => pull(&mut self.drafts, &id, record.items(), snapshot),
            None => self.drafts.ensure(&id, record.items()),
        }
        .ok_or_else(|| CommitError::NotFound(id.clone()))?;

        let items = validate_items(draft, &self.policy).map_err(|errors| {
            debug!(id = %id, errors = errors.len(), "commit rejected by validation");
            CommitError::Validation(errors)
        })?;
        let record = record.with_committed_items(items, patch);
        self.committing = Some(id);
        Ok(record)
    }

    /// Ends an in-flight save the service refused. The draft is kept.
    pub fn abort_commit(&mut self) {
        self.committing = None;
    }

    /// Drops the draft after the service accepted `id`, closing it if open.
    pub fn complete_commit(&mut self, id: &str) -> bool {
        self.committing = None;
        let discarded = self.drafts.discard(id).is_some();
        if self.active_id() == Some(id.trim()) {
            self.active = None;
        }
        discarded
    }
}

/// Validates and persists the open draft through `service`.
///
/// Validation failures never reach the service. A service failure keeps the
/// draft so the user can retry.
pub async fn commit_with_service<R, S>(
    editor: &mut DetailEditor<R>,
    service: &S,
    snapshot: Option<&FormSnapshot>,
    patch: &HeaderPatch,
) -> Result<R, CommitError>
where
    R: ListRecord,
    S: EntityService<R> + ?Sized,
{
    let record = editor.prepare_commit(snapshot, patch)?;
    let id = record.id().to_string();
    match service.upsert(record).await {
        Ok(saved) => {
            editor.complete_commit(&id);
            Ok(saved)
        }
        Err(error) => {
            editor.abort_commit();
            warn!(id = %id, error = %error, "upsert failed; keeping draft");
            Err(CommitError::Service(error))
        }
    }
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;

    use super::*;
    use crate::record::{OrderRecord, QuoteRecord};
    use crate::service::MemoryEntityService;
    use crate::sync::FormRow;

    fn quote(id: &str, items: Vec<LineItem>) -> QuoteRecord {
        QuoteRecord {
            id: id.to_string(),
            items,
            ..QuoteRecord::default()
        }
    }

    fn fan() -> LineItem {
        LineItem {
            name: "Fan".to_string(),
            qty: 2.0,
            unit_price: 100.0,
            ..LineItem::blank()
        }
    }

    #[test]
    fn opening_another_entity_discards_the_previous_draft() {
        let mut editor = DetailEditor::default();
        editor.open(quote("Q1", vec![fan()]));
        editor.update_field(0, ItemField::Name, Some("edited"));
        editor.open(quote("Q2", Vec::new()));

        assert_eq!(editor.active_id(), Some("Q2"));
        assert!(!editor.drafts().contains("Q1"));
        assert_eq!(editor.drafts().len(), 1);
    }

    #[test]
    fn reopening_the_same_entity_keeps_edits() {
        let mut editor = DetailEditor::default();
        editor.open(quote("Q1", vec![fan()]));
        editor.update_field(0, ItemField::Qty, Some("5"));
        let draft = editor.open(quote("Q1", vec![fan()])).expect("draft");
        assert_eq!(draft[0].qty, 5.0);
    }

    #[test]
    fn add_item_pulls_unsaved_keystrokes_first() {
        let mut editor = DetailEditor::default();
        editor.open(quote("Q1", vec![fan()]));
        let snapshot = FormSnapshot {
            item_count: Some("1".to_string()),
            rows: vec![
                FormRow::default()
                    .with(ItemField::Name, "Typed")
                    .with(ItemField::Qty, "3")
                    .with(ItemField::UnitPrice, "10"),
            ],
            currency: None,
        };

        assert_eq!(editor.add_item(Some(&snapshot)), Some(0));
        let draft = editor.draft().expect("draft");
        assert_eq!(draft.len(), 2);
        assert_eq!(draft[0], LineItem::blank());
        assert_eq!(draft[1].name, "Typed");
    }

    #[test]
    fn quotes_add_new_rows_at_the_top() {
        let mut editor = DetailEditor::default();
        editor.open(quote("Q1", vec![fan()]));
        assert_eq!(editor.add_item(None), Some(0));
        let draft = editor.draft().expect("draft");
        assert_eq!(draft[0], LineItem::blank());
        assert_eq!(draft[1].name, "Fan");
    }

    #[test]
    fn orders_append_new_rows() {
        let mut editor = DetailEditor::default();
        editor.open(OrderRecord {
            id: "O1".to_string(),
            items: vec![fan()],
            ..OrderRecord::default()
        });
        assert_eq!(editor.add_item(None), Some(1));
        let draft = editor.draft().expect("draft");
        assert_eq!(draft[0].name, "Fan");
        assert_eq!(draft[1], LineItem::blank());
    }

    #[test]
    fn validation_failure_makes_no_service_call() {
        let service = MemoryEntityService::new(vec![quote("Q1", Vec::new())]);
        let mut editor = DetailEditor::default();
        editor.open(quote("Q1", Vec::new()));
        editor.update_field(0, ItemField::Name, Some(""));

        let error = block_on(commit_with_service(
            &mut editor,
            &service,
            None,
            &HeaderPatch::default(),
        ))
        .expect_err("blank name");
        assert_eq!(
            error,
            CommitError::Validation(vec![ItemValidationError::MissingName { row: 1 }])
        );
        assert_eq!(error.user_message(), "第 1 列：請填寫零件名稱");
        assert_eq!(error.focus(), Some((0, ItemField::Name)));
        assert_eq!(service.upsert_calls(), 0);
        assert!(editor.draft().is_some());
    }

    #[test]
    fn service_failure_keeps_the_draft() {
        let service = MemoryEntityService::new(vec![quote("Q1", vec![fan()])]);
        service.fail_upserts(Some("offline"));
        let mut editor = DetailEditor::default();
        editor.open(quote("Q1", vec![fan()]));
        editor.update_field(0, ItemField::Qty, Some("4"));

        let error = block_on(commit_with_service(
            &mut editor,
            &service,
            None,
            &HeaderPatch::default(),
        ))
        .expect_err("offline");
        assert_eq!(error.user_message(), "儲存失敗：offline");
        assert_eq!(editor.draft().map(|items| items[0].qty), Some(4.0));
        assert_eq!(service.snapshot()[0].items[0].qty, 2.0);
    }

    #[test]
    fn successful_commit_persists_and_closes() {
        let service = MemoryEntityService::new(vec![quote("Q1", vec![fan()])]);
        let mut editor = DetailEditor::default();
        editor.open(quote("Q1", vec![fan()]));
        editor.update_field(0, ItemField::Qty, Some("3"));

        let saved = block_on(commit_with_service(
            &mut editor,
            &service,
            None,
            &HeaderPatch::default(),
        ))
        .expect("saved");
        assert_eq!(saved.total_amount, 300.0);
        assert_eq!(service.snapshot()[0].items[0].qty, 3.0);
        assert_eq!(editor.active_id(), None);
        assert!(editor.drafts().is_empty());
    }

    #[test]
    fn a_second_save_waits_for_the_first() {
        let mut editor = DetailEditor::default();
        editor.open(quote("Q1", vec![fan()]));

        let record = editor
            .prepare_commit(None, &HeaderPatch::default())
            .expect("first save");
        assert!(editor.is_committing());
        assert_eq!(
            editor.prepare_commit(None, &HeaderPatch::default()),
            Err(CommitError::InFlight)
        );

        editor.abort_commit();
        assert!(!editor.is_committing());
        assert!(editor.draft().is_some());
        editor
            .prepare_commit(None, &HeaderPatch::default())
            .expect("retry after refusal");

        assert!(editor.complete_commit(&record.id));
        assert!(!editor.is_committing());
    }

    #[test]
    fn repair_parts_replace_the_draft() {
        let mut editor: DetailEditor<QuoteRecord> = DetailEditor::default();
        assert_eq!(editor.import_repair_parts(&[]), None);

        editor.open(quote("Q1", vec![fan()]));
        let parts = vec![
            RepairPart {
                part_name: "Pump".to_string(),
                qty: 2.0,
                ..RepairPart::default()
            },
            RepairPart::default(),
        ];
        assert_eq!(editor.import_repair_parts(&parts), Some(1));
        let draft = editor.draft().expect("draft");
        assert_eq!(draft.len(), 1);
        assert_eq!(draft[0].name, "Pump");
    }

    #[test]
    fn an_import_without_parts_keeps_the_draft() {
        let mut editor: DetailEditor<QuoteRecord> = DetailEditor::default();
        editor.open(quote("Q1", vec![fan()]));
        assert_eq!(editor.import_repair_parts(&[RepairPart::default()]), Some(0));
        assert_eq!(editor.draft().map(<[LineItem]>::len), Some(1));
        assert_eq!(editor.draft().map(|items| items[0].name.as_str()), Some("Fan"));
    }

    #[test]
    fn close_discards_the_draft() {
        let mut editor = DetailEditor::default();
        editor.open(quote("Q1", vec![fan()]));
        assert_eq!(editor.close(), Some("Q1".to_string()));
        assert!(editor.drafts().is_empty());
        assert!(!editor.remove_item(None, 0));
    }
}
