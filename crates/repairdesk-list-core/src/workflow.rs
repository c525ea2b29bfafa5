//! Record creation from an upstream source and quote-to-order conversion.

use std::cmp::Ordering;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use crate::history::HistoryAction;
use crate::profile::{CreateSource, is_approved_status};
use crate::record::{ListRecord, OrderRecord, QuoteRecord, RepairTicket, non_blank};
use crate::service::ServiceError;

/// Upper bound on the entries offered in a source picker.
pub const MAX_SOURCE_OPTIONS: usize = 400;

/// One entry of a source picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceOption {
    pub id: String,
    pub label: String,
}

/// Quotes an order can be created from, labelled `number · customer` plus
/// the repair number when the quote is bound to a known ticket.
pub fn quote_options(quotes: &[QuoteRecord], repairs: &[RepairTicket]) -> Vec<SourceOption> {
    quotes
        .iter()
        .filter(|quote| !quote.is_deleted && !quote.id.trim().is_empty())
        .take(MAX_SOURCE_OPTIONS)
        .map(|quote| {
            let number = non_blank(&quote.quote_no).unwrap_or(quote.id.trim());
            let mut label = format!("{number} · {}", quote.customer.trim());
            if let Some(repair) = quote
                .repair_id()
                .and_then(|id| repairs.iter().find(|repair| repair.id.trim() == id))
            {
                label.push_str(" · ");
                label.push_str(repair.number());
            }
            SourceOption {
                id: quote.id.trim().to_string(),
                label,
            }
        })
        .collect()
}

fn newest_repair_first(left: &RepairTicket, right: &RepairTicket) -> Ordering {
    let (left_no, right_no) = (left.number(), right.number());
    if !left_no.is_empty() && !right_no.is_empty() && left_no != right_no {
        return right_no.cmp(left_no);
    }
    let stamp = |ticket: &RepairTicket| {
        non_blank(&ticket.created_at)
            .or_else(|| non_blank(&ticket.updated_at))
            .unwrap_or_default()
            .to_string()
    };
    let (left_at, right_at) = (stamp(left), stamp(right));
    if !left_at.is_empty() && !right_at.is_empty() && left_at != right_at {
        return right_at.cmp(&left_at);
    }
    right.id.cmp(&left.id)
}

/// Repair tickets a quote can be created from, newest repair number first.
pub fn repair_options(repairs: &[RepairTicket]) -> Vec<SourceOption> {
    let mut live: Vec<&RepairTicket> = repairs
        .iter()
        .filter(|repair| !repair.is_deleted && !repair.id.trim().is_empty())
        .collect();
    live.sort_by(|left, right| newest_repair_first(left, right));
    live.into_iter()
        .take(MAX_SOURCE_OPTIONS)
        .map(|repair| SourceOption {
            id: repair.id.trim().to_string(),
            label: format!(
                "{} · {} · {}",
                repair.number(),
                repair.customer.trim(),
                repair.machine.trim()
            ),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CreateError {
    #[error("{}", .0.missing_selection_message())]
    MissingSelection(CreateSource),
    #[error("建立失敗：{0}")]
    Service(#[from] ServiceError),
}

/// Creates records of `R` from an upstream record.
#[async_trait(?Send)]
pub trait RecordFactory<R: ListRecord> {
    async fn create_from(&self, source: CreateSource, source_id: &str) -> Result<R, ServiceError>;
}

/// Creates a record from the picked source. A blank pick never reaches the
/// factory.
pub async fn create_from_source<R, F>(
    source: CreateSource,
    picked: &str,
    factory: &F,
) -> Result<R, CreateError>
where
    R: ListRecord,
    F: RecordFactory<R> + ?Sized,
{
    let Some(source_id) = non_blank(picked) else {
        return Err(CreateError::MissingSelection(source));
    };
    let record = factory.create_from(source, source_id).await?;
    info!(?source, source_id, id = record.id(), "record created from source");
    Ok(record)
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConvertError {
    #[error("需先將報價狀態設定為「已核准（簽核）」才可轉訂單")]
    NotApproved,
    #[error("轉訂單失敗：{0}")]
    Service(#[from] ServiceError),
}

/// Order services reached while converting a quote.
#[async_trait(?Send)]
pub trait OrderConversion {
    /// The live order already created from `quote_id`, if any.
    async fn order_for_quote(&self, quote_id: &str) -> Result<Option<OrderRecord>, ServiceError>;
    async fn create_order_from_quote(&self, quote_id: &str) -> Result<OrderRecord, ServiceError>;
    async fn record_history(
        &self,
        quote_id: &str,
        action: &HistoryAction,
    ) -> Result<(), ServiceError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    pub order: OrderRecord,
    pub created: bool,
}

/// Opens the existing order of an approved quote or creates one.
///
/// A failed lookup stops the conversion so no duplicate order is created.
/// The history entry is best effort.
pub async fn convert_quote_to_order<C>(
    quote: &QuoteRecord,
    backend: &C,
) -> Result<Conversion, ConvertError>
where
    C: OrderConversion + ?Sized,
{
    if !is_approved_status(&quote.status) {
        return Err(ConvertError::NotApproved);
    }
    let quote_id = quote.id.trim();
    let (order, created) = match backend.order_for_quote(quote_id).await? {
        Some(order) => (order, false),
        None => (backend.create_order_from_quote(quote_id).await?, true),
    };
    let action = HistoryAction::conversion(quote, &order, created);
    if let Err(error) = backend.record_history(quote_id, &action).await {
        warn!(quote = quote_id, %error, "conversion history not recorded");
    }
    info!(quote = quote_id, order = %order.id, created, "quote converted");
    Ok(Conversion { order, created })
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use futures::executor::block_on;

    use super::*;

    fn quote(id: &str, status: &str) -> QuoteRecord {
        QuoteRecord {
            id: id.to_string(),
            status: status.to_string(),
            ..QuoteRecord::default()
        }
    }

    fn repair(id: &str, repair_no: &str, created_at: &str) -> RepairTicket {
        RepairTicket {
            id: id.to_string(),
            repair_no: repair_no.to_string(),
            customer: "Acme".to_string(),
            machine: "M1".to_string(),
            created_at: created_at.to_string(),
            ..RepairTicket::default()
        }
    }

    #[derive(Default)]
    struct FakeOrders {
        existing: RefCell<Option<Result<Option<OrderRecord>, ServiceError>>>,
        created: Cell<usize>,
        history: RefCell<Vec<String>>,
        fail_history: bool,
    }

    #[async_trait(?Send)]
    impl OrderConversion for FakeOrders {
        async fn order_for_quote(
            &self,
            _quote_id: &str,
        ) -> Result<Option<OrderRecord>, ServiceError> {
            self.existing.borrow_mut().take().unwrap_or(Ok(None))
        }

        async fn create_order_from_quote(
            &self,
            quote_id: &str,
        ) -> Result<OrderRecord, ServiceError> {
            self.created.set(self.created.get() + 1);
            Ok(OrderRecord {
                id: format!("O-{quote_id}"),
                quote_id: quote_id.to_string(),
                ..OrderRecord::default()
            })
        }

        async fn record_history(
            &self,
            _quote_id: &str,
            action: &HistoryAction,
        ) -> Result<(), ServiceError> {
            if self.fail_history {
                return Err(ServiceError::Unavailable("history".to_string()));
            }
            self.history.borrow_mut().push(action.summary.clone());
            Ok(())
        }
    }

    #[test]
    fn unapproved_quotes_are_refused() {
        let backend = FakeOrders::default();
        let error = block_on(convert_quote_to_order(&quote("Q1", "草稿"), &backend))
            .expect_err("draft quote");
        assert_eq!(error, ConvertError::NotApproved);
        assert_eq!(backend.created.get(), 0);
    }

    #[test]
    fn an_existing_order_is_reopened() {
        let backend = FakeOrders::default();
        let existing = OrderRecord {
            id: "O9".to_string(),
            ..OrderRecord::default()
        };
        *backend.existing.borrow_mut() = Some(Ok(Some(existing)));

        let conversion =
            block_on(convert_quote_to_order(&quote("Q1", "已核准"), &backend)).expect("opened");
        assert!(!conversion.created);
        assert_eq!(conversion.order.id, "O9");
        assert_eq!(backend.created.get(), 0);
        assert_eq!(backend.history.borrow().as_slice(), ["OPEN_EXISTING_ORDER → O9"]);
    }

    #[test]
    fn a_failed_lookup_creates_nothing() {
        let backend = FakeOrders::default();
        *backend.existing.borrow_mut() =
            Some(Err(ServiceError::Unavailable("offline".to_string())));

        let error = block_on(convert_quote_to_order(&quote("Q1", "已核准"), &backend))
            .expect_err("lookup failed");
        assert_eq!(error.to_string(), "轉訂單失敗：service unavailable: offline");
        assert_eq!(backend.created.get(), 0);
        assert!(backend.history.borrow().is_empty());
    }

    #[test]
    fn a_missing_order_is_created_even_if_history_fails() {
        let backend = FakeOrders {
            fail_history: true,
            ..FakeOrders::default()
        };
        let conversion =
            block_on(convert_quote_to_order(&quote("Q1", "approved"), &backend)).expect("created");
        assert!(conversion.created);
        assert_eq!(conversion.order.quote_id, "Q1");
        assert_eq!(backend.created.get(), 1);
    }

    struct EchoFactory {
        calls: Cell<usize>,
    }

    #[async_trait(?Send)]
    impl RecordFactory<QuoteRecord> for EchoFactory {
        async fn create_from(
            &self,
            source: CreateSource,
            source_id: &str,
        ) -> Result<QuoteRecord, ServiceError> {
            self.calls.set(self.calls.get() + 1);
            assert_eq!(source, CreateSource::Repair);
            Ok(QuoteRecord {
                id: format!("Q-{source_id}"),
                repair_id: source_id.to_string(),
                ..QuoteRecord::default()
            })
        }
    }

    #[test]
    fn blank_picks_never_reach_the_factory() {
        let factory = EchoFactory {
            calls: Cell::new(0),
        };
        let error = block_on(create_from_source::<QuoteRecord, _>(
            CreateSource::Repair,
            "  ",
            &factory,
        ))
        .expect_err("no pick");
        assert_eq!(error.to_string(), "請選擇維修單");
        assert_eq!(factory.calls.get(), 0);

        let created = block_on(create_from_source::<QuoteRecord, _>(
            CreateSource::Repair,
            " R1 ",
            &factory,
        ))
        .expect("created");
        assert_eq!(created.id, "Q-R1");
        assert_eq!(factory.calls.get(), 1);
    }

    #[test]
    fn repair_options_list_the_newest_ticket_first() {
        let mut deleted = repair("R0", "R20250301-001", "");
        deleted.is_deleted = true;
        let repairs = vec![
            repair("R1", "R20250101-001", "2025-01-01"),
            repair("R2", "R20250201-001", "2025-02-01"),
            repair("R3", "", "2025-03-01"),
            deleted,
        ];
        let options = repair_options(&repairs);
        let ids: Vec<&str> = options.iter().map(|option| option.id.as_str()).collect();
        assert_eq!(ids, ["R3", "R2", "R1"]);
        assert_eq!(options[1].label, "R20250201-001 · Acme · M1");
    }

    #[test]
    fn quote_options_name_the_bound_repair() {
        let mut bound = quote("Q1", "已核准");
        bound.quote_no = "QT-1".to_string();
        bound.customer = "Globex".to_string();
        bound.repair_id = "R1".to_string();
        let unbound = quote("Q2", "草稿");
        let options = quote_options(
            &[bound, unbound],
            &[repair("R1", "R20250101-001", "2025-01-01")],
        );
        assert_eq!(options[0].label, "QT-1 · Globex · R20250101-001");
        assert_eq!(options[1].label, "Q2 · ");
    }
}
