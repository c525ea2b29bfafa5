//! Quote version history as reported by the quote service.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::record::{OrderRecord, QuoteRecord, lenient_number, lenient_string, non_blank};

pub const CONVERT_TO_ORDER: &str = "CONVERT_TO_ORDER";
pub const OPEN_EXISTING_ORDER: &str = "OPEN_EXISTING_ORDER";

/// One field that changed between two versions.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FieldChange {
    #[serde(default, deserialize_with = "lenient_string")]
    pub field: String,
    #[serde(default)]
    pub from: Value,
    #[serde(default)]
    pub to: Value,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    #[serde(default, deserialize_with = "lenient_number")]
    pub version: f64,
    #[serde(default, deserialize_with = "lenient_string")]
    pub at: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub by_name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub by_email: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub action: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub summary: String,
    #[serde(default)]
    pub changed: Vec<FieldChange>,
    #[serde(default)]
    pub snapshot: Option<Value>,
}

fn version_text(version: f64) -> String {
    if !version.is_finite() || version <= 0.0 {
        return "0".to_string();
    }
    if version.fract() == 0.0 {
        format!("{version:.0}")
    } else {
        version.to_string()
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

impl HistoryEntry {
    #[must_use]
    pub fn version_label(&self) -> String {
        format!("v{}", version_text(self.version))
    }

    /// Display name, then email, then a dash.
    #[must_use]
    pub fn author(&self) -> &str {
        non_blank(&self.by_name)
            .or_else(|| non_blank(&self.by_email))
            .unwrap_or("—")
    }

    /// `field: from → to` pairs joined with `；`. Empty without changes.
    #[must_use]
    pub fn changed_text(&self) -> String {
        self.changed
            .iter()
            .map(|change| {
                format!(
                    "{}: {} → {}",
                    change.field,
                    value_text(&change.from),
                    value_text(&change.to)
                )
            })
            .collect::<Vec<_>>()
            .join("；")
    }

    /// Pretty-printed snapshot, or `None` when there is nothing to show.
    #[must_use]
    pub fn snapshot_text(&self) -> Option<String> {
        let snapshot = self.snapshot.as_ref().filter(|value| !value.is_null())?;
        serde_json::to_string_pretty(snapshot).ok()
    }
}

/// Newest version first, then the latest timestamp.
pub fn sort_history(entries: &mut [HistoryEntry]) {
    entries.sort_by(|left, right| {
        right
            .version
            .partial_cmp(&left.version)
            .unwrap_or(Ordering::Equal)
            .then_with(|| right.at.cmp(&left.at))
    });
}

/// Action appended to a quote's history without a new quote version.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryAction {
    pub action: &'static str,
    pub version: f64,
    pub summary: String,
    pub changed: Vec<FieldChange>,
    pub snapshot: Value,
    pub meta: Value,
}

impl HistoryAction {
    /// Records that `quote` was converted into `order`, or that its existing
    /// order was reopened when `created` is false.
    #[must_use]
    pub fn conversion(quote: &QuoteRecord, order: &OrderRecord, created: bool) -> Self {
        let label = non_blank(&order.order_no).unwrap_or(order.id.trim());
        let summary = if created {
            format!("{CONVERT_TO_ORDER} → {label}")
        } else {
            format!("{OPEN_EXISTING_ORDER} → {label}")
        };
        let version = if quote.version.is_finite() && quote.version > 0.0 {
            quote.version
        } else {
            1.0
        };
        Self {
            action: CONVERT_TO_ORDER,
            version,
            summary,
            changed: Vec::new(),
            snapshot: serde_json::to_value(quote).unwrap_or(Value::Null),
            meta: json!({ "orderId": order.id, "orderNo": order.order_no }),
        }
    }
}
