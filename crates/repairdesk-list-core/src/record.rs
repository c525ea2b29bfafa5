use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::profile::{ModuleProfile, ORDERS, QUOTES};

pub const DEFAULT_UNIT: &str = "pcs";
pub const DEFAULT_CURRENCY: &str = "TWD";

/// One editable line on an order or quote.
///
/// Position inside the owning list is the identity used by form fields and
/// removal, so the struct itself carries no id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub mpn: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub vendor: String,
    #[serde(default = "default_unit", deserialize_with = "lenient_unit")]
    pub unit: String,
    #[serde(default = "default_qty", deserialize_with = "lenient_qty")]
    pub qty: f64,
    #[serde(default, deserialize_with = "lenient_number")]
    pub unit_price: f64,
}

impl LineItem {
    /// Placeholder row used when a draft grows past its current length.
    pub fn blank() -> Self {
        Self {
            name: String::new(),
            mpn: String::new(),
            vendor: String::new(),
            unit: DEFAULT_UNIT.to_string(),
            qty: 1.0,
            unit_price: 0.0,
        }
    }

    #[must_use]
    pub fn line_total(&self) -> f64 {
        non_negative(self.qty) * non_negative(self.unit_price)
    }

    /// Copy used when seeding a draft from canonical data.
    pub(crate) fn normalized_clone(&self) -> Self {
        let unit = if self.unit.trim().is_empty() {
            DEFAULT_UNIT.to_string()
        } else {
            self.unit.clone()
        };
        Self {
            name: self.name.clone(),
            mpn: self.mpn.clone(),
            vendor: self.vendor.clone(),
            unit,
            qty: finite_or(self.qty, 1.0),
            unit_price: finite_or(self.unit_price, 0.0),
        }
    }
}

impl Default for LineItem {
    fn default() -> Self {
        Self::blank()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateField {
    Created,
    Updated,
    Ordered,
    Expected,
    Received,
}

impl DateField {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "createdAt",
            Self::Updated => "updatedAt",
            Self::Ordered => "orderedAt",
            Self::Expected => "expectedAt",
            Self::Received => "receivedAt",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "createdAt" => Some(Self::Created),
            "updatedAt" => Some(Self::Updated),
            "orderedAt" => Some(Self::Ordered),
            "expectedAt" => Some(Self::Expected),
            "receivedAt" => Some(Self::Received),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextField {
    Number,
    Customer,
    Supplier,
    Status,
    Note,
}

impl TextField {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Number => "number",
            Self::Customer => "customer",
            Self::Supplier => "supplier",
            Self::Status => "status",
            Self::Note => "note",
        }
    }
}

/// Header values collected from a detail form at save time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderPatch {
    pub status: Option<String>,
    pub currency: Option<String>,
    pub note: Option<String>,
    pub supplier: Option<String>,
    pub ordered_at: Option<String>,
    pub expected_at: Option<String>,
    pub received_at: Option<String>,
}

/// Read access the list pipeline needs from a canonical row.
pub trait ListRecord: Clone {
    fn profile() -> &'static ModuleProfile;
    fn id(&self) -> &str;
    fn status(&self) -> &str;
    fn date(&self, field: DateField) -> Option<&str>;
    fn amount(&self) -> f64;
    fn text(&self, field: TextField) -> Option<&str>;
    fn items(&self) -> &[LineItem];
    fn repair_id(&self) -> Option<&str>;
    fn is_deleted(&self) -> bool {
        false
    }

    /// Full replacement of the row carrying a committed item list.
    #[must_use]
    fn with_committed_items(&self, items: Vec<LineItem>, patch: &HeaderPatch) -> Self;
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub order_no: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub status: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub customer: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub supplier: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub repair_id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub quote_id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub currency: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub ordered_at: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub expected_at: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub received_at: String,
    #[serde(default, deserialize_with = "lenient_number")]
    pub total_amount: f64,
    #[serde(default, deserialize_with = "lenient_items")]
    pub items: Vec<LineItem>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub note: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub created_at: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub updated_at: String,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub is_deleted: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ListRecord for OrderRecord {
    fn profile() -> &'static ModuleProfile {
        &ORDERS
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn status(&self) -> &str {
        self.status.trim()
    }

    fn date(&self, field: DateField) -> Option<&str> {
        let value = match field {
            DateField::Created => &self.created_at,
            DateField::Updated => &self.updated_at,
            DateField::Ordered => &self.ordered_at,
            DateField::Expected => &self.expected_at,
            DateField::Received => &self.received_at,
        };
        non_blank(value)
    }

    fn amount(&self) -> f64 {
        finite_or(self.total_amount, 0.0)
    }

    fn text(&self, field: TextField) -> Option<&str> {
        let value = match field {
            TextField::Number => &self.order_no,
            TextField::Customer => &self.customer,
            TextField::Supplier => &self.supplier,
            TextField::Status => &self.status,
            TextField::Note => &self.note,
        };
        non_blank(value)
    }

    fn items(&self) -> &[LineItem] {
        &self.items
    }

    fn repair_id(&self) -> Option<&str> {
        non_blank(&self.repair_id)
    }

    fn is_deleted(&self) -> bool {
        self.is_deleted
    }

    fn with_committed_items(&self, items: Vec<LineItem>, patch: &HeaderPatch) -> Self {
        let mut next = self.clone();
        next.total_amount = items.iter().map(LineItem::line_total).sum();
        next.items = items;
        if let Some(status) = patch.status.as_deref().and_then(non_blank) {
            next.status = status.to_string();
        }
        next.currency = resolve_currency(patch.currency.as_deref(), &self.currency);
        if let Some(supplier) = &patch.supplier {
            next.supplier.clone_from(supplier);
        }
        if let Some(ordered_at) = &patch.ordered_at {
            next.ordered_at.clone_from(ordered_at);
        }
        if let Some(expected_at) = &patch.expected_at {
            next.expected_at.clone_from(expected_at);
        }
        if let Some(received_at) = &patch.received_at {
            next.received_at.clone_from(received_at);
        }
        if let Some(note) = &patch.note {
            next.note.clone_from(note);
        }
        next
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub quote_no: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub status: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub customer: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub repair_id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub currency: String,
    #[serde(default, deserialize_with = "lenient_number")]
    pub total_amount: f64,
    #[serde(default, deserialize_with = "lenient_items")]
    pub items: Vec<LineItem>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub note: String,
    #[serde(default, deserialize_with = "lenient_number")]
    pub version: f64,
    #[serde(default, deserialize_with = "lenient_string")]
    pub created_at: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub updated_at: String,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub is_deleted: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ListRecord for QuoteRecord {
    fn profile() -> &'static ModuleProfile {
        &QUOTES
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn status(&self) -> &str {
        self.status.trim()
    }

    fn date(&self, field: DateField) -> Option<&str> {
        match field {
            DateField::Created => non_blank(&self.created_at),
            DateField::Updated => non_blank(&self.updated_at),
            DateField::Ordered | DateField::Expected | DateField::Received => None,
        }
    }

    fn amount(&self) -> f64 {
        finite_or(self.total_amount, 0.0)
    }

    fn text(&self, field: TextField) -> Option<&str> {
        match field {
            TextField::Number => non_blank(&self.quote_no),
            TextField::Customer => non_blank(&self.customer),
            TextField::Status => non_blank(&self.status),
            TextField::Note => non_blank(&self.note),
            TextField::Supplier => None,
        }
    }

    fn items(&self) -> &[LineItem] {
        &self.items
    }

    fn repair_id(&self) -> Option<&str> {
        non_blank(&self.repair_id)
    }

    fn is_deleted(&self) -> bool {
        self.is_deleted
    }

    fn with_committed_items(&self, items: Vec<LineItem>, patch: &HeaderPatch) -> Self {
        let mut next = self.clone();
        next.total_amount = items.iter().map(LineItem::line_total).sum();
        next.items = items;
        if let Some(status) = patch.status.as_deref().and_then(non_blank) {
            next.status = status.to_string();
        }
        next.currency = resolve_currency(patch.currency.as_deref(), &self.currency);
        if let Some(note) = &patch.note {
            next.note.clone_from(note);
        }
        next
    }
}

/// A part tracked against a repair, importable into a quote draft.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairPart {
    #[serde(default, deserialize_with = "lenient_string")]
    pub part_name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub mpn: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub vendor: String,
    #[serde(default = "default_qty", deserialize_with = "lenient_qty")]
    pub qty: f64,
    #[serde(default = "default_unit", deserialize_with = "lenient_unit")]
    pub unit: String,
    #[serde(default, deserialize_with = "lenient_number")]
    pub unit_price: f64,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub is_deleted: bool,
}

impl RepairPart {
    /// Converts to a line item, dropping deleted parts and parts with neither
    /// a name nor an MPN.
    #[must_use]
    pub fn to_line_item(&self) -> Option<LineItem> {
        if self.is_deleted {
            return None;
        }
        if self.part_name.trim().is_empty() && self.mpn.trim().is_empty() {
            return None;
        }
        Some(
            LineItem {
                name: self.part_name.clone(),
                mpn: self.mpn.clone(),
                vendor: self.vendor.clone(),
                unit: self.unit.clone(),
                qty: if self.qty == 0.0 { 1.0 } else { self.qty },
                unit_price: self.unit_price,
            }
            .normalized_clone(),
        )
    }
}

/// A repair ticket offered as the source of a new quote.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairTicket {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub repair_no: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub customer: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub machine: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub created_at: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub updated_at: String,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub is_deleted: bool,
}

impl RepairTicket {
    /// Repair number, or the id when the ticket has none.
    #[must_use]
    pub fn number(&self) -> &str {
        non_blank(&self.repair_no).unwrap_or(self.id.trim())
    }
}

fn resolve_currency(patched: Option<&str>, current: &str) -> String {
    patched
        .and_then(non_blank)
        .or_else(|| non_blank(current))
        .unwrap_or(DEFAULT_CURRENCY)
        .to_string()
}

pub(crate) fn non_blank(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() { None } else { Some(trimmed) }
}

pub(crate) fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() { value } else { fallback }
}

pub(crate) fn non_negative(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

/// Parses a user-entered number the way form inputs report them.
pub(crate) fn parse_finite(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|value| value.is_finite())
}

fn default_unit() -> String {
    DEFAULT_UNIT.to_string()
}

fn default_qty() -> f64 {
    1.0
}

fn number_from_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64().filter(|value| value.is_finite()),
        Value::String(raw) => parse_finite(raw),
        Value::Bool(flag) => Some(if *flag { 1.0 } else { 0.0 }),
        _ => None,
    }
}

pub(crate) fn lenient_number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(number_from_value(&value).unwrap_or(0.0))
}

fn lenient_qty<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(number_from_value(&value).unwrap_or(1.0))
}

pub(crate) fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Bool(flag) => flag,
        Value::Number(number) => number.as_f64().is_some_and(|value| value != 0.0),
        Value::String(raw) => matches!(raw.trim(), "1" | "true"),
        _ => false,
    })
}

pub(crate) fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Null => String::new(),
        Value::String(raw) => raw,
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        other => other.to_string(),
    })
}

fn lenient_unit<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let unit = lenient_string(deserializer)?;
    if unit.trim().is_empty() {
        Ok(default_unit())
    } else {
        Ok(unit)
    }
}

fn lenient_items<'de, D>(deserializer: D) -> Result<Vec<LineItem>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let Value::Array(entries) = value else {
        return Ok(Vec::new());
    };
    Ok(entries
        .into_iter()
        .filter(Value::is_object)
        .filter_map(|entry| serde_json::from_value::<LineItem>(entry).ok())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn order_record_tolerates_loose_service_payloads() {
        let order: OrderRecord = serde_json::from_value(json!({
            "id": "O1",
            "status": "已下單",
            "totalAmount": "1200",
            "items": [
                { "name": "Fan", "qty": "2", "unitPrice": null },
                "not-an-item",
                { "name": "Belt", "unit": "" }
            ],
            "customFlag": true
        }))
        .expect("order payload");

        assert_eq!(order.total_amount, 1200.0);
        assert_eq!(order.items.len(), 2);
        assert_eq!(order.items[0].qty, 2.0);
        assert_eq!(order.items[0].unit_price, 0.0);
        assert_eq!(order.items[1].unit, DEFAULT_UNIT);
        assert_eq!(order.items[1].qty, 1.0);
        assert_eq!(order.extra.get("customFlag"), Some(&json!(true)));
    }

    #[test]
    fn unknown_fields_survive_a_commit_round_trip() {
        let order: OrderRecord = serde_json::from_value(json!({
            "id": "O1",
            "currency": "USD",
            "legacyRef": "abc"
        }))
        .expect("order payload");
        let committed = order.with_committed_items(
            vec![LineItem {
                name: "Fan".to_string(),
                qty: 2.0,
                unit_price: 50.0,
                ..LineItem::blank()
            }],
            &HeaderPatch {
                currency: Some("  ".to_string()),
                supplier: Some("Acme".to_string()),
                ..HeaderPatch::default()
            },
        );

        let encoded = serde_json::to_value(&committed).expect("encode");
        assert_eq!(encoded["legacyRef"], json!("abc"));
        assert_eq!(encoded["currency"], json!("USD"));
        assert_eq!(encoded["supplier"], json!("Acme"));
        assert_eq!(encoded["totalAmount"], json!(100.0));
        assert_eq!(encoded["items"][0]["unitPrice"], json!(50.0));
    }

    #[test]
    fn quote_commit_ignores_order_only_header_fields() {
        let quote = QuoteRecord {
            id: "Q1".to_string(),
            ..QuoteRecord::default()
        };
        let committed = quote.with_committed_items(
            Vec::new(),
            &HeaderPatch {
                status: Some("已送出".to_string()),
                supplier: Some("ignored".to_string()),
                ..HeaderPatch::default()
            },
        );
        assert_eq!(committed.status, "已送出");
        assert_eq!(committed.currency, DEFAULT_CURRENCY);
        assert_eq!(committed.text(TextField::Supplier), None);
    }

    #[test]
    fn repair_parts_without_identity_are_dropped() {
        let keep = RepairPart {
            mpn: "MPN-1".to_string(),
            unit: String::new(),
            ..RepairPart::default()
        };
        let deleted = RepairPart {
            part_name: "Fan".to_string(),
            is_deleted: true,
            ..RepairPart::default()
        };
        let anonymous = RepairPart::default();

        let item = keep.to_line_item().expect("mpn-only part is kept");
        assert_eq!(item.unit, DEFAULT_UNIT);
        assert_eq!(item.qty, 1.0);
        assert!(deleted.to_line_item().is_none());
        assert!(anonymous.to_line_item().is_none());
    }
}
