use crate::draft::{DraftStore, ItemField};
use crate::markup::format_money;
use crate::record::{DEFAULT_CURRENCY, DEFAULT_UNIT, LineItem, non_negative, parse_finite};

/// Raw values of one indexed row of item inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormRow {
    values: [Option<String>; 6],
}

impl FormRow {
    #[must_use]
    pub fn get(&self, field: ItemField) -> Option<&str> {
        self.values[slot(field)].as_deref()
    }

    pub fn set(&mut self, field: ItemField, value: impl Into<String>) {
        self.values[slot(field)] = Some(value.into());
    }

    #[must_use]
    pub fn with(mut self, field: ItemField, value: impl Into<String>) -> Self {
        self.set(field, value);
        self
    }
}

fn slot(field: ItemField) -> usize {
    match field {
        ItemField::Name => 0,
        ItemField::Mpn => 1,
        ItemField::Vendor => 2,
        ItemField::Unit => 3,
        ItemField::Qty => 4,
        ItemField::UnitPrice => 5,
    }
}

/// Typed read of a detail form: the item count input, each row, and the
/// currency input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormSnapshot {
    pub item_count: Option<String>,
    pub rows: Vec<FormRow>,
    pub currency: Option<String>,
}

impl FormSnapshot {
    #[must_use]
    pub fn currency(&self) -> &str {
        self.currency
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(DEFAULT_CURRENCY)
    }

    /// Count reported by the form, floored and clamped to `max_items`.
    #[must_use]
    pub fn bounded_count(&self, max_items: usize) -> Option<usize> {
        let count = parse_finite(self.item_count.as_deref()?)?;
        Some(clamp_count(count, max_items))
    }
}

fn clamp_count(count: f64, max_items: usize) -> usize {
    count.floor().clamp(0.0, max_items as f64) as usize
}

/// Reconciles the form into the draft for `id`, seeding it from `canonical`
/// first when needed. The draft ends with exactly the form's row count.
pub fn pull<'a>(
    store: &'a mut DraftStore,
    id: &str,
    canonical: &[LineItem],
    snapshot: &FormSnapshot,
) -> Option<&'a [LineItem]> {
    let max_items = store.max_items();
    let draft = store.ensure_mut(id, canonical)?;
    let count = snapshot.bounded_count(max_items).unwrap_or(draft.len());
    draft.resize_with(count, LineItem::blank);
    for (index, item) in draft.iter_mut().enumerate() {
        let Some(row) = snapshot.rows.get(index) else {
            continue;
        };
        merge_row(item, row);
    }
    Some(draft.as_slice())
}

fn merge_row(item: &mut LineItem, row: &FormRow) {
    item.name = row.get(ItemField::Name).unwrap_or_default().to_string();
    item.mpn = row.get(ItemField::Mpn).unwrap_or_default().to_string();
    item.vendor = row.get(ItemField::Vendor).unwrap_or_default().to_string();
    item.unit = row
        .get(ItemField::Unit)
        .filter(|unit| !unit.is_empty())
        .unwrap_or(DEFAULT_UNIT)
        .to_string();
    item.qty = merge_number(row.get(ItemField::Qty), item.qty);
    item.unit_price = merge_number(row.get(ItemField::UnitPrice), item.unit_price);
}

/// An empty input reads as zero; an unparsable one keeps `previous`.
fn merge_number(raw: Option<&str>, previous: f64) -> f64 {
    match raw {
        None => previous,
        Some(raw) if raw.trim().is_empty() => 0.0,
        Some(raw) => parse_finite(raw).unwrap_or(previous),
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Totals {
    pub lines: Vec<f64>,
    pub subtotal: f64,
}

#[must_use]
pub fn totals_for_items(items: &[LineItem]) -> Totals {
    let lines: Vec<f64> = items.iter().map(LineItem::line_total).collect();
    let subtotal = lines.iter().sum();
    Totals { lines, subtotal }
}

/// Totals straight from form inputs, without touching any draft.
#[must_use]
pub fn totals_for_form(snapshot: &FormSnapshot, max_items: usize) -> Totals {
    let count = snapshot.bounded_count(max_items).unwrap_or(0);
    let read = |row: Option<&FormRow>, field| {
        row.and_then(|row| row.get(field))
            .and_then(parse_finite)
            .map_or(0.0, non_negative)
    };
    let lines: Vec<f64> = (0..count)
        .map(|index| {
            let row = snapshot.rows.get(index);
            read(row, ItemField::Qty) * read(row, ItemField::UnitPrice)
        })
        .collect();
    let subtotal = lines.iter().sum();
    Totals { lines, subtotal }
}

/// Slots that show computed totals in a detail view.
pub trait TotalsDisplay {
    fn set_line_total(&mut self, index: usize, text: &str);
    fn set_grand_total(&mut self, text: &str);
    fn set_header_total(&mut self, text: &str);
}

/// Writes every total slot. Repeated calls produce identical text.
pub fn push_totals<D: TotalsDisplay + ?Sized>(totals: &Totals, currency: &str, display: &mut D) {
    for (index, line) in totals.lines.iter().enumerate() {
        display.set_line_total(index, &format_money(*line, currency));
    }
    let grand = format_money(totals.subtotal, currency);
    display.set_grand_total(&grand);
    display.set_header_total(&grand);
}
