use std::collections::HashMap;

use crate::record::LineItem;

pub const DEFAULT_MAX_DRAFT_ITEMS: usize = 200;

/// Editable column of a line item, keyed the way detail forms name inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemField {
    Name,
    Mpn,
    Vendor,
    Unit,
    Qty,
    UnitPrice,
}

impl ItemField {
    pub const ALL: [Self; 6] = [
        Self::Name,
        Self::Mpn,
        Self::Vendor,
        Self::Unit,
        Self::Qty,
        Self::UnitPrice,
    ];

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "name" => Some(Self::Name),
            "mpn" => Some(Self::Mpn),
            "vendor" => Some(Self::Vendor),
            "unit" => Some(Self::Unit),
            "qty" => Some(Self::Qty),
            "unitPrice" | "price" => Some(Self::UnitPrice),
            _ => None,
        }
    }

    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Mpn => "mpn",
            Self::Vendor => "vendor",
            Self::Unit => "unit",
            Self::Qty => "qty",
            Self::UnitPrice => "unitPrice",
        }
    }

    #[must_use]
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Qty | Self::UnitPrice)
    }
}

/// Per-entity line item buffers, independent of the service-held rows until
/// a commit accepts them.
#[derive(Debug, Clone)]
pub struct DraftStore {
    drafts: HashMap<String, Vec<LineItem>>,
    max_items: usize,
}

impl Default for DraftStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DRAFT_ITEMS)
    }
}

impl DraftStore {
    #[must_use]
    pub fn new(max_items: usize) -> Self {
        Self {
            drafts: HashMap::new(),
            max_items: max_items.max(1),
        }
    }

    #[must_use]
    pub fn max_items(&self) -> usize {
        self.max_items
    }

    /// Returns the existing draft, or seeds one from `canonical`.
    ///
    /// An existing draft is never reseeded, even when `canonical` differs.
    pub fn ensure(&mut self, id: &str, canonical: &[LineItem]) -> Option<&[LineItem]> {
        self.ensure_mut(id, canonical).map(|items| items.as_slice())
    }

    pub(crate) fn ensure_mut(
        &mut self,
        id: &str,
        canonical: &[LineItem],
    ) -> Option<&mut Vec<LineItem>> {
        let id = id.trim();
        if id.is_empty() {
            return None;
        }
        let max_items = self.max_items;
        Some(self.drafts.entry(id.to_string()).or_insert_with(|| {
            canonical
                .iter()
                .take(max_items)
                .map(LineItem::normalized_clone)
                .collect()
        }))
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&[LineItem]> {
        self.drafts.get(id.trim()).map(Vec::as_slice)
    }

    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut Vec<LineItem>> {
        self.drafts.get_mut(id.trim())
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.drafts.contains_key(id.trim())
    }

    /// Writes one field of an existing draft, growing it with placeholder
    /// rows when `index` is past the end. Returns whether a write happened.
    pub fn update_field(
        &mut self,
        id: &str,
        index: usize,
        field: ItemField,
        raw: Option<&str>,
    ) -> bool {
        let max_items = self.max_items;
        let Some(items) = self.get_mut(id) else {
            return false;
        };
        if index >= max_items {
            return false;
        }
        if index >= items.len() {
            items.resize_with(index + 1, LineItem::blank);
        }
        set_field(&mut items[index], field, raw);
        true
    }

    /// Appends a placeholder row and returns its index.
    pub fn add_item(&mut self, id: &str) -> Option<usize> {
        let max_items = self.max_items;
        let items = self.get_mut(id)?;
        if items.len() >= max_items {
            return None;
        }
        items.push(LineItem::blank());
        Some(items.len() - 1)
    }

    /// Inserts a placeholder row at `index`. Out-of-range indices are ignored.
    pub fn insert_item(&mut self, id: &str, index: usize) -> bool {
        let max_items = self.max_items;
        let Some(items) = self.get_mut(id) else {
            return false;
        };
        if index > items.len() || items.len() >= max_items {
            return false;
        }
        items.insert(index, LineItem::blank());
        true
    }

    pub fn remove_item(&mut self, id: &str, index: usize) -> bool {
        let Some(items) = self.get_mut(id) else {
            return false;
        };
        if index >= items.len() {
            return false;
        }
        items.remove(index);
        true
    }

    /// Swaps the whole draft, creating it when absent.
    pub fn replace(&mut self, id: &str, items: Vec<LineItem>) -> bool {
        let id = id.trim();
        if id.is_empty() {
            return false;
        }
        let mut items = items;
        items.truncate(self.max_items);
        self.drafts.insert(id.to_string(), items);
        true
    }

    pub fn discard(&mut self, id: &str) -> Option<Vec<LineItem>> {
        self.drafts.remove(id.trim())
    }

    /// Number of entities with an open draft.
    #[must_use]
    pub fn len(&self) -> usize {
        self.drafts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.drafts.is_empty()
    }
}

fn set_field(item: &mut LineItem, field: ItemField, raw: Option<&str>) {
    match field {
        ItemField::Name => item.name = raw.unwrap_or_default().to_string(),
        ItemField::Mpn => item.mpn = raw.unwrap_or_default().to_string(),
        ItemField::Vendor => item.vendor = raw.unwrap_or_default().to_string(),
        ItemField::Unit => item.unit = raw.unwrap_or_default().to_string(),
        ItemField::Qty => item.qty = coerce_number(raw),
        ItemField::UnitPrice => item.unit_price = coerce_number(raw),
    }
}

fn coerce_number(raw: Option<&str>) -> f64 {
    raw.and_then(crate::record::parse_finite).unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fan() -> LineItem {
        LineItem {
            name: "Fan".to_string(),
            qty: 2.0,
            unit_price: 150.0,
            ..LineItem::blank()
        }
    }

    #[test]
    fn ensure_never_reseeds_an_edited_draft() {
        let mut store = DraftStore::default();
        let canonical = vec![fan()];
        store.ensure("Q1", &canonical);
        assert!(store.update_field("Q1", 0, ItemField::Name, Some("Blower")));

        let again = store.ensure("Q1", &canonical).expect("draft").to_vec();
        assert_eq!(again[0].name, "Blower");
        assert_eq!(canonical[0].name, "Fan");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn update_field_grows_with_placeholders() {
        let mut store = DraftStore::default();
        store.ensure("O1", &[]);
        assert!(store.update_field("O1", 2, ItemField::Qty, Some(" 3 ")));

        let items = store.get("O1").expect("draft");
        assert_eq!(items.len(), 3);
        assert_eq!(items[0], LineItem::blank());
        assert_eq!(items[2].qty, 3.0);
    }

    #[test]
    fn numeric_fields_default_to_zero_and_text_to_empty() {
        let mut store = DraftStore::default();
        store.ensure("O1", &[fan()]);
        store.update_field("O1", 0, ItemField::UnitPrice, Some("abc"));
        store.update_field("O1", 0, ItemField::Qty, Some("inf"));
        store.update_field("O1", 0, ItemField::Vendor, None);

        let item = &store.get("O1").expect("draft")[0];
        assert_eq!(item.unit_price, 0.0);
        assert_eq!(item.qty, 0.0);
        assert_eq!(item.vendor, "");
    }

    #[test]
    fn add_then_remove_restores_the_length() {
        let mut store = DraftStore::default();
        store.ensure("Q1", &[fan()]);
        assert_eq!(store.add_item("Q1"), Some(1));
        assert!(store.remove_item("Q1", 0));
        assert_eq!(store.get("Q1").map(<[LineItem]>::len), Some(1));
        assert!(!store.remove_item("Q1", 5));
        assert!(!store.insert_item("Q1", 3));
    }

    #[test]
    fn blank_ids_and_missing_drafts_are_ignored() {
        let mut store = DraftStore::default();
        assert!(store.ensure("  ", &[fan()]).is_none());
        assert!(!store.update_field("O9", 0, ItemField::Name, Some("x")));
        assert_eq!(store.add_item("O9"), None);
        assert!(store.is_empty());
    }

    #[test]
    fn discard_allows_a_fresh_seed() {
        let mut store = DraftStore::default();
        store.ensure("O1", &[fan()]);
        store.update_field("O1", 0, ItemField::Name, Some("edited"));
        assert!(store.discard("O1").is_some());

        let reseeded = store.ensure("O1", &[fan()]).expect("draft");
        assert_eq!(reseeded[0].name, "Fan");
    }

    #[test]
    fn growth_stops_at_the_item_limit() {
        let mut store = DraftStore::new(2);
        store.ensure("O1", &[fan(), fan(), fan()]);
        assert_eq!(store.get("O1").map(<[LineItem]>::len), Some(2));
        assert_eq!(store.add_item("O1"), None);
        assert!(!store.update_field("O1", 5, ItemField::Name, Some("x")));
    }
}
