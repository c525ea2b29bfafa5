use crate::query::SortKey;
use crate::record::{DateField, TextField};

/// Per-module constants shared by the list pipeline and the summary strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModuleProfile {
    pub key: &'static str,
    pub statuses: &'static [&'static str],
    /// Statuses excluded by the "open only" quick filter.
    pub closed_statuses: &'static [&'static str],
    /// Statuses that never count as overdue.
    pub overdue_exempt_statuses: &'static [&'static str],
    pub overdue_date: Option<DateField>,
    pub date_range_fields: &'static [DateField],
    pub text_filter_fields: &'static [TextField],
    pub sort_keys: &'static [SortKey],
    /// Where the detail editor inserts a new line item.
    pub new_item_position: NewItemPosition,
    /// Upstream record a new row of this module is created from.
    pub create_source: CreateSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NewItemPosition {
    Front,
    Back,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateSource {
    /// Orders are created from an approved quote.
    Quote,
    /// Quotes are created from a repair ticket and its tracked parts.
    Repair,
}

impl CreateSource {
    #[must_use]
    pub fn missing_selection_message(self) -> &'static str {
        match self {
            Self::Quote => "請選擇報價",
            Self::Repair => "請選擇維修單",
        }
    }
}

pub const ORDER_STATUSES: [&str; 5] = ["建立", "已下單", "已到貨", "已結案", "已取消"];
pub const QUOTE_STATUSES: [&str; 4] = ["草稿", "已送出", "已核准", "已取消"];

pub const ORDERS: ModuleProfile = ModuleProfile {
    key: "orders",
    statuses: &ORDER_STATUSES,
    closed_statuses: &["已結案", "已取消"],
    overdue_exempt_statuses: &["已到貨", "已結案", "已取消"],
    overdue_date: Some(DateField::Expected),
    date_range_fields: &[DateField::Ordered, DateField::Expected],
    text_filter_fields: &[TextField::Supplier],
    sort_keys: &[
        SortKey::UpdatedDesc,
        SortKey::DateDesc(DateField::Ordered),
        SortKey::DateAsc(DateField::Expected),
        SortKey::AmountDesc,
    ],
    new_item_position: NewItemPosition::Back,
    create_source: CreateSource::Quote,
};

pub const QUOTES: ModuleProfile = ModuleProfile {
    key: "quotes",
    statuses: &QUOTE_STATUSES,
    closed_statuses: &["已核准", "已取消"],
    overdue_exempt_statuses: &[],
    overdue_date: None,
    date_range_fields: &[DateField::Created],
    text_filter_fields: &[],
    sort_keys: &[
        SortKey::UpdatedDesc,
        SortKey::CreatedDesc,
        SortKey::AmountDesc,
        SortKey::TextDesc(TextField::Number),
    ],
    new_item_position: NewItemPosition::Front,
    create_source: CreateSource::Repair,
};

impl ModuleProfile {
    #[must_use]
    pub fn from_key(raw: &str) -> Option<&'static ModuleProfile> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "orders" | "order" => Some(&ORDERS),
            "quotes" | "quote" => Some(&QUOTES),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_open(&self, status: &str) -> bool {
        !self.closed_statuses.contains(&status.trim())
    }

    #[must_use]
    pub fn is_overdue_exempt(&self, status: &str) -> bool {
        self.overdue_exempt_statuses.contains(&status.trim())
    }

    #[must_use]
    pub fn supports_sort(&self, key: SortKey) -> bool {
        self.sort_keys.contains(&key)
    }
}

/// Quote statuses that allow conversion into an order.
#[must_use]
pub fn is_approved_status(status: &str) -> bool {
    let trimmed = status.trim();
    let lowered = trimmed.to_ascii_lowercase();
    matches!(trimmed, "已核准" | "已簽核" | "簽核完成")
        || matches!(lowered.as_str(), "approved" | "approve")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_status_excludes_closed_states() {
        assert!(ORDERS.is_open("已下單"));
        assert!(ORDERS.is_open(" 已到貨 "));
        assert!(!ORDERS.is_open("已結案"));
        assert!(!QUOTES.is_open("已核准"));
        assert!(QUOTES.is_open("草稿"));
    }

    #[test]
    fn arrived_orders_are_exempt_from_overdue_but_still_open() {
        assert!(ORDERS.is_overdue_exempt("已到貨"));
        assert!(ORDERS.is_open("已到貨"));
        assert!(!ORDERS.is_overdue_exempt("已下單"));
    }

    #[test]
    fn approved_status_accepts_latin_aliases() {
        assert!(is_approved_status("已核准"));
        assert!(is_approved_status(" Approved "));
        assert!(is_approved_status("簽核完成"));
        assert!(!is_approved_status("已送出"));
    }

    #[test]
    fn profile_lookup_is_case_insensitive() {
        assert_eq!(ModuleProfile::from_key("Orders").map(|p| p.key), Some("orders"));
        assert_eq!(ModuleProfile::from_key("quote").map(|p| p.key), Some("quotes"));
        assert!(ModuleProfile::from_key("worklogs").is_none());
    }
}
