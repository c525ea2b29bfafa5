use thiserror::Error;

use crate::draft::ItemField;
use crate::record::{DEFAULT_UNIT, LineItem};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationPolicy {
    /// Drops untouched placeholder rows instead of rejecting them.
    pub skip_blank_rows: bool,
}

/// Business-rule failure for a single line item. `row` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ItemValidationError {
    #[error("第 {row} 列：請填寫零件名稱")]
    MissingName { row: usize },
    #[error("第 {row} 列：數量需為整數且至少 1")]
    InvalidQty { row: usize },
    #[error("第 {row} 列：單價需為 0 或正數")]
    NegativePrice { row: usize },
    #[error("請至少輸入一筆項目")]
    NoItems,
}

impl ItemValidationError {
    #[must_use]
    pub fn row(&self) -> Option<usize> {
        match self {
            Self::MissingName { row } | Self::InvalidQty { row } | Self::NegativePrice { row } => {
                Some(*row)
            }
            Self::NoItems => None,
        }
    }

    /// Zero-based index and field that should receive focus.
    #[must_use]
    pub fn focus(&self) -> Option<(usize, ItemField)> {
        let field = match self {
            Self::MissingName { .. } => ItemField::Name,
            Self::InvalidQty { .. } => ItemField::Qty,
            Self::NegativePrice { .. } => ItemField::UnitPrice,
            Self::NoItems => return None,
        };
        self.row().map(|row| (row.saturating_sub(1), field))
    }
}

/// Checks every row and returns the normalized items to persist, or every
/// failure found.
pub fn validate_items(
    items: &[LineItem],
    policy: &ValidationPolicy,
) -> Result<Vec<LineItem>, Vec<ItemValidationError>> {
    let mut accepted = Vec::with_capacity(items.len());
    let mut errors = Vec::new();

    for (index, item) in items.iter().enumerate() {
        if policy.skip_blank_rows && is_blank_row(item) {
            continue;
        }
        let row = index + 1;
        let before = errors.len();
        let name = item.name.trim();
        if name.is_empty() {
            errors.push(ItemValidationError::MissingName { row });
        }
        if !item.qty.is_finite() || item.qty < 1.0 || item.qty.fract() != 0.0 {
            errors.push(ItemValidationError::InvalidQty { row });
        }
        if !item.unit_price.is_finite() || item.unit_price < 0.0 {
            errors.push(ItemValidationError::NegativePrice { row });
        }
        if errors.len() == before {
            accepted.push(normalized(item));
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }
    if accepted.is_empty() {
        return Err(vec![ItemValidationError::NoItems]);
    }
    Ok(accepted)
}

fn is_blank_row(item: &LineItem) -> bool {
    let unit = item.unit.trim();
    item.name.trim().is_empty()
        && item.mpn.trim().is_empty()
        && item.vendor.trim().is_empty()
        && (unit.is_empty() || unit == DEFAULT_UNIT)
        && item.qty == 1.0
        && item.unit_price == 0.0
}

fn normalized(item: &LineItem) -> LineItem {
    let unit = item.unit.trim();
    LineItem {
        name: item.name.trim().to_string(),
        mpn: item.mpn.trim().to_string(),
        vendor: item.vendor.trim().to_string(),
        unit: if unit.is_empty() { DEFAULT_UNIT } else { unit }.to_string(),
        qty: item.qty,
        unit_price: item.unit_price,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str, qty: f64, unit_price: f64) -> LineItem {
        LineItem {
            name: name.to_string(),
            qty,
            unit_price,
            ..LineItem::blank()
        }
    }

    #[test]
    fn blank_name_fails_on_row_one() {
        let errors = validate_items(&[item("", 1.0, 0.0)], &ValidationPolicy::default())
            .expect_err("blank name");
        assert_eq!(errors, vec![ItemValidationError::MissingName { row: 1 }]);
        assert_eq!(errors[0].focus(), Some((0, ItemField::Name)));
        assert_eq!(errors[0].to_string(), "第 1 列：請填寫零件名稱");
    }

    #[test]
    fn every_failing_row_is_reported() {
        let items = [item("Fan", 1.5, 10.0), item("Belt", 2.0, 5.0), item("", 0.0, -1.0)];
        let errors = validate_items(&items, &ValidationPolicy::default()).expect_err("invalid");
        assert_eq!(
            errors,
            vec![
                ItemValidationError::InvalidQty { row: 1 },
                ItemValidationError::MissingName { row: 3 },
                ItemValidationError::InvalidQty { row: 3 },
                ItemValidationError::NegativePrice { row: 3 },
            ]
        );
    }

    #[test]
    fn accepted_items_are_trimmed() {
        let mut raw = item("  Fan ", 2.0, 0.0);
        raw.unit = " ".to_string();
        raw.vendor = " Acme ".to_string();
        let items = validate_items(&[raw], &ValidationPolicy::default()).expect("valid");
        assert_eq!(items[0].name, "Fan");
        assert_eq!(items[0].vendor, "Acme");
        assert_eq!(items[0].unit, DEFAULT_UNIT);
    }

    #[test]
    fn blank_rows_are_skipped_only_when_enabled() {
        let items = [item("Fan", 1.0, 10.0), LineItem::blank()];
        let skip = ValidationPolicy { skip_blank_rows: true };
        assert_eq!(validate_items(&items, &skip).map(|items| items.len()), Ok(1));
        assert!(validate_items(&items, &ValidationPolicy::default()).is_err());

        let errors = validate_items(&[LineItem::blank()], &skip).expect_err("nothing left");
        assert_eq!(errors, vec![ItemValidationError::NoItems]);
        assert_eq!(errors[0].focus(), None);
    }

    #[test]
    fn empty_list_is_rejected() {
        let errors = validate_items(&[], &ValidationPolicy::default()).expect_err("empty");
        assert_eq!(errors, vec![ItemValidationError::NoItems]);
    }
}
