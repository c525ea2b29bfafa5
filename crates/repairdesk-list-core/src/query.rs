use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, FixedOffset, Offset, Utc};

use crate::profile::ModuleProfile;
use crate::record::{DateField, ListRecord, TextField, parse_finite};

/// Ascending sorts place rows without a date after every real date.
const MISSING_DATE_ASC: &str = "9999-12-31";

/// Single-choice chip filter shown above the list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum QuickFilter {
    #[default]
    All,
    Status(String),
    Overdue,
    OpenOnly,
}

impl QuickFilter {
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "" => Self::All,
            "OVERDUE" => Self::Overdue,
            "OPEN" => Self::OpenOnly,
            status => Self::Status(status.to_string()),
        }
    }

    /// Chip key as the toolbar reports it.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::All => "",
            Self::Status(status) => status,
            Self::Overdue => "OVERDUE",
            Self::OpenOnly => "OPEN",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateRangeFilter {
    pub field: DateField,
    pub from: String,
    pub to: String,
}

impl DateRangeFilter {
    #[must_use]
    pub fn new(field: DateField) -> Self {
        Self {
            field,
            from: String::new(),
            to: String::new(),
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        valid_bound(&self.from).is_some() || valid_bound(&self.to).is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AmountRange {
    pub min: String,
    pub max: String,
}

impl AmountRange {
    #[must_use]
    pub fn bounds(&self) -> (Option<f64>, Option<f64>) {
        (parse_finite(&self.min), parse_finite(&self.max))
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        let (min, max) = self.bounds();
        min.is_some() || max.is_some()
    }

    fn admits(&self, amount: f64) -> bool {
        let (min, max) = self.bounds();
        min.is_none_or(|min| amount >= min) && max.is_none_or(|max| amount <= max)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextFilter {
    pub field: TextField,
    pub needle: String,
}

impl TextFilter {
    #[must_use]
    pub fn new(field: TextField) -> Self {
        Self {
            field,
            needle: String::new(),
        }
    }

    fn admits<R: ListRecord>(&self, record: &R) -> bool {
        let needle = self.needle.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        record
            .text(self.field)
            .is_some_and(|value| value.to_lowercase().contains(&needle))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SortKey {
    #[default]
    UpdatedDesc,
    CreatedDesc,
    DateAsc(DateField),
    DateDesc(DateField),
    AmountDesc,
    TextDesc(TextField),
}

impl SortKey {
    /// Parses the select-box keys. Unknown keys yield `None`.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        match raw {
            "updatedAt_desc" => return Some(Self::UpdatedDesc),
            "createdAt_desc" => return Some(Self::CreatedDesc),
            "totalAmount_desc" => return Some(Self::AmountDesc),
            "quoteNo_desc" | "orderNo_desc" | "number_desc" => {
                return Some(Self::TextDesc(TextField::Number));
            }
            _ => {}
        }
        let (field, direction) = raw.rsplit_once('_')?;
        let field = DateField::parse(field)?;
        match direction {
            "asc" => Some(Self::DateAsc(field)),
            "desc" => Some(Self::DateDesc(field)),
            _ => None,
        }
    }

    #[must_use]
    pub fn key(self) -> String {
        match self {
            Self::UpdatedDesc => "updatedAt_desc".to_string(),
            Self::CreatedDesc => "createdAt_desc".to_string(),
            Self::DateAsc(field) => format!("{}_asc", field.as_str()),
            Self::DateDesc(field) => format!("{}_desc", field.as_str()),
            Self::AmountDesc => "totalAmount_desc".to_string(),
            Self::TextDesc(TextField::Number) => "number_desc".to_string(),
            Self::TextDesc(field) => format!("{}_desc", field.as_str()),
        }
    }

    /// Total order over rows. Ties resolve on `id` ascending.
    pub fn compare<R: ListRecord>(self, a: &R, b: &R) -> Ordering {
        let primary = match self {
            Self::UpdatedDesc => desc(a.date(DateField::Updated), b.date(DateField::Updated)),
            Self::CreatedDesc => desc(a.date(DateField::Created), b.date(DateField::Created)),
            Self::DateDesc(field) => desc(a.date(field), b.date(field)),
            Self::DateAsc(field) => a
                .date(field)
                .unwrap_or(MISSING_DATE_ASC)
                .cmp(b.date(field).unwrap_or(MISSING_DATE_ASC)),
            Self::AmountDesc => b.amount().total_cmp(&a.amount()),
            Self::TextDesc(field) => desc(a.text(field), b.text(field)),
        };
        primary.then_with(|| a.id().cmp(b.id()))
    }
}

/// Missing values compare as the empty string and land last.
fn desc(a: Option<&str>, b: Option<&str>) -> Ordering {
    b.unwrap_or("").cmp(a.unwrap_or(""))
}

/// Fingerprint of every active filter and sort parameter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct QuerySignature(String);

impl QuerySignature {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QuerySignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryCriteria {
    /// Forwarded to the data service's `search`.
    pub search_text: String,
    pub quick: QuickFilter,
    pub date_ranges: Vec<DateRangeFilter>,
    pub amount: AmountRange,
    pub text_filters: Vec<TextFilter>,
    pub sort: SortKey,
}

impl QueryCriteria {
    /// Criteria with one empty slot per filter the profile offers.
    #[must_use]
    pub fn for_profile(profile: &ModuleProfile) -> Self {
        Self {
            date_ranges: profile
                .date_range_fields
                .iter()
                .copied()
                .map(DateRangeFilter::new)
                .collect(),
            text_filters: profile
                .text_filter_fields
                .iter()
                .copied()
                .map(TextFilter::new)
                .collect(),
            ..Self::default()
        }
    }

    pub fn date_range_mut(&mut self, field: DateField) -> &mut DateRangeFilter {
        let position = match self.date_ranges.iter().position(|range| range.field == field) {
            Some(position) => position,
            None => {
                self.date_ranges.push(DateRangeFilter::new(field));
                self.date_ranges.len() - 1
            }
        };
        &mut self.date_ranges[position]
    }

    pub fn text_filter_mut(&mut self, field: TextField) -> &mut TextFilter {
        let position = match self.text_filters.iter().position(|filter| filter.field == field) {
            Some(position) => position,
            None => {
                self.text_filters.push(TextFilter::new(field));
                self.text_filters.len() - 1
            }
        };
        &mut self.text_filters[position]
    }

    /// Number of advanced filters that currently constrain the result.
    #[must_use]
    pub fn active_filter_count(&self) -> usize {
        let dates = self.date_ranges.iter().filter(|range| range.is_active()).count();
        let texts = self
            .text_filters
            .iter()
            .filter(|filter| !filter.needle.trim().is_empty())
            .count();
        dates + texts + usize::from(self.amount.is_active())
    }

    #[must_use]
    pub fn signature(&self) -> QuerySignature {
        let mut parts = vec![
            self.search_text.clone(),
            self.quick.key().to_string(),
            self.sort.key(),
        ];
        for range in &self.date_ranges {
            parts.push(format!("{}:{}~{}", range.field.as_str(), range.from, range.to));
        }
        parts.push(format!("{}~{}", self.amount.min, self.amount.max));
        for filter in &self.text_filters {
            parts.push(format!("{}:{}", filter.field.as_str(), filter.needle));
        }
        QuerySignature(parts.join("|"))
    }

    #[must_use]
    pub fn matches<R: ListRecord>(&self, record: &R, profile: &ModuleProfile, today: &str) -> bool {
        let quick = match &self.quick {
            QuickFilter::All => true,
            QuickFilter::Status(status) => record.status() == status.trim(),
            QuickFilter::Overdue => is_overdue(record, profile, today),
            QuickFilter::OpenOnly => profile.is_open(record.status()),
        };
        quick
            && self
                .date_ranges
                .iter()
                .all(|range| date_range_admits(range, record))
            && self.amount.admits(record.amount())
            && self.text_filters.iter().all(|filter| filter.admits(record))
    }
}

/// Filters then sorts `rows`. Pure and stable for identical inputs.
pub fn apply_query<'a, R: ListRecord>(
    rows: &'a [R],
    criteria: &QueryCriteria,
    profile: &ModuleProfile,
    today: &str,
) -> Vec<&'a R> {
    let mut selected: Vec<&R> = rows
        .iter()
        .filter(|record| criteria.matches(*record, profile, today))
        .collect();
    let sort = criteria.sort;
    selected.sort_by(|a, b| sort.compare(*a, *b));
    selected
}

#[must_use]
pub fn is_overdue<R: ListRecord>(record: &R, profile: &ModuleProfile, today: &str) -> bool {
    if profile.is_overdue_exempt(record.status()) {
        return false;
    }
    let Some(field) = profile.overdue_date else {
        return false;
    };
    record
        .date(field)
        .map(|raw| iso_ymd(raw).unwrap_or(raw))
        .is_some_and(|date| date < today)
}

fn date_range_admits<R: ListRecord>(range: &DateRangeFilter, record: &R) -> bool {
    let from = valid_bound(&range.from);
    let to = valid_bound(&range.to);
    if from.is_none() && to.is_none() {
        return true;
    }
    let Some(value) = row_date(record, range.field) else {
        return false;
    };
    from.is_none_or(|from| value >= from) && to.is_none_or(|to| value <= to)
}

fn row_date<R: ListRecord>(record: &R, field: DateField) -> Option<&str> {
    let value = record.date(field).and_then(iso_ymd);
    if field == DateField::Created {
        value.or_else(|| record.date(DateField::Updated).and_then(iso_ymd))
    } else {
        value
    }
}

/// `YYYY-MM-DD` prefix of an ISO-8601 value.
#[must_use]
pub fn iso_ymd(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    let prefix = trimmed.get(..10)?;
    is_ymd(prefix).then_some(prefix)
}

fn valid_bound(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    is_ymd(trimmed).then_some(trimmed)
}

fn is_ymd(value: &str) -> bool {
    let bytes = value.as_bytes();
    bytes.len() == 10
        && bytes.iter().enumerate().all(|(index, byte)| match index {
            4 | 7 => *byte == b'-',
            _ => byte.is_ascii_digit(),
        })
}

/// Calendar date at `now` in a fixed business offset east of UTC.
#[must_use]
pub fn business_today(now: DateTime<Utc>, offset_minutes: i32) -> String {
    let offset = offset_minutes
        .checked_mul(60)
        .and_then(FixedOffset::east_opt)
        .unwrap_or_else(|| Utc.fix());
    now.with_timezone(&offset).format("%Y-%m-%d").to_string()
}
