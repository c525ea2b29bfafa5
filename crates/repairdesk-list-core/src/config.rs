use std::env;

use thiserror::Error;

use crate::draft::DEFAULT_MAX_DRAFT_ITEMS;
use crate::paging::DEFAULT_PAGE_SIZE;
use crate::render::{ChunkBudget, DeviceClass};
use crate::validation::ValidationPolicy;

const DEFAULT_BUSINESS_UTC_OFFSET_MINUTES: i32 = 8 * 60;
const DEFAULT_STORAGE_PREFIX: &str = "repairdesk";

#[derive(Debug, Clone, PartialEq)]
pub struct ListConfig {
    pub page_size: usize,
    pub mobile_budget: ChunkBudget,
    pub desktop_budget: ChunkBudget,
    pub mobile_breakpoint_px: f64,
    pub business_utc_offset_minutes: i32,
    pub max_draft_items: usize,
    pub storage_prefix: String,
    pub skip_blank_rows: bool,
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            mobile_budget: ChunkBudget::MOBILE,
            desktop_budget: ChunkBudget::DESKTOP,
            mobile_breakpoint_px: DeviceClass::DEFAULT_BREAKPOINT_PX,
            business_utc_offset_minutes: DEFAULT_BUSINESS_UTC_OFFSET_MINUTES,
            max_draft_items: DEFAULT_MAX_DRAFT_ITEMS,
            storage_prefix: DEFAULT_STORAGE_PREFIX.to_string(),
            skip_blank_rows: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid REPAIRDESK_PAGE_SIZE: {0}")]
    InvalidPageSize(String),
    #[error("invalid frame budget setting: {0}")]
    InvalidFrameBudget(String),
    #[error("invalid per-frame item cap: {0}")]
    InvalidMaxPerFrame(String),
    #[error("invalid REPAIRDESK_MOBILE_BREAKPOINT_PX: {0}")]
    InvalidBreakpoint(String),
    #[error("invalid REPAIRDESK_BUSINESS_UTC_OFFSET_MINUTES: {0}")]
    InvalidUtcOffset(String),
    #[error("invalid REPAIRDESK_MAX_DRAFT_ITEMS: {0}")]
    InvalidMaxDraftItems(String),
    #[error("invalid REPAIRDESK_STORAGE_PREFIX: {0}")]
    InvalidStoragePrefix(String),
    #[error("invalid REPAIRDESK_SKIP_BLANK_ROWS: {0}")]
    InvalidSkipBlankRows(String),
}

impl ListConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let page_size =
            parse_usize_lookup(&lookup, "REPAIRDESK_PAGE_SIZE", defaults.page_size, 1, 1_000)
                .map_err(ConfigError::InvalidPageSize)?;
        let mobile_budget = ChunkBudget {
            frame_budget_ms: parse_f64_lookup(
                &lookup,
                "REPAIRDESK_MOBILE_FRAME_BUDGET_MS",
                defaults.mobile_budget.frame_budget_ms,
                1.0,
                50.0,
            )
            .map_err(ConfigError::InvalidFrameBudget)?,
            max_items_per_frame: parse_usize_lookup(
                &lookup,
                "REPAIRDESK_MOBILE_MAX_PER_FRAME",
                defaults.mobile_budget.max_items_per_frame,
                1,
                200,
            )
            .map_err(ConfigError::InvalidMaxPerFrame)?,
        };
        let desktop_budget = ChunkBudget {
            frame_budget_ms: parse_f64_lookup(
                &lookup,
                "REPAIRDESK_DESKTOP_FRAME_BUDGET_MS",
                defaults.desktop_budget.frame_budget_ms,
                1.0,
                50.0,
            )
            .map_err(ConfigError::InvalidFrameBudget)?,
            max_items_per_frame: parse_usize_lookup(
                &lookup,
                "REPAIRDESK_DESKTOP_MAX_PER_FRAME",
                defaults.desktop_budget.max_items_per_frame,
                1,
                200,
            )
            .map_err(ConfigError::InvalidMaxPerFrame)?,
        };
        let mobile_breakpoint_px = parse_f64_lookup(
            &lookup,
            "REPAIRDESK_MOBILE_BREAKPOINT_PX",
            defaults.mobile_breakpoint_px,
            0.0,
            4_096.0,
        )
        .map_err(ConfigError::InvalidBreakpoint)?;
        let business_utc_offset_minutes = parse_with_lookup(
            &lookup,
            "REPAIRDESK_BUSINESS_UTC_OFFSET_MINUTES",
            defaults.business_utc_offset_minutes,
            |raw| {
                raw.trim()
                    .parse::<i32>()
                    .map_err(|error| ConfigError::InvalidUtcOffset(error.to_string()))
                    .map(|value| value.clamp(-14 * 60, 14 * 60))
            },
        )?;
        let max_draft_items = parse_usize_lookup(
            &lookup,
            "REPAIRDESK_MAX_DRAFT_ITEMS",
            defaults.max_draft_items,
            1,
            10_000,
        )
        .map_err(ConfigError::InvalidMaxDraftItems)?;
        let storage_prefix = parse_with_lookup(
            &lookup,
            "REPAIRDESK_STORAGE_PREFIX",
            defaults.storage_prefix,
            |raw| {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    return Err(ConfigError::InvalidStoragePrefix(
                        "prefix must not be empty".to_string(),
                    ));
                }
                Ok(trimmed.to_string())
            },
        )?;
        let skip_blank_rows = parse_with_lookup(
            &lookup,
            "REPAIRDESK_SKIP_BLANK_ROWS",
            defaults.skip_blank_rows,
            |raw| parse_bool(&raw).map_err(ConfigError::InvalidSkipBlankRows),
        )?;

        Ok(Self {
            page_size,
            mobile_budget,
            desktop_budget,
            mobile_breakpoint_px,
            business_utc_offset_minutes,
            max_draft_items,
            storage_prefix,
            skip_blank_rows,
        })
    }

    #[must_use]
    pub fn device_class(&self, viewport_width: f64) -> DeviceClass {
        DeviceClass::from_viewport_width(viewport_width, self.mobile_breakpoint_px)
    }

    #[must_use]
    pub fn budget_for(&self, device: DeviceClass) -> ChunkBudget {
        match device {
            DeviceClass::Mobile => self.mobile_budget,
            DeviceClass::Desktop => self.desktop_budget,
        }
    }

    #[must_use]
    pub fn validation_policy(&self) -> ValidationPolicy {
        ValidationPolicy {
            skip_blank_rows: self.skip_blank_rows,
        }
    }

    /// Namespaced preference key, e.g. `repairdesk:orders:filtersOpen`.
    #[must_use]
    pub fn storage_key(&self, module: &str, name: &str) -> String {
        format!("{}:{module}:{name}", self.storage_prefix)
    }
}

fn parse_usize_lookup(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: usize,
    min: usize,
    max: usize,
) -> Result<usize, String> {
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<usize>()
            .map_err(|error| format!("{key}: {error}"))
            .map(|value| value.clamp(min, max)),
        None => Ok(default),
    }
}

fn parse_f64_lookup(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: f64,
    min: f64,
    max: f64,
) -> Result<f64, String> {
    match lookup(key) {
        Some(raw) => match raw.trim().parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(value.clamp(min, max)),
            Ok(value) => Err(format!("{key}: {value} is not finite")),
            Err(error) => Err(format!("{key}: {error}")),
        },
        None => Ok(default),
    }
}

fn parse_with_lookup<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
    parser: impl FnOnce(String) -> Result<T, ConfigError>,
) -> Result<T, ConfigError> {
    match lookup(key) {
        Some(raw) => parser(raw),
        None => Ok(default),
    }
}

fn parse_bool(raw: &str) -> Result<bool, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(other.to_string()),
    }
}
