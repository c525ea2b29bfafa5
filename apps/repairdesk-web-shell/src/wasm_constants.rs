pub(crate) const CONFIG_GLOBAL: &str = "__REPAIRDESK_CONFIG__";
pub(crate) const SERVICE_LOCATOR: &str = "_svc";
pub(crate) const ORDER_SERVICE: &str = "OrderService";
pub(crate) const QUOTE_SERVICE: &str = "QuoteService";
pub(crate) const REPAIR_PARTS_SERVICE: &str = "RepairPartsService";
pub(crate) const REPAIR_SERVICE: &str = "RepairService";
pub(crate) const UI_GLOBAL: &str = "UI";

pub(crate) const FILTERS_OPEN_KEY: &str = "filtersOpen";
pub(crate) const RENDERING_CLASS: &str = "is-rendering";

/// Delay before focusing a freshly added item row.
pub(crate) const FOCUS_DELAY_MS: u32 = 30;
