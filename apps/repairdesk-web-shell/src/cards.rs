use repairdesk_list_core::markup::{escape_attr, escape_html, format_money};
use repairdesk_list_core::query::{is_overdue, iso_ymd};
use repairdesk_list_core::{
    DateField, HistoryEntry, LineItem, ListRecord, ListSummary, ModuleProfile, OrderRecord,
    PageWindow, QueryCriteria, QuickFilter, QuoteRecord, SortKey, SourceOption, TextField, Totals,
    is_approved_status,
};

/// Element ids and class names of one module's list view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DomIds {
    pub(crate) plural: &'static str,
    pub(crate) singular: &'static str,
}

pub(crate) const ORDER_IDS: DomIds = DomIds {
    plural: "orders",
    singular: "order",
};

pub(crate) const QUOTE_IDS: DomIds = DomIds {
    plural: "quotes",
    singular: "quote",
};

impl DomIds {
    pub(crate) fn subtitle(self) -> String {
        format!("{}-subtitle", self.plural)
    }

    pub(crate) fn summary(self) -> String {
        format!("{}-summary", self.plural)
    }

    pub(crate) fn filters(self) -> String {
        format!("{}-filters", self.plural)
    }

    pub(crate) fn list(self) -> String {
        format!("{}-list", self.plural)
    }

    pub(crate) fn modal(self) -> String {
        format!("{}-modal", self.plural)
    }

    pub(crate) fn modal_content(self) -> String {
        format!("{}-modal-content", self.plural)
    }

    pub(crate) fn cards_class(self) -> String {
        format!("{}-cards", self.plural)
    }

    pub(crate) fn filter_input(self, name: &str) -> String {
        format!("{}-filter-{name}", self.plural)
    }

    pub(crate) fn form(self, id: &str) -> String {
        format!("{}-detail-form-{id}", self.singular)
    }

    pub(crate) fn line_total(self, id: &str, index: usize) -> String {
        format!("{}LineTotal_{id}_{index}", self.singular)
    }

    pub(crate) fn grand_total(self, id: &str) -> String {
        format!("{}TotalAmount_{id}", self.singular)
    }

    pub(crate) fn header_total(self, id: &str) -> String {
        format!("{}HeaderTotal_{id}", self.singular)
    }

    pub(crate) fn create_select(self) -> String {
        format!("{}-create-source", self.plural)
    }

    pub(crate) fn history_box(self, id: &str) -> String {
        format!("{}_history_{id}", self.singular)
    }
}

/// Module-specific pieces of the card and detail templates.
pub(crate) trait CardTemplate: ListRecord {
    const IDS: DomIds;
    const MODULE_TITLE: &'static str;
    const SEARCH_PLACEHOLDER: &'static str;
    const DETAIL_TITLE: &'static str;
    const CREATE_BUTTON: &'static str;
    const CREATE_TITLE: &'static str;
    /// Label of the source picker in the create modal.
    const CREATE_SOURCE_LABEL: &'static str;
    const CREATE_HINT: &'static str;
    /// Whether the detail modal carries a version history panel.
    const HISTORY: bool = false;

    fn number(&self) -> &str;
    fn currency(&self) -> &str;
    fn subtitle_parts(&self) -> Vec<&str>;
    fn meta_items(&self) -> Vec<(&'static str, String)>;
    /// Extra card-foot buttons placed between open and delete.
    fn extra_actions(&self) -> String {
        String::new()
    }
    /// Header inputs of the detail form, excluding status and currency.
    fn header_inputs(&self) -> String;
    /// Buttons shown next to "add item" in the detail toolbar.
    fn item_toolbar_actions(&self) -> String {
        String::new()
    }
}

fn dash(value: &str) -> &str {
    if value.trim().is_empty() { "—" } else { value }
}

fn date_input(label: &str, name: &str, value: &str) -> String {
    format!(
        r#"<div class="form-group"><label class="form-label">{label}</label><input class="input" type="date" name="{name}" value="{value}" /></div>"#,
        value = escape_attr(value),
    )
}

impl CardTemplate for OrderRecord {
    const IDS: DomIds = ORDER_IDS;
    const MODULE_TITLE: &'static str = "訂單/採購追蹤";
    const SEARCH_PLACEHOLDER: &'static str = "搜尋：訂單號 / 客戶 / 供應商 / 狀態";
    const DETAIL_TITLE: &'static str = "訂單明細";
    const CREATE_BUTTON: &'static str = "從報價建立";
    const CREATE_TITLE: &'static str = "從報價建立訂單";
    const CREATE_SOURCE_LABEL: &'static str = "報價";
    const CREATE_HINT: &'static str = "將自動帶入報價項目並更新用料追蹤狀態（已下單）。";

    fn number(&self) -> &str {
        &self.order_no
    }

    fn currency(&self) -> &str {
        &self.currency
    }

    fn subtitle_parts(&self) -> Vec<&str> {
        [
            self.customer.as_str(),
            self.supplier.as_str(),
            self.repair_id.as_str(),
        ]
        .into_iter()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect()
    }

    fn meta_items(&self) -> Vec<(&'static str, String)> {
        vec![
            ("下單日", dash(&self.ordered_at).to_string()),
            ("預計到貨", dash(&self.expected_at).to_string()),
            ("收貨日", dash(&self.received_at).to_string()),
            ("項目數", self.items.len().to_string()),
        ]
    }

    fn header_inputs(&self) -> String {
        let supplier = format!(
            r#"<div class="form-group"><label class="form-label">供應商</label><input class="input" name="supplier" value="{}" /></div>"#,
            escape_attr(&self.supplier),
        );
        [
            supplier,
            date_input("下單日", "orderedAt", &self.ordered_at),
            date_input("預計到貨", "expectedAt", &self.expected_at),
            date_input("收貨日", "receivedAt", &self.received_at),
        ]
        .concat()
    }
}

impl CardTemplate for QuoteRecord {
    const IDS: DomIds = QUOTE_IDS;
    const MODULE_TITLE: &'static str = "報價管理";
    const SEARCH_PLACEHOLDER: &'static str = "搜尋：報價單號 / 客戶 / 狀態 / 零件";
    const DETAIL_TITLE: &'static str = "報價明細";
    const CREATE_BUTTON: &'static str = "從維修單建立";
    const CREATE_TITLE: &'static str = "從維修單建立報價";
    const CREATE_SOURCE_LABEL: &'static str = "維修單";
    const CREATE_HINT: &'static str = "將自動帶入該維修單的用料追蹤（repairParts）項目。";
    const HISTORY: bool = true;

    fn number(&self) -> &str {
        &self.quote_no
    }

    fn currency(&self) -> &str {
        &self.currency
    }

    fn subtitle_parts(&self) -> Vec<&str> {
        [self.customer.as_str(), self.repair_id.as_str()]
            .into_iter()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect()
    }

    fn meta_items(&self) -> Vec<(&'static str, String)> {
        let day = |raw: &str| dash(iso_ymd(raw).unwrap_or(raw)).to_string();
        vec![
            ("建立日", day(&self.created_at)),
            ("更新日", day(&self.updated_at)),
            ("項目數", self.items.len().to_string()),
            ("幣別", currency_or_default(&self.currency).to_string()),
        ]
    }

    fn extra_actions(&self) -> String {
        let id = escape_attr(&self.id);
        if is_approved_status(&self.status) {
            format!(r#"<button class="btn sm" data-action="convert" data-id="{id}">轉訂單</button>"#)
        } else {
            format!(
                r#"<button class="btn sm" data-action="convert" data-id="{id}" disabled title="需先將狀態改為已核准（簽核）才可轉訂單">轉訂單</button>"#
            )
        }
    }

    fn header_inputs(&self) -> String {
        String::new()
    }

    fn item_toolbar_actions(&self) -> String {
        if self.repair_id.trim().is_empty() {
            return String::new();
        }
        r#"<button class="btn sm" type="button" data-action="import-repair-parts">帶入用料追蹤</button>"#
            .to_string()
    }
}

fn currency_or_default(currency: &str) -> &str {
    let trimmed = currency.trim();
    if trimmed.is_empty() { "TWD" } else { trimmed }
}

/// Toolbar, summary, filter and list hosts plus the modal shell.
pub(crate) fn module_layout<R: CardTemplate>(search_draft: &str) -> String {
    let ids = R::IDS;
    format!(
        r#"<div class="{plural}-module">
  <div class="module-toolbar">
    <div class="module-toolbar-left"><div class="page-title"><h2>{title}</h2><span class="muted" id="{subtitle}">載入中...</span></div></div>
    <div class="module-toolbar-right">
      <div class="{plural}-search"><input class="input" type="text" data-input="search" placeholder="{placeholder}" value="{search}" /></div>
      <button class="btn primary" data-action="apply">🔍 搜尋</button>
      <button class="btn" data-action="clear">🧹 清除</button>
      <button class="btn primary" data-action="open-create">{create}</button>
    </div>
  </div>
  <div class="{plural}-summary" id="{summary}"></div>
  <div class="{plural}-filters" id="{filters}"></div>
  <div class="{plural}-list" id="{list}"><div class="muted" style="padding:16px;">載入中...</div></div>
</div>
<div id="{modal}" class="modal" style="display:none;">
  <div class="modal-backdrop" data-action="close"></div>
  <div class="modal-host" id="{modal_content}"></div>
</div>"#,
        plural = ids.plural,
        title = R::MODULE_TITLE,
        create = R::CREATE_BUTTON,
        subtitle = ids.subtitle(),
        placeholder = escape_attr(R::SEARCH_PLACEHOLDER),
        search = escape_attr(search_draft),
        summary = ids.summary(),
        filters = ids.filters(),
        list = ids.list(),
        modal = ids.modal(),
        modal_content = ids.modal_content(),
    )
}

pub(crate) fn subtitle_text(total: usize) -> String {
    format!("共 {total} 筆")
}

fn stat_card(key: &str, value: usize, label: &str, accent: Option<&str>) -> String {
    let style = accent.map_or_else(String::new, |accent| format!(r#" style="--accent:{accent};""#));
    format!(
        r#"<div class="stat-card clickable"{style} data-action="quick" data-key="{key}"><div class="stat-value">{value}</div><div class="stat-label">{label}</div></div>"#,
        key = escape_attr(key),
        label = escape_html(label),
    )
}

/// Stat cards over the unfiltered rows. Terminal statuses other than the
/// first closed one are left to the chips.
pub(crate) fn summary_strip(profile: &ModuleProfile, summary: &ListSummary) -> String {
    let mut cards = vec![
        stat_card("", summary.total, "全部", None),
        stat_card("OPEN", summary.open, "待處理", Some("#7c3aed")),
    ];
    for (status, count) in &summary.by_status {
        if profile.is_open(status) || profile.closed_statuses.first() == Some(status) {
            cards.push(stat_card(status, *count, status, Some(status_accent(status))));
        }
    }
    if profile.overdue_date.is_some() {
        cards.push(stat_card("OVERDUE", summary.overdue, "逾期", Some("#b45309")));
    }
    format!(
        r#"<div class="stats-grid {}-stats">{}</div>"#,
        profile.key,
        cards.concat()
    )
}

pub(crate) fn status_accent(status: &str) -> &'static str {
    match status.trim() {
        "已下單" | "已送出" => "#0ea5e9",
        "已到貨" => "#d97706",
        "已結案" | "已核准" => "#16a34a",
        "已取消" => "#64748b",
        _ => "#94a3b8",
    }
}

fn badge_class(status: &str) -> &'static str {
    match status.trim() {
        "已結案" | "已核准" => "badge-success",
        "已取消" => "badge-muted",
        "已到貨" => "badge-warning",
        "已下單" | "已送出" => "badge-info",
        _ => "",
    }
}

pub(crate) fn sort_label(key: SortKey) -> &'static str {
    match key {
        SortKey::UpdatedDesc => "最近更新",
        SortKey::CreatedDesc => "建立日（新→舊）",
        SortKey::DateDesc(DateField::Ordered) => "下單日（新→舊）",
        SortKey::DateAsc(DateField::Expected) => "預計到貨（近→遠）",
        SortKey::DateAsc(_) => "日期（舊→新）",
        SortKey::DateDesc(_) => "日期（新→舊）",
        SortKey::AmountDesc => "金額（高→低）",
        SortKey::TextDesc(_) => "單號（新→舊）",
    }
}

fn date_range_label(field: DateField) -> &'static str {
    match field {
        DateField::Ordered => "下單日期範圍",
        DateField::Expected => "預計到貨範圍",
        DateField::Received => "收貨日期範圍",
        DateField::Created => "建立日期範圍",
        DateField::Updated => "更新日期範圍",
    }
}

fn text_filter_label(field: TextField) -> &'static str {
    match field {
        TextField::Supplier => "供應商",
        TextField::Customer => "客戶",
        TextField::Number => "單號",
        TextField::Status => "狀態",
        TextField::Note => "備註",
    }
}

/// Date-range input id segment, e.g. `ordered-from`.
pub(crate) fn date_input_name(field: DateField, bound: &str) -> String {
    let stem = field.as_str().trim_end_matches("At");
    format!("{stem}-{bound}")
}

fn chip(key: &str, label: &str, active: bool, color: Option<&str>) -> String {
    let class = if active { "chip active" } else { "chip" };
    let style = color.map_or_else(String::new, |color| {
        format!(r#" style="--chip-color:{}""#, escape_attr(color))
    });
    format!(
        r#"<button class="{class}"{style} data-action="quick" data-key="{key}">{label}</button>"#,
        key = escape_attr(key),
        label = escape_html(label),
    )
}

/// Chips, actions and the collapsible advanced panel, rendered from the
/// applied quick filter and the pending criteria.
pub(crate) fn filter_panel(
    profile: &ModuleProfile,
    ids: DomIds,
    applied: &QueryCriteria,
    pending: &QueryCriteria,
    open: bool,
) -> String {
    let mut chips = vec![chip("", "全部", applied.quick == QuickFilter::All, None)];
    for status in profile.statuses {
        let active = applied.quick == QuickFilter::Status((*status).to_string());
        chips.push(chip(status, status, active, Some(status_accent(status))));
    }
    chips.push(chip(
        "OPEN",
        "待處理",
        applied.quick == QuickFilter::OpenOnly,
        Some("#7c3aed"),
    ));
    if profile.overdue_date.is_some() {
        chips.push(chip(
            "OVERDUE",
            "逾期",
            applied.quick == QuickFilter::Overdue,
            Some("#b45309"),
        ));
    }

    let pending_status = match &pending.quick {
        QuickFilter::Status(status) => status.as_str(),
        _ => "",
    };
    let mut status_options = vec![format!(
        r#"<option value=""{}>全部</option>"#,
        if pending_status.is_empty() { " selected" } else { "" }
    )];
    for status in profile.statuses {
        status_options.push(format!(
            r#"<option value="{value}"{selected}>{label}</option>"#,
            value = escape_attr(status),
            selected = if pending_status == *status { " selected" } else { "" },
            label = escape_html(status),
        ));
    }

    let sort_options: String = profile
        .sort_keys
        .iter()
        .map(|key| {
            format!(
                r#"<option value="{value}"{selected}>{label}</option>"#,
                value = escape_attr(&key.key()),
                selected = if pending.sort == *key { " selected" } else { "" },
                label = sort_label(*key),
            )
        })
        .collect();

    let date_rows: String = pending
        .date_ranges
        .iter()
        .map(|range| {
            format!(
                r#"<div class="filter-group" style="min-width:260px;"><label class="form-label">{label}</label><div class="date-range-row"><input type="date" class="input" id="{from_id}" data-input="filter" value="{from}" /><span class="date-range-sep">至</span><input type="date" class="input" id="{to_id}" data-input="filter" value="{to}" /></div></div>"#,
                label = date_range_label(range.field),
                from_id = ids.filter_input(&date_input_name(range.field, "from")),
                to_id = ids.filter_input(&date_input_name(range.field, "to")),
                from = escape_attr(&range.from),
                to = escape_attr(&range.to),
            )
        })
        .collect();

    let text_rows: String = pending
        .text_filters
        .iter()
        .map(|filter| {
            format!(
                r#"<div class="filter-group" style="min-width:220px;"><label class="form-label">{label}</label><input type="text" class="input" id="{id}" data-input="filter" placeholder="包含關鍵字" value="{value}" /></div>"#,
                label = text_filter_label(filter.field),
                id = ids.filter_input(filter.field.as_str()),
                value = escape_attr(&filter.needle),
            )
        })
        .collect();

    format!(
        r#"<div class="{plural}-filters-inner">
  <div class="{plural}-filters-top">
    <div class="chip-row" aria-label="快速篩選">{chips}</div>
    <div class="{plural}-filters-actions" aria-label="篩選操作">
      <button class="btn sm" data-action="toggle-filters">{toggle} 篩選</button>
      <button class="btn sm primary" data-action="apply">🔍 搜尋</button>
      <button class="btn sm ghost" data-action="clear" title="清除所有條件">清除</button>
    </div>
  </div>
  <div class="panel compact {plural}-advanced-filters" style="display:{display}">
    <div class="filter-row">
      <div class="filter-group"><label class="form-label">狀態（詳細）</label><select class="input" id="{status_id}" data-input="status">{status_options}</select></div>
      <div class="filter-group"><label class="form-label">排序</label><select class="input" id="{sort_id}" data-input="sort">{sort_options}</select></div>
    </div>
    <div class="filter-row">{date_rows}</div>
    <div class="filter-row">
      <div class="filter-group" style="min-width:260px;"><label class="form-label">金額範圍</label><div class="date-range-row"><input type="number" inputmode="numeric" class="input" id="{min_id}" data-input="filter" placeholder="最低" value="{min}" /><span class="date-range-sep">~</span><input type="number" inputmode="numeric" class="input" id="{max_id}" data-input="filter" placeholder="最高" value="{max}" /></div></div>
      {text_rows}
    </div>
  </div>
</div>"#,
        plural = ids.plural,
        chips = chips.concat(),
        toggle = if open { "收合" } else { "展開" },
        display = if open { "block" } else { "none" },
        status_id = ids.filter_input("status"),
        status_options = status_options.concat(),
        sort_id = ids.filter_input("sort"),
        min_id = ids.filter_input("amount-min"),
        max_id = ids.filter_input("amount-max"),
        min = escape_attr(&pending.amount.min),
        max = escape_attr(&pending.amount.max),
    )
}

pub(crate) fn empty_state() -> &'static str {
    r#"<div class="empty-state">目前沒有資料</div>"#
}

pub(crate) fn loading_cards(ids: DomIds, count: usize) -> String {
    let card = format!(
        r#"<div class="card accent-left {singular}-card placeholder" style="--module-accent: rgba(148,163,184,.9); --module-accent-soft: rgba(148,163,184,.14); --accent-opacity:.55;"><div class="card-head"><div style="flex:1;min-width:0;"><div class="ph ph-line w-50"></div><div class="ph ph-line w-90" style="margin-top:10px;"></div></div><div class="card-head-right"><div class="ph ph-badge"></div><div class="ph ph-badge" style="margin-left:8px;"></div></div></div><div class="card-body"><div class="ph ph-line w-80"></div><div class="ph ph-line w-70" style="margin-top:10px;"></div></div><div class="card-foot"><button class="btn sm primary" disabled>開啟明細</button><button class="btn sm danger" disabled>刪除</button></div></div>"#,
        singular = ids.singular,
    );
    card.repeat(count)
}

/// List host body: the loading cards container and the paging footer.
pub(crate) fn list_frame(ids: DomIds, window: PageWindow, placeholders: usize) -> String {
    let more = if window.has_more {
        r#"<button class="btn" data-action="load-more">顯示更多</button>"#
    } else {
        r#"<span class="muted">已顯示全部</span>"#
    };
    format!(
        r#"<div class="card-list {cards} is-rendering">{loading}</div><div class="{plural}-list-footer"><div class="muted">已顯示 <span class="mono">{visible}</span> / <span class="mono">{total}</span></div><div class="{plural}-list-footer-actions">{more}</div></div>"#,
        cards = ids.cards_class(),
        loading = loading_cards(ids, placeholders),
        plural = ids.plural,
        visible = window.visible,
        total = window.total,
    )
}

pub(crate) fn card<R: CardTemplate>(record: &R, profile: &ModuleProfile, today: &str) -> String {
    let ids = R::IDS;
    let id = escape_attr(record.id());
    let overdue = is_overdue(record, profile, today);
    let currency = currency_or_default(record.currency());
    let sub = record
        .subtitle_parts()
        .iter()
        .map(|part| escape_html(part))
        .collect::<Vec<_>>()
        .join(" · ");
    let meta: String = record
        .meta_items()
        .iter()
        .map(|(label, value)| {
            format!(
                r#"<div class="meta-item"><div class="meta-k">{label}</div><div class="meta-v mono">{}</div></div>"#,
                escape_html(value)
            )
        })
        .collect();
    let number = if record.number().trim().is_empty() {
        "(未編號)".to_string()
    } else {
        escape_html(record.number())
    };
    format!(
        r#"<div class="card accent-left {singular}-card" style="--module-accent:{accent};--accent-opacity:{opacity};"><div class="card-head"><div class="{singular}-card-head-left"><div class="card-title">{number}</div><div class="muted {singular}-card-sub">{sub}</div></div><div class="card-head-right"><span class="badge {badge}">{status}</span>{overdue}<span class="badge">{amount}</span></div></div><div class="card-body"><div class="meta-grid">{meta}</div></div><div class="card-foot"><button class="btn sm primary" data-action="open-detail" data-id="{id}">開啟明細</button>{extra}<button class="btn sm danger" data-action="delete" data-id="{id}">刪除</button></div></div>"#,
        singular = ids.singular,
        accent = status_accent(record.status()),
        opacity = if overdue { ".95" } else { ".70" },
        badge = badge_class(record.status()),
        status = escape_html(record.status()),
        overdue = if overdue {
            r#"<span class="badge badge-warning">逾期</span>"#
        } else {
            ""
        },
        amount = escape_html(&format_money(record.amount(), currency)),
        extra = record.extra_actions(),
    )
}

fn item_row(
    ids: DomIds,
    id: &str,
    index: usize,
    item: &LineItem,
    line: f64,
    currency: &str,
) -> String {
    let text = |field: &str, value: &str, placeholder: &str| {
        format!(
            r#"<td><input class="input {singular}-text-input" name="{field}_{index}" value="{value}" placeholder="{placeholder}" data-input="item" data-index="{index}" data-field="{field}" /></td>"#,
            singular = ids.singular,
            value = escape_attr(value),
        )
    };
    let number = |field: &str, value: f64| {
        format!(
            r#"<td class="right"><input class="input {singular}-num-input" name="{field}_{index}" value="{value}" type="number" step="1" min="0" inputmode="numeric" data-input="item" data-index="{index}" data-field="{field}" /></td>"#,
            singular = ids.singular,
        )
    };
    let unit = if item.unit.trim().is_empty() { "pcs" } else { item.unit.as_str() };
    [
        "<tr>".to_string(),
        text("name", &item.name, "零件名稱 / 描述"),
        text("mpn", &item.mpn, "MPN / P/N"),
        text("vendor", &item.vendor, "Vendor / 品牌"),
        text("unit", unit, "pcs"),
        number("qty", item.qty),
        number("unitPrice", item.unit_price),
        format!(
            r#"<td class="right"><span class="mono" id="{line_id}">{line}</span></td>"#,
            line_id = escape_attr(&ids.line_total(id, index)),
            line = escape_html(&format_money(line, currency)),
        ),
        format!(
            r#"<td class="center op-col"><button class="btn ghost sm {singular}-remove-btn" type="button" data-action="remove-item" data-index="{index}" title="移除">✕</button></td>"#,
            singular = ids.singular,
        ),
        "</tr>".to_string(),
    ]
    .concat()
}

/// Detail modal for `record` editing `draft`. Totals come from the draft.
pub(crate) fn detail_modal<R: CardTemplate>(
    record: &R,
    profile: &ModuleProfile,
    draft: &[LineItem],
    totals: &Totals,
) -> String {
    let ids = R::IDS;
    let raw_id = record.id();
    let id = escape_attr(raw_id);
    let currency = currency_or_default(record.currency());
    let grand = escape_html(&format_money(totals.subtotal, currency));
    let title = if record.number().trim().is_empty() {
        R::DETAIL_TITLE.to_string()
    } else {
        escape_html(record.number())
    };
    let meta = record.subtitle_parts().join(" · ");
    let meta = if meta.is_empty() {
        String::new()
    } else {
        format!(r#"<div class="muted {}-detail-sub">{}</div>"#, ids.plural, escape_html(&meta))
    };
    let status_options: String = profile
        .statuses
        .iter()
        .map(|status| {
            format!(
                r#"<option value="{value}"{selected}>{label}</option>"#,
                value = escape_attr(status),
                selected = if record.status() == *status { " selected" } else { "" },
                label = escape_html(status),
            )
        })
        .collect();
    let rows: String = if draft.is_empty() {
        r#"<tr><td colspan="8"><div class="order-empty-inline"><span>目前沒有項目</span><button class="btn sm primary" type="button" data-action="add-item">＋ 新增零件</button></div></td></tr>"#
            .to_string()
    } else {
        draft
            .iter()
            .enumerate()
            .map(|(index, item)| {
                let line = totals.lines.get(index).copied().unwrap_or_default();
                item_row(ids, raw_id, index, item, line, currency)
            })
            .collect()
    };
    let note = record.text(TextField::Note).unwrap_or_default();
    let history = if R::HISTORY {
        format!(
            r#"<div class="form-section">
      <div class="{singular}-history-toolbar"><h4 class="form-section-title">版本歷史</h4><button class="btn sm" type="button" data-action="reload-history" data-id="{id}">重新整理</button></div>
      <div id="{history_box}" class="{singular}-history-box"><div class="muted">載入中...</div></div>
    </div>"#,
            singular = ids.singular,
            history_box = escape_attr(&ids.history_box(raw_id)),
        )
    } else {
        String::new()
    };

    format!(
        r#"<div class="modal-dialog modal-xlarge {singular}-detail-modal">
  <div class="modal-header">
    <div class="detail-header-left"><div class="{plural}-detail-title"><h3>{title}</h3>{meta}</div></div>
    <div class="detail-header-right">
      <span class="badge {badge}">{status}</span>
      <span class="badge" id="{header_total}">{grand}</span>
      <button class="modal-close" type="button" data-action="close">✕</button>
    </div>
  </div>
  <form class="modal-body" id="{form_id}">
    <input type="hidden" name="id" value="{id}" />
    <div class="form-section">
      <h4 class="form-section-title">狀態</h4>
      <div class="form-grid">
        <div class="form-group"><label class="form-label">狀態</label><select class="input" name="status">{status_options}</select></div>
        <div class="form-group"><label class="form-label">幣別</label><input class="input" name="currency" value="{currency}" data-input="currency" /></div>
        {header_inputs}
      </div>
    </div>
    <div class="form-section">
      <div class="{singular}-items-head">
        <h4 class="form-section-title">項目</h4>
        <div class="{singular}-items-toolbar">
          <div class="{singular}-items-toolbar-left"><button class="btn sm" type="button" data-action="add-item">＋ 新增零件</button>{toolbar}</div>
          <div class="muted">共 <span class="mono">{count}</span> 筆</div>
        </div>
      </div>
      <input type="hidden" name="itemsCount" value="{count}" />
      <div class="table-wrap {singular}-items-wrap">
        <table class="table zebra {singular}-items-table">
          <thead><tr><th>名稱</th><th>MPN</th><th>Vendor</th><th>單位</th><th class="right">數量</th><th class="right">單價</th><th class="right">小計</th><th class="center op-col"></th></tr></thead>
          <tbody>{rows}</tbody>
        </table>
      </div>
      <div class="{singular}-total-row"><span class="muted">小計</span><span class="{singular}-total-amount" id="{grand_total}">{grand}</span></div>
    </div>
    <div class="form-section">
      <h4 class="form-section-title">備註</h4>
      <textarea class="textarea" name="note" rows="3">{note}</textarea>
    </div>
    {history}
    <div class="modal-footer sticky">
      <button class="btn" type="button" data-action="close">關閉</button>
      <button class="btn primary" type="button" data-action="save">儲存</button>
    </div>
  </form>
</div>"#,
        singular = ids.singular,
        plural = ids.plural,
        badge = badge_class(record.status()),
        status = escape_html(record.status()),
        header_total = escape_attr(&ids.header_total(raw_id)),
        form_id = escape_attr(&ids.form(raw_id)),
        currency = escape_attr(currency),
        header_inputs = record.header_inputs(),
        toolbar = record.item_toolbar_actions(),
        count = draft.len(),
        grand_total = escape_attr(&ids.grand_total(raw_id)),
        note = escape_html(note),
    )
}

/// Modal picking the upstream record a new `R` is created from.
pub(crate) fn create_modal<R: CardTemplate>(options: &[SourceOption]) -> String {
    let ids = R::IDS;
    let choices: String = options
        .iter()
        .map(|option| {
            format!(
                r#"<option value="{id}">{label}</option>"#,
                id = escape_attr(&option.id),
                label = escape_html(&option.label),
            )
        })
        .collect();
    let empty = if options.is_empty() {
        format!(r#"<p class="muted">目前沒有可用的{}</p>"#, R::CREATE_SOURCE_LABEL)
    } else {
        String::new()
    };
    format!(
        r#"<div class="modal-dialog">
  <div class="modal-header"><h3>{title}</h3><button class="modal-close" type="button" data-action="close">✕</button></div>
  <div class="modal-body">
    <div class="form-section">
      <h4 class="form-section-title">選擇{label}</h4>
      <div class="form-group"><label class="form-label required">{label}</label><select class="input" id="{select}"><option value="">請選擇</option>{choices}</select></div>
      {empty}<p class="muted" style="margin:10px 0 0;">{hint}</p>
    </div>
    <div class="modal-footer" style="padding:0;border:0;">
      <button class="btn" type="button" data-action="close">取消</button>
      <button class="btn primary" type="button" data-action="create-submit">建立</button>
    </div>
  </div>
</div>"#,
        title = R::CREATE_TITLE,
        label = R::CREATE_SOURCE_LABEL,
        select = ids.create_select(),
        hint = R::CREATE_HINT,
    )
}

pub(crate) fn history_notice(text: &str) -> String {
    format!(r#"<div class="muted">{}</div>"#, escape_html(text))
}

/// Version history list. Entries are shown in the given order.
pub(crate) fn history_panel(entries: &[HistoryEntry]) -> String {
    if entries.is_empty() {
        return history_notice("尚無歷史紀錄");
    }
    let items: String = entries
        .iter()
        .map(|entry| {
            let summary = if entry.summary.trim().is_empty() {
                String::new()
            } else {
                format!(r#"<div class="quote-history-summary">{}</div>"#, escape_html(&entry.summary))
            };
            let changed = entry.changed_text();
            let changed = if changed.is_empty() {
                String::new()
            } else {
                format!(r#"<div class="muted quote-history-changed">{}</div>"#, escape_html(&changed))
            };
            let snapshot = entry
                .snapshot_text()
                .map(|text| {
                    format!(
                        r#"<details class="quote-history-details"><summary>查看快照</summary><pre class="quote-history-pre">{}</pre></details>"#,
                        escape_html(&text)
                    )
                })
                .unwrap_or_default();
            format!(
                r#"<div class="quote-history-item"><div class="quote-history-row"><div class="quote-history-meta"><span class="badge">{version}</span><span class="mono muted">{at}</span><span class="muted">{by}</span></div><div class="quote-history-action"><span class="badge">{action}</span></div></div>{summary}{changed}{snapshot}</div>"#,
                version = escape_html(&entry.version_label()),
                at = escape_html(&entry.at.replacen('T', " ", 1)),
                by = escape_html(entry.author()),
                action = escape_html(&entry.action),
            )
        })
        .collect();
    format!(r#"<div class="quote-history-list">{items}</div>"#)
}

#[cfg(test)]
mod tests {
    use repairdesk_list_core::sync::totals_for_items;
    use repairdesk_list_core::{ORDERS, QUOTES};

    use super::*;

    fn order() -> OrderRecord {
        OrderRecord {
            id: "o-1".to_string(),
            order_no: "PO-<1>".to_string(),
            status: "已下單".to_string(),
            customer: "Acme".to_string(),
            supplier: "Globex".to_string(),
            expected_at: "2020-01-01".to_string(),
            total_amount: 1250.5,
            items: vec![LineItem {
                name: "Fan \"XL\"".to_string(),
                qty: 2.0,
                unit_price: 625.25,
                ..LineItem::blank()
            }],
            ..OrderRecord::default()
        }
    }

    #[test]
    fn order_card_escapes_and_flags_overdue() {
        let html = card(&order(), &ORDERS, "2025-01-01");
        assert!(html.contains("PO-&lt;1&gt;"));
        assert!(html.contains("Acme · Globex"));
        assert!(html.contains("badge-warning"));
        assert!(html.contains("$ 1250.5 TWD"));
        assert!(html.contains(r#"data-action="open-detail" data-id="o-1""#));
        assert!(!html.contains("轉訂單"));
    }

    #[test]
    fn untitled_quote_card_offers_conversion_only_when_approved() {
        let mut quote = QuoteRecord {
            id: "q-1".to_string(),
            status: "草稿".to_string(),
            created_at: "2024-03-02T10:00:00Z".to_string(),
            ..QuoteRecord::default()
        };
        let draft_card = card(&quote, &QUOTES, "2025-01-01");
        assert!(draft_card.contains("(未編號)"));
        assert!(draft_card.contains("2024-03-02"));
        assert!(draft_card.contains("disabled title="));

        quote.status = "已核准".to_string();
        let approved = card(&quote, &QUOTES, "2025-01-01");
        assert!(approved.contains(r#"data-action="convert" data-id="q-1">"#));
        assert!(!approved.contains("badge-warning"));
    }

    #[test]
    fn list_frame_reports_the_window() {
        let html = list_frame(
            ORDER_IDS,
            PageWindow {
                visible: 60,
                total: 130,
                has_more: true,
            },
            6,
        );
        assert_eq!(html.matches("placeholder").count(), 6);
        assert!(html.contains("orders-cards is-rendering"));
        assert!(html.contains(r#"<span class="mono">60</span> / <span class="mono">130</span>"#));
        assert!(html.contains("load-more"));

        let done = list_frame(
            ORDER_IDS,
            PageWindow {
                visible: 5,
                total: 5,
                has_more: false,
            },
            8,
        );
        assert!(done.contains("已顯示全部"));
    }

    #[test]
    fn summary_strip_links_quick_filters() {
        let summary = ListSummary::collect(&[order()], &ORDERS, "2025-01-01");
        let html = summary_strip(&ORDERS, &summary);
        assert!(html.contains(r#"data-key="OVERDUE""#));
        assert!(html.contains(r#"data-key="已結案""#));
        assert!(!html.contains(r#"data-key="已取消""#));

        let empty = ListSummary::collect::<QuoteRecord>(&[], &QUOTES, "2025-01-01");
        let quotes = summary_strip(&QUOTES, &empty);
        assert!(!quotes.contains("OVERDUE"));
    }

    #[test]
    fn filter_panel_marks_the_active_chip_and_pending_sort() {
        let mut applied = QueryCriteria::for_profile(&ORDERS);
        applied.quick = QuickFilter::Overdue;
        let mut pending = applied.clone();
        pending.sort = SortKey::AmountDesc;
        pending.text_filter_mut(TextField::Supplier).needle = "glo\"bex".to_string();

        let html = filter_panel(&ORDERS, ORDER_IDS, &applied, &pending, false);
        assert!(html.contains(r#"class="chip active" style="--chip-color:#b45309" data-action="quick" data-key="OVERDUE""#));
        assert!(html.contains(r#"value="totalAmount_desc" selected"#));
        assert!(html.contains(r#"id="orders-filter-ordered-from""#));
        assert!(html.contains(r#"id="orders-filter-supplier""#));
        assert!(html.contains("glo&quot;bex"));
        assert!(html.contains("display:none"));
    }

    #[test]
    fn detail_modal_renders_draft_rows_and_totals() {
        let record = order();
        let totals = totals_for_items(&record.items);
        let html = detail_modal(&record, &ORDERS, &record.items, &totals);
        assert!(html.contains(r#"id="order-detail-form-o-1""#));
        assert!(html.contains(r#"name="itemsCount" value="1""#));
        assert!(html.contains(r#"name="name_0" value="Fan &quot;XL&quot;""#));
        assert!(html.contains(r#"id="orderLineTotal_o-1_0">$ 1250.5 TWD"#));
        assert!(html.contains(r#"name="supplier" value="Globex""#));
        assert!(html.contains(r#"<option value="已下單" selected>"#));

        let empty = detail_modal(&record, &ORDERS, &[], &Totals::default());
        assert!(empty.contains("目前沒有項目"));
        assert!(empty.contains(r#"id="orderTotalAmount_o-1">$ 0 TWD"#));
    }

    #[test]
    fn repair_bound_quotes_offer_parts_import() {
        let quote = QuoteRecord {
            id: "q-2".to_string(),
            repair_id: "R-9".to_string(),
            ..QuoteRecord::default()
        };
        let html = detail_modal(&quote, &QUOTES, &[], &Totals::default());
        assert!(html.contains("import-repair-parts"));
        assert!(html.contains(r#"id="quote-detail-form-q-2""#));
    }

    #[test]
    fn only_quote_details_carry_a_history_panel() {
        let quote = QuoteRecord {
            id: "q-3".to_string(),
            ..QuoteRecord::default()
        };
        let html = detail_modal(&quote, &QUOTES, &[], &Totals::default());
        assert!(html.contains(r#"id="quote_history_q-3""#));
        assert!(html.contains(r#"data-action="reload-history" data-id="q-3""#));

        let record = order();
        let orders = detail_modal(&record, &ORDERS, &[], &Totals::default());
        assert!(!orders.contains("history"));
    }

    #[test]
    fn create_modal_lists_sources_behind_a_blank_choice() {
        let options = vec![SourceOption {
            id: "R1".to_string(),
            label: "R20250101-001 · <Acme> · M1".to_string(),
        }];
        let html = create_modal::<QuoteRecord>(&options);
        assert!(html.contains("從維修單建立報價"));
        assert!(html.contains(r#"id="quotes-create-source"><option value="">請選擇</option>"#));
        assert!(html.contains(r#"<option value="R1">R20250101-001 · &lt;Acme&gt; · M1</option>"#));
        assert!(html.contains(r#"data-action="create-submit""#));

        let none = create_modal::<OrderRecord>(&[]);
        assert!(none.contains("目前沒有可用的報價"));
        assert!(module_layout::<OrderRecord>("").contains(r#"data-action="open-create">從報價建立"#));
    }

    #[test]
    fn history_panel_shows_changes_and_snapshots() {
        assert!(history_panel(&[]).contains("尚無歷史紀錄"));
        let entry = HistoryEntry {
            version: 2.0,
            at: "2025-01-02T08:00:00Z".to_string(),
            by_name: "Lin".to_string(),
            action: "CONVERT_TO_ORDER".to_string(),
            summary: "CONVERT_TO_ORDER → PO-<7>".to_string(),
            snapshot: Some(serde_json::json!({ "id": "Q1" })),
            ..HistoryEntry::default()
        };
        let html = history_panel(&[entry]);
        assert!(html.contains(r#"<span class="badge">v2</span>"#));
        assert!(html.contains("2025-01-02 08:00:00Z"));
        assert!(html.contains("PO-&lt;7&gt;"));
        assert!(html.contains("查看快照"));
        assert!(!html.contains("quote-history-changed"));
    }

    #[test]
    fn date_inputs_drop_the_at_suffix() {
        assert_eq!(date_input_name(DateField::Ordered, "from"), "ordered-from");
        assert_eq!(date_input_name(DateField::Created, "to"), "created-to");
    }
}
