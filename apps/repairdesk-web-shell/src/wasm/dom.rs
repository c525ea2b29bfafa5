use super::*;

pub(super) fn document() -> Result<web_sys::Document, String> {
    let window = web_sys::window().ok_or_else(|| "window is unavailable".to_string())?;
    window
        .document()
        .ok_or_else(|| "document is unavailable".to_string())
}

pub(super) fn element_by_id(id: &str) -> Result<Element, String> {
    document()?
        .get_element_by_id(id)
        .ok_or_else(|| format!("#{id} is not in the document"))
}

pub(super) fn set_inner_html(id: &str, markup: &str) -> Result<(), String> {
    element_by_id(id)?.set_inner_html(markup);
    Ok(())
}

pub(super) fn set_text(id: &str, text: &str) -> Result<(), String> {
    element_by_id(id)?.set_text_content(Some(text));
    Ok(())
}

fn control_value(element: &Element) -> Option<String> {
    if let Some(input) = element.dyn_ref::<HtmlInputElement>() {
        return Some(input.value());
    }
    if let Some(select) = element.dyn_ref::<HtmlSelectElement>() {
        return Some(select.value());
    }
    element
        .dyn_ref::<HtmlTextAreaElement>()
        .map(HtmlTextAreaElement::value)
}

fn named_value(form: &Element, name: &str) -> Option<String> {
    let control = form
        .query_selector(&format!("[name=\"{name}\"]"))
        .ok()
        .flatten()?;
    control_value(&control)
}

pub(super) fn input_value(id: &str) -> Option<String> {
    element_by_id(id).ok().as_ref().and_then(control_value)
}

/// Event target's control value, or an empty string for non-controls.
pub(super) fn target_value(target: &Element) -> String {
    control_value(target).unwrap_or_default()
}

/// Paints into the card container inside the module's list host.
pub(super) struct DomSink {
    cards: Element,
}

impl DomSink {
    pub(super) fn attach(ids: DomIds) -> Result<Self, String> {
        let selector = format!(".{}", ids.cards_class());
        let cards = element_by_id(&ids.list())?
            .query_selector(&selector)
            .map_err(|_| format!("invalid card selector {selector}"))?
            .ok_or_else(|| format!("{selector} is not rendered"))?;
        Ok(Self { cards })
    }
}

impl ListSink for DomSink {
    fn clear(&mut self) -> Result<(), RenderError> {
        self.cards.set_inner_html("");
        Ok(())
    }

    fn append_markup(&mut self, markup: &str) -> Result<(), RenderError> {
        self.cards
            .insert_adjacent_html("beforeend", markup)
            .map_err(|_| RenderError::Sink("failed to append card markup".to_string()))
    }

    fn set_loading(&mut self, loading: bool) -> Result<(), RenderError> {
        self.cards
            .class_list()
            .toggle_with_force(RENDERING_CLASS, loading)
            .map(|_| ())
            .map_err(|_| RenderError::Sink("failed to toggle the rendering class".to_string()))
    }
}

/// Reads the item rows of the detail form. `None` when the modal is closed.
pub(super) fn read_form_snapshot(form_id: &str, max_items: usize) -> Option<FormSnapshot> {
    let form = element_by_id(form_id).ok()?;
    let mut snapshot = FormSnapshot {
        item_count: named_value(&form, "itemsCount"),
        rows: Vec::new(),
        currency: named_value(&form, "currency"),
    };
    let count = snapshot.bounded_count(max_items).unwrap_or(0);
    snapshot.rows = (0..count)
        .map(|index| {
            let mut row = FormRow::default();
            for field in ItemField::ALL {
                if let Some(value) = named_value(&form, &format!("{}_{index}", field.key())) {
                    row.set(field, value);
                }
            }
            row
        })
        .collect();
    Some(snapshot)
}

pub(super) fn read_header_patch(form_id: &str) -> HeaderPatch {
    let Ok(form) = element_by_id(form_id) else {
        return HeaderPatch::default();
    };
    HeaderPatch {
        status: named_value(&form, "status"),
        currency: named_value(&form, "currency"),
        note: named_value(&form, "note"),
        supplier: named_value(&form, "supplier"),
        ordered_at: named_value(&form, "orderedAt"),
        expected_at: named_value(&form, "expectedAt"),
        received_at: named_value(&form, "receivedAt"),
    }
}

/// Copies the advanced filter inputs into `criteria`. Missing inputs leave
/// the current values untouched.
pub(super) fn read_filter_inputs(ids: DomIds, criteria: &mut QueryCriteria) {
    for range in &mut criteria.date_ranges {
        if let Some(from) = input_value(&ids.filter_input(&date_input_name(range.field, "from"))) {
            range.from = from;
        }
        if let Some(to) = input_value(&ids.filter_input(&date_input_name(range.field, "to"))) {
            range.to = to;
        }
    }
    for filter in &mut criteria.text_filters {
        if let Some(needle) = input_value(&ids.filter_input(filter.field.as_str())) {
            filter.needle = needle;
        }
    }
    if let Some(min) = input_value(&ids.filter_input("amount-min")) {
        criteria.amount.min = min;
    }
    if let Some(max) = input_value(&ids.filter_input("amount-max")) {
        criteria.amount.max = max;
    }
    if let Some(sort) = input_value(&ids.filter_input("sort")).as_deref().and_then(SortKey::parse) {
        criteria.sort = sort;
    }
}

/// Writes totals into the open detail modal, skipping cells that are gone.
pub(super) struct DomTotals<'a> {
    pub(super) ids: DomIds,
    pub(super) id: &'a str,
}

impl TotalsDisplay for DomTotals<'_> {
    fn set_line_total(&mut self, index: usize, text: &str) {
        let _ = set_text(&self.ids.line_total(self.id, index), text);
    }

    fn set_grand_total(&mut self, text: &str) {
        let _ = set_text(&self.ids.grand_total(self.id), text);
    }

    fn set_header_total(&mut self, text: &str) {
        let _ = set_text(&self.ids.header_total(self.id), text);
    }
}

/// Focuses one item input of the open form.
pub(super) fn focus_control(form_id: &str, index: usize, field: ItemField) {
    let Ok(form) = element_by_id(form_id) else {
        return;
    };
    let selector = format!("[name=\"{}_{index}\"]", field.key());
    if let Some(control) = form
        .query_selector(&selector)
        .ok()
        .flatten()
        .and_then(|element| element.dyn_into::<HtmlElement>().ok())
    {
        let _ = control.focus();
    }
}

pub(super) fn show_modal(ids: DomIds, markup: &str) -> Result<(), String> {
    set_inner_html(&ids.modal_content(), markup)?;
    let modal = element_by_id(&ids.modal())?
        .dyn_into::<HtmlElement>()
        .map_err(|_| "modal is not HtmlElement".to_string())?;
    modal
        .style()
        .set_property("display", "flex")
        .map_err(|_| "failed to show modal".to_string())
}

pub(super) fn hide_modal(ids: DomIds) {
    if let Ok(modal) = element_by_id(&ids.modal())
        && let Ok(modal) = modal.dyn_into::<HtmlElement>()
    {
        let _ = modal.style().set_property("display", "none");
    }
    let _ = set_inner_html(&ids.modal_content(), "");
}

pub(super) fn scroll_y() -> f64 {
    web_sys::window()
        .and_then(|window| window.scroll_y().ok())
        .unwrap_or(0.0)
}

pub(super) fn scroll_to(top: f64) {
    if let Some(window) = web_sys::window() {
        let options = web_sys::ScrollToOptions::new();
        options.set_top(top);
        options.set_behavior(web_sys::ScrollBehavior::Instant);
        window.scroll_to_with_scroll_to_options(&options);
    }
}
