#[cfg(any(target_arch = "wasm32", test))]
mod actions;
#[cfg(any(target_arch = "wasm32", test))]
mod cards;
#[cfg(target_arch = "wasm32")]
mod wasm_constants;

#[cfg(target_arch = "wasm32")]
mod wasm {
    use std::cell::RefCell;
    use std::convert::Infallible;
    use std::thread::LocalKey;

    use async_trait::async_trait;
    use repairdesk_list_core::sync::{totals_for_form, totals_for_items};
    use repairdesk_list_core::{
        ChunkPainter, CommitError, Conversion, ConvertError, CreateError, CreateSource,
        DetailEditor, DraftStore, EntityService, FormRow, FormSnapshot, FrameClock, HeaderPatch,
        HistoryAction, HistoryEntry, ItemField, ListConfig, ListRecord, ListSession, ListSink,
        ModuleProfile, ORDERS, OrderConversion, OrderRecord, QUOTES, QueryCriteria, QuickFilter,
        QuoteRecord, RecordFactory, RenderError, RepairPart, RepairPartsSource, RepairTicket,
        ServiceError, SortKey, TotalsDisplay, YieldPoint, business_today, convert_quote_to_order,
        create_from_source, push_totals, quote_options, repair_options, run_chunked, sort_history,
    };
    use serde::Serialize;
    use serde::de::DeserializeOwned;
    use tracing::{debug, info, warn};
    use wasm_bindgen::JsCast;
    use wasm_bindgen::prelude::*;
    use wasm_bindgen_futures::{JsFuture, spawn_local};
    use web_sys::{Element, HtmlElement, HtmlInputElement, HtmlSelectElement, HtmlTextAreaElement};

    use crate::actions::{ActionAttrs, ClickAction, InputAction};
    use crate::cards::{
        CardTemplate, DomIds, card, create_modal, date_input_name, detail_modal, empty_state,
        filter_panel, history_notice, history_panel, list_frame, module_layout, subtitle_text,
        summary_strip,
    };
    use crate::wasm_constants::*;

    mod bridge;
    mod dom;
    mod frame;
    mod lifecycle;
    mod module;

    use bridge::*;
    use dom::*;
    use frame::*;
    use lifecycle::*;
    use module::*;

    thread_local! {
        static ORDERS_CONTEXT: RefCell<Option<ModuleContext<OrderRecord>>> =
            const { RefCell::new(None) };
        static QUOTES_CONTEXT: RefCell<Option<ModuleContext<QuoteRecord>>> =
            const { RefCell::new(None) };
    }

    impl ShellRecord for OrderRecord {
        const PROFILE: &'static ModuleProfile = &ORDERS;
        const SERVICE: &'static str = ORDER_SERVICE;
        const NOUN: &'static str = "訂單";

        fn context() -> &'static LocalKey<RefCell<Option<ModuleContext<Self>>>> {
            &ORDERS_CONTEXT
        }
    }

    impl ShellRecord for QuoteRecord {
        const PROFILE: &'static ModuleProfile = &QUOTES;
        const SERVICE: &'static str = QUOTE_SERVICE;
        const NOUN: &'static str = "報價";

        fn context() -> &'static LocalKey<RefCell<Option<ModuleContext<Self>>>> {
            &QUOTES_CONTEXT
        }
    }

    /// Runs `$body` with `$record` aliased to the record type of `$module`.
    macro_rules! dispatch {
        ($module:expr, $record:ident => $body:expr) => {
            match ModuleProfile::from_key(&$module).map(|profile| profile.key) {
                Some("orders") => {
                    type $record = OrderRecord;
                    $body
                }
                Some("quotes") => {
                    type $record = QuoteRecord;
                    $body
                }
                _ => warn!(module = %$module, "unknown list module"),
            }
        };
    }

    #[wasm_bindgen(start)]
    pub fn start() {
        init_runtime();
        info!("repairdesk web shell ready");
    }

    #[wasm_bindgen]
    pub fn shell_status_json() -> String {
        let status = ShellStatus {
            target: "wasm32",
            orders_mounted: ORDERS_CONTEXT.with(|cell| cell.borrow().is_some()),
            quotes_mounted: QUOTES_CONTEXT.with(|cell| cell.borrow().is_some()),
        };
        serde_json::to_string(&status).unwrap_or_else(|_| "{}".to_string())
    }

    #[wasm_bindgen]
    pub fn list_render(module: String, container_id: String) {
        dispatch!(module, R => mount::<R>(&container_id));
    }

    #[wasm_bindgen]
    pub fn list_update(module: String) {
        dispatch!(module, R => spawn_local(update::<R>()));
    }

    #[wasm_bindgen]
    pub fn list_set_quick_filter(module: String, key: String) {
        dispatch!(module, R => set_quick_filter::<R>(&key));
    }

    #[wasm_bindgen]
    pub fn list_set_sort(module: String, key: String) {
        dispatch!(module, R => set_sort_draft::<R>(&key));
    }

    #[wasm_bindgen]
    pub fn list_set_status_filter(module: String, status: String) {
        dispatch!(module, R => set_status_draft::<R>(&status));
    }

    #[wasm_bindgen]
    pub fn list_search_draft(module: String, text: String) {
        dispatch!(module, R => set_search_draft::<R>(text));
    }

    #[wasm_bindgen]
    pub fn list_apply_filters(module: String) {
        dispatch!(module, R => apply_filters::<R>());
    }

    #[wasm_bindgen]
    pub fn list_apply_advanced_filters(module: String) {
        dispatch!(module, R => apply_advanced_filters::<R>());
    }

    #[wasm_bindgen]
    pub fn list_clear_all(module: String) {
        dispatch!(module, R => clear_all::<R>());
    }

    #[wasm_bindgen]
    pub fn list_load_more(module: String) {
        dispatch!(module, R => spawn_local(load_more::<R>()));
    }

    #[wasm_bindgen]
    pub fn list_toggle_filters(module: String) -> bool {
        let mut open = false;
        dispatch!(module, R => open = toggle_filters::<R>());
        open
    }

    #[wasm_bindgen]
    pub fn detail_open(module: String, id: String) {
        dispatch!(module, R => spawn_local(open_detail::<R>(id.clone())));
    }

    #[wasm_bindgen]
    pub fn detail_item_input(module: String, index: usize, field: String, value: String) {
        let Some(field) = ItemField::parse(&field) else {
            return;
        };
        dispatch!(module, R => item_input::<R>(index, field, &value));
    }

    #[wasm_bindgen]
    pub fn detail_add_item(module: String) {
        dispatch!(module, R => add_item::<R>());
    }

    #[wasm_bindgen]
    pub fn detail_remove_item(module: String, index: usize) {
        dispatch!(module, R => remove_item::<R>(index));
    }

    #[wasm_bindgen]
    pub fn detail_recalc_totals(module: String) {
        dispatch!(module, R => recalc_totals::<R>());
    }

    #[wasm_bindgen]
    pub fn detail_import_repair_parts(module: String) {
        dispatch!(module, R => spawn_local(import_repair_parts::<R>()));
    }

    #[wasm_bindgen]
    pub fn detail_save(module: String) {
        dispatch!(module, R => spawn_local(save::<R>()));
    }

    #[wasm_bindgen]
    pub fn detail_close(module: String) {
        dispatch!(module, R => close_detail::<R>());
    }

    #[wasm_bindgen]
    pub fn list_delete(module: String, id: String) {
        dispatch!(module, R => spawn_local(delete::<R>(id.clone())));
    }

    #[wasm_bindgen]
    pub fn quote_convert_to_order(quote_id: String) {
        spawn_local(convert_quote(quote_id));
    }

    #[wasm_bindgen]
    pub fn list_open_create(module: String) {
        dispatch!(module, R => spawn_local(open_create::<R>()));
    }

    #[wasm_bindgen]
    pub fn list_submit_create(module: String) {
        dispatch!(module, R => spawn_local(submit_create::<R>()));
    }

    #[wasm_bindgen]
    pub fn quote_reload_history(quote_id: String) {
        spawn_local(reload_history(quote_id));
    }

    #[derive(Debug, Serialize)]
    #[serde(rename_all = "camelCase")]
    struct ShellStatus {
        target: &'static str,
        orders_mounted: bool,
        quotes_mounted: bool,
    }
}

#[cfg(target_arch = "wasm32")]
pub use wasm::shell_status_json;

#[cfg(not(target_arch = "wasm32"))]
pub fn shell_status_json() -> String {
    "{\"target\":\"native\",\"detail\":\"list rendering is only available on wasm\"}".to_string()
}
