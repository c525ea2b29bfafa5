use super::*;

use std::sync::Once;

use chrono::DateTime;
use js_sys::{Function, Reflect};

static RUNTIME_INIT: Once = Once::new();

pub(super) fn init_runtime() {
    RUNTIME_INIT.call_once(|| {
        console_error_panic_hook::set_once();
        tracing_wasm::set_as_global_default();
    });
}

/// Reads overrides from `window.__REPAIRDESK_CONFIG__`, keyed like the
/// `REPAIRDESK_*` environment variables. Invalid overrides fall back to the
/// defaults.
pub(super) fn load_config() -> ListConfig {
    let overrides = web_sys::window()
        .and_then(|window| Reflect::get(&window, &JsValue::from_str(CONFIG_GLOBAL)).ok())
        .filter(JsValue::is_object);
    let Some(overrides) = overrides else {
        return ListConfig::default();
    };
    let lookup = |key: &str| {
        let value = Reflect::get(&overrides, &JsValue::from_str(key)).ok()?;
        if let Some(text) = value.as_string() {
            return Some(text);
        }
        if let Some(number) = value.as_f64() {
            return Some(number.to_string());
        }
        value.as_bool().map(|flag| flag.to_string())
    };
    match ListConfig::from_lookup(lookup) {
        Ok(config) => config,
        Err(error) => {
            warn!(%error, "ignoring invalid list configuration");
            ListConfig::default()
        }
    }
}

pub(super) fn today(config: &ListConfig) -> String {
    let now = DateTime::from_timestamp_millis(js_sys::Date::now() as i64).unwrap_or_default();
    business_today(now, config.business_utc_offset_minutes)
}

pub(super) fn viewport_width() -> f64 {
    web_sys::window()
        .and_then(|window| window.inner_width().ok())
        .and_then(|width| width.as_f64())
        .unwrap_or(1_024.0)
}

fn ui_function(name: &str) -> Option<(JsValue, Function)> {
    let window = web_sys::window()?;
    let ui = Reflect::get(&window, &JsValue::from_str(UI_GLOBAL)).ok()?;
    if !ui.is_object() {
        return None;
    }
    let function = Reflect::get(&ui, &JsValue::from_str(name))
        .ok()?
        .dyn_into::<Function>()
        .ok()?;
    Some((ui, function))
}

#[derive(Debug, Clone, Copy)]
pub(super) enum ToastKind {
    Info,
    Success,
    Warning,
    Error,
}

impl ToastKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

/// `UI.toast` when the host provides it, otherwise a blocking alert.
pub(super) fn toast(message: &str, kind: ToastKind) {
    if let Some((ui, function)) = ui_function("toast") {
        let options = js_sys::Object::new();
        let _ = Reflect::set(
            &options,
            &JsValue::from_str("type"),
            &JsValue::from_str(kind.as_str()),
        );
        if function
            .call2(&ui, &JsValue::from_str(message), &options)
            .is_ok()
        {
            return;
        }
    }
    if let Some(window) = web_sys::window() {
        let _ = window.alert_with_message(message);
    }
}

/// `UI.confirm` when the host provides it, otherwise `window.confirm`.
pub(super) async fn confirm(title: &str, message: &str) -> bool {
    if let Some((ui, function)) = ui_function("confirm") {
        let options = js_sys::Object::new();
        let _ = Reflect::set(&options, &JsValue::from_str("title"), &JsValue::from_str(title));
        let _ = Reflect::set(
            &options,
            &JsValue::from_str("message"),
            &JsValue::from_str(message),
        );
        if let Ok(pending) = function.call1(&ui, &options) {
            return JsFuture::from(js_sys::Promise::resolve(&pending))
                .await
                .map(|answer| answer.is_truthy())
                .unwrap_or(false);
        }
    }
    web_sys::window()
        .and_then(|window| window.confirm_with_message(message).ok())
        .unwrap_or(false)
}

fn local_storage() -> Option<web_sys::Storage> {
    web_sys::window()?.local_storage().ok().flatten()
}

pub(super) fn load_flag(key: &str) -> bool {
    local_storage()
        .and_then(|storage| storage.get_item(key).ok().flatten())
        .is_some_and(|value| value == "1")
}

pub(super) fn save_flag(key: &str, value: bool) {
    let Some(storage) = local_storage() else {
        return;
    };
    if storage.set_item(key, if value { "1" } else { "0" }).is_err() {
        debug!(key, "preference not persisted");
    }
}

/// Resolves after `ms` milliseconds.
pub(super) async fn sleep_ms(ms: u32) {
    gloo_timers::future::TimeoutFuture::new(ms).await;
}
