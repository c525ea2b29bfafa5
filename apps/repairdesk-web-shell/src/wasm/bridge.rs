use super::*;

use std::marker::PhantomData;

use js_sys::{Array, Function, JSON, Promise, Reflect};

/// Data service registered on `window`, reached through the `_svc` locator
/// when the host installs one.
pub(super) struct JsService<R> {
    name: &'static str,
    record: PhantomData<R>,
}

impl<R> JsService<R> {
    pub(super) fn named(name: &'static str) -> Self {
        Self {
            name,
            record: PhantomData,
        }
    }

    fn resolve(&self) -> Result<JsValue, ServiceError> {
        let window = web_sys::window()
            .ok_or_else(|| ServiceError::Unavailable("window is unavailable".to_string()))?;
        let locator = Reflect::get(&window, &JsValue::from_str(SERVICE_LOCATOR))
            .unwrap_or(JsValue::UNDEFINED);
        if let Some(locator) = locator.dyn_ref::<Function>()
            && let Ok(service) = locator.call1(&window, &JsValue::from_str(self.name))
            && !service.is_null()
            && !service.is_undefined()
        {
            return Ok(service);
        }
        let service = Reflect::get(&window, &JsValue::from_str(self.name))
            .map_err(|error| ServiceError::Unavailable(js_error_message(&error)))?;
        if service.is_null() || service.is_undefined() {
            return Err(ServiceError::Unavailable(format!("{} is not registered", self.name)));
        }
        Ok(service)
    }

    async fn call(&self, method: &str, args: &[JsValue]) -> Result<JsValue, ServiceError> {
        self.call_optional(method, args).await?.ok_or_else(|| {
            ServiceError::Unavailable(format!("{}.{method} is not a function", self.name))
        })
    }

    /// Like `call`, but `None` when the service has no such method.
    async fn call_optional(
        &self,
        method: &str,
        args: &[JsValue],
    ) -> Result<Option<JsValue>, ServiceError> {
        let service = self.resolve()?;
        ensure_initialized(&service).await?;
        let Some(function) = Reflect::get(&service, &JsValue::from_str(method))
            .ok()
            .and_then(|value| value.dyn_into::<Function>().ok())
        else {
            return Ok(None);
        };
        let arguments: Array = args.iter().collect();
        let pending = function
            .apply(&service, &arguments)
            .map_err(|error| ServiceError::Rejected(js_error_message(&error)))?;
        JsFuture::from(Promise::resolve(&pending))
            .await
            .map(Some)
            .map_err(|error| ServiceError::Rejected(js_error_message(&error)))
    }
}

/// Runs `init()` once for services that report `isInitialized === false`.
async fn ensure_initialized(service: &JsValue) -> Result<(), ServiceError> {
    let initialized = Reflect::get(service, &JsValue::from_str("isInitialized"))
        .map(|value| value.is_truthy())
        .unwrap_or(false);
    if initialized {
        return Ok(());
    }
    let Some(init) = Reflect::get(service, &JsValue::from_str("init"))
        .ok()
        .and_then(|value| value.dyn_into::<Function>().ok())
    else {
        return Ok(());
    };
    let pending = init
        .call0(service)
        .map_err(|error| ServiceError::Unavailable(js_error_message(&error)))?;
    JsFuture::from(Promise::resolve(&pending))
        .await
        .map_err(|error| ServiceError::Unavailable(js_error_message(&error)))?;
    Ok(())
}

pub(super) fn js_error_message(error: &JsValue) -> String {
    if let Some(text) = error.as_string() {
        return text;
    }
    Reflect::get(error, &JsValue::from_str("message"))
        .ok()
        .and_then(|message| message.as_string())
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| "未知錯誤".to_string())
}

fn is_absent(value: &JsValue) -> bool {
    value.is_null() || value.is_undefined()
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, ServiceError> {
    let json =
        serde_json::to_string(value).map_err(|error| ServiceError::Decode(error.to_string()))?;
    JSON::parse(&json).map_err(|error| ServiceError::Decode(js_error_message(&error)))
}

fn from_js<T: DeserializeOwned>(value: &JsValue) -> Result<T, ServiceError> {
    let json: String = JSON::stringify(value)
        .map_err(|error| ServiceError::Decode(js_error_message(&error)))?
        .into();
    serde_json::from_str(&json).map_err(|error| ServiceError::Decode(error.to_string()))
}

fn rows_from_js<R: ListRecord + DeserializeOwned>(value: &JsValue) -> Result<Vec<R>, ServiceError> {
    if is_absent(value) {
        return Ok(Vec::new());
    }
    let rows: Vec<R> = from_js(value)?;
    Ok(rows.into_iter().filter(|row| !row.is_deleted()).collect())
}

#[async_trait(?Send)]
impl<R> EntityService<R> for JsService<R>
where
    R: ListRecord + Serialize + DeserializeOwned,
{
    async fn search(&self, text: &str) -> Result<Vec<R>, ServiceError> {
        let rows = self.call("search", &[JsValue::from_str(text)]).await?;
        rows_from_js(&rows)
    }

    async fn get_all(&self) -> Result<Vec<R>, ServiceError> {
        let rows = self.call("getAll", &[]).await?;
        rows_from_js(&rows)
    }

    async fn get(&self, id: &str) -> Result<Option<R>, ServiceError> {
        let row = self.call("get", &[JsValue::from_str(id)]).await?;
        if is_absent(&row) {
            return Ok(None);
        }
        from_js(&row).map(Some)
    }

    async fn upsert(&self, record: R) -> Result<R, ServiceError> {
        let saved = self.call("upsert", &[to_js(&record)?]).await?;
        if is_absent(&saved) {
            return Ok(record);
        }
        from_js(&saved)
    }

    async fn remove(&self, id: &str) -> Result<(), ServiceError> {
        self.call("remove", &[JsValue::from_str(id)]).await?;
        Ok(())
    }
}

pub(super) struct JsRepairParts;

#[async_trait(?Send)]
impl RepairPartsSource for JsRepairParts {
    async fn parts_for_repair(&self, repair_id: &str) -> Result<Vec<RepairPart>, ServiceError> {
        let service = JsService::<RepairPart>::named(REPAIR_PARTS_SERVICE);
        let parts = service
            .call("getForRepair", &[JsValue::from_str(repair_id)])
            .await?;
        if is_absent(&parts) {
            return Ok(Vec::new());
        }
        from_js(&parts)
    }
}

#[async_trait(?Send)]
impl<R> RecordFactory<R> for JsService<R>
where
    R: ListRecord + DeserializeOwned,
{
    async fn create_from(&self, source: CreateSource, source_id: &str) -> Result<R, ServiceError> {
        let created = match source {
            CreateSource::Quote => {
                let options = to_js(&serde_json::json!({ "requireApproved": true }))?;
                self.call("createFromQuote", &[JsValue::from_str(source_id), options])
                    .await?
            }
            CreateSource::Repair => {
                self.call("createFromRepair", &[JsValue::from_str(source_id)])
                    .await?
            }
        };
        if is_absent(&created) {
            return Err(ServiceError::Rejected(format!("{source_id} 未建立任何資料")));
        }
        from_js(&created)
    }
}

/// Order lookups and creation through `OrderService`, history through
/// `QuoteService`.
pub(super) struct JsOrderConversion;

#[async_trait(?Send)]
impl OrderConversion for JsOrderConversion {
    async fn order_for_quote(&self, quote_id: &str) -> Result<Option<OrderRecord>, ServiceError> {
        let orders: JsService<OrderRecord> = JsService::named(ORDER_SERVICE);
        let rows = orders.get_all().await?;
        Ok(rows.into_iter().find(|order| order.quote_id.trim() == quote_id))
    }

    async fn create_order_from_quote(&self, quote_id: &str) -> Result<OrderRecord, ServiceError> {
        let orders: JsService<OrderRecord> = JsService::named(ORDER_SERVICE);
        orders.create_from(CreateSource::Quote, quote_id).await
    }

    async fn record_history(
        &self,
        quote_id: &str,
        action: &HistoryAction,
    ) -> Result<(), ServiceError> {
        let quotes: JsService<QuoteRecord> = JsService::named(QUOTE_SERVICE);
        quotes
            .call_optional("addHistoryAction", &[JsValue::from_str(quote_id), to_js(action)?])
            .await?;
        Ok(())
    }
}

/// Live repair tickets offered as quote sources.
pub(super) async fn repair_tickets() -> Result<Vec<RepairTicket>, ServiceError> {
    let repairs: JsService<RepairTicket> = JsService::named(REPAIR_SERVICE);
    let rows = repairs.call("getAll", &[]).await?;
    if is_absent(&rows) {
        return Ok(Vec::new());
    }
    let rows: Vec<RepairTicket> = from_js(&rows)?;
    Ok(rows.into_iter().filter(|repair| !repair.is_deleted).collect())
}

/// Version history of a quote. `None` when the service keeps no history.
pub(super) async fn quote_history(
    quote_id: &str,
) -> Result<Option<Vec<HistoryEntry>>, ServiceError> {
    let quotes: JsService<QuoteRecord> = JsService::named(QUOTE_SERVICE);
    let Some(entries) = quotes
        .call_optional("getHistory", &[JsValue::from_str(quote_id)])
        .await?
    else {
        return Ok(None);
    };
    if is_absent(&entries) {
        return Ok(Some(Vec::new()));
    }
    from_js(&entries).map(Some)
}

/// Drops the service's cached history of `quote_id` so the next read refetches.
pub(super) fn forget_history(quote_id: &str) {
    let quotes: JsService<QuoteRecord> = JsService::named(QUOTE_SERVICE);
    let Ok(service) = quotes.resolve() else {
        return;
    };
    let Ok(cache) = Reflect::get(&service, &JsValue::from_str("_historyCache")) else {
        return;
    };
    if let Some(delete) = Reflect::get(&cache, &JsValue::from_str("delete"))
        .ok()
        .and_then(|value| value.dyn_into::<Function>().ok())
    {
        let _ = delete.call1(&cache, &JsValue::from_str(quote_id));
    }
}
