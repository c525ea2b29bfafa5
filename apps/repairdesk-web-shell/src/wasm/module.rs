use super::*;

use web_sys::Event;

/// A record type with a mounted list module in the browser.
pub(super) trait ShellRecord: CardTemplate + Serialize + DeserializeOwned + 'static {
    const PROFILE: &'static ModuleProfile;
    const SERVICE: &'static str;
    /// Noun used in confirmation prompts.
    const NOUN: &'static str;

    fn context() -> &'static LocalKey<RefCell<Option<ModuleContext<Self>>>>;

    fn service() -> JsService<Self> {
        JsService::named(Self::SERVICE)
    }
}

type Listener = Closure<dyn FnMut(Event)>;

pub(super) struct ModuleContext<R: ListRecord> {
    container: Element,
    config: ListConfig,
    session: ListSession,
    editor: DetailEditor<R>,
    /// Base rows of the last update, used when the service cannot answer.
    rows: Vec<R>,
    /// Rendered history panel of the open record, keyed by its id.
    history: Option<(String, String)>,
    listeners: Vec<(&'static str, Listener)>,
}

impl<R: ListRecord> ModuleContext<R> {
    fn detach_listeners(&mut self) {
        for (kind, listener) in self.listeners.drain(..) {
            let _ = self
                .container
                .remove_event_listener_with_callback(kind, listener.as_ref().unchecked_ref());
        }
    }

    fn filters_key(&self) -> String {
        self.config
            .storage_key(self.session.profile().key, FILTERS_OPEN_KEY)
    }

    fn open_form_id(&self) -> Option<String>
    where
        R: CardTemplate,
    {
        self.editor.active_id().map(|id| R::IDS.form(id))
    }

    fn form_snapshot(&self) -> Option<FormSnapshot>
    where
        R: CardTemplate,
    {
        let form_id = self.open_form_id()?;
        read_form_snapshot(&form_id, self.config.max_draft_items)
    }
}

/// Runs `f` on the mounted context of `R`. `None` when the module is not mounted.
pub(super) fn with_context<R: ShellRecord, T>(
    f: impl FnOnce(&mut ModuleContext<R>) -> T,
) -> Option<T> {
    R::context().with(|cell| cell.borrow_mut().as_mut().map(f))
}

/// Renders the module into `container_id`. Remounting keeps the session and
/// any open draft.
pub(super) fn mount<R: ShellRecord>(container_id: &str) {
    init_runtime();
    let container = match element_by_id(container_id) {
        Ok(container) => container,
        Err(error) => {
            warn!(%error, module = R::PROFILE.key, "list container missing");
            return;
        }
    };

    let previous = R::context().with(|cell| cell.borrow_mut().take());
    let mut context = match previous {
        Some(mut context) => {
            context.detach_listeners();
            context.container = container;
            context
        }
        None => {
            let config = load_config();
            let mut session = ListSession::new(R::PROFILE, config.page_size);
            let editor = DetailEditor::new(
                DraftStore::new(config.max_draft_items),
                config.validation_policy(),
            );
            let filters_key = config.storage_key(R::PROFILE.key, FILTERS_OPEN_KEY);
            session.set_filters_open(load_flag(&filters_key));
            ModuleContext {
                container,
                config,
                session,
                editor,
                rows: Vec::new(),
                history: None,
                listeners: Vec::new(),
            }
        }
    };

    context
        .container
        .set_inner_html(&module_layout::<R>(&context.session.pending().search_text));
    attach_listeners::<R>(&mut context);
    R::context().with(|cell| *cell.borrow_mut() = Some(context));
    info!(module = R::PROFILE.key, container = container_id, "list module mounted");

    spawn_local(async {
        update::<R>().await;
        with_context::<R, _>(|context| {
            if context.editor.active().is_some() {
                render_detail(context);
            }
        });
    });
}

fn attach_listeners<R: ShellRecord>(context: &mut ModuleContext<R>) {
    let click: Listener = Closure::new(move |event: Event| handle_click::<R>(&event));
    let input: Listener = Closure::new(move |event: Event| handle_input::<R>(&event, false));
    let change: Listener = Closure::new(move |event: Event| handle_input::<R>(&event, true));
    for (kind, listener) in [("click", click), ("input", input), ("change", change)] {
        if context
            .container
            .add_event_listener_with_callback(kind, listener.as_ref().unchecked_ref())
            .is_err()
        {
            warn!(kind, "failed to attach list listener");
        }
        context.listeners.push((kind, listener));
    }
}

fn event_element(event: &Event) -> Option<Element> {
    event.target()?.dyn_into::<Element>().ok()
}

fn handle_click<R: ShellRecord>(event: &Event) {
    let Some(target) = event_element(event) else {
        return;
    };
    let Some(element) = target.closest("[data-action]").ok().flatten() else {
        return;
    };
    let attrs = ActionAttrs {
        action: element.get_attribute("data-action").unwrap_or_default(),
        key: element.get_attribute("data-key"),
        id: element.get_attribute("data-id"),
        index: element.get_attribute("data-index"),
    };
    let Some(action) = ClickAction::from_attrs(&attrs) else {
        return;
    };
    event.prevent_default();
    debug!(module = R::PROFILE.key, ?action, "list action");
    match action {
        ClickAction::Quick(key) => set_quick_filter::<R>(&key),
        ClickAction::Apply => apply_filters::<R>(),
        ClickAction::Clear => clear_all::<R>(),
        ClickAction::ToggleFilters => {
            toggle_filters::<R>();
        }
        ClickAction::LoadMore => spawn_local(load_more::<R>()),
        ClickAction::OpenDetail(id) => spawn_local(open_detail::<R>(id)),
        ClickAction::Delete(id) => spawn_local(delete::<R>(id)),
        ClickAction::Convert(id) => spawn_local(convert_quote(id)),
        ClickAction::Close => close_detail::<R>(),
        ClickAction::AddItem => add_item::<R>(),
        ClickAction::RemoveItem(index) => remove_item::<R>(index),
        ClickAction::ImportRepairParts => spawn_local(import_repair_parts::<R>()),
        ClickAction::Save => spawn_local(save::<R>()),
        ClickAction::OpenCreate => spawn_local(open_create::<R>()),
        ClickAction::CreateSubmit => spawn_local(submit_create::<R>()),
        ClickAction::ReloadHistory(id) => spawn_local(reload_history(id)),
    }
}

fn handle_input<R: ShellRecord>(event: &Event, committed: bool) {
    let Some(target) = event_element(event) else {
        return;
    };
    let Some(kind) = target.get_attribute("data-input") else {
        return;
    };
    let index = target.get_attribute("data-index");
    let field = target.get_attribute("data-field");
    let Some(action) = InputAction::from_attrs(
        &kind,
        index.as_deref(),
        field.as_deref(),
        target_value(&target),
    ) else {
        return;
    };
    match action {
        InputAction::Filter if committed => apply_advanced_filters::<R>(),
        InputAction::Filter => {}
        InputAction::Search(text) => set_search_draft::<R>(text),
        InputAction::Item {
            index,
            field,
            value,
        } => item_input::<R>(index, field, &value),
        InputAction::Currency => recalc_totals::<R>(),
        InputAction::Sort(key) => set_sort_draft::<R>(&key),
        InputAction::Status(status) => set_status_draft::<R>(&status),
    }
}

pub(super) async fn update<R: ShellRecord>() {
    refresh::<R>(None).await;
}

/// One update cycle: fetch, plan, write the frame, then paint the cards in
/// chunks. The token is taken before the fetch, so a cycle requested later
/// wins even when its fetch resolves first.
async fn refresh<R: ShellRecord>(restore_scroll: Option<f64>) {
    let Some((token, search_text)) = with_context::<R, _>(|context| {
        (
            context.session.begin_fetch(),
            context.session.criteria().search_text.clone(),
        )
    }) else {
        return;
    };
    let fetched = match R::service().search(&search_text).await {
        Ok(rows) => Some(rows),
        Err(error) => {
            warn!(module = R::PROFILE.key, %error, "list search failed");
            None
        }
    };

    let prepared = with_context::<R, _>(|context| {
        let today = today(&context.config);
        let device = context.config.device_class(viewport_width());
        let Some(plan) = context
            .session
            .plan_fetched(token, &mut context.rows, fetched, &today)
        else {
            debug!(
                module = R::PROFILE.key,
                token = token.value(),
                "dropping rows of a superseded update"
            );
            return None;
        };
        let ids = R::IDS;

        let _ = set_text(&ids.subtitle(), &subtitle_text(plan.summary.total));
        let _ = set_inner_html(&ids.summary(), &summary_strip(R::PROFILE, &plan.summary));
        let _ = set_inner_html(
            &ids.filters(),
            &filter_panel(
                R::PROFILE,
                ids,
                context.session.criteria(),
                context.session.pending(),
                context.session.filters_open(),
            ),
        );
        if plan.window.total == 0 {
            let _ = set_inner_html(&ids.list(), empty_state());
            return None;
        }
        let _ = set_inner_html(
            &ids.list(),
            &list_frame(ids, plan.window, device.placeholder_cards()),
        );
        if let Some(top) = restore_scroll {
            scroll_to(top);
        }
        debug!(
            module = R::PROFILE.key,
            token = plan.token.value(),
            signature = %plan.signature,
            visible = plan.window.visible,
            total = plan.window.total,
            reset = plan.pagination_reset,
            "list update planned"
        );
        let items: Vec<R> = plan.visible.into_iter().cloned().collect();
        let painter = ChunkPainter::new(
            items,
            plan.token,
            context.session.tokens().clone(),
            context.config.budget_for(device),
        );
        Some((painter, today))
    })
    .flatten();
    let Some((mut painter, today)) = prepared else {
        return;
    };

    let mut sink = match DomSink::attach(R::IDS) {
        Ok(sink) => sink,
        Err(error) => {
            warn!(module = R::PROFILE.key, %error, "card container missing");
            return;
        }
    };
    let clock = PerformanceClock::new();
    let render_one = |record: &R| Ok::<_, Infallible>(card(record, R::PROFILE, &today));
    match run_chunked(&mut painter, render_one, &mut sink, &clock, &AnimationFrameYield).await {
        Ok(report) => debug!(
            module = R::PROFILE.key,
            state = ?report.state,
            painted = report.painted,
            frames = report.frames,
            "list paint finished"
        ),
        Err(error) => warn!(module = R::PROFILE.key, %error, "list paint aborted"),
    }
}

pub(super) fn set_quick_filter<R: ShellRecord>(key: &str) {
    let quick = QuickFilter::parse(key);
    if with_context::<R, _>(|context| context.session.set_quick_filter(quick)).is_some() {
        spawn_local(update::<R>());
    }
}

pub(super) fn set_sort_draft<R: ShellRecord>(key: &str) {
    let Some(sort) = SortKey::parse(key) else {
        return;
    };
    with_context::<R, _>(|context| context.session.pending_mut().sort = sort);
}

pub(super) fn set_status_draft<R: ShellRecord>(status: &str) {
    let quick = QuickFilter::parse(status);
    with_context::<R, _>(|context| context.session.pending_mut().quick = quick);
}

pub(super) fn set_search_draft<R: ShellRecord>(text: String) {
    with_context::<R, _>(|context| context.session.pending_mut().search_text = text);
}

pub(super) fn apply_filters<R: ShellRecord>() {
    let applied = with_context::<R, _>(|context| {
        read_filter_inputs(R::IDS, context.session.pending_mut());
        context.session.apply_pending();
    });
    if applied.is_some() {
        spawn_local(update::<R>());
    }
}

pub(super) fn apply_advanced_filters<R: ShellRecord>() {
    let applied = with_context::<R, _>(|context| {
        read_filter_inputs(R::IDS, context.session.pending_mut());
        context.session.apply_advanced();
    });
    if applied.is_some() {
        spawn_local(update::<R>());
    }
}

pub(super) fn clear_all<R: ShellRecord>() {
    let cleared = with_context::<R, _>(|context| {
        context.session.clear_all();
        context.container.set_inner_html(&module_layout::<R>(""));
    });
    if cleared.is_some() {
        spawn_local(update::<R>());
    }
}

/// Grows the window by one page and keeps the reader's scroll position.
pub(super) async fn load_more<R: ShellRecord>() {
    let top = scroll_y();
    if with_context::<R, _>(|context| context.session.load_more()).is_some() {
        refresh::<R>(Some(top)).await;
    }
}

pub(super) fn toggle_filters<R: ShellRecord>() -> bool {
    with_context::<R, _>(|context| {
        let open = context.session.toggle_filters();
        save_flag(&context.filters_key(), open);
        let _ = set_inner_html(
            &R::IDS.filters(),
            &filter_panel(
                R::PROFILE,
                R::IDS,
                context.session.criteria(),
                context.session.pending(),
                open,
            ),
        );
        open
    })
    .unwrap_or(false)
}

fn render_detail<R: ShellRecord>(context: &ModuleContext<R>) {
    let Some(record) = context.editor.active() else {
        return;
    };
    let draft = context.editor.draft().unwrap_or_default();
    let totals = totals_for_items(draft);
    let top = scroll_y();
    if let Err(error) = show_modal(R::IDS, &detail_modal(record, R::PROFILE, draft, &totals)) {
        warn!(%error, "detail modal unavailable");
    }
    if let Some((id, markup)) = &context.history
        && id == record.id()
    {
        let _ = set_inner_html(&R::IDS.history_box(id), markup);
    }
    scroll_to(top);
}

pub(super) async fn open_detail<R: ShellRecord>(id: String) {
    let fetched = match R::service().get(&id).await {
        Ok(record) => record,
        Err(error) => {
            warn!(module = R::PROFILE.key, %id, %error, "detail fetch failed");
            None
        }
    };
    let opened = with_context::<R, _>(|context| {
        let record = fetched.or_else(|| context.rows.iter().find(|row| row.id() == id).cloned())?;
        context.editor.open(record)?;
        context.history = None;
        render_detail(context);
        Some(())
    })
    .flatten();
    if opened.is_none() {
        toast(&format!("找不到{}：{id}", R::NOUN), ToastKind::Warning);
        return;
    }
    if R::HISTORY {
        load_history(id).await;
    }
}

/// Fills the history panel of the open quote.
pub(super) async fn load_history(id: String) {
    let box_id = <QuoteRecord as CardTemplate>::IDS.history_box(&id);
    let _ = set_inner_html(&box_id, &history_notice("載入中..."));
    let markup = match quote_history(&id).await {
        Ok(None) => history_notice("History 模組尚未載入"),
        Ok(Some(mut entries)) => {
            sort_history(&mut entries);
            history_panel(&entries)
        }
        Err(error) => {
            warn!(quote = %id, %error, "history fetch failed");
            history_notice(&format!("載入失敗：{error}"))
        }
    };
    with_context::<QuoteRecord, _>(|context| {
        if context.editor.active_id() == Some(id.as_str()) {
            let _ = set_inner_html(&box_id, &markup);
            context.history = Some((id, markup));
        }
    });
}

/// Drops the service's cached history before loading it again.
pub(super) async fn reload_history(id: String) {
    forget_history(&id);
    load_history(id).await;
}

fn push_form_totals<R: ShellRecord>(context: &ModuleContext<R>) {
    let (Some(id), Some(snapshot)) = (context.editor.active_id(), context.form_snapshot()) else {
        return;
    };
    let totals = totals_for_form(&snapshot, context.config.max_draft_items);
    push_totals(
        &totals,
        snapshot.currency(),
        &mut DomTotals { ids: R::IDS, id },
    );
}

pub(super) fn item_input<R: ShellRecord>(index: usize, field: ItemField, value: &str) {
    with_context::<R, _>(|context| {
        context.editor.update_field(index, field, Some(value));
        if field.is_numeric() {
            push_form_totals(context);
        }
    });
}

pub(super) fn recalc_totals<R: ShellRecord>() {
    with_context::<R, _>(|context| push_form_totals(context));
}

pub(super) fn add_item<R: ShellRecord>() {
    let added = with_context::<R, _>(|context| {
        let snapshot = context.form_snapshot();
        let index = context.editor.add_item(snapshot.as_ref())?;
        render_detail(context);
        Some((context.open_form_id()?, index))
    })
    .flatten();
    let Some((form_id, index)) = added else {
        return;
    };
    spawn_local(async move {
        sleep_ms(FOCUS_DELAY_MS).await;
        focus_control(&form_id, index, ItemField::Name);
    });
}

pub(super) fn remove_item<R: ShellRecord>(index: usize) {
    with_context::<R, _>(|context| {
        let snapshot = context.form_snapshot();
        if context.editor.remove_item(snapshot.as_ref(), index) {
            render_detail(context);
        }
    });
}

/// Replaces the open draft with the parts tracked on its repair ticket.
/// A ticket with nothing importable leaves the draft as it is.
pub(super) async fn import_repair_parts<R: ShellRecord>() {
    let Some(repair_id) = with_context::<R, _>(|context| {
        let snapshot = context.form_snapshot();
        context.editor.pull(snapshot.as_ref());
        context
            .editor
            .active()
            .and_then(ListRecord::repair_id)
            .map(ToString::to_string)
    })
    .flatten() else {
        toast("此報價未綁定維修單，無法帶入用料追蹤", ToastKind::Warning);
        return;
    };

    let parts = match JsRepairParts.parts_for_repair(&repair_id).await {
        Ok(parts) => parts,
        Err(error) => {
            toast(&format!("讀取用料追蹤失敗：{error}"), ToastKind::Error);
            return;
        }
    };
    let imported = with_context::<R, _>(|context| {
        let count = context.editor.import_repair_parts(&parts)?;
        if count > 0 {
            render_detail(context);
        }
        Some(count)
    })
    .flatten();
    match imported {
        None => {}
        Some(0) => toast("用料追蹤目前沒有可帶入的項目", ToastKind::Info),
        Some(count) => toast(
            &format!("已帶入 {count} 筆用料追蹤項目（尚未儲存）"),
            ToastKind::Success,
        ),
    }
}

/// Validates the open draft, persists it, then closes the modal and refreshes
/// the list. Any failure leaves the draft and the modal in place.
pub(super) async fn save<R: ShellRecord>() {
    let Some((prepared, form_id)) = with_context::<R, _>(|context| {
        if context.editor.is_committing() {
            debug!(module = R::PROFILE.key, "save already in flight");
            return None;
        }
        let form_id = context.open_form_id()?;
        let snapshot = read_form_snapshot(&form_id, context.config.max_draft_items);
        let patch = read_header_patch(&form_id);
        Some((context.editor.prepare_commit(snapshot.as_ref(), &patch), form_id))
    })
    .flatten() else {
        return;
    };

    let record = match prepared {
        Ok(record) => record,
        Err(error) => {
            report_commit_error(&error, &form_id);
            return;
        }
    };
    let id = record.id().to_string();
    let outcome = R::service().upsert(record).await;
    with_context::<R, _>(|context| match &outcome {
        Ok(_) => {
            context.editor.complete_commit(&id);
        }
        Err(_) => context.editor.abort_commit(),
    });
    if let Err(error) = outcome {
        report_commit_error(&CommitError::from(error), &form_id);
        return;
    }

    hide_modal(R::IDS);
    info!(module = R::PROFILE.key, %id, "record saved");
    toast("已儲存", ToastKind::Success);
    update::<R>().await;
}

fn report_commit_error(error: &CommitError, form_id: &str) {
    let kind = match error {
        CommitError::Validation(_) | CommitError::InFlight => ToastKind::Warning,
        CommitError::Service(_) | CommitError::NotFound(_) => ToastKind::Error,
    };
    warn!(%error, "commit failed");
    toast(&error.user_message(), kind);
    if let Some((index, field)) = error.focus() {
        focus_control(form_id, index, field);
    }
}

pub(super) fn close_detail<R: ShellRecord>() {
    with_context::<R, _>(|context| {
        context.editor.close();
        context.history = None;
    });
    hide_modal(R::IDS);
}

pub(super) async fn delete<R: ShellRecord>(id: String) {
    let title = format!("刪除{}", R::NOUN);
    let message = format!("確定要刪除此{}嗎？此動作無法復原。", R::NOUN);
    if !confirm(&title, &message).await {
        return;
    }
    if let Err(error) = R::service().remove(&id).await {
        toast(&format!("刪除失敗：{error}"), ToastKind::Error);
        return;
    }
    let was_open = with_context::<R, _>(|context| {
        if context.editor.active_id() == Some(id.as_str()) {
            context.editor.close();
            true
        } else {
            false
        }
    });
    if was_open == Some(true) {
        hide_modal(R::IDS);
    }
    info!(module = R::PROFILE.key, %id, "record deleted");
    update::<R>().await;
}

/// Picks the upstream source of a new record.
pub(super) async fn open_create<R: ShellRecord>() {
    close_detail::<R>();
    let options = match R::PROFILE.create_source {
        CreateSource::Quote => {
            let quotes = match <QuoteRecord as ShellRecord>::service().get_all().await {
                Ok(quotes) => quotes,
                Err(error) => {
                    toast(&format!("讀取報價失敗：{error}"), ToastKind::Error);
                    return;
                }
            };
            let repairs = repair_tickets().await.unwrap_or_else(|error| {
                debug!(%error, "repair tickets unavailable for quote labels");
                Vec::new()
            });
            quote_options(&quotes, &repairs)
        }
        CreateSource::Repair => match repair_tickets().await {
            Ok(repairs) => repair_options(&repairs),
            Err(error) => {
                toast(&format!("讀取維修單失敗：{error}"), ToastKind::Error);
                return;
            }
        },
    };
    if let Err(error) = show_modal(R::IDS, &create_modal::<R>(&options)) {
        warn!(%error, "create modal unavailable");
    }
}

/// Creates a record from the picked source and opens it.
pub(super) async fn submit_create<R: ShellRecord>() {
    let picked = input_value(&R::IDS.create_select()).unwrap_or_default();
    match create_from_source(R::PROFILE.create_source, &picked, &R::service()).await {
        Ok(record) => {
            hide_modal(R::IDS);
            update::<R>().await;
            open_detail::<R>(record.id().to_string()).await;
        }
        Err(error @ CreateError::MissingSelection(_)) => {
            toast(&error.to_string(), ToastKind::Warning);
        }
        Err(error) => {
            warn!(module = R::PROFILE.key, %error, "create from source failed");
            toast(&error.to_string(), ToastKind::Error);
        }
    }
}

/// Opens the order created from an approved quote, creating it first when
/// none exists yet.
pub(super) async fn convert_quote(quote_id: String) {
    let quote = match <QuoteRecord as ShellRecord>::service().get(&quote_id).await {
        Ok(Some(quote)) => Some(quote),
        Ok(None) | Err(_) => with_context::<QuoteRecord, _>(|context| {
            context.rows.iter().find(|row| row.id == quote_id).cloned()
        })
        .flatten(),
    };
    let Some(quote) = quote else {
        toast(&format!("找不到報價：{quote_id}"), ToastKind::Warning);
        return;
    };

    let order = match convert_quote_to_order(&quote, &JsOrderConversion).await {
        Ok(Conversion {
            order,
            created: true,
        }) => {
            toast("已建立訂單", ToastKind::Success);
            order
        }
        Ok(Conversion { order, .. }) => {
            toast("此報價已建立訂單，已開啟既有訂單", ToastKind::Info);
            order
        }
        Err(error @ ConvertError::NotApproved) => {
            toast(&error.to_string(), ToastKind::Warning);
            return;
        }
        Err(error) => {
            warn!(quote = %quote.id, %error, "quote conversion failed");
            toast(&error.to_string(), ToastKind::Error);
            return;
        }
    };

    let orders_mounted = with_context::<OrderRecord, _>(|_| ()).is_some();
    if orders_mounted {
        update::<OrderRecord>().await;
        open_detail::<OrderRecord>(order.id).await;
    }
}
