use repairdesk_list_core::ItemField;

/// A click routed through a `data-action` attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ClickAction {
    Quick(String),
    Apply,
    Clear,
    ToggleFilters,
    LoadMore,
    OpenDetail(String),
    Delete(String),
    Convert(String),
    Close,
    AddItem,
    RemoveItem(usize),
    ImportRepairParts,
    Save,
    OpenCreate,
    CreateSubmit,
    ReloadHistory(String),
}

/// Attribute values read off the element that carried `data-action`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ActionAttrs {
    pub(crate) action: String,
    pub(crate) key: Option<String>,
    pub(crate) id: Option<String>,
    pub(crate) index: Option<String>,
}

impl ClickAction {
    pub(crate) fn from_attrs(attrs: &ActionAttrs) -> Option<Self> {
        let id = || {
            attrs
                .id
                .as_deref()
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(ToString::to_string)
        };
        let action = match attrs.action.trim() {
            "quick" => Self::Quick(attrs.key.clone().unwrap_or_default()),
            "apply" => Self::Apply,
            "clear" => Self::Clear,
            "toggle-filters" => Self::ToggleFilters,
            "load-more" => Self::LoadMore,
            "open-detail" => Self::OpenDetail(id()?),
            "delete" => Self::Delete(id()?),
            "convert" => Self::Convert(id()?),
            "close" => Self::Close,
            "add-item" => Self::AddItem,
            "remove-item" => Self::RemoveItem(parse_index(attrs.index.as_deref())?),
            "import-repair-parts" => Self::ImportRepairParts,
            "save" => Self::Save,
            "open-create" => Self::OpenCreate,
            "create-submit" => Self::CreateSubmit,
            "reload-history" => Self::ReloadHistory(id()?),
            _ => return None,
        };
        Some(action)
    }
}

/// An `input`/`change` event routed through a `data-input` attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum InputAction {
    Search(String),
    Item {
        index: usize,
        field: ItemField,
        value: String,
    },
    Currency,
    /// Advanced filter inputs apply as soon as they change.
    Filter,
    /// Draft-only selects that wait for an explicit apply.
    Sort(String),
    Status(String),
}

impl InputAction {
    pub(crate) fn from_attrs(
        kind: &str,
        index: Option<&str>,
        field: Option<&str>,
        value: String,
    ) -> Option<Self> {
        let action = match kind.trim() {
            "search" => Self::Search(value),
            "item" => Self::Item {
                index: parse_index(index)?,
                field: ItemField::parse(field?)?,
                value,
            },
            "currency" => Self::Currency,
            "filter" => Self::Filter,
            "sort" => Self::Sort(value),
            "status" => Self::Status(value),
            _ => return None,
        };
        Some(action)
    }

    /// Whether the detail totals must be recomputed afterwards.
    pub(crate) fn affects_totals(&self) -> bool {
        match self {
            Self::Item { field, .. } => field.is_numeric(),
            Self::Currency => true,
            Self::Search(_) | Self::Filter | Self::Sort(_) | Self::Status(_) => false,
        }
    }
}

fn parse_index(raw: Option<&str>) -> Option<usize> {
    raw?.trim().parse().ok()
}
