//! Incremental list rendering and line-item drafts shared by the RepairDesk
//! orders and quotes modules.
//!
//! Everything here is host-independent. The browser shell supplies the frame
//! clock, yield point, DOM sinks and data services through the traits in
//! [`render`] and [`service`].

pub mod config;
pub mod draft;
pub mod editor;
pub mod history;
pub mod markup;
pub mod paging;
pub mod profile;
pub mod query;
pub mod record;
pub mod render;
pub mod service;
pub mod session;
pub mod sync;
pub mod validation;
pub mod workflow;

pub use config::{ConfigError, ListConfig};
pub use draft::{DraftStore, ItemField};
pub use editor::{CommitError, DetailEditor, commit_with_service};
pub use paging::{PageWindow, Pagination};
pub use history::{FieldChange, HistoryAction, HistoryEntry, sort_history};
pub use profile::{
    CreateSource, ModuleProfile, NewItemPosition, ORDERS, QUOTES, is_approved_status,
};
pub use query::{
    AmountRange, DateRangeFilter, QueryCriteria, QuerySignature, QuickFilter, SortKey, TextFilter,
    apply_query, business_today,
};
pub use record::{
    DateField, HeaderPatch, LineItem, ListRecord, OrderRecord, QuoteRecord, RepairPart,
    RepairTicket, TextField,
};
pub use render::{
    ChunkBudget, ChunkPainter, DeviceClass, FrameClock, ListSink, PaintReport, PaintState,
    RenderError, RenderToken, RenderTokens, YieldPoint, run_chunked,
};
pub use service::{EntityService, MemoryEntityService, RepairPartsSource, ServiceError};
pub use session::{ListRenderPlan, ListSession, ListSummary};
pub use sync::{FormRow, FormSnapshot, Totals, TotalsDisplay, push_totals};
pub use validation::{ItemValidationError, ValidationPolicy, validate_items};
pub use workflow::{
    Conversion, ConvertError, CreateError, OrderConversion, RecordFactory, SourceOption,
    convert_quote_to_order, create_from_source, quote_options, repair_options,
};
