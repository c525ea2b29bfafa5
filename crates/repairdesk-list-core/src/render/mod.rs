mod chunk;
mod token;

use async_trait::async_trait;
use thiserror::Error;

pub use chunk::{ChunkBudget, ChunkPainter, DeviceClass, PaintReport, PaintState, run_chunked};
pub use token::{RenderToken, RenderTokens};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("list container unavailable: {0}")]
    Sink(String),
    #[error("row render failed: {0}")]
    Row(String),
}

/// Destination of a chunked paint, usually one DOM container.
pub trait ListSink {
    fn clear(&mut self) -> Result<(), RenderError>;
    fn append_markup(&mut self, markup: &str) -> Result<(), RenderError>;
    fn set_loading(&mut self, loading: bool) -> Result<(), RenderError>;
}

pub trait FrameClock {
    fn now_ms(&self) -> f64;
}

/// Cedes control to the host loop until the next frame.
#[async_trait(?Send)]
pub trait YieldPoint {
    async fn yield_frame(&self);
}

/// Yield point that resumes immediately. Host tests drive painters with it.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImmediateYield;

#[async_trait(?Send)]
impl YieldPoint for ImmediateYield {
    async fn yield_frame(&self) {}
}

/// In-memory sink that keeps the resulting markup and a write log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemorySink {
    pub markup: String,
    pub loading: bool,
    pub writes: usize,
}

impl ListSink for MemorySink {
    fn clear(&mut self) -> Result<(), RenderError> {
        self.markup.clear();
        self.writes += 1;
        Ok(())
    }

    fn append_markup(&mut self, markup: &str) -> Result<(), RenderError> {
        self.markup.push_str(markup);
        self.writes += 1;
        Ok(())
    }

    fn set_loading(&mut self, loading: bool) -> Result<(), RenderError> {
        self.loading = loading;
        self.writes += 1;
        Ok(())
    }
}
