use std::fmt::Display;

use tracing::{debug, warn};

use super::{FrameClock, ListSink, RenderError, RenderToken, RenderTokens, YieldPoint};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChunkBudget {
    pub frame_budget_ms: f64,
    pub max_items_per_frame: usize,
}

impl ChunkBudget {
    pub const MOBILE: Self = Self {
        frame_budget_ms: 10.0,
        max_items_per_frame: 10,
    };
    pub const DESKTOP: Self = Self {
        frame_budget_ms: 12.0,
        max_items_per_frame: 16,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceClass {
    Mobile,
    Desktop,
}

impl DeviceClass {
    pub const DEFAULT_BREAKPOINT_PX: f64 = 640.0;

    #[must_use]
    pub fn from_viewport_width(width: f64, breakpoint: f64) -> Self {
        if width <= breakpoint {
            Self::Mobile
        } else {
            Self::Desktop
        }
    }

    /// Number of skeleton cards shown while the first frame is pending.
    #[must_use]
    pub fn placeholder_cards(self) -> usize {
        match self {
            Self::Mobile => 6,
            Self::Desktop => 8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaintState {
    Idle,
    Scheduled,
    Painting(RenderToken),
    Complete,
    Superseded,
    /// The sink rejected a write; no further frames run.
    Aborted,
}

impl PaintState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Superseded | Self::Aborted)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaintReport {
    pub state: PaintState,
    pub painted: usize,
    pub skipped: usize,
    pub frames: usize,
}

/// Frame-stepped paint of one ordered item sequence under one token.
#[derive(Debug)]
pub struct ChunkPainter<T> {
    items: Vec<T>,
    next: usize,
    token: RenderToken,
    tokens: RenderTokens,
    budget: ChunkBudget,
    state: PaintState,
    cleared: bool,
    painted: usize,
    skipped: usize,
    frames: usize,
}

impl<T> ChunkPainter<T> {
    #[must_use]
    pub fn new(
        items: Vec<T>,
        token: RenderToken,
        tokens: RenderTokens,
        budget: ChunkBudget,
    ) -> Self {
        let budget = ChunkBudget {
            max_items_per_frame: budget.max_items_per_frame.max(1),
            ..budget
        };
        Self {
            items,
            next: 0,
            token,
            tokens,
            budget,
            state: PaintState::Idle,
            cleared: false,
            painted: 0,
            skipped: 0,
            frames: 0,
        }
    }

    /// Current state. A pass that is not yet terminal reads as superseded
    /// as soon as a newer token exists.
    #[must_use]
    pub fn state(&self) -> PaintState {
        if !self.state.is_terminal() && !self.tokens.is_current(self.token) {
            return PaintState::Superseded;
        }
        self.state
    }

    #[must_use]
    pub fn token(&self) -> RenderToken {
        self.token
    }

    #[must_use]
    pub fn report(&self) -> PaintReport {
        PaintReport {
            state: self.state(),
            painted: self.painted,
            skipped: self.skipped,
            frames: self.frames,
        }
    }

    /// Marks the sink as loading. A stale token is superseded before any write.
    pub fn schedule<S: ListSink>(&mut self, sink: &mut S) -> Result<PaintState, RenderError> {
        if self.state != PaintState::Idle {
            return Ok(self.state);
        }
        if self.supersede_if_stale() {
            return Ok(self.state);
        }
        self.guard(sink.set_loading(true))?;
        self.state = PaintState::Scheduled;
        Ok(self.state)
    }

    /// Runs one frame's worth of rendering.
    ///
    /// Row failures are logged and skipped. Nothing reaches the sink once a
    /// newer token exists.
    pub fn paint_frame<S, C, F, E>(
        &mut self,
        render_one: &mut F,
        sink: &mut S,
        clock: &C,
    ) -> Result<PaintState, RenderError>
    where
        S: ListSink,
        C: FrameClock,
        F: FnMut(&T) -> Result<String, E>,
        E: Display,
    {
        if self.state.is_terminal() {
            return Ok(self.state);
        }
        if self.supersede_if_stale() {
            return Ok(self.state);
        }
        self.state = PaintState::Painting(self.token);

        if !self.cleared {
            self.guard(sink.clear())?;
            self.cleared = true;
        }

        let started = clock.now_ms();
        let mut buffer = String::new();
        let mut count = 0;
        while self.next < self.items.len() && count < self.budget.max_items_per_frame {
            match render_one(&self.items[self.next]) {
                Ok(markup) => {
                    buffer.push_str(&markup);
                    self.painted += 1;
                }
                Err(error) => {
                    warn!(index = self.next, error = %error, "skipping row that failed to render");
                    self.skipped += 1;
                }
            }
            self.next += 1;
            count += 1;
            if clock.now_ms() - started >= self.budget.frame_budget_ms {
                break;
            }
        }

        if self.supersede_if_stale() {
            return Ok(self.state);
        }
        if !buffer.is_empty() {
            self.guard(sink.append_markup(&buffer))?;
        }
        self.frames += 1;

        if self.next >= self.items.len() {
            self.guard(sink.set_loading(false))?;
            self.state = PaintState::Complete;
        }
        Ok(self.state)
    }

    fn supersede_if_stale(&mut self) -> bool {
        if self.tokens.is_current(self.token) {
            return false;
        }
        debug!(
            token = self.token.value(),
            painted = self.painted,
            remaining = self.items.len().saturating_sub(self.next),
            "render pass superseded"
        );
        self.state = PaintState::Superseded;
        true
    }

    fn guard(&mut self, result: Result<(), RenderError>) -> Result<(), RenderError> {
        if result.is_err() {
            self.state = PaintState::Aborted;
        }
        result
    }
}

/// Drives `painter` to a terminal state, yielding before every frame.
pub async fn run_chunked<T, F, E, S, C, Y>(
    painter: &mut ChunkPainter<T>,
    mut render_one: F,
    sink: &mut S,
    clock: &C,
    yield_point: &Y,
) -> Result<PaintReport, RenderError>
where
    F: FnMut(&T) -> Result<String, E>,
    E: Display,
    S: ListSink,
    C: FrameClock,
    Y: YieldPoint + ?Sized,
{
    painter.schedule(sink)?;
    while !painter.state().is_terminal() {
        yield_point.yield_frame().await;
        painter.paint_frame(&mut render_one, sink, clock)?;
    }
    Ok(painter.report())
}
