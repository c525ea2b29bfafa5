use std::cell::Cell;
use std::rc::Rc;

/// Identifies one top-level update cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RenderToken(u64);

impl RenderToken {
    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }
}

/// Issues strictly increasing render tokens.
///
/// Clones share the same counter, so a painter holding a clone sees every
/// token issued after it started.
#[derive(Debug, Clone, Default)]
pub struct RenderTokens {
    latest: Rc<Cell<u64>>,
}

impl RenderTokens {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Invalidates every in-flight pass and returns the new current token.
    pub fn begin_render(&self) -> RenderToken {
        let next = self.latest.get().saturating_add(1);
        self.latest.set(next);
        RenderToken(next)
    }

    /// `None` until the first pass begins.
    #[must_use]
    pub fn current(&self) -> Option<RenderToken> {
        match self.latest.get() {
            0 => None,
            value => Some(RenderToken(value)),
        }
    }

    #[must_use]
    pub fn is_current(&self, token: RenderToken) -> bool {
        self.latest.get() == token.0
    }
}
