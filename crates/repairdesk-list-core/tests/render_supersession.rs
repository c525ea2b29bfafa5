use std::cell::Cell;
use std::convert::Infallible;

use futures::executor::block_on;
use proptest::prelude::*;
use repairdesk_list_core::render::{ImmediateYield, MemorySink};
use repairdesk_list_core::{
    ChunkBudget, ChunkPainter, FrameClock, ListSink, PaintState, RenderError, RenderTokens,
    run_chunked,
};

struct FixedClock(Cell<f64>);

impl FrameClock for FixedClock {
    fn now_ms(&self) -> f64 {
        self.0.get()
    }
}

/// Sink wrapper that records which pass produced each write.
struct TaggedSink<'a> {
    inner: &'a mut MemorySink,
    log: &'a mut Vec<&'static str>,
    tag: &'static str,
}

impl ListSink for TaggedSink<'_> {
    fn clear(&mut self) -> Result<(), RenderError> {
        self.log.push(self.tag);
        self.inner.clear()
    }

    fn append_markup(&mut self, markup: &str) -> Result<(), RenderError> {
        self.log.push(self.tag);
        self.inner.append_markup(markup)
    }

    fn set_loading(&mut self, loading: bool) -> Result<(), RenderError> {
        self.log.push(self.tag);
        self.inner.set_loading(loading)
    }
}

fn render(tag: &'static str) -> impl FnMut(&usize) -> Result<String, Infallible> {
    move |index| Ok(format!("[{tag}{index}]"))
}

fn expected(tag: &str, count: usize) -> String {
    (0..count).map(|index| format!("[{tag}{index}]")).collect()
}

proptest! {
    #[test]
    fn only_the_latest_pass_is_visible(
        old_len in 0_usize..60,
        new_len in 0_usize..60,
        old_frames_first in 0_usize..4,
        schedule in prop::collection::vec(any::<bool>(), 0..40),
    ) {
        let tokens = RenderTokens::new();
        let clock = FixedClock(Cell::new(0.0));
        let mut sink = MemorySink::default();
        let mut log = Vec::new();

        let old_token = tokens.begin_render();
        let mut old = ChunkPainter::new(
            (0..old_len).collect(),
            old_token,
            tokens.clone(),
            ChunkBudget::MOBILE,
        );
        let mut old_render = render("a");
        old.schedule(&mut TaggedSink {
            inner: &mut sink,
            log: &mut log,
            tag: "old",
        })
        .expect("schedule");
        for _ in 0..old_frames_first {
            old.paint_frame(
                &mut old_render,
                &mut TaggedSink { inner: &mut sink, log: &mut log, tag: "old" },
                &clock,
            )
            .expect("frame");
        }

        let old_writes_before_new = log.len();
        let new_token = tokens.begin_render();
        let mut new = ChunkPainter::new(
            (0..new_len).collect(),
            new_token,
            tokens.clone(),
            ChunkBudget::MOBILE,
        );
        let mut new_render = render("b");
        new.schedule(&mut TaggedSink {
            inner: &mut sink,
            log: &mut log,
            tag: "new",
        })
        .expect("schedule");

        for step_old in schedule {
            if step_old {
                old.paint_frame(
                    &mut old_render,
                    &mut TaggedSink { inner: &mut sink, log: &mut log, tag: "old" },
                    &clock,
                )
                .expect("frame");
            } else {
                new.paint_frame(
                    &mut new_render,
                    &mut TaggedSink { inner: &mut sink, log: &mut log, tag: "new" },
                    &clock,
                )
                .expect("frame");
            }
        }
        while !new.state().is_terminal() {
            new.paint_frame(
                &mut new_render,
                &mut TaggedSink { inner: &mut sink, log: &mut log, tag: "new" },
                &clock,
            )
            .expect("frame");
        }

        prop_assert_eq!(new.state(), PaintState::Complete);
        prop_assert!(old.state() == PaintState::Superseded || old.state() == PaintState::Complete);
        prop_assert!(log[old_writes_before_new..].iter().all(|tag| *tag == "new"));
        prop_assert_eq!(&sink.markup, &expected("b", new_len));
        prop_assert!(!sink.loading);
    }
}

#[test]
fn async_driver_paints_every_row_in_order() {
    let tokens = RenderTokens::new();
    let token = tokens.begin_render();
    let mut painter = ChunkPainter::new((0..45).collect(), token, tokens, ChunkBudget::DESKTOP);
    let mut sink = MemorySink::default();
    let clock = FixedClock(Cell::new(0.0));

    let report = block_on(run_chunked(
        &mut painter,
        render("r"),
        &mut sink,
        &clock,
        &ImmediateYield,
    ))
    .expect("paint");
    assert_eq!(report.state, PaintState::Complete);
    assert_eq!(report.painted, 45);
    assert_eq!(report.frames, 3);
    assert_eq!(sink.markup, expected("r", 45));
}

#[test]
fn a_pass_superseded_before_its_first_frame_writes_nothing() {
    let tokens = RenderTokens::new();
    let stale = tokens.begin_render();
    let mut painter =
        ChunkPainter::new((0..5).collect(), stale, tokens.clone(), ChunkBudget::DESKTOP);
    let mut sink = MemorySink::default();
    let clock = FixedClock(Cell::new(0.0));
    painter.schedule(&mut sink).expect("schedule");
    let writes = sink.writes;

    tokens.begin_render();
    let report = block_on(run_chunked(
        &mut painter,
        render("x"),
        &mut sink,
        &clock,
        &ImmediateYield,
    ))
    .expect("paint");
    assert_eq!(report.state, PaintState::Superseded);
    assert_eq!(report.frames, 0);
    assert_eq!(sink.writes, writes);
}
