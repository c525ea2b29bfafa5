use super::*;

/// Resumes on the next `requestAnimationFrame`, or after a zero timeout when
/// the window cannot schedule frames (background tabs, detached documents).
pub(super) struct AnimationFrameYield;

#[async_trait(?Send)]
impl YieldPoint for AnimationFrameYield {
    async fn yield_frame(&self) {
        let Some(window) = web_sys::window() else {
            gloo_timers::future::TimeoutFuture::new(0).await;
            return;
        };
        let mut scheduled = true;
        let promise = js_sys::Promise::new(&mut |resolve, _reject| {
            if window.request_animation_frame(&resolve).is_err() {
                scheduled = false;
            }
        });
        if scheduled {
            let _ = JsFuture::from(promise).await;
        } else {
            gloo_timers::future::TimeoutFuture::new(0).await;
        }
    }
}

pub(super) struct PerformanceClock {
    performance: Option<web_sys::Performance>,
}

impl PerformanceClock {
    pub(super) fn new() -> Self {
        Self {
            performance: web_sys::window().and_then(|window| window.performance()),
        }
    }
}

impl FrameClock for PerformanceClock {
    fn now_ms(&self) -> f64 {
        match &self.performance {
            Some(performance) => performance.now(),
            None => js_sys::Date::now(),
        }
    }
}
