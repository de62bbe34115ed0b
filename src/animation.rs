//! Cooperative property animations.
//!
//! An animation runs on the UI thread, one `tick` per frame. While it runs it keeps a batch open
//! on its element, so layout observers see a single commit when it ends, however it ends.

use crate::element::{Element, RenderProperty};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Easing curves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Ease {
    Linear,
    InQuad,
    OutQuad,
    InOutQuad,
    InCubic,
    OutCubic,
    InOutCubic,
}

impl Default for Ease {
    fn default() -> Self {
        Ease::Linear
    }
}

impl Ease {
    pub fn apply(self, t: f64) -> f64 {
        let t = t.max(0.).min(1.);
        match self {
            Ease::Linear => t,
            Ease::InQuad => t * t,
            Ease::OutQuad => 1. - (1. - t) * (1. - t),
            Ease::InOutQuad => {
                if t < 0.5 {
                    2. * t * t
                } else {
                    1. - (-2. * t + 2.).powi(2) / 2.
                }
            }
            Ease::InCubic => t * t * t,
            Ease::OutCubic => 1. - (1. - t).powi(3),
            Ease::InOutCubic => {
                if t < 0.5 {
                    4. * t * t * t
                } else {
                    1. - (-2. * t + 2.).powi(3) / 2.
                }
            }
        }
    }
}

/// A cancellation flag that can be shared across threads.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> CancelToken {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationStatus {
    Running,
    Finished,
    Cancelled,
}

#[derive(Debug, Clone, Copy)]
enum Target {
    To(f64),
    By(f64),
}

/// Animates one render property of an element.
#[derive(Debug)]
pub struct Animation {
    element: Arc<Element>,
    property: RenderProperty,
    target: Target,
    duration: Duration,
    elapsed: Duration,
    ease: Ease,
    cancel: CancelToken,
    /// `(from, to)`, resolved on the first tick.
    range: Option<(f64, f64)>,
    status: AnimationStatus,
}

impl Animation {
    fn new(
        element: Arc<Element>,
        property: RenderProperty,
        target: Target,
        duration: Duration,
    ) -> Animation {
        Animation {
            element,
            property,
            target,
            duration,
            elapsed: Duration::from_secs(0),
            ease: Ease::Linear,
            cancel: CancelToken::new(),
            range: None,
            status: AnimationStatus::Running,
        }
    }

    /// Animates `property` to `value`.
    pub fn to(
        element: Arc<Element>,
        property: RenderProperty,
        value: f64,
        duration: Duration,
    ) -> Animation {
        Animation::new(element, property, Target::To(value), duration)
    }

    /// Animates `property` by `delta`, relative to its value when the animation starts.
    pub fn by(
        element: Arc<Element>,
        property: RenderProperty,
        delta: f64,
        duration: Duration,
    ) -> Animation {
        Animation::new(element, property, Target::By(delta), duration)
    }

    pub fn with_ease(mut self, ease: Ease) -> Animation {
        self.ease = ease;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn status(&self) -> AnimationStatus {
        self.status
    }

    /// Advances the animation by `dt`.
    pub fn tick(&mut self, dt: Duration) -> AnimationStatus {
        if self.status != AnimationStatus::Running {
            return self.status;
        }
        if self.cancel.is_cancelled() {
            debug!(element = %self.element.id(), property = ?self.property, "animation cancelled");
            self.end(AnimationStatus::Cancelled);
            return self.status;
        }

        let (from, to) = match self.range {
            Some(range) => range,
            None => self.start(),
        };

        self.elapsed += dt;
        let t = if self.duration == Duration::from_secs(0) {
            1.
        } else {
            self.elapsed.as_secs_f64() / self.duration.as_secs_f64()
        };

        if t >= 1. {
            self.element.set_render_property(self.property, to);
            self.end(AnimationStatus::Finished);
        } else {
            let value = from + (to - from) * self.ease.apply(t);
            self.element.set_render_property(self.property, value);
        }
        self.status
    }

    /// Jumps to the end of the animation.
    pub fn finish(&mut self) -> AnimationStatus {
        let remaining = self.duration.checked_sub(self.elapsed).unwrap_or_default();
        self.tick(remaining)
    }

    fn start(&mut self) -> (f64, f64) {
        let from = self.element.render_property(self.property);
        let to = match self.target {
            Target::To(value) => value,
            Target::By(delta) => from + delta,
        };
        self.range = Some((from, to));
        self.element.batch_begin();
        debug!(element = %self.element.id(), property = ?self.property, from, to, "animation started");
        (from, to)
    }

    fn end(&mut self, status: AnimationStatus) {
        self.status = status;
        if self.range.is_some() {
            self.element.batch_commit();
        }
    }
}

impl Drop for Animation {
    fn drop(&mut self) {
        // a running animation that already started still holds its batch
        if self.status == AnimationStatus::Running && self.range.is_some() {
            self.end(AnimationStatus::Cancelled);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EASES: [Ease; 7] = [
        Ease::Linear,
        Ease::InQuad,
        Ease::OutQuad,
        Ease::InOutQuad,
        Ease::InCubic,
        Ease::OutCubic,
        Ease::InOutCubic,
    ];

    #[test]
    fn ease_endpoints_are_stable() {
        for ease in EASES.iter() {
            assert_eq!(ease.apply(0.), 0.);
            assert_eq!(ease.apply(1.), 1.);
            assert!(ease.apply(0.25) < ease.apply(0.75));
        }
    }

    #[test]
    fn fade_to() {
        let element = Element::new();
        let mut fade = Animation::to(
            Arc::clone(&element),
            RenderProperty::Opacity,
            0.1,
            Duration::from_millis(250),
        );

        assert_eq!(fade.tick(Duration::from_millis(100)), AnimationStatus::Running);
        assert!(element.is_batched());
        assert!(element.opacity() < 1. && element.opacity() > 0.1);

        assert_eq!(fade.tick(Duration::from_millis(200)), AnimationStatus::Finished);
        assert!((element.opacity() - 0.1).abs() < 0.001);
        assert!(!element.is_batched());
    }

    #[test]
    fn relative_rotation() {
        let element = Element::new();
        element.set_render_property(RenderProperty::Rotation, 30.);
        let mut rotate = Animation::by(
            Arc::clone(&element),
            RenderProperty::Rotation,
            20.,
            Duration::from_millis(250),
        )
        .with_ease(Ease::InOutCubic);
        assert_eq!(rotate.finish(), AnimationStatus::Finished);
        assert!((element.render_property(RenderProperty::Rotation) - 50.).abs() < 0.001);
    }

    #[test]
    fn cancel_closes_the_batch() {
        let element = Element::new();
        let mut scale = Animation::to(
            Arc::clone(&element),
            RenderProperty::Scale,
            2.,
            Duration::from_secs(1),
        );
        let token = scale.cancel_token();

        scale.tick(Duration::from_millis(10));
        assert!(element.is_batched());

        token.cancel();
        assert_eq!(scale.tick(Duration::from_millis(10)), AnimationStatus::Cancelled);
        assert!(!element.is_batched());
        assert!(element.render_property(RenderProperty::Scale) < 2.);
    }

    #[test]
    fn dropping_a_running_animation_closes_the_batch() {
        let element = Element::new();
        {
            let mut translate = Animation::to(
                Arc::clone(&element),
                RenderProperty::TranslationX,
                100.,
                Duration::from_secs(1),
            );
            translate.tick(Duration::from_millis(10));
            assert_eq!(element.batch_depth(), 1);
        }
        assert_eq!(element.batch_depth(), 0);
    }
}
