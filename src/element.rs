//! Elements: the property surface the layout core reads and the source of invalidations.

use crate::error::{LayoutError, LayoutResult};
use crate::events::{
    BatchCommitted, EventHandler, MeasureInvalidated, Observers, SizeChanged, Subscription,
};
use crate::handler::Handler;
use crate::invalidation::{CommitOutcome, InvalidationReason, InvalidationTracker};
use crate::rect::Rect;
use core::fmt;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::thread;
use tracing::{debug, trace, warn};
use uuid::Uuid;

/// A unique identifier for an element.
///
/// (this is just a UUID)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ElementId(Uuid);

impl ElementId {
    pub(crate) fn new() -> ElementId {
        ElementId(Uuid::new_v4())
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Visual properties that are applied by the native layer after layout.
///
/// None of these affect measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderProperty {
    Opacity,
    TranslationX,
    TranslationY,
    Scale,
    Rotation,
    RotationX,
    RotationY,
}

#[derive(Debug, Clone)]
struct Props {
    width_request: Option<f64>,
    height_request: Option<f64>,
    minimum_width_request: Option<f64>,
    minimum_height_request: Option<f64>,
    is_visible: bool,
    is_platform_enabled: bool,
    is_native_state_consistent: bool,

    opacity: f64,
    translation_x: f64,
    translation_y: f64,
    scale: f64,
    rotation: f64,
    rotation_x: f64,
    rotation_y: f64,

    bounds: Rect,
    mocked_bounds: Option<Rect>,
}

impl Default for Props {
    fn default() -> Self {
        Props {
            width_request: None,
            height_request: None,
            minimum_width_request: None,
            minimum_height_request: None,
            is_visible: true,
            is_platform_enabled: false,
            is_native_state_consistent: true,
            opacity: 1.,
            translation_x: 0.,
            translation_y: 0.,
            scale: 1.,
            rotation: 0.,
            rotation_x: 0.,
            rotation_y: 0.,
            bounds: Rect::zero(),
            mocked_bounds: None,
        }
    }
}

/// A consistent snapshot of the properties measurement depends on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct MeasureProps {
    pub is_visible: bool,
    pub is_platform_enabled: bool,
    pub width_request: Option<f64>,
    pub height_request: Option<f64>,
    pub minimum_width_request: Option<f64>,
    pub minimum_height_request: Option<f64>,
}

/// An element in the visual tree.
///
/// Elements are always handled through an `Arc`. All methods must be called from the UI thread;
/// the locks inside only exist so elements can be moved into work marshalled onto that thread.
pub struct Element {
    id: ElementId,
    props: Mutex<Props>,
    tracker: Mutex<InvalidationTracker>,
    handler: Mutex<Option<Arc<dyn Handler>>>,
    parent: Mutex<Weak<Element>>,
    children: Mutex<Vec<Arc<Element>>>,
    measure_invalidated: Observers<MeasureInvalidated>,
    batch_committed: Observers<BatchCommitted>,
    size_changed: Observers<SizeChanged>,
}

impl Element {
    pub fn new() -> Arc<Element> {
        Arc::new(Element {
            id: ElementId::new(),
            props: Mutex::new(Props::default()),
            tracker: Mutex::new(InvalidationTracker::new()),
            handler: Mutex::new(None),
            parent: Mutex::new(Weak::new()),
            children: Mutex::new(Vec::new()),
            measure_invalidated: Observers::new(),
            batch_committed: Observers::new(),
            size_changed: Observers::new(),
        })
    }

    pub fn id(&self) -> ElementId {
        self.id
    }

    /// Sets a property and reports whether it changed. Invalidates measure on change if a reason
    /// is given.
    fn update<T, F>(&self, reason: Option<InvalidationReason>, field: F, value: T) -> bool
    where
        T: PartialEq,
        F: FnOnce(&mut Props) -> &mut T,
    {
        let changed = {
            let mut props = self.props.lock();
            let slot = field(&mut *props);
            if *slot == value {
                false
            } else {
                *slot = value;
                true
            }
        };
        if let (true, Some(reason)) = (changed, reason) {
            self.invalidate_measure(reason);
        }
        changed
    }

    // size requests

    pub fn width_request(&self) -> Option<f64> {
        self.props.lock().width_request
    }

    pub fn set_width_request(&self, value: Option<f64>) {
        self.update(
            Some(InvalidationReason::SizeRequest),
            |p| &mut p.width_request,
            value,
        );
    }

    pub fn height_request(&self) -> Option<f64> {
        self.props.lock().height_request
    }

    pub fn set_height_request(&self, value: Option<f64>) {
        self.update(
            Some(InvalidationReason::SizeRequest),
            |p| &mut p.height_request,
            value,
        );
    }

    /// Sets both size requests inside one batch, so at most one invalidation fires.
    pub fn set_size_request(&self, width: Option<f64>, height: Option<f64>) {
        self.with_batch(|| {
            self.set_width_request(width);
            self.set_height_request(height);
        })
    }

    pub fn minimum_width_request(&self) -> Option<f64> {
        self.props.lock().minimum_width_request
    }

    pub fn set_minimum_width_request(&self, value: Option<f64>) {
        self.update(
            Some(InvalidationReason::MinimumSizeRequest),
            |p| &mut p.minimum_width_request,
            value,
        );
    }

    pub fn minimum_height_request(&self) -> Option<f64> {
        self.props.lock().minimum_height_request
    }

    pub fn set_minimum_height_request(&self, value: Option<f64>) {
        self.update(
            Some(InvalidationReason::MinimumSizeRequest),
            |p| &mut p.minimum_height_request,
            value,
        );
    }

    // state flags

    pub fn is_visible(&self) -> bool {
        self.props.lock().is_visible
    }

    pub fn set_visible(&self, value: bool) {
        self.update(
            Some(InvalidationReason::Visibility),
            |p| &mut p.is_visible,
            value,
        );
    }

    pub fn is_platform_enabled(&self) -> bool {
        self.props.lock().is_platform_enabled
    }

    pub fn set_platform_enabled(&self, value: bool) {
        self.update(
            Some(InvalidationReason::PlatformEnabled),
            |p| &mut p.is_platform_enabled,
            value,
        );
    }

    pub fn is_native_state_consistent(&self) -> bool {
        self.props.lock().is_native_state_consistent
    }

    /// Marks the native state as (in)consistent. Only becoming consistent again invalidates.
    pub fn set_native_state_consistent(&self, value: bool) {
        let changed = self.update(None, |p| &mut p.is_native_state_consistent, value);
        if changed && value {
            self.invalidate_measure(InvalidationReason::NativeState);
        }
    }

    /// Called by the native layer when its intrinsic size changed.
    pub fn native_size_changed(&self) {
        self.invalidate_measure(InvalidationReason::NativeSize);
    }

    // render properties

    pub fn render_property(&self, property: RenderProperty) -> f64 {
        let props = self.props.lock();
        match property {
            RenderProperty::Opacity => props.opacity,
            RenderProperty::TranslationX => props.translation_x,
            RenderProperty::TranslationY => props.translation_y,
            RenderProperty::Scale => props.scale,
            RenderProperty::Rotation => props.rotation,
            RenderProperty::RotationX => props.rotation_x,
            RenderProperty::RotationY => props.rotation_y,
        }
    }

    /// Sets a render property. Opacity is clamped into `[0, 1]`.
    pub fn set_render_property(&self, property: RenderProperty, value: f64) {
        let mut props = self.props.lock();
        match property {
            RenderProperty::Opacity => props.opacity = value.max(0.).min(1.),
            RenderProperty::TranslationX => props.translation_x = value,
            RenderProperty::TranslationY => props.translation_y = value,
            RenderProperty::Scale => props.scale = value,
            RenderProperty::Rotation => props.rotation = value,
            RenderProperty::RotationX => props.rotation_x = value,
            RenderProperty::RotationY => props.rotation_y = value,
        }
    }

    pub fn opacity(&self) -> f64 {
        self.render_property(RenderProperty::Opacity)
    }

    pub fn set_opacity(&self, value: f64) {
        self.set_render_property(RenderProperty::Opacity, value)
    }

    // bounds

    /// The current bounds, or the mocked bounds if there are any.
    pub fn bounds(&self) -> Rect {
        let props = self.props.lock();
        props.mocked_bounds.unwrap_or(props.bounds)
    }

    /// Assigns the element's bounds. Fires `SizeChanged` if the size changed.
    pub fn layout(&self, rect: Rect) {
        let old = {
            let mut props = self.props.lock();
            let old = props.bounds;
            props.bounds = rect;
            old
        };
        trace!(element = %self.id, ?rect, "layout");
        if old.size != rect.size {
            self.size_changed.emit(&SizeChanged { old, new: rect });
        }
    }

    /// Temporarily reports `rect` as the bounds without changing them or firing anything.
    pub fn mock_bounds(&self, rect: Rect) {
        self.props.lock().mocked_bounds = Some(rect);
    }

    pub fn unmock_bounds(&self) {
        self.props.lock().mocked_bounds = None;
    }

    pub(crate) fn measure_props(&self) -> MeasureProps {
        let props = self.props.lock();
        MeasureProps {
            is_visible: props.is_visible,
            is_platform_enabled: props.is_platform_enabled,
            width_request: props.width_request,
            height_request: props.height_request,
            minimum_width_request: props.minimum_width_request,
            minimum_height_request: props.minimum_height_request,
        }
    }

    // handler

    pub fn handler(&self) -> Option<Arc<dyn Handler>> {
        self.handler.lock().clone()
    }

    pub fn has_handler(&self) -> bool {
        self.handler.lock().is_some()
    }

    /// Binds the native handler. Only the platform context does this, and only once.
    pub(crate) fn bind_handler(&self, handler: Arc<dyn Handler>) -> LayoutResult<()> {
        let mut slot = self.handler.lock();
        if slot.is_some() {
            return Err(LayoutError::AlreadyBound(self.id));
        }
        *slot = Some(handler);
        Ok(())
    }

    // tree

    pub fn parent(&self) -> Option<Arc<Element>> {
        self.parent.lock().upgrade()
    }

    /// Returns a snapshot of the children.
    pub fn children(&self) -> Vec<Arc<Element>> {
        self.children.lock().clone()
    }

    /// Appends a child. A child that already has another parent is detached from it first.
    ///
    /// Fails with `CyclicChild` if `child` is this element or one of its ancestors.
    pub fn add_child(self: &Arc<Self>, child: Arc<Element>) -> LayoutResult<()> {
        if self.is_self_or_descendant_of(&child) {
            return Err(LayoutError::CyclicChild(child.id));
        }
        if let Some(old_parent) = child.parent() {
            old_parent.remove_child(&child);
        }
        *child.parent.lock() = Arc::downgrade(self);
        self.children.lock().push(child);
        self.invalidate_measure(InvalidationReason::Children);
        Ok(())
    }

    fn is_self_or_descendant_of(&self, ancestor: &Element) -> bool {
        if self.id == ancestor.id {
            return true;
        }
        let mut current = self.parent();
        while let Some(element) = current {
            if element.id == ancestor.id {
                return true;
            }
            current = element.parent();
        }
        false
    }

    /// Removes a child. Returns false if it was not a child of this element.
    pub fn remove_child(&self, child: &Element) -> bool {
        let removed = {
            let mut children = self.children.lock();
            let len = children.len();
            children.retain(|c| c.id != child.id);
            children.len() != len
        };
        if removed {
            *child.parent.lock() = Weak::new();
            self.invalidate_measure(InvalidationReason::Children);
        }
        removed
    }

    // invalidation

    /// Marks the measurement as stale. Fires now unless a batch is open.
    pub fn invalidate_measure(&self, reason: InvalidationReason) {
        let fire = self.tracker.lock().invalidate(reason);
        if let Some(reason) = fire {
            debug!(element = %self.id, ?reason, "measure invalidated");
            self.measure_invalidated.emit(&MeasureInvalidated { reason });
        }
    }

    pub fn is_batched(&self) -> bool {
        self.tracker.lock().is_batched()
    }

    pub fn batch_depth(&self) -> usize {
        self.tracker.lock().depth()
    }

    /// Opens a batch. Must be paired with `batch_commit`; prefer `batch` or `with_batch`.
    pub fn batch_begin(&self) {
        self.tracker.lock().begin();
    }

    /// Closes a batch.
    pub fn batch_commit(&self) {
        let outcome = self.tracker.lock().commit();
        self.dispatch_commit(outcome);
    }

    fn dispatch_commit(&self, outcome: CommitOutcome) {
        if let Some(reason) = outcome.fire {
            debug!(element = %self.id, ?reason, "coalesced measure invalidation");
            self.measure_invalidated.emit(&MeasureInvalidated { reason });
        }
        if outcome.batch_closed {
            self.batch_committed.emit(&BatchCommitted);
        }
    }

    /// Opens a batch that is committed when the returned guard is dropped, including while
    /// unwinding.
    pub fn batch(&self) -> BatchGuard<'_> {
        self.batch_begin();
        BatchGuard { element: self }
    }

    /// Runs `f` inside a batch.
    pub fn with_batch<R, F: FnOnce() -> R>(&self, f: F) -> R {
        let _guard = self.batch();
        f()
    }

    /// Runs a fallible `f` inside a batch. The batch is committed before the result, error or
    /// not, is handed back unchanged.
    pub fn try_batch<T, E, F: FnOnce() -> Result<T, E>>(&self, f: F) -> Result<T, E> {
        let guard = self.batch();
        let result = f();
        if result.is_err() {
            debug!(element = %self.id, "batch scope exited with an error");
        }
        drop(guard);
        result
    }

    // observers

    pub fn on_measure_invalidated<F>(&self, handler: F) -> Subscription<MeasureInvalidated>
    where
        F: 'static + Fn(&MeasureInvalidated) + Send + Sync,
    {
        self.measure_invalidated.subscribe(EventHandler::new(handler))
    }

    pub fn remove_measure_invalidated(&self, sub: Subscription<MeasureInvalidated>) -> bool {
        self.measure_invalidated.unsubscribe(sub)
    }

    pub fn on_batch_committed<F>(&self, handler: F) -> Subscription<BatchCommitted>
    where
        F: 'static + Fn(&BatchCommitted) + Send + Sync,
    {
        self.batch_committed.subscribe(EventHandler::new(handler))
    }

    pub fn remove_batch_committed(&self, sub: Subscription<BatchCommitted>) -> bool {
        self.batch_committed.unsubscribe(sub)
    }

    pub fn on_size_changed<F>(&self, handler: F) -> Subscription<SizeChanged>
    where
        F: 'static + Fn(&SizeChanged) + Send + Sync,
    {
        self.size_changed.subscribe(EventHandler::new(handler))
    }

    pub fn remove_size_changed(&self, sub: Subscription<SizeChanged>) -> bool {
        self.size_changed.unsubscribe(sub)
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Element")
            .field("id", &self.id)
            .field("props", &*self.props.lock())
            .field("batch_depth", &self.tracker.lock().depth())
            .field("handler", &*self.handler.lock())
            .field("children", &self.children.lock().len())
            .finish()
    }
}

/// Keeps a batch open on an element until dropped.
#[must_use = "the batch is committed as soon as the guard is dropped"]
pub struct BatchGuard<'a> {
    element: &'a Element,
}

impl<'a> Drop for BatchGuard<'a> {
    fn drop(&mut self) {
        if thread::panicking() {
            warn!(element = %self.element.id, "batch closed while unwinding");
        }
        self.element.batch_commit();
    }
}
