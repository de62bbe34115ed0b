//! Layout core for native-backed element trees.
//!
//! # Conceptual overview
//! Elements carry the properties layout cares about (size requests, minimum size requests,
//! visibility) and a handler, which binds them to a native peer. The native peer does the real
//! work of measuring and drawing; this crate decides when it must be asked and how its answers
//! are combined.
//!
//! ## Measure and arrange
//! A host scheduler first measures an element under a [`SizeConstraint`]. The native size is
//! obtained from the [`PlatformServices`], the desired sizes of the element's native visual
//! children are folded in, and the element's own requests are applied on top. Later the host
//! arranges the element in its final [`Rect`]: the element and its native peer are placed first,
//! then each native child is given the parent's area in the parent's local coordinates.
//!
//! ## Invalidation and batching
//! Changing a property that affects measurement invalidates the element, which notifies the
//! `measure invalidated` observers so the host can schedule a new pass. Batches coalesce this:
//! while a batch is open invalidations are only recorded, and closing the outermost batch fires
//! at most one notification. [`Element::batch`] returns a guard that closes the batch on every
//! exit path.
//!
//! ## Threading
//! Everything here runs on one UI thread. Work started elsewhere (timers, animations) is
//! marshalled onto it with a [`Dispatcher`].
//!
//! ## Platform context
//! There is no global platform state. A [`PlatformContext`] is created by the platform bootstrap
//! and passed to whoever needs it; it owns the platform services and is the only way to bind a
//! handler to an element.

pub mod animation;
mod arrange;
pub mod color;
mod context;
mod dispatch;
mod element;
mod error;
pub mod events;
mod handler;
mod invalidation;
mod measure;
mod rect;
mod size;
mod tree;

pub use arrange::ArrangeEngine;
pub use context::{
    FlowDirection, InitializationFlag, NativeServices, PlatformContext, PlatformOptions,
    PlatformServices,
};
pub use dispatch::{DispatchHandle, Dispatcher};
pub use element::{BatchGuard, Element, ElementId, RenderProperty};
pub use error::{LayoutError, LayoutResult};
pub use handler::{Handler, NativeArrangeable, NativeMeasurable};
pub use invalidation::{CommitOutcome, InvalidationReason, InvalidationTracker};
pub use measure::MeasureEngine;
pub use rect::Rect;
pub use size::{Axis, Size, SizeConstraint, SizeRequest};
pub use tree::{visual_children, VisualChildren, VisualComposite};
