//! Native handler capabilities.
//!
//! A handler is the association between an element and its native peer. Rather than sitting at
//! some position in a class hierarchy, a handler exposes whichever capabilities its peer supports
//! and the layout core asks for them when it needs them.

use crate::rect::Rect;
use crate::size::{Size, SizeConstraint, SizeRequest};
use core::any::Any;
use core::fmt;

/// A native peer that can measure itself.
pub trait NativeMeasurable {
    /// Runs the native measurement primitive.
    fn measure_native(&self, constraint: SizeConstraint) -> SizeRequest;

    /// The size the peer would like under `constraint`; used when folding a parent's size.
    fn desired_size(&self, constraint: SizeConstraint) -> Size {
        self.measure_native(constraint).request
    }
}

/// A native peer that can be placed.
pub trait NativeArrangeable {
    /// Runs the native arrangement primitive. `rect` is in the parent's local coordinates.
    fn arrange_native(&self, rect: Rect);
}

/// The association between an element and its native peer.
pub trait Handler: Any + fmt::Debug + Send + Sync {
    /// For downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Returns the measurement capability, if the peer has one.
    fn measurable(&self) -> Option<&dyn NativeMeasurable> {
        None
    }

    /// Returns the arrangement capability, if the peer has one.
    fn arrangeable(&self) -> Option<&dyn NativeArrangeable> {
        None
    }
}
