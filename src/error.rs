//! Errors.

use crate::element::ElementId;
use crate::size::Axis;

pub type LayoutResult<T> = Result<T, LayoutError>;

/// Errors surfaced by the layout core.
///
/// Measurement and arrangement never fail; these are all rejected at a boundary.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum LayoutError {
    /// A size constraint component was negative or NaN.
    #[error("invalid {axis} constraint: {value}")]
    InvalidConstraint { axis: Axis, value: f64 },

    /// The element already has a native handler.
    #[error("element {0} already has a handler")]
    AlreadyBound(ElementId),

    /// The platform context was used after teardown.
    #[error("platform context is not initialized")]
    NotInitialized,

    /// The dispatcher behind a handle has been dropped.
    #[error("dispatcher has been closed")]
    DispatcherClosed,

    /// Platform options could not be parsed.
    #[error("invalid platform options: {0}")]
    Options(String),

    /// The element cannot be its own ancestor.
    #[error("element {0} cannot be added below itself")]
    CyclicChild(ElementId),
}
