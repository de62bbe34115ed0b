//! Sizes, constraints and size requests.

use crate::error::{LayoutError, LayoutResult};
use cgmath::{Vector2, Zero};
use core::fmt;

/// A width/height pair. `x` is the width and `y` is the height.
pub type Size = Vector2<f64>;

/// One of the two layout axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Width,
    Height,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Axis::Width => write!(f, "width"),
            Axis::Height => write!(f, "height"),
        }
    }
}

/// The space available to an element during measurement.
///
/// Each component is either finite and non-negative or positive infinity, which means the axis
/// is unconstrained.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizeConstraint {
    width: f64,
    height: f64,
}

impl SizeConstraint {
    /// Creates a constraint, rejecting negative and NaN components.
    pub fn new(width: f64, height: f64) -> LayoutResult<SizeConstraint> {
        Ok(SizeConstraint {
            width: check_component(Axis::Width, width)?,
            height: check_component(Axis::Height, height)?,
        })
    }

    /// A constraint that is unbounded in both directions.
    pub const fn unconstrained() -> SizeConstraint {
        SizeConstraint {
            width: f64::INFINITY,
            height: f64::INFINITY,
        }
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn get(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Width => self.width,
            Axis::Height => self.height,
        }
    }

    pub fn is_width_constrained(&self) -> bool {
        self.width.is_finite()
    }

    pub fn is_height_constrained(&self) -> bool {
        self.height.is_finite()
    }

    /// Returns true if the constraint leaves no room at all on some axis.
    pub fn is_zero_area(&self) -> bool {
        self.width == 0. || self.height == 0.
    }
}

fn check_component(axis: Axis, value: f64) -> LayoutResult<f64> {
    if value.is_nan() || value < 0. {
        Err(LayoutError::InvalidConstraint { axis, value })
    } else {
        Ok(value)
    }
}

/// The outcome of measuring an element.
///
/// `request` is the size the element would like; `minimum` is the size it must not be
/// compressed below. `minimum` never exceeds `request` on a finite axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizeRequest {
    pub request: Size,
    pub minimum: Size,
}

impl SizeRequest {
    pub fn new(request: Size, minimum: Size) -> SizeRequest {
        SizeRequest { request, minimum }
    }

    /// A request whose minimum equals the request, for platforms that do not tell them apart.
    pub fn exact(request: Size) -> SizeRequest {
        SizeRequest {
            request,
            minimum: request,
        }
    }

    pub fn zero() -> SizeRequest {
        SizeRequest::exact(Size::zero())
    }
}
