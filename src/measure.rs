//! Measurement.

use crate::context::PlatformServices;
use crate::element::{Element, MeasureProps};
use crate::size::{Size, SizeConstraint, SizeRequest};
use crate::tree::VisualComposite;
use tracing::trace;

/// Computes how much space an element would like.
#[derive(Debug, Clone, Copy)]
pub struct MeasureEngine<'a> {
    services: &'a dyn PlatformServices,
}

impl<'a> MeasureEngine<'a> {
    pub fn new(services: &'a dyn PlatformServices) -> MeasureEngine<'a> {
        MeasureEngine { services }
    }

    /// Measures `element` under `constraint`.
    ///
    /// Hidden or not-yet-enabled elements, and any element offered a zero-area constraint, measure
    /// to zero. Otherwise the native size is obtained once, visual children's desired sizes are
    /// folded into the request, and the element's size and minimum size requests are applied.
    ///
    /// Measuring does not modify the element, so identical inputs give identical results.
    #[tracing::instrument(level = "trace", skip(self, element), fields(element = %element.id()))]
    pub fn measure(&self, element: &Element, constraint: SizeConstraint) -> SizeRequest {
        let props = element.measure_props();
        if !props.is_visible || !props.is_platform_enabled || constraint.is_zero_area() {
            return SizeRequest::zero();
        }

        let mut native = self.services.get_native_size(element, constraint);
        native.request = fold_children(element, native.request, constraint);

        let result = apply_overrides(native, &props);
        trace!(?result, "measured");
        result
    }
}

/// Grows `size` to fit the desired size of every measurable visual child.
///
/// Width and height are folded independently, so the result can be larger than any single child.
fn fold_children(composite: &dyn VisualComposite, size: Size, constraint: SizeConstraint) -> Size {
    composite
        .visual_children()
        .filter_map(|child| child.handler())
        .fold(size, |size, handler| match handler.measurable() {
            Some(measurable) => {
                let desired = measurable.desired_size(constraint);
                Size::new(size.x.max(desired.x), size.y.max(desired.y))
            }
            None => size,
        })
}

fn apply_overrides(native: SizeRequest, props: &MeasureProps) -> SizeRequest {
    let (request_w, minimum_w) = resolve_axis(
        native.request.x,
        native.minimum.x,
        props.width_request,
        props.minimum_width_request,
    );
    let (request_h, minimum_h) = resolve_axis(
        native.request.y,
        native.minimum.y,
        props.height_request,
        props.minimum_height_request,
    );
    SizeRequest::new(Size::new(request_w, request_h), Size::new(minimum_w, minimum_h))
}

/// Returns `(request, minimum)` for one axis.
///
/// An explicit minimum always wins over an explicit request. Without one, the native minimum is
/// pulled down to the request.
fn resolve_axis(
    native_request: f64,
    native_minimum: f64,
    request: Option<f64>,
    minimum: Option<f64>,
) -> (f64, f64) {
    let request = request.unwrap_or(native_request);
    match minimum {
        Some(minimum) => (request.max(minimum), minimum),
        None => (request, native_minimum.min(request)),
    }
}
