//! Arrangement.

use crate::element::Element;
use crate::rect::Rect;
use crate::tree::VisualComposite;
use tracing::trace;

/// Places an element and hands its native children their bounds.
#[derive(Debug, Default, Clone, Copy)]
pub struct ArrangeEngine;

impl ArrangeEngine {
    pub fn new() -> ArrangeEngine {
        ArrangeEngine
    }

    /// Arranges `element` in `rect` and returns the accepted rectangle.
    ///
    /// The element and its native peer are placed first. Every native-arrangeable visual child is
    /// then given the parent's full area in the parent's local coordinates.
    #[tracing::instrument(level = "trace", skip(self, element), fields(element = %element.id()))]
    pub fn arrange(&self, element: &Element, rect: Rect) -> Rect {
        element.layout(rect);
        if let Some(handler) = element.handler() {
            if let Some(arrangeable) = handler.arrangeable() {
                arrangeable.arrange_native(rect);
            }
        }

        let local = rect.local();
        let mut arranged = 0;
        for child in element.visual_children() {
            let handler = match child.handler() {
                Some(handler) => handler,
                None => continue,
            };
            if let Some(arrangeable) = handler.arrangeable() {
                arrangeable.arrange_native(local);
                arranged += 1;
            }
        }
        trace!(?rect, children = arranged, "arranged");
        rect
    }
}
