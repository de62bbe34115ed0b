//! Visual tree enumeration used by the measure and arrange fan-out.

use crate::element::Element;
use std::sync::Arc;
use std::vec;

/// Something whose visual children take part in layout fan-out.
pub trait VisualComposite {
    /// Enumerates the visual children.
    ///
    /// Each call starts a fresh enumeration over a snapshot of the children, so mutating the tree
    /// while iterating does not affect the iterator.
    fn visual_children(&self) -> VisualChildren;
}

impl VisualComposite for Element {
    fn visual_children(&self) -> VisualChildren {
        VisualChildren {
            inner: self.children().into_iter(),
        }
    }
}

/// Shorthand for [`VisualComposite::visual_children`].
pub fn visual_children(composite: &dyn VisualComposite) -> VisualChildren {
    composite.visual_children()
}

/// Iterator over the children that are backed by a native handler.
///
/// Children without a handler are invisible to the native layer and are skipped.
#[derive(Debug)]
pub struct VisualChildren {
    inner: vec::IntoIter<Arc<Element>>,
}

impl Iterator for VisualChildren {
    type Item = Arc<Element>;

    fn next(&mut self) -> Option<Arc<Element>> {
        self.inner.by_ref().find(|child| child.has_handler())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.inner.size_hint().1)
    }
}
