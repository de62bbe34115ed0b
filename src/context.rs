//! Platform context.
//!
//! Everything the platform bootstrap used to keep in process-wide statics lives here instead: the
//! native size provider, platform options and the main window. A context is created with `init`,
//! passed down to whoever needs it, and torn down explicitly (or when dropped).

use crate::arrange::ArrangeEngine;
use crate::color::Color;
use crate::element::Element;
use crate::error::{LayoutError, LayoutResult};
use crate::handler::Handler;
use crate::measure::MeasureEngine;
use crate::rect::Rect;
use crate::size::{SizeConstraint, SizeRequest};
use core::fmt;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info};

/// Supplies native sizes to the measure engine.
pub trait PlatformServices: fmt::Debug + Send + Sync {
    /// Measures the element's native peer. Called exactly once per measure pass.
    fn get_native_size(&self, element: &Element, constraint: SizeConstraint) -> SizeRequest;
}

/// Asks the element's handler to measure itself; elements without a measurable handler are
/// zero-sized.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeServices;

impl PlatformServices for NativeServices {
    fn get_native_size(&self, element: &Element, constraint: SizeConstraint) -> SizeRequest {
        match element.handler() {
            Some(handler) => match handler.measurable() {
                Some(measurable) => measurable.measure_native(constraint),
                None => SizeRequest::zero(),
            },
            None => SizeRequest::zero(),
        }
    }
}

/// Reading direction of the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowDirection {
    LeftToRight,
    RightToLeft,
}

impl Default for FlowDirection {
    fn default() -> Self {
        FlowDirection::LeftToRight
    }
}

/// Switches for optional platform bootstrap behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitializationFlag {
    DisableCss,
    SkipRenderers,
}

/// Options the platform bootstrap hands to the context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformOptions {
    pub flow_direction: FlowDirection,

    /// The system accent color.
    pub accent_color: Color,

    pub flags: BTreeSet<InitializationFlag>,
}

impl Default for PlatformOptions {
    fn default() -> Self {
        PlatformOptions {
            flow_direction: FlowDirection::LeftToRight,
            accent_color: Color::rgba(0., 0.47, 0.84, 1.),
            flags: BTreeSet::new(),
        }
    }
}

impl PlatformOptions {
    pub fn has_flag(&self, flag: InitializationFlag) -> bool {
        self.flags.contains(&flag)
    }

    pub fn with_flag(mut self, flag: InitializationFlag) -> PlatformOptions {
        self.flags.insert(flag);
        self
    }

    /// Parses options from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> LayoutResult<PlatformOptions> {
        serde_json::from_str(json).map_err(|err| LayoutError::Options(err.to_string()))
    }
}

#[derive(Debug)]
struct ContextState {
    initialized: bool,
    main_window: Option<Arc<Element>>,
}

/// The platform context.
pub struct PlatformContext {
    options: PlatformOptions,
    services: Arc<dyn PlatformServices>,
    state: Mutex<ContextState>,
}

impl PlatformContext {
    /// Creates an initialized context that measures through element handlers.
    pub fn init(options: PlatformOptions) -> PlatformContext {
        PlatformContext::with_services(options, Arc::new(NativeServices))
    }

    /// Creates an initialized context with custom platform services.
    pub fn with_services(
        options: PlatformOptions,
        services: Arc<dyn PlatformServices>,
    ) -> PlatformContext {
        info!(?options, "platform context initialized");
        PlatformContext {
            options,
            services,
            state: Mutex::new(ContextState {
                initialized: true,
                main_window: None,
            }),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.state.lock().initialized
    }

    pub fn options(&self) -> &PlatformOptions {
        &self.options
    }

    pub fn services(&self) -> &dyn PlatformServices {
        &*self.services
    }

    /// Releases the main window and marks the context as torn down. Idempotent.
    pub fn teardown(&self) {
        let mut state = self.state.lock();
        if state.initialized {
            state.initialized = false;
            state.main_window = None;
            info!("platform context torn down");
        }
    }

    fn ensure_initialized(&self) -> LayoutResult<()> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(LayoutError::NotInitialized)
        }
    }

    pub fn main_window(&self) -> Option<Arc<Element>> {
        self.state.lock().main_window.clone()
    }

    pub fn set_main_window(&self, window: Arc<Element>) -> LayoutResult<()> {
        let mut state = self.state.lock();
        if !state.initialized {
            return Err(LayoutError::NotInitialized);
        }
        state.main_window = Some(window);
        Ok(())
    }

    /// Binds a native handler to an element. An element can only ever be bound once.
    pub fn attach(&self, element: &Element, handler: Arc<dyn Handler>) -> LayoutResult<()> {
        self.ensure_initialized()?;
        element.bind_handler(handler)?;
        debug!(element = %element.id(), "handler attached");
        Ok(())
    }

    pub fn measure_engine(&self) -> MeasureEngine<'_> {
        MeasureEngine::new(&*self.services)
    }

    /// Measures an element. See [`MeasureEngine::measure`].
    pub fn measure(&self, element: &Element, constraint: SizeConstraint) -> SizeRequest {
        self.measure_engine().measure(element, constraint)
    }

    /// Arranges an element. See [`ArrangeEngine::arrange`].
    pub fn arrange(&self, element: &Element, rect: Rect) -> Rect {
        ArrangeEngine::new().arrange(element, rect)
    }
}

impl fmt::Debug for PlatformContext {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("PlatformContext")
            .field("options", &self.options)
            .field("services", &self.services)
            .field("state", &*self.state.lock())
            .finish()
    }
}

impl Drop for PlatformContext {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::any::Any;

    #[derive(Debug)]
    struct Bare;
    impl Handler for Bare {
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn options_from_json() {
        let options = PlatformOptions::from_json(r#"{ "flow_direction": "right_to_left" }"#)
            .expect("valid options");
        assert_eq!(options.flow_direction, FlowDirection::RightToLeft);
        assert_eq!(options.accent_color, PlatformOptions::default().accent_color);
        assert!(options.flags.is_empty());

        let options = PlatformOptions::from_json(
            r#"{ "accent_color": { "r": 1.0, "g": 0.0, "b": 0.0, "a": 1.0 } }"#,
        )
        .unwrap();
        assert_eq!(options.accent_color, Color::rgba(1., 0., 0., 1.));

        match PlatformOptions::from_json(r#"{ "flow_direction": "upwards" }"#) {
            Err(LayoutError::Options(_)) => (),
            other => panic!("expected an options error, got {:?}", other),
        }
    }

    #[test]
    fn flags_from_json() {
        let options =
            PlatformOptions::from_json(r#"{ "flags": ["skip_renderers", "skip_renderers"] }"#)
                .unwrap();
        assert!(options.has_flag(InitializationFlag::SkipRenderers));
        assert!(!options.has_flag(InitializationFlag::DisableCss));
        assert_eq!(options.flags.len(), 1);
        assert_eq!(
            options,
            PlatformOptions::default().with_flag(InitializationFlag::SkipRenderers)
        );

        let json = serde_json::to_string(
            &PlatformOptions::default().with_flag(InitializationFlag::DisableCss),
        )
        .unwrap();
        assert!(json.contains(r#""flags":["disable_css"]"#));

        match PlatformOptions::from_json(r#"{ "flags": ["fast_mode"] }"#) {
            Err(LayoutError::Options(_)) => (),
            other => panic!("expected an options error, got {:?}", other),
        }
    }

    #[test]
    fn attach_after_teardown_fails() {
        let context = PlatformContext::init(PlatformOptions::default());
        let window = Element::new();
        context.set_main_window(Arc::clone(&window)).unwrap();
        assert!(context.main_window().is_some());

        context.teardown();
        assert!(!context.is_initialized());
        assert!(context.main_window().is_none());

        let element = Element::new();
        assert_eq!(
            context.attach(&element, Arc::new(Bare)),
            Err(LayoutError::NotInitialized)
        );
        assert!(!element.has_handler());
        assert_eq!(
            context.set_main_window(window),
            Err(LayoutError::NotInitialized)
        );
    }

    #[test]
    fn attach_twice_is_rejected() {
        let context = PlatformContext::init(PlatformOptions::default());
        let element = Element::new();
        context.attach(&element, Arc::new(Bare)).unwrap();
        assert_eq!(
            context.attach(&element, Arc::new(Bare)),
            Err(LayoutError::AlreadyBound(element.id()))
        );
    }

    #[test]
    fn native_services_without_handler_is_zero() {
        let element = Element::new();
        let size = NativeServices.get_native_size(&element, SizeConstraint::unconstrained());
        assert_eq!(size, SizeRequest::zero());
    }
}
