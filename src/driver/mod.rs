//! Driver layer
//!
//! Abstract interfaces over the underlying browser-automation driver. The
//! control plane only consumes raw primitives through these traits: event
//! channels, expression evaluation, screenshots, and locator-based input
//! actions. The concrete CDP-backed implementation lives in [`crate::cdp`];
//! mocks for testing live in [`mock`].

pub mod mock;
pub mod traits;

pub use traits::{
    ActionOptions, BrowserHandle, Connector, EvalOutcome, EvaluateOptions, Locator, Modifier,
    MouseButton, PageDriver, PageEvent, ScreenshotFormat, ScreenshotOptions, TargetInfo,
};

pub use mock::{MockBrowserHandle, MockConnector, MockPageDriver};
