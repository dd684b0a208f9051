//! Synchronous key-event path
//!
//! ```text
//! KeyEvent ──► classify ──► PolicyGuard ──► SliderModeController
//!                              │
//!                     pass through / consume
//! ```
//!
//! Runs on the input dispatch context and never waits on anything.

pub mod key_event;
pub mod policy;
pub mod scan_code;
pub mod slider;

pub use key_event::{KeyAction, KeyEvent};
pub use policy::{PolicyDecision, PolicyGuard};
pub use scan_code::{classify, Gesture, ScanCodeClass, SliderPosition, TargetMode};
pub use slider::SliderModeController;
