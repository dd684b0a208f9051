//! Asynchronous gesture path
//!
//! ```text
//! gesture trigger ──► GestureConfirmationGate ──► EventDispatcher ──► ActionExecutor
//!                      (proximity, wake lock)     (single worker)
//! ```

pub mod action;
pub mod confirmation;
pub mod dispatcher;
pub mod preferences;

pub use action::ActionRequest;
pub use confirmation::{ConfirmationAttempt, ConfirmationOutcome, GestureConfirmationGate};
pub use dispatcher::{ConfirmedGesture, DispatchError, DispatchSender, EventDispatcher};
pub use preferences::GesturePreferences;
