//! Hardware key handling for a handset with an alert slider and screen-off
//! gestures.
//!
//! Two paths feed into [`KeyHandler`]:
//!
//! * key events from the input pipeline, decided synchronously (pass through,
//!   swallow, or switch the zen/ringer mode for an alert-slider position)
//! * gesture triggers, confirmed against the proximity sensor and then mapped
//!   to a user-configured action on a single dispatch worker
//!
//! Platform services are reached through the traits in [`device`]; each one is
//! optional and a missing service disables only the feature that needs it.

pub mod config;
pub mod device;
pub mod gesture;
pub mod input;
mod key_handler;

pub use config::KeyHandlerConfig;
pub use key_handler::{KeyHandler, KeyHandlerError, FPNAV_ENABLED_PROP};
