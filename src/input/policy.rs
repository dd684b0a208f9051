//! Eligibility checks for the direct key-event path

use crate::device::PreferenceStore;
use crate::input::key_event::{KeyAction, KeyEvent};
use crate::input::scan_code::{classify, ScanCodeClass, SliderPosition};
use std::sync::Arc;
use tracing::debug;

/// What the key path should do with an event
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PolicyDecision {
    /// Not ours (or not yet allowed): hand the event back untouched
    PassThrough,
    /// Swallow the event without side effects
    Consume,
    /// Apply the slider position, then swallow the event
    ApplySlider(SliderPosition),
}

pub struct PolicyGuard {
    preferences: Arc<dyn PreferenceStore>,
}

impl PolicyGuard {
    pub fn new(preferences: Arc<dyn PreferenceStore>) -> Self {
        Self { preferences }
    }

    pub fn evaluate(&self, event: &KeyEvent) -> PolicyDecision {
        let class = classify(event.scan_code);
        if !class.is_key_path() {
            return PolicyDecision::PassThrough;
        }

        if !self.preferences.user_setup_complete() {
            debug!(
                "Setup not complete, passing scan code {} through",
                event.scan_code
            );
            return PolicyDecision::PassThrough;
        }

        // Flip camera acts on press, the slider on release
        match class {
            ScanCodeClass::FlipCamera => {
                if event.action != KeyAction::Down {
                    debug!("Ignoring flip camera {}", event.action);
                }
                PolicyDecision::Consume
            }
            ScanCodeClass::SliderMode(position) => {
                if event.action != KeyAction::Up {
                    debug!("Ignoring slider {:?} {}", position, event.action);
                    return PolicyDecision::Consume;
                }
                PolicyDecision::ApplySlider(position)
            }
            ScanCodeClass::Gesture(_) | ScanCodeClass::Unsupported => PolicyDecision::PassThrough,
        }
    }
}
