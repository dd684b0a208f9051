//! Action identifiers understood by the action-execution facility

use std::fmt;

/// Prefix marking built-in action sequences. Actions carrying it manage the
/// screen state on their own.
pub const ACTION_SEQUENCE_PREFIX: &str = "**";

pub const ACTION_NULL: &str = "**null**";
pub const ACTION_WAKE_DEVICE: &str = "**wake_device**";
pub const ACTION_CAMERA: &str = "**camera**";
pub const ACTION_MEDIA_PLAY_PAUSE: &str = "**media_play_pause**";
pub const ACTION_MEDIA_PREVIOUS: &str = "**media_previous**";
pub const ACTION_MEDIA_NEXT: &str = "**media_next**";
pub const ACTION_VIB_SILENT: &str = "**ring_vib_silent**";
pub const ACTION_TORCH: &str = "**torch**";

/// Request handed to the action-execution facility
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActionRequest {
    pub action: String,
    /// Set for the wake-device request injected ahead of a regular action
    pub synthetic: bool,
}

impl ActionRequest {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            synthetic: false,
        }
    }

    pub fn wake_device() -> Self {
        Self {
            action: ACTION_WAKE_DEVICE.to_string(),
            synthetic: true,
        }
    }
}

impl fmt::Display for ActionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.synthetic {
            write!(f, "{} (synthetic)", self.action)
        } else {
            write!(f, "{}", self.action)
        }
    }
}

/// True for identifiers that must not be dispatched at all
pub fn is_no_op(action: &str) -> bool {
    action.is_empty() || action == ACTION_NULL
}

/// Whether the screen has to be woken before `action` runs.
///
/// The camera always needs it. Other built-in sequences are recognised by
/// their prefix and wake the device themselves; everything else (app launches,
/// shortcuts) gets a wake request first.
pub fn requires_wake_first(action: &str) -> bool {
    action == ACTION_CAMERA || !action.starts_with(ACTION_SEQUENCE_PREFIX)
}
