use crate::device::Vibrator;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_PULSE_MS: u64 = 50;

/// Short vibration pulse confirming that a key or gesture was acted on.
///
/// A vibrator that is missing or reports no hardware at construction time
/// disables feedback for the lifetime of this value.
#[derive(Clone)]
pub struct HapticFeedback {
    vibrator: Option<Arc<dyn Vibrator>>,
    pulse: Duration,
}

impl HapticFeedback {
    pub fn new(vibrator: Option<Arc<dyn Vibrator>>, pulse_ms: u64) -> Self {
        let vibrator = vibrator.filter(|v| v.has_vibrator());
        if vibrator.is_none() {
            info!("No usable vibrator, haptic feedback disabled");
        }
        Self {
            vibrator,
            pulse: Duration::from_millis(pulse_ms),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.vibrator.is_some()
    }

    pub fn pulse(&self) {
        if let Some(vibrator) = &self.vibrator {
            debug!("Haptic pulse for {:?}", self.pulse);
            vibrator.vibrate(self.pulse);
        }
    }
}
