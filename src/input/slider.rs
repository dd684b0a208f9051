use crate::device::haptic::HapticFeedback;
use crate::device::{AudioControl, DeviceError, ZenModeControl};
use crate::input::scan_code::{SliderPosition, TargetMode};
use std::sync::Arc;
use tracing::{debug, info};

/// Applies alert-slider positions to the zen or ringer mode
pub struct SliderModeController {
    zen: Option<Arc<dyn ZenModeControl>>,
    audio: Option<Arc<dyn AudioControl>>,
    haptic: HapticFeedback,
}

impl SliderModeController {
    pub fn new(
        zen: Option<Arc<dyn ZenModeControl>>,
        audio: Option<Arc<dyn AudioControl>>,
        haptic: HapticFeedback,
    ) -> Self {
        Self { zen, audio, haptic }
    }

    /// Base positions set the zen mode, extra positions the ringer mode.
    /// Capability errors are returned as is; a missing capability is a no-op.
    pub fn apply(&self, position: SliderPosition) -> Result<(), DeviceError> {
        let mode = position.mode();
        match mode.target {
            TargetMode::Zen(zen_mode) => {
                let Some(zen) = &self.zen else {
                    debug!("Zen control unavailable, ignoring slider {:?}", position);
                    return Ok(());
                };
                info!("Slider {:?}: zen mode {}", position, zen_mode);
                zen.set_zen_mode(zen_mode)?;
            }
            TargetMode::Ringer(ringer_mode) => {
                let Some(audio) = &self.audio else {
                    debug!("Audio control unavailable, ignoring slider {:?}", position);
                    return Ok(());
                };
                info!("Slider {:?}: ringer mode {}", position, ringer_mode);
                audio.set_ringer_mode(ringer_mode)?;
            }
        }
        self.haptic.pulse();
        Ok(())
    }
}
