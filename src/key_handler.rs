//! Device key handler - entry points for the input layer
//!
//! Wires the two event paths together and owns their lifecycle:
//!
//! ```text
//!                 ┌─► PolicyGuard ──► SliderModeController        (synchronous)
//! Input layer ────┤
//!                 └─► GestureConfirmationGate ──► EventDispatcher (asynchronous)
//! ```
//!
//! None of the entry points return errors. Everything that goes wrong is
//! logged and resolves to "nothing happens", so the input pipeline is never
//! disturbed by a failing service.

use crate::config::KeyHandlerConfig;
use crate::device::haptic::HapticFeedback;
use crate::device::{Capabilities, SystemProperties};
use crate::gesture::confirmation::{
    ConfirmationAttempt, GestureConfirmationGate, PendingGestureRequest,
};
use crate::gesture::dispatcher::{DispatchError, EventDispatcher};
use crate::gesture::preferences::GesturePreferences;
use crate::input::key_event::KeyEvent;
use crate::input::policy::{PolicyDecision, PolicyGuard};
use crate::input::scan_code::{classify, ScanCodeClass};
use crate::input::slider::SliderModeController;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Property read by the fingerprint navigation driver
pub const FPNAV_ENABLED_PROP: &str = "sys.fpnav.enabled";

#[derive(Debug, thiserror::Error)]
pub enum KeyHandlerError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),
}

pub struct KeyHandler {
    policy: PolicyGuard,
    slider: SliderModeController,
    gate: GestureConfirmationGate,
    dispatcher: EventDispatcher,
    properties: Option<Arc<dyn SystemProperties>>,
}

impl KeyHandler {
    /// Builds the handler and spawns its dispatch worker on the current tokio
    /// runtime.
    pub fn new(
        capabilities: Capabilities,
        config: &KeyHandlerConfig,
    ) -> Result<Self, KeyHandlerError> {
        config
            .validate()
            .map_err(|e| KeyHandlerError::InvalidConfig(e.to_string()))?;
        info!("Initializing key handler with {:?}", capabilities);

        let haptic = HapticFeedback::new(capabilities.vibrator.clone(), config.haptic_pulse_ms);
        if !haptic.is_enabled() {
            info!("No vibrator hardware, haptic feedback disabled");
        }

        let dispatcher = EventDispatcher::spawn(
            config.dispatch_queue_capacity,
            GesturePreferences::new(
                capabilities.preferences.clone(),
                config.gesture_namespace.clone(),
            ),
            haptic.clone(),
            capabilities.actions.clone(),
        );

        let gate = GestureConfirmationGate::new(
            capabilities.proximity.clone(),
            capabilities.power.clone(),
            dispatcher.sender(),
            config.confirmation_deadline(),
            config.wake_lock_tag.clone(),
        );

        Ok(Self {
            policy: PolicyGuard::new(capabilities.preferences.clone()),
            slider: SliderModeController::new(capabilities.zen, capabilities.audio, haptic),
            gate,
            dispatcher,
            properties: capabilities.properties,
        })
    }

    /// Synchronous key path. `Some(event)` hands the event back to the input
    /// pipeline, `None` means it was consumed.
    pub fn handle_key_event(&self, event: KeyEvent) -> Option<KeyEvent> {
        match self.policy.evaluate(&event) {
            PolicyDecision::PassThrough => Some(event),
            PolicyDecision::Consume => None,
            PolicyDecision::ApplySlider(position) => {
                if let Err(e) = self.slider.apply(position) {
                    error!("Failed to apply slider {:?}: {}", position, e);
                }
                None
            }
        }
    }

    /// Gesture trigger channel. Starts a proximity confirmation for gesture
    /// scan codes and ignores everything else.
    pub fn handle_gesture_trigger(&self, scan_code: u32) -> Option<ConfirmationAttempt> {
        match classify(scan_code) {
            ScanCodeClass::Gesture(gesture) => self.gate.begin(gesture),
            other => {
                debug!(
                    "Scan code {} ({:?}) is not a gesture, ignoring trigger",
                    scan_code, other
                );
                None
            }
        }
    }

    /// Enables the fingerprint navigation sensor while the on-screen
    /// navigation bar is hidden, and disables it otherwise.
    pub fn handle_navbar_toggle(&self, navbar_enabled: bool) {
        let value = if navbar_enabled { "0" } else { "1" };
        match &self.properties {
            Some(properties) => {
                if let Err(e) = properties.set_property(FPNAV_ENABLED_PROP, value) {
                    warn!("Failed to set {}: {}", FPNAV_ENABLED_PROP, e);
                }
            }
            None => debug!("No property service, navbar toggle ignored"),
        }
    }

    pub fn pending_gesture(&self) -> Option<PendingGestureRequest> {
        self.gate.pending()
    }

    /// Cancels open confirmations, executes everything already confirmed and
    /// stops the dispatch worker. Returns the number of confirmed gestures the
    /// worker handled.
    pub async fn shutdown(mut self) -> Result<usize, KeyHandlerError> {
        info!("Shutting down key handler");
        self.gate.shutdown().await;
        let processed = self.dispatcher.shutdown().await?;
        Ok(processed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::simulated::{
        InMemoryPreferences, InMemoryProperties, ManualProximitySensor, RecordingActionExecutor,
        RecordingAudio, RecordingVibrator, RecordingZen, SimulatedPower,
    };
    use crate::device::{RingerMode, ZenMode};
    use crate::gesture::action::{
        ActionRequest, ACTION_CAMERA, ACTION_MEDIA_PLAY_PAUSE, ACTION_TORCH,
    };
    use crate::gesture::confirmation::ConfirmationOutcome;
    use crate::input::key_event::KeyAction;
    use crate::input::scan_code::{
        FLIP_CAMERA_SCANCODE, GESTURE_CIRCLE_SCANCODE, GESTURE_SWIPE_DOWN_SCANCODE,
        GESTURE_V_UP_SCANCODE, MODE_ALARMS_ONLY, MODE_RING, MODE_VIBRATE, SLIDER_MODE_TABLE,
    };

    const MAX_RANGE: f32 = 5.0;

    struct Device {
        preferences: Arc<InMemoryPreferences>,
        zen: Arc<RecordingZen>,
        audio: Arc<RecordingAudio>,
        vibrator: Arc<RecordingVibrator>,
        power: Arc<SimulatedPower>,
        sensor: Arc<ManualProximitySensor>,
        actions: Arc<RecordingActionExecutor>,
        properties: Arc<InMemoryProperties>,
    }

    impl Device {
        fn new(setup_complete: bool) -> Self {
            Self {
                preferences: Arc::new(InMemoryPreferences::new(setup_complete)),
                zen: Arc::new(RecordingZen::new()),
                audio: Arc::new(RecordingAudio::new()),
                vibrator: Arc::new(RecordingVibrator::new(true)),
                power: Arc::new(SimulatedPower::new()),
                sensor: Arc::new(ManualProximitySensor::new(MAX_RANGE)),
                actions: Arc::new(RecordingActionExecutor::new()),
                properties: Arc::new(InMemoryProperties::new()),
            }
        }

        fn capabilities(&self) -> Capabilities {
            Capabilities::new(self.preferences.clone())
                .with_zen(self.zen.clone())
                .with_audio(self.audio.clone())
                .with_vibrator(self.vibrator.clone())
                .with_power(self.power.clone())
                .with_proximity(self.sensor.clone())
                .with_actions(self.actions.clone())
                .with_properties(self.properties.clone())
        }

        fn handler(&self) -> KeyHandler {
            KeyHandler::new(self.capabilities(), &KeyHandlerConfig::default()).unwrap()
        }

        fn nothing_invoked(&self) -> bool {
            self.zen.calls().is_empty()
                && self.audio.calls().is_empty()
                && self.vibrator.pulses().is_empty()
        }
    }

    #[tokio::test]
    async fn unknown_scan_codes_come_back_unmodified() {
        let device = Device::new(true);
        let handler = device.handler();

        for event in [
            KeyEvent::down(116),
            KeyEvent::up(0),
            KeyEvent::new(606, KeyAction::Multiple),
            KeyEvent::up(GESTURE_CIRCLE_SCANCODE),
        ] {
            assert_eq!(handler.handle_key_event(event), Some(event));
        }
        assert!(device.nothing_invoked());
    }

    #[tokio::test]
    async fn flip_camera_release_is_swallowed() {
        let device = Device::new(true);
        let handler = device.handler();

        assert_eq!(handler.handle_key_event(KeyEvent::up(FLIP_CAMERA_SCANCODE)), None);
        assert_eq!(handler.handle_key_event(KeyEvent::down(FLIP_CAMERA_SCANCODE)), None);
        assert!(device.nothing_invoked());
    }

    #[tokio::test]
    async fn every_slider_release_makes_one_call_and_one_pulse() {
        for row in SLIDER_MODE_TABLE {
            let device = Device::new(true);
            let handler = device.handler();

            assert_eq!(handler.handle_key_event(KeyEvent::up(row.scan_code)), None);

            let (zen_calls, ringer_calls) = (device.zen.calls().len(), device.audio.calls().len());
            if row.extra {
                assert_eq!((zen_calls, ringer_calls), (0, 1), "row {:?}", row);
            } else {
                assert_eq!((zen_calls, ringer_calls), (1, 0), "row {:?}", row);
            }
            assert_eq!(device.vibrator.pulses().len(), 1);
        }
    }

    #[tokio::test]
    async fn slider_press_is_swallowed_without_effect() {
        let device = Device::new(true);
        let handler = device.handler();

        assert_eq!(handler.handle_key_event(KeyEvent::down(MODE_RING)), None);
        assert!(device.nothing_invoked());
    }

    #[tokio::test]
    async fn vibrate_position_never_touches_zen() {
        let device = Device::new(true);
        let handler = device.handler();

        handler.handle_key_event(KeyEvent::up(MODE_VIBRATE));

        assert_eq!(device.audio.calls(), vec![RingerMode::Vibrate]);
        assert!(device.zen.calls().is_empty());
    }

    #[tokio::test]
    async fn nothing_happens_before_setup() {
        let device = Device::new(false);
        let handler = device.handler();

        for code in [FLIP_CAMERA_SCANCODE, 600, 601, 602, 603, 604, 605, 42] {
            for action in [KeyAction::Down, KeyAction::Up] {
                let event = KeyEvent::new(code, action);
                assert_eq!(handler.handle_key_event(event), Some(event));
            }
        }
        assert!(device.nothing_invoked());
    }

    #[tokio::test]
    async fn failing_zen_service_still_consumes() {
        let device = Device::new(true);
        let capabilities = device
            .capabilities()
            .with_zen(Arc::new(RecordingZen::failing()));
        let handler = KeyHandler::new(capabilities, &KeyHandlerConfig::default()).unwrap();

        assert_eq!(handler.handle_key_event(KeyEvent::up(MODE_ALARMS_ONLY)), None);
        assert!(device.vibrator.pulses().is_empty());
    }

    #[tokio::test]
    async fn covered_circle_wakes_then_opens_camera() {
        let device = Device::new(true);
        let handler = device.handler();

        let attempt = handler.handle_gesture_trigger(GESTURE_CIRCLE_SCANCODE).unwrap();
        device.sensor.emit(MAX_RANGE);
        assert_eq!(attempt.outcome().await, ConfirmationOutcome::Confirmed);
        assert_eq!(handler.shutdown().await.unwrap(), 1);

        assert_eq!(
            device.actions.requests(),
            vec![ActionRequest::wake_device(), ActionRequest::new(ACTION_CAMERA)]
        );
        assert_eq!(device.vibrator.pulses().len(), 1);
        assert_eq!(device.power.held(), 0);
    }

    #[tokio::test]
    async fn prefixed_action_is_sent_alone() {
        let device = Device::new(true);
        let handler = device.handler();

        let attempt = handler.handle_gesture_trigger(GESTURE_V_UP_SCANCODE).unwrap();
        device.sensor.emit(MAX_RANGE);
        attempt.outcome().await;
        handler.shutdown().await.unwrap();

        assert_eq!(device.actions.requests(), vec![ActionRequest::new(ACTION_TORCH)]);
    }

    #[tokio::test]
    async fn uncovered_gesture_is_not_dispatched() {
        let device = Device::new(true);
        let handler = device.handler();

        let attempt = handler.handle_gesture_trigger(GESTURE_CIRCLE_SCANCODE).unwrap();
        device.sensor.emit(MAX_RANGE / 2.0);
        assert_eq!(attempt.outcome().await, ConfirmationOutcome::NotCovered);
        assert_eq!(handler.shutdown().await.unwrap(), 0);

        assert!(device.actions.requests().is_empty());
        assert_eq!(device.power.held(), 0);
        assert!(device.sensor.active_subscriptions().is_empty());
    }

    #[tokio::test]
    async fn superseded_confirmation_does_not_double_dispatch() {
        let device = Device::new(true);
        let handler = device.handler();

        let first = handler.handle_gesture_trigger(GESTURE_CIRCLE_SCANCODE).unwrap();
        let second = handler
            .handle_gesture_trigger(GESTURE_SWIPE_DOWN_SCANCODE)
            .unwrap();
        let ids = device.sensor.active_subscriptions();

        device.sensor.emit_to(ids[1], MAX_RANGE);
        assert_eq!(second.outcome().await, ConfirmationOutcome::Confirmed);
        device.sensor.emit_to(ids[0], MAX_RANGE);
        assert_eq!(first.outcome().await, ConfirmationOutcome::Superseded);
        handler.shutdown().await.unwrap();

        assert_eq!(
            device.actions.requests(),
            vec![ActionRequest::new(ACTION_MEDIA_PLAY_PAUSE)]
        );
        assert_eq!(device.power.held(), 0);
        assert_eq!(device.sensor.unsubscribed().len(), 2);
    }

    #[tokio::test]
    async fn older_gesture_confirmed_while_newer_one_waits() {
        let device = Device::new(true);
        let handler = device.handler();

        let first = handler.handle_gesture_trigger(GESTURE_V_UP_SCANCODE).unwrap();
        let second = handler
            .handle_gesture_trigger(GESTURE_SWIPE_DOWN_SCANCODE)
            .unwrap();
        let ids = device.sensor.active_subscriptions();

        device.sensor.emit_to(ids[0], MAX_RANGE);
        assert_eq!(first.outcome().await, ConfirmationOutcome::Confirmed);
        device.sensor.emit_to(ids[1], MAX_RANGE / 2.0);
        assert_eq!(second.outcome().await, ConfirmationOutcome::NotCovered);
        assert_eq!(handler.shutdown().await.unwrap(), 1);

        assert_eq!(device.actions.requests(), vec![ActionRequest::new(ACTION_TORCH)]);
        assert_eq!(device.power.held(), 0);
    }

    #[tokio::test]
    async fn gesture_trigger_from_input_thread() {
        let device = Device::new(true);
        let handler = device.handler();

        let attempt = std::thread::scope(|scope| {
            scope
                .spawn(|| handler.handle_gesture_trigger(GESTURE_CIRCLE_SCANCODE))
                .join()
                .unwrap()
        })
        .unwrap();
        device.sensor.emit(MAX_RANGE);
        assert_eq!(attempt.outcome().await, ConfirmationOutcome::Confirmed);
        handler.shutdown().await.unwrap();

        assert_eq!(
            device.actions.requests(),
            vec![ActionRequest::wake_device(), ActionRequest::new(ACTION_CAMERA)]
        );
    }

    #[tokio::test]
    async fn setup_completion_is_read_per_event() {
        let device = Device::new(false);
        let handler = device.handler();

        let event = KeyEvent::up(MODE_VIBRATE);
        assert_eq!(handler.handle_key_event(event), Some(event));
        assert!(device.nothing_invoked());

        device.preferences.set_setup_complete(true);
        assert_eq!(handler.handle_key_event(event), None);
        assert_eq!(device.audio.calls(), vec![RingerMode::Vibrate]);
    }

    #[tokio::test]
    async fn non_gesture_triggers_are_ignored() {
        let device = Device::new(true);
        let handler = device.handler();

        assert!(handler.handle_gesture_trigger(MODE_RING).is_none());
        assert!(handler.handle_gesture_trigger(FLIP_CAMERA_SCANCODE).is_none());
        assert_eq!(device.power.acquired(), 0);
    }

    #[tokio::test]
    async fn navbar_toggle_inverts_sensor_property() {
        let device = Device::new(true);
        let handler = device.handler();

        handler.handle_navbar_toggle(true);
        assert_eq!(device.properties.get(FPNAV_ENABLED_PROP).as_deref(), Some("0"));
        handler.handle_navbar_toggle(false);
        assert_eq!(device.properties.get(FPNAV_ENABLED_PROP).as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn rejects_invalid_config() {
        let device = Device::new(true);
        let config = KeyHandlerConfig {
            dispatch_queue_capacity: 0,
            ..KeyHandlerConfig::default()
        };

        assert!(matches!(
            KeyHandler::new(device.capabilities(), &config),
            Err(KeyHandlerError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn zen_mode_setting_values() {
        let device = Device::new(true);
        let handler = device.handler();

        handler.handle_key_event(KeyEvent::up(600));
        assert_eq!(device.zen.calls(), vec![ZenMode::NoInterruptions]);
        assert_eq!(ZenMode::NoInterruptions.as_setting(), 2);
    }
}
