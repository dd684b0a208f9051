//! In-memory device used by the demo binary and the test suites
//!
//! Every implementation records the calls it receives and logs them, so a
//! session can be replayed and inspected without real hardware.

use super::{
    ActionExecutor, AudioControl, DeviceError, PowerControl, PreferenceStore, ProximityListener,
    ProximitySensor, RingerMode, SubscriptionId, SystemProperties, Vibrator,
    WakeLock, ZenMode, ZenModeControl,
};
use crate::gesture::action::ActionRequest;
use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info, warn};

// Recorders never leave their data half-written, so a poisoned lock is still usable
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// On-disk layout of the simulated preference store
///
/// ```toml
/// user_setup_complete = true
///
/// [gestures.screen_off_gestures]
/// gesture_circle = "**torch**"
/// ```
#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct PreferenceFile {
    #[serde(default)]
    pub user_setup_complete: bool,
    #[serde(default)]
    pub gestures: HashMap<String, HashMap<String, String>>,
}

#[derive(Debug, Default)]
pub struct InMemoryPreferences {
    setup_complete: AtomicBool,
    values: Mutex<HashMap<String, HashMap<String, String>>>,
}

impl InMemoryPreferences {
    pub fn new(setup_complete: bool) -> Self {
        Self {
            setup_complete: AtomicBool::new(setup_complete),
            values: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_file(file: PreferenceFile) -> Self {
        Self {
            setup_complete: AtomicBool::new(file.user_setup_complete),
            values: Mutex::new(file.gestures),
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: PreferenceFile =
            toml::from_str(content).map_err(|e| eyre!("Failed to parse preferences: {}", e))?;
        Ok(Self::from_file(file))
    }

    /// Loads preferences from a TOML file; a missing file yields an empty,
    /// setup-complete store.
    pub async fn load(path: &Path) -> Result<Self> {
        let exists = tokio::fs::try_exists(path)
            .await
            .map_err(|e| eyre!("Failed to check preference file {}: {}", path.display(), e))?;
        if !exists {
            warn!(
                "Preference file {} not found, using empty store",
                path.display()
            );
            return Ok(Self::new(true));
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| eyre!("Failed to read preference file {}: {}", path.display(), e))?;
        info!("Loaded preferences from {}", path.display());
        Self::from_toml_str(&content)
    }

    pub fn set(&self, namespace: &str, key: &str, value: &str) {
        lock(&self.values)
            .entry(namespace.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
    }

    pub fn set_setup_complete(&self, complete: bool) {
        self.setup_complete.store(complete, Ordering::SeqCst);
    }
}

impl PreferenceStore for InMemoryPreferences {
    fn get_string(&self, namespace: &str, key: &str) -> Option<String> {
        lock(&self.values)
            .get(namespace)
            .and_then(|values| values.get(key))
            .cloned()
    }

    fn user_setup_complete(&self) -> bool {
        self.setup_complete.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Default)]
pub struct RecordingZen {
    calls: Mutex<Vec<ZenMode>>,
    failing: AtomicBool,
}

impl RecordingZen {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call fails after being recorded
    pub fn failing() -> Self {
        let zen = Self::default();
        zen.failing.store(true, Ordering::SeqCst);
        zen
    }

    pub fn calls(&self) -> Vec<ZenMode> {
        lock(&self.calls).clone()
    }
}

impl ZenModeControl for RecordingZen {
    fn set_zen_mode(&self, mode: ZenMode) -> Result<(), DeviceError> {
        info!("[device] zen mode -> {} ({})", mode, mode.as_setting());
        lock(&self.calls).push(mode);
        if self.failing.load(Ordering::SeqCst) {
            return Err(DeviceError::ServiceCall("notification service rejected zen mode".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct RecordingAudio {
    calls: Mutex<Vec<RingerMode>>,
}

impl RecordingAudio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<RingerMode> {
        lock(&self.calls).clone()
    }
}

impl AudioControl for RecordingAudio {
    fn set_ringer_mode(&self, mode: RingerMode) -> Result<(), DeviceError> {
        info!("[device] ringer mode -> {} ({})", mode, mode.as_setting());
        lock(&self.calls).push(mode);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct RecordingVibrator {
    has_hardware: bool,
    pulses: Mutex<Vec<Duration>>,
}

impl RecordingVibrator {
    pub fn new(has_hardware: bool) -> Self {
        Self {
            has_hardware,
            pulses: Mutex::new(Vec::new()),
        }
    }

    pub fn pulses(&self) -> Vec<Duration> {
        lock(&self.pulses).clone()
    }
}

impl Vibrator for RecordingVibrator {
    fn has_vibrator(&self) -> bool {
        self.has_hardware
    }

    fn vibrate(&self, duration: Duration) {
        info!("[device] vibrate {}ms", duration.as_millis());
        lock(&self.pulses).push(duration);
    }
}

#[derive(Debug, Default)]
struct WakeLockCounters {
    acquired: AtomicUsize,
    released: AtomicUsize,
}

/// Power service counting wake lock acquisitions and releases
#[derive(Debug, Default)]
pub struct SimulatedPower {
    counters: Arc<WakeLockCounters>,
}

impl SimulatedPower {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquired(&self) -> usize {
        self.counters.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.counters.released.load(Ordering::SeqCst)
    }

    pub fn held(&self) -> usize {
        self.acquired().saturating_sub(self.released())
    }
}

struct SimulatedWakeLock {
    tag: String,
    counters: Arc<WakeLockCounters>,
}

impl WakeLock for SimulatedWakeLock {
    fn release(&self) {
        debug!("[device] wake lock '{}' released", self.tag);
        self.counters.released.fetch_add(1, Ordering::SeqCst);
    }
}

impl PowerControl for SimulatedPower {
    fn acquire_wake_lock(&self, tag: &str) -> Result<Box<dyn WakeLock>, DeviceError> {
        debug!("[device] wake lock '{}' acquired", tag);
        self.counters.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(SimulatedWakeLock {
            tag: tag.to_string(),
            counters: self.counters.clone(),
        }))
    }
}

/// Proximity sensor whose readings are pushed by hand
pub struct ManualProximitySensor {
    maximum_range: f32,
    next_id: AtomicU64,
    reject_subscriptions: AtomicBool,
    listeners: Mutex<HashMap<SubscriptionId, Arc<dyn Fn(f32) + Send + Sync>>>,
    unsubscribed: Mutex<Vec<SubscriptionId>>,
}

impl ManualProximitySensor {
    pub fn new(maximum_range: f32) -> Self {
        Self {
            maximum_range,
            next_id: AtomicU64::new(1),
            reject_subscriptions: AtomicBool::new(false),
            listeners: Mutex::new(HashMap::new()),
            unsubscribed: Mutex::new(Vec::new()),
        }
    }

    pub fn reject_subscriptions(&self, reject: bool) {
        self.reject_subscriptions.store(reject, Ordering::SeqCst);
    }

    /// Delivers a reading to every registered listener
    pub fn emit(&self, value: f32) -> usize {
        let listeners: Vec<_> = lock(&self.listeners).values().cloned().collect();
        debug!(
            "[device] proximity reading {} to {} listener(s)",
            value,
            listeners.len()
        );
        for listener in &listeners {
            listener(value);
        }
        listeners.len()
    }

    /// Delivers a reading to one listener; returns false if it is not registered
    pub fn emit_to(&self, id: SubscriptionId, value: f32) -> bool {
        let listener = lock(&self.listeners).get(&id).cloned();
        match listener {
            Some(listener) => {
                debug!("[device] proximity reading {} to {}", value, id);
                listener(value);
                true
            }
            None => false,
        }
    }

    pub fn active_subscriptions(&self) -> Vec<SubscriptionId> {
        let mut ids: Vec<_> = lock(&self.listeners).keys().copied().collect();
        ids.sort_by_key(|id| id.0);
        ids
    }

    pub fn unsubscribed(&self) -> Vec<SubscriptionId> {
        lock(&self.unsubscribed).clone()
    }
}

impl ProximitySensor for ManualProximitySensor {
    fn maximum_range(&self) -> f32 {
        self.maximum_range
    }

    fn subscribe(&self, listener: ProximityListener) -> Result<SubscriptionId, DeviceError> {
        if self.reject_subscriptions.load(Ordering::SeqCst) {
            return Err(DeviceError::SensorRegistration(
                "sensor service refused listener".into(),
            ));
        }
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        debug!("[device] proximity listener {} registered", id);
        lock(&self.listeners).insert(id, Arc::from(listener));
        Ok(id)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        debug!("[device] proximity listener {} unregistered", id);
        lock(&self.listeners).remove(&id);
        lock(&self.unsubscribed).push(id);
    }
}

#[derive(Debug, Default)]
pub struct RecordingActionExecutor {
    requests: Mutex<Vec<ActionRequest>>,
}

impl RecordingActionExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> Vec<ActionRequest> {
        lock(&self.requests).clone()
    }
}

impl ActionExecutor for RecordingActionExecutor {
    fn execute(&self, request: &ActionRequest) {
        info!(
            "[device] execute action '{}' (synthetic: {})",
            request.action, request.synthetic
        );
        lock(&self.requests).push(request.clone());
    }
}

#[derive(Debug, Default)]
pub struct InMemoryProperties {
    values: Mutex<HashMap<String, String>>,
}

impl InMemoryProperties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        lock(&self.values).get(key).cloned()
    }
}

impl SystemProperties for InMemoryProperties {
    fn set_property(&self, key: &str, value: &str) -> Result<(), DeviceError> {
        info!("[device] setprop {} {}", key, value);
        lock(&self.values).insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_preference_file() {
        let prefs = InMemoryPreferences::from_toml_str(
            r#"
            user_setup_complete = true

            [gestures.screen_off_gestures]
            gesture_circle = "**torch**"
            "#,
        )
        .unwrap();

        assert!(prefs.user_setup_complete());
        assert_eq!(
            prefs.get_string("screen_off_gestures", "gesture_circle"),
            Some("**torch**".to_string())
        );
        assert_eq!(prefs.get_string("other", "gesture_circle"), None);
    }

    #[test]
    fn empty_preference_file_means_setup_incomplete() {
        let prefs = InMemoryPreferences::from_toml_str("").unwrap();
        assert!(!prefs.user_setup_complete());
    }

    #[test]
    fn unsubscribed_listener_no_longer_receives() {
        let sensor = ManualProximitySensor::new(5.0);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let id = sensor
            .subscribe(Box::new(move |value| sink.lock().unwrap().push(value)))
            .unwrap();

        assert_eq!(sensor.emit(5.0), 1);
        sensor.unsubscribe(id);
        assert_eq!(sensor.emit(0.0), 0);

        assert_eq!(*seen.lock().unwrap(), vec![5.0]);
        assert_eq!(sensor.unsubscribed(), vec![id]);
    }
}
