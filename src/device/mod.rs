//! Device capability facades
//!
//! Everything the key handler needs from the operating system is reached
//! through the traits in this module. They are injected once through
//! [`Capabilities`] when the [`KeyHandler`](crate::KeyHandler) is built.
//!
//! # Availability
//!
//! A capability that is `None` at construction time stays disabled for the
//! lifetime of the handler:
//!
//! - no vibrator: haptic feedback is a no-op
//! - no zen / audio service: the matching slider positions are consumed but change nothing
//! - no power service: confirmation attempts run without a wake lock
//! - no proximity sensor: gestures cannot be confirmed and are dropped
//! - no action executor: confirmed gestures are resolved and logged only

pub mod haptic;
pub mod simulated;

use crate::gesture::action::ActionRequest;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Notification interruption policy
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ZenMode {
    Off,
    PriorityOnly,
    NoInterruptions,
    AlarmsOnly,
}

impl ZenMode {
    /// Value stored in the global zen_mode setting
    pub fn as_setting(self) -> i32 {
        match self {
            ZenMode::Off => 0,
            ZenMode::PriorityOnly => 1,
            ZenMode::NoInterruptions => 2,
            ZenMode::AlarmsOnly => 3,
        }
    }
}

impl fmt::Display for ZenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZenMode::Off => write!(f, "off"),
            ZenMode::PriorityOnly => write!(f, "priority-only"),
            ZenMode::NoInterruptions => write!(f, "no-interruptions"),
            ZenMode::AlarmsOnly => write!(f, "alarms-only"),
        }
    }
}

/// Audio alert mode
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RingerMode {
    Vibrate,
    Normal,
}

impl RingerMode {
    pub fn as_setting(self) -> i32 {
        match self {
            RingerMode::Vibrate => 1,
            RingerMode::Normal => 2,
        }
    }
}

impl fmt::Display for RingerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RingerMode::Vibrate => write!(f, "vibrate"),
            RingerMode::Normal => write!(f, "normal"),
        }
    }
}

/// Identifies one registered sensor listener
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Callback invoked from the sensor delivery context with a distance reading
pub type ProximityListener = Box<dyn Fn(f32) + Send + Sync>;

/// Errors reported by capability implementations
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("Sensor registration failed: {0}")]
    SensorRegistration(String),

    #[error("Service call failed: {0}")]
    ServiceCall(String),
}

pub trait ZenModeControl: Send + Sync {
    fn set_zen_mode(&self, mode: ZenMode) -> Result<(), DeviceError>;
}

pub trait AudioControl: Send + Sync {
    fn set_ringer_mode(&self, mode: RingerMode) -> Result<(), DeviceError>;
}

pub trait Vibrator: Send + Sync {
    fn has_vibrator(&self) -> bool;
    fn vibrate(&self, duration: Duration);
}

/// A held wake lock. Dropping the box without calling `release` leaks it.
pub trait WakeLock: Send + Sync {
    fn release(&self);
}

pub trait PowerControl: Send + Sync {
    fn acquire_wake_lock(&self, tag: &str) -> Result<Box<dyn WakeLock>, DeviceError>;
}

pub trait ProximitySensor: Send + Sync {
    /// Reading reported when nothing is in front of the sensor
    fn maximum_range(&self) -> f32;

    /// Registers `listener` at the fastest rate the sensor supports
    fn subscribe(&self, listener: ProximityListener) -> Result<SubscriptionId, DeviceError>;

    fn unsubscribe(&self, id: SubscriptionId);
}

/// Key-value preference store plus the secure "setup complete" flag
pub trait PreferenceStore: Send + Sync {
    fn get_string(&self, namespace: &str, key: &str) -> Option<String>;

    fn user_setup_complete(&self) -> bool;
}

/// Facility interpreting opaque action identifiers
pub trait ActionExecutor: Send + Sync {
    fn execute(&self, request: &ActionRequest);
}

pub trait SystemProperties: Send + Sync {
    fn set_property(&self, key: &str, value: &str) -> Result<(), DeviceError>;
}

/// Capability handles injected into the key handler
///
/// Only the preference store is mandatory; every other field may be `None`
/// when the platform service could not be obtained.
#[derive(Clone)]
pub struct Capabilities {
    pub preferences: Arc<dyn PreferenceStore>,
    pub zen: Option<Arc<dyn ZenModeControl>>,
    pub audio: Option<Arc<dyn AudioControl>>,
    pub vibrator: Option<Arc<dyn Vibrator>>,
    pub power: Option<Arc<dyn PowerControl>>,
    pub proximity: Option<Arc<dyn ProximitySensor>>,
    pub actions: Option<Arc<dyn ActionExecutor>>,
    pub properties: Option<Arc<dyn SystemProperties>>,
}

impl Capabilities {
    /// Capability set with only a preference store; everything else disabled
    pub fn new(preferences: Arc<dyn PreferenceStore>) -> Self {
        Self {
            preferences,
            zen: None,
            audio: None,
            vibrator: None,
            power: None,
            proximity: None,
            actions: None,
            properties: None,
        }
    }

    pub fn with_zen(mut self, zen: Arc<dyn ZenModeControl>) -> Self {
        self.zen = Some(zen);
        self
    }

    pub fn with_audio(mut self, audio: Arc<dyn AudioControl>) -> Self {
        self.audio = Some(audio);
        self
    }

    pub fn with_vibrator(mut self, vibrator: Arc<dyn Vibrator>) -> Self {
        self.vibrator = Some(vibrator);
        self
    }

    pub fn with_power(mut self, power: Arc<dyn PowerControl>) -> Self {
        self.power = Some(power);
        self
    }

    pub fn with_proximity(mut self, proximity: Arc<dyn ProximitySensor>) -> Self {
        self.proximity = Some(proximity);
        self
    }

    pub fn with_actions(mut self, actions: Arc<dyn ActionExecutor>) -> Self {
        self.actions = Some(actions);
        self
    }

    pub fn with_properties(mut self, properties: Arc<dyn SystemProperties>) -> Self {
        self.properties = Some(properties);
        self
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capabilities")
            .field("zen", &self.zen.is_some())
            .field("audio", &self.audio.is_some())
            .field("vibrator", &self.vibrator.is_some())
            .field("power", &self.power.is_some())
            .field("proximity", &self.proximity.is_some())
            .field("actions", &self.actions.is_some())
            .field("properties", &self.properties.is_some())
            .finish()
    }
}
