use crate::device::PreferenceStore;
use crate::gesture::action::{
    ACTION_CAMERA, ACTION_MEDIA_NEXT, ACTION_MEDIA_PLAY_PAUSE, ACTION_MEDIA_PREVIOUS,
    ACTION_TORCH, ACTION_VIB_SILENT,
};
use crate::input::scan_code::Gesture;
use std::sync::Arc;
use tracing::debug;

pub const DEFAULT_GESTURE_NAMESPACE: &str = "screen_off_gestures";

impl Gesture {
    /// Preference key holding the user's action for this gesture
    pub fn preference_key(self) -> &'static str {
        match self {
            Gesture::Circle => "gesture_circle",
            Gesture::SwipeDown => "gesture_double_swipe",
            Gesture::V => "gesture_arrow_down",
            Gesture::VUp => "gesture_arrow_up",
            Gesture::LeftToRight => "gesture_arrow_left",
            Gesture::GreaterThan => "gesture_arrow_right",
        }
    }

    /// Action used when the user never configured this gesture
    pub fn default_action(self) -> &'static str {
        match self {
            Gesture::Circle => ACTION_CAMERA,
            Gesture::SwipeDown => ACTION_MEDIA_PLAY_PAUSE,
            Gesture::V => ACTION_VIB_SILENT,
            Gesture::VUp => ACTION_TORCH,
            Gesture::LeftToRight => ACTION_MEDIA_PREVIOUS,
            Gesture::GreaterThan => ACTION_MEDIA_NEXT,
        }
    }
}

/// Gesture → action lookup scoped to one preference namespace
#[derive(Clone)]
pub struct GesturePreferences {
    store: Arc<dyn PreferenceStore>,
    namespace: String,
}

impl GesturePreferences {
    pub fn new(store: Arc<dyn PreferenceStore>, namespace: impl Into<String>) -> Self {
        Self {
            store,
            namespace: namespace.into(),
        }
    }

    pub fn resolve(&self, gesture: Gesture) -> String {
        match self.store.get_string(&self.namespace, gesture.preference_key()) {
            Some(action) => {
                debug!("Gesture {} configured as '{}'", gesture, action);
                action
            }
            None => {
                debug!(
                    "Gesture {} not configured, using default '{}'",
                    gesture,
                    gesture.default_action()
                );
                gesture.default_action().to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::simulated::InMemoryPreferences;

    #[test]
    fn falls_back_to_defaults() {
        let prefs = GesturePreferences::new(
            Arc::new(InMemoryPreferences::new(true)),
            DEFAULT_GESTURE_NAMESPACE,
        );
        assert_eq!(prefs.resolve(Gesture::Circle), ACTION_CAMERA);
        assert_eq!(prefs.resolve(Gesture::VUp), ACTION_TORCH);
        assert_eq!(prefs.resolve(Gesture::LeftToRight), ACTION_MEDIA_PREVIOUS);
    }

    #[test]
    fn stored_value_wins_within_namespace() {
        let store = Arc::new(InMemoryPreferences::new(true));
        store.set(DEFAULT_GESTURE_NAMESPACE, "gesture_circle", "**torch**");
        store.set("elsewhere", "gesture_double_swipe", "**torch**");
        let prefs = GesturePreferences::new(store, DEFAULT_GESTURE_NAMESPACE);

        assert_eq!(prefs.resolve(Gesture::Circle), "**torch**");
        assert_eq!(prefs.resolve(Gesture::SwipeDown), ACTION_MEDIA_PLAY_PAUSE);
    }
}
