//! Scan code classification
//!
//! The input driver reports every supported key and screen-off gesture as a raw
//! integer scan code. This module turns those integers into closed enums so the
//! rest of the pipeline never has to ask "is this code known?" twice.
//!
//! ```text
//! 249          ──► FlipCamera
//! 250..=255    ──► Gesture(..)
//! 600..=605    ──► SliderMode(..)   (604, 605 are the "extra" ringer positions)
//! anything else──► Unsupported
//! ```

use crate::device::{RingerMode, ZenMode};
use std::fmt;

pub const FLIP_CAMERA_SCANCODE: u32 = 249;

pub const GESTURE_CIRCLE_SCANCODE: u32 = 250;
pub const GESTURE_SWIPE_DOWN_SCANCODE: u32 = 251;
pub const GESTURE_V_SCANCODE: u32 = 252;
pub const GESTURE_LTR_SCANCODE: u32 = 253;
pub const GESTURE_GTR_SCANCODE: u32 = 254;
pub const GESTURE_V_UP_SCANCODE: u32 = 255;

pub const MODE_TOTAL_SILENCE: u32 = 600;
pub const MODE_ALARMS_ONLY: u32 = 601;
pub const MODE_PRIORITY_ONLY: u32 = 602;
pub const MODE_NONE: u32 = 603;
pub const MODE_VIBRATE: u32 = 604;
pub const MODE_RING: u32 = 605;

/// Result of classifying a raw scan code
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScanCodeClass {
    Unsupported,
    FlipCamera,
    SliderMode(SliderPosition),
    Gesture(Gesture),
}

impl ScanCodeClass {
    /// Codes the direct key-event path is responsible for
    pub fn is_key_path(&self) -> bool {
        matches!(self, ScanCodeClass::FlipCamera | ScanCodeClass::SliderMode(_))
    }
}

/// Total classification of a raw scan code. Unknown codes are `Unsupported`.
pub fn classify(scan_code: u32) -> ScanCodeClass {
    if scan_code == FLIP_CAMERA_SCANCODE {
        return ScanCodeClass::FlipCamera;
    }
    if let Some(position) = SliderPosition::from_scan_code(scan_code) {
        return ScanCodeClass::SliderMode(position);
    }
    if let Some(gesture) = Gesture::from_scan_code(scan_code) {
        return ScanCodeClass::Gesture(gesture);
    }
    ScanCodeClass::Unsupported
}

/// Screen-off touch patterns recognized by the touch controller
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Gesture {
    Circle,
    SwipeDown,
    V,
    LeftToRight,
    GreaterThan,
    VUp,
}

impl Gesture {
    pub const ALL: [Gesture; 6] = [
        Gesture::Circle,
        Gesture::SwipeDown,
        Gesture::V,
        Gesture::LeftToRight,
        Gesture::GreaterThan,
        Gesture::VUp,
    ];

    pub fn from_scan_code(scan_code: u32) -> Option<Self> {
        match scan_code {
            GESTURE_CIRCLE_SCANCODE => Some(Gesture::Circle),
            GESTURE_SWIPE_DOWN_SCANCODE => Some(Gesture::SwipeDown),
            GESTURE_V_SCANCODE => Some(Gesture::V),
            GESTURE_LTR_SCANCODE => Some(Gesture::LeftToRight),
            GESTURE_GTR_SCANCODE => Some(Gesture::GreaterThan),
            GESTURE_V_UP_SCANCODE => Some(Gesture::VUp),
            _ => None,
        }
    }

    pub fn scan_code(self) -> u32 {
        match self {
            Gesture::Circle => GESTURE_CIRCLE_SCANCODE,
            Gesture::SwipeDown => GESTURE_SWIPE_DOWN_SCANCODE,
            Gesture::V => GESTURE_V_SCANCODE,
            Gesture::LeftToRight => GESTURE_LTR_SCANCODE,
            Gesture::GreaterThan => GESTURE_GTR_SCANCODE,
            Gesture::VUp => GESTURE_V_UP_SCANCODE,
        }
    }
}

impl fmt::Display for Gesture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gesture::Circle => write!(f, "Circle"),
            Gesture::SwipeDown => write!(f, "SwipeDown"),
            Gesture::V => write!(f, "V"),
            Gesture::LeftToRight => write!(f, "LeftToRight"),
            Gesture::GreaterThan => write!(f, "GreaterThan"),
            Gesture::VUp => write!(f, "VUp"),
        }
    }
}

/// Mode a slider position switches to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TargetMode {
    Zen(ZenMode),
    Ringer(RingerMode),
}

/// Positions of the three-stage alert slider, including the two extra
/// ringer-only positions
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SliderPosition {
    TotalSilence,
    AlarmsOnly,
    PriorityOnly,
    ZenOff,
    Vibrate,
    Ring,
}

/// One row of the slider table
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SliderMode {
    pub scan_code: u32,
    pub target: TargetMode,
    pub extra: bool,
}

/// Ordered slider table, one row per slider scan code
pub const SLIDER_MODE_TABLE: [SliderMode; 6] = [
    SliderPosition::TotalSilence.mode(),
    SliderPosition::AlarmsOnly.mode(),
    SliderPosition::PriorityOnly.mode(),
    SliderPosition::ZenOff.mode(),
    SliderPosition::Vibrate.mode(),
    SliderPosition::Ring.mode(),
];

impl SliderPosition {
    pub fn from_scan_code(scan_code: u32) -> Option<Self> {
        match scan_code {
            MODE_TOTAL_SILENCE => Some(SliderPosition::TotalSilence),
            MODE_ALARMS_ONLY => Some(SliderPosition::AlarmsOnly),
            MODE_PRIORITY_ONLY => Some(SliderPosition::PriorityOnly),
            MODE_NONE => Some(SliderPosition::ZenOff),
            MODE_VIBRATE => Some(SliderPosition::Vibrate),
            MODE_RING => Some(SliderPosition::Ring),
            _ => None,
        }
    }

    pub const fn mode(self) -> SliderMode {
        let (scan_code, target) = match self {
            SliderPosition::TotalSilence => {
                (MODE_TOTAL_SILENCE, TargetMode::Zen(ZenMode::NoInterruptions))
            }
            SliderPosition::AlarmsOnly => (MODE_ALARMS_ONLY, TargetMode::Zen(ZenMode::AlarmsOnly)),
            SliderPosition::PriorityOnly => {
                (MODE_PRIORITY_ONLY, TargetMode::Zen(ZenMode::PriorityOnly))
            }
            SliderPosition::ZenOff => (MODE_NONE, TargetMode::Zen(ZenMode::Off)),
            SliderPosition::Vibrate => (MODE_VIBRATE, TargetMode::Ringer(RingerMode::Vibrate)),
            SliderPosition::Ring => (MODE_RING, TargetMode::Ringer(RingerMode::Normal)),
        };
        SliderMode {
            scan_code,
            target,
            // Positions above MODE_NONE only drive the ringer
            extra: scan_code > MODE_NONE,
        }
    }

    pub fn scan_code(self) -> u32 {
        self.mode().scan_code
    }

    pub fn is_extra(self) -> bool {
        self.mode().extra
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_every_known_code() {
        assert_eq!(classify(249), ScanCodeClass::FlipCamera);
        assert_eq!(classify(250), ScanCodeClass::Gesture(Gesture::Circle));
        assert_eq!(classify(255), ScanCodeClass::Gesture(Gesture::VUp));
        assert_eq!(
            classify(600),
            ScanCodeClass::SliderMode(SliderPosition::TotalSilence)
        );
        assert_eq!(classify(605), ScanCodeClass::SliderMode(SliderPosition::Ring));
    }

    #[test]
    fn unknown_codes_are_unsupported() {
        for code in [0, 1, 248, 256, 599, 606, u32::MAX] {
            assert_eq!(classify(code), ScanCodeClass::Unsupported, "code {}", code);
        }
    }

    #[test]
    fn slider_table_lists_each_code_once() {
        let mut codes: Vec<u32> = SLIDER_MODE_TABLE.iter().map(|m| m.scan_code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes, vec![600, 601, 602, 603, 604, 605]);
    }

    #[test]
    fn extra_positions_target_the_ringer() {
        for row in SLIDER_MODE_TABLE {
            let is_ringer = matches!(row.target, TargetMode::Ringer(_));
            assert_eq!(row.extra, is_ringer, "row {:?}", row);
        }
        assert_eq!(
            SliderPosition::Vibrate.mode().target,
            TargetMode::Ringer(RingerMode::Vibrate)
        );
    }

    #[test]
    fn gesture_codes_survive_lookup() {
        for gesture in Gesture::ALL {
            assert_eq!(Gesture::from_scan_code(gesture.scan_code()), Some(gesture));
        }
    }
}
