use std::fmt;
use std::str::FromStr;

/// Direction of a key event
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyAction {
    Down,
    Up,
    Multiple,
}

impl fmt::Display for KeyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyAction::Down => write!(f, "down"),
            KeyAction::Up => write!(f, "up"),
            KeyAction::Multiple => write!(f, "multiple"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown key action: {0}")]
pub struct UnknownKeyAction(pub String);

impl FromStr for KeyAction {
    type Err = UnknownKeyAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "down" => Ok(KeyAction::Down),
            "up" => Ok(KeyAction::Up),
            "multiple" => Ok(KeyAction::Multiple),
            other => Err(UnknownKeyAction(other.to_string())),
        }
    }
}

/// Key event as delivered by the input pipeline
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyEvent {
    pub scan_code: u32,
    pub action: KeyAction,
}

impl KeyEvent {
    pub fn new(scan_code: u32, action: KeyAction) -> Self {
        Self { scan_code, action }
    }

    pub fn down(scan_code: u32) -> Self {
        Self::new(scan_code, KeyAction::Down)
    }

    pub fn up(scan_code: u32) -> Self {
        Self::new(scan_code, KeyAction::Up)
    }
}
