use keyhandler::input::key_event::{KeyAction, UnknownKeyAction};
use std::str::FromStr;

/// One line typed into the demo console
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Command {
    Key { scan_code: u32, action: KeyAction },
    Gesture(u32),
    Proximity(Reading),
    Navbar(bool),
    Status,
    Quit,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Reading {
    /// The sensor's maximum range, i.e. something is over the sensor
    Covered,
    Value(f32),
}

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Empty command")]
    Empty,

    #[error("Unknown command: {0}")]
    Unknown(String),

    #[error("Missing argument for {0}")]
    MissingArgument(&'static str),

    #[error("Invalid number: {0}")]
    InvalidNumber(String),

    #[error(transparent)]
    KeyAction(#[from] UnknownKeyAction),

    #[error("Expected on or off, got {0}")]
    InvalidSwitch(String),
}

fn parse_scan_code(arg: Option<&str>, command: &'static str) -> Result<u32, CommandError> {
    let arg = arg.ok_or(CommandError::MissingArgument(command))?;
    arg.parse()
        .map_err(|_| CommandError::InvalidNumber(arg.to_string()))
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut parts = line.split_whitespace();
        let Some(name) = parts.next() else {
            return Err(CommandError::Empty);
        };

        match name.to_lowercase().as_str() {
            "key" => {
                let scan_code = parse_scan_code(parts.next(), "key")?;
                let action = match parts.next() {
                    Some(action) => action.parse()?,
                    None => KeyAction::Up,
                };
                Ok(Command::Key { scan_code, action })
            }
            "gesture" => Ok(Command::Gesture(parse_scan_code(parts.next(), "gesture")?)),
            "proximity" => {
                let arg = parts
                    .next()
                    .ok_or(CommandError::MissingArgument("proximity"))?;
                if arg.eq_ignore_ascii_case("covered") {
                    return Ok(Command::Proximity(Reading::Covered));
                }
                let value = arg
                    .parse()
                    .map_err(|_| CommandError::InvalidNumber(arg.to_string()))?;
                Ok(Command::Proximity(Reading::Value(value)))
            }
            "navbar" => match parts.next() {
                Some("on") => Ok(Command::Navbar(true)),
                Some("off") => Ok(Command::Navbar(false)),
                Some(other) => Err(CommandError::InvalidSwitch(other.to_string())),
                None => Err(CommandError::MissingArgument("navbar")),
            },
            "status" => Ok(Command::Status),
            "quit" | "exit" => Ok(Command::Quit),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}
