use std::fmt;
use std::str::FromStr;

use feedback_core::{SensorKind, VisualStyle};

/// Control input from the operator, one per line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start(SensorKind),
    Stop(SensorKind),
    Random(bool),
    AllowSensing(bool),
    /// Answer a pending permission request for a sensor.
    Permit(SensorKind, bool),
    Vibration(bool),
    Sound(bool),
    Style(VisualStyle),
    Status,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command '{0}'")]
    Unknown(String),
    #[error("'{command}' expects {expected}")]
    BadArgument {
        command: &'static str,
        expected: &'static str,
    },
}

fn switch(command: &'static str, arg: Option<&str>) -> Result<bool, CommandError> {
    match arg.map(str::to_ascii_lowercase).as_deref() {
        Some("on") => Ok(true),
        Some("off") => Ok(false),
        _ => Err(CommandError::BadArgument {
            command,
            expected: "on|off",
        }),
    }
}

fn kind(command: &'static str, arg: Option<&str>) -> Result<SensorKind, CommandError> {
    arg.and_then(|a| a.parse().ok())
        .ok_or(CommandError::BadArgument {
            command,
            expected: "health|location|activity",
        })
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Err(CommandError::Empty);
        };
        let arg = words.next();

        match head.to_ascii_lowercase().as_str() {
            "start" => kind("start", arg).map(Command::Start),
            "stop" => kind("stop", arg).map(Command::Stop),
            "random" => switch("random", arg).map(Command::Random),
            "allow" => switch("allow", arg).map(Command::AllowSensing),
            "permit" => {
                let kind = kind("permit", arg)?;
                let allowed = switch("permit", words.next())?;
                Ok(Command::Permit(kind, allowed))
            }
            "vibration" => switch("vibration", arg).map(Command::Vibration),
            "sound" => switch("sound", arg).map(Command::Sound),
            "style" => arg
                .and_then(|a| a.parse().ok())
                .map(Command::Style)
                .ok_or(CommandError::BadArgument {
                    command: "style",
                    expected: "ring|icon|notification",
                }),
            "status" => Ok(Command::Status),
            "quit" | "exit" => Ok(Command::Quit),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let on_off = |b: bool| if b { "on" } else { "off" };
        match self {
            Command::Start(kind) => write!(f, "start {kind}"),
            Command::Stop(kind) => write!(f, "stop {kind}"),
            Command::Random(on) => write!(f, "random {}", on_off(*on)),
            Command::AllowSensing(on) => write!(f, "allow {}", on_off(*on)),
            Command::Permit(kind, on) => write!(f, "permit {kind} {}", on_off(*on)),
            Command::Vibration(on) => write!(f, "vibration {}", on_off(*on)),
            Command::Sound(on) => write!(f, "sound {}", on_off(*on)),
            Command::Style(style) => write!(f, "style {}", style.as_str().to_ascii_lowercase()),
            Command::Status => f.write_str("status"),
            Command::Quit => f.write_str("quit"),
        }
    }
}
