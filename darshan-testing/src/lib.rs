mod providers;

use std::str::FromStr;

pub use providers::{
    LogHaptics, MemoryTargetStore, NotifySender, SimHeading, SimLocation, SimStore,
};

pub mod prelude {
    pub use anyhow::{Context, anyhow, bail};
    pub type Result<T = (), E = anyhow::Error> = std::result::Result<T, E>;
}

pub use prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// A line typed into a running simulation
pub enum SimCommand {
    /// Dismiss the overlay
    Close,
    /// Forget dismissal and alignment history
    Reset,
    Background,
    Foreground,
    /// Print the current snapshot right away
    Show,
    Quit,
}

impl FromStr for SimCommand {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "close" | "c" => Ok(Self::Close),
            "reset" | "r" => Ok(Self::Reset),
            "bg" | "background" => Ok(Self::Background),
            "fg" | "foreground" => Ok(Self::Foreground),
            "show" | "s" | "" => Ok(Self::Show),
            "quit" | "q" | "exit" => Ok(Self::Quit),
            other => Err(anyhow!(
                "Unknown command \"{other}\", expected one of close, reset, bg, fg, show, quit"
            )),
        }
    }
}
