use std::fmt;

/// What the status line currently says.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    AwaitingInteraction,
    Detecting,
    DeviceUnavailable,
    Label(String),
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::AwaitingInteraction => f.write_str("Press Enter to start detection."),
            Status::Detecting => f.write_str("Detecting..."),
            Status::DeviceUnavailable => f.write_str("Could not access camera."),
            Status::Label(label) => f.write_str(label),
        }
    }
}

/// Where the status line and the song suggestion are shown.
/// Written by the agent, never read back.
pub trait StatusDisplay: Send {
    fn show_status(&mut self, status: &Status);

    /// `None` clears the suggestion.
    fn show_suggestion(&mut self, text: Option<&str>);
}

/// Prints to stdout, skipping repeats so a steady label does not spam
/// the terminal every tick.
#[derive(Default)]
pub struct ConsoleDisplay {
    status: Option<Status>,
    suggestion: Option<String>,
}

impl ConsoleDisplay {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StatusDisplay for ConsoleDisplay {
    fn show_status(&mut self, status: &Status) {
        if self.status.as_ref() == Some(status) {
            return;
        }
        println!("{status}");
        self.status = Some(status.clone());
    }

    fn show_suggestion(&mut self, text: Option<&str>) {
        if self.suggestion.as_deref() == text {
            return;
        }
        match text {
            Some(t) => println!("  {t}"),
            None => println!("  (no suggestion)"),
        }
        self.suggestion = text.map(String::from);
    }
}
