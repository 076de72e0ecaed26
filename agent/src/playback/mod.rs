pub mod audio;
pub mod coordinator;
pub mod display;

pub use audio::{check_player_available, ProcessAudioSink};
pub use coordinator::PlaybackCoordinator;
pub use display::{ConsoleDisplay, Status, StatusDisplay};
