use moodloop_common::config::join_url;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    #[error("no media source set")]
    NoSource,
    #[error("failed to start player: {0}")]
    Spawn(String),
}

/// The single audio output. Only one piece of media is current at a time.
pub trait AudioSink: Send {
    /// Stop whatever is playing. Harmless when idle.
    fn stop(&mut self);

    /// Point the channel at a media reference such as `/songs/happy.mp3`.
    /// Does not start playback.
    fn set_source(&mut self, media_ref: &str);

    /// Start the current source from the beginning, stopping anything
    /// already playing.
    fn play(&mut self) -> Result<(), PlaybackError>;
}

/// Audio channel backed by an external player process (ffplay by default).
///
/// Each `play` spawns the player on the resolved URL; `stop` kills it.
pub struct ProcessAudioSink {
    player: String,
    args: Vec<String>,
    media_base_url: String,
    source: Option<String>,
    child: Option<Child>,
}

impl ProcessAudioSink {
    pub fn new(player: impl Into<String>, args: Vec<String>, media_base_url: impl Into<String>) -> Self {
        Self {
            player: player.into(),
            args,
            media_base_url: media_base_url.into(),
            source: None,
            child: None,
        }
    }

    fn resolve(&self, media_ref: &str) -> String {
        join_url(&self.media_base_url, media_ref)
    }

    pub fn is_playing(&mut self) -> bool {
        match self.child.as_mut().map(|c| c.try_wait()) {
            Some(Ok(None)) => true,
            Some(Ok(Some(_))) | Some(Err(_)) | None => false,
        }
    }
}

impl AudioSink for ProcessAudioSink {
    fn stop(&mut self) {
        let running = self.is_playing();
        let Some(mut child) = self.child.take() else {
            return;
        };
        if !running {
            debug!("player already finished");
            return;
        }
        match child.start_kill() {
            Ok(()) => debug!(pid = child.id(), "stopped player"),
            Err(e) => warn!(error = %e, "failed to stop player"),
        }
    }

    fn set_source(&mut self, media_ref: &str) {
        self.source = Some(media_ref.to_string());
    }

    fn play(&mut self) -> Result<(), PlaybackError> {
        self.stop();
        let source = self.source.as_deref().ok_or(PlaybackError::NoSource)?;
        let url = self.resolve(source);

        let child = Command::new(&self.player)
            .args(&self.args)
            .arg(&url)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| PlaybackError::Spawn(e.to_string()))?;

        info!(player = self.player, url, pid = child.id(), "playing");
        self.child = Some(child);
        Ok(())
    }
}

/// Check whether the player is on PATH. Logs a warning if not found.
pub async fn check_player_available(player: &str) {
    match Command::new(player).arg("-version").output().await {
        Ok(out) if out.status.success() => {
            debug!(player, "audio player is available");
        }
        Ok(_) => {
            warn!(player, "audio player returned non-zero for -version; playback may fail");
        }
        Err(e) => {
            warn!(
                error = %e,
                player,
                "audio player not found on PATH; songs will not be audible"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sink(player: &str, args: &[&str]) -> ProcessAudioSink {
        ProcessAudioSink::new(
            player,
            args.iter().map(|a| a.to_string()).collect(),
            "http://127.0.0.1:5000",
        )
    }

    #[test]
    fn resolves_media_ref_against_base() {
        let s = sink("ffplay", &[]);
        assert_eq!(s.resolve("/songs/happy.mp3"), "http://127.0.0.1:5000/songs/happy.mp3");
    }

    #[tokio::test]
    async fn play_without_source_fails() {
        let mut s = sink("ffplay", &[]);
        assert!(matches!(s.play(), Err(PlaybackError::NoSource)));
        assert!(!s.is_playing());
    }

    #[tokio::test]
    async fn missing_player_is_spawn_error() {
        let mut s = sink("moodloop-no-such-player", &[]);
        s.set_source("/songs/sad.mp3");
        assert!(matches!(s.play(), Err(PlaybackError::Spawn(_))));
        assert!(!s.is_playing());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn play_then_stop_kills_player() {
        // sh -c takes the trailing url as a positional parameter and ignores it
        let mut s = sink("sh", &["-c", "sleep 30", "player"]);
        s.set_source("/songs/happy.mp3");
        s.play().unwrap();
        assert!(s.is_playing());

        s.stop();
        assert!(!s.is_playing());
        assert!(s.child.is_none());
    }
}
