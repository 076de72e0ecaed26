use moodloop_common::classification::{ClassificationResult, Suggestion};
use tracing::{debug, info, warn};

use super::audio::{AudioSink, PlaybackError};
use super::display::{Status, StatusDisplay};

/// Everything the coordinator remembers between cycles.
///
/// `last_label` is the label behind the audio channel's current content,
/// or the no-subject sentinel / `None` while the channel is idle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaybackState {
    pub last_label: Option<String>,
    pub activated: bool,
}

/// What a classification result did to playback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Audio not yet unlocked; only the label was shown.
    Gated,
    /// Same label as before, or a new label without a suggestion.
    Unchanged,
    /// Switched to the suggested song.
    Switched,
    /// No subject: playback stopped and the suggestion cleared.
    Cleared,
}

/// Owns the playback state, the audio channel and the display, and decides
/// how each classification result changes them.
pub struct PlaybackCoordinator {
    state: PlaybackState,
    audio: Box<dyn AudioSink>,
    display: Box<dyn StatusDisplay>,
}

impl PlaybackCoordinator {
    pub fn new(audio: Box<dyn AudioSink>, mut display: Box<dyn StatusDisplay>) -> Self {
        display.show_status(&Status::AwaitingInteraction);
        Self {
            state: PlaybackState::default(),
            audio,
            display,
        }
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    /// Handle a user interaction. Only the first one counts: it unlocks the
    /// audio channel with a silent play/stop and returns `true`.
    pub fn on_interaction(&mut self) -> bool {
        if self.state.activated {
            debug!("interaction ignored, audio already unlocked");
            return false;
        }
        self.state.activated = true;

        // Nothing is loaded yet, so this cannot make a sound.
        if let Err(e) = self.audio.play() {
            debug!(error = %e, "unlock play refused");
        }
        self.audio.stop();

        info!("audio channel unlocked, detection active");
        self.display.show_status(&Status::Detecting);
        self.display.show_suggestion(None);
        true
    }

    pub fn apply(&mut self, result: &ClassificationResult) -> Transition {
        self.display.show_status(&Status::Label(result.label.clone()));

        if !self.state.activated {
            debug!(label = result.label, "awaiting interaction, playback untouched");
            // The label took the status line; keep the prompt on the line below.
            self.display
                .show_suggestion(Some(&Status::AwaitingInteraction.to_string()));
            return Transition::Gated;
        }

        let changed = self.state.last_label.as_deref() != Some(result.label.as_str());
        match &result.suggestion {
            Some(suggestion) if changed => {
                self.switch_to(&result.label, suggestion);
                Transition::Switched
            }
            _ if changed && result.is_no_subject() => {
                info!(from = ?self.state.last_label, "no subject, stopping playback");
                self.audio.stop();
                self.display.show_suggestion(None);
                self.state.last_label = Some(result.label.clone());
                Transition::Cleared
            }
            _ => {
                debug!(label = result.label, changed, "playback unchanged");
                Transition::Unchanged
            }
        }
    }

    fn switch_to(&mut self, label: &str, suggestion: &Suggestion) {
        info!(
            from = ?self.state.last_label,
            to = label,
            title = suggestion.title,
            artist = suggestion.artist,
            "label changed, switching song"
        );

        self.audio.stop();
        let started = match suggestion.media_ref() {
            Some(media_ref) => {
                self.audio.set_source(&media_ref);
                self.audio.play()
            }
            None => Err(PlaybackError::NoSource),
        };
        if let Err(e) = started {
            warn!(error = %e, label, "playback did not start");
        }

        // The suggestion and label commit even if nothing became audible.
        self.display.show_suggestion(Some(&suggestion.display_text()));
        self.state.last_label = Some(label.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::fakes::{AudioCall, FakeAudio, FakeDisplay};
    use moodloop_common::classification::NO_FACE_LABEL;

    fn song(label: &str, file: &str) -> ClassificationResult {
        ClassificationResult::new(label, Some(Suggestion::new("Title", "Artist", Some(file))))
    }

    fn bare(label: &str) -> ClassificationResult {
        ClassificationResult::new(label, None)
    }

    fn coordinator() -> (PlaybackCoordinator, FakeAudio, FakeDisplay) {
        let audio = FakeAudio::default();
        let display = FakeDisplay::default();
        let c = PlaybackCoordinator::new(Box::new(audio.clone()), Box::new(display.clone()));
        (c, audio, display)
    }

    fn activated() -> (PlaybackCoordinator, FakeAudio, FakeDisplay) {
        let (mut c, audio, display) = coordinator();
        c.on_interaction();
        audio.clear();
        (c, audio, display)
    }

    #[test]
    fn starts_inactive_and_prompts() {
        let (c, audio, display) = coordinator();
        assert_eq!(c.state(), &PlaybackState::default());
        assert_eq!(display.statuses(), vec![Status::AwaitingInteraction]);
        assert!(audio.calls().is_empty());
    }

    #[test]
    fn activation_happens_once() {
        let (mut c, audio, display) = coordinator();
        assert!(c.on_interaction());
        for _ in 0..4 {
            assert!(!c.on_interaction());
        }
        assert!(c.state().activated);
        assert_eq!(audio.calls(), vec![AudioCall::Play, AudioCall::Stop]);
        assert_eq!(display.last_status(), Some(Status::Detecting));
    }

    #[test]
    fn no_audio_before_activation() {
        let (mut c, audio, display) = coordinator();
        for r in [song("Happy", "happy.mp3"), bare(NO_FACE_LABEL), song("Sad", "sad.mp3")] {
            assert_eq!(c.apply(&r), Transition::Gated);
        }
        assert!(audio.calls().is_empty());
        assert_eq!(c.state().last_label, None);
        assert_eq!(display.last_status(), Some(Status::Label("Sad".into())));
        assert_eq!(
            display.suggestion().as_deref(),
            Some("Press Enter to start detection.")
        );
    }

    #[test]
    fn prompt_gives_way_to_detection_on_interaction() {
        let (mut c, _, display) = coordinator();
        c.apply(&song("Happy", "happy.mp3"));
        assert!(display.suggestion().is_some());

        c.on_interaction();
        assert_eq!(display.last_status(), Some(Status::Detecting));
        assert_eq!(display.suggestion(), None);
    }

    #[test]
    fn new_label_with_suggestion_switches_song() {
        let (mut c, audio, display) = activated();
        assert_eq!(c.apply(&song("Happy", "happy.mp3")), Transition::Switched);
        audio.clear();

        assert_eq!(c.apply(&song("Sad", "sad.mp3")), Transition::Switched);
        assert_eq!(
            audio.calls(),
            vec![
                AudioCall::Stop,
                AudioCall::SetSource("/songs/sad.mp3".into()),
                AudioCall::Play
            ]
        );
        assert_eq!(c.state().last_label.as_deref(), Some("Sad"));
        assert_eq!(display.suggestion().as_deref(), Some("How about: Title by Artist"));
    }

    #[test]
    fn same_label_does_not_restart() {
        let (mut c, audio, _) = activated();
        c.apply(&song("Happy", "happy.mp3"));
        audio.clear();

        assert_eq!(c.apply(&song("Happy", "happy2.mp3")), Transition::Unchanged);
        assert!(audio.calls().is_empty());
        assert_eq!(c.state().last_label.as_deref(), Some("Happy"));
    }

    #[test]
    fn new_label_without_suggestion_is_ignored() {
        let (mut c, audio, display) = activated();
        c.apply(&song("Happy", "happy.mp3"));
        audio.clear();

        assert_eq!(c.apply(&bare("Surprised")), Transition::Unchanged);
        assert!(audio.calls().is_empty());
        assert_eq!(c.state().last_label.as_deref(), Some("Happy"));
        assert_eq!(display.last_status(), Some(Status::Label("Surprised".into())));
    }

    #[test]
    fn no_subject_clears_once() {
        let (mut c, audio, display) = activated();
        c.apply(&song("Happy", "happy.mp3"));
        audio.clear();

        assert_eq!(c.apply(&bare(NO_FACE_LABEL)), Transition::Cleared);
        assert_eq!(audio.calls(), vec![AudioCall::Stop]);
        assert_eq!(display.suggestion(), None);
        assert_eq!(c.state().last_label.as_deref(), Some(NO_FACE_LABEL));

        audio.clear();
        assert_eq!(c.apply(&bare(NO_FACE_LABEL)), Transition::Unchanged);
        assert!(audio.calls().is_empty());
    }

    #[test]
    fn no_subject_from_fresh_state_stops_channel() {
        let (mut c, audio, _) = activated();
        assert_eq!(c.apply(&bare(NO_FACE_LABEL)), Transition::Cleared);
        assert_eq!(audio.calls(), vec![AudioCall::Stop]);
    }

    #[test]
    fn failed_play_still_commits() {
        let (mut c, audio, display) = activated();
        audio.refuse_play(true);

        assert_eq!(c.apply(&song("Angry", "angry.mp3")), Transition::Switched);
        assert_eq!(c.state().last_label.as_deref(), Some("Angry"));
        assert_eq!(display.suggestion().as_deref(), Some("How about: Title by Artist"));
    }

    #[test]
    fn suggestion_without_file_shows_text_but_plays_nothing() {
        let (mut c, audio, display) = activated();
        let r = ClassificationResult::new(
            "Happy",
            Some(Suggestion::new("Don't Stop Me Now", "Queen", None)),
        );

        assert_eq!(c.apply(&r), Transition::Switched);
        assert_eq!(audio.calls(), vec![AudioCall::Stop]);
        assert_eq!(c.state().last_label.as_deref(), Some("Happy"));
        assert_eq!(
            display.suggestion().as_deref(),
            Some("How about: Don't Stop Me Now by Queen")
        );
    }
}
