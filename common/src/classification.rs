use serde::{Deserialize, Serialize};

/// Label the classifier returns when no subject is in the frame.
pub const NO_FACE_LABEL: &str = "No Face";

/// Path prefix under which suggested media files are served.
pub const SONGS_PREFIX: &str = "/songs/";

/// The classifier's judgment for one frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub label: String,
    #[serde(default)]
    pub suggestion: Option<Suggestion>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub title: String,
    pub artist: String,
    /// Some catalog entries carry no file; those can be shown but not played.
    #[serde(default)]
    pub file: Option<String>,
}

impl ClassificationResult {
    pub fn new(label: impl Into<String>, suggestion: Option<Suggestion>) -> Self {
        Self {
            label: label.into(),
            suggestion,
        }
    }

    pub fn is_no_subject(&self) -> bool {
        self.label == NO_FACE_LABEL
    }
}

impl Suggestion {
    pub fn new(title: impl Into<String>, artist: impl Into<String>, file: Option<&str>) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
            file: file.map(String::from),
        }
    }

    /// Media reference for the suggested file, e.g. `/songs/happy.mp3`.
    pub fn media_ref(&self) -> Option<String> {
        self.file.as_deref().map(|f| format!("{SONGS_PREFIX}{f}"))
    }

    pub fn display_text(&self) -> String {
        format!("How about: {} by {}", self.title, self.artist)
    }
}
