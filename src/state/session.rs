//! Capture screen state
//!
//! The detect screen moves through a small set of states: nothing chosen,
//! a photo/video previewed, a request in flight, a result, or an error.
//! Transitions are pure; events that make no sense in the current state
//! leave it unchanged.

use super::data::{Capture, GeoLocation, ImageSource};
use crate::detection::{DetectionSummary, IMAGE_ENDPOINT, VIDEO_ENDPOINT};

/// Kind of media picked by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Processing endpoint path on the inference server
    pub fn endpoint(self) -> &'static str {
        match self {
            MediaKind::Image => IMAGE_ENDPOINT,
            MediaKind::Video => VIDEO_ENDPOINT,
        }
    }
}

/// A photo or video chosen from the camera or gallery
#[derive(Debug, Clone, PartialEq)]
pub struct MediaSelection {
    pub uri: String,
    pub kind: MediaKind,
    /// Device position when the media was chosen, if permission allowed it
    pub location: Option<GeoLocation>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum CaptureState {
    #[default]
    Idle,
    Previewing {
        media: MediaSelection,
    },
    Processing {
        media: MediaSelection,
    },
    Result {
        media: MediaSelection,
        summary: DetectionSummary,
    },
    Failed {
        media: MediaSelection,
        message: String,
    },
}

/// Events driving the capture screen
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureEvent {
    /// User picked or shot new media
    Select(MediaSelection),
    /// User asked for the media to be processed
    Submit,
    /// The server answered successfully
    Completed(DetectionSummary),
    /// The request failed
    Rejected(String),
    /// User interrupted the request in flight
    Cancel,
    /// User cleared the screen
    Reset,
}

impl CaptureState {
    /// Compute the next state
    pub fn apply(self, event: CaptureEvent) -> CaptureState {
        use CaptureEvent as E;
        use CaptureState as S;

        match (self, event) {
            (_, E::Reset) => S::Idle,

            // A new pick replaces whatever is shown, but not a running request
            (S::Processing { media }, E::Select(_)) => S::Processing { media },
            (_, E::Select(media)) => S::Previewing { media },

            (S::Previewing { media } | S::Failed { media, .. }, E::Submit) => S::Processing { media },

            (S::Processing { media }, E::Completed(summary)) => S::Result { media, summary },
            (S::Processing { media }, E::Rejected(message)) => S::Failed { media, message },

            // Interrupting is silent: back to the preview, no error shown
            (S::Processing { media }, E::Cancel) => S::Previewing { media },

            // Late answers after a cancel, double submits, etc.
            (state, _) => state,
        }
    }

    /// A request is in flight
    pub fn is_busy(&self) -> bool {
        matches!(self, CaptureState::Processing { .. })
    }

    /// The media currently on screen
    pub fn media(&self) -> Option<&MediaSelection> {
        match self {
            CaptureState::Idle => None,
            CaptureState::Previewing { media }
            | CaptureState::Processing { media }
            | CaptureState::Result { media, .. }
            | CaptureState::Failed { media, .. } => Some(media),
        }
    }

    /// Error text to show, if any
    pub fn error(&self) -> Option<&str> {
        match self {
            CaptureState::Failed { message, .. } => Some(message),
            _ => None,
        }
    }

    /// The capture to save into a folder
    ///
    /// Only a finished result can be saved. When diseases were detected the
    /// annotated media returned by the server is the image that gets kept.
    pub fn capture(&self) -> Option<Capture> {
        let CaptureState::Result { media, summary } = self else {
            return None;
        };

        let image = match (&summary.media, summary.diseased) {
            (Some(annotated), true) => annotated.as_str(),
            _ => media.uri.as_str(),
        };

        Some(Capture {
            image: ImageSource::parse(image),
            detection: summary.detection.clone(),
            remedy: summary.remedy.clone(),
            location: media.location,
            annotated_uri: summary.media.clone(),
        })
    }
}
