//! Inference response handling
//!
//! The disease-detection server answers with the annotated media and a list
//! of detections. This module turns that answer into the two plain strings
//! stored with an image entry. The repository never looks inside them.

use serde::{Deserialize, Deserializer};

/// Text stored when the server reports nothing and gives no message
pub const HEALTHY_MESSAGE: &str = "Healthy crop - no diseases detected";

/// Server path for still images
pub const IMAGE_ENDPOINT: &str = "/api/process_image/";

/// Server path for videos
pub const VIDEO_ENDPOINT: &str = "/api/process_video/";

/// One detected region
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Detection {
    pub label: String,
    pub confidence: f64,
    #[serde(default)]
    pub disease: Option<String>,
}

/// Body returned by the processing endpoints
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct InferenceResponse {
    #[serde(default)]
    pub media: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub video: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub detections: Vec<Detection>,
    #[serde(default)]
    pub message: Option<String>,
}

impl InferenceResponse {
    /// Parse a response body
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// The annotated result media, whichever field carried it
    pub fn result_media(&self) -> Option<&str> {
        self.media
            .as_deref()
            .or(self.image.as_deref())
            .or(self.video.as_deref())
    }

    /// Summarize into the detection and remedy texts of an image entry
    pub fn summarize(&self) -> DetectionSummary {
        DetectionSummary {
            detection: detection_text(self),
            remedy: remedy_text(&self.detections),
            media: self.result_media().map(str::to_string),
            diseased: !self.detections.is_empty(),
        }
    }
}

/// Strings handed to the repository after a successful inference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectionSummary {
    pub detection: String,
    pub remedy: String,
    /// Annotated result media returned by the server
    pub media: Option<String>,
    /// At least one detection was reported
    pub diseased: bool,
}

fn detection_text(response: &InferenceResponse) -> String {
    if response.detections.is_empty() {
        return response
            .message
            .clone()
            .filter(|message| !message.is_empty())
            .unwrap_or_else(|| HEALTHY_MESSAGE.to_string());
    }

    response
        .detections
        .iter()
        .enumerate()
        .map(|(i, det)| {
            format!(
                "Detection {}: {} (Confidence: {:.2})",
                i + 1,
                det.label,
                round_half_up(det.confidence)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Round to two decimals with ties going up, as the front-end displays it
fn round_half_up(confidence: f64) -> f64 {
    (confidence * 100.0).round() / 100.0
}

/// Unique diseases in first-seen order, joined by ';'
fn remedy_text(detections: &[Detection]) -> String {
    let mut diseases: Vec<&str> = Vec::new();
    for disease in detections.iter().filter_map(|det| det.disease.as_deref()) {
        if !diseases.contains(&disease) {
            diseases.push(disease);
        }
    }
    diseases.join(";")
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<Detection>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Detection>>::deserialize(deserializer)?.unwrap_or_default())
}
