//! Shared data structures for the catalog
//!
//! These structs are the records persisted under the folders key and the
//! inputs the capture flow hands to the repository. Field names are written
//! in camelCase so the stored JSON stays readable by the mobile front-end.

use crate::error::{CatalogError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;

/// Geo-coordinate captured from the device
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct GeoLocation {
    pub latitude: f64,
    pub longitude: f64,
    /// Not every fix carries an altitude
    #[serde(default)]
    pub altitude: Option<f64>,
    /// Unix milliseconds of the fix; fractional values are truncated
    #[serde(deserialize_with = "whole_millis")]
    pub timestamp: i64,
}

impl GeoLocation {
    /// Create a location fixed at the current time
    pub fn now(latitude: f64, longitude: f64, altitude: Option<f64>) -> Self {
        Self {
            latitude,
            longitude,
            altitude,
            timestamp: Utc::now().timestamp_millis(),
        }
    }
}

/// Weather conditions recorded for a planting
///
/// Every field is free text. Older records stored numbers for moisture and
/// temperature; those are read back as their decimal text.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Weather {
    #[serde(default, deserialize_with = "text_or_number")]
    pub moisture: String,
    #[serde(default, deserialize_with = "text_or_number")]
    pub temperature: String,
    #[serde(default, deserialize_with = "text_or_number")]
    pub turbulence: String,
}

impl Weather {
    pub fn new(
        moisture: impl Into<String>,
        temperature: impl Into<String>,
        turbulence: impl Into<String>,
    ) -> Self {
        Self {
            moisture: moisture.into(),
            temperature: temperature.into(),
            turbulence: turbulence.into(),
        }
    }

    /// True when no field has been filled in
    pub fn is_empty(&self) -> bool {
        self.moisture.is_empty() && self.temperature.is_empty() && self.turbulence.is_empty()
    }
}

/// One processed observation saved into a folder
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImageEntry {
    /// Durable path of the copied image under the folder directory
    pub original_uri: String,
    /// Server-annotated result media, when the capture flow supplied one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotated_uri: Option<String>,
    #[serde(default, deserialize_with = "text_or_number")]
    pub detection: String,
    #[serde(default, deserialize_with = "text_or_number")]
    pub remedy: String,
    /// Copy of the folder's weather at the moment the image was saved
    #[serde(default)]
    pub weather: Weather,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub location: Option<GeoLocation>,
}

/// A named collection of observations for one planting
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    pub id: String,
    pub name: String,
    pub plant_name: String,
    pub seed_company: String,
    pub sowing_date: DateTime<Utc>,
    #[serde(default)]
    pub location: Option<GeoLocation>,
    #[serde(default)]
    pub weather_conditions: Weather,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub images: Vec<ImageEntry>,
}

/// User input for a new folder
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FolderDraft {
    pub name: String,
    pub plant_name: String,
    pub seed_company: String,
    /// Defaults to the creation time
    pub sowing_date: Option<DateTime<Utc>>,
    pub location: Option<GeoLocation>,
    pub weather_conditions: Weather,
}

impl FolderDraft {
    /// Create a draft with the three required labels
    pub fn new(
        name: impl Into<String>,
        plant_name: impl Into<String>,
        seed_company: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            plant_name: plant_name.into(),
            seed_company: seed_company.into(),
            ..Self::default()
        }
    }

    /// Reject drafts with an empty required label
    pub fn validate(&self) -> Result<()> {
        require("name", &self.name)?;
        require("plantName", &self.plant_name)?;
        require("seedCompany", &self.seed_company)?;
        Ok(())
    }
}

/// Field replacements for an existing folder
///
/// `None` leaves a field untouched. `location: Some(None)` clears the
/// folder's location. The id, creation time and images cannot be patched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FolderPatch {
    pub name: Option<String>,
    pub plant_name: Option<String>,
    pub seed_company: Option<String>,
    pub sowing_date: Option<DateTime<Utc>>,
    pub location: Option<Option<GeoLocation>>,
    pub weather_conditions: Option<Weather>,
}

impl FolderPatch {
    /// True when the patch would not change anything
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply the patch to a folder in place
    ///
    /// The folder is only modified when every replaced label is non-empty.
    pub fn apply(&self, folder: &mut Folder) -> Result<()> {
        if let Some(name) = &self.name {
            require("name", name)?;
        }
        if let Some(plant_name) = &self.plant_name {
            require("plantName", plant_name)?;
        }
        if let Some(seed_company) = &self.seed_company {
            require("seedCompany", seed_company)?;
        }

        if let Some(name) = &self.name {
            folder.name = name.clone();
        }
        if let Some(plant_name) = &self.plant_name {
            folder.plant_name = plant_name.clone();
        }
        if let Some(seed_company) = &self.seed_company {
            folder.seed_company = seed_company.clone();
        }
        if let Some(sowing_date) = self.sowing_date {
            folder.sowing_date = sowing_date;
        }
        if let Some(location) = self.location {
            folder.location = location;
        }
        if let Some(weather) = &self.weather_conditions {
            folder.weather_conditions = weather.clone();
        }
        Ok(())
    }
}

/// Where the image bytes of a capture currently live
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// A file on disk (camera roll, gallery pick, cache)
    Path(PathBuf),
    /// An embedded `data:image/...;base64,` reference
    DataUri(String),
}

impl ImageSource {
    /// Classify an image reference handed over by the capture flow
    pub fn parse(reference: &str) -> Self {
        if reference.starts_with("data:image") {
            ImageSource::DataUri(reference.to_string())
        } else {
            ImageSource::Path(crate::media::files::uri_to_path(reference))
        }
    }
}

impl From<&str> for ImageSource {
    fn from(reference: &str) -> Self {
        ImageSource::parse(reference)
    }
}

/// The result of a successful inference, ready to be saved into a folder
#[derive(Debug, Clone, PartialEq)]
pub struct Capture {
    pub image: ImageSource,
    pub detection: String,
    pub remedy: String,
    pub location: Option<GeoLocation>,
    pub annotated_uri: Option<String>,
}

impl Capture {
    pub fn new(
        image: impl Into<ImageSource>,
        detection: impl Into<String>,
        remedy: impl Into<String>,
    ) -> Self {
        Self {
            image: image.into(),
            detection: detection.into(),
            remedy: remedy.into(),
            location: None,
            annotated_uri: None,
        }
    }

    pub fn with_location(mut self, location: GeoLocation) -> Self {
        self.location = Some(location);
        self
    }
}

impl From<PathBuf> for ImageSource {
    fn from(path: PathBuf) -> Self {
        ImageSource::Path(path)
    }
}

fn require(field: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(CatalogError::Validation(field));
    }
    Ok(())
}

/// Accept a string, a number, or null where free text is expected
fn text_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Loose {
        Text(String),
        Number(serde_json::Number),
        Flag(bool),
    }

    Ok(match Option::<Loose>::deserialize(deserializer)? {
        Some(Loose::Text(text)) => text,
        Some(Loose::Number(number)) => number.to_string(),
        Some(Loose::Flag(flag)) => flag.to_string(),
        None => String::new(),
    })
}

/// Accept integer or fractional milliseconds
fn whole_millis<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let number = serde_json::Number::deserialize(deserializer)?;
    number
        .as_i64()
        .or_else(|| number.as_f64().map(|millis| millis.trunc() as i64))
        .ok_or_else(|| serde::de::Error::custom(format!("timestamp out of range: {}", number)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draft_requires_labels() {
        assert!(FolderDraft::new("Field A", "Tomato", "AgriCo").validate().is_ok());

        let err = FolderDraft::new("Field A", "", "AgriCo").validate().unwrap_err();
        assert!(matches!(err, CatalogError::Validation("plantName")));

        let err = FolderDraft::new("   ", "Tomato", "AgriCo").validate().unwrap_err();
        assert!(matches!(err, CatalogError::Validation("name")));
    }

    #[test]
    fn test_folder_reads_legacy_record() {
        // Shape written by the mobile front-end: numeric weather, null
        // altitude, no annotated media
        let json = r#"{
            "id": "1717171717171",
            "name": "North plot",
            "plantName": "Tomato",
            "seedCompany": "AgriCo",
            "sowingDate": "2024-05-01T08:00:00.000Z",
            "location": {"latitude": 12.5, "longitude": 77.1, "altitude": null, "timestamp": 1717171717000},
            "weatherConditions": {"moisture": 40, "temperature": 27.5, "turbulence": "low"},
            "createdAt": "2024-05-31T16:08:37.171Z",
            "images": [{
                "originalUri": "/data/folders/1717171717171/image_2024-06-01T09-00-00-000Z.jpg",
                "detection": "Healthy crop - no diseases detected",
                "remedy": null,
                "weather": {"moisture": "", "temperature": "", "turbulence": ""},
                "date": "2024-06-01T09:00:00.000Z",
                "location": null
            }]
        }"#;

        let folder: Folder = serde_json::from_str(json).unwrap();
        assert_eq!(folder.weather_conditions.moisture, "40");
        assert_eq!(folder.weather_conditions.temperature, "27.5");
        assert_eq!(folder.location.unwrap().altitude, None);
        assert_eq!(folder.images.len(), 1);
        assert_eq!(folder.images[0].remedy, "");
        assert!(folder.images[0].annotated_uri.is_none());
    }

    #[test]
    fn test_fractional_fix_timestamp() {
        let json = r#"{
            "id": "1",
            "name": "a",
            "plantName": "b",
            "seedCompany": "c",
            "sowingDate": "2024-05-01T08:00:00Z",
            "location": {"latitude": 1.5, "longitude": 2.5, "altitude": 10.25, "timestamp": 1717171717123.456},
            "createdAt": "2024-05-01T08:00:00Z",
            "images": [{
                "originalUri": "/data/a.jpg",
                "detection": "x",
                "remedy": "",
                "date": "2024-05-01T08:00:00Z",
                "location": {"latitude": 1.5, "longitude": 2.5, "timestamp": 1717171717999.9}
            }]
        }"#;

        let folder: Folder = serde_json::from_str(json).unwrap();
        assert_eq!(folder.location.unwrap().timestamp, 1_717_171_717_123);
        assert_eq!(folder.images[0].location.unwrap().timestamp, 1_717_171_717_999);

        // Written back as whole milliseconds
        let value = serde_json::to_value(&folder).unwrap();
        assert_eq!(value["location"]["timestamp"], serde_json::json!(1_717_171_717_123i64));
    }

    #[test]
    fn test_missing_weather_defaults_to_empty() {
        let json = r#"{
            "id": "1",
            "name": "a",
            "plantName": "b",
            "seedCompany": "c",
            "sowingDate": "2024-05-01T08:00:00Z",
            "createdAt": "2024-05-01T08:00:00Z"
        }"#;

        let folder: Folder = serde_json::from_str(json).unwrap();
        assert!(folder.weather_conditions.is_empty());
        assert!(folder.images.is_empty());
        assert!(folder.location.is_none());
    }

    #[test]
    fn test_serialized_field_names() {
        let entry = ImageEntry {
            original_uri: "/tmp/a.jpg".to_string(),
            annotated_uri: None,
            detection: "x".to_string(),
            remedy: String::new(),
            weather: Weather::default(),
            date: Utc::now(),
            location: None,
        };
        let value = serde_json::to_value(&entry).unwrap();
        assert!(value.get("originalUri").is_some());
        assert!(value.get("annotatedUri").is_none());
        assert!(value.get("location").unwrap().is_null());
    }

    #[test]
    fn test_patch_rejects_empty_label_without_partial_update() {
        let mut folder = Folder {
            id: "1".to_string(),
            name: "Field A".to_string(),
            plant_name: "Tomato".to_string(),
            seed_company: "AgriCo".to_string(),
            sowing_date: Utc::now(),
            location: None,
            weather_conditions: Weather::default(),
            created_at: Utc::now(),
            images: Vec::new(),
        };
        let before = folder.clone();

        let patch = FolderPatch {
            name: Some("Field B".to_string()),
            seed_company: Some(String::new()),
            ..FolderPatch::default()
        };
        assert!(patch.apply(&mut folder).is_err());
        assert_eq!(folder, before);

        let patch = FolderPatch {
            weather_conditions: Some(Weather::new("55", "30", "calm")),
            location: Some(Some(GeoLocation::now(1.0, 2.0, None))),
            ..FolderPatch::default()
        };
        patch.apply(&mut folder).unwrap();
        assert_eq!(folder.weather_conditions.moisture, "55");
        assert!(folder.location.is_some());
        assert_eq!(folder.name, "Field A");
    }

    #[test]
    fn test_image_source_parse() {
        assert_eq!(
            ImageSource::parse("file:///tmp/a.jpg"),
            ImageSource::Path(PathBuf::from("/tmp/a.jpg"))
        );
        assert!(matches!(
            ImageSource::parse("data:image/jpeg;base64,AAAA"),
            ImageSource::DataUri(_)
        ));
    }
}
