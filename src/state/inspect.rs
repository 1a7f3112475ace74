//! Display helpers for browsing raw local data

use serde_json::Value;

/// Longest string shown in full
const MAX_TEXT: usize = 50;

/// Characters kept when a string is truncated
const TRUNCATED_TEXT: usize = 47;

/// One-line rendering of a stored JSON value
pub fn summarize_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number.to_string(),
        Value::String(text) => {
            if text.chars().count() > MAX_TEXT {
                let head: String = text.chars().take(TRUNCATED_TEXT).collect();
                format!("\"{}...\"", head)
            } else {
                format!("\"{}\"", text)
            }
        }
        Value::Array(items) => format!("[{} items]", items.len()),
        Value::Object(_) => "{...}".to_string(),
    }
}

/// Human label for a stored field name; unknown keys are shown as-is
pub fn display_label(key: &str) -> &str {
    match key {
        "originalUri" => "Image Path",
        "annotatedUri" => "Annotated Image",
        "detection" => "Detection Result",
        "remedy" => "Recommended Remedy",
        "weather" | "weatherConditions" => "Weather Conditions",
        "location" => "Location Data",
        "date" => "Capture Date",
        "name" => "Folder Name",
        "plantName" => "Plant Name",
        "seedCompany" => "Seed Company",
        "sowingDate" => "Sowing Date",
        "createdAt" => "Created At",
        "images" => "Images",
        "moisture" => "Moisture",
        "temperature" => "Temperature",
        "turbulence" => "Turbulence",
        "latitude" => "Latitude",
        "longitude" => "Longitude",
        "altitude" => "Altitude",
        "timestamp" => "Timestamp",
        other => other,
    }
}

/// Render a value as an indented tree, one `label: summary` per line
pub fn render_tree(value: &Value, level: usize, out: &mut String) {
    let indent = "  ".repeat(level);
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                out.push_str(&format!("{}{}: {}\n", indent, display_label(key), summarize_value(child)));
                if child.is_object() || child.is_array() {
                    render_tree(child, level + 1, out);
                }
            }
        }
        Value::Array(items) => {
            for (i, child) in items.iter().enumerate() {
                out.push_str(&format!("{}[{}]: {}\n", indent, i, summarize_value(child)));
                if child.is_object() || child.is_array() {
                    render_tree(child, level + 1, out);
                }
            }
        }
        _ => {}
    }
}
