use serde::Deserialize;
use std::collections::HashMap;

/// Every intent API answer is wrapped in `{"response": ...}`
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub response: T,
}

#[derive(Debug, Deserialize)]
pub struct AuthToken {
    #[serde(rename = "Token")]
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Site {
    pub id: String,
    pub name: Option<String>,
    pub group_name_hierarchy: Option<String>,
    #[serde(default)]
    pub additional_info: Vec<AdditionalInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalInfo {
    pub name_space: String,
    #[serde(default)]
    pub attributes: HashMap<String, serde_json::Value>,
}

impl Site {
    pub fn location(&self) -> Option<&HashMap<String, serde_json::Value>> {
        self.additional_info
            .iter()
            .find(|info| info.name_space == "Location")
            .map(|info| &info.attributes)
    }

    /// Site id the floor takes its address from (its building)
    pub fn address_inherited_from(&self) -> Option<String> {
        attr_str(self.location()?, "addressInheritedFrom")
    }

    pub fn lat_lng(&self) -> Option<(f64, f64)> {
        let location = self.location()?;
        Some((attr_f64(location, "latitude")?, attr_f64(location, "longitude")?))
    }
}

fn attr_str(attributes: &HashMap<String, serde_json::Value>, key: &str) -> Option<String> {
    match attributes.get(key)? {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

// Catalyst Center sends coordinates as strings, accept numbers too
fn attr_f64(attributes: &HashMap<String, serde_json::Value>, key: &str) -> Option<f64> {
    match attributes.get(key)? {
        serde_json::Value::String(s) => s.trim().parse().ok(),
        serde_json::Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportTask {
    pub task_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(default)]
    pub progress: String,
    #[serde(default)]
    pub is_error: bool,
    pub data: Option<String>,
    pub failure_reason: Option<String>,
}
