//! Wire format for inbound telemetry messages
//!
//! The telemetry feed delivers GeoJSON-like feature collections. A single
//! message may carry one or more feature points; each feature becomes one
//! [`Report`] after validation. Only the registration and the coordinate
//! pair are required; every other property degrades to a default.

use serde::{Deserialize, Deserializer, Serialize};

use crate::{CoreError, CoreResult, Position, Registration, Report};

/// A telemetry message as received from the feed
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelemetryMessage {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub features: Vec<Feature>,
}

/// One feature point in a telemetry message
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub properties: FeatureProperties,
    #[serde(default)]
    pub geometry: Option<Geometry>,
}

/// Drone properties attached to a feature
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureProperties {
    #[serde(default)]
    pub serial: Option<String>,
    #[serde(default)]
    pub registration: Option<String>,
    #[serde(rename = "Name", default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub altitude: Option<f64>,
    #[serde(default)]
    pub pilot: Option<String>,
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub yaw: Option<f64>,
}

/// Point geometry, coordinates are `[lon, lat]`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Geometry {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub coordinates: Vec<f64>,
}

impl TelemetryMessage {
    /// Decode a message from its JSON text
    pub fn parse(text: &str) -> CoreResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Validate every feature, preserving arrival order
    pub fn into_reports(self) -> Vec<CoreResult<Report>> {
        self.features.into_iter().map(Feature::into_report).collect()
    }

    /// Build a single-feature message for a report
    pub fn from_report(report: &Report) -> Self {
        Self {
            kind: "FeatureCollection".into(),
            features: vec![Feature::from_report(report)],
        }
    }
}

impl Feature {
    /// Validate this feature into a report
    pub fn into_report(self) -> CoreResult<Report> {
        let props = self.properties;

        let registration = props
            .registration
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .ok_or(CoreError::MissingRegistration)?;

        let position = self
            .geometry
            .as_ref()
            .and_then(|g| Position::from_coordinates(&g.coordinates))
            .ok_or_else(|| CoreError::missing_position(&registration))?;

        if !position.is_valid() {
            return Err(CoreError::invalid_position(
                &registration,
                position.longitude,
                position.latitude,
            ));
        }

        Ok(Report {
            registration: Registration::new(registration),
            name: props.name.unwrap_or_default(),
            pilot: props.pilot.unwrap_or_default(),
            organization: props.organization.unwrap_or_default(),
            serial: props.serial.unwrap_or_default(),
            altitude: props.altitude,
            yaw: props.yaw,
            position,
        })
    }

    pub fn from_report(report: &Report) -> Self {
        Self {
            kind: "Feature".into(),
            properties: FeatureProperties {
                serial: Some(report.serial.clone()),
                registration: Some(report.registration.to_string()),
                name: Some(report.name.clone()),
                altitude: report.altitude,
                pilot: Some(report.pilot.clone()),
                organization: Some(report.organization.clone()),
                yaw: report.yaw,
            },
            geometry: Some(Geometry {
                kind: "Point".into(),
                coordinates: report.position.to_array().to_vec(),
            }),
        }
    }
}

/// Accepts a number, a numeric string or null; anything else becomes `None`
fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}
