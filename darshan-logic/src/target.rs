use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{
    UtcDT,
    geo::{Coordinate, Degrees},
    prelude::*,
    settings::DefaultTarget,
};

/// Key of the record holding the target location
pub const DEFAULT_TARGET_ID: &str = "swamiji_location";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, specta::Type)]
/// The remote location the compass points at, as stored in the location service
pub struct TargetLocation {
    /// Primary key of the record
    pub id: String,
    pub latitude: Degrees,
    pub longitude: Degrees,
    /// Human readable address
    #[serde(default)]
    pub address: Option<String>,
    /// Link to the location on a map
    #[serde(default, rename = "googlemapsurl")]
    pub maps_url: Option<String>,
    /// Last time the record was written
    pub updated_at: UtcDT,
}

impl TargetLocation {
    pub fn new(id: impl Into<String>, coordinate: Coordinate, address: Option<String>) -> Self {
        Self {
            id: id.into(),
            latitude: coordinate.latitude,
            longitude: coordinate.longitude,
            address,
            maps_url: None,
            updated_at: Utc::now(),
        }
    }

    /// The hardcoded record used when the store has nothing for `id`
    pub fn fallback(id: impl Into<String>, default: &DefaultTarget) -> Self {
        Self {
            maps_url: default.maps_url.clone(),
            ..Self::new(id, default.coordinate(), Some(default.address.clone()))
        }
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Body of a request to move the target
pub struct TargetUpdate {
    pub latitude: Degrees,
    pub longitude: Degrees,
    #[serde(default)]
    pub address: Option<String>,
}

impl TargetUpdate {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Response after writing the default record into the store
pub struct InitializeResponse {
    pub message: String,
    pub location: TargetLocation,
}

/// Key-value store holding the target record
pub trait TargetStore: Send + Sync {
    /// Get the record for `id`, [Option::None] if nothing is stored under it
    fn fetch(&self, id: &str) -> impl Future<Output = Result<Option<TargetLocation>>> + Send;

    /// Create or replace the record for `id`, returning what was stored
    fn update(
        &self,
        id: &str,
        coordinate: Coordinate,
        address: Option<String>,
    ) -> impl Future<Output = Result<TargetLocation>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_uses_default() {
        let default = DefaultTarget::default();
        let target = TargetLocation::fallback(DEFAULT_TARGET_ID, &default);

        assert_eq!(target.id, DEFAULT_TARGET_ID);
        assert_eq!(target.coordinate(), Coordinate::new(12.308367, 76.645467));
        assert_eq!(target.address.as_deref(), Some("Avadhoota Datta Peetham"));
    }

    #[test]
    fn test_record_wire_format() {
        let raw = r#"{
            "id": "swamiji_location",
            "latitude": 12.5,
            "longitude": 76.25,
            "address": null,
            "googlemapsurl": "https://maps.example/?q=12.5,76.25",
            "updated_at": "2025-06-01T10:00:00Z"
        }"#;

        let target: TargetLocation = serde_json::from_str(raw).expect("Failed to parse record");
        assert_eq!(target.coordinate(), Coordinate::new(12.5, 76.25));
        assert_eq!(target.address, None);
        assert_eq!(
            target.maps_url.as_deref(),
            Some("https://maps.example/?q=12.5,76.25")
        );
        assert_eq!(target.updated_at.to_rfc3339(), "2025-06-01T10:00:00+00:00");
    }

    #[test]
    fn test_record_missing_optionals() {
        let raw = r#"{"id":"x","latitude":1.0,"longitude":2.0,"updated_at":"2025-06-01T10:00:00Z"}"#;
        let target: TargetLocation = serde_json::from_str(raw).expect("Failed to parse record");
        assert_eq!(target.address, None);
        assert_eq!(target.maps_url, None);
    }
}
