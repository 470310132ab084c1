use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use axum::http::StatusCode;
use darshan_logic::{DEFAULT_TARGET_ID, DefaultTarget, TargetLocation, TargetUpdate};
use log::{debug, info};

type StateObj<T> = Arc<Mutex<T>>;

#[derive(Debug, Clone)]
pub struct ServerState {
    records: StateObj<HashMap<String, TargetLocation>>,
    default: Arc<DefaultTarget>,
}

impl Default for ServerState {
    fn default() -> Self {
        Self::new(DefaultTarget::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationError {
    /// Nothing is stored under the id
    NotFound,
    /// Latitude or longitude out of range
    InvalidCoordinate,
}

impl From<LocationError> for StatusCode {
    fn from(val: LocationError) -> Self {
        match val {
            LocationError::NotFound => StatusCode::NOT_FOUND,
            LocationError::InvalidCoordinate => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }
}

impl ServerState {
    pub fn new(default: DefaultTarget) -> Self {
        Self {
            records: Default::default(),
            default: Arc::new(default),
        }
    }

    /// Get the record for `id`. The canonical id always resolves, falling back to the
    /// default target when nothing has been written yet.
    pub fn get(&self, id: &str) -> Result<TargetLocation, LocationError> {
        if let Some(record) = self.records.lock().unwrap().get(id) {
            return Ok(record.clone());
        }

        if id == DEFAULT_TARGET_ID {
            debug!("No record for {id}, answering with default");
            Ok(TargetLocation::fallback(id, &self.default))
        } else {
            Err(LocationError::NotFound)
        }
    }

    /// Create or replace the record for `id`
    pub fn upsert(&self, id: &str, update: TargetUpdate) -> Result<TargetLocation, LocationError> {
        let coordinate = update.coordinate();
        if !coordinate.is_valid() {
            return Err(LocationError::InvalidCoordinate);
        }

        let record = TargetLocation::new(id, coordinate, update.address);
        info!("Moving {id} to {coordinate}");
        self.records
            .lock()
            .unwrap()
            .insert(id.to_string(), record.clone());
        Ok(record)
    }

    /// Overwrite the canonical record with the default target
    pub fn initialize(&self) -> TargetLocation {
        let record = TargetLocation::fallback(DEFAULT_TARGET_ID, &self.default);
        info!("Resetting {DEFAULT_TARGET_ID} to default");
        self.records
            .lock()
            .unwrap()
            .insert(DEFAULT_TARGET_ID.to_string(), record.clone());
        record
    }

    #[cfg(test)]
    pub fn is_stored(&self, id: &str) -> bool {
        self.records.lock().unwrap().contains_key(id)
    }
}
