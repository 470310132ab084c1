use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::{
    UtcDT,
    geo::{Coordinate, Degrees},
    prelude::*,
};

/// Handle a provider pushes updates into, the session drains the other end
pub type UpdateSender<T> = mpsc::UnboundedSender<T>;

/// Device heading in degrees, normalized to `[0, 360)`, 0 being north
pub type Heading = Degrees;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, specta::Type)]
/// The user's position as reported by the location provider
pub struct UserLocation {
    pub latitude: Degrees,
    pub longitude: Degrees,
    /// Accuracy radius in meters, if known
    pub accuracy: Option<f64>,
    /// When the fix was taken
    pub timestamp: Option<UtcDT>,
}

impl UserLocation {
    pub fn new(coordinate: Coordinate) -> Self {
        Self {
            latitude: coordinate.latitude,
            longitude: coordinate.longitude,
            accuracy: None,
            timestamp: None,
        }
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

/// Source of the user's position, wraps a platform geolocation API
pub trait LocationService: Send + Sync {
    /// Ask for location permission, safe to call more than once
    fn request_permission(&self) -> impl Future<Output = bool> + Send;

    /// Get a single position fix, best effort
    fn get_current_once(&self) -> impl Future<Output = Option<UserLocation>> + Send;

    /// Start pushing position updates into `updates` until [LocationService::unsubscribe] is called
    fn subscribe(&self, updates: UpdateSender<UserLocation>) -> impl Future<Output = Result> + Send;

    /// Stop pushing position updates, calling this while not subscribed does nothing
    fn unsubscribe(&self);
}

/// Source of the device's heading
pub trait HeadingService: Send + Sync {
    /// Identifies a running subscription
    type Handle: Send + Sync;

    /// Start pushing headings into `updates` no more often than `min_interval`
    fn subscribe(
        &self,
        min_interval: Duration,
        updates: UpdateSender<Heading>,
    ) -> Result<Self::Handle>;

    fn unsubscribe(&self, handle: Self::Handle);
}
