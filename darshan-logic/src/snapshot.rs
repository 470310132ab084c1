use serde::{Deserialize, Serialize};

use crate::{
    alignment::AlignmentState,
    geo::{self, Degrees},
    location::{Heading, UserLocation},
    target::TargetLocation,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, specta::Type)]
/// Bearing and distance from the user to the target, and the inputs they were computed from
pub struct BearingData {
    /// Initial great-circle bearing, 0 to 360
    pub bearing_degrees: Degrees,
    pub distance_km: f64,
    pub user_location: UserLocation,
    pub target_location: TargetLocation,
}

impl BearingData {
    pub fn compute(user_location: &UserLocation, target_location: &TargetLocation) -> Self {
        let from = user_location.coordinate();
        let to = target_location.coordinate();
        Self {
            bearing_degrees: geo::bearing(from, to),
            distance_km: geo::distance(from, to),
            user_location: *user_location,
            target_location: target_location.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, specta::Type)]
/// What the compass screen should be showing for a given snapshot
pub enum DisplayState {
    /// Permission and subscriptions are still being set up
    Loading,
    /// The session failed and can't recover on its own
    Error,
    /// Running, but the user or target location hasn't arrived yet
    WaitingForData,
    /// Everything needed to point the compass is present
    Ready,
}

/// Everything the presentation layer gets to see of a compass session.
///
/// A fresh value is built for every read, nothing here aliases session state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, specta::Type)]
pub struct SessionSnapshot {
    /// Latest device heading
    pub heading: Heading,
    pub user_location: Option<UserLocation>,
    pub target_location: Option<TargetLocation>,
    /// Present once both locations are known
    pub bearing_data: Option<BearingData>,
    /// Present once both locations are known
    pub alignment: Option<AlignmentState>,
    pub distance_km: f64,
    /// Session is still initializing
    pub loading: bool,
    /// Message for the latest user-facing error, fatal or advisory
    pub error: Option<String>,
    pub permission_granted: bool,
    /// Show the darshan overlay
    pub should_show_overlay: bool,
}

impl SessionSnapshot {
    pub fn is_aligned(&self) -> bool {
        self.alignment.is_some_and(|a| a.is_aligned)
    }

    pub fn display_state(&self) -> DisplayState {
        if self.loading {
            DisplayState::Loading
        } else if !self.permission_granted && self.error.is_some() {
            DisplayState::Error
        } else if self.user_location.is_none() || self.target_location.is_none() {
            DisplayState::WaitingForData
        } else {
            DisplayState::Ready
        }
    }
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            heading: 0.0,
            user_location: None,
            target_location: None,
            bearing_data: None,
            alignment: None,
            distance_km: 0.0,
            loading: true,
            error: None,
            permission_granted: false,
            should_show_overlay: false,
        }
    }
}

/// Render a distance for display, whole meters under a kilometer, else tenths of a kilometer
pub fn format_distance(distance_km: f64) -> String {
    if distance_km < 1.0 {
        format!("{:.0}m away", distance_km * 1000.0)
    } else {
        format!("{distance_km:.1}km away")
    }
}
