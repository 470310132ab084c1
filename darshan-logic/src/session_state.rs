use tokio::time::Instant;

use crate::{
    alignment::AlignmentState,
    darshan::DarshanTracker,
    error::SessionError,
    geo::{Degrees, wrap_360},
    location::{Heading, UserLocation},
    settings::SessionSettings,
    snapshot::{BearingData, SessionSnapshot},
    target::TargetLocation,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Where the session is in its lifecycle
pub enum SessionPhase {
    /// Waiting on permission and initial fetches
    Initializing,
    /// Subscriptions have been started at least once
    Ready,
    /// Permission was refused
    Failed,
}

#[derive(Debug, Clone)]
/// Owns all live data of a compass session and recomputes derived values on every change
pub struct SessionState {
    phase: SessionPhase,
    heading: Heading,
    user_location: Option<UserLocation>,
    target_location: Option<TargetLocation>,
    bearing: Option<BearingData>,
    alignment: Option<AlignmentState>,
    error: Option<SessionError>,
    permission_granted: bool,
    /// App is in the foreground, feed updates are only applied while this is set
    foreground: bool,
    threshold: Degrees,
    darshan: DarshanTracker,
}

impl SessionState {
    pub fn new(settings: &SessionSettings) -> Self {
        Self {
            phase: SessionPhase::Initializing,
            heading: 0.0,
            user_location: None,
            target_location: None,
            bearing: None,
            alignment: None,
            error: None,
            permission_granted: false,
            foreground: true,
            threshold: settings.alignment_threshold_degrees,
            darshan: DarshanTracker::new(settings.haptic_debounce()),
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn mark_ready(&mut self) {
        if self.phase == SessionPhase::Initializing {
            self.phase = SessionPhase::Ready;
        }
    }

    pub fn permission_denied(&mut self) {
        self.permission_granted = false;
        self.annotate_error(SessionError::PermissionDenied);
    }

    pub fn permission_granted(&mut self) {
        self.permission_granted = true;
    }

    /// Attach an error to the snapshot, errors the user never sees are dropped. Fatal errors
    /// also fail the session.
    pub fn annotate_error(&mut self, error: SessionError) {
        if matches!(error, SessionError::TargetFetch) {
            return;
        }
        if error.is_fatal() {
            self.phase = SessionPhase::Failed;
        }
        self.error = Some(error);
    }

    pub fn is_foreground(&self) -> bool {
        self.foreground
    }

    pub fn set_foreground(&mut self, foreground: bool) {
        self.foreground = foreground;
    }

    /// Apply a new heading, returns whether a haptic pulse is due
    pub fn set_heading(&mut self, heading: Heading, now: Instant) -> bool {
        self.heading = wrap_360(heading);
        self.recompute(now)
    }

    /// Apply a new user location, returns whether a haptic pulse is due
    pub fn set_user_location(&mut self, location: UserLocation, now: Instant) -> bool {
        self.user_location = Some(location);
        self.recompute(now)
    }

    /// Apply a new target location, returns whether a haptic pulse is due
    pub fn set_target_location(&mut self, target: TargetLocation, now: Instant) -> bool {
        self.target_location = Some(target);
        self.recompute(now)
    }

    pub fn has_target(&self) -> bool {
        self.target_location.is_some()
    }

    /// User closed the overlay
    pub fn close_darshan(&mut self, now: Instant) -> bool {
        self.darshan.dismiss();
        self.recompute(now)
    }

    /// Re-arm the overlay, the next aligned recompute shows it again
    pub fn reset_darshan(&mut self, now: Instant) -> bool {
        self.darshan.reset();
        self.recompute(now)
    }

    /// Recompute bearing and alignment if both locations are known and feed the result to the
    /// darshan tracker. Returns whether a haptic pulse is due.
    fn recompute(&mut self, now: Instant) -> bool {
        let (Some(user), Some(target)) = (&self.user_location, &self.target_location) else {
            return false;
        };

        let bearing = BearingData::compute(user, target);
        let alignment = AlignmentState::evaluate(self.heading, bearing.bearing_degrees, self.threshold);

        self.bearing = Some(bearing);
        self.alignment = Some(alignment);

        self.darshan.observe(alignment.is_aligned, now)
    }

    pub fn as_snapshot(&self, loading: bool) -> SessionSnapshot {
        SessionSnapshot {
            heading: self.heading,
            user_location: self.user_location,
            target_location: self.target_location.clone(),
            bearing_data: self.bearing.clone(),
            alignment: self.alignment,
            distance_km: self.bearing.as_ref().map(|b| b.distance_km).unwrap_or_default(),
            loading,
            error: self.error.as_ref().map(ToString::to_string),
            permission_granted: self.permission_granted,
            should_show_overlay: self.darshan.should_show_overlay(),
        }
    }
}
