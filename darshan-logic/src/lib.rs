mod alignment;
mod darshan;
mod error;
mod geo;
mod location;
mod session;
mod session_state;
mod settings;
mod snapshot;
mod target;

use chrono::{DateTime, Utc};

pub use alignment::{AlignmentState, DEFAULT_ALIGNMENT_THRESHOLD, TurnDirection};
pub use darshan::DarshanTracker;
pub use error::{Feed, SessionError};
pub use geo::{Coordinate, Degrees, EARTH_RADIUS_KM, bearing, distance, wrap_360};
pub use location::{Heading, HeadingService, LocationService, UpdateSender, UserLocation};
pub use session::{AppLifecycle, CompassSession, HapticEmitter, StateUpdateSender};
pub use settings::{DefaultTarget, SessionSettings};
pub use snapshot::{BearingData, DisplayState, SessionSnapshot, format_distance};
pub use target::{
    DEFAULT_TARGET_ID, InitializeResponse, TargetLocation, TargetStore, TargetUpdate,
};

/// Convenience alias for UTC DT
pub type UtcDT = DateTime<Utc>;

pub mod prelude {
    use anyhow::Error as AnyhowError;
    use std::result::Result as StdResult;
    pub type Result<T = (), E = AnyhowError> = StdResult<T, E>;
    pub use anyhow::Context;
}
