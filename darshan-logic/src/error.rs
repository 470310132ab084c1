use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, specta::Type)]
/// A continuous feed the session subscribes to
pub enum Feed {
    Location,
    Heading,
}

impl std::fmt::Display for Feed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Location => write!(f, "location"),
            Self::Heading => write!(f, "heading"),
        }
    }
}

/// Faults a compass session can run into
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// Location permission was refused, the session can't continue
    #[error("Location permission is required for compass functionality")]
    PermissionDenied,
    /// A feed failed to start, the session keeps running without it
    #[error("Failed to start {0} tracking")]
    SubscriptionStart(Feed),
    /// The target record couldn't be fetched, never shown to the user
    #[error("Failed to fetch target location")]
    TargetFetch,
}

impl SessionError {
    /// Whether this error ends the session
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::PermissionDenied)
    }
}
