use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[serde(rename_all = "kebab-case")]
#[sqlx(rename_all = "kebab-case")]
pub enum RideStatus {
    Pending,
    Accepted,
    InProgress,
    Completed,
    Cancelled,
}

impl RideStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RideStatus::Pending => "pending",
            RideStatus::Accepted => "accepted",
            RideStatus::InProgress => "in-progress",
            RideStatus::Completed => "completed",
            RideStatus::Cancelled => "cancelled",
        }
    }

    /// The lifecycle table. Accepting is its own operation and is not
    /// reachable through a plain status update.
    pub fn can_transition_to(&self, next: RideStatus) -> bool {
        use RideStatus::*;
        matches!(
            (*self, next),
            (Accepted, InProgress)
                | (Accepted, Completed)
                | (InProgress, Completed)
                | (Pending, Cancelled)
                | (Accepted, Cancelled)
        )
    }
}

impl fmt::Display for RideStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct RideRequest {
    pub id: String,
    pub rider_id: String,
    pub rider_name: String,
    pub pickup: String,
    pub destination: String,
    pub status: RideStatus,
    pub fare: f64,
    pub estimated_duration: Option<String>,
    pub created_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub driver_id: Option<String>,
    pub driver_name: Option<String>,
}

/// Caller-supplied fields for a new request. The store assigns id, status and
/// the creation timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRideRequest {
    pub rider_id: String,
    pub rider_name: String,
    pub pickup: String,
    pub destination: String,
    pub fare: f64,
    #[serde(default)]
    pub estimated_duration: Option<String>,
}
