use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::ride_request::RideStatus;

/// Immutable record of one completed ride, copied from the ride request at
/// the moment it completes. Later profile edits never change it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Trip {
    pub id: String,
    pub request_id: String,
    pub driver_id: String,
    pub rider_id: String,
    pub pickup: String,
    pub destination: String,
    pub fare: f64,
    pub status: RideStatus,
    pub completed_at: DateTime<Utc>,
    pub driver_name: String,
    pub rider_name: String,
}
