use anyhow::anyhow;
use chrono::Utc;
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        ride_request::{NewRideRequest, RideRequest, RideStatus},
        trip::Trip,
        user::UserType,
    },
    services::live::{ChangeFeed, Collection},
};

/// Storage boundary for ride requests and trips. Owns every SQL statement
/// touching those tables and publishes a change-feed event after each
/// committed write. Status preconditions are enforced inside the UPDATE
/// itself, so concurrent writers are serialized by the database rather than
/// by anything in-process.
#[derive(Clone)]
pub struct LedgerStore {
    db: DbPool,
    feed: ChangeFeed,
}

impl LedgerStore {
    pub fn new(db: DbPool, feed: ChangeFeed) -> Self {
        Self { db, feed }
    }

    pub fn feed(&self) -> &ChangeFeed {
        &self.feed
    }

    /// Stores a new request in `pending`, assigning the id and the creation
    /// timestamp here rather than trusting the caller.
    pub async fn insert_ride_request(
        &self,
        new: NewRideRequest,
    ) -> Result<RideRequest, AppError> {
        let request = RideRequest {
            id: Uuid::new_v4().to_string(),
            rider_id: new.rider_id,
            rider_name: new.rider_name,
            pickup: new.pickup,
            destination: new.destination,
            status: RideStatus::Pending,
            fare: new.fare,
            estimated_duration: new.estimated_duration,
            created_at: Utc::now(),
            accepted_at: None,
            completed_at: None,
            driver_id: None,
            driver_name: None,
        };

        sqlx::query(
            "INSERT INTO ride_requests \
             (id, rider_id, rider_name, pickup, destination, status, fare, \
              estimated_duration, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&request.id)
        .bind(&request.rider_id)
        .bind(&request.rider_name)
        .bind(&request.pickup)
        .bind(&request.destination)
        .bind(request.status)
        .bind(request.fare)
        .bind(&request.estimated_duration)
        .bind(request.created_at)
        .execute(&self.db)
        .await
        .map_err(AppError::Write)?;

        self.feed.publish(Collection::RideRequests);
        Ok(request)
    }

    pub async fn fetch_ride_request(&self, id: &str) -> Result<RideRequest, AppError> {
        self.try_fetch_ride_request(id).await?.ok_or(AppError::NotFound)
    }

    pub async fn try_fetch_ride_request(
        &self,
        id: &str,
    ) -> Result<Option<RideRequest>, AppError> {
        sqlx::query_as("SELECT * FROM ride_requests WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .map_err(AppError::Read)
    }

    /// Conditional accept: flips the row to `accepted` and assigns the driver
    /// only if it is still `pending`. Returns `None` when the precondition
    /// did not hold (row missing or no longer pending) — the caller
    /// classifies which.
    pub async fn assign_driver(
        &self,
        id: &str,
        driver_id: &str,
        driver_name: &str,
    ) -> Result<Option<RideRequest>, AppError> {
        let updated: Option<RideRequest> = sqlx::query_as(
            "UPDATE ride_requests \
             SET status = ?, driver_id = ?, driver_name = ?, accepted_at = ? \
             WHERE id = ? AND status = ? \
             RETURNING *",
        )
        .bind(RideStatus::Accepted)
        .bind(driver_id)
        .bind(driver_name)
        .bind(Utc::now())
        .bind(id)
        .bind(RideStatus::Pending)
        .fetch_optional(&self.db)
        .await
        .map_err(AppError::Write)?;

        if updated.is_some() {
            self.feed.publish(Collection::RideRequests);
        }
        Ok(updated)
    }

    /// Conditional status update keyed on the status the caller observed.
    /// `None` means the row was missing or its status changed underneath us.
    pub async fn set_status_if(
        &self,
        id: &str,
        from: RideStatus,
        to: RideStatus,
    ) -> Result<Option<RideRequest>, AppError> {
        let updated: Option<RideRequest> = sqlx::query_as(
            "UPDATE ride_requests SET status = ? WHERE id = ? AND status = ? RETURNING *",
        )
        .bind(to)
        .bind(id)
        .bind(from)
        .fetch_optional(&self.db)
        .await
        .map_err(AppError::Write)?;

        if updated.is_some() {
            self.feed.publish(Collection::RideRequests);
        }
        Ok(updated)
    }

    /// Completion is the one multi-statement write: stamp the request
    /// completed and append the trip in a single transaction, so a trip can
    /// never exist for a request that was not marked completed.
    pub async fn complete_ride_request(
        &self,
        id: &str,
        from: RideStatus,
    ) -> Result<Option<(RideRequest, Trip)>, AppError> {
        let mut tx = self.db.begin().await.map_err(AppError::Write)?;
        let completed_at = Utc::now();

        let updated: Option<RideRequest> = sqlx::query_as(
            "UPDATE ride_requests SET status = ?, completed_at = ? \
             WHERE id = ? AND status = ? \
             RETURNING *",
        )
        .bind(RideStatus::Completed)
        .bind(completed_at)
        .bind(id)
        .bind(from)
        .fetch_optional(&mut *tx)
        .await
        .map_err(AppError::Write)?;

        let Some(request) = updated else {
            tx.rollback().await.map_err(AppError::Write)?;
            return Ok(None);
        };

        let (driver_id, driver_name) = match (&request.driver_id, &request.driver_name) {
            (Some(id), Some(name)) => (id.clone(), name.clone()),
            _ => {
                return Err(AppError::Other(anyhow!(
                    "ride request {} reached completed without driver fields",
                    request.id
                )))
            }
        };

        let trip = Trip {
            id: Uuid::new_v4().to_string(),
            request_id: request.id.clone(),
            driver_id,
            rider_id: request.rider_id.clone(),
            pickup: request.pickup.clone(),
            destination: request.destination.clone(),
            fare: request.fare,
            status: RideStatus::Completed,
            completed_at,
            driver_name,
            rider_name: request.rider_name.clone(),
        };

        sqlx::query(
            "INSERT INTO trips \
             (id, request_id, driver_id, rider_id, pickup, destination, fare, \
              status, completed_at, driver_name, rider_name) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&trip.id)
        .bind(&trip.request_id)
        .bind(&trip.driver_id)
        .bind(&trip.rider_id)
        .bind(&trip.pickup)
        .bind(&trip.destination)
        .bind(trip.fare)
        .bind(trip.status)
        .bind(trip.completed_at)
        .bind(&trip.driver_name)
        .bind(&trip.rider_name)
        .execute(&mut *tx)
        .await
        .map_err(AppError::Write)?;

        tx.commit().await.map_err(AppError::Write)?;

        self.feed.publish(Collection::RideRequests);
        self.feed.publish(Collection::Trips);
        Ok(Some((request, trip)))
    }

    pub async fn list_pending_requests(&self) -> Result<Vec<RideRequest>, AppError> {
        sqlx::query_as(
            "SELECT * FROM ride_requests WHERE status = ? ORDER BY created_at DESC",
        )
        .bind(RideStatus::Pending)
        .fetch_all(&self.db)
        .await
        .map_err(AppError::Read)
    }

    pub async fn list_driver_requests(
        &self,
        driver_id: &str,
    ) -> Result<Vec<RideRequest>, AppError> {
        sqlx::query_as(
            "SELECT * FROM ride_requests WHERE driver_id = ? ORDER BY created_at DESC",
        )
        .bind(driver_id)
        .fetch_all(&self.db)
        .await
        .map_err(AppError::Read)
    }

    pub async fn list_user_trips(
        &self,
        user_id: &str,
        role: UserType,
    ) -> Result<Vec<Trip>, AppError> {
        let sql = match role {
            UserType::Driver => {
                "SELECT * FROM trips WHERE driver_id = ? ORDER BY completed_at DESC"
            }
            UserType::Rider => {
                "SELECT * FROM trips WHERE rider_id = ? ORDER BY completed_at DESC"
            }
        };
        sqlx::query_as(sql)
            .bind(user_id)
            .fetch_all(&self.db)
            .await
            .map_err(AppError::Read)
    }
}
