use crate::{
    error::AppError,
    models::{
        ride_request::{NewRideRequest, RideRequest, RideStatus},
        trip::Trip,
        user::UserType,
    },
    services::{
        ledger::LedgerStore,
        live::{spawn_view, Collection, LiveView},
    },
};

/// The lifecycle boundary. Everything else (routes, tests) goes through the
/// operations here; nothing outside the services module talks to the ledger
/// directly.
#[derive(Clone)]
pub struct RideRequestService {
    ledger: LedgerStore,
}

impl RideRequestService {
    pub fn new(ledger: LedgerStore) -> Self {
        Self { ledger }
    }

    pub async fn create_ride_request(
        &self,
        new: NewRideRequest,
    ) -> Result<RideRequest, AppError> {
        validate_new_request(&new)?;
        self.ledger.insert_ride_request(new).await
    }

    /// Accept is a single conditional write keyed on `status = pending`.
    /// Two drivers racing on the same request: the store serializes them and
    /// exactly one wins; the loser gets `AlreadyAccepted` with the winner's
    /// assignment untouched.
    pub async fn accept_ride_request(
        &self,
        request_id: &str,
        driver_id: &str,
        driver_name: &str,
    ) -> Result<RideRequest, AppError> {
        if driver_id.trim().is_empty() {
            return Err(AppError::Validation("driver_id must not be empty".into()));
        }

        match self
            .ledger
            .assign_driver(request_id, driver_id, driver_name)
            .await?
        {
            Some(request) => Ok(request),
            None => match self.ledger.try_fetch_ride_request(request_id).await? {
                Some(_) => Err(AppError::AlreadyAccepted),
                None => Err(AppError::NotFound),
            },
        }
    }

    /// Applies one step of the lifecycle table. The write is conditional on
    /// the status observed here, so a concurrent transition cannot be
    /// silently overwritten; on a miss the row is re-read and the transition
    /// retried if it is still legal from the new status (a cancel losing the
    /// race to an accept still cancels). Statuses only move toward a terminal
    /// state, so the retry loop is bounded. Entering `completed` also emits
    /// the trip record, in the same transaction as the status change.
    pub async fn update_ride_status(
        &self,
        request_id: &str,
        new_status: RideStatus,
    ) -> Result<RideRequest, AppError> {
        let mut current = self.ledger.fetch_ride_request(request_id).await?;
        loop {
            if !current.status.can_transition_to(new_status) {
                return Err(AppError::InvalidTransition {
                    from: current.status,
                    to: new_status,
                });
            }

            let applied = if new_status == RideStatus::Completed {
                self.ledger
                    .complete_ride_request(request_id, current.status)
                    .await?
                    .map(|(request, _trip)| request)
            } else {
                self.ledger
                    .set_status_if(request_id, current.status, new_status)
                    .await?
            };

            match applied {
                Some(request) => return Ok(request),
                None => {
                    current = self
                        .ledger
                        .try_fetch_ride_request(request_id)
                        .await?
                        .ok_or(AppError::NotFound)?;
                }
            }
        }
    }

    /// Live view of all pending requests, newest first. Shared by every
    /// online driver; first accept wins.
    pub async fn pending_queue(&self) -> Result<LiveView<RideRequest>, AppError> {
        let ledger = self.ledger.clone();
        spawn_view(self.ledger.feed(), Collection::RideRequests, move || {
            let ledger = ledger.clone();
            async move { ledger.list_pending_requests().await }
        })
        .await
    }

    /// Live view of one driver's requests, newest first.
    pub async fn driver_view(
        &self,
        driver_id: &str,
    ) -> Result<LiveView<RideRequest>, AppError> {
        let ledger = self.ledger.clone();
        let driver_id = driver_id.to_string();
        spawn_view(self.ledger.feed(), Collection::RideRequests, move || {
            let ledger = ledger.clone();
            let driver_id = driver_id.clone();
            async move { ledger.list_driver_requests(&driver_id).await }
        })
        .await
    }

    /// Live view of a user's trip history, most recently completed first.
    /// `role` selects whether the user is matched as driver or rider.
    pub async fn user_trips(
        &self,
        user_id: &str,
        role: UserType,
    ) -> Result<LiveView<Trip>, AppError> {
        let ledger = self.ledger.clone();
        let user_id = user_id.to_string();
        spawn_view(self.ledger.feed(), Collection::Trips, move || {
            let ledger = ledger.clone();
            let user_id = user_id.clone();
            async move { ledger.list_user_trips(&user_id, role).await }
        })
        .await
    }

    pub async fn pending_snapshot(&self) -> Result<Vec<RideRequest>, AppError> {
        self.ledger.list_pending_requests().await
    }

    pub async fn driver_snapshot(&self, driver_id: &str) -> Result<Vec<RideRequest>, AppError> {
        self.ledger.list_driver_requests(driver_id).await
    }

    pub async fn trips_snapshot(
        &self,
        user_id: &str,
        role: UserType,
    ) -> Result<Vec<Trip>, AppError> {
        self.ledger.list_user_trips(user_id, role).await
    }
}

fn validate_new_request(new: &NewRideRequest) -> Result<(), AppError> {
    if new.rider_id.trim().is_empty() {
        return Err(AppError::Validation("rider_id must not be empty".into()));
    }
    if new.pickup.trim().is_empty() {
        return Err(AppError::Validation("pickup must not be empty".into()));
    }
    if new.destination.trim().is_empty() {
        return Err(AppError::Validation("destination must not be empty".into()));
    }
    if !new.fare.is_finite() || new.fare < 0.0 {
        return Err(AppError::Validation("fare must be a non-negative number".into()));
    }
    Ok(())
}
