use std::convert::Infallible;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
    routing::{get, post},
    Json, Router,
};
use futures::stream::{self, Stream};
use serde::{Deserialize, Serialize};

use crate::{
    error::AppError,
    models::{
        ride_request::{NewRideRequest, RideStatus},
        user::UserType,
    },
    services::live::LiveView,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/rides", post(create_ride))
        .route("/rides/pending", get(pending_list))
        .route("/rides/pending/stream", get(pending_stream))
        .route("/rides/:id/accept", post(accept_ride))
        .route("/rides/:id/status", post(update_status))
        .route("/drivers/:driver_id/rides", get(driver_rides))
        .route("/drivers/:driver_id/rides/stream", get(driver_rides_stream))
        .route("/users/:user_id/trips", get(user_trips))
        .route("/users/:user_id/trips/stream", get(user_trips_stream))
}

async fn create_ride(
    State(state): State<AppState>,
    Json(body): Json<NewRideRequest>,
) -> Result<impl IntoResponse, AppError> {
    let request = state.rides.create_ride_request(body).await?;
    Ok((StatusCode::CREATED, Json(request)))
}

#[derive(Deserialize)]
struct AcceptBody {
    driver_id: String,
    driver_name: String,
}

async fn accept_ride(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<AcceptBody>,
) -> Result<impl IntoResponse, AppError> {
    let request = state
        .rides
        .accept_ride_request(&id, &body.driver_id, &body.driver_name)
        .await?;
    Ok(Json(request))
}

#[derive(Deserialize)]
struct StatusBody {
    status: RideStatus,
}

async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<StatusBody>,
) -> Result<impl IntoResponse, AppError> {
    let request = state.rides.update_ride_status(&id, body.status).await?;
    Ok(Json(request))
}

async fn pending_list(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.rides.pending_snapshot().await?))
}

async fn pending_stream(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let view = state.rides.pending_queue().await?;
    Ok(sse_snapshots(view))
}

async fn driver_rides(
    State(state): State<AppState>,
    Path(driver_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.rides.driver_snapshot(&driver_id).await?))
}

async fn driver_rides_stream(
    State(state): State<AppState>,
    Path(driver_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let view = state.rides.driver_view(&driver_id).await?;
    Ok(sse_snapshots(view))
}

#[derive(Deserialize)]
struct TripsQuery {
    role: UserType,
}

async fn user_trips(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<TripsQuery>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.rides.trips_snapshot(&user_id, query.role).await?))
}

async fn user_trips_stream(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<TripsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let view = state.rides.user_trips(&user_id, query.role).await?;
    Ok(sse_snapshots(view))
}

/// One SSE event per snapshot: the current matching set immediately, then a
/// fresh set every time it changes. Dropping the connection drops the view,
/// which unsubscribes it from the change feed.
fn sse_snapshots<T>(view: LiveView<T>) -> Sse<impl Stream<Item = Result<Event, Infallible>>>
where
    T: Clone + Serialize + Send + Sync + 'static,
{
    let stream = stream::unfold((view, true), |(mut view, first)| async move {
        let snapshot = if first {
            Some(view.current())
        } else {
            view.next().await
        };
        let event = Event::default().json_data(&snapshot?).ok()?;
        Some((Ok(event), (view, false)))
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}
