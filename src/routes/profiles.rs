use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;

use crate::{
    error::AppError, models::user::UserType, services::profiles::ProfileUpsert,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users/:user_id", put(upsert_profile).get(fetch_profile))
        .route("/users/:user_id/type", post(set_user_type))
}

async fn upsert_profile(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(body): Json<ProfileUpsert>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.profiles.upsert_profile(&user_id, body).await?))
}

async fn fetch_profile(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.profiles.fetch_profile(&user_id).await?))
}

#[derive(Deserialize)]
struct UserTypeBody {
    user_type: UserType,
}

async fn set_user_type(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(body): Json<UserTypeBody>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(
        state.profiles.set_user_type(&user_id, body.user_type).await?,
    ))
}
