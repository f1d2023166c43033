use axum::{extract::State, http::StatusCode, Json};
use axum_extra::extract::WithRejection;

use crate::controllers::poll_controllers::models::{ApiResponse, CreatePollRequest, PollResponse};
use crate::state::AppState;
use crate::utils::error::{AppError, AppResult};

pub async fn create_poll(
    State(state): State<AppState>,
    WithRejection(Json(payload), _): WithRejection<Json<CreatePollRequest>, AppError>,
) -> AppResult<(StatusCode, Json<ApiResponse<PollResponse>>)> {
    let poll = state.polls.create(payload.into()).await?;
    let view = PollResponse::from_poll(poll, state.clock.now());

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(view))))
}
