use axum::{
    extract::{Path, State},
    Json,
};

use crate::controllers::poll_controllers::models::{ApiResponse, PollResponse, PollResultsResponse};
use crate::state::AppState;
use crate::utils::error::AppResult;

pub async fn get_results(
    Path(code): Path<String>,
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<PollResultsResponse>>> {
    let poll = state.polls.find_by_code(&code).await?;
    let tally = state.tally.tally(&poll).await?;
    let view = PollResponse::from_poll(poll, state.clock.now());

    Ok(Json(ApiResponse::ok(PollResultsResponse::new(view, tally))))
}
