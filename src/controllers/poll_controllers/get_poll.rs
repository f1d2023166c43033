use axum::{
    extract::{Extension, Path, State},
    Json,
};

use crate::controllers::poll_controllers::models::{
    ApiResponse, PollDetailsResponse, PollResponse, PollResultsResponse,
};
use crate::middleware::device_id::DeviceId;
use crate::state::AppState;
use crate::utils::error::AppResult;

/// Poll view with live counts and the calling device's own selection.
pub async fn get_poll(
    Path(code): Path<String>,
    State(state): State<AppState>,
    Extension(device): Extension<DeviceId>,
) -> AppResult<Json<ApiResponse<PollDetailsResponse>>> {
    let poll = state.polls.find_by_code(&code).await?;
    let tally = state.tally.tally(&poll).await?;
    let user_vote = state
        .ledger
        .find_vote(&poll, device.as_str())
        .await?
        .map(|vote| vote.selected);

    let results = PollResultsResponse::new(PollResponse::from_poll(poll, state.clock.now()), tally);

    Ok(Json(ApiResponse::ok(PollDetailsResponse { results, user_vote })))
}
