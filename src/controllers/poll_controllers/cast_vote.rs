use axum::{
    extract::{Extension, Path, State},
    Json,
};
use axum_extra::extract::WithRejection;
use tracing::debug;

use crate::controllers::poll_controllers::models::{
    ApiResponse, CastVoteRequest, VoteResponse, VoteView,
};
use crate::middleware::device_id::DeviceId;
use crate::polls::broadcaster::VoteUpdate;
use crate::state::AppState;
use crate::utils::error::{AppError, AppResult};

/// Records the device's vote, then pushes fresh counts to everyone watching
/// the poll. The response carries the same counts.
pub async fn cast_vote(
    Path(code): Path<String>,
    State(state): State<AppState>,
    Extension(device): Extension<DeviceId>,
    WithRejection(Json(payload), _): WithRejection<Json<CastVoteRequest>, AppError>,
) -> AppResult<Json<ApiResponse<VoteResponse>>> {
    let selected = payload.selected.unwrap_or_default();
    let admission = state
        .ledger
        .submit(&code, device.as_str(), &selected)
        .await?;

    let tally = state.tally.tally(&admission.poll).await?;

    let delivered = state.broadcaster.publish_vote(VoteUpdate::new(
        admission.poll.id.clone(),
        admission.poll.code.clone(),
        tally.clone(),
        admission.vote.selected.clone(),
        admission.vote.device_id.clone(),
    ));
    debug!(code = %admission.poll.code, delivered, "vote update broadcast");

    Ok(Json(ApiResponse::ok(VoteResponse {
        vote: VoteView::from(admission.vote),
        vote_counts: tally.counts,
        total_votes: tally.total,
    })))
}
