use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};

use crate::controllers::poll_controllers::{cast_vote, create_poll, get_poll, get_results};
use crate::middleware::device_id::device_identity;
use crate::state::AppState;

pub fn poll_routes(state: AppState) -> Router<AppState> {
    let device_scoped = Router::new()
        .route("/:code", get(get_poll::get_poll))
        .route("/:code/vote", post(cast_vote::cast_vote))
        .route_layer(from_fn_with_state(state, device_identity));

    Router::new()
        .route("/", post(create_poll::create_poll))
        .route("/:code/results", get(get_results::get_results))
        .merge(device_scoped)
}
