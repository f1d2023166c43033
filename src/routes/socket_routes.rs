use axum::{routing::get, Router};

use crate::controllers::socket_controllers::poll_socket::poll_socket;
use crate::state::AppState;

pub fn socket_routes() -> Router<AppState> {
    Router::new().route("/ws", get(poll_socket))
}
