pub mod poll_routes;
pub mod socket_routes;
