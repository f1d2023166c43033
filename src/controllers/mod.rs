pub mod poll_controllers;
pub mod socket_controllers;
