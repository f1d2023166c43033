pub mod poll_socket;
