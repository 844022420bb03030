pub mod request_handler;
pub mod routing;
pub mod sessions;
