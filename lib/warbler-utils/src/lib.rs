pub mod http;
pub mod serde;
pub mod utils;
