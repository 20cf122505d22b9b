pub mod handler;
pub mod middleware;

pub use handler::*;
pub use middleware::require_admin;
