pub mod handler;
pub mod jwt;
pub mod middleware;

pub use handler::{admin_login, login, register, validate_admin_jwt, MessageResponse};
pub use jwt::{Claims, JwtService};
pub use middleware::jwt_auth;
