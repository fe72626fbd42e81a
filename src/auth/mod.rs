mod guard;
mod jwt;
mod manager;
mod middleware;
mod ownership;
mod types;

pub use guard::LoginAttemptManager;
pub use jwt::TokenManager;
pub use manager::AuthManager;
pub use middleware::AuthMiddleware;
pub use ownership::check_ownership;
pub use types::{AuthError, Claims, FailedLogin};
