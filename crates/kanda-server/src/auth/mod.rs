pub mod handlers;
pub mod jwt;
pub mod middleware;
pub mod password;

/// Name of the HttpOnly cookie carrying the admin session JWT.
pub const SESSION_COOKIE: &str = "kanda_session";
