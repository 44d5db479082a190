//! Tower middleware for the proxy server

pub mod auth;
pub mod rate_limit;

pub use auth::AuthLayer;
pub use rate_limit::RateLimitLayer;

/// Paths that skip authentication and rate limiting
const EXEMPT_PATHS: [&str; 1] = ["/health"];

fn is_exempt(path: &str) -> bool {
    EXEMPT_PATHS.contains(&path)
}
