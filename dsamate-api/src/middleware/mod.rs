/// Middleware modules for the API server
///
/// - `security`: security response headers
/// - `rate_limit`: per-IP limiter for the credential endpoints

pub mod rate_limit;
pub mod security;
