/// Database layer
///
/// - `pool`: PostgreSQL connection pool with a startup health check
/// - `migrations`: embedded sqlx migrations from the workspace `migrations/`
///
/// Row types and their queries live in the crate-level `models` module.

pub mod pool;
pub mod migrations;
