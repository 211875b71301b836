/// Postgres connection pooling and schema migrations
///
/// # Modules
///
/// - `pool`: Connection pool creation, health checks and shutdown
/// - `migrations`: Embedded migration runner
///
/// # Example
///
/// ```no_run
/// use trailhead_shared::db::pool::{create_pool, DatabaseConfig};
/// use trailhead_shared::db::migrations::run_migrations;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = DatabaseConfig {
///         url: std::env::var("DATABASE_URL")?,
///         ..Default::default()
///     };
///
///     let pool = create_pool(config).await?;
///     run_migrations(&pool).await?;
///     Ok(())
/// }
/// ```

pub mod migrations;
pub mod pool;
