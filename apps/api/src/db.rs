use std::time::Duration;

use anyhow::{bail, Context, Result};
use sqlx::any::{install_default_drivers, AnyPoolOptions};
use sqlx::AnyPool;
use tracing::{info, warn};

use crate::applications::store::DuplicateMatch;
use crate::config::Config;

/// Storage engines the tracker knows how to lay out a schema for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Sqlite,
    Postgres,
}

impl Backend {
    pub fn from_url(url: &str) -> Result<Self> {
        if url.starts_with("sqlite:") {
            Ok(Backend::Sqlite)
        } else if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            Ok(Backend::Postgres)
        } else {
            bail!("Unsupported database URL scheme: {}", redact(url))
        }
    }

    fn create_table(self) -> &'static str {
        match self {
            Backend::Sqlite => {
                r#"
                CREATE TABLE IF NOT EXISTS job_applications (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    company TEXT NOT NULL,
                    role TEXT NOT NULL,
                    status TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL,
                    CONSTRAINT uq_job_applications_company_role UNIQUE (company, role)
                )
                "#
            }
            Backend::Postgres => {
                r#"
                CREATE TABLE IF NOT EXISTS job_applications (
                    id BIGSERIAL PRIMARY KEY,
                    company TEXT NOT NULL,
                    role TEXT NOT NULL,
                    status TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL,
                    CONSTRAINT uq_job_applications_company_role UNIQUE (company, role)
                )
                "#
            }
        }
    }
}

/// Opens the configured store, falling back to the embedded database when the
/// preferred one cannot be reached. Once connected, a schema failure is fatal.
pub async fn create_pool(config: &Config) -> Result<AnyPool> {
    if let Some(url) = &config.database_url {
        match connect(url, config).await {
            Ok((pool, backend)) => {
                ensure_schema(&pool, backend, config.duplicate_match)
                    .await
                    .with_context(|| format!("Schema setup failed on {}", redact(url)))?;
                info!("{:?} connection pool established", backend);
                return Ok(pool);
            }
            Err(e) => warn!(
                "Database at {} is unavailable ({e:#}); falling back to embedded database",
                redact(url)
            ),
        }
    }

    open_pool(&config.embedded_database_url, config)
        .await
        .context("Embedded database could not be opened")
}

async fn open_pool(url: &str, config: &Config) -> Result<AnyPool> {
    let (pool, backend) = connect(url, config).await?;
    ensure_schema(&pool, backend, config.duplicate_match).await?;

    info!("{:?} connection pool established", backend);
    Ok(pool)
}

async fn connect(url: &str, config: &Config) -> Result<(AnyPool, Backend)> {
    install_default_drivers();
    let backend = Backend::from_url(url)?;
    info!("Connecting to {:?} database at {}...", backend, redact(url));

    let mut options = AnyPoolOptions::new()
        .max_connections(config.max_connections.max(1))
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs));

    // Every in-memory SQLite connection is its own database, so the pool must
    // hold exactly one connection and never recycle it.
    if is_in_memory(url) {
        options = options
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None);
    }

    Ok((options.connect(url).await?, backend))
}

/// Creates the table and indexes if they are missing. Safe to run on every start.
pub async fn ensure_schema(
    pool: &AnyPool,
    backend: Backend,
    duplicate_match: DuplicateMatch,
) -> Result<()> {
    sqlx::query(backend.create_table()).execute(pool).await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS ix_job_applications_status ON job_applications (status)",
    )
    .execute(pool)
    .await?;

    match duplicate_match {
        DuplicateMatch::CaseInsensitive => {
            sqlx::query(
                r#"
                CREATE UNIQUE INDEX IF NOT EXISTS uq_job_applications_company_role_ci
                ON job_applications (LOWER(company), LOWER(role))
                "#,
            )
            .execute(pool)
            .await
            .context("Existing rows collide once company/role are compared case-insensitively")?;
        }
        DuplicateMatch::Exact => {
            sqlx::query("DROP INDEX IF EXISTS uq_job_applications_company_role_ci")
                .execute(pool)
                .await?;
        }
    }

    Ok(())
}

fn is_in_memory(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

/// Strips credentials from a connection string before it is logged.
fn redact(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***{}", &url[..scheme_end], &url[at..])
        }
        _ => url.to_string(),
    }
}

/// A private in-memory database with the schema in place.
#[cfg(test)]
pub async fn memory_pool(duplicate_match: DuplicateMatch) -> AnyPool {
    let config = Config {
        duplicate_match,
        ..Config::from_lookup(|_| None).unwrap()
    };
    open_pool("sqlite::memory:", &config).await.unwrap()
}
