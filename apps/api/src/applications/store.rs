use std::str::FromStr;

use serde::Deserialize;
use sqlx::AnyPool;
use thiserror::Error;
use tracing::{debug, info};

use crate::models::application::{encode_timestamp, now, ApplicationStatus, JobApplication};

const COLUMNS: &str = "id, company, role, status, created_at, updated_at";

/// How `(company, role)` pairs are compared when checking for duplicates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DuplicateMatch {
    #[default]
    Exact,
    CaseInsensitive,
}

#[derive(Debug, Error)]
#[error("unknown duplicate match mode '{0}'")]
pub struct UnknownDuplicateMatch(String);

impl FromStr for DuplicateMatch {
    type Err = UnknownDuplicateMatch;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exact" => Ok(DuplicateMatch::Exact),
            "case_insensitive" | "case-insensitive" => Ok(DuplicateMatch::CaseInsensitive),
            other => Err(UnknownDuplicateMatch(other.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    Duplicate(String),

    #[error("Application {0} not found")]
    NotFound(i64),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone)]
pub struct NewApplication {
    pub company: String,
    pub role: String,
    pub status: ApplicationStatus,
}

/// Fields to change on an existing record. `None` leaves the column as is.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApplicationChanges {
    pub company: Option<String>,
    pub role: Option<String>,
    pub status: Option<ApplicationStatus>,
}

#[derive(Debug, Clone, Default)]
pub struct ApplicationFilter {
    pub status: Option<ApplicationStatus>,
    pub q: Option<String>,
}

impl ApplicationFilter {
    /// The trimmed search text, or `None` when it is blank.
    pub fn search_text(&self) -> Option<&str> {
        self.q.as_deref().map(str::trim).filter(|q| !q.is_empty())
    }

    /// Renders the WHERE clause with placeholders numbered from `first_param`,
    /// plus the values to bind in order.
    fn where_clause(&self, first_param: usize) -> (String, Vec<String>) {
        let mut conditions = Vec::new();
        let mut binds = Vec::new();
        let mut next = first_param;

        if let Some(status) = self.status {
            conditions.push(format!("status = ${next}"));
            binds.push(status.as_str().to_string());
            next += 1;
        }

        if let Some(q) = self.search_text() {
            let pattern = format!("%{}%", escape_like(&q.to_lowercase()));
            conditions.push(format!(
                "(LOWER(company) LIKE ${} ESCAPE '\\' OR LOWER(role) LIKE ${} ESCAPE '\\')",
                next,
                next + 1
            ));
            binds.push(pattern.clone());
            binds.push(pattern);
        }

        if conditions.is_empty() {
            (String::new(), binds)
        } else {
            (format!(" WHERE {}", conditions.join(" AND ")), binds)
        }
    }
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn duplicate_message(company: &str, role: &str) -> String {
    format!("An application for '{role}' at '{company}' already exists.")
}

/// Maps a storage-level unique violation onto the friendly duplicate error.
fn map_unique_violation(err: sqlx::Error, message: impl FnOnce() -> String) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return StoreError::Duplicate(message());
        }
    }
    StoreError::Database(err)
}

/// Every record, newest first.
pub async fn list_all(pool: &AnyPool) -> StoreResult<Vec<JobApplication>> {
    Ok(sqlx::query_as::<_, JobApplication>(&format!(
        "SELECT {COLUMNS} FROM job_applications ORDER BY id DESC"
    ))
    .fetch_all(pool)
    .await?)
}

pub async fn get(pool: &AnyPool, id: i64) -> StoreResult<JobApplication> {
    sqlx::query_as::<_, JobApplication>(&format!(
        "SELECT {COLUMNS} FROM job_applications WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(StoreError::NotFound(id))
}

pub async fn count(pool: &AnyPool, filter: &ApplicationFilter) -> StoreResult<i64> {
    let (where_sql, binds) = filter.where_clause(1);
    let sql = format!("SELECT COUNT(*) FROM job_applications{where_sql}");

    let mut query = sqlx::query_scalar::<_, i64>(&sql);
    for value in binds {
        query = query.bind(value);
    }
    Ok(query.fetch_one(pool).await?)
}

/// One page of the filtered set, newest first.
pub async fn list_page(
    pool: &AnyPool,
    filter: &ApplicationFilter,
    limit: i64,
    offset: i64,
) -> StoreResult<Vec<JobApplication>> {
    let (where_sql, binds) = filter.where_clause(1);
    let limit_param = binds.len() + 1;
    let sql = format!(
        "SELECT {COLUMNS} FROM job_applications{where_sql} ORDER BY id DESC LIMIT ${} OFFSET ${}",
        limit_param,
        limit_param + 1
    );

    let mut query = sqlx::query_as::<_, JobApplication>(&sql);
    for value in binds {
        query = query.bind(value);
    }
    Ok(query.bind(limit).bind(offset).fetch_all(pool).await?)
}

async fn find_pair(
    pool: &AnyPool,
    company: &str,
    role: &str,
    mode: DuplicateMatch,
) -> StoreResult<Option<i64>> {
    let sql = match mode {
        DuplicateMatch::Exact => {
            "SELECT id FROM job_applications WHERE company = $1 AND role = $2 LIMIT 1"
        }
        DuplicateMatch::CaseInsensitive => {
            "SELECT id FROM job_applications WHERE LOWER(company) = LOWER($1) AND LOWER(role) = LOWER($2) LIMIT 1"
        }
    };
    Ok(sqlx::query_scalar::<_, i64>(sql)
        .bind(company)
        .bind(role)
        .fetch_optional(pool)
        .await?)
}

async fn insert(pool: &AnyPool, new: &NewApplication) -> StoreResult<JobApplication> {
    let stamp = encode_timestamp(now());
    sqlx::query_as::<_, JobApplication>(&format!(
        r#"
        INSERT INTO job_applications (company, role, status, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {COLUMNS}
        "#
    ))
    .bind(&new.company)
    .bind(&new.role)
    .bind(new.status.as_str())
    .bind(&stamp)
    .bind(&stamp)
    .fetch_one(pool)
    .await
    .map_err(|e| map_unique_violation(e, || duplicate_message(&new.company, &new.role)))
}

/// Inserts a record unless its `(company, role)` pair is already taken.
///
/// The lookup only produces the friendly error early; two racing creates can
/// both pass it, in which case the table's unique constraint rejects the
/// loser and the same `Duplicate` error is returned.
pub async fn create(
    pool: &AnyPool,
    new: NewApplication,
    mode: DuplicateMatch,
) -> StoreResult<JobApplication> {
    if let Some(existing) = find_pair(pool, &new.company, &new.role, mode).await? {
        debug!("Create rejected: pair already stored as application {existing}");
        return Err(StoreError::Duplicate(duplicate_message(
            &new.company,
            &new.role,
        )));
    }

    let created = insert(pool, &new).await?;
    info!(
        "Created application {} ({} at {})",
        created.id, created.role, created.company
    );
    Ok(created)
}

/// Applies the supplied fields and refreshes `updated_at`, even when no
/// field was supplied.
pub async fn update(
    pool: &AnyPool,
    id: i64,
    changes: ApplicationChanges,
) -> StoreResult<JobApplication> {
    let mut sql = String::from("UPDATE job_applications SET updated_at = $2");
    let mut param_count = 2;

    if changes.company.is_some() {
        param_count += 1;
        sql.push_str(&format!(", company = ${param_count}"));
    }
    if changes.role.is_some() {
        param_count += 1;
        sql.push_str(&format!(", role = ${param_count}"));
    }
    if changes.status.is_some() {
        param_count += 1;
        sql.push_str(&format!(", status = ${param_count}"));
    }
    sql.push_str(&format!(" WHERE id = $1 RETURNING {COLUMNS}"));

    let mut query = sqlx::query_as::<_, JobApplication>(&sql)
        .bind(id)
        .bind(encode_timestamp(now()));
    if let Some(company) = &changes.company {
        query = query.bind(company.clone());
    }
    if let Some(role) = &changes.role {
        query = query.bind(role.clone());
    }
    if let Some(status) = changes.status {
        query = query.bind(status.as_str());
    }

    let updated = query.fetch_optional(pool).await.map_err(|e| {
        map_unique_violation(e, || {
            "Another application already has this company and role.".to_string()
        })
    })?;

    let updated = updated.ok_or(StoreError::NotFound(id))?;
    info!("Updated application {id}");
    Ok(updated)
}

/// Removes the record for good. Returns `true` once the row is gone.
pub async fn delete(pool: &AnyPool, id: i64) -> StoreResult<bool> {
    let result = sqlx::query("DELETE FROM job_applications WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound(id));
    }
    info!("Deleted application {id}");
    Ok(true)
}
