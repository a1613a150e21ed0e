//! Postgres-backed [`UserDirectory`].

use super::{DirectoryError, NewUser, Role, UserDirectory, UserRecord};
use async_trait::async_trait;
use sqlx::{postgres::PgRow, Connection, PgPool, Row};
use tracing::{error, info_span, Instrument};
use uuid::Uuid;

pub const SCHEMA_SQL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/sql/schema.sql"));

#[derive(Debug, Clone)]
pub struct PgDirectory {
    pool: PgPool,
}

impl PgDirectory {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the `users` table and its unique constraints if missing.
    ///
    /// # Errors
    /// Returns an error if the schema statements fail.
    pub async fn ensure_schema(&self) -> Result<(), sqlx::Error> {
        let span = info_span!("db.query", db.system = "postgresql", db.operation = "CREATE");
        sqlx::raw_sql(SCHEMA_SQL)
            .execute(&self.pool)
            .instrument(span)
            .await?;
        Ok(())
    }
}

/// SQLSTATE 23505 (`unique_violation`).
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

fn unavailable(context: &str, err: &sqlx::Error) -> DirectoryError {
    error!("{}: {}", context, err);
    DirectoryError::Unavailable(context.to_string())
}

fn user_from_row(row: &PgRow) -> Result<UserRecord, sqlx::Error> {
    let role: String = row.try_get("role")?;
    let role = role.parse::<Role>().map_err(|err| sqlx::Error::ColumnDecode {
        index: "role".to_string(),
        source: err.into(),
    })?;

    Ok(UserRecord {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        username: row.try_get("username")?,
        password_hash: row.try_get("password_hash")?,
        is_active: row.try_get("is_active")?,
        role,
    })
}

#[async_trait]
impl UserDirectory for PgDirectory {
    async fn count_by_email_or_username(
        &self,
        email: &str,
        username: &str,
    ) -> Result<u64, DirectoryError> {
        let query = "SELECT COUNT(*) AS count FROM users WHERE email = $1 OR username = $2";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(email)
            .bind(username)
            .fetch_one(&self.pool)
            .instrument(span)
            .await
            .map_err(|err| unavailable("failed to count users", &err))?;

        let count: i64 = row
            .try_get("count")
            .map_err(|err| unavailable("failed to decode user count", &err))?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn insert(&self, user: NewUser) -> Result<Uuid, DirectoryError> {
        let query = r"
            INSERT INTO users
                (email, username, password_hash, is_active, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(&user.email)
            .bind(&user.username)
            .bind(&user.password_hash)
            .bind(user.is_active)
            .bind(user.role.as_str())
            .fetch_one(&self.pool)
            .instrument(span)
            .await;

        match row {
            Ok(row) => row
                .try_get("id")
                .map_err(|err| unavailable("failed to decode user id", &err)),
            Err(err) if is_unique_violation(&err) => Err(DirectoryError::Duplicate),
            Err(err) => Err(unavailable("failed to insert user", &err)),
        }
    }

    async fn find_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<UserRecord>, DirectoryError> {
        let query = r"
            SELECT id, email, username, password_hash, is_active, role
            FROM users
            WHERE email = $1 OR username = $1
            ORDER BY (email = $1) DESC
            LIMIT 1
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(identifier)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .map_err(|err| unavailable("failed to lookup user", &err))?;

        row.as_ref()
            .map(user_from_row)
            .transpose()
            .map_err(|err| unavailable("failed to decode user", &err))
    }

    async fn ping(&self) -> Result<(), DirectoryError> {
        let acquire_span = info_span!(
            "db.acquire",
            db.system = "postgresql",
            db.operation = "ACQUIRE"
        );
        let mut conn = self
            .pool
            .acquire()
            .instrument(acquire_span)
            .await
            .map_err(|err| unavailable("failed to acquire database connection", &err))?;

        let ping_span = info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
        conn.ping()
            .instrument(ping_span)
            .await
            .map_err(|err| unavailable("failed to ping database", &err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::error::{DatabaseError, ErrorKind};
    use std::{borrow::Cow, error::Error as StdError};

    #[derive(Debug, thiserror::Error)]
    #[error("sqlstate {code}")]
    struct SqlState {
        code: &'static str,
    }

    impl DatabaseError for SqlState {
        fn message(&self) -> &str {
            self.code
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            Some(Cow::Borrowed(self.code))
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            ErrorKind::Other
        }
    }

    fn db_error(code: &'static str) -> sqlx::Error {
        sqlx::Error::Database(Box::new(SqlState { code }))
    }

    #[test]
    fn is_unique_violation_matches_sqlstate() {
        assert!(is_unique_violation(&db_error("23505")));
        assert!(!is_unique_violation(&db_error("23503")));
        assert!(!is_unique_violation(&sqlx::Error::RowNotFound));
    }

    #[test]
    fn schema_declares_independent_unique_constraints() {
        assert!(SCHEMA_SQL.contains("UNIQUE (email)"));
        assert!(SCHEMA_SQL.contains("UNIQUE (username)"));
    }

    /// Live database checks run only when `RAIKO_TEST_DSN` points at a
    /// disposable Postgres database.
    async fn live_directory() -> Option<PgDirectory> {
        let dsn = std::env::var("RAIKO_TEST_DSN").ok()?;
        let pool = match PgPool::connect(&dsn).await {
            Ok(pool) => pool,
            Err(err) => {
                eprintln!("Skipping Postgres test: {err}");
                return None;
            }
        };
        let directory = PgDirectory::new(pool);
        if let Err(err) = directory.ensure_schema().await {
            eprintln!("Skipping Postgres test: {err}");
            return None;
        }
        Some(directory)
    }

    #[tokio::test]
    async fn live_insert_find_and_duplicate() -> Result<(), DirectoryError> {
        let Some(directory) = live_directory().await else {
            return Ok(());
        };

        let suffix = Uuid::new_v4().simple().to_string();
        let email = format!("{}@x.com", &suffix[..12]);
        let username = format!("u{}", &suffix[..12]);
        let user = NewUser {
            email: email.clone(),
            username: username.clone(),
            password_hash: "$2b$04$digest".to_string(),
            is_active: true,
            role: Role::User,
        };

        let id = directory.insert(user.clone()).await?;
        let found = directory.find_by_identifier(&username).await?;
        assert_eq!(found.map(|u| u.id), Some(id));
        assert_eq!(directory.count_by_email_or_username(&email, "nobody").await?, 1);

        let duplicate = directory.insert(user).await;
        assert!(matches!(duplicate, Err(DirectoryError::Duplicate)));
        directory.ping().await
    }
}
