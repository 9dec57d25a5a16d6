//! PostgreSQL user store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::error::DatabaseError;
use sqlx::{PgPool, Postgres, Row, Transaction, migrate::Migrator, postgres::PgRow};
use tracing::{debug, info};
use uuid::Uuid;

use super::UserStore;
use crate::{
    error::{UserError, UserResult},
    models::{
        NewUser, User, UserId,
        user::{next_modification, normalize_email, now},
    },
};

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Name of the unique index over the case-folded `email_key` column
const EMAIL_UNIQUE_INDEX: &str = "users_email_key_unique";

/// Users joined with their grants, aggregated into one row per user.
/// `{filter}` is replaced by a WHERE clause.
const SELECT_USERS: &str = r#"
    SELECT u.id, u.email, u.credential_secret, u.is_administrator,
           u.shared_all_libraries, u.created_at, u.updated_at,
           COALESCE(
               array_agg(g.library_id) FILTER (WHERE g.library_id IS NOT NULL),
               '{}'
           ) AS shared_library_ids
    FROM users u
    LEFT JOIN user_library_grants g ON g.user_id = u.id
    {filter}
    GROUP BY u.id
"#;

fn select_users(filter: &str) -> String {
    SELECT_USERS.replace("{filter}", filter)
}

fn query_error(e: sqlx::Error) -> UserError {
    UserError::Database(DatabaseError::Query(e))
}

/// Map a failed write, turning a hit on the email index into `DuplicateEmail`
fn write_error(e: sqlx::Error, email: &str) -> UserError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() && db.constraint() == Some(EMAIL_UNIQUE_INDEX) {
            return UserError::DuplicateEmail(email.to_string());
        }
    }

    query_error(e)
}

fn user_from_row(row: &PgRow) -> Result<User, sqlx::Error> {
    let shared_library_ids: Vec<String> = row.try_get("shared_library_ids")?;

    Ok(User {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        credential_secret: row.try_get("credential_secret")?,
        is_administrator: row.try_get("is_administrator")?,
        shared_all_libraries: row.try_get("shared_all_libraries")?,
        shared_library_ids: shared_library_ids.into_iter().collect(),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// User store backed by PostgreSQL
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    /// Create a new user store
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply the bundled schema migrations
    pub async fn migrate(pool: &PgPool) -> Result<(), DatabaseError> {
        info!("Running user store migrations");

        MIGRATOR
            .run(pool)
            .await
            .map_err(|e| DatabaseError::Migration(e.to_string()))
    }

    async fn fetch_users(&self, filter: &str, bind: Option<&str>) -> UserResult<Vec<User>> {
        let sql = select_users(filter);
        let mut query = sqlx::query(&sql);
        if let Some(value) = bind {
            query = query.bind(value);
        }

        let rows = query.fetch_all(&self.pool).await.map_err(query_error)?;
        rows.iter()
            .map(user_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(query_error)
    }
}

async fn insert_grants(
    tx: &mut Transaction<'_, Postgres>,
    user_id: UserId,
    library_ids: Vec<String>,
) -> UserResult<()> {
    if library_ids.is_empty() {
        return Ok(());
    }

    sqlx::query(
        r#"
        INSERT INTO user_library_grants (user_id, library_id)
        SELECT $1, UNNEST($2::text[])
        "#,
    )
    .bind(user_id)
    .bind(library_ids)
    .execute(&mut **tx)
    .await
    .map_err(query_error)?;

    Ok(())
}

/// Replace the stored grant rows of `user` with its current grant set
async fn replace_grants(tx: &mut Transaction<'_, Postgres>, user: &User) -> UserResult<()> {
    sqlx::query("DELETE FROM user_library_grants WHERE user_id = $1")
        .bind(user.id)
        .execute(&mut **tx)
        .await
        .map_err(query_error)?;

    insert_grants(tx, user.id, user.shared_library_ids.iter().cloned().collect()).await
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn insert(&self, new_user: NewUser) -> UserResult<User> {
        info!("Creating new user: {}", new_user.email);

        let user = new_user.into_user(Uuid::new_v4(), now());
        let mut tx = self.pool.begin().await.map_err(query_error)?;

        sqlx::query(
            r#"
            INSERT INTO users (id, email, email_key, credential_secret, is_administrator,
                               shared_all_libraries, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(normalize_email(&user.email))
        .bind(&user.credential_secret)
        .bind(user.is_administrator)
        .bind(user.shared_all_libraries)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| write_error(e, &user.email))?;

        insert_grants(
            &mut tx,
            user.id,
            user.shared_library_ids.iter().cloned().collect(),
        )
        .await?;

        tx.commit().await.map_err(query_error)?;

        Ok(user)
    }

    async fn update(&self, user: &User) -> UserResult<User> {
        info!("Updating user: {}", user.id);

        let mut tx = self.pool.begin().await.map_err(query_error)?;

        let row = sqlx::query("SELECT created_at, updated_at FROM users WHERE id = $1 FOR UPDATE")
            .bind(user.id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(query_error)?
            .ok_or(UserError::NotFound(user.id))?;

        let created_at: DateTime<Utc> = row.try_get("created_at").map_err(query_error)?;
        let previous: DateTime<Utc> = row.try_get("updated_at").map_err(query_error)?;
        let updated_at = next_modification(previous);

        sqlx::query(
            r#"
            UPDATE users
            SET email = $2, email_key = $3, credential_secret = $4, is_administrator = $5,
                shared_all_libraries = $6, updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(normalize_email(&user.email))
        .bind(&user.credential_secret)
        .bind(user.is_administrator)
        .bind(user.shared_all_libraries)
        .bind(updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| write_error(e, &user.email))?;

        replace_grants(&mut tx, user).await?;

        tx.commit().await.map_err(query_error)?;

        Ok(User {
            created_at,
            updated_at,
            ..user.clone()
        })
    }

    async fn find_by_id(&self, id: UserId) -> UserResult<Option<User>> {
        debug!("Finding user by ID: {}", id);

        let sql = select_users("WHERE u.id = $1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(query_error)?;

        row.as_ref()
            .map(user_from_row)
            .transpose()
            .map_err(query_error)
    }

    async fn find_by_email(&self, email: &str) -> UserResult<Option<User>> {
        debug!("Finding user by email: {}", email);

        let key = normalize_email(email);
        let mut users = self.fetch_users("WHERE u.email_key = $1", Some(&key)).await?;
        Ok(users.pop())
    }

    async fn exists_by_email(&self, email: &str) -> UserResult<bool> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE email_key = $1)")
            .bind(normalize_email(email))
            .fetch_one(&self.pool)
            .await
            .map_err(query_error)
    }

    async fn find_by_library_id(&self, library_id: &str) -> UserResult<Vec<User>> {
        self.fetch_users(
            "WHERE u.id IN (SELECT user_id FROM user_library_grants WHERE library_id = $1)",
            Some(library_id),
        )
        .await
    }

    async fn find_all(&self) -> UserResult<Vec<User>> {
        self.fetch_users("", None).await
    }

    async fn count(&self) -> UserResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(query_error)?;

        Ok(count as u64)
    }

    async fn delete(&self, id: UserId) -> UserResult<()> {
        info!("Deleting user: {}", id);

        // Grants go with the user through ON DELETE CASCADE.
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(query_error)?;

        Ok(())
    }

    async fn delete_all(&self) -> UserResult<()> {
        info!("Deleting all users");

        sqlx::query("DELETE FROM users")
            .execute(&self.pool)
            .await
            .map_err(query_error)?;

        Ok(())
    }
}
