//! Postgres credential store.
//!
//! Reads go straight to the `users` table; writes go through the stored
//! functions described in `sql/credential_store.sql`.

use async_trait::async_trait;
use memoreal_core::{DatabaseConfig, UserId};
use sqlx::{
    PgPool, Row,
    postgres::{PgConnectOptions, PgPoolOptions, PgRow},
};

use super::{CredentialStore, NewUser, StoreError, User, UserProfile, UserUpdate};

const SELECT_BY_USERNAME: &str = "SELECT userid, username, email, password_hash, first_name, \
     last_name, mi, contact_number, birthdate, picture FROM users WHERE username = $1";

const SELECT_BY_ID: &str = "SELECT userid, username, email, password_hash, first_name, \
     last_name, mi, contact_number, birthdate, picture FROM users WHERE userid = $1";

const SELECT_ALL: &str = "SELECT userid, username, email, password_hash, first_name, \
     last_name, mi, contact_number, birthdate, picture FROM users ORDER BY userid";

const SELECT_TAKEN: &str =
    "SELECT EXISTS(SELECT 1 FROM users WHERE username = $1 OR email = $2) AS taken";

const CALL_INSERT: &str =
    "SELECT sp_insert_user($1, $2, $3, $4, $5, $6, $7, $8, $9)::BIGINT AS userid";

const CALL_UPDATE: &str =
    "SELECT sp_update_user($1, $2, $3, $4, $5, $6, $7, $8, $9)::BIGINT AS affected";

const CALL_DELETE: &str = "SELECT sp_delete_user($1)::BIGINT AS affected";

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => Self::Conflict,
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                Self::Unavailable(err.to_string())
            }
            _ => Self::Database(err.to_string()),
        }
    }
}

/// Credential store backed by a Postgres connection pool.
#[derive(Debug, Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    /// Connect to the configured database.
    ///
    /// Connects eagerly so an unreachable database fails startup.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Unavailable` if no connection can be established.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let mut options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .database(&config.database);
        if let Some(password) = config.password.as_deref() {
            options = options.password(password);
        }

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.connect_timeout())
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        tracing::info!(
            host = %config.host,
            port = config.port,
            database = %config.database,
            "Connected to credential store"
        );
        Ok(Self { pool })
    }
}

fn user_from_row(row: &PgRow) -> Result<User, sqlx::Error> {
    Ok(User {
        id: UserId::new(row.try_get("userid")?),
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        profile: UserProfile {
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            mi: row.try_get("mi")?,
            contact_number: row.try_get("contact_number")?,
            birthdate: row.try_get("birthdate")?,
            picture: row.try_get("picture")?,
        },
    })
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(SELECT_BY_USERNAME)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(SELECT_BY_ID)
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    async fn list(&self) -> Result<Vec<User>, StoreError> {
        let rows = sqlx::query(SELECT_ALL).fetch_all(&self.pool).await?;
        Ok(rows
            .iter()
            .map(user_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn is_taken(&self, username: &str, email: &str) -> Result<bool, StoreError> {
        let row = sqlx::query(SELECT_TAKEN)
            .bind(username)
            .bind(email)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("taken")?)
    }

    async fn insert(&self, user: NewUser) -> Result<UserId, StoreError> {
        let row = sqlx::query(CALL_INSERT)
            .bind(user.profile.first_name)
            .bind(user.profile.last_name)
            .bind(user.profile.mi)
            .bind(&user.username)
            .bind(user.password_hash)
            .bind(user.profile.contact_number)
            .bind(user.email)
            .bind(user.profile.birthdate)
            .bind(user.profile.picture)
            .fetch_one(&self.pool)
            .await?;
        let id: i64 = row.try_get("userid")?;
        tracing::debug!(user_id = id, username = %user.username, "Inserted user");
        Ok(UserId::new(id))
    }

    async fn update(&self, username: &str, update: UserUpdate) -> Result<bool, StoreError> {
        let row = sqlx::query(CALL_UPDATE)
            .bind(username)
            .bind(update.email)
            .bind(update.password_hash)
            .bind(update.profile.first_name)
            .bind(update.profile.last_name)
            .bind(update.profile.mi)
            .bind(update.profile.contact_number)
            .bind(update.profile.birthdate)
            .bind(update.profile.picture)
            .fetch_one(&self.pool)
            .await?;
        let affected: i64 = row.try_get("affected")?;
        Ok(affected > 0)
    }

    async fn delete(&self, id: UserId) -> Result<bool, StoreError> {
        let row = sqlx::query(CALL_DELETE)
            .bind(id.get())
            .fetch_one(&self.pool)
            .await?;
        let affected: i64 = row.try_get("affected")?;
        Ok(affected > 0)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_errors_are_unavailable() {
        assert!(matches!(
            StoreError::from(sqlx::Error::PoolTimedOut),
            StoreError::Unavailable(_)
        ));
        assert!(matches!(
            StoreError::from(sqlx::Error::PoolClosed),
            StoreError::Unavailable(_)
        ));
    }

    #[test]
    fn test_query_errors_are_database() {
        assert!(matches!(
            StoreError::from(sqlx::Error::RowNotFound),
            StoreError::Database(_)
        ));
    }

    #[tokio::test]
    async fn test_connect_unreachable() {
        let config = DatabaseConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            connect_timeout_secs: 1,
            ..DatabaseConfig::default()
        };
        assert!(matches!(
            PgCredentialStore::connect(&config).await,
            Err(StoreError::Unavailable(_))
        ));
    }
}
