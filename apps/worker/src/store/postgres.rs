//! Postgres-backed credential store and run ledger

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;

use super::{
    Credential, CredentialLookup, CredentialStore, RunLedger, RunRecordType, RunType, StoreError,
    StoreResult, TokenPair, UserConfig,
};

/// Repository over the `credentials` and `runs` tables
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

/// Row shape shared by every credential query
#[derive(sqlx::FromRow)]
struct CredentialRow {
    id: i64,
    user_id: String,
    access_token: String,
    refresh_token: String,
    config: Json<UserConfig>,
}

impl From<CredentialRow> for Credential {
    fn from(row: CredentialRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            access_token: row.access_token,
            refresh_token: row.refresh_token,
            config: row.config.0.sanitize(),
        }
    }
}

impl PostgresStore {
    /// Create a new store over an existing connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the underlying connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the two tables the worker owns if they do not exist yet
    pub async fn ensure_schema(&self) -> StoreResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS credentials (
                id BIGSERIAL PRIMARY KEY,
                user_id TEXT NOT NULL UNIQUE,
                access_token TEXT NOT NULL,
                refresh_token TEXT NOT NULL,
                config JSONB NOT NULL DEFAULT '{}'::jsonb
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS runs (
                credentials_id BIGINT NOT NULL REFERENCES credentials(id) ON DELETE CASCADE,
                type TEXT NOT NULL,
                date TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS runs_credentials_id_date_idx \
             ON runs (credentials_id, date DESC)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl CredentialStore for PostgresStore {
    async fn get(&self, lookup: CredentialLookup<'_>) -> StoreResult<Credential> {
        const COLUMNS: &str = "id, user_id, access_token, refresh_token, config";

        let row: Option<CredentialRow> = match lookup {
            CredentialLookup::ById(id) => {
                sqlx::query_as(&format!(
                    "SELECT {} FROM credentials WHERE id = $1",
                    COLUMNS
                ))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?
            }
            CredentialLookup::ByUserId(user_id) => {
                sqlx::query_as(&format!(
                    "SELECT {} FROM credentials WHERE user_id = $1",
                    COLUMNS
                ))
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?
            }
        };

        match row {
            Some(row) => Ok(row.into()),
            None => Err(StoreError::CannotGetUser("no_user_found".to_string())),
        }
    }

    async fn save(&self, tokens: &TokenPair, user_id: &str) -> StoreResult<()> {
        // An update touches tokens only; the stored config survives.
        sqlx::query(
            r#"
            INSERT INTO credentials (user_id, access_token, refresh_token, config)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id) DO UPDATE SET
                access_token = EXCLUDED.access_token,
                refresh_token = EXCLUDED.refresh_token
            "#,
        )
        .bind(user_id)
        .bind(&tokens.access_token)
        .bind(&tokens.refresh_token)
        .bind(Json(UserConfig::default()))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn save_config(&self, config: UserConfig, user_id: &str) -> StoreResult<()> {
        sqlx::query("UPDATE credentials SET config = $1 WHERE user_id = $2")
            .bind(Json(config.sanitize()))
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn remove(&self, lookup: CredentialLookup<'_>) -> StoreResult<()> {
        match lookup {
            CredentialLookup::ById(id) => {
                sqlx::query("DELETE FROM credentials WHERE id = $1")
                    .bind(id)
                    .execute(&self.pool)
                    .await?;
            }
            CredentialLookup::ByUserId(user_id) => {
                sqlx::query("DELETE FROM credentials WHERE user_id = $1")
                    .bind(user_id)
                    .execute(&self.pool)
                    .await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl RunLedger for PostgresStore {
    async fn record_run(&self, credentials_id: i64, record: RunRecordType) -> StoreResult<()> {
        sqlx::query("INSERT INTO runs (credentials_id, type) VALUES ($1, $2)")
            .bind(credentials_id)
            .bind(record.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// SQL rendition of [`super::is_due`]: completed and error runs inside
    /// the floor-clamped window suppress scheduling, a revoked record
    /// suppresses it permanently.
    async fn due_credentials(
        &self,
        run_type: RunType,
        floor_minutes: u32,
    ) -> StoreResult<Vec<Credential>> {
        let rows: Vec<CredentialRow> = sqlx::query_as(
            r#"
            SELECT c.id, c.user_id, c.access_token, c.refresh_token, c.config
            FROM credentials c
            WHERE NOT EXISTS (
                    SELECT 1 FROM runs r
                    WHERE r.credentials_id = c.id
                      AND r.type = 'revokedCredentials')
              AND NOT EXISTS (
                    SELECT 1 FROM runs r
                    WHERE r.credentials_id = c.id
                      AND r.type IN ($1, 'error')
                      AND r.date > NOW() - make_interval(
                            mins => GREATEST(
                                COALESCE((c.config->>'syncIntervalMinutes')::int, $2),
                                $2)))
            ORDER BY c.id
            "#,
        )
        .bind(run_type.as_str())
        .bind(floor_minutes as i32)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Credential::from).collect())
    }
}
