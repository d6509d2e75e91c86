//! Database Connection Pool Module
//!
//! PostgreSQL connection pooling via deadpool-postgres plus the SQL for
//! every note-store, version-ledger, and share-registry operation.
//!
//! Row-level statements come in two flavors:
//! - pool-scoped methods on [`DbClient`] for single-statement reads and
//!   writes, and
//! - transaction-scoped methods taking a [`Transaction`] for the
//!   multi-step mutations sequenced by the write orchestrator, so that
//!   the ledger append and the conditional update commit (or roll back)
//!   as one unit.
//!
//! The optimistic concurrency check is a single conditional UPDATE with
//! a version predicate; zero affected rows means the check lost. No
//! explicit row locks are taken anywhere.

use crate::error::{ApiError, ApiResult};
use deadpool_postgres::{
    Config, ManagerConfig, Pool, PoolConfig, RecyclingMethod, Runtime, Transaction,
};
use quill_core::{
    Note, NoteId, NoteShare, NoteVersion, NoteWithGrants, Permission, ShareGrant, ShareId,
    SharedNote, UserId, VersionId,
};
use std::time::Duration;
use tokio_postgres::{NoTls, Row};

/// Idempotent DDL applied at startup.
const SCHEMA_SQL: &str = include_str!("../schema.sql");

/// Columns selected for every note projection.
const NOTE_COLUMNS: &str =
    "note_id, owner_id, updated_by, title, content, version, deleted_at, created_at, updated_at";

// ============================================================================
// CONNECTION POOL CONFIGURATION
// ============================================================================

/// Database connection pool configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// PostgreSQL host
    pub host: String,
    /// PostgreSQL port
    pub port: u16,
    /// Database name
    pub dbname: String,
    /// Database user
    pub user: String,
    /// Database password
    pub password: String,
    /// Maximum pool size
    pub max_size: usize,
    /// Connection timeout
    pub timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            dbname: "quill".to_string(),
            user: "postgres".to_string(),
            password: "".to_string(),
            max_size: 16,
            timeout: Duration::from_secs(30),
        }
    }
}

impl DbConfig {
    /// Create a new database configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("QUILL_DB_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: std::env::var("QUILL_DB_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5432),
            dbname: std::env::var("QUILL_DB_NAME").unwrap_or_else(|_| "quill".to_string()),
            user: std::env::var("QUILL_DB_USER").unwrap_or_else(|_| "postgres".to_string()),
            password: std::env::var("QUILL_DB_PASSWORD").unwrap_or_default(),
            max_size: std::env::var("QUILL_DB_POOL_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(16),
            timeout: Duration::from_secs(
                std::env::var("QUILL_DB_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
        }
    }

    /// Create a connection pool from this configuration.
    pub fn create_pool(&self) -> ApiResult<Pool> {
        let mut cfg = Config::new();
        cfg.host = Some(self.host.clone());
        cfg.port = Some(self.port);
        cfg.dbname = Some(self.dbname.clone());
        cfg.user = Some(self.user.clone());
        cfg.password = Some(self.password.clone());

        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });

        let mut pool_config = PoolConfig::new(self.max_size);
        pool_config.timeouts.wait = Some(self.timeout);
        cfg.pool = Some(pool_config);

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| ApiError::database_error(format!("Failed to create pool: {}", e)))?;

        Ok(pool)
    }
}

// ============================================================================
// DATABASE CLIENT WRAPPER
// ============================================================================

/// Database client wrapping a connection pool.
///
/// Constructed once in `main` and injected everywhere it is needed;
/// there is no process-wide singleton. Cloning is cheap (the pool is
/// internally shared).
#[derive(Clone)]
pub struct DbClient {
    pool: Pool,
}

impl DbClient {
    /// Create a new database client with the given pool.
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Create a new database client from configuration.
    pub fn from_config(config: &DbConfig) -> ApiResult<Self> {
        let pool = config.create_pool()?;
        Ok(Self::new(pool))
    }

    /// Get the current pool size for observability.
    pub fn pool_size(&self) -> usize {
        let status = self.pool.status();
        status.size
    }

    /// Get a connection from the pool.
    ///
    /// Services use this to open transactions; the connection returns to
    /// the pool when dropped, rolling back any uncommitted transaction.
    pub async fn conn(&self) -> ApiResult<deadpool_postgres::Object> {
        self.pool.get().await.map_err(ApiError::from)
    }

    /// Apply the relational schema idempotently.
    pub async fn ensure_schema(&self) -> ApiResult<()> {
        let conn = self.conn().await?;
        conn.batch_execute(SCHEMA_SQL).await?;
        Ok(())
    }

    // ========================================================================
    // NOTE OPERATIONS (pool-scoped reads)
    // ========================================================================

    /// Fetch a live note together with its share grants.
    ///
    /// Returns `None` for absent and soft-deleted notes alike. No
    /// visibility filtering happens here: the caller decides what the
    /// requester may see from the grants carried in the projection.
    pub async fn note_fetch_with_grants(&self, id: NoteId) -> ApiResult<Option<NoteWithGrants>> {
        let conn = self.conn().await?;

        let stmt = format!(
            "SELECT {NOTE_COLUMNS} FROM notes WHERE note_id = $1 AND deleted_at IS NULL"
        );
        let row = conn.query_opt(stmt.as_str(), &[&id.as_uuid()]).await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let note = note_from_row(&row)?;

        let grant_rows = conn
            .query(
                "SELECT grantee_id, permission FROM note_shares WHERE note_id = $1",
                &[&id.as_uuid()],
            )
            .await?;

        let mut grants = Vec::with_capacity(grant_rows.len());
        for row in &grant_rows {
            grants.push(grant_from_row(row)?);
        }

        Ok(Some(NoteWithGrants { note, grants }))
    }

    /// List a user's own notes, newest-updated first, soft-deleted excluded.
    pub async fn note_list_by_owner(&self, owner: UserId) -> ApiResult<Vec<Note>> {
        let conn = self.conn().await?;

        let stmt = format!(
            "SELECT {NOTE_COLUMNS} FROM notes \
             WHERE owner_id = $1 AND deleted_at IS NULL \
             ORDER BY updated_at DESC"
        );
        let rows = conn.query(stmt.as_str(), &[&owner.as_uuid()]).await?;

        rows.iter().map(note_from_row).collect()
    }

    /// Natural-language search over a user's notes.
    ///
    /// Relevance-ranked by `ts_rank`; ties carry no stable order beyond
    /// most-relevant-first. Soft-deleted notes never match.
    pub async fn note_search(&self, owner: UserId, keyword: &str) -> ApiResult<Vec<Note>> {
        let conn = self.conn().await?;

        let stmt = format!(
            "SELECT {NOTE_COLUMNS} FROM notes \
             WHERE owner_id = $1 \
               AND deleted_at IS NULL \
               AND to_tsvector('english', title || ' ' || content) \
                   @@ plainto_tsquery('english', $2) \
             ORDER BY ts_rank( \
                 to_tsvector('english', title || ' ' || content), \
                 plainto_tsquery('english', $2)) DESC"
        );
        let rows = conn
            .query(stmt.as_str(), &[&owner.as_uuid(), &keyword])
            .await?;

        rows.iter().map(note_from_row).collect()
    }

    /// Soft-delete a note owned by `owner`.
    ///
    /// Returns the number of rows affected; zero means the note is
    /// absent, already deleted, or owned by someone else.
    pub async fn note_soft_delete(&self, id: NoteId, owner: UserId) -> ApiResult<u64> {
        let conn = self.conn().await?;

        let affected = conn
            .execute(
                "UPDATE notes SET deleted_at = now(), updated_at = now() \
                 WHERE note_id = $1 AND owner_id = $2 AND deleted_at IS NULL",
                &[&id.as_uuid(), &owner.as_uuid()],
            )
            .await?;

        Ok(affected)
    }

    // ========================================================================
    // NOTE OPERATIONS (transaction-scoped, used by the write orchestrator)
    // ========================================================================

    /// Insert a freshly created note inside `tx`.
    pub async fn note_insert_tx(
        &self,
        tx: &Transaction<'_>,
        id: NoteId,
        owner: UserId,
        title: &str,
        content: &str,
    ) -> ApiResult<Note> {
        let stmt = format!(
            "INSERT INTO notes (note_id, owner_id, title, content, version) \
             VALUES ($1, $2, $3, $4, 1) \
             RETURNING {NOTE_COLUMNS}"
        );
        let row = tx
            .query_one(
                stmt.as_str(),
                &[&id.as_uuid(), &owner.as_uuid(), &title, &content],
            )
            .await?;

        note_from_row(&row)
    }

    /// Read the current note row inside `tx`.
    ///
    /// A plain read, deliberately not `FOR UPDATE`: exclusivity comes
    /// from the version predicate on the subsequent conditional update.
    pub async fn note_current_tx(
        &self,
        tx: &Transaction<'_>,
        id: NoteId,
    ) -> ApiResult<Option<Note>> {
        let stmt = format!(
            "SELECT {NOTE_COLUMNS} FROM notes WHERE note_id = $1 AND deleted_at IS NULL"
        );
        let row = tx.query_opt(stmt.as_str(), &[&id.as_uuid()]).await?;

        row.as_ref().map(note_from_row).transpose()
    }

    /// Apply new state to a note, conditioned on its version still being
    /// `expected_version`.
    ///
    /// One atomic compare-and-swap on the version column. Zero affected
    /// rows - `None` here - is the optimistic check's verdict that
    /// another writer committed first.
    pub async fn note_apply_update_tx(
        &self,
        tx: &Transaction<'_>,
        id: NoteId,
        expected_version: i32,
        title: &str,
        content: &str,
        editor: UserId,
    ) -> ApiResult<Option<Note>> {
        let stmt = format!(
            "UPDATE notes \
             SET title = $3, content = $4, version = version + 1, \
                 updated_by = $5, updated_at = now() \
             WHERE note_id = $1 AND version = $2 AND deleted_at IS NULL \
             RETURNING {NOTE_COLUMNS}"
        );
        let row = tx
            .query_opt(
                stmt.as_str(),
                &[
                    &id.as_uuid(),
                    &expected_version,
                    &title,
                    &content,
                    &editor.as_uuid(),
                ],
            )
            .await?;

        row.as_ref().map(note_from_row).transpose()
    }

    /// Permission a non-owner holds on a note inside `tx`, if any.
    pub async fn share_permission_tx(
        &self,
        tx: &Transaction<'_>,
        note_id: NoteId,
        user: UserId,
    ) -> ApiResult<Option<Permission>> {
        let row = tx
            .query_opt(
                "SELECT permission FROM note_shares \
                 WHERE note_id = $1 AND grantee_id = $2",
                &[&note_id.as_uuid(), &user.as_uuid()],
            )
            .await?;

        row.as_ref().map(permission_from_row).transpose()
    }

    // ========================================================================
    // VERSION LEDGER OPERATIONS
    // ========================================================================

    /// Append a ledger snapshot inside `tx`.
    ///
    /// Idempotent per (note, version): the create path seeds the
    /// version-1 row, so the first update's pre-image append must not
    /// duplicate it. The UNIQUE constraint keeps the ledger at exactly
    /// one row per superseded version even under writer races.
    pub async fn version_append_tx(
        &self,
        tx: &Transaction<'_>,
        note_id: NoteId,
        title: &str,
        content: &str,
        version: i32,
    ) -> ApiResult<()> {
        tx.execute(
            "INSERT INTO note_versions (version_id, note_id, title, content, version) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (note_id, version) DO NOTHING",
            &[
                &VersionId::now_v7().as_uuid(),
                &note_id.as_uuid(),
                &title,
                &content,
                &version,
            ],
        )
        .await?;
        Ok(())
    }

    /// List a note's ledger snapshots, version-ascending.
    pub async fn version_list(&self, note_id: NoteId) -> ApiResult<Vec<NoteVersion>> {
        let conn = self.conn().await?;

        let rows = conn
            .query(
                "SELECT version_id, note_id, title, content, version, created_at \
                 FROM note_versions WHERE note_id = $1 ORDER BY version ASC",
                &[&note_id.as_uuid()],
            )
            .await?;

        rows.iter().map(version_from_row).collect()
    }

    // ========================================================================
    // SHARE REGISTRY OPERATIONS
    // ========================================================================

    /// Read a note row inside `tx` only if `owner` owns it.
    ///
    /// Used by the share registry's ownership precondition; absent and
    /// not-owned are indistinguishable on purpose.
    pub async fn note_owned_tx(
        &self,
        tx: &Transaction<'_>,
        id: NoteId,
        owner: UserId,
    ) -> ApiResult<Option<Note>> {
        let stmt = format!(
            "SELECT {NOTE_COLUMNS} FROM notes \
             WHERE note_id = $1 AND owner_id = $2 AND deleted_at IS NULL"
        );
        let row = tx
            .query_opt(stmt.as_str(), &[&id.as_uuid(), &owner.as_uuid()])
            .await?;

        row.as_ref().map(note_from_row).transpose()
    }

    /// Upsert a share grant inside `tx`.
    ///
    /// One statement makes the existence-check-plus-write atomic against
    /// concurrent grants for the same (note, grantee) pair.
    pub async fn share_upsert_tx(
        &self,
        tx: &Transaction<'_>,
        note_id: NoteId,
        grantee: UserId,
        permission: Permission,
    ) -> ApiResult<NoteShare> {
        let row = tx
            .query_one(
                "INSERT INTO note_shares (share_id, note_id, grantee_id, permission) \
                 VALUES ($1, $2, $3, $4) \
                 ON CONFLICT (note_id, grantee_id) \
                 DO UPDATE SET permission = EXCLUDED.permission, updated_at = now() \
                 RETURNING share_id, note_id, grantee_id, permission, created_at, updated_at",
                &[
                    &ShareId::now_v7().as_uuid(),
                    &note_id.as_uuid(),
                    &grantee.as_uuid(),
                    &permission.as_str(),
                ],
            )
            .await?;

        share_from_row(&row)
    }

    /// Notes shared with `user`, each with its grant's permission.
    ///
    /// The inner join against live notes is what hides notes their owner
    /// has since soft-deleted - stale grant rows are harmless.
    pub async fn shared_with(&self, user: UserId) -> ApiResult<Vec<SharedNote>> {
        let conn = self.conn().await?;

        let rows = conn
            .query(
                "SELECT n.note_id, n.owner_id, n.updated_by, n.title, n.content, n.version, \
                        n.deleted_at, n.created_at, n.updated_at, s.permission \
                 FROM note_shares s \
                 JOIN notes n ON n.note_id = s.note_id AND n.deleted_at IS NULL \
                 WHERE s.grantee_id = $1 \
                 ORDER BY n.updated_at DESC",
                &[&user.as_uuid()],
            )
            .await?;

        rows.iter()
            .map(|row| {
                Ok(SharedNote {
                    note: note_from_row(row)?,
                    permission: permission_from_row(row)?,
                })
            })
            .collect()
    }

    // ========================================================================
    // IDENTITY COLLABORATOR TABLE
    // ========================================================================

    /// Look up a user by ID. Backs the identity-resolution seam.
    pub async fn user_exists(&self, id: UserId) -> ApiResult<bool> {
        let conn = self.conn().await?;
        let row = conn
            .query_opt("SELECT user_id FROM users WHERE user_id = $1", &[&id.as_uuid()])
            .await?;
        Ok(row.is_some())
    }

    /// Insert a user row if absent.
    ///
    /// The signup flow lives in the excluded auth layer; this exists for
    /// bootstrap and test fixtures.
    pub async fn user_ensure(&self, id: UserId, email: &str) -> ApiResult<()> {
        let conn = self.conn().await?;
        conn.execute(
            "INSERT INTO users (user_id, email) VALUES ($1, $2) \
             ON CONFLICT (user_id) DO NOTHING",
            &[&id.as_uuid(), &email],
        )
        .await?;
        Ok(())
    }
}

// ============================================================================
// ROW MAPPING
// ============================================================================

fn note_from_row(row: &Row) -> ApiResult<Note> {
    Ok(Note {
        note_id: NoteId::new(row.try_get("note_id")?),
        owner_id: UserId::new(row.try_get("owner_id")?),
        updated_by: row
            .try_get::<_, Option<uuid::Uuid>>("updated_by")?
            .map(UserId::new),
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        version: row.try_get("version")?,
        deleted_at: row.try_get("deleted_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn version_from_row(row: &Row) -> ApiResult<NoteVersion> {
    Ok(NoteVersion {
        version_id: VersionId::new(row.try_get("version_id")?),
        note_id: NoteId::new(row.try_get("note_id")?),
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        version: row.try_get("version")?,
        created_at: row.try_get("created_at")?,
    })
}

fn share_from_row(row: &Row) -> ApiResult<NoteShare> {
    Ok(NoteShare {
        share_id: ShareId::new(row.try_get("share_id")?),
        note_id: NoteId::new(row.try_get("note_id")?),
        grantee_id: UserId::new(row.try_get("grantee_id")?),
        permission: permission_from_row(row)?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn grant_from_row(row: &Row) -> ApiResult<ShareGrant> {
    Ok(ShareGrant {
        grantee_id: UserId::new(row.try_get("grantee_id")?),
        permission: permission_from_row(row)?,
    })
}

fn permission_from_row(row: &Row) -> ApiResult<Permission> {
    let raw: String = row.try_get("permission")?;
    Permission::parse(&raw)
        .ok_or_else(|| ApiError::internal_error(format!("Unknown permission value: {}", raw)))
}
