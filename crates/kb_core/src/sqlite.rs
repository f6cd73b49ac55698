//! Durable record store over SQLite via sqlx.
//!
//! Every mutation is a single statement, so a failed write leaves the prior
//! committed row untouched. Compare-and-swap is a conditional UPDATE whose
//! WHERE clause includes the expected state; `rows_affected` decides between
//! success, `NotFound`, and `StateMismatch`.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool};

use crate::error::StoreError;
use crate::store::{PairKey, RecordRow, RecordSpace, RecordStore};

/// Durable store handle. Cheap to clone (pool is Arc internally).
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct DbRow {
    initiator: String,
    responder: String,
    state: String,
    body: String,
    seq: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<DbRow> for RecordRow {
    fn from(row: DbRow) -> Self {
        RecordRow {
            pair: PairKey::new(row.initiator, row.responder),
            state: row.state,
            body: row.body,
            seq: row.seq,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl SqliteStore {
    /// Open (or create) the database at `db_path` and run pending migrations.
    ///
    /// WAL journal mode is configured at connection time, not inside a
    /// migration — SQLite forbids changing `journal_mode` inside a
    /// transaction and sqlx wraps every migration in one.
    pub async fn open(db_path: &Path) -> Result<Self, StoreError> {
        let opts = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePool::connect_with(opts).await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StoreError::Migration(e.to_string()))?;

        Ok(Self { pool })
    }

    async fn fetch(
        &self,
        space: RecordSpace,
        pair: &PairKey,
    ) -> Result<Option<RecordRow>, StoreError> {
        let row: Option<DbRow> = sqlx::query_as(
            "SELECT initiator, responder, state, body, rowid AS seq, created_at, updated_at \
             FROM records WHERE space = ? AND initiator = ? AND responder = ?",
        )
        .bind(space.as_str())
        .bind(&pair.initiator)
        .bind(&pair.responder)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(RecordRow::from))
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn get(
        &self,
        space: RecordSpace,
        pair: &PairKey,
    ) -> Result<Option<RecordRow>, StoreError> {
        self.fetch(space, pair).await
    }

    async fn insert_new(
        &self,
        space: RecordSpace,
        pair: &PairKey,
        state: &str,
        body: &str,
    ) -> Result<RecordRow, StoreError> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO records (space, initiator, responder, state, body, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT (space, initiator, responder) DO NOTHING",
        )
        .bind(space.as_str())
        .bind(&pair.initiator)
        .bind(&pair.responder)
        .bind(state)
        .bind(body)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            // Lost to an existing row; report its state for the Conflict path.
            let existing = self.fetch(space, pair).await?.ok_or(StoreError::NotFound)?;
            return Err(StoreError::Exists {
                state: existing.state,
            });
        }

        Ok(RecordRow {
            pair: pair.clone(),
            state: state.to_string(),
            body: body.to_string(),
            seq: result.last_insert_rowid(),
            created_at: now,
            updated_at: now,
        })
    }

    async fn compare_and_swap(
        &self,
        space: RecordSpace,
        pair: &PairKey,
        expected_state: &str,
        new_state: &str,
        body: &str,
    ) -> Result<RecordRow, StoreError> {
        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE records SET state = ?, body = ?, updated_at = ? \
             WHERE space = ? AND initiator = ? AND responder = ? AND state = ?",
        )
        .bind(new_state)
        .bind(body)
        .bind(now)
        .bind(space.as_str())
        .bind(&pair.initiator)
        .bind(&pair.responder)
        .bind(expected_state)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            return self.fetch(space, pair).await?.ok_or(StoreError::NotFound);
        }

        match self.fetch(space, pair).await? {
            None => Err(StoreError::NotFound),
            Some(row) => Err(StoreError::StateMismatch {
                expected: expected_state.to_string(),
                found: row.state,
            }),
        }
    }

    async fn scan(&self, space: RecordSpace) -> Result<Vec<RecordRow>, StoreError> {
        let rows: Vec<DbRow> = sqlx::query_as(
            "SELECT initiator, responder, state, body, rowid AS seq, created_at, updated_at \
             FROM records WHERE space = ? ORDER BY rowid",
        )
        .bind(space.as_str())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(RecordRow::from).collect())
    }

    async fn remove(&self, space: RecordSpace, pair: &PairKey) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "DELETE FROM records WHERE space = ? AND initiator = ? AND responder = ?",
        )
        .bind(space.as_str())
        .bind(&pair.initiator)
        .bind(&pair.responder)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use uuid::Uuid;

    use super::*;

    async fn open_temp() -> (SqliteStore, PathBuf) {
        let db_path = PathBuf::from(format!("/tmp/kb-store-test-{}.db", Uuid::new_v4()));
        let store = SqliteStore::open(&db_path).await.expect("open store");
        (store, db_path)
    }

    fn cleanup(db_path: &Path) {
        let _ = std::fs::remove_file(db_path);
        let _ = std::fs::remove_file(db_path.with_extension("db-wal"));
        let _ = std::fs::remove_file(db_path.with_extension("db-shm"));
    }

    #[tokio::test]
    async fn insert_cas_and_scan_roundtrip() {
        let (store, db_path) = open_temp().await;
        let pair = PairKey::new("alice", "bob");

        store
            .insert_new(RecordSpace::Exchanges, &pair, "init", r#"{"n":1}"#)
            .await
            .expect("insert");

        let err = store
            .insert_new(RecordSpace::Exchanges, &pair, "init", "{}")
            .await
            .expect_err("duplicate insert");
        assert!(matches!(err, StoreError::Exists { state } if state == "init"));

        let row = store
            .compare_and_swap(RecordSpace::Exchanges, &pair, "init", "paired", r#"{"n":2}"#)
            .await
            .expect("cas");
        assert_eq!(row.state, "paired");
        assert_eq!(row.body, r#"{"n":2}"#);

        let err = store
            .compare_and_swap(RecordSpace::Exchanges, &pair, "init", "paired", "{}")
            .await
            .expect_err("stale cas");
        assert!(matches!(
            err,
            StoreError::StateMismatch { found, .. } if found == "paired"
        ));

        let rows = store.scan(RecordSpace::Exchanges).await.expect("scan");
        assert_eq!(rows.len(), 1);
        // Failed CAS must not have clobbered the committed body.
        assert_eq!(rows[0].body, r#"{"n":2}"#);

        cleanup(&db_path);
    }

    #[tokio::test]
    async fn scan_orders_by_insertion() {
        let (store, db_path) = open_temp().await;
        for n in 0..4 {
            let pair = PairKey::new(format!("init-{n}"), format!("resp-{n}"));
            store
                .insert_new(RecordSpace::Conversations, &pair, "pending", "{}")
                .await
                .expect("insert");
        }
        let rows = store.scan(RecordSpace::Conversations).await.expect("scan");
        let initiators: Vec<&str> = rows.iter().map(|r| r.pair.initiator.as_str()).collect();
        assert_eq!(initiators, vec!["init-0", "init-1", "init-2", "init-3"]);
        cleanup(&db_path);
    }

    #[tokio::test]
    async fn remove_deletes_the_row() {
        let (store, db_path) = open_temp().await;
        let pair = PairKey::new("alice", "bob");
        store
            .insert_new(RecordSpace::Conversations, &pair, "pending", "{}")
            .await
            .expect("insert");
        assert!(store
            .remove(RecordSpace::Conversations, &pair)
            .await
            .expect("remove"));
        assert!(store
            .get(RecordSpace::Conversations, &pair)
            .await
            .expect("get")
            .is_none());
        cleanup(&db_path);
    }
}
