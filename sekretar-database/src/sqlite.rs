use chrono::{DateTime, Duration, Utc};
use sekretar_models::{
    core::{ActionFilter, ScheduledAction},
    errors::{RuntimeError, SendableError},
};
use sqlx::{
    ConnectOptions, Executor, Row, SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
};

use crate::interfaces::ActionStoreImpl;

const SQLITE_TABLE_INIT_SQL: &str = "CREATE TABLE IF NOT EXISTS scheduled_actions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NULL,
    time INTEGER NOT NULL,
    done INTEGER NOT NULL DEFAULT 0,
    kind TEXT NOT NULL,
    args TEXT NOT NULL,
    attempts INTEGER NOT NULL DEFAULT 0
)";

pub struct SqliteStore {
    pub pool: SqlitePool,
}

impl SqliteStore {
    pub async fn new(filename: &str) -> Result<Self, SendableError> {
        let mut options = SqliteConnectOptions::new()
            .filename(filename)
            .create_if_missing(true);
        let options_with_logs = options
            .log_statements(log::LevelFilter::Debug)
            .log_slow_statements(log::LevelFilter::Warn, Duration::seconds(1).to_std()?)
            .clone();
        let pool = SqlitePool::connect_with(options_with_logs).await?;
        Ok(SqliteStore { pool })
    }

    /// Single-connection in-memory store; a larger pool would hand every
    /// connection its own empty database.
    pub async fn in_memory() -> Result<Self, SendableError> {
        let options = SqliteConnectOptions::new().filename(":memory:");
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        Ok(SqliteStore { pool })
    }
}

fn map_action_row(row: SqliteRow) -> Result<ScheduledAction, SendableError> {
    let id: i64 = row.get("id");
    let timestamp: i64 = row.get("time");
    let time = DateTime::from_timestamp(timestamp, 0).ok_or_else(|| {
        RuntimeError::new(
            "store.sqlite.bad_timestamp",
            format!("Invalid timestamp {timestamp} for action {id}"),
        )
    })?;
    let raw_args: String = row.get("args");
    let args = serde_json::from_str(&raw_args)?;

    Ok(ScheduledAction {
        id,
        user_id: row.get("user_id"),
        time,
        done: row.get("done"),
        kind: row.get("kind"),
        args,
        attempts: row.get("attempts"),
    })
}

impl ActionStoreImpl for SqliteStore {
    async fn init_schema(&self) -> Result<(), SendableError> {
        self.pool.execute(SQLITE_TABLE_INIT_SQL).await?;
        Ok(())
    }

    async fn insert_action(
        &self,
        user_id: Option<i64>,
        time: DateTime<Utc>,
        kind: &str,
        args: &serde_json::Value,
    ) -> Result<i64, SendableError> {
        let result = self
            .pool
            .execute(
                sqlx::query(
                    "INSERT INTO scheduled_actions (user_id, time, done, kind, args, attempts)
                     VALUES (?, ?, 0, ?, ?, 0)",
                )
                .bind(user_id)
                .bind(time.timestamp())
                .bind(kind)
                .bind(args.to_string()),
            )
            .await?;
        Ok(result.last_insert_rowid())
    }

    async fn get_action(&self, action_id: i64) -> Result<Option<ScheduledAction>, SendableError> {
        let row = sqlx::query(
            "SELECT id, user_id, time, done, kind, args, attempts
             FROM scheduled_actions WHERE id = ?",
        )
        .bind(action_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(map_action_row).transpose()
    }

    async fn mark_done(&self, action_id: i64) -> Result<(), SendableError> {
        self.pool
            .execute(
                sqlx::query("UPDATE scheduled_actions SET done = 1 WHERE id = ?").bind(action_id),
            )
            .await?;
        Ok(())
    }

    async fn record_attempt(&self, action_id: i64) -> Result<i64, SendableError> {
        self.pool
            .execute(
                sqlx::query("UPDATE scheduled_actions SET attempts = attempts + 1 WHERE id = ?")
                    .bind(action_id),
            )
            .await?;
        let row = sqlx::query("SELECT attempts FROM scheduled_actions WHERE id = ?")
            .bind(action_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("attempts"))
    }

    async fn find_pending(
        &self,
        filter: &ActionFilter,
    ) -> Result<Vec<ScheduledAction>, SendableError> {
        let mut sql = String::from(
            "SELECT id, user_id, time, done, kind, args, attempts
             FROM scheduled_actions WHERE done = 0",
        );
        if filter.user_id.is_some() {
            sql.push_str(" AND user_id = ?");
        }
        if let Some(kinds) = &filter.kinds {
            if kinds.is_empty() {
                return Ok(Vec::new());
            }
            let placeholders = vec!["?"; kinds.len()].join(", ");
            sql.push_str(&format!(" AND kind IN ({placeholders})"));
        }

        let mut query = sqlx::query(&sql);
        if let Some(user_id) = filter.user_id {
            query = query.bind(user_id);
        }
        if let Some(kinds) = &filter.kinds {
            for kind in kinds {
                query = query.bind(kind);
            }
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.into_iter().map(map_action_row).collect()
    }
}
