use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use sekretar_models::{
    core::{ActionFilter, ScheduledAction},
    errors::{RuntimeError, SendableError},
};
use sqlx::{
    ConnectOptions, Executor, PgPool, Row,
    postgres::{PgConnectOptions, PgPoolOptions, PgRow},
};

use crate::interfaces::ActionStoreImpl;

const POSTGRES_TABLE_INIT_SQL: &str = "CREATE TABLE IF NOT EXISTS scheduled_actions (
    id BIGSERIAL PRIMARY KEY,
    user_id BIGINT NULL,
    time BIGINT NOT NULL,
    done BOOLEAN NOT NULL DEFAULT FALSE,
    kind TEXT NOT NULL,
    args TEXT NOT NULL,
    attempts BIGINT NOT NULL DEFAULT 0
)";

pub struct PostgresStore {
    pub pool: PgPool,
}

impl PostgresStore {
    pub async fn new(connection_str: &str) -> Result<Self, SendableError> {
        let mut options = PgConnectOptions::from_str(connection_str)?;
        options.log_statements(log::LevelFilter::Debug);
        options.log_slow_statements(log::LevelFilter::Warn, Duration::seconds(1).to_std()?);

        let pool = PgPoolOptions::new().connect_with(options).await?;
        Ok(Self { pool })
    }
}

fn map_action_row(row: PgRow) -> Result<ScheduledAction, SendableError> {
    let id: i64 = row.get("id");
    let timestamp: i64 = row.get("time");
    let time = DateTime::from_timestamp(timestamp, 0).ok_or_else(|| {
        RuntimeError::new(
            "store.postgres.bad_timestamp",
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

impl ActionStoreImpl for PostgresStore {
    async fn init_schema(&self) -> Result<(), SendableError> {
        self.pool.execute(POSTGRES_TABLE_INIT_SQL).await?;
        Ok(())
    }

    async fn insert_action(
        &self,
        user_id: Option<i64>,
        time: DateTime<Utc>,
        kind: &str,
        args: &serde_json::Value,
    ) -> Result<i64, SendableError> {
        let row = sqlx::query(
            "INSERT INTO scheduled_actions (user_id, time, done, kind, args, attempts)
             VALUES ($1, $2, FALSE, $3, $4, 0)
             RETURNING id",
        )
        .bind(user_id)
        .bind(time.timestamp())
        .bind(kind)
        .bind(args.to_string())
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get("id"))
    }

    async fn get_action(&self, action_id: i64) -> Result<Option<ScheduledAction>, SendableError> {
        let row = sqlx::query(
            "SELECT id, user_id, time, done, kind, args, attempts
             FROM scheduled_actions WHERE id = $1",
        )
        .bind(action_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(map_action_row).transpose()
    }

    async fn mark_done(&self, action_id: i64) -> Result<(), SendableError> {
        self.pool
            .execute(
                sqlx::query("UPDATE scheduled_actions SET done = TRUE WHERE id = $1")
                    .bind(action_id),
            )
            .await?;
        Ok(())
    }

    async fn record_attempt(&self, action_id: i64) -> Result<i64, SendableError> {
        let row = sqlx::query(
            "UPDATE scheduled_actions SET attempts = attempts + 1 WHERE id = $1
             RETURNING attempts",
        )
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
             FROM scheduled_actions WHERE done = FALSE",
        );
        let kind_param = if filter.user_id.is_some() {
            sql.push_str(" AND user_id = $1");
            2
        } else {
            1
        };
        if let Some(kinds) = &filter.kinds {
            if kinds.is_empty() {
                return Ok(Vec::new());
            }
            sql.push_str(&format!(" AND kind = ANY(${kind_param})"));
        }

        let mut query = sqlx::query(&sql);
        if let Some(user_id) = filter.user_id {
            query = query.bind(user_id);
        }
        if let Some(kinds) = &filter.kinds {
            query = query.bind(kinds);
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.into_iter().map(map_action_row).collect()
    }
}
