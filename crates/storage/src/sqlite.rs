//! SQLite implementation of EventStore
//!
//! Production persistence using a SQLite file with:
//! - WAL journaling so the CLI can read while the notifier writes
//! - A busy timeout instead of immediate `SQLITE_BUSY` failures
//! - Embedded migrations applied on connect

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ctfnotify_core::{EventRecord, NewEvent, NotificationFlags, NotificationKind, OwnerId};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use tracing::{debug, error, info, instrument, warn};

use crate::store::{EventStore, StoreError};

/// Default database location, relative to the working directory
pub const DEFAULT_DATABASE_URL: &str = "sqlite:data/ctf_data.db?mode=rwc";

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_CONNECTIONS: u32 = 4;

const SELECT_COLUMNS: &str = r#"
    SELECT user_id, event_name, ctftime_url, event_url, start_time_ms, end_time_ms,
           format, organizers, weight, description, participants,
           reminder_sent, good_luck_sent, ending_soon_sent, congratulations_sent
    FROM user_events
"#;

/// SQLite implementation of EventStore
///
/// # Example
///
/// ```ignore
/// use ctfnotify_storage::SqliteEventStore;
///
/// let store = SqliteEventStore::connect("sqlite:data/ctf_data.db?mode=rwc").await?;
/// ```
#[derive(Clone)]
pub struct SqliteEventStore {
    pool: SqlitePool,
}

impl SqliteEventStore {
    /// Wrap an existing pool; the schema must already be migrated
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if missing) the database at `database_url` and migrate it
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(unavailable)?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(BUSY_TIMEOUT)
            .create_if_missing(true);

        if let Some(parent) = options.get_filename().parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| StoreError::Unavailable(e.to_string()))?;
            }
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(Duration::from_secs(30))
            .connect_with(options)
            .await
            .map_err(unavailable)?;

        let store = Self::new(pool);
        store.migrate().await?;

        info!(database_url, "event store ready");
        Ok(store)
    }

    /// A private in-memory database, mainly for tests
    ///
    /// Uses a single connection that never expires, since every new
    /// connection to `sqlite::memory:` would see an empty database.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:").map_err(unavailable)?;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(unavailable)?;

        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to run migrations: {}", e);
                StoreError::Unavailable(e.to_string())
            })
    }
}

fn unavailable(e: sqlx::Error) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

fn flag_column(kind: NotificationKind) -> &'static str {
    match kind {
        NotificationKind::Reminder => "reminder_sent",
        NotificationKind::GoodLuck => "good_luck_sent",
        NotificationKind::EndingSoon => "ending_soon_sent",
        NotificationKind::Congratulations => "congratulations_sent",
    }
}

/// Owner ids are unsigned snowflakes; SQLite integers are signed 64-bit
fn owner_to_db(owner_id: OwnerId) -> i64 {
    owner_id as i64
}

#[derive(Debug, sqlx::FromRow)]
struct EventRow {
    user_id: i64,
    event_name: String,
    ctftime_url: Option<String>,
    event_url: Option<String>,
    start_time_ms: i64,
    end_time_ms: i64,
    format: Option<String>,
    organizers: Option<String>,
    weight: Option<f64>,
    description: Option<String>,
    participants: Option<i64>,
    reminder_sent: bool,
    good_luck_sent: bool,
    ending_soon_sent: bool,
    congratulations_sent: bool,
}

impl TryFrom<EventRow> for EventRecord {
    type Error = StoreError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        let timestamp = |ms: i64, column: &str| {
            DateTime::<Utc>::from_timestamp_millis(ms).ok_or_else(|| {
                StoreError::Corrupt(format!(
                    "{} of '{}' is out of range: {}",
                    column, row.event_name, ms
                ))
            })
        };
        let start_time = timestamp(row.start_time_ms, "start_time")?;
        let end_time = timestamp(row.end_time_ms, "end_time")?;
        if start_time >= end_time {
            return Err(StoreError::Corrupt(format!(
                "'{}' starts at {} but ends at {}",
                row.event_name, start_time, end_time
            )));
        }

        Ok(EventRecord {
            owner_id: row.user_id as OwnerId,
            name: row.event_name,
            source_url: row.ctftime_url,
            site_url: row.event_url,
            start_time,
            end_time,
            format: row.format,
            organizers: row.organizers,
            weight: row.weight,
            description: row.description,
            participant_count: row.participants,
            flags: NotificationFlags {
                reminder: row.reminder_sent,
                good_luck: row.good_luck_sent,
                ending_soon: row.ending_soon_sent,
                congratulations: row.congratulations_sent,
            },
        })
    }
}

/// Convert rows, dropping the ones that cannot be read
fn records_from_rows(rows: Vec<EventRow>) -> Vec<EventRecord> {
    rows.into_iter()
        .filter_map(|row| match EventRecord::try_from(row) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(error = %e, "skipping unreadable event row");
                None
            }
        })
        .collect()
}

#[async_trait]
impl EventStore for SqliteEventStore {
    #[instrument(skip(self, event), fields(name = %event.name))]
    async fn insert_event(
        &self,
        owner_id: OwnerId,
        event: NewEvent,
    ) -> Result<EventRecord, StoreError> {
        let record = event.validate()?.into_record(owner_id);

        let result = sqlx::query(
            r#"
            INSERT INTO user_events (
                user_id, event_name, ctftime_url, event_url, start_time_ms, end_time_ms,
                format, organizers, weight, description, participants
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(owner_to_db(owner_id))
        .bind(&record.name)
        .bind(&record.source_url)
        .bind(&record.site_url)
        .bind(record.start_time.timestamp_millis())
        .bind(record.end_time.timestamp_millis())
        .bind(&record.format)
        .bind(&record.organizers)
        .bind(record.weight)
        .bind(&record.description)
        .bind(record.participant_count)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => {
                debug!(owner_id, "inserted event");
                Ok(record)
            }
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(StoreError::DuplicateKey {
                    owner_id,
                    name: record.name,
                })
            }
            Err(e) => {
                error!("Failed to insert event: {}", e);
                Err(unavailable(e))
            }
        }
    }

    #[instrument(skip(self))]
    async fn get_event(
        &self,
        owner_id: OwnerId,
        name: &str,
    ) -> Result<Option<EventRecord>, StoreError> {
        let row: Option<EventRow> =
            sqlx::query_as(&format!("{SELECT_COLUMNS} WHERE user_id = ? AND event_name = ?"))
                .bind(owner_to_db(owner_id))
                .bind(name)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    error!("Failed to get event: {}", e);
                    unavailable(e)
                })?;

        row.map(EventRecord::try_from).transpose()
    }

    #[instrument(skip(self))]
    async fn list_events_for_owner(&self, owner_id: OwnerId) -> Result<Vec<EventRecord>, StoreError> {
        let rows: Vec<EventRow> = sqlx::query_as(&format!(
            "{SELECT_COLUMNS} WHERE user_id = ? ORDER BY start_time_ms, event_name"
        ))
        .bind(owner_to_db(owner_id))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to list events: {}", e);
            unavailable(e)
        })?;

        Ok(records_from_rows(rows))
    }

    #[instrument(skip(self))]
    async fn list_all_events(&self) -> Result<Vec<EventRecord>, StoreError> {
        let rows: Vec<EventRow> = sqlx::query_as(&format!(
            "{SELECT_COLUMNS} ORDER BY user_id, start_time_ms, event_name"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to list all events: {}", e);
            unavailable(e)
        })?;

        Ok(records_from_rows(rows))
    }

    #[instrument(skip(self))]
    async fn delete_event(&self, owner_id: OwnerId, name: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM user_events WHERE user_id = ? AND event_name = ?")
            .bind(owner_to_db(owner_id))
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to delete event: {}", e);
                unavailable(e)
            })?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn delete_events_for_owner(&self, owner_id: OwnerId) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM user_events WHERE user_id = ?")
            .bind(owner_to_db(owner_id))
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to clear events: {}", e);
                unavailable(e)
            })?;

        Ok(result.rows_affected())
    }

    #[instrument(skip(self))]
    async fn delete_events_ended_before(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM user_events WHERE end_time_ms < ?")
            .bind(cutoff.timestamp_millis())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to delete ended events: {}", e);
                unavailable(e)
            })?;

        Ok(result.rows_affected())
    }

    #[instrument(skip(self))]
    async fn set_flag(
        &self,
        owner_id: OwnerId,
        name: &str,
        kind: NotificationKind,
        value: bool,
    ) -> Result<bool, StoreError> {
        let sql = format!(
            "UPDATE user_events SET {} = ? WHERE user_id = ? AND event_name = ?",
            flag_column(kind)
        );
        let result = sqlx::query(&sql)
            .bind(value)
            .bind(owner_to_db(owner_id))
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to set notification flag: {}", e);
                unavailable(e)
            })?;

        Ok(result.rows_affected() > 0)
    }
}
