use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};
use vigil_core::config::{SessionConfig, StoreConfig};
use vigil_core::history::error::HistoryError;
use vigil_core::history::port::{PacketHistory, StoredPacket};
use vigil_core::packet::entity::PacketType;
use vigil_core::store::error::StoreError;
use vigil_core::store::port::PacketJournal;
use vigil_core::transport::error::TransportError;
use vigil_core::transport::port::{ChangeDocument, Inbound, Transport};

const DEFAULT_DATABASE: &str = "vigil";
const DEFAULT_COLLECTION: &str = "packets";

/// SQLite implementation of the packet journal.
///
/// # Summary
/// One table per collection inside `{database}.db` under the store root. The same
/// journal serves as packet history for catch-up loads and as a change-feed transport.
///
/// # Invariants
/// * The table is created when the journal is opened.
/// * Database and collection names are plain identifiers, so they are safe to splice into SQL.
pub struct SqlitePacketJournal {
    pool: SqlitePool,
    table: String,
    poll_interval: Duration,
}

impl SqlitePacketJournal {
    /// Opens the journal named by the session's database/collection pair under the
    /// configured root directory.
    pub async fn from_config(session: &SessionConfig, store: &StoreConfig) -> Result<Self, StoreError> {
        let root = crate::config::get_root_dir();
        Self::open_in(
            &root,
            session.database.as_deref().unwrap_or(DEFAULT_DATABASE),
            session.collection.as_deref().unwrap_or(DEFAULT_COLLECTION),
            Duration::from_millis(store.poll_interval_ms),
        )
        .await
    }

    /// # Summary
    /// Opens (creating if missing) a journal in an explicit directory.
    ///
    /// # Logic
    /// 1. Validates both names.
    /// 2. Ensures the directory exists and connects with `create_if_missing`.
    /// 3. Creates the collection table and its type index.
    ///
    /// # Arguments
    /// * `root` - directory holding the database file.
    /// * `database` - file stem of the database.
    /// * `collection` - table name.
    /// * `poll_interval` - change-feed polling period.
    pub async fn open_in(
        root: &Path,
        database: &str,
        collection: &str,
        poll_interval: Duration,
    ) -> Result<Self, StoreError> {
        check_identifier(database)?;
        check_identifier(collection)?;
        fs::create_dir_all(root).map_err(|e| StoreError::InitError(e.to_string()))?;

        let options = SqliteConnectOptions::new()
            .filename(root.join(format!("{}.db", database)))
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                type TEXT NOT NULL,
                message TEXT NOT NULL,
                created_at DATETIME NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_{table}_type ON {table} (type, id);
            "#,
            table = collection
        ))
        .execute(&pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        info!(database, collection, "Packet journal opened");
        Ok(Self {
            pool,
            table: collection.to_string(),
            poll_interval: poll_interval.max(Duration::from_millis(1)),
        })
    }

    async fn newest_id(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(&format!("SELECT COALESCE(MAX(id), 0) FROM {}", self.table))
            .fetch_one(&self.pool)
            .await
    }
}

fn check_identifier(name: &str) -> Result<(), StoreError> {
    let mut chars = name.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidName(name.to_string()))
    }
}

fn stored(row: (String, String)) -> Result<StoredPacket, HistoryError> {
    let packet_type = PacketType::from_str(&row.0).map_err(HistoryError::Backend)?;
    Ok(StoredPacket {
        packet_type,
        message: row.1,
    })
}

#[async_trait]
impl PacketJournal for SqlitePacketJournal {
    async fn append(&self, packet_type: PacketType, message: &str) -> Result<i64, StoreError> {
        let result = sqlx::query(&format!(
            "INSERT INTO {} (type, message, created_at) VALUES (?, ?, ?)",
            self.table
        ))
        .bind(packet_type.name())
        .bind(message)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(result.last_insert_rowid())
    }
}

#[async_trait]
impl PacketHistory for SqlitePacketJournal {
    async fn latest(&self, packet_type: PacketType) -> Result<Option<StoredPacket>, HistoryError> {
        sqlx::query_as::<_, (String, String)>(&format!(
            "SELECT type, message FROM {} WHERE type = ? ORDER BY id DESC LIMIT 1",
            self.table
        ))
        .bind(packet_type.name())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| HistoryError::Backend(e.to_string()))?
        .map(stored)
        .transpose()
    }

    async fn recent(&self, packet_type: PacketType, limit: usize) -> Result<Vec<StoredPacket>, HistoryError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        sqlx::query_as::<_, (String, String)>(&format!(
            "SELECT type, message FROM {} WHERE type = ? ORDER BY id DESC LIMIT ?",
            self.table
        ))
        .bind(packet_type.name())
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| HistoryError::Backend(e.to_string()))?
        .into_iter()
        .map(stored)
        .collect()
    }
}

#[async_trait]
impl Transport for SqlitePacketJournal {
    fn name(&self) -> String {
        format!("sqlite journal '{}'", self.table)
    }

    /// # Summary
    /// Opens a change feed over rows appended after this call.
    ///
    /// # Logic
    /// 1. Records the newest row id present now.
    /// 2. Every poll interval, emits newer rows in id order and advances the cursor.
    /// 3. A failed poll ends the feed with a connection error.
    async fn open(&self) -> Result<Inbound, TransportError> {
        let start = self
            .newest_id()
            .await
            .map_err(|e| TransportError::Connection(e.to_string()))?;
        debug!(table = %self.table, start, "Change feed opened");

        let pool = self.pool.clone();
        let select = format!(
            "SELECT id, type, message FROM {} WHERE id > ? ORDER BY id",
            self.table
        );
        let period = self.poll_interval;
        let stream = async_stream::stream! {
            let mut cursor = start;
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                let rows = sqlx::query_as::<_, (i64, String, String)>(&select)
                    .bind(cursor)
                    .fetch_all(&pool)
                    .await;
                match rows {
                    Ok(rows) => {
                        for (id, packet_type, message) in rows {
                            cursor = id;
                            yield Ok(ChangeDocument { packet_type, message });
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "Change feed poll failed");
                        yield Err(TransportError::Connection(e.to_string()));
                        break;
                    }
                }
            }
        };
        Ok(Inbound::Changes(Box::pin(stream)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers() {
        assert!(check_identifier("packets").is_ok());
        assert!(check_identifier("_live_2024").is_ok());
        assert!(check_identifier("").is_err());
        assert!(check_identifier("2024").is_err());
        assert!(check_identifier("packets; DROP TABLE x").is_err());
    }
}
