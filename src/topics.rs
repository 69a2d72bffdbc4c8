use crate::error::BotError;
use rand::seq::SliceRandom;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{ConnectOptions, Connection, SqliteConnection};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

pub const TOPIC_CATALOG: &[&str] = &[
    "How to replace a USB port on a smartphone",
    "Diagnosing a short circuit on a laptop board",
    "Rescuing an SSD after reverse polarity",
    "Why capacitors bulge and how to pick replacements",
    "Reballing BGA chips at home",
];

/// Seen-set of published topics, backed by a single-table SQLite file.
/// Each call opens and closes its own connection; no transaction spans
/// the pipeline run.
pub struct TopicStore {
    db_path: PathBuf,
}

impl TopicStore {
    pub fn open<P: AsRef<Path>>(db_path: P) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
        }
    }

    async fn connect(&self) -> Result<SqliteConnection, BotError> {
        let mut conn = SqliteConnectOptions::new()
            .filename(&self.db_path)
            .create_if_missing(true)
            .connect()
            .await?;
        sqlx::query("CREATE TABLE IF NOT EXISTS log(topic TEXT PRIMARY KEY, result TEXT)")
            .execute(&mut conn)
            .await?;
        Ok(conn)
    }

    /// Picks an unused topic uniformly at random. Once the catalog is
    /// exhausted, uniqueness is abandoned and any topic may repeat.
    pub async fn select_topic(&self, catalog: &[&str]) -> Result<String, BotError> {
        let seen = self.seen_topics().await?;
        let unused: Vec<&str> = catalog
            .iter()
            .copied()
            .filter(|t| !seen.contains(*t))
            .collect();

        let mut rng = rand::thread_rng();
        let pick = if unused.is_empty() {
            catalog.choose(&mut rng).copied()
        } else {
            unused.choose(&mut rng).copied()
        };

        pick.map(str::to_string)
            .ok_or_else(|| BotError::Config("topic catalog is empty".into()))
    }

    /// Records a topic as used. Re-inserting an already-present topic is a
    /// silent no-op.
    pub async fn mark_used(&self, topic: &str, result_id: &str) -> Result<(), BotError> {
        let mut conn = self.connect().await?;
        sqlx::query("INSERT OR IGNORE INTO log(topic, result) VALUES (?1, ?2)")
            .bind(topic)
            .bind(result_id)
            .execute(&mut conn)
            .await?;
        conn.close().await?;
        Ok(())
    }

    pub(crate) async fn seen_topics(&self) -> Result<HashSet<String>, BotError> {
        let mut conn = self.connect().await?;
        let rows: Vec<String> = sqlx::query_scalar("SELECT topic FROM log")
            .fetch_all(&mut conn)
            .await?;
        conn.close().await?;
        Ok(rows.into_iter().collect())
    }
}
