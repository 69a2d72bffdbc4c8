use crate::error::BotError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub time: DateTime<Utc>,
    pub topic: String,
    pub video_id: String,
}

/// Writes the run record to `dir/YYYY-MM-DD.json`. One file per calendar
/// day; a later run the same day overwrites the earlier one.
pub async fn record_run(
    dir: &Path,
    topic: &str,
    video_id: &str,
    time: DateTime<Utc>,
) -> Result<PathBuf, BotError> {
    fs::create_dir_all(dir).await?;

    let record = RunRecord {
        time,
        topic: topic.to_string(),
        video_id: video_id.to_string(),
    };
    let path = dir.join(format!("{}.json", time.format("%Y-%m-%d")));
    let body = serde_json::to_string_pretty(&record)
        .map_err(|e| BotError::Format(format!("run record serialize failed: {}", e)))?;
    fs::write(&path, body).await?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[tokio::test]
    async fn writes_one_file_per_day() {
        let dir = tempfile::tempdir().unwrap();
        let time = Utc.with_ymd_and_hms(2025, 6, 1, 12, 30, 0).unwrap();

        let path = record_run(dir.path(), "T1", "v1", time).await.unwrap();
        assert_eq!(path.file_name().unwrap(), "2025-06-01.json");

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        let record: RunRecord = serde_json::from_str(&content).unwrap();
        assert_eq!(record.topic, "T1");
        assert_eq!(record.video_id, "v1");
        assert_eq!(record.time, time);
    }

    #[tokio::test]
    async fn later_run_overwrites_same_day() {
        let dir = tempfile::tempdir().unwrap();
        let morning = Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap();
        let evening = Utc.with_ymd_and_hms(2025, 6, 1, 20, 0, 0).unwrap();

        let first = record_run(dir.path(), "T1", "v1", morning).await.unwrap();
        let second = record_run(dir.path(), "T2", "v2", evening).await.unwrap();
        assert_eq!(first, second);

        let content = tokio::fs::read_to_string(&second).await.unwrap();
        let record: RunRecord = serde_json::from_str(&content).unwrap();
        assert_eq!(record.topic, "T2");
        assert_eq!(record.video_id, "v2");
    }
}
