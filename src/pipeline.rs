use crate::api::{elevenlabs, openai, youtube};
use crate::config::Config;
use crate::error::BotError;
use crate::topics::{TopicStore, TOPIC_CATALOG};
use crate::{history, video};
use chrono::Utc;
use std::path::Path;
use tracing::info;

/// Runs one pipeline iteration end to end and returns the uploaded video id.
/// Strictly sequential; the first stage error aborts the run. Temporary
/// assets live in a tempdir and are dropped with it.
pub async fn run_pipeline(cfg: &Config) -> Result<String, BotError> {
    let client = reqwest::Client::builder()
        .build()
        .map_err(|e| BotError::Config(format!("failed to build HTTP client: {}", e)))?;

    let started = Utc::now();
    let store = TopicStore::open(&cfg.db_path);

    let topic = store.select_topic(TOPIC_CATALOG).await?;
    info!("Topic: {}", topic);

    let script = openai::generate_script(&client, cfg, &topic).await?;

    let work = tempfile::tempdir()?;
    let images = openai::generate_images(&client, cfg, &script.shots, work.path()).await?;

    let narration = work.path().join("narration.mp3");
    info!("Synthesizing narration ({} chars)", script.voiceover.len());
    elevenlabs::synthesize_narration(&client, cfg, &script.voiceover, &narration).await?;

    let out_mp4 = work.path().join("short.mp4");
    info!("Building video -> {}", out_mp4.display());
    video::build_video(&images, &narration, &script, work.path(), &out_mp4).await?;

    let session = youtube::authenticate(&client, cfg).await?;
    let video_id = youtube::upload(&client, &session, &out_mp4, &script).await?;
    info!("Uploaded: https://youtube.com/watch?v={}", video_id);

    store.mark_used(&topic, &video_id).await?;
    history::record_run(Path::new(&cfg.history_dir), &topic, &video_id, started).await?;

    Ok(video_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::{Scene, Script};
    use crate::video;

    #[tokio::test]
    async fn failed_stage_leaves_no_run_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let store = TopicStore::open(dir.path().join("state.sqlite"));
        let history_dir = dir.path().join("history");
        let started = Utc::now();

        let script = Script {
            title: "X".into(),
            voiceover: "hello".into(),
            shots: vec![
                Scene {
                    img_prompt: "a".into(),
                    duration: 3,
                },
                Scene {
                    img_prompt: "b".into(),
                    duration: 2,
                },
            ],
        };

        // Same stage order as run_pipeline: assembly fails (one image for
        // two shots), so the `?` short-circuits before the topic is marked
        // used or the run recorded.
        let result: Result<String, BotError> = async {
            let images = vec![dir.path().join("scene_1.png")];
            let out_mp4 = dir.path().join("short.mp4");
            video::build_video(
                &images,
                &dir.path().join("narration.mp3"),
                &script,
                dir.path(),
                &out_mp4,
            )
            .await?;
            store.mark_used("T1", "v1").await?;
            history::record_run(&history_dir, "T1", "v1", started).await?;
            Ok("v1".to_string())
        }
        .await;

        assert!(matches!(result, Err(BotError::Encode(_))));
        assert!(store.seen_topics().await.unwrap().is_empty());
        assert!(!history_dir.exists());
        assert!(!dir.path().join("short.mp4").exists());
    }
}
