use crate::config::Config;
use crate::error::BotError;
use crate::script::{Scene, Script};
use reqwest::Client;
use serde_json::json;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};

const RESPONSES_URL: &str = "https://api.openai.com/v1/responses";
const IMAGES_URL: &str = "https://api.openai.com/v1/images/generations";

const SCRIPT_MODEL: &str = "gpt-4o-mini";
const IMAGE_MODEL: &str = "dall-e-3";

// DALL-E's vertical resolution; the assembler rescales to 1080x1920.
const IMAGE_SIZE: &str = "1024x1792";
const STYLE_SUFFIX: &str = ", cinematic, 8k, vertical";

const SYSTEM_PROMPT: &str = "You are a YouTube Shorts scriptwriter. Reply with a single JSON object, no markdown fences, shaped exactly as: {\"title\": string, \"voiceover\": string, \"shots\": [{\"img_prompt\": string, \"duration\": integer_seconds}, ...]}. Keep the total runtime under 55 seconds and use at most 6 shots. Write in plain, energetic English.";

fn extract_output_text(resp_json: &str) -> Option<String> {
    let root: serde_json::Value = serde_json::from_str(resp_json).ok()?;

    if let Some(err) = root.get("error") {
        if let Some(msg) = err.get("message").and_then(|v| v.as_str()) {
            warn!("OpenAI error message: {}", msg);
        }
        return None;
    }

    let output = root.get("output")?.as_array()?;
    for item in output {
        let content = item.get("content").and_then(|v| v.as_array());
        if let Some(content) = content {
            for entry in content {
                let typ = entry.get("type").and_then(|v| v.as_str());
                let text = entry.get("text").and_then(|v| v.as_str());
                if typ == Some("output_text") {
                    if let Some(text) = text {
                        return Some(text.to_string());
                    }
                }
            }
        }
    }

    None
}

/// Asks the model for a structured script on `topic`. JSON-shape, language,
/// shot-count and runtime constraints all live in the system prompt; the
/// response is then parsed and validated by [`Script::from_json`].
pub async fn generate_script(client: &Client, cfg: &Config, topic: &str) -> Result<Script, BotError> {
    let body = json!({
        "model": SCRIPT_MODEL,
        "input": [
            {"role": "system", "content": SYSTEM_PROMPT},
            {"role": "user", "content": format!("Topic: {}", topic)},
        ],
        "text": {"format": {"type": "json_object"}},
    });

    let resp = client
        .post(RESPONSES_URL)
        .bearer_auth(&cfg.openai_key)
        .json(&body)
        .timeout(std::time::Duration::from_secs(300))
        .send()
        .await
        .map_err(|e| BotError::Generation(format!("OpenAI request failed: {}", e)))?;

    let status = resp.status();
    let raw = resp.text().await.unwrap_or_default();

    if !status.is_success() {
        let snippet = raw.chars().take(800).collect::<String>();
        return Err(BotError::Generation(format!(
            "OpenAI HTTP {}: {}",
            status.as_u16(),
            snippet
        )));
    }

    let out_text = extract_output_text(&raw)
        .ok_or_else(|| BotError::Generation("OpenAI response had no output text".into()))?;

    let script = Script::from_json(&out_text)?;
    info!(
        "Script received: \"{}\" ({} shots, {}s planned)",
        script.title,
        script.shots.len(),
        script.total_duration()
    );
    Ok(script)
}

/// Generates one vertical image per shot, in shot order, and downloads each
/// into `dir`. Sequential, one request per shot; any failure aborts the run.
pub async fn generate_images(
    client: &Client,
    cfg: &Config,
    shots: &[Scene],
    dir: &Path,
) -> Result<Vec<PathBuf>, BotError> {
    let mut images = Vec::with_capacity(shots.len());

    for (i, shot) in shots.iter().enumerate() {
        let prompt = format!("{}{}", shot.img_prompt, STYLE_SUFFIX);
        info!("Generating image {}/{}", i + 1, shots.len());

        let body = json!({
            "model": IMAGE_MODEL,
            "prompt": prompt,
            "n": 1,
            "size": IMAGE_SIZE,
        });

        let resp = client
            .post(IMAGES_URL)
            .bearer_auth(&cfg.openai_key)
            .json(&body)
            .timeout(std::time::Duration::from_secs(300))
            .send()
            .await
            .map_err(|e| BotError::Asset(format!("image request {} failed: {}", i + 1, e)))?;

        let status = resp.status();
        let raw = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            let snippet = raw.chars().take(400).collect::<String>();
            return Err(BotError::Asset(format!(
                "image request {} HTTP {}: {}",
                i + 1,
                status.as_u16(),
                snippet
            )));
        }

        let url = image_url_from_response(&raw)
            .ok_or_else(|| BotError::Asset(format!("image response {} had no url", i + 1)))?;

        let bytes = client
            .get(&url)
            .timeout(std::time::Duration::from_secs(120))
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| BotError::Asset(format!("image download {} failed: {}", i + 1, e)))?
            .bytes()
            .await
            .map_err(|e| BotError::Asset(format!("image download {} failed: {}", i + 1, e)))?;

        let path = dir.join(format!("scene_{}.png", i + 1));
        fs::write(&path, &bytes).await?;
        images.push(path);
    }

    Ok(images)
}

fn image_url_from_response(raw: &str) -> Option<String> {
    let root: serde_json::Value = serde_json::from_str(raw).ok()?;
    root.get("data")?
        .as_array()?
        .first()?
        .get("url")?
        .as_str()
        .map(str::to_string)
}
