use crate::config::Config;
use crate::error::BotError;
use reqwest::Client;
use std::path::Path;
use tokio::fs;

/// Synthesizes the whole voiceover as one MP3 narration track with the
/// configured voice profile.
pub async fn synthesize_narration(
    client: &Client,
    cfg: &Config,
    text: &str,
    out_mp3_path: &Path,
) -> Result<(), BotError> {
    let url = format!(
        "https://api.elevenlabs.io/v1/text-to-speech/{}?output_format=mp3_44100_128",
        cfg.eleven_voice_id
    );

    let body = serde_json::json!({
        "text": text,
        "model_id": cfg.eleven_model_id,
    });

    let resp = client
        .post(url)
        .header("Content-Type", "application/json")
        .header("xi-api-key", &cfg.elevenlabs_key)
        .json(&body)
        .timeout(std::time::Duration::from_secs(300))
        .send()
        .await
        .map_err(|e| BotError::Asset(format!("ElevenLabs request failed: {}", e)))?;

    if !resp.status().is_success() {
        return Err(BotError::Asset(format!(
            "ElevenLabs TTS failed HTTP {}",
            resp.status().as_u16()
        )));
    }

    let bytes = resp
        .bytes()
        .await
        .map_err(|e| BotError::Asset(format!("ElevenLabs response read failed: {}", e)))?;

    if let Some(parent) = out_mp3_path.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(out_mp3_path, &bytes).await?;

    Ok(())
}
