use crate::config::Config;
use crate::error::BotError;
use crate::platform;
use crate::script::Script;
use base64::Engine;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::path::Path;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tracing::{info, warn};
use url::Url;

const UPLOAD_SCOPE: &str = "https://www.googleapis.com/auth/youtube.upload";
const UPLOAD_URL: &str = "https://www.googleapis.com/upload/youtube/v3/videos";

const TITLE_SUFFIX: &str = " #shorts";
const DESCRIPTION: &str = "AI-generated electronics repair tip\n#shorts";
const TAGS: &[&str] = &["electronics", "repair", "AI", "shorts"];
const CATEGORY_TECH: &str = "28";

const CHUNK_BYTES: usize = 8 * 1024 * 1024;

// The interactive consent step blocks on a human in a browser.
const CONSENT_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Deserialize)]
pub struct InstalledSecret {
    pub client_id: String,
    pub client_secret: String,
    pub auth_uri: String,
    pub token_uri: String,
}

#[derive(Debug, Deserialize)]
struct ClientSecretFile {
    installed: InstalledSecret,
}

pub struct Session {
    pub access_token: String,
}

/// Resolves the configured credential source (`file://path`, `base64://blob`,
/// or a bare path) into the Google installed-app client secret.
pub async fn load_client_secret(source: &str) -> Result<InstalledSecret, BotError> {
    let raw = if let Some(blob) = source.strip_prefix("base64://") {
        base64::engine::general_purpose::STANDARD
            .decode(blob.trim())
            .map_err(|e| BotError::Auth(format!("client secret base64 decode failed: {}", e)))?
    } else {
        let path = source.strip_prefix("file://").unwrap_or(source);
        tokio::fs::read(path)
            .await
            .map_err(|e| BotError::Auth(format!("failed to read client secret {}: {}", path, e)))?
    };

    let parsed: ClientSecretFile = serde_json::from_slice(&raw)
        .map_err(|e| BotError::Auth(format!("client secret parse failed: {}", e)))?;
    Ok(parsed.installed)
}

/// Runs the installed-app OAuth code flow: binds a loopback listener, sends
/// the user to the consent page, waits (bounded) for the redirect, then
/// exchanges the code for an access token.
pub async fn authenticate(client: &Client, cfg: &Config) -> Result<Session, BotError> {
    let secret = load_client_secret(&cfg.client_secret).await?;

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let port = listener.local_addr()?.port();
    let redirect_uri = format!("http://127.0.0.1:{}", port);

    let auth_url = Url::parse_with_params(
        &secret.auth_uri,
        &[
            ("client_id", secret.client_id.as_str()),
            ("redirect_uri", redirect_uri.as_str()),
            ("response_type", "code"),
            ("scope", UPLOAD_SCOPE),
            ("access_type", "offline"),
        ],
    )
    .map_err(|e| BotError::Auth(format!("bad auth_uri: {}", e)))?;

    info!("Waiting for authorization at {}", auth_url);
    platform::open_url(auth_url.as_str());

    let code = tokio::time::timeout(CONSENT_TIMEOUT, wait_for_code(&listener))
        .await
        .map_err(|_| BotError::Auth("authorization timed out".into()))??;

    let resp = client
        .post(&secret.token_uri)
        .form(&[
            ("code", code.as_str()),
            ("client_id", secret.client_id.as_str()),
            ("client_secret", secret.client_secret.as_str()),
            ("redirect_uri", redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ])
        .timeout(Duration::from_secs(30))
        .send()
        .await
        .map_err(|e| BotError::Auth(format!("token exchange failed: {}", e)))?;

    let status = resp.status();
    let raw = resp.text().await.unwrap_or_default();
    if !status.is_success() {
        let snippet = raw.chars().take(400).collect::<String>();
        return Err(BotError::Auth(format!(
            "token endpoint HTTP {}: {}",
            status.as_u16(),
            snippet
        )));
    }

    let root: serde_json::Value = serde_json::from_str(&raw)
        .map_err(|e| BotError::Auth(format!("token response parse failed: {}", e)))?;
    let access_token = root
        .get("access_token")
        .and_then(|v| v.as_str())
        .ok_or_else(|| BotError::Auth("token response had no access_token".into()))?;

    info!("Authorization complete");
    Ok(Session {
        access_token: access_token.to_string(),
    })
}

async fn wait_for_code(listener: &TcpListener) -> Result<String, BotError> {
    let (stream, _) = listener.accept().await?;
    let mut reader = BufReader::new(stream);

    let mut request_line = String::new();
    reader.read_line(&mut request_line).await?;
    let code = parse_code_from_request_line(&request_line);

    let body = match &code {
        Ok(_) => "Authorization received. You can close this tab.",
        Err(_) => "Authorization failed. You can close this tab.",
    };
    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: {}\r\n\r\n{}",
        body.len(),
        body
    );
    let mut stream = reader.into_inner();
    stream.write_all(response.as_bytes()).await.ok();
    stream.shutdown().await.ok();

    code
}

fn parse_code_from_request_line(request_line: &str) -> Result<String, BotError> {
    let target = request_line
        .split_whitespace()
        .nth(1)
        .ok_or_else(|| BotError::Auth("malformed redirect request".into()))?;
    let url = Url::parse(&format!("http://localhost{}", target))
        .map_err(|e| BotError::Auth(format!("malformed redirect target: {}", e)))?;

    let mut code = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "error" => {
                return Err(BotError::Auth(format!("authorization rejected: {}", value)));
            }
            _ => {}
        }
    }

    code.ok_or_else(|| BotError::Auth("redirect carried no code".into()))
}

fn upload_metadata(script: &Script) -> serde_json::Value {
    json!({
        "snippet": {
            "title": format!("{}{}", script.title, TITLE_SUFFIX),
            "description": DESCRIPTION,
            "tags": TAGS,
            "categoryId": CATEGORY_TECH,
        },
        "status": {
            "privacyStatus": "public",
            "containsSyntheticMedia": true,
        },
    })
}

fn content_range(offset: u64, end: u64, total: u64) -> String {
    format!("bytes {}-{}/{}", offset, end - 1, total)
}

/// Next write offset after a 308 "resume incomplete" response. Google echoes
/// the persisted span as `Range: bytes=0-N`; absent a Range header nothing
/// was lost and we continue from the end of the chunk just sent.
fn next_offset_from_range(range: Option<&str>, sent_end: u64) -> u64 {
    let Some(range) = range else {
        return sent_end;
    };
    range
        .rsplit('-')
        .next()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(|last| last + 1)
        .unwrap_or(sent_end)
}

/// Uploads the encoded video through YouTube's resumable protocol and
/// returns the assigned video id.
pub async fn upload(
    client: &Client,
    session: &Session,
    video_path: &Path,
    script: &Script,
) -> Result<String, BotError> {
    let data = tokio::fs::read(video_path).await?;
    let total = data.len() as u64;
    let metadata = upload_metadata(script);

    let init_url = format!("{}?uploadType=resumable&part=snippet,status", UPLOAD_URL);
    let resp = client
        .post(&init_url)
        .bearer_auth(&session.access_token)
        .header("X-Upload-Content-Type", "video/mp4")
        .header("X-Upload-Content-Length", total.to_string())
        .json(&metadata)
        .timeout(Duration::from_secs(60))
        .send()
        .await
        .map_err(|e| BotError::Upload(format!("upload init failed: {}", e)))?;

    let status = resp.status();
    if !status.is_success() {
        let raw = resp.text().await.unwrap_or_default();
        let snippet = raw.chars().take(400).collect::<String>();
        return Err(BotError::Upload(format!(
            "upload init HTTP {}: {}",
            status.as_u16(),
            snippet
        )));
    }

    let session_uri = resp
        .headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .ok_or_else(|| BotError::Upload("upload init returned no session URI".into()))?;

    let mut offset: u64 = 0;
    while offset < total {
        let end = (offset + CHUNK_BYTES as u64).min(total);
        let chunk = data[offset as usize..end as usize].to_vec();

        let resp = client
            .put(&session_uri)
            .bearer_auth(&session.access_token)
            .header("Content-Range", content_range(offset, end, total))
            .body(chunk)
            .timeout(Duration::from_secs(600))
            .send()
            .await
            .map_err(|e| BotError::Upload(format!("chunk upload failed: {}", e)))?;

        let status = resp.status();
        if status == StatusCode::PERMANENT_REDIRECT {
            // 308: server persisted a prefix; continue from its offset.
            let range = resp
                .headers()
                .get(reqwest::header::RANGE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            offset = next_offset_from_range(range.as_deref(), end);
            info!("Upload progress: {:.0}%", offset as f64 * 100.0 / total as f64);
            continue;
        }

        let raw = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            let snippet = raw.chars().take(400).collect::<String>();
            return Err(BotError::Upload(format!(
                "chunk upload HTTP {}: {}",
                status.as_u16(),
                snippet
            )));
        }

        info!("Upload progress: 100%");
        let root: serde_json::Value = serde_json::from_str(&raw)
            .map_err(|e| BotError::Upload(format!("upload response parse failed: {}", e)))?;
        let video_id = root
            .get("id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| BotError::Upload("upload response had no video id".into()))?;
        return Ok(video_id.to_string());
    }

    warn!("Upload loop ended without a final response");
    Err(BotError::Upload("no final upload response".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::Scene;

    fn sample_script() -> Script {
        Script {
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
        }
    }

    #[test]
    fn metadata_carries_suffix_and_disclosure() {
        let meta = upload_metadata(&sample_script());
        assert_eq!(meta["snippet"]["title"], "X #shorts");
        assert_eq!(meta["snippet"]["categoryId"], "28");
        assert_eq!(meta["status"]["privacyStatus"], "public");
        assert_eq!(meta["status"]["containsSyntheticMedia"], true);
    }

    #[test]
    fn content_range_is_inclusive() {
        assert_eq!(content_range(0, 8, 20), "bytes 0-7/20");
        assert_eq!(content_range(8, 20, 20), "bytes 8-19/20");
    }

    #[test]
    fn resume_offset_follows_server_range() {
        assert_eq!(next_offset_from_range(Some("bytes=0-1023"), 2048), 1024);
        assert_eq!(next_offset_from_range(None, 2048), 2048);
        assert_eq!(next_offset_from_range(Some("garbage"), 2048), 2048);
    }

    #[test]
    fn parses_code_from_redirect() {
        let line = "GET /?code=abc123&scope=x HTTP/1.1\r\n";
        assert_eq!(parse_code_from_request_line(line).unwrap(), "abc123");
    }

    #[test]
    fn rejects_denied_redirect() {
        let line = "GET /?error=access_denied HTTP/1.1\r\n";
        assert!(matches!(
            parse_code_from_request_line(line),
            Err(BotError::Auth(_))
        ));
    }

    #[tokio::test]
    async fn resolves_base64_credential_source() {
        let secret = r#"{"installed":{"client_id":"id","client_secret":"sec","auth_uri":"https://a","token_uri":"https://t"}}"#;
        let blob = base64::engine::general_purpose::STANDARD.encode(secret);
        let parsed = load_client_secret(&format!("base64://{}", blob))
            .await
            .unwrap();
        assert_eq!(parsed.client_id, "id");
        assert_eq!(parsed.token_uri, "https://t");
    }

    #[tokio::test]
    async fn resolves_file_credential_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client_secret.json");
        tokio::fs::write(
            &path,
            r#"{"installed":{"client_id":"id","client_secret":"sec","auth_uri":"https://a","token_uri":"https://t"}}"#,
        )
        .await
        .unwrap();

        let parsed = load_client_secret(&format!("file://{}", path.display()))
            .await
            .unwrap();
        assert_eq!(parsed.client_secret, "sec");
    }
}
