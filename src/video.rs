use crate::error::BotError;
use crate::script::Script;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::info;

pub const FRAME_RATE: u32 = 30;
const OUT_W: u32 = 1080;
const OUT_H: u32 = 1920;
const VIDEO_BITRATE: &str = "3M";

// Slow continuous zoom-in, roughly 12% over the longest shot.
const ZOOM_STEP: &str = "0.0008";
const ZOOM_MAX: &str = "1.12";

async fn run_cmd(args: &[String]) -> Result<(), BotError> {
    if args.is_empty() {
        return Ok(());
    }

    let mut cmd = Command::new(&args[0]);
    if args.len() > 1 {
        cmd.args(&args[1..]);
    }

    let status = cmd
        .status()
        .await
        .map_err(|e| BotError::Encode(format!("command execution failed: {}", e)))?;
    if !status.success() {
        return Err(BotError::Encode(format!("command failed: {:?}", args)));
    }

    Ok(())
}

pub async fn ffprobe_duration_seconds(path: &Path) -> Result<f64, BotError> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(path)
        .output()
        .await
        .map_err(|e| BotError::Encode(format!("ffprobe execution failed: {}", e)))?;

    if !output.status.success() {
        return Err(BotError::Encode("ffprobe failed".into()));
    }

    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    let duration = text.parse::<f64>().unwrap_or(-1.0);
    if duration <= 0.1 {
        return Err(BotError::Encode("invalid duration".into()));
    }
    Ok(duration)
}

fn kenburns_filter(duration_s: u32) -> String {
    let frames = duration_s * FRAME_RATE;
    format!(
        "scale={w}:{h}:force_original_aspect_ratio=increase,crop={w}:{h},\
         zoompan=z='min(zoom+{step},{max})':x='iw/2-(iw/zoom/2)':y='ih/2-(ih/zoom/2)':d={frames}:s={w}x{h}:fps={fps}",
        w = OUT_W,
        h = OUT_H,
        step = ZOOM_STEP,
        max = ZOOM_MAX,
        frames = frames,
        fps = FRAME_RATE
    )
}

/// One still image -> one H.264 clip of exactly `duration_s * 30` frames.
fn scene_clip_args(image: &Path, duration_s: u32, out_mp4: &Path) -> Vec<String> {
    vec![
        "ffmpeg".to_string(),
        "-y".to_string(),
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-i".to_string(),
        image.display().to_string(),
        "-vf".to_string(),
        kenburns_filter(duration_s),
        "-frames:v".to_string(),
        (duration_s * FRAME_RATE).to_string(),
        "-r".to_string(),
        FRAME_RATE.to_string(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
        "-c:v".to_string(),
        "libx264".to_string(),
        "-preset".to_string(),
        "veryfast".to_string(),
        out_mp4.display().to_string(),
    ]
}

fn concat_args(list_txt: &Path, out_mp4: &Path) -> Vec<String> {
    vec![
        "ffmpeg".to_string(),
        "-y".to_string(),
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-f".to_string(),
        "concat".to_string(),
        "-safe".to_string(),
        "0".to_string(),
        "-i".to_string(),
        list_txt.display().to_string(),
        "-c".to_string(),
        "copy".to_string(),
        out_mp4.display().to_string(),
    ]
}

/// Final encode: narration padded (`apad`) then cut at the scene-sum
/// duration, so audio length never changes the video length.
fn mux_args(video_in: &Path, audio_in: &Path, total_s: u32, out_mp4: &Path) -> Vec<String> {
    vec![
        "ffmpeg".to_string(),
        "-y".to_string(),
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-i".to_string(),
        video_in.display().to_string(),
        "-i".to_string(),
        audio_in.display().to_string(),
        "-map".to_string(),
        "0:v".to_string(),
        "-map".to_string(),
        "1:a".to_string(),
        "-af".to_string(),
        "apad".to_string(),
        "-t".to_string(),
        total_s.to_string(),
        "-c:v".to_string(),
        "libx264".to_string(),
        "-b:v".to_string(),
        VIDEO_BITRATE.to_string(),
        "-r".to_string(),
        FRAME_RATE.to_string(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
        "-c:a".to_string(),
        "aac".to_string(),
        "-b:a".to_string(),
        "192k".to_string(),
        "-movflags".to_string(),
        "+faststart".to_string(),
        out_mp4.display().to_string(),
    ]
}

/// Builds the vertical short: one Ken Burns clip per (image, shot) pair in
/// order, concatenated, with the narration track attached.
pub async fn build_video(
    images: &[PathBuf],
    audio: &Path,
    script: &Script,
    work_dir: &Path,
    out_mp4: &Path,
) -> Result<(), BotError> {
    if images.len() != script.shots.len() {
        return Err(BotError::Encode(format!(
            "{} images for {} shots",
            images.len(),
            script.shots.len()
        )));
    }

    let concat_list = work_dir.join("concat_list.txt");
    let mut listf = fs::File::create(&concat_list).await?;

    for (i, (image, shot)) in images.iter().zip(&script.shots).enumerate() {
        let clip_name = format!("clip_{}.mp4", i + 1);
        let clip_path = work_dir.join(&clip_name);
        info!(
            "Rendering clip {}/{} ({}s)",
            i + 1,
            images.len(),
            shot.duration
        );
        run_cmd(&scene_clip_args(image, shot.duration, &clip_path)).await?;

        // Entries are relative to the list file's directory.
        listf
            .write_all(format!("file '{}'\n", clip_name).as_bytes())
            .await?;
    }
    listf.flush().await?;

    let silent = work_dir.join("silent.mp4");
    run_cmd(&concat_args(&concat_list, &silent)).await?;

    let total = script.total_duration();
    info!("Muxing narration, target duration {}s", total);
    run_cmd(&mux_args(&silent, audio, total, out_mp4)).await?;

    if !out_mp4.exists() {
        return Err(BotError::Encode(format!(
            "encode produced no output at {}",
            out_mp4.display()
        )));
    }

    let encoded = ffprobe_duration_seconds(out_mp4).await?;
    info!(
        "Encoded {:.2}s (planned {}s) -> {}",
        encoded,
        total,
        out_mp4.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::Scene;

    fn two_shot_script() -> Script {
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
    fn scene_clip_pins_exact_frame_count() {
        let args = scene_clip_args(Path::new("img.png"), 5, Path::new("out.mp4"));
        let pos = args.iter().position(|a| a == "-frames:v").unwrap();
        assert_eq!(args[pos + 1], "150");
        assert!(args.iter().any(|a| a.contains("d=150")));
        assert!(args.iter().any(|a| a.contains("s=1080x1920")));
    }

    #[test]
    fn mux_cuts_at_scene_sum() {
        let script = two_shot_script();
        let args = mux_args(
            Path::new("silent.mp4"),
            Path::new("voice.mp3"),
            script.total_duration(),
            Path::new("out.mp4"),
        );
        let pos = args.iter().position(|a| a == "-t").unwrap();
        assert_eq!(args[pos + 1], "5");
        assert!(args.iter().any(|a| a == "apad"));
        assert!(args.iter().any(|a| a == "3M"));
    }

    #[test]
    fn output_encode_is_h264_aac_30fps() {
        let args = mux_args(Path::new("v"), Path::new("a"), 5, Path::new("o"));
        let v = args.iter().position(|a| a == "-c:v").unwrap();
        assert_eq!(args[v + 1], "libx264");
        let a = args.iter().position(|a| a == "-c:a").unwrap();
        assert_eq!(args[a + 1], "aac");
        let r = args.iter().position(|a| a == "-r").unwrap();
        assert_eq!(args[r + 1], "30");
    }

    #[tokio::test]
    async fn build_rejects_image_shot_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let script = two_shot_script();
        let err = build_video(
            &[dir.path().join("only_one.png")],
            Path::new("voice.mp3"),
            &script,
            dir.path(),
            &dir.path().join("out.mp4"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, BotError::Encode(_)));
    }
}
