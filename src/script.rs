use crate::error::BotError;
use serde::{Deserialize, Serialize};

pub const MAX_SHOTS: usize = 6;

// The prompt asks for a sub-55s short; anything past this is a model
// misfire, and it keeps frame-count arithmetic far from u32 range.
pub const MAX_SHOT_SECONDS: u32 = 60;

/// One segment of the short: an image prompt held on screen for a fixed
/// number of seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scene {
    pub img_prompt: String,
    pub duration: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Script {
    pub title: String,
    pub voiceover: String,
    pub shots: Vec<Scene>,
}

impl Script {
    /// Parses a model response into a validated script. The upstream prompt
    /// already asks for 1-6 shots and a sub-55s runtime; the shot-count and
    /// duration checks here are a deliberate hardening on top of that.
    pub fn from_json(text: &str) -> Result<Self, BotError> {
        let script: Script = serde_json::from_str(text)
            .map_err(|e| BotError::Format(format!("Failed to parse script JSON: {}", e)))?;
        script.validate()?;
        Ok(script)
    }

    fn validate(&self) -> Result<(), BotError> {
        if self.title.is_empty() {
            return Err(BotError::Format("script title is empty".into()));
        }
        if self.voiceover.is_empty() {
            return Err(BotError::Format("script voiceover is empty".into()));
        }
        if self.shots.is_empty() {
            return Err(BotError::Format("script has no shots".into()));
        }
        if self.shots.len() > MAX_SHOTS {
            return Err(BotError::Format(format!(
                "script has {} shots (max {})",
                self.shots.len(),
                MAX_SHOTS
            )));
        }
        for (i, shot) in self.shots.iter().enumerate() {
            if shot.duration == 0 {
                return Err(BotError::Format(format!("shot {} has zero duration", i + 1)));
            }
            if shot.duration > MAX_SHOT_SECONDS {
                return Err(BotError::Format(format!(
                    "shot {} duration {}s exceeds {}s",
                    i + 1,
                    shot.duration,
                    MAX_SHOT_SECONDS
                )));
            }
            if shot.img_prompt.is_empty() {
                return Err(BotError::Format(format!("shot {} has empty prompt", i + 1)));
            }
        }
        Ok(())
    }

    /// Sum of per-shot durations, in seconds. The assembled video is exactly
    /// this long regardless of the narration's native length.
    pub fn total_duration(&self) -> u32 {
        self.shots.iter().map(|s| s.duration).sum()
    }
}
