//! Prompt generation for source videos.
//!
//! The [`PromptSource`] trait decouples batch orchestration from the actual
//! description backend (currently a vision chat-completions call over
//! extracted frames). Tests use fixed prompts without touching the network.
//!
//! Description is best-effort by design: any failure falls back to the
//! configured prompt so a missing API key or a flaky probe never aborts an
//! augmentation run.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::io::config::DescribeConfig;
use crate::io::probe::{ProbeLimits, extract_frames};

pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";

const CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";
const HTTP_TIMEOUT: Duration = Duration::from_secs(120);

const DESCRIBE_INSTRUCTION: &str = "\
Analyze these frames from a video sequence and provide a realistic, detailed \
description suitable for a video diffusion model. Focus on:

1. The main subject/object and their actions
2. The environment and setting
3. Camera angle and perspective
4. Movement and motion patterns
5. Visual style and lighting and colors

Provide a concise but descriptive prompt that would help a video diffusion \
model recreate a similar video. Keep it under 200 words and focus on visual \
elements that are important for video generation.";

/// Abstraction over prompt generation backends.
pub trait PromptSource {
    /// Produce a prompt for one source video. Must not fail; backends fall
    /// back internally.
    fn prompt_for(&self, video: &Path) -> String;
}

/// Prompt source that describes source videos with a vision model.
pub struct Describer {
    cfg: DescribeConfig,
    api_key: Option<String>,
}

impl Describer {
    pub fn new(cfg: DescribeConfig) -> Self {
        let api_key = std::env::var(OPENAI_API_KEY).ok().filter(|k| !k.is_empty());
        Self { cfg, api_key }
    }

    #[cfg(test)]
    fn with_api_key(cfg: DescribeConfig, api_key: Option<String>) -> Self {
        Self { cfg, api_key }
    }

    fn limits(&self) -> ProbeLimits {
        ProbeLimits {
            timeout: Duration::from_secs(self.cfg.probe_timeout_secs),
            output_limit_bytes: self.cfg.probe_output_limit_bytes,
        }
    }

    fn describe(&self, video: &Path, api_key: &str) -> Result<String> {
        let frames = extract_frames(video, self.cfg.num_frames, self.limits())?;
        debug!(count = frames.frames.len(), "sending frames for description");
        request_description(api_key, &self.cfg.model, &frames.frames)
    }
}

impl PromptSource for Describer {
    fn prompt_for(&self, video: &Path) -> String {
        let Some(api_key) = &self.api_key else {
            warn!("{OPENAI_API_KEY} not set, using fallback prompt");
            return self.cfg.fallback_prompt.clone();
        };
        match self.describe(video, api_key) {
            Ok(description) => {
                info!(video = %video.display(), "generated video description");
                description
            }
            Err(err) => {
                warn!(err = %err, video = %video.display(), "description failed, using fallback prompt");
                self.cfg.fallback_prompt.clone()
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

fn request_description(api_key: &str, model: &str, frames: &[std::path::PathBuf]) -> Result<String> {
    let mut content = vec![json!({ "type": "text", "text": DESCRIBE_INSTRUCTION })];
    for frame in frames {
        let bytes =
            fs::read(frame).with_context(|| format!("read frame {}", frame.display()))?;
        let encoded = BASE64.encode(bytes);
        content.push(json!({
            "type": "image_url",
            "image_url": {
                "url": format!("data:image/jpeg;base64,{encoded}"),
                "detail": "low"
            }
        }));
    }

    let body = json!({
        "model": model,
        "messages": [{ "role": "user", "content": content }],
        "max_tokens": 300,
        "temperature": 0.7
    });

    let client = reqwest::blocking::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .context("build http client")?;
    let response = client
        .post(CHAT_COMPLETIONS_URL)
        .bearer_auth(api_key)
        .json(&body)
        .send()
        .context("send description request")?
        .error_for_status()
        .context("description request status")?;

    let parsed: ChatResponse = response.json().context("parse description response")?;
    let choice = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("description response had no choices"))?;
    Ok(choice.message.content.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn missing_api_key_uses_fallback() {
        let cfg = DescribeConfig::default();
        let fallback = cfg.fallback_prompt.clone();
        let describer = Describer::with_api_key(cfg, None);
        assert_eq!(describer.prompt_for(&PathBuf::from("in.mp4")), fallback);
    }

    #[test]
    fn probe_failure_uses_fallback() {
        // No such video file, so frame extraction fails before any network use.
        let cfg = DescribeConfig::default();
        let fallback = cfg.fallback_prompt.clone();
        let describer = Describer::with_api_key(cfg, Some("test-key".to_string()));
        assert_eq!(
            describer.prompt_for(&PathBuf::from("/nonexistent/in.mp4")),
            fallback
        );
    }
}
