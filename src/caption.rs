//! Social-media caption generation.
//!
//! A [`CaptionRequest`] becomes a single natural-language prompt, which is
//! URL-encoded and appended to the configured text endpoint. The endpoint
//! answers with the caption as plain text; [`clean_caption`] strips the
//! quoting and labels models like to add.

use crate::config::ToolkitConfig;
use crate::error::AxevoraError;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

const SERVICE: &str = "caption endpoint";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Platform {
    #[default]
    Instagram,
    Twitter,
    LinkedIn,
    Facebook,
    TikTok,
}

impl Platform {
    /// Hard character limit, where the platform has a practical one.
    pub fn max_chars(self) -> Option<usize> {
        match self {
            Platform::Twitter => Some(280),
            Platform::Instagram => Some(2200),
            Platform::TikTok => Some(2200),
            Platform::LinkedIn => Some(3000),
            Platform::Facebook => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Tone {
    #[default]
    Casual,
    Professional,
    Funny,
    Inspirational,
    Promotional,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CaptionLength {
    Short,
    #[default]
    Medium,
    Long,
}

macro_rules! name_enum {
    ($ty:ty, $($variant:path => $name:literal $(| $alias:literal)*),+ $(,)?) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(match self { $($variant => $name),+ })
            }
        }

        impl FromStr for $ty {
            type Err = AxevoraError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($name $(| $alias)* => Ok($variant),)+
                    other => Err(AxevoraError::InvalidInput { input: other.to_string() }),
                }
            }
        }
    };
}

name_enum!(Platform,
    Platform::Instagram => "instagram" | "ig",
    Platform::Twitter => "twitter" | "x",
    Platform::LinkedIn => "linkedin",
    Platform::Facebook => "facebook" | "fb",
    Platform::TikTok => "tiktok",
);

name_enum!(Tone,
    Tone::Casual => "casual",
    Tone::Professional => "professional",
    Tone::Funny => "funny" | "humorous",
    Tone::Inspirational => "inspirational",
    Tone::Promotional => "promotional",
);

name_enum!(CaptionLength,
    CaptionLength::Short => "short",
    CaptionLength::Medium => "medium",
    CaptionLength::Long => "long",
);

/// What to write a caption about, and how.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptionRequest {
    pub topic: String,
    pub platform: Platform,
    pub tone: Tone,
    pub length: CaptionLength,
    pub hashtags: bool,
    pub emojis: bool,
}

impl CaptionRequest {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            platform: Platform::default(),
            tone: Tone::default(),
            length: CaptionLength::default(),
            hashtags: true,
            emojis: true,
        }
    }
}

/// Build the prompt sent to the endpoint.
pub fn build_prompt(req: &CaptionRequest) -> String {
    let length = match req.length {
        CaptionLength::Short => "one short sentence",
        CaptionLength::Medium => "two to three sentences",
        CaptionLength::Long => "a short paragraph of four to six sentences",
    };
    let mut prompt = format!(
        "Write a {tone} {platform} caption about: {topic}. Length: {length}.",
        tone = req.tone,
        platform = req.platform,
        topic = req.topic.trim(),
    );
    prompt.push_str(if req.hashtags {
        " End with 3 to 5 relevant hashtags."
    } else {
        " Do not use hashtags."
    });
    prompt.push_str(if req.emojis {
        " Use a few fitting emojis."
    } else {
        " Do not use emojis."
    });
    if let Some(max) = req.platform.max_chars() {
        prompt.push_str(&format!(" Stay under {max} characters."));
    }
    prompt.push_str(" Reply with the caption text only.");
    prompt
}

/// `{endpoint}{url-encoded prompt}`, with an optional `seed` for variants.
pub fn request_url(endpoint: &str, prompt: &str, seed: Option<u32>) -> String {
    let mut url = format!("{endpoint}{}", utf8_percent_encode(prompt, NON_ALPHANUMERIC));
    if let Some(seed) = seed {
        let separator = if endpoint.contains('?') { '&' } else { '?' };
        url.push_str(&format!("{separator}seed={seed}"));
    }
    url
}

/// Trim, drop a leading `Caption:` label and surrounding quotes.
pub fn clean_caption(raw: &str) -> String {
    let mut text = raw.trim();
    for label in ["caption:", "here's your caption:", "here is your caption:"] {
        if text.len() >= label.len()
            && text.is_char_boundary(label.len())
            && text[..label.len()].eq_ignore_ascii_case(label)
        {
            text = text[label.len()..].trim_start();
        }
    }
    let quotes: &[char] = &['"', '\'', '“', '”'];
    if text.starts_with(quotes) && text.ends_with(quotes) {
        text = text.trim_matches(quotes).trim();
    }
    text.to_string()
}

/// Shorten to `max` chars on a word boundary.
fn enforce_limit(text: String, max: Option<usize>) -> String {
    let Some(max) = max else {
        return text;
    };
    if text.chars().count() <= max {
        return text;
    }
    warn!("Caption longer than {} characters; truncating", max);
    let cut: String = text.chars().take(max).collect();
    match cut.rfind(char::is_whitespace) {
        Some(pos) if pos > 0 => cut[..pos].trim_end().to_string(),
        _ => cut,
    }
}

async fn fetch(client: &reqwest::Client, url: &str) -> Result<String, AxevoraError> {
    let fail = |reason: String| AxevoraError::RequestFailed {
        service: SERVICE.to_string(),
        reason,
    };
    let response = client.get(url).send().await.map_err(|e| fail(e.to_string()))?;
    if !response.status().is_success() {
        return Err(fail(format!("HTTP {}", response.status())));
    }
    response.text().await.map_err(|e| fail(e.to_string()))
}

/// Generate `count` caption variants (at least one).
pub async fn generate_captions(
    req: &CaptionRequest,
    count: usize,
    config: &ToolkitConfig,
) -> Result<Vec<String>, AxevoraError> {
    if req.topic.trim().is_empty() {
        return Err(AxevoraError::InvalidInput {
            input: "empty caption topic".into(),
        });
    }
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.http_timeout_secs))
        .build()
        .map_err(|e| AxevoraError::RequestFailed {
            service: SERVICE.to_string(),
            reason: e.to_string(),
        })?;

    let prompt = build_prompt(req);
    let count = count.max(1);
    info!("Generating {} {} caption(s)", count, req.platform);

    let mut captions = Vec::with_capacity(count);
    for i in 0..count {
        let seed = (count > 1).then_some(i as u32 + 1);
        let url = request_url(&config.caption_endpoint, &prompt, seed);
        debug!("GET {}", url);
        let caption = enforce_limit(clean_caption(&fetch(&client, &url).await?), req.platform.max_chars());
        if caption.is_empty() {
            return Err(AxevoraError::EmptyResponse {
                service: SERVICE.to_string(),
            });
        }
        captions.push(caption);
    }
    Ok(captions)
}

/// Generate one caption.
pub async fn generate_caption(req: &CaptionRequest, config: &ToolkitConfig) -> Result<String, AxevoraError> {
    let mut captions = generate_captions(req, 1, config).await?;
    captions.pop().ok_or_else(|| AxevoraError::EmptyResponse {
        service: SERVICE.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_mentions_every_option() {
        let mut req = CaptionRequest::new("  our new coffee blend ");
        req.platform = Platform::Twitter;
        req.tone = Tone::Funny;
        req.hashtags = false;
        let prompt = build_prompt(&req);
        assert!(prompt.starts_with("Write a funny twitter caption about: our new coffee blend."));
        assert!(prompt.contains("Do not use hashtags."));
        assert!(prompt.contains("Use a few fitting emojis."));
        assert!(prompt.contains("under 280 characters"));
    }

    #[test]
    fn url_is_percent_encoded() {
        let url = request_url("https://text.example/", "a b&c?", None);
        assert_eq!(url, "https://text.example/a%20b%26c%3F");
        let url = request_url("https://text.example/", "x", Some(2));
        assert_eq!(url, "https://text.example/x?seed=2");
    }

    #[test]
    fn seed_joins_an_existing_query() {
        let url = request_url("https://text.example/gen?model=small&prompt=", "hi", Some(7));
        assert_eq!(url, "https://text.example/gen?model=small&prompt=hi&seed=7");
    }

    #[test]
    fn cleanup_strips_labels_and_quotes() {
        assert_eq!(clean_caption("  \"Hello world\"  "), "Hello world");
        assert_eq!(clean_caption("Caption: Sunny days ☀️"), "Sunny days ☀️");
        assert_eq!(clean_caption("“Quoted”"), "Quoted");
        assert_eq!(clean_caption("It's fine"), "It's fine");
        assert_eq!(clean_caption("\""), "");
    }

    #[test]
    fn limit_cuts_on_word_boundary() {
        let text = "one two three four".to_string();
        assert_eq!(enforce_limit(text.clone(), Some(10)), "one two");
        assert_eq!(enforce_limit(text.clone(), None), text);
    }

    #[test]
    fn names_parse() {
        assert_eq!("X".parse::<Platform>().unwrap(), Platform::Twitter);
        assert_eq!("humorous".parse::<Tone>().unwrap(), Tone::Funny);
        assert!("epic".parse::<CaptionLength>().is_err());
    }

    #[tokio::test]
    async fn empty_topic_rejected_without_network() {
        let err = generate_caption(&CaptionRequest::new("  "), &ToolkitConfig::default())
            .await
            .unwrap_err();
        assert!(err.is_user_error());
    }
}
