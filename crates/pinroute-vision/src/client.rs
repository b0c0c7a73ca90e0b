//! HTTP client for OpenAI-compatible vision models.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::schema::RawExtraction;

/// Instructions sent as the system message of every extraction request.
const INSTRUCTIONS: &str = "\
You are reading a photograph of a physical mail item (envelope or parcel).\n\
Extract the addressing fields and answer with a single JSON object with\n\
exactly these keys: receiver_name, receiver_address, receiver_pincode,\n\
sender_name, sender_address, sender_pincode.\n\
\n\
- receiver_* comes from the 'To:' section, sender_* from the 'From:' section.\n\
- Addresses must not include the pincode.\n\
- Pincodes are 6-digit Indian postal codes; report a single value, or an\n\
  empty string if unreadable.\n\
- Use an empty string for any field you cannot read. Answer with JSON only.";

const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Configuration for [`VisionClient`].
#[derive(Debug, Clone, Deserialize)]
pub struct VisionConfig {
    /// Base URL of an OpenAI-compatible API (e.g. `https://api.openai.com/v1`).
    pub base_url: String,
    /// Bearer token for the provider.
    pub api_key: String,
    /// Model identifier (must accept image input).
    pub model: String,
    /// Request timeout in seconds.
    #[serde(default = "VisionConfig::default_timeout_secs")]
    pub timeout_secs: u64,
}

impl VisionConfig {
    const fn default_timeout_secs() -> u64 {
        DEFAULT_TIMEOUT_SECS
    }
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: String::new(),
            model: String::new(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Client that runs one extraction per call against a vision model.
#[derive(Debug, Clone)]
pub struct VisionClient {
    config: VisionConfig,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: Content<'a>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Content<'a> {
    Text(&'a str),
    Parts(Vec<Part<'a>>),
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Part<'a> {
    Text {
        text: &'a str,
    },
    ImageUrl {
        image_url: ImageUrl<'a>,
    },
}

#[derive(Serialize)]
struct ImageUrl<'a> {
    url: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Deserialize)]
struct AssistantMessage {
    content: String,
}

impl VisionClient {
    /// Create a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when base URL or model are missing, or an
    /// error if the underlying HTTP client cannot be built.
    pub fn new(config: VisionConfig) -> Result<Self> {
        if config.base_url.is_empty() {
            return Err(Error::Config("base_url is required".into()));
        }
        if config.model.is_empty() {
            return Err(Error::Config("model is required".into()));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            config: VisionConfig {
                base_url: config.base_url.trim_end_matches('/').to_string(),
                ..config
            },
            client,
        })
    }

    /// Run one extraction against the image behind `image_url`.
    ///
    /// The URL must be readable by the provider for the duration of the
    /// call (a time-limited read reference issued by the storage layer).
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a non-2xx provider status,
    /// or model output that is not the expected JSON object.
    pub async fn extract(&self, image_url: &str) -> Result<RawExtraction> {
        let url = format!("{}/chat/completions", self.config.base_url);
        let body = ChatRequest {
            model: &self.config.model,
            messages: vec![
                Message {
                    role: "system",
                    content: Content::Text(INSTRUCTIONS),
                },
                Message {
                    role: "user",
                    content: Content::Parts(vec![
                        Part::Text {
                            text: "Extract the addressing fields from this mail item.",
                        },
                        Part::ImageUrl {
                            image_url: ImageUrl { url: image_url },
                        },
                    ]),
                },
            ],
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        debug!(model = %self.config.model, "requesting vision extraction");
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Provider {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response.json().await?;
        let content = parsed
            .choices
            .first()
            .map(|choice| choice.message.content.as_str())
            .ok_or_else(|| Error::MalformedOutput("response carried no choices".into()))?;

        parse_model_output(content)
    }
}

/// Parse the model's answer, tolerating a Markdown code fence around the
/// JSON object (some models wrap output despite `json_object` mode).
fn parse_model_output(content: &str) -> Result<RawExtraction> {
    let stripped = strip_code_fence(content);
    serde_json::from_str(stripped)
        .map_err(|e| Error::MalformedOutput(format!("{e}: {stripped:.120}")))
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop an optional language tag after the opening fence.
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.trim_start_matches(['\r', '\n'])
        .strip_suffix("```")
        .unwrap_or(rest)
        .trim()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_json_output() {
        let out = parse_model_output(
            r#"{"receiver_name": "Ravi", "receiver_pincode": "560001"}"#,
        )
        .unwrap();
        assert_eq!(out.receiver_name, "Ravi");
        assert_eq!(out.receiver_pincode, "560001");
        assert_eq!(out.sender_address, "");
    }

    #[test]
    fn parses_fenced_json_output() {
        let content = "```json\n{\"receiver_pincode\": \"560001\"}\n```";
        let out = parse_model_output(content).unwrap();
        assert_eq!(out.receiver_pincode, "560001");
    }

    #[test]
    fn parses_fence_without_language_tag() {
        let content = "```\n{\"sender_pincode\": \"400001\"}\n```";
        let out = parse_model_output(content).unwrap();
        assert_eq!(out.sender_pincode, "400001");
    }

    #[test]
    fn rejects_non_json_output() {
        assert!(matches!(
            parse_model_output("I could not read the image."),
            Err(Error::MalformedOutput(_))
        ));
    }

    #[test]
    fn config_requires_base_url_and_model() {
        assert!(matches!(
            VisionClient::new(VisionConfig::default()),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            VisionClient::new(VisionConfig {
                base_url: "https://api.openai.com/v1".into(),
                ..VisionConfig::default()
            }),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn config_trims_trailing_slash() {
        let client = VisionClient::new(VisionConfig {
            base_url: "https://api.openai.com/v1/".into(),
            api_key: "k".into(),
            model: "gpt-4o-mini".into(),
            timeout_secs: 5,
        })
        .unwrap();
        assert_eq!(client.config.base_url, "https://api.openai.com/v1");
    }
}
