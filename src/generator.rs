// AI answer generation: Gemini REST and Qwen via Ollama, with placeholder
// text substituted whenever a provider is unconfigured or fails.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Config;
use crate::metrics;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434/api/chat";
pub const DEFAULT_QWEN_MODEL: &str = "qwen2.5:1.5b";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

const GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// The joke-writing instruction sent to every provider.
pub fn comedian_prompt(question: &str) -> String {
    format!(
        "You are a stand-up comedian. Write one short, clean, original joke answer to this prompt:\n\n{question}"
    )
}

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("{provider} is not configured")]
    NotConfigured { provider: &'static str },

    #[error("unknown strategy {0}")]
    UnknownStrategy(String),

    #[error("{provider} returned HTTP {status}: {body}")]
    Status {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("{provider} request failed: {source}")]
    Transport {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider} returned an empty response")]
    Empty { provider: &'static str },
}

impl GenerationError {
    /// Wrap a reqwest error with its URL stripped, so nothing from the
    /// request line ends up in logs.
    fn transport(provider: &'static str, source: reqwest::Error) -> Self {
        GenerationError::Transport {
            provider,
            source: source.without_url(),
        }
    }

    /// Deterministic stand-in answer for this failure.
    pub fn placeholder(&self, question: &str) -> String {
        match self {
            GenerationError::NotConfigured { provider } => {
                format!("({provider} placeholder) Joke for: {question}")
            }
            GenerationError::UnknownStrategy(strategy) => {
                format!("(Unknown strategy {strategy}) Joke for: {question}")
            }
            GenerationError::Status { provider, .. } => {
                format!("({provider} failed) Backup joke for: {question}")
            }
            GenerationError::Transport { provider, .. } => {
                format!("({provider} error) Backup joke for: {question}")
            }
            GenerationError::Empty { provider } => format!("({provider} empty response)"),
        }
    }
}

/// Produces answer text for a question using a named strategy.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn generate(&self, question: &str, strategy: &str) -> Result<String, GenerationError>;
}

/// Generate an answer, falling back to placeholder text on any error.
pub async fn generate_or_placeholder(
    generator: &dyn AnswerGenerator,
    question: &str,
    strategy: &str,
) -> String {
    let started = Instant::now();
    let result = generator.generate(question, strategy).await;
    metrics::GENERATION_DURATION_SECONDS
        .with_label_values(&[strategy])
        .observe(started.elapsed().as_secs_f64());

    match result {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!("Generation with {strategy} failed: {e}");
            metrics::GENERATION_FAILURES_TOTAL
                .with_label_values(&[strategy])
                .inc();
            e.placeholder(question)
        }
    }
}

// ── Gemini ────────────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Serialize, Deserialize, Default)]
struct GeminiContent {
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Serialize, Deserialize, Default)]
struct GeminiPart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    #[serde(default)]
    content: GeminiContent,
}

impl GeminiResponse {
    fn joined_text(&self) -> String {
        self.candidates
            .first()
            .map(|c| {
                c.content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

pub struct GeminiClient {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    endpoint: String,
}

impl GeminiClient {
    const PROVIDER: &'static str = "Gemini";

    pub fn new(client: reqwest::Client, api_key: Option<String>, model: impl Into<String>) -> Self {
        Self {
            client,
            api_key,
            model: model.into(),
            endpoint: GEMINI_ENDPOINT.to_string(),
        }
    }

    /// Point the client at a different base URL (used against local stubs).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub async fn generate(&self, question: &str) -> Result<String, GenerationError> {
        let provider = Self::PROVIDER;
        let api_key = self
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(GenerationError::NotConfigured { provider })?;

        let url = format!("{}/{}:generateContent", self.endpoint, self.model);
        let body = GeminiRequest {
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart {
                    text: Some(comedian_prompt(question)),
                }],
            }],
            generation_config: GeminiGenerationConfig {
                max_output_tokens: 80,
                temperature: 0.9,
            },
        };

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::transport(provider, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Status {
                provider,
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GeminiResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::transport(provider, e))?;
        non_empty(parsed.joined_text(), provider)
    }
}

// ── Qwen via Ollama ───────────────────────────────────────────────────

#[derive(Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    stream: bool,
}

#[derive(Serialize, Deserialize)]
struct OllamaMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    message: Option<OllamaMessage>,
}

pub struct OllamaClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
}

impl OllamaClient {
    const PROVIDER: &'static str = "Qwen";

    pub fn new(client: reqwest::Client, endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            model: model.into(),
        }
    }

    pub async fn generate(&self, question: &str) -> Result<String, GenerationError> {
        let provider = Self::PROVIDER;
        let body = OllamaChatRequest {
            model: self.model.clone(),
            messages: vec![OllamaMessage {
                role: "user".to_string(),
                content: comedian_prompt(question),
            }],
            stream: false,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::transport(provider, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Status {
                provider,
                status: status.as_u16(),
                body,
            });
        }

        let parsed: OllamaChatResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::transport(provider, e))?;
        non_empty(parsed.message.map(|m| m.content).unwrap_or_default(), provider)
    }
}

fn non_empty(text: String, provider: &'static str) -> Result<String, GenerationError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        Err(GenerationError::Empty { provider })
    } else {
        Ok(trimmed.to_string())
    }
}

// ── Strategy routing ──────────────────────────────────────────────────

/// Routes a strategy name to its provider by prefix.
pub struct ProviderGenerator {
    gemini: GeminiClient,
    qwen: OllamaClient,
}

impl ProviderGenerator {
    pub fn new(gemini: GeminiClient, qwen: OllamaClient) -> Self {
        Self { gemini, qwen }
    }

    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.generation_timeout_secs))
            .build()?;
        Ok(Self::new(
            GeminiClient::new(
                client.clone(),
                config.gemini_api_key.clone(),
                config.gemini_model.clone(),
            ),
            OllamaClient::new(client, config.qwen_ollama_url.clone(), config.qwen_model.clone()),
        ))
    }
}

#[async_trait]
impl AnswerGenerator for ProviderGenerator {
    async fn generate(&self, question: &str, strategy: &str) -> Result<String, GenerationError> {
        if strategy.starts_with("gemini") {
            self.gemini.generate(question).await
        } else if strategy.starts_with("qwen") {
            self.qwen.generate(question).await
        } else {
            Err(GenerationError::UnknownStrategy(strategy.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unreachable_generator(api_key: Option<String>) -> ProviderGenerator {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()
            .unwrap();
        // Port 9 (discard) is not listening, so connections are refused.
        ProviderGenerator::new(
            GeminiClient::new(client.clone(), api_key, DEFAULT_GEMINI_MODEL)
                .with_endpoint("http://127.0.0.1:9/v1beta/models"),
            OllamaClient::new(client, "http://127.0.0.1:9/api/chat", DEFAULT_QWEN_MODEL),
        )
    }

    #[test]
    fn test_prompt_contains_question() {
        let p = comedian_prompt("Why?");
        assert!(p.starts_with("You are a stand-up comedian."));
        assert!(p.ends_with("\n\nWhy?"));
    }

    #[test]
    fn test_placeholders_are_deterministic() {
        let q = "What's 2+2?";
        assert_eq!(
            GenerationError::NotConfigured { provider: "Gemini" }.placeholder(q),
            "(Gemini placeholder) Joke for: What's 2+2?"
        );
        assert_eq!(
            GenerationError::UnknownStrategy("llama_v9".into()).placeholder(q),
            "(Unknown strategy llama_v9) Joke for: What's 2+2?"
        );
        assert_eq!(
            GenerationError::Status {
                provider: "Qwen",
                status: 500,
                body: "boom".into()
            }
            .placeholder(q),
            "(Qwen failed) Backup joke for: What's 2+2?"
        );
        assert_eq!(
            GenerationError::Empty { provider: "Qwen" }.placeholder(q),
            "(Qwen empty response)"
        );
    }

    #[test]
    fn test_gemini_response_text_joined() {
        let raw = r#"{"candidates":[{"content":{"parts":[{"text":"Knock "},{"text":"knock"}]}}]}"#;
        let parsed: GeminiResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.joined_text(), "Knock knock");

        let empty: GeminiResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(empty.joined_text(), "");
    }

    #[test]
    fn test_non_empty_trims() {
        assert_eq!(non_empty("  ha \n".into(), "Qwen").unwrap(), "ha");
        assert!(matches!(
            non_empty("   ".into(), "Qwen"),
            Err(GenerationError::Empty { .. })
        ));
    }

    #[tokio::test]
    async fn test_gemini_without_key_is_not_configured() {
        let gen = unreachable_generator(None);
        let err = gen.generate("q", "gemini_v1").await.unwrap_err();
        assert!(matches!(err, GenerationError::NotConfigured { .. }));
        assert_eq!(
            generate_or_placeholder(&gen, "q", "gemini_v1").await,
            "(Gemini placeholder) Joke for: q"
        );
    }

    #[tokio::test]
    async fn test_gemini_transport_error_hides_key() {
        let gen = unreachable_generator(Some("SUPERSECRETKEY".into()));
        let err = gen.generate("q", "gemini_v1").await.unwrap_err();
        assert!(matches!(err, GenerationError::Transport { .. }));
        let logged = format!("Generation with gemini_v1 failed: {err}");
        assert!(!logged.contains("SUPERSECRETKEY"), "{logged}");
        assert!(!logged.contains("127.0.0.1:9"), "{logged}");
    }

    #[tokio::test]
    async fn test_unreachable_ollama_falls_back() {
        let gen = unreachable_generator(None);
        let text = generate_or_placeholder(&gen, "q", "qwen_v1").await;
        assert_eq!(text, "(Qwen error) Backup joke for: q");
    }

    #[tokio::test]
    async fn test_unknown_strategy() {
        let gen = unreachable_generator(Some("key".into()));
        let text = generate_or_placeholder(&gen, "q", "mystery").await;
        assert_eq!(text, "(Unknown strategy mystery) Joke for: q");
    }
}
