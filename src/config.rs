// Application configuration, loaded from environment variables and CLI flags.

use std::path::PathBuf;

use crate::generator::{
    DEFAULT_GEMINI_MODEL, DEFAULT_OLLAMA_URL, DEFAULT_QWEN_MODEL, DEFAULT_TIMEOUT_SECS,
};
use crate::strategy::{clamp_epsilon, DEFAULT_EPSILON};

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Database URL (SQLite connection string).
    pub database_url: String,
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Directory of pre-built frontend files served as a fallback.
    pub static_dir: Option<PathBuf>,
    /// Exploration probability for strategy selection, in [0, 1].
    pub epsilon: f64,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub qwen_ollama_url: String,
    pub qwen_model: String,
    /// Per-request timeout for generation calls.
    pub generation_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database_url: "sqlite:jokebattle.db?mode=rwc".to_string(),
            port: 3000,
            static_dir: None,
            epsilon: DEFAULT_EPSILON,
            gemini_api_key: None,
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            qwen_ollama_url: DEFAULT_OLLAMA_URL.to_string(),
            qwen_model: DEFAULT_QWEN_MODEL.to_string(),
            generation_timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// Load configuration from environment variables and CLI arguments.
    ///
    /// Environment variables:
    /// - `DATABASE_URL` - SQLite connection string (default: `sqlite:jokebattle.db?mode=rwc`)
    /// - `PORT` - HTTP server port (default: 3000)
    /// - `STATIC_DIR` - Path to frontend files for static serving
    /// - `STRATEGY_EPSILON` - Exploration rate (default: 0.2)
    /// - `GEMINI_API_KEY`, `GEMINI_MODEL`
    /// - `QWEN_OLLAMA_URL`, `QWEN_MODEL_NAME`
    /// - `GENERATION_TIMEOUT_SECS` (default: 30)
    ///
    /// CLI flags:
    /// - `--port <PORT>` - Override the port
    /// - `--epsilon <E>` - Override the exploration rate
    pub fn load() -> Self {
        let args: Vec<String> = std::env::args().collect();
        Self::from_sources(&args, |key| std::env::var(key).ok())
    }

    /// Build a config from CLI args and an env lookup. CLI values win.
    pub fn from_sources(args: &[String], env: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Config::default();
        let env = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let database_url = env("DATABASE_URL").unwrap_or(defaults.database_url);

        let port = Self::parse_cli_value(args, "--port")
            .or_else(|| env("PORT"))
            .and_then(|v| parse_or_warn("port", &v))
            .unwrap_or(defaults.port);

        let epsilon = Self::parse_cli_value(args, "--epsilon")
            .or_else(|| env("STRATEGY_EPSILON"))
            .and_then(|v| parse_or_warn::<f64>("epsilon", &v))
            .map(clamp_epsilon)
            .unwrap_or(defaults.epsilon);

        let generation_timeout_secs = env("GENERATION_TIMEOUT_SECS")
            .and_then(|v| parse_or_warn("generation timeout", &v))
            .unwrap_or(defaults.generation_timeout_secs);

        Config {
            database_url,
            port,
            static_dir: env("STATIC_DIR").map(PathBuf::from),
            epsilon,
            gemini_api_key: env("GEMINI_API_KEY"),
            gemini_model: env("GEMINI_MODEL").unwrap_or(defaults.gemini_model),
            qwen_ollama_url: env("QWEN_OLLAMA_URL").unwrap_or(defaults.qwen_ollama_url),
            qwen_model: env("QWEN_MODEL_NAME").unwrap_or(defaults.qwen_model),
            generation_timeout_secs,
        }
    }

    /// Parse a CLI flag value like `--port 8080`.
    fn parse_cli_value(args: &[String], flag: &str) -> Option<String> {
        args.windows(2).find_map(|pair| {
            if pair[0] == flag {
                Some(pair[1].clone())
            } else {
                None
            }
        })
    }
}

fn parse_or_warn<T: std::str::FromStr>(what: &str, raw: &str) -> Option<T> {
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!("Ignoring invalid {what} value {raw:?}, using default");
            None
        }
    }
}
