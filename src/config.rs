use std::time::Duration;

/// Environment-backed configuration, resolved once at startup and injected
/// into the components that need it. Nothing reads `std::env` after this.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub openai_api_key: Option<String>,
    pub replicate_api_token: Option<String>,
    pub openai_model: String,
    /// Language-completion call timeout.
    pub api_timeout: Duration,
    /// Image-generation call timeout (image generation takes longer).
    pub replicate_timeout: Duration,
    pub max_retries: u32,
    pub base_retry_delay: Duration,
    /// Minimum interval between image-generation dispatches.
    pub rate_limit_interval: Duration,
    /// Demo mode: fallback items + seeded stock-image URLs, no external calls.
    pub fallback_mode: bool,
    pub port: u16,
}

fn env_ms(key: &str, default_ms: u64) -> Duration {
    let ms = std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default_ms);
    Duration::from_millis(ms)
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            openai_api_key: env_var("OPENAI_API_KEY"),
            replicate_api_token: env_var("REPLICATE_API_TOKEN"),
            openai_model: env_var("OPENAI_MODEL").unwrap_or_else(|| "gpt-4o-mini".into()),
            api_timeout: env_ms("API_TIMEOUT", 10_000),
            replicate_timeout: env_ms("REPLICATE_API_TIMEOUT", 30_000),
            max_retries: std::env::var("MAX_RETRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3),
            base_retry_delay: env_ms("BASE_RETRY_DELAY_MS", 1_000),
            rate_limit_interval: env_ms("RATE_LIMIT_MS", 200),
            fallback_mode: std::env::var("FALLBACK_MODE")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            port: std::env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8080),
        }
    }

    /// The image credential is the one the pipeline cannot run without; in
    /// fallback mode no external call is made so nothing is required.
    pub fn missing_image_credential(&self) -> bool {
        !self.fallback_mode && self.replicate_api_token.is_none()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            replicate_api_token: None,
            openai_model: "gpt-4o-mini".into(),
            api_timeout: Duration::from_millis(10_000),
            replicate_timeout: Duration::from_millis(30_000),
            max_retries: 3,
            base_retry_delay: Duration::from_millis(1_000),
            rate_limit_interval: Duration::from_millis(200),
            fallback_mode: false,
            port: 8080,
        }
    }
}
