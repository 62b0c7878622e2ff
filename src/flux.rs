use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Client;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::models::UsageSnapshot;
use crate::ratelimit::RateLimiter;

const MODEL_URL: &str =
    "https://api.replicate.com/v1/models/black-forest-labs/flux-schnell/predictions";
pub const COST_PER_IMAGE: f64 = 0.003;

// --- Error taxonomy ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FluxErrorCode {
    AuthenticationError,
    RateLimitExceeded,
    InvalidInput,
    PollingTimeout,
    NetworkError,
    UnknownError,
}

impl FluxErrorCode {
    /// Authentication can never succeed on retry; invalid input never left
    /// the process in the first place. Everything else is worth re-trying.
    pub fn retryable(&self) -> bool {
        !matches!(
            self,
            FluxErrorCode::AuthenticationError | FluxErrorCode::InvalidInput
        )
    }
}

impl fmt::Display for FluxErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FluxErrorCode::AuthenticationError => "AUTHENTICATION_ERROR",
            FluxErrorCode::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            FluxErrorCode::InvalidInput => "INVALID_INPUT",
            FluxErrorCode::PollingTimeout => "POLLING_TIMEOUT",
            FluxErrorCode::NetworkError => "NETWORK_ERROR",
            FluxErrorCode::UnknownError => "UNKNOWN_ERROR",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
#[error("[{code}] {message} (request {request_id})")]
pub struct FluxError {
    pub code: FluxErrorCode,
    pub message: String,
    pub request_id: String,
}

impl FluxError {
    fn new(code: FluxErrorCode, message: impl Into<String>, request_id: &str) -> Self {
        Self {
            code,
            message: message.into(),
            request_id: request_id.to_string(),
        }
    }
}

/// Maps a raw failure message onto the taxonomy by known substrings.
/// Anything unmatched is UNKNOWN_ERROR, never dropped.
pub fn classify(message: &str) -> FluxErrorCode {
    let lower = message.to_lowercase();
    if lower.contains("authentication") || lower.contains("unauthorized") {
        FluxErrorCode::AuthenticationError
    } else if lower.contains("rate limit") {
        FluxErrorCode::RateLimitExceeded
    } else if lower.contains("invalid") {
        FluxErrorCode::InvalidInput
    } else if lower.contains("timeout") || lower.contains("timed out") {
        FluxErrorCode::PollingTimeout
    } else if lower.contains("network") || lower.contains("connect") {
        FluxErrorCode::NetworkError
    } else {
        FluxErrorCode::UnknownError
    }
}

// --- Request / result ---

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub seed: Option<u32>,
    pub num_inference_steps: Option<u32>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub request_id: Option<String>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            seed: None,
            num_inference_steps: None,
            width: None,
            height: None,
            request_id: None,
        }
    }
}

#[derive(Debug)]
pub struct GenerationResult {
    pub request_id: String,
    pub image_urls: Vec<String>,
    pub cost: f64,
    pub generation_time: Duration,
}

fn validate(request: &GenerationRequest) -> Result<(), String> {
    if request.prompt.trim().is_empty() {
        return Err("Prompt is required and cannot be empty".into());
    }
    if let Some(steps) = request.num_inference_steps {
        if !(1..=12).contains(&steps) {
            return Err("num_inference_steps must be between 1 and 12".into());
        }
    }
    if request.width == Some(0) {
        return Err("Width must be greater than 0".into());
    }
    if request.height == Some(0) {
        return Err("Height must be greater than 0".into());
    }
    Ok(())
}

// --- Output extraction ---

/// What one output element turned out to be, decided by an ordered cascade
/// of total checks. Unrecognized elements are skipped, never fatal.
#[derive(Debug, PartialEq, Eq)]
enum OutputElement {
    PlainUrl(String),
    UrlBearing(String),
    Coerced(String),
    Unrecognized,
}

const URL_KEYS: [&str; 6] = ["url", "href", "src", "link", "uri", "path"];

fn looks_like_url(s: &str) -> bool {
    let s = s.trim();
    s.starts_with("http://")
        || s.starts_with("https://")
        || s.starts_with("data:")
        || s.contains("replicate.delivery")
}

/// Depth-first search for any string value that looks like a URL, for
/// payload shapes we have no schema for.
fn first_url_like_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if looks_like_url(s) => Some(s.trim().to_string()),
        Value::Array(items) => items.iter().find_map(first_url_like_string),
        Value::Object(map) => map.values().find_map(first_url_like_string),
        _ => None,
    }
}

fn classify_element(element: &Value) -> OutputElement {
    // (a) direct string use, (b) skipping null/empty
    if let Value::String(s) = element {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return OutputElement::Unrecognized;
        }
        return OutputElement::PlainUrl(trimmed.to_string());
    }
    if element.is_null() {
        return OutputElement::Unrecognized;
    }
    // (c) well-known URL property names
    if let Value::Object(map) = element {
        for key in URL_KEYS {
            if let Some(Value::String(s)) = map.get(key) {
                if !s.trim().is_empty() {
                    return OutputElement::UrlBearing(s.trim().to_string());
                }
            }
        }
    }
    // (d) generic coercion, accepted only when the result is URL-shaped
    let coerced = match element {
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => first_url_like_string(other),
    };
    match coerced {
        Some(s) if looks_like_url(&s) => OutputElement::Coerced(s),
        // (e) this element yields nothing; the others still get their shot
        _ => OutputElement::Unrecognized,
    }
}

/// Normalizes the generator's loosely-shaped `output` into plain URLs,
/// preserving element order. A single-element (non-array) output is treated
/// as a one-element array.
pub fn extract_image_urls(output: &Value) -> Vec<String> {
    let elements: Vec<&Value> = match output {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    };
    elements
        .into_iter()
        .filter_map(|element| match classify_element(element) {
            OutputElement::PlainUrl(url)
            | OutputElement::UrlBearing(url)
            | OutputElement::Coerced(url) => Some(url),
            OutputElement::Unrecognized => None,
        })
        .collect()
}

// --- Cost tracking ---

#[derive(Debug, Default)]
struct CostTotals {
    images: u64,
    cost: f64,
}

/// Process-lifetime usage counters, shared across requests. Explicitly
/// locked: the per-item generations run on a multi-threaded runtime.
#[derive(Debug, Default)]
pub struct CostTracker {
    totals: Mutex<CostTotals>,
}

impl CostTracker {
    /// Records `count` generated images and returns the cost of this batch.
    pub fn record(&self, count: usize) -> f64 {
        let cost = count as f64 * COST_PER_IMAGE;
        let mut totals = self.totals.lock();
        totals.images += count as u64;
        totals.cost += cost;
        cost
    }

    pub fn snapshot(&self) -> UsageSnapshot {
        let totals = self.totals.lock();
        UsageSnapshot {
            total_images_generated: totals.images,
            total_cost: totals.cost,
            cost_per_image: COST_PER_IMAGE,
        }
    }
}

// --- Transport ---

/// One prediction round-trip, returning the raw `output` payload. Behind a
/// trait so the retry loop is testable without a network.
#[async_trait]
pub trait PredictionTransport: Send + Sync {
    async fn run(&self, input: Value) -> anyhow::Result<Value>;
}

pub struct ReplicateTransport {
    client: Client,
    api_token: String,
    timeout: Duration,
}

impl ReplicateTransport {
    pub fn new(api_token: String, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            api_token,
            timeout,
        }
    }
}

#[async_trait]
impl PredictionTransport for ReplicateTransport {
    async fn run(&self, input: Value) -> anyhow::Result<Value> {
        let response = self
            .client
            .post(MODEL_URL)
            .bearer_auth(&self.api_token)
            .header("Prefer", "wait")
            .timeout(self.timeout)
            .json(&json!({ "input": input }))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    anyhow::anyhow!("prediction timed out: {e}")
                } else if e.is_connect() {
                    anyhow::anyhow!("network error: {e}")
                } else {
                    anyhow::anyhow!("request failed: {e}")
                }
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("authentication failed: status={status} body={body}");
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            anyhow::bail!("rate limit exceeded: status={status}");
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("prediction failed: status={status} body={body}");
        }

        let prediction: Value = response.json().await?;
        if let Some(message) = prediction.get("error").and_then(Value::as_str) {
            anyhow::bail!("prediction error: {message}");
        }
        match prediction.get("status").and_then(Value::as_str) {
            Some("succeeded") => {}
            Some("starting") | Some("processing") => {
                anyhow::bail!("prediction still running after wait window: polling timeout")
            }
            Some(other) => anyhow::bail!("prediction ended with status {other}"),
            None => anyhow::bail!("prediction response missing status"),
        }
        Ok(prediction.get("output").cloned().unwrap_or(Value::Null))
    }
}

// --- Client ---

pub struct FluxClient {
    transport: Option<Box<dyn PredictionTransport>>,
    max_retries: u32,
    base_retry_delay: Duration,
    rate_limiter: RateLimiter,
    cost_tracker: Arc<CostTracker>,
}

fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base * 2u32.saturating_pow(attempt.saturating_sub(1))
}

impl FluxClient {
    /// `transport: None` is demo mode: deterministic seeded stock-image URLs,
    /// no network calls and no cost.
    pub fn new(
        transport: Option<Box<dyn PredictionTransport>>,
        max_retries: u32,
        base_retry_delay: Duration,
        rate_limit_interval: Duration,
        cost_tracker: Arc<CostTracker>,
    ) -> Self {
        Self {
            transport,
            max_retries: max_retries.max(1),
            base_retry_delay,
            rate_limiter: RateLimiter::new(rate_limit_interval),
            cost_tracker,
        }
    }

    pub fn usage(&self) -> UsageSnapshot {
        self.cost_tracker.snapshot()
    }

    pub async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResult, FluxError> {
        let request_id = request
            .request_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let started = std::time::Instant::now();

        validate(&request)
            .map_err(|msg| FluxError::new(FluxErrorCode::InvalidInput, msg, &request_id))?;

        let transport = match &self.transport {
            Some(transport) => transport,
            None => {
                info!("📦 Demo mode - serving seeded stock image for request {request_id}");
                let seed = request.seed.unwrap_or_default();
                return Ok(GenerationResult {
                    request_id,
                    image_urls: vec![format!("https://picsum.photos/seed/{seed}/512/512")],
                    cost: 0.0,
                    generation_time: started.elapsed(),
                });
            }
        };

        let mut input = json!({
            "prompt": request.prompt,
            "go_fast": true,
            "megapixels": "1",
            "num_outputs": 1,
            "aspect_ratio": "1:1",
            "output_format": "webp",
            "output_quality": 80,
            "num_inference_steps": request.num_inference_steps.unwrap_or(4),
        });
        if let Some(seed) = request.seed {
            input["seed"] = json!(seed);
        }

        let output = self
            .run_with_retry(transport.as_ref(), input, &request_id)
            .await?;

        let image_urls = extract_image_urls(&output);
        if image_urls.is_empty() {
            return Err(FluxError::new(
                FluxErrorCode::UnknownError,
                "No images generated",
                &request_id,
            ));
        }

        let cost = self.cost_tracker.record(image_urls.len());
        info!(
            "✅ Request {} generated {} image(s) in {:?}",
            request_id,
            image_urls.len(),
            started.elapsed()
        );
        Ok(GenerationResult {
            request_id,
            image_urls,
            cost,
            generation_time: started.elapsed(),
        })
    }

    async fn run_with_retry(
        &self,
        transport: &dyn PredictionTransport,
        input: Value,
        request_id: &str,
    ) -> Result<Value, FluxError> {
        let mut last_error = None;
        for attempt in 1..=self.max_retries {
            self.rate_limiter.wait().await;
            match transport.run(input.clone()).await {
                Ok(output) => return Ok(output),
                Err(e) => {
                    let message = e.to_string();
                    let code = classify(&message);
                    let failure = FluxError::new(code, message, request_id);
                    if !code.retryable() {
                        error!("❌ Attempt {attempt} aborted: {failure}");
                        return Err(failure);
                    }
                    warn!("⚠️ Attempt {attempt}/{} failed: {failure}", self.max_retries);
                    last_error = Some(failure);
                    if attempt < self.max_retries {
                        tokio::time::sleep(backoff_delay(self.base_retry_delay, attempt)).await;
                    }
                }
            }
        }
        // max_retries >= 1, so at least one attempt recorded an error
        Err(last_error.unwrap_or_else(|| {
            FluxError::new(FluxErrorCode::UnknownError, "no attempts made", request_id)
        }))
    }
}
