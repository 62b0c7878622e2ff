use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

/// Fixed 8-item list used whenever the language service is unavailable or
/// returns something we cannot trust. The rest of the pipeline always gets
/// valid input.
pub const FALLBACK_ITEMS: [&str; 8] = [
    "paper clip",
    "stapler",
    "pen",
    "calculator",
    "folder",
    "notebook",
    "scissors",
    "ruler",
];

const SYSTEM_PROMPT: &str = r#"Convert the user input into exactly 8 concrete, physical objects that would make good icons.

Examples:
Input: "office supplies" -> ["paper clip", "stapler", "pen", "calculator", "folder", "notebook", "scissors", "ruler"]
Input: "sports" -> ["ball", "trophy", "whistle", "stopwatch", "medal", "helmet", "shoes", "goal"]

Rules:
- Always return exactly 8 items
- Items must be recognizable physical objects
- Suitable for icon design (simple, clear shapes)
- Different objects, not variations of the same thing
- Return JSON array only, no explanation"#;

/// One language-completion call. Behind a trait so tests can swap in a
/// canned or failing backend without a network.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> anyhow::Result<String>;
}

pub struct OpenAiClient {
    client: Client,
    api_key: String,
    model: String,
    timeout: Duration,
}

impl OpenAiClient {
    pub fn new(api_key: String, model: String, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model,
            timeout,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl CompletionBackend for OpenAiClient {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> anyhow::Result<String> {
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system_prompt },
                { "role": "user", "content": user_prompt },
            ],
            "temperature": 0.3,
            "max_tokens": 200,
        });

        let response = self
            .client
            .post("https://api.openai.com/v1/chat/completions")
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!("completion failed: status={status} body={error_body}");
        }

        let parsed: ChatCompletionResponse = response.json().await?;
        let content = parsed
            .choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| anyhow::anyhow!("empty completion response"))?;
        Ok(content.to_string())
    }
}

/// Expands free text into exactly 8 concrete icon subjects. Infallible by
/// contract: every failure path lands on the fallback list.
pub struct ItemExpander {
    backend: Option<Box<dyn CompletionBackend>>,
    fallback_mode: bool,
}

impl ItemExpander {
    pub fn new(backend: Option<Box<dyn CompletionBackend>>, fallback_mode: bool) -> Self {
        Self {
            backend,
            fallback_mode,
        }
    }

    pub async fn expand(&self, user_input: &str) -> Vec<String> {
        let backend = match (&self.backend, self.fallback_mode) {
            (Some(backend), false) => backend,
            _ => {
                warn!("⚠️ Using fallback items for \"{}\" - completion service not available", user_input);
                return fallback_items();
            }
        };

        let user_prompt = format!("Expand \"{user_input}\" into 8 objects. Return JSON array only.");
        match backend.complete(SYSTEM_PROMPT, &user_prompt).await {
            Ok(content) => match parse_item_array(&content) {
                Ok(items) => {
                    debug!("Expanded \"{}\" to {:?}", user_input, items);
                    items
                }
                Err(reason) => {
                    warn!("⚠️ Expansion response rejected ({reason}), using fallback items");
                    fallback_items()
                }
            },
            Err(e) => {
                warn!("⚠️ Expansion call failed ({e}), using fallback items");
                fallback_items()
            }
        }
    }
}

fn fallback_items() -> Vec<String> {
    info!("📦 Serving the fixed 8-item fallback list");
    FALLBACK_ITEMS.iter().map(|s| s.to_string()).collect()
}

/// Accepts only a JSON array of exactly 8 non-empty strings; trims each.
fn parse_item_array(content: &str) -> Result<Vec<String>, String> {
    let items: Vec<String> =
        serde_json::from_str(content).map_err(|e| format!("not a JSON string array: {e}"))?;
    if items.len() != 8 {
        return Err(format!("expected 8 items, got {}", items.len()));
    }
    let trimmed: Vec<String> = items.iter().map(|s| s.trim().to_string()).collect();
    if trimmed.iter().any(|s| s.is_empty()) {
        return Err("blank item in response".into());
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CannedBackend(anyhow::Result<&'static str>);

    #[async_trait]
    impl CompletionBackend for CannedBackend {
        async fn complete(&self, _system: &str, _user: &str) -> anyhow::Result<String> {
            match &self.0 {
                Ok(s) => Ok(s.to_string()),
                Err(e) => Err(anyhow::anyhow!("{e}")),
            }
        }
    }

    fn expander_with(result: anyhow::Result<&'static str>) -> ItemExpander {
        ItemExpander::new(Some(Box::new(CannedBackend(result))), false)
    }

    #[tokio::test]
    async fn no_backend_returns_fallback_verbatim() {
        let expander = ItemExpander::new(None, false);
        assert_eq!(expander.expand("office").await, FALLBACK_ITEMS.to_vec());
        assert_eq!(
            expander.expand("completely unknown category").await,
            FALLBACK_ITEMS.to_vec()
        );
    }

    #[tokio::test]
    async fn fallback_mode_skips_the_backend() {
        struct Unreachable;
        #[async_trait]
        impl CompletionBackend for Unreachable {
            async fn complete(&self, _s: &str, _u: &str) -> anyhow::Result<String> {
                panic!("backend must not be called in fallback mode");
            }
        }
        let expander = ItemExpander::new(Some(Box::new(Unreachable)), true);
        assert_eq!(expander.expand("sports").await, FALLBACK_ITEMS.to_vec());
    }

    #[tokio::test]
    async fn well_formed_response_is_trimmed_and_returned() {
        let expander = expander_with(Ok(
            r#"[" guitar ", "piano", "violin", "drums", "microphone", "headphones", "speaker", "note"]"#,
        ));
        let items = expander.expand("music").await;
        assert_eq!(items[0], "guitar");
        assert_eq!(items.len(), 8);
        assert!(items.iter().all(|i| !i.is_empty() && i.trim() == i));
    }

    #[tokio::test]
    async fn wrong_length_falls_back() {
        let expander = expander_with(Ok(r#"["guitar", "piano"]"#));
        assert_eq!(expander.expand("music").await, FALLBACK_ITEMS.to_vec());
    }

    #[tokio::test]
    async fn prose_instead_of_json_falls_back() {
        let expander = expander_with(Ok("Sure! Here are eight items: guitar, piano..."));
        assert_eq!(expander.expand("music").await, FALLBACK_ITEMS.to_vec());
    }

    #[tokio::test]
    async fn blank_item_falls_back() {
        let expander = expander_with(Ok(
            r#"["guitar", "  ", "violin", "drums", "microphone", "headphones", "speaker", "note"]"#,
        ));
        assert_eq!(expander.expand("music").await, FALLBACK_ITEMS.to_vec());
    }

    #[tokio::test]
    async fn backend_error_never_propagates() {
        let expander = expander_with(Err(anyhow::anyhow!("API Error")));
        assert_eq!(expander.expand("music").await, FALLBACK_ITEMS.to_vec());
    }

    #[tokio::test]
    async fn non_ascii_and_empty_inputs_still_yield_eight() {
        let expander = ItemExpander::new(None, false);
        let long = "long ".repeat(200);
        for input in ["", "   ", "音楽🎸", long.as_str()] {
            let items = expander.expand(input).await;
            assert_eq!(items.len(), 8);
            assert!(items.iter().all(|i| !i.trim().is_empty()));
        }
    }
}
