use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::{IntoResponse, Response}, Json};
use chrono::Utc;
use futures_util::future::join_all;
use tracing::{error, info};

use crate::config::AppConfig;
use crate::expand::ItemExpander;
use crate::flux::{FluxClient, GenerationRequest};
use crate::models::{
    ErrorResponse, GeneratedIcon, IconGenerationRequest, IconGenerationResponse,
    ResponseMetadata, StyleInfo, UsageSnapshot,
};
use crate::prompt::{compose, IconPrompt};
use crate::seed::{derive_base_seed, derive_item_seed};
use crate::styles::StyleKey;

/// Fixed local image substituted when an item's generation permanently fails.
pub const PLACEHOLDER_ICON_URL: &str = "/images/icon-placeholder.svg";

const MIN_PROMPT_CHARS: usize = 2;
const MAX_PROMPT_CHARS: usize = 30;

#[derive(Clone)]
pub struct AppState {
    pub expander: Arc<ItemExpander>,
    pub flux: Arc<FluxClient>,
    pub config: Arc<AppConfig>,
}

fn failure(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            success: false,
            error: message.into(),
        }),
    )
        .into_response()
}

pub async fn generate_icons(
    State(state): State<AppState>,
    Json(body): Json<IconGenerationRequest>,
) -> Response {
    let prompt = body.prompt.trim().to_string();
    if prompt.is_empty() {
        return failure(StatusCode::BAD_REQUEST, "Prompt is required");
    }
    let char_count = prompt.chars().count();
    if !(MIN_PROMPT_CHARS..=MAX_PROMPT_CHARS).contains(&char_count) {
        return failure(
            StatusCode::BAD_REQUEST,
            format!("Prompt must be {MIN_PROMPT_CHARS}-{MAX_PROMPT_CHARS} characters"),
        );
    }

    // Detect missing credentials before any generation work: a request that
    // cannot possibly succeed should not spend quota or time.
    if state.config.missing_image_credential() {
        error!("❌ REPLICATE_API_TOKEN is not configured");
        return failure(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Configuration error: REPLICATE_API_TOKEN is not set",
        );
    }

    let timestamp = Utc::now().timestamp_millis();
    match generate_icon_set(&state, &prompt, &body.style, timestamp).await {
        Ok(response) => Json(response).into_response(),
        Err(message) => {
            error!("❌ Icon generation failed: {message}");
            failure(StatusCode::INTERNAL_SERVER_ERROR, message)
        }
    }
}

/// Runs the whole pipeline for one request: expand once, one base seed, then
/// all eight item generations concurrently. Individual item failures become
/// placeholder icons; only an unknown style fails the request as a whole.
async fn generate_icon_set(
    state: &AppState,
    prompt: &str,
    style: &str,
    timestamp: i64,
) -> Result<IconGenerationResponse, String> {
    info!("🚀 Generating {style} icon set for \"{prompt}\"");

    let items = state.expander.expand(prompt).await;
    let base_seed = derive_base_seed(prompt, style, timestamp);

    // Compose everything up front so a bad style key fails fast, before any
    // image call is dispatched.
    let prompts: Vec<IconPrompt> = items
        .iter()
        .map(|item| compose(item, style))
        .collect::<Result<_, _>>()
        .map_err(|e| e.to_string())?;

    let generations = prompts.iter().enumerate().map(|(index, icon_prompt)| {
        generate_one(state, icon_prompt, index, timestamp, base_seed, prompt)
    });
    let outcomes = join_all(generations).await;

    let successful = outcomes.iter().filter(|(_, ok)| *ok).count();
    let total_cost = state.flux.usage().total_cost;
    info!(
        "✅ Icon set ready: {} requested, {} successful, {} failed, ${:.3} total cost to date",
        outcomes.len(),
        successful,
        outcomes.len() - successful,
        total_cost
    );

    let images: Vec<GeneratedIcon> = outcomes.into_iter().map(|(icon, _)| icon).collect();
    Ok(IconGenerationResponse {
        success: true,
        images,
        metadata: Some(ResponseMetadata {
            original_prompt: prompt.to_string(),
            style: style.to_string(),
            generated_items: items,
        }),
        error: None,
    })
}

/// One item's full journey: item seed, generation call, icon record. The
/// bool reports success for the metrics only.
async fn generate_one(
    state: &AppState,
    icon_prompt: &IconPrompt,
    index: usize,
    timestamp: i64,
    base_seed: u32,
    original_prompt: &str,
) -> (GeneratedIcon, bool) {
    let seed = derive_item_seed(base_seed, index);
    let mut request = GenerationRequest::new(icon_prompt.render());
    request.seed = Some(seed);
    request.request_id = Some(format!("{timestamp}-{index}"));

    match state.flux.generate(request).await {
        Ok(result) => {
            let url = result
                .image_urls
                .into_iter()
                .next()
                .unwrap_or_else(|| PLACEHOLDER_ICON_URL.to_string());
            (
                GeneratedIcon {
                    id: format!("icon-{timestamp}-{index}"),
                    item: icon_prompt.item.clone(),
                    url: url.clone(),
                    download_url: url,
                    style: icon_prompt.style.to_string(),
                    original_prompt: original_prompt.to_string(),
                },
                true,
            )
        }
        Err(e) => {
            error!("❌ Item \"{}\" failed permanently: {e}", icon_prompt.item);
            (
                GeneratedIcon {
                    id: format!("icon-{timestamp}-{index}-error"),
                    item: icon_prompt.item.clone(),
                    url: PLACEHOLDER_ICON_URL.to_string(),
                    download_url: PLACEHOLDER_ICON_URL.to_string(),
                    style: icon_prompt.style.to_string(),
                    original_prompt: original_prompt.to_string(),
                },
                false,
            )
        }
    }
}

pub async fn usage(State(state): State<AppState>) -> Json<UsageSnapshot> {
    Json(state.flux.usage())
}

pub async fn list_styles() -> Json<Vec<StyleInfo>> {
    Json(
        StyleKey::ALL
            .iter()
            .map(|key| StyleInfo {
                key: key.as_str().to_string(),
                label: key.preset().display_label.to_string(),
            })
            .collect(),
    )
}
