use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct IconGenerationRequest {
    pub prompt: String,
    pub style: String,
}

/// One finished icon. Created once per item after generation settles
/// (real URL or placeholder), never mutated afterwards.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GeneratedIcon {
    pub id: String,
    pub item: String,
    pub url: String,
    #[serde(rename = "downloadUrl")]
    pub download_url: String,
    pub style: String,
    #[serde(rename = "originalPrompt")]
    pub original_prompt: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ResponseMetadata {
    #[serde(rename = "originalPrompt")]
    pub original_prompt: String,
    pub style: String,
    #[serde(rename = "generatedItems")]
    pub generated_items: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct IconGenerationResponse {
    pub success: bool,
    pub images: Vec<GeneratedIcon>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ResponseMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

/// One selectable style, as the style picker consumes it.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct StyleInfo {
    pub key: String,
    pub label: String,
}

/// Snapshot of the process-lifetime usage counters for `/api/usage`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct UsageSnapshot {
    #[serde(rename = "totalImagesGenerated")]
    pub total_images_generated: u64,
    #[serde(rename = "totalCost")]
    pub total_cost: f64,
    #[serde(rename = "costPerImage")]
    pub cost_per_image: f64,
}
