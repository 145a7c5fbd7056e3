use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::common::EditParams;

/// Body of `POST /api/edit`. Everything except the image and prompt falls
/// back to the configured defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct EditRequest {
    /// Base64 image, optionally as a `data:` URL.
    pub image: String,
    #[serde(default)]
    pub prompt: String,
    pub seed: Option<u64>,
    pub randomize_seed: Option<bool>,
    pub guidance_scale: Option<f32>,
    pub num_inference_steps: Option<u32>,
    pub output_dir: Option<String>,
    pub model_path: Option<String>,
    pub lora_path: Option<String>,
    pub cpu_offload: Option<bool>,
}

impl EditRequest {
    /// Overlay the fields present in the request on `defaults`.
    pub fn params(&self, defaults: &EditParams) -> EditParams {
        let mut params = defaults.clone();
        if let Some(seed) = self.seed {
            params.seed = seed;
        }
        if let Some(randomize) = self.randomize_seed {
            params.randomize_seed = randomize;
        }
        if let Some(guidance) = self.guidance_scale {
            params.guidance_scale = guidance;
        }
        if let Some(steps) = self.num_inference_steps {
            params.num_inference_steps = steps;
        }
        if let Some(dir) = non_blank(&self.output_dir) {
            params.output_dir = PathBuf::from(dir);
        }
        if let Some(model) = non_blank(&self.model_path) {
            params.pipeline.model_path = model.to_string();
        }
        if let Some(lora) = non_blank(&self.lora_path) {
            params.pipeline.lora_path = lora.to_string();
        }
        if let Some(offload) = self.cpu_offload {
            params.pipeline.cpu_offload = offload;
        }
        params
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditResponse {
    pub request_id: String,
    /// Base64 PNG of the edited image.
    pub image: String,
    pub seed: u64,
    pub path: String,
    pub width: u32,
    pub height: u32,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub pipeline_loaded: bool,
    pub version: String,
}
