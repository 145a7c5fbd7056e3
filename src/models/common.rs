use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::{
    config::{Config, PipelineConfig},
    diptych::MAX_SEED,
    error::{EditError, Result},
};

pub const GUIDANCE_RANGE: std::ops::RangeInclusive<f32> = 1.0..=50.0;
pub const STEPS_RANGE: std::ops::RangeInclusive<u32> = 1..=50;

/// Construction parameters of a fill pipeline. Two requests with equal specs
/// can share one loaded pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PipelineSpec {
    pub model_path: String,
    pub lora_path: String,
    pub cpu_offload: bool,
}

impl From<&PipelineConfig> for PipelineSpec {
    fn from(config: &PipelineConfig) -> Self {
        PipelineSpec {
            model_path: config.model_path.clone(),
            lora_path: config.lora_path.clone(),
            cpu_offload: config.cpu_offload,
        }
    }
}

/// Fully resolved parameters of one edit.
#[derive(Debug, Clone, PartialEq)]
pub struct EditParams {
    pub seed: u64,
    pub randomize_seed: bool,
    pub guidance_scale: f32,
    pub num_inference_steps: u32,
    pub output_dir: PathBuf,
    pub pipeline: PipelineSpec,
}

impl EditParams {
    pub fn from_config(config: &Config) -> Self {
        EditParams {
            seed: config.defaults.seed,
            randomize_seed: config.defaults.randomize_seed,
            guidance_scale: config.defaults.guidance_scale,
            num_inference_steps: config.defaults.num_inference_steps,
            output_dir: config.output_dir.clone(),
            pipeline: PipelineSpec::from(&config.pipeline),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self.randomize_seed = false;
        self
    }

    pub fn with_random_seed(mut self) -> Self {
        self.randomize_seed = true;
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.seed > MAX_SEED {
            return Err(EditError::invalid(
                "seed",
                format!("must be between 0 and {}", MAX_SEED),
            ));
        }
        if !GUIDANCE_RANGE.contains(&self.guidance_scale) {
            return Err(EditError::invalid(
                "guidance_scale",
                format!(
                    "must be between {} and {}",
                    GUIDANCE_RANGE.start(),
                    GUIDANCE_RANGE.end()
                ),
            ));
        }
        if !STEPS_RANGE.contains(&self.num_inference_steps) {
            return Err(EditError::invalid(
                "num_inference_steps",
                format!(
                    "must be between {} and {}",
                    STEPS_RANGE.start(),
                    STEPS_RANGE.end()
                ),
            ));
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(EditError::invalid("output_dir", "must not be empty"));
        }
        if self.pipeline.model_path.trim().is_empty() {
            return Err(EditError::invalid("model_path", "must not be empty"));
        }
        if self.pipeline.lora_path.trim().is_empty() {
            return Err(EditError::invalid("lora_path", "must not be empty"));
        }
        Ok(())
    }
}
