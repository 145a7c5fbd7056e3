use crate::{
    diptych::MAX_SEED,
    error::{EditError, Result},
};
use std::env;
use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 7860;
pub const DEFAULT_MODEL_PATH: &str = "black-forest-labs/flux.1-fill-dev";
pub const DEFAULT_LORA_PATH: &str = "sanaka87/ICEdit-MoE-LoRA";
pub const DEFAULT_OUTPUT_DIR: &str = "edit_results";

/// Where the fill pipeline lives and how it is constructed.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub inference_url: String,
    pub model_path: String,
    pub lora_path: String,
    pub cpu_offload: bool,
}

/// Values used when a request leaves a sampling parameter out.
#[derive(Debug, Clone, PartialEq)]
pub struct EditDefaults {
    pub seed: u64,
    pub randomize_seed: bool,
    pub guidance_scale: f32,
    pub num_inference_steps: u32,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: Option<u16>,
    pub host: String,
    pub output_dir: PathBuf,
    pub pipeline: PipelineConfig,
    pub defaults: EditDefaults,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            inference_url: "http://127.0.0.1:8000".to_string(),
            model_path: DEFAULT_MODEL_PATH.to_string(),
            lora_path: DEFAULT_LORA_PATH.to_string(),
            cpu_offload: false,
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let defaults = Self::default();
        PipelineConfig {
            inference_url: env::var("INFERENCE_URL").unwrap_or(defaults.inference_url),
            model_path: env::var("MODEL_PATH").unwrap_or(defaults.model_path),
            lora_path: env::var("LORA_PATH").unwrap_or(defaults.lora_path),
            cpu_offload: env::var("CPU_OFFLOAD").ok().map_or(false, |val| parse_flag(&val)),
        }
    }

    pub fn with_inference_url(mut self, url: impl Into<String>) -> Self {
        self.inference_url = url.into();
        self
    }

    pub fn with_weights(mut self, model_path: impl Into<String>, lora_path: impl Into<String>) -> Self {
        self.model_path = model_path.into();
        self.lora_path = lora_path.into();
        self
    }

    pub fn with_cpu_offload(mut self, enabled: bool) -> Self {
        self.cpu_offload = enabled;
        self
    }
}

impl Default for EditDefaults {
    fn default() -> Self {
        EditDefaults {
            seed: 0,
            randomize_seed: true,
            guidance_scale: 50.0,
            num_inference_steps: 28,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: None,
            host: "0.0.0.0".to_string(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            pipeline: PipelineConfig::default(),
            defaults: EditDefaults::default(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let port = env::var("PORT").ok().and_then(|port| port.parse().ok());
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let output_dir = env::var("OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_OUTPUT_DIR));

        Config {
            port,
            host,
            output_dir,
            pipeline: PipelineConfig::from_env(),
            defaults: EditDefaults::default(),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_pipeline(mut self, config: PipelineConfig) -> Self {
        self.pipeline = config;
        self
    }

    pub fn with_defaults(mut self, defaults: EditDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    pub fn validate(&self) -> Result<()> {
        if self.pipeline.inference_url.trim().is_empty() {
            return Err(EditError::Config("INFERENCE_URL must not be empty".into()));
        }
        if self.pipeline.model_path.trim().is_empty() {
            return Err(EditError::Config("model path must not be empty".into()));
        }
        if self.defaults.seed > MAX_SEED {
            return Err(EditError::Config(format!(
                "default seed {} exceeds {}",
                self.defaults.seed, MAX_SEED
            )));
        }
        Ok(())
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
