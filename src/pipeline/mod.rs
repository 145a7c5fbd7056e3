//! Boundary to the pretrained fill pipeline.
//!
//! The diffusion model itself is opaque: this crate only hands it a composite,
//! a mask and sampling parameters, and gets images back.

pub mod manager;
pub mod remote;

pub use manager::PipelineManager;
pub use remote::{RemoteFillPipeline, RemoteLoader};

use async_trait::async_trait;
use image::{GrayImage, RgbImage};
use std::sync::Arc;

use crate::{error::Result, models::PipelineSpec};

/// Everything one fill call needs. Consumed by the call.
#[derive(Debug, Clone)]
pub struct InferenceRequest {
    pub prompt: String,
    pub image: RgbImage,
    pub mask_image: GrayImage,
    pub height: u32,
    pub width: u32,
    pub guidance_scale: f32,
    pub num_inference_steps: u32,
    pub seed: u64,
}

#[async_trait]
pub trait FillPipeline: Send + Sync {
    /// Run the pipeline once. Returns at least one image on success.
    async fn fill(&self, request: InferenceRequest) -> Result<Vec<RgbImage>>;

    /// Release the model. Called before the pipeline is replaced or the
    /// process exits.
    async fn unload(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
pub trait PipelineLoader: Send + Sync {
    async fn load(&self, spec: &PipelineSpec) -> Result<Arc<dyn FillPipeline>>;
}
