//! Fill pipeline hosted by a diffusion worker, reached over HTTP.
//!
//! The worker owns the GPU and the pretrained weights. This side loads a
//! pipeline once, then sends composites and masks as base64 PNG.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{EncodableLayout, ImageBuffer, ImageFormat, Pixel, PixelWithColorType, RgbImage};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::io::Cursor;
use std::sync::Arc;

use crate::{
    config::PipelineConfig,
    error::{EditError, Result},
    models::PipelineSpec,
};

use super::{FillPipeline, InferenceRequest, PipelineLoader};

#[derive(Debug, Serialize, PartialEq)]
pub struct FillPayload {
    pub prompt: String,
    pub image: String,
    pub mask_image: String,
    pub height: u32,
    pub width: u32,
    pub guidance_scale: f32,
    pub num_inference_steps: u32,
    pub seed: u64,
}

#[derive(Debug, Deserialize)]
pub struct FillResponse {
    pub images: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct LoadResponse {
    pipeline_id: String,
}

impl FillPayload {
    pub fn from_request(request: &InferenceRequest) -> Result<Self> {
        Ok(FillPayload {
            prompt: request.prompt.clone(),
            image: encode_png(&request.image)?,
            mask_image: encode_png(&request.mask_image)?,
            height: request.height,
            width: request.width,
            guidance_scale: request.guidance_scale,
            num_inference_steps: request.num_inference_steps,
            seed: request.seed,
        })
    }
}

impl FillResponse {
    pub fn decode_images(&self) -> Result<Vec<RgbImage>> {
        if self.images.is_empty() {
            return Err(EditError::Inference("No images generated".into()));
        }

        self.images
            .iter()
            .map(|encoded| {
                let bytes = STANDARD
                    .decode(encoded)
                    .map_err(|e| EditError::Inference(format!("invalid base64 image: {}", e)))?;
                let image = image::load_from_memory(&bytes).map_err(|e| {
                    EditError::Inference(format!("worker returned an undecodable image: {}", e))
                })?;
                Ok(image.to_rgb8())
            })
            .collect()
    }
}

/// Encode an image as base64 PNG for the wire.
pub fn encode_png<P>(image: &ImageBuffer<P, Vec<P::Subpixel>>) -> Result<String>
where
    P: Pixel + PixelWithColorType,
    [P::Subpixel]: EncodableLayout,
{
    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, ImageFormat::Png)
        .map_err(|e| EditError::Inference(format!("failed to encode image: {}", e)))?;
    Ok(STANDARD.encode(buffer.into_inner()))
}

fn base_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

async fn error_body(response: reqwest::Response) -> String {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    format!("worker responded {}: {}", status, text)
}

#[derive(Clone)]
pub struct RemoteLoader {
    client: Client,
    base_url: String,
}

impl RemoteLoader {
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        if config.inference_url.trim().is_empty() {
            return Err(EditError::Config("Inference worker URL is required".into()));
        }
        Ok(Self {
            client: Client::new(),
            base_url: base_url(&config.inference_url),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl PipelineLoader for RemoteLoader {
    async fn load(&self, spec: &PipelineSpec) -> Result<Arc<dyn FillPipeline>> {
        let load_error = |reason: String| EditError::PipelineLoad {
            model: spec.model_path.clone(),
            lora: spec.lora_path.clone(),
            reason,
        };

        let payload = json!({
            "model": spec.model_path,
            "lora": spec.lora_path,
            "cpu_offload": spec.cpu_offload,
            "dtype": "bfloat16"
        });

        let response = self
            .client
            .post(&format!("{}/v1/pipelines", self.base_url))
            .json(&payload)
            .send()
            .await
            .map_err(|e| load_error(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(load_error(error_body(response).await));
        }

        let loaded: LoadResponse = response
            .json()
            .await
            .map_err(|e| load_error(format!("invalid response: {}", e)))?;

        log::info!("✅ Worker loaded pipeline {}", loaded.pipeline_id);

        Ok(Arc::new(RemoteFillPipeline {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            pipeline_id: loaded.pipeline_id,
        }))
    }
}

pub struct RemoteFillPipeline {
    client: Client,
    base_url: String,
    pipeline_id: String,
}

impl RemoteFillPipeline {
    pub fn pipeline_id(&self) -> &str {
        &self.pipeline_id
    }

    fn url(&self, suffix: &str) -> String {
        format!("{}/v1/pipelines/{}{}", self.base_url, self.pipeline_id, suffix)
    }
}

#[async_trait]
impl FillPipeline for RemoteFillPipeline {
    async fn fill(&self, request: InferenceRequest) -> Result<Vec<RgbImage>> {
        let payload = FillPayload::from_request(&request)?;
        log::debug!(
            "Fill request: {}x{}, guidance {}, {} steps, seed {}",
            payload.width,
            payload.height,
            payload.guidance_scale,
            payload.num_inference_steps,
            payload.seed
        );

        let response = self
            .client
            .post(&self.url("/fill"))
            .json(&payload)
            .send()
            .await
            .map_err(|e| EditError::Inference(format!("worker request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(EditError::Inference(error_body(response).await));
        }

        let body: FillResponse = response
            .json()
            .await
            .map_err(|e| EditError::Inference(format!("invalid worker response: {}", e)))?;

        body.decode_images()
    }

    async fn unload(&self) -> Result<()> {
        let response = self.client.delete(&self.url("")).send().await?;
        if !response.status().is_success() {
            return Err(EditError::Inference(error_body(response).await));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb};

    fn decode_mask(encoded: &str) -> Result<GrayImage> {
        let bytes = STANDARD
            .decode(encoded)
            .map_err(|e| EditError::Inference(format!("invalid base64 mask: {}", e)))?;
        image::load_from_memory(&bytes)
            .map(|image| image.to_luma8())
            .map_err(EditError::ImageDecode)
    }

    fn request() -> InferenceRequest {
        let mut mask = GrayImage::new(16, 8);
        for x in 8..16 {
            for y in 0..8 {
                mask.put_pixel(x, y, Luma([255]));
            }
        }
        InferenceRequest {
            prompt: "A diptych".into(),
            image: RgbImage::from_pixel(16, 8, Rgb([1, 2, 3])),
            mask_image: mask,
            height: 8,
            width: 16,
            guidance_scale: 50.0,
            num_inference_steps: 28,
            seed: 42,
        }
    }

    #[test]
    fn test_payload_carries_parameters() {
        let payload = FillPayload::from_request(&request()).unwrap();
        let value = serde_json::to_value(&payload).unwrap();

        assert_eq!(value["prompt"], "A diptych");
        assert_eq!(value["height"], 8);
        assert_eq!(value["width"], 16);
        assert_eq!(value["guidance_scale"], 50.0);
        assert_eq!(value["num_inference_steps"], 28);
        assert_eq!(value["seed"], 42);
    }

    #[test]
    fn test_payload_images_are_png() {
        let payload = FillPayload::from_request(&request()).unwrap();

        let mask = decode_mask(&payload.mask_image).unwrap();
        assert_eq!(mask.dimensions(), (16, 8));
        assert_eq!(mask.get_pixel(0, 0).0[0], 0);
        assert_eq!(mask.get_pixel(15, 7).0[0], 255);

        let bytes = STANDARD.decode(&payload.image).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Png);
    }

    #[test]
    fn test_response_decoding() {
        let encoded = encode_png(&RgbImage::from_pixel(4, 2, Rgb([9, 9, 9]))).unwrap();
        let response = FillResponse {
            images: vec![encoded],
        };
        let images = response.decode_images().unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].get_pixel(3, 1), &Rgb([9, 9, 9]));
    }

    #[test]
    fn test_empty_response_is_an_error() {
        let response = FillResponse { images: vec![] };
        assert!(matches!(
            response.decode_images(),
            Err(EditError::Inference(_))
        ));

        let response = FillResponse {
            images: vec!["not base64!".into()],
        };
        assert!(response.decode_images().is_err());
    }

    #[test]
    fn test_loader_normalizes_url() {
        let config = PipelineConfig::new().with_inference_url("http://worker:8000/");
        let loader = RemoteLoader::new(&config).unwrap();
        assert_eq!(loader.base_url(), "http://worker:8000");

        let config = PipelineConfig::new().with_inference_url("");
        assert!(RemoteLoader::new(&config).is_err());
    }
}
