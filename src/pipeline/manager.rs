use image::RgbImage;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::{error::Result, logger, models::PipelineSpec};

use super::{FillPipeline, InferenceRequest, PipelineLoader};

struct Loaded {
    spec: PipelineSpec,
    pipeline: Arc<dyn FillPipeline>,
}

/// Holds the one pipeline this process keeps loaded.
///
/// The pipeline is built lazily on first use and reused while requests ask
/// for the same [`PipelineSpec`]. A different spec unloads the current
/// pipeline first. The slot lock is held for the duration of a fill, so
/// loading and inference never overlap.
pub struct PipelineManager {
    loader: Arc<dyn PipelineLoader>,
    slot: Mutex<Option<Loaded>>,
    /// Mirrors `slot.is_some()` so readers never wait on a running fill.
    loaded: AtomicBool,
}

impl PipelineManager {
    pub fn new(loader: Arc<dyn PipelineLoader>) -> Self {
        Self {
            loader,
            slot: Mutex::new(None),
            loaded: AtomicBool::new(false),
        }
    }

    pub async fn run(
        &self,
        spec: &PipelineSpec,
        request: InferenceRequest,
    ) -> Result<Vec<RgbImage>> {
        let mut slot = self.slot.lock().await;

        let cached = slot
            .as_ref()
            .filter(|loaded| &loaded.spec == spec)
            .map(|loaded| loaded.pipeline.clone());

        let pipeline = match cached {
            Some(pipeline) => pipeline,
            None => {
                if let Some(previous) = slot.take() {
                    self.loaded.store(false, Ordering::SeqCst);
                    log::info!(
                        "🔄 Pipeline settings changed, unloading {} + {}",
                        previous.spec.model_path,
                        previous.spec.lora_path
                    );
                    if let Err(e) = previous.pipeline.unload().await {
                        log::warn!("⚠️  Failed to unload previous pipeline: {}", e);
                    }
                }

                log::info!(
                    "📦 Loading pipeline {} with LoRA {} (cpu offload: {})",
                    spec.model_path,
                    spec.lora_path,
                    spec.cpu_offload
                );
                let timer = logger::timer("pipeline load");
                let pipeline = self.loader.load(spec).await?;
                drop(timer);

                *slot = Some(Loaded {
                    spec: spec.clone(),
                    pipeline: pipeline.clone(),
                });
                self.loaded.store(true, Ordering::SeqCst);
                pipeline
            }
        };

        let _timer = logger::timer("pipeline fill");
        pipeline.fill(request).await
    }

    /// True once a load has succeeded, until the pipeline is replaced or shut
    /// down. Does not wait on a running load or fill.
    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }

    pub async fn loaded_spec(&self) -> Option<PipelineSpec> {
        self.slot.lock().await.as_ref().map(|loaded| loaded.spec.clone())
    }

    /// Unload the current pipeline, if any.
    pub async fn shutdown(&self) -> Result<()> {
        if let Some(loaded) = self.slot.lock().await.take() {
            self.loaded.store(false, Ordering::SeqCst);
            log::info!("🛑 Unloading pipeline {}", loaded.spec.model_path);
            loaded.pipeline.unload().await?;
        }
        Ok(())
    }
}
