use image::{DynamicImage, RgbImage};
use rand::{rngs::StdRng, SeedableRng};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::task;

use crate::{
    diptych::{self, Diptych, NormalizedImage},
    error::{EditError, Result},
    models::EditParams,
    pipeline::{InferenceRequest, PipelineLoader, PipelineManager},
    storage::ResultStore,
};

/// Result of one edit.
#[derive(Debug, Clone)]
pub struct EditOutcome {
    pub image: RgbImage,
    pub seed: u64,
    pub path: PathBuf,
    pub warnings: Vec<String>,
}

/// Turns an uploaded image and an instruction into one fill call and keeps
/// the generated right half.
pub struct Editor {
    pipelines: PipelineManager,
    store: ResultStore,
    rng: Mutex<StdRng>,
}

/// Build the single pipeline call for a prepared diptych.
pub fn build_request(
    diptych: &Diptych,
    prompt: &str,
    params: &EditParams,
    seed: u64,
) -> InferenceRequest {
    InferenceRequest {
        prompt: diptych::build_instruction(prompt),
        image: diptych.image.clone(),
        mask_image: diptych.mask.clone(),
        height: diptych.height(),
        width: diptych.width(),
        guidance_scale: params.guidance_scale,
        num_inference_steps: params.num_inference_steps,
        seed,
    }
}

impl Editor {
    pub fn new(loader: Arc<dyn PipelineLoader>) -> Self {
        Self::with_rng(loader, StdRng::from_entropy())
    }

    /// Use a specific RNG for seed randomization.
    pub fn with_rng(loader: Arc<dyn PipelineLoader>, rng: StdRng) -> Self {
        Self {
            pipelines: PipelineManager::new(loader),
            store: ResultStore::new(),
            rng: Mutex::new(rng),
        }
    }

    pub fn pipelines(&self) -> &PipelineManager {
        &self.pipelines
    }

    fn resolve_seed(&self, params: &EditParams) -> u64 {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        diptych::resolve_seed(params.seed, params.randomize_seed, &mut *rng)
    }

    pub async fn edit(
        &self,
        source: &DynamicImage,
        prompt: &str,
        params: &EditParams,
    ) -> Result<EditOutcome> {
        params.validate()?;

        // Resizing and encoding are CPU-bound; keep them off the async workers.
        let source = source.clone();
        let (normalized, diptych) = task::spawn_blocking(move || {
            let normalized: NormalizedImage = diptych::normalize(&source)?;
            let diptych = diptych::compose(&normalized);
            Ok::<_, EditError>((normalized, diptych))
        })
        .await??;
        let warnings: Vec<String> = normalized.warning().into_iter().collect();

        let seed = self.resolve_seed(params);
        log::info!(
            "🎨 Editing {}x{} diptych with seed {}: {:?}",
            diptych.width(),
            diptych.height(),
            seed,
            prompt
        );

        let request = build_request(&diptych, prompt, params, seed);
        let output = self
            .pipelines
            .run(&params.pipeline, request)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| EditError::Inference("No images generated".into()))?;

        let store = self.store.clone();
        let dir = params.output_dir.clone();
        let (panel_width, height) = (diptych.panel_width, diptych.height());
        let (image, path) = task::spawn_blocking(move || {
            let image = diptych::crop_result(&output, panel_width, height)?;
            let path = store.save(&dir, &image)?;
            Ok::<_, EditError>((image, path))
        })
        .await??;

        Ok(EditOutcome {
            image,
            seed,
            path,
            warnings,
        })
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.pipelines.shutdown().await
    }
}
