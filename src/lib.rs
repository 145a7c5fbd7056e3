//! Instruction-based image editing with a pretrained fill model.
//!
//! An uploaded image is placed on the left of a diptych, the right half is
//! masked, and the fill pipeline (base model + LoRA adapter) paints the right
//! half as the same scene with the requested edit. The right half is the
//! result.
//!
//! ```no_run
//! use std::sync::Arc;
//! use diptych_edit::{Config, EditParams, Editor, RemoteLoader};
//!
//! # async fn run() -> diptych_edit::Result<()> {
//! let config = Config::from_env();
//! let editor = Editor::new(Arc::new(RemoteLoader::new(&config.pipeline)?));
//!
//! let source = image::open("photo.jpg").map_err(diptych_edit::EditError::ImageDecode)?;
//! let params = EditParams::from_config(&config).with_seed(42);
//! let outcome = editor.edit(&source, "make it night", &params).await?;
//! println!("saved {}", outcome.path.display());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod diptych;
pub mod editor;
pub mod error;
pub mod logger;
pub mod models;
pub mod pipeline;
#[cfg(feature = "server")]
pub mod server;
pub mod storage;

pub use config::{Config, EditDefaults, PipelineConfig};
pub use editor::{EditOutcome, Editor};
pub use error::{EditError, Result};
pub use models::*;
pub use pipeline::{FillPipeline, InferenceRequest, PipelineLoader, PipelineManager, RemoteLoader};
pub use storage::ResultStore;
