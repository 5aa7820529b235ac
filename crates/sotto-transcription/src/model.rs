//! Model artifact management: `HuggingFace` download and path resolution.

use std::path::{Path, PathBuf};

use tokenizers::Tokenizer;
use tracing::{debug, info, warn};

use crate::types::TranscriptionError;

/// `HuggingFace` repository carrying the ONNX export of the model.
pub const HF_REPO: &str = "onnx-community/whisper-tiny.en";

/// Short model name for health reporting and logs.
pub const MODEL_NAME: &str = "whisper-tiny.en";

/// Required artifacts: path inside the HF repo, filename in the local cache.
const MODEL_FILES: &[(&str, &str)] = &[
    ("onnx/encoder_model.onnx", "encoder_model.onnx"),
    ("onnx/decoder_model.onnx", "decoder_model.onnx"),
    ("tokenizer.json", "tokenizer.json"),
];

/// Resolved on-disk locations of the model artifacts.
pub struct ModelPaths {
    /// Encoder ONNX graph.
    pub encoder: PathBuf,
    /// Decoder ONNX graph.
    pub decoder: PathBuf,
    /// BPE tokenizer definition.
    pub tokenizer: PathBuf,
}

impl ModelPaths {
    /// Resolve artifact paths inside `model_dir`.
    pub fn from_dir(model_dir: impl AsRef<Path>) -> Self {
        let dir = model_dir.as_ref();
        Self {
            encoder: dir.join("encoder_model.onnx"),
            decoder: dir.join("decoder_model.onnx"),
            tokenizer: dir.join("tokenizer.json"),
        }
    }
}

/// Default model cache directory.
///
/// `CACHE_DIR` takes priority when set, matching the service's documented
/// cache-directory selection; otherwise `~/.sotto/models/whisper-tiny-en`.
pub fn default_model_dir() -> PathBuf {
    model_dir_from(std::env::var("CACHE_DIR").ok().as_deref())
}

fn model_dir_from(cache_dir: Option<&str>) -> PathBuf {
    match cache_dir {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
            PathBuf::from(home)
                .join(".sotto")
                .join("models")
                .join("whisper-tiny-en")
        }
    }
}

/// Check whether every required artifact exists locally.
pub fn is_model_cached(model_dir: impl AsRef<Path>) -> bool {
    let dir = model_dir.as_ref();
    MODEL_FILES.iter().all(|(_, name)| dir.join(name).exists())
}

/// Download any missing model artifacts from the `HuggingFace` Hub.
///
/// Idempotent: files already in `model_dir` are left alone. The download runs
/// on a blocking thread since `hf-hub`'s sync API does blocking HTTP.
pub async fn ensure_model(model_dir: impl AsRef<Path>) -> Result<(), TranscriptionError> {
    let model_dir = model_dir.as_ref().to_path_buf();

    if is_model_cached(&model_dir) {
        debug!("model artifacts already cached at {}", model_dir.display());
        return Ok(());
    }

    info!("downloading {MODEL_NAME} artifacts from HuggingFace...");
    std::fs::create_dir_all(&model_dir).map_err(TranscriptionError::Io)?;

    tokio::task::spawn_blocking(move || download_model_files(&model_dir))
        .await
        .map_err(|e| TranscriptionError::ModelNotAvailable(format!("task join error: {e}")))?
}

fn download_model_files(model_dir: &Path) -> Result<(), TranscriptionError> {
    let api = hf_hub::api::sync::Api::new()
        .map_err(|e| TranscriptionError::ModelNotAvailable(format!("HF API init: {e}")))?;
    let repo = api.model(HF_REPO.to_string());

    for &(remote, local) in MODEL_FILES {
        let target = model_dir.join(local);
        if target.exists() {
            debug!("skipping {local} (already exists)");
            continue;
        }

        info!("downloading {remote}...");
        match repo.get(remote) {
            Ok(cached) => {
                // hf-hub caches under its own tree; copy into the flat model dir.
                if cached != target {
                    let _ = std::fs::copy(&cached, &target).map_err(|e| {
                        TranscriptionError::ModelNotAvailable(format!("failed to copy {local}: {e}"))
                    })?;
                }
                debug!("downloaded {local}");
            }
            Err(e) => {
                warn!("failed to download {remote}: {e}");
                return Err(TranscriptionError::ModelNotAvailable(format!(
                    "download failed for {remote}: {e}"
                )));
            }
        }
    }

    info!("all model artifacts ready at {}", model_dir.display());
    Ok(())
}

/// Load the BPE tokenizer shipped with the model.
pub fn load_tokenizer(path: &Path) -> Result<Tokenizer, TranscriptionError> {
    Tokenizer::from_file(path)
        .map_err(|e| TranscriptionError::ModelNotAvailable(format!("tokenizer load: {e}")))
}
