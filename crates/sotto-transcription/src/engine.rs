//! ONNX session management and the end-to-end transcription pipeline.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use ndarray::Array3;
use ort::session::Session;
use tokenizers::Tokenizer;
use tracing::{debug, info};

use crate::audio;
use crate::decoder;
use crate::mel;
use crate::model;
use crate::types::{ResultExt, TranscriptionError, TranscriptionResult};

/// Intra-op thread count for both ONNX sessions. Sessions are pinned to the
/// CPU execution provider; this is the only placement knob.
const INTRA_OP_THREADS: usize = 4;

/// Whisper transcription engine on ONNX Runtime.
///
/// Holds the encoder and decoder sessions plus the tokenizer and the
/// precomputed mel filterbank. Sessions are behind `Mutex` since
/// `Session::run` requires `&mut self`. All CPU-bound work runs on
/// `spawn_blocking` so the async runtime is never starved.
pub struct TranscriptionEngine {
    encoder: Mutex<Session>,
    decoder: Mutex<Session>,
    tokenizer: Tokenizer,
    mel_filters: Vec<f32>,
}

impl TranscriptionEngine {
    /// Create a new engine, loading ONNX sessions from `model_dir`.
    ///
    /// Loads ~150MB of weights; call once at server startup.
    pub async fn new(model_dir: PathBuf) -> Result<Arc<Self>, TranscriptionError> {
        tokio::task::spawn_blocking(move || Self::load_sessions(&model_dir))
            .await
            .inference("task join")?
            .map(Arc::new)
    }

    fn load_sessions(model_dir: &Path) -> Result<Self, TranscriptionError> {
        info!("loading {} from {}...", model::MODEL_NAME, model_dir.display());
        let paths = model::ModelPaths::from_dir(model_dir);

        let encoder = Session::builder()
            .inference("session builder")?
            .with_intra_threads(INTRA_OP_THREADS)
            .inference("set threads")?
            .commit_from_file(&paths.encoder)
            .inference("load encoder")?;
        debug!("loaded encoder");

        let decoder = Session::builder()
            .inference("session builder")?
            .with_intra_threads(INTRA_OP_THREADS)
            .inference("set threads")?
            .commit_from_file(&paths.decoder)
            .inference("load decoder")?;
        debug!("loaded decoder");

        let tokenizer = model::load_tokenizer(&paths.tokenizer)?;
        let mel_filters = mel::mel_filterbank();

        info!("transcription engine ready: model={}", model::MODEL_NAME);
        Ok(Self {
            encoder: Mutex::new(encoder),
            decoder: Mutex::new(decoder),
            tokenizer,
            mel_filters,
        })
    }

    /// Transcribe a local audio file.
    ///
    /// Pipeline: read file → decode/resample to 16kHz mono → per 30s window:
    /// mel features → encoder → greedy decode → text, windows concatenated.
    pub async fn transcribe_file(
        self: &Arc<Self>,
        path: &Path,
    ) -> Result<TranscriptionResult, TranscriptionError> {
        let data = tokio::fs::read(path).await?;
        let ext = path.extension().and_then(|e| e.to_str()).map(str::to_owned);

        let samples = tokio::task::spawn_blocking(move || audio::decode_audio(data, ext.as_deref()))
            .await
            .inference("audio decode task")??;

        #[allow(clippy::cast_precision_loss)]
        let duration_seconds = samples.len() as f64 / f64::from(audio::TARGET_SAMPLE_RATE);
        debug!(
            "decoded {:.1}s of audio ({} samples) from {}",
            duration_seconds,
            samples.len(),
            path.display()
        );

        let engine = Arc::clone(self);
        let text = tokio::task::spawn_blocking(move || engine.run_inference(&samples))
            .await
            .inference("inference task")??;

        Ok(TranscriptionResult {
            text,
            language: "en".into(),
            duration_seconds,
        })
    }

    /// Run the full inference pipeline (CPU-bound, must be on a blocking thread).
    fn run_inference(&self, samples: &[f32]) -> Result<String, TranscriptionError> {
        let mut pieces: Vec<String> = Vec::new();

        for window in samples.chunks(mel::N_SAMPLES) {
            let features = mel::log_mel_spectrogram(window, &self.mel_filters);
            let mel = Array3::from_shape_vec((1, mel::N_MELS, mel::N_FRAMES), features)
                .map_err(|e| TranscriptionError::Inference(format!("reshape mel: {e}")))?;

            let audio_features = {
                let mut encoder = self.encoder.lock().inference("encoder lock")?;
                decoder::run_encoder(&mut encoder, &mel)?
            };
            debug!("audio features: {:?}", audio_features.shape());

            let tokens = {
                let mut dec = self.decoder.lock().inference("decoder lock")?;
                decoder::greedy_decode(&mut dec, &audio_features)?
            };

            let piece = self
                .tokenizer
                .decode(&tokens, true)
                .map_err(|e| TranscriptionError::Tokenizer(e.to_string()))?;
            let piece = piece.trim();
            if !piece.is_empty() {
                pieces.push(piece.to_string());
            }
        }

        Ok(pieces.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_requires_model_files() {
        let tmp = tempfile::tempdir().unwrap();
        let rt = tokio::runtime::Runtime::new().unwrap();
        let result = rt.block_on(TranscriptionEngine::new(tmp.path().to_path_buf()));
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn transcribe_missing_file_is_io_error() {
        // Engine construction needs model artifacts, but the file read happens
        // first, so a stub engine is never reached; exercise the path check
        // through the public error type instead.
        let err = tokio::fs::read("/no/such/audio.wav").await.unwrap_err();
        let err = TranscriptionError::from(err);
        assert!(matches!(err, TranscriptionError::Io(_)));
    }

    // Full-pipeline test requiring model download; run with `cargo test -- --ignored`.
    #[tokio::test]
    #[ignore]
    async fn transcribe_tone_produces_engine() {
        let model_dir = model::default_model_dir();
        model::ensure_model(&model_dir).await.unwrap();
        let _engine = TranscriptionEngine::new(model_dir).await.unwrap();
    }
}
