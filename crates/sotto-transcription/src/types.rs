//! Core types for the transcription engine.

/// Output of transcribing one audio file.
#[derive(Debug, Clone)]
pub struct TranscriptionResult {
    /// The transcribed text, special tokens stripped.
    pub text: String,
    /// Language code of the transcript (always "en" for the English-only model).
    pub language: String,
    /// Duration of the decoded audio in seconds.
    pub duration_seconds: f64,
}

/// Errors that can occur during transcription.
#[derive(Debug, thiserror::Error)]
pub enum TranscriptionError {
    /// Model artifacts missing locally and not downloadable.
    #[error("model not available: {0}")]
    ModelNotAvailable(String),

    /// ONNX Runtime session creation or inference failure.
    #[error("inference error: {0}")]
    Inference(String),

    /// Audio container/codec failure (unsupported format, corrupt data).
    #[error("audio decode error: {0}")]
    AudioDecode(String),

    /// Sample-rate conversion failure.
    #[error("resample error: {0}")]
    Resample(String),

    /// Token-to-text conversion failure.
    #[error("tokenizer error: {0}")]
    Tokenizer(String),

    /// File read/write failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shorthand for wrapping arbitrary failures into [`TranscriptionError::Inference`]
/// with a short context label.
pub(crate) trait ResultExt<T> {
    fn inference(self, what: &str) -> Result<T, TranscriptionError>;
}

impl<T, E: std::fmt::Display> ResultExt<T> for Result<T, E> {
    fn inference(self, what: &str) -> Result<T, TranscriptionError> {
        self.map_err(|e| TranscriptionError::Inference(format!("{what}: {e}")))
    }
}
