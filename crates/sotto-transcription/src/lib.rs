//! Whisper speech-to-text engine on ONNX Runtime.
//!
//! Runs the ONNX export of `openai/whisper-tiny.en` entirely in-process: no
//! Python sidecar, no external inference server.
//!
//! # Architecture
//!
//! ```text
//! audio file → symphonia decode → rubato resample to 16kHz mono f32
//! → log-mel spectrogram [1, 80, 3000] per 30s window
//! → encoder_model.onnx → audio features [1, 1500, 384]
//! → greedy decode (decoder_model.onnx in loop, forced English prompt) → token IDs
//! → tokenizer.json decode → text string
//! ```

pub mod audio;
pub mod decoder;
pub mod engine;
pub mod mel;
pub mod model;
pub mod types;

pub use engine::TranscriptionEngine;
pub use types::{TranscriptionError, TranscriptionResult};
