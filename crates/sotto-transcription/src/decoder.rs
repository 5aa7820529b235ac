//! Forced-prompt greedy decoding for the Whisper encoder-decoder ONNX pair.
//!
//! ONNX tensor shapes use `i64` dimensions while Rust indexing needs `usize`.
//! These casts are safe because tensor dimensions are always small positive values.
#![allow(
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::cast_possible_truncation
)]

use ndarray::Array3;
use ort::session::Session;
use ort::value::Tensor;
use tracing::debug;

use crate::mel::{N_FRAMES, N_MELS};
use crate::types::TranscriptionError;

/// `<|startoftranscript|>` for the English-only vocabulary.
pub const SOT_TOKEN: i64 = 50_257;
/// `<|endoftext|>`.
pub const EOT_TOKEN: i64 = 50_256;
/// `<|notimestamps|>`.
pub const NO_TIMESTAMPS_TOKEN: i64 = 50_362;
/// Hard cap on decoded sequence length (the model's learned position range).
pub const MAX_TARGET_POSITIONS: usize = 448;

/// Decoder prompt constraining generation to English transcription without
/// timestamps. The English-only model carries no language or task tokens, so
/// the prompt is just start-of-transcript plus the timestamp suppressor.
pub const FORCED_DECODER_TOKENS: [i64; 2] = [SOT_TOKEN, NO_TIMESTAMPS_TOKEN];

/// Run the encoder over one mel window.
///
/// Input: log-mel features `[1, N_MELS, N_FRAMES]`
/// Output: audio features `[1, N_FRAMES / 2, hidden_dim]`
pub fn run_encoder(
    encoder: &mut Session,
    mel: &Array3<f32>,
) -> Result<Array3<f32>, TranscriptionError> {
    let flat: Vec<f32> = mel.iter().copied().collect();
    let input_features = Tensor::from_array(([1i64, N_MELS as i64, N_FRAMES as i64], flat))
        .map_err(|e| TranscriptionError::Inference(format!("input_features tensor: {e}")))?;

    let outputs = encoder
        .run(ort::inputs!["input_features" => input_features])
        .map_err(|e| TranscriptionError::Inference(format!("encoder run: {e}")))?;

    let (shape, data) = outputs["last_hidden_state"]
        .try_extract_tensor::<f32>()
        .map_err(|e| TranscriptionError::Inference(format!("extract audio features: {e}")))?;

    let dims = (shape[0] as usize, shape[1] as usize, shape[2] as usize);
    Array3::from_shape_vec(dims, data.to_vec())
        .map_err(|e| TranscriptionError::Inference(format!("reshape audio features: {e}")))
}

/// Greedy autoregressive decode against fixed audio features.
///
/// The decoder graph has no key-value cache, so each step re-runs it over the
/// whole token prefix and reads the logits of the final position. Generation
/// starts from [`FORCED_DECODER_TOKENS`] and stops at end-of-text or the
/// position cap. Returns only the freshly generated token IDs.
pub fn greedy_decode(
    decoder: &mut Session,
    audio_features: &Array3<f32>,
) -> Result<Vec<u32>, TranscriptionError> {
    let dims = audio_features.shape();
    let features_flat: Vec<f32> = audio_features.iter().copied().collect();

    let mut tokens: Vec<i64> = FORCED_DECODER_TOKENS.to_vec();

    while tokens.len() < MAX_TARGET_POSITIONS {
        let input_ids = Tensor::from_array(([1i64, tokens.len() as i64], tokens.clone()))
            .map_err(|e| TranscriptionError::Inference(format!("input_ids tensor: {e}")))?;
        let encoder_hidden_states = Tensor::from_array((
            [dims[0] as i64, dims[1] as i64, dims[2] as i64],
            features_flat.clone(),
        ))
        .map_err(|e| TranscriptionError::Inference(format!("audio features tensor: {e}")))?;

        let outputs = decoder
            .run(ort::inputs![
                "input_ids" => input_ids,
                "encoder_hidden_states" => encoder_hidden_states,
            ])
            .map_err(|e| TranscriptionError::Inference(format!("decoder run: {e}")))?;

        let (shape, logits) = outputs["logits"]
            .try_extract_tensor::<f32>()
            .map_err(|e| TranscriptionError::Inference(format!("extract logits: {e}")))?;

        // Logits come back [1, seq, vocab]; only the last position matters.
        let vocab = shape[2] as usize;
        let seq = shape[1] as usize;
        if logits.len() < seq * vocab || seq != tokens.len() {
            return Err(TranscriptionError::Inference(format!(
                "unexpected logits shape: {shape:?} for {} tokens",
                tokens.len()
            )));
        }
        let last = &logits[(seq - 1) * vocab..seq * vocab];

        let next = argmax(last) as i64;
        if next == EOT_TOKEN {
            break;
        }
        tokens.push(next);
    }

    let generated: Vec<u32> = tokens[FORCED_DECODER_TOKENS.len()..]
        .iter()
        .map(|&t| t as u32)
        .collect();
    debug!("decoded {} tokens", generated.len());
    Ok(generated)
}

/// Index of the maximum value in a slice.
fn argmax(slice: &[f32]) -> usize {
    slice
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        .map_or(0, |(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forced_prompt_starts_with_sot() {
        assert_eq!(FORCED_DECODER_TOKENS[0], SOT_TOKEN);
        assert_eq!(FORCED_DECODER_TOKENS[1], NO_TIMESTAMPS_TOKEN);
    }

    #[test]
    fn position_cap_leaves_room_to_generate() {
        assert!(MAX_TARGET_POSITIONS > FORCED_DECODER_TOKENS.len());
    }

    #[test]
    fn special_tokens_are_distinct() {
        let ids = [SOT_TOKEN, EOT_TOKEN, NO_TIMESTAMPS_TOKEN];
        for (i, a) in ids.iter().enumerate() {
            for b in &ids[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn argmax_picks_largest() {
        assert_eq!(argmax(&[0.1, 2.0, -1.0]), 1);
        assert_eq!(argmax(&[9.0, 2.0, 3.0]), 0);
        assert_eq!(argmax(&[-5.0, -2.0, -3.0]), 1);
    }

    #[test]
    fn argmax_of_single_element() {
        assert_eq!(argmax(&[0.0]), 0);
    }

    #[test]
    fn argmax_ties_take_first() {
        assert_eq!(argmax(&[1.0, 1.0, 1.0]), 0);
    }
}
