//! HTTP route groups: the index group at the base path and the transcribe
//! group mounted under the `/transcribe` prefix.

pub mod index;
pub mod transcribe;
