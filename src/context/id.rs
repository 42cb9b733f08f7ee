//! Identifier synthesis.
//!
//! Operation ids are 96 random bits rendered as URL-safe base64 without
//! padding (16 characters). Correlation ids are UUIDv4 strings. Both draw
//! from a fallible [`EntropySource`] so that an unavailable entropy source
//! surfaces as an error instead of a panic.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;

use crate::context::request::ContextError;

/// Number of random bytes in a synthesized operation id.
pub const OPERATION_ID_BYTES: usize = 12;

/// Source of random bytes for identifier synthesis.
pub trait EntropySource: Send + Sync {
    fn fill(&self, dest: &mut [u8]) -> Result<(), ContextError>;
}

/// Operating system entropy (`getrandom`).
#[derive(Debug, Clone, Copy, Default)]
pub struct OsEntropy;

impl EntropySource for OsEntropy {
    fn fill(&self, dest: &mut [u8]) -> Result<(), ContextError> {
        rand::rngs::OsRng
            .try_fill_bytes(dest)
            .map_err(|e| ContextError::Entropy(e.to_string()))
    }
}

/// Generate a new operation id.
pub fn generate_operation_id(entropy: &dyn EntropySource) -> Result<String, ContextError> {
    let mut buf = [0u8; OPERATION_ID_BYTES];
    entropy.fill(&mut buf)?;
    Ok(URL_SAFE_NO_PAD.encode(buf))
}

/// Generate a new correlation id (UUIDv4).
pub fn generate_correlation_id(entropy: &dyn EntropySource) -> Result<String, ContextError> {
    let mut buf = [0u8; 16];
    entropy.fill(&mut buf)?;
    Ok(uuid::Builder::from_random_bytes(buf).into_uuid().to_string())
}
