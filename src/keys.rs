use crate::aspect::Orientation;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::TryRngCore;
use thiserror::Error;

const KEY_BYTES: usize = 32;
const VIDEO_EXTENSION: &str = ".mp4";

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("secure random source unavailable: {0}")]
    RandomUnavailable(String),
}

/// Derive a fresh object key of the form `<orientation>/<43 url-safe chars>.mp4`.
///
/// The random part carries 256 bits drawn from the OS generator.
pub fn derive_object_key(orientation: Orientation) -> Result<String, KeyError> {
    let mut raw = [0u8; KEY_BYTES];
    OsRng
        .try_fill_bytes(&mut raw)
        .map_err(|e| KeyError::RandomUnavailable(e.to_string()))?;

    Ok(format!(
        "{}/{}{}",
        orientation.as_str(),
        URL_SAFE_NO_PAD.encode(raw),
        VIDEO_EXTENSION
    ))
}
