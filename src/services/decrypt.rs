use crate::runtime::services::DecryptService;
use anyhow::Result;

/// Treats stored API keys as plaintext
///
/// Embedders that encrypt integration keys at rest supply their own
/// `DecryptService`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughDecrypt;

impl DecryptService for PassthroughDecrypt {
    fn decrypt(&self, ciphertext: &str) -> Result<String> {
        Ok(ciphertext.to_string())
    }
}
