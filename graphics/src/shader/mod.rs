//! Shader modules.

mod library;

pub use library::ShaderLibrary;

use crate::error::GraphicsError;

/// First word of every SPIR-V module.
pub const SPIRV_MAGIC: u32 = 0x0723_0203;

/// Convert little-endian SPIR-V bytes into words, checking size and magic.
pub fn spirv_words(bytes: &[u8]) -> Result<Vec<u32>, GraphicsError> {
    if bytes.len() % 4 != 0 || bytes.len() < 4 {
        return Err(GraphicsError::InvalidParameter(format!(
            "SPIR-V size must be a non-zero multiple of 4 bytes (got {})",
            bytes.len()
        )));
    }
    let words: Vec<u32> = bytes
        .chunks_exact(4)
        .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();
    if words[0] != SPIRV_MAGIC {
        return Err(GraphicsError::InvalidParameter(format!(
            "invalid SPIR-V magic number {:#010x}",
            words[0]
        )));
    }
    Ok(words)
}
