use crate::ForgeError;
use base64::Engine;

/// A decoded image payload ready for the blob store.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageData {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for ImageData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageData")
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl ImageData {
    pub fn from_bytes(content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self { content_type: content_type.into(), bytes }
    }

    /// Parse a self-describing `data:image/<subtype>;base64,<payload>`
    /// string. Anything else is rejected before any I/O happens.
    pub fn from_data_url(raw: &str) -> Result<Self, ForgeError> {
        let rest = raw
            .strip_prefix("data:")
            .ok_or_else(|| ForgeError::InvalidImage("missing data: prefix".into()))?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| ForgeError::InvalidImage("missing payload separator".into()))?;
        let content_type = header
            .strip_suffix(";base64")
            .ok_or_else(|| ForgeError::InvalidImage("payload must be base64".into()))?;
        if !content_type.starts_with("image/") || content_type.len() == "image/".len() {
            return Err(ForgeError::InvalidImage(format!(
                "unsupported content type {content_type:?}"
            )));
        }
        if payload.is_empty() {
            return Err(ForgeError::InvalidImage("empty payload".into()));
        }
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(payload)
            .map_err(|e| ForgeError::InvalidImage(format!("bad base64 payload: {e}")))?;
        Ok(Self { content_type: content_type.to_string(), bytes })
    }
}
