// Inline image attachments (stored as data URLs inside the listing record)

use crate::domain::error::{DomainError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Largest accepted attachment (5 MiB)
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Validate an upload and encode it as `data:{mime};base64,{payload}`
pub fn encode_data_url(name: &str, mime: &str, bytes: &[u8]) -> Result<String> {
    if !mime.starts_with("image/") {
        return Err(DomainError::InvalidImage(format!(
            "{} is not an image file",
            name
        )));
    }
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(DomainError::InvalidImage(format!(
            "{} is too large (max 5MB)",
            name
        )));
    }
    Ok(format!("data:{};base64,{}", mime, STANDARD.encode(bytes)))
}

/// Mime type of a stored data URL, if it is one
pub fn data_url_mime(url: &str) -> Option<&str> {
    let rest = url.strip_prefix("data:")?;
    let (mime, _) = rest.split_once(';')?;
    Some(mime)
}
