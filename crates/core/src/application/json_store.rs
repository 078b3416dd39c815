// JSON documents stored under fixed keys

use crate::error::{AppError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Decode a stored array. A missing key, an empty value or `null` is an empty array.
pub fn decode_array<T: DeserializeOwned>(key: &str, raw: Option<String>) -> Result<Vec<T>> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }

    let items: Option<Vec<T>> = serde_json::from_str(&raw).map_err(|e| {
        AppError::Internal(format!("stored value under '{}' is not a valid array: {}", key, e))
    })?;
    Ok(items.unwrap_or_default())
}

pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_missing_and_null() {
        let empty: Vec<i64> = decode_array("k", None).unwrap();
        assert!(empty.is_empty());
        let null: Vec<i64> = decode_array("k", Some("null".to_string())).unwrap();
        assert!(null.is_empty());
        let blank: Vec<i64> = decode_array("k", Some(" ".to_string())).unwrap();
        assert!(blank.is_empty());
    }

    #[test]
    fn test_decode_corrupt_names_key() {
        let err = decode_array::<i64>("grabgrub_posts", Some("{oops".to_string())).unwrap_err();
        assert!(err.to_string().contains("grabgrub_posts"));
    }
}
