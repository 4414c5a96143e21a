//! Validation modules

pub mod tags;

pub use tags::{normalize_tag_names, MAX_TAGS_PER_ITEM, MAX_TAG_LENGTH};

use crate::AppError;
use validator::Validate;

/// Maximum length of an item description, in characters.
pub const MAX_DESCRIPTION_LENGTH: usize = 2000;

/// Maximum length of a location name, in characters.
pub const MAX_LOCATION_NAME_LENGTH: usize = 200;

/// Run derive-based validation on a request DTO.
pub fn validate_request<T: Validate>(request: &T) -> Result<(), AppError> {
    request.validate().map_err(AppError::from)
}

/// Trim an optional free-text field, treating blank as absent and enforcing a length cap.
pub fn normalize_optional_text(
    field: &str,
    value: Option<String>,
    max_len: usize,
) -> Result<Option<String>, AppError> {
    let value = match value {
        Some(v) => v.trim().to_string(),
        None => return Ok(None),
    };
    if value.is_empty() {
        return Ok(None);
    }
    if value.chars().count() > max_len {
        return Err(AppError::InvalidInput(format!(
            "{} must be at most {} characters",
            field, max_len
        )));
    }
    Ok(Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NameRequest;

    #[test]
    fn blank_text_is_absent() {
        assert_eq!(
            normalize_optional_text("description", Some("   ".to_string()), 10).unwrap(),
            None
        );
        assert_eq!(
            normalize_optional_text("description", Some(" hi ".to_string()), 10).unwrap(),
            Some("hi".to_string())
        );
    }

    #[test]
    fn overlong_text_is_rejected() {
        let err = normalize_optional_text("location", Some("abcdef".to_string()), 3).unwrap_err();
        assert!(err.to_string().contains("location"));
    }

    #[test]
    fn name_request_rejects_empty_after_trim() {
        assert!(validate_request(&NameRequest::new("   ")).is_err());
        assert!(validate_request(&NameRequest::new(" Summer 2024 ")).is_ok());
    }
}
