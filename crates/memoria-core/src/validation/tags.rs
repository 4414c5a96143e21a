//! Tag name normalization

use crate::AppError;

/// Maximum length of a single tag name, in characters.
pub const MAX_TAG_LENGTH: usize = 64;

/// Maximum number of tags attached to one item.
pub const MAX_TAGS_PER_ITEM: usize = 30;

/// Normalize a list of raw tag names.
///
/// Names are trimmed, empty entries dropped and duplicates removed keeping the
/// first occurrence. Matching is exact after trimming.
pub fn normalize_tag_names<I, S>(names: I) -> Result<Vec<String>, AppError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for raw in names {
        let name = raw.as_ref().trim();
        if name.is_empty() {
            continue;
        }
        if name.chars().count() > MAX_TAG_LENGTH {
            return Err(AppError::InvalidInput(format!(
                "Tag '{}' exceeds {} characters",
                name, MAX_TAG_LENGTH
            )));
        }
        if !out.iter().any(|existing| existing == name) {
            out.push(name.to_string());
        }
    }

    if out.len() > MAX_TAGS_PER_ITEM {
        return Err(AppError::InvalidInput(format!(
            "At most {} tags can be attached to an item",
            MAX_TAGS_PER_ITEM
        )));
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_drops_empty_and_dedupes_in_order() {
        let tags = normalize_tag_names(["a", "b", "a", " "]).unwrap();
        assert_eq!(tags, vec!["a", "b"]);
    }

    #[test]
    fn keeps_first_occurrence_order() {
        let tags = normalize_tag_names([" sunset", "beach ", "sunset", "city"]).unwrap();
        assert_eq!(tags, vec!["sunset", "beach", "city"]);
    }

    #[test]
    fn empty_input_yields_empty_set() {
        let tags = normalize_tag_names(Vec::<String>::new()).unwrap();
        assert!(tags.is_empty());
        let tags = normalize_tag_names(["", "   "]).unwrap();
        assert!(tags.is_empty());
    }

    #[test]
    fn rejects_overlong_names() {
        let long = "x".repeat(MAX_TAG_LENGTH + 1);
        assert!(matches!(
            normalize_tag_names([long.as_str()]),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn rejects_too_many_tags() {
        let names: Vec<String> = (0..=MAX_TAGS_PER_ITEM).map(|i| format!("t{}", i)).collect();
        assert!(normalize_tag_names(names).is_err());
    }
}
