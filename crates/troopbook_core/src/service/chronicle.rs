//! Chronicle article validation.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Maximum article length in characters, measured before trimming.
pub const MAX_ARTICLE_CHARS: usize = 5000;
/// Minimum article length in characters, measured after trimming.
pub const MIN_ARTICLE_CHARS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChronicleError {
    TooLong { chars: usize, max: usize },
    TooShort { chars: usize, min: usize },
}

impl Display for ChronicleError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooLong { chars, max } => {
                write!(f, "article has {chars} characters, limit is {max}")
            }
            Self::TooShort { chars, min } => {
                write!(f, "article has {chars} characters, at least {min} required")
            }
        }
    }
}

impl Error for ChronicleError {}

/// Validates raw editor content and returns the trimmed text to store.
pub fn normalize_article(content: &str) -> Result<String, ChronicleError> {
    let chars = content.chars().count();
    if chars > MAX_ARTICLE_CHARS {
        return Err(ChronicleError::TooLong {
            chars,
            max: MAX_ARTICLE_CHARS,
        });
    }
    let trimmed = content.trim();
    let trimmed_chars = trimmed.chars().count();
    if trimmed_chars < MIN_ARTICLE_CHARS {
        return Err(ChronicleError::TooShort {
            chars: trimmed_chars,
            min: MIN_ARTICLE_CHARS,
        });
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::{normalize_article, ChronicleError, MAX_ARTICLE_CHARS};

    #[test]
    fn trims_and_checks_bounds() {
        assert_eq!(
            normalize_article("  We hiked to the lake.  ").unwrap(),
            "We hiked to the lake."
        );
        assert!(matches!(
            normalize_article("   hi   "),
            Err(ChronicleError::TooShort { chars: 2, .. })
        ));
        let long = "ž".repeat(MAX_ARTICLE_CHARS + 1);
        assert!(matches!(
            normalize_article(&long),
            Err(ChronicleError::TooLong { .. })
        ));
        let at_limit = "ž".repeat(MAX_ARTICLE_CHARS);
        assert!(normalize_article(&at_limit).is_ok());
    }
}
