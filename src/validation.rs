use std::sync::OnceLock;

use regex::Regex;

pub const COMMENT_MAX_CHARS: usize = 1000;

fn username_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-zA-Z0-9_-]{3,20}$").expect("static username regex"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum UsernameError {
    #[error("Username is required")]
    Required,

    #[error("Username cannot contain spaces")]
    ContainsSpace,

    #[error("Username can only contain letters, numbers, underscores, and hyphens (3-20 characters)")]
    InvalidFormat,
}

impl UsernameError {
    pub fn message(&self) -> String {
        self.to_string()
    }
}

/// 3-20 characters of letters, digits, underscores and hyphens.
pub fn validate_username(value: &str) -> Result<(), UsernameError> {
    if value.trim().is_empty() {
        return Err(UsernameError::Required);
    }
    if value.contains(' ') {
        return Err(UsernameError::ContainsSpace);
    }
    if !username_regex().is_match(value) {
        return Err(UsernameError::InvalidFormat);
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CommentError {
    #[error("Comment cannot be empty")]
    Empty,

    #[error("Comment must be {} characters or less", COMMENT_MAX_CHARS)]
    TooLong,
}

pub fn validate_comment(content: &str) -> Result<(), CommentError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(CommentError::Empty);
    }
    if trimmed.chars().count() > COMMENT_MAX_CHARS {
        return Err(CommentError::TooLong);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_usernames() {
        assert_eq!(validate_username("abc_12"), Ok(()));
        assert_eq!(validate_username("a-b"), Ok(()));
        assert_eq!(validate_username(&"x".repeat(20)), Ok(()));
    }

    #[test]
    fn rejects_too_short() {
        assert_eq!(validate_username("ab"), Err(UsernameError::InvalidFormat));
    }

    #[test]
    fn rejects_too_long() {
        assert_eq!(
            validate_username(&"x".repeat(21)),
            Err(UsernameError::InvalidFormat)
        );
    }

    #[test]
    fn rejects_spaces() {
        assert_eq!(
            validate_username("name with space"),
            Err(UsernameError::ContainsSpace)
        );
    }

    #[test]
    fn rejects_invalid_characters() {
        assert_eq!(validate_username("name!"), Err(UsernameError::InvalidFormat));
    }

    #[test]
    fn blank_is_required() {
        assert_eq!(validate_username("   "), Err(UsernameError::Required));
        assert_eq!(validate_username(""), Err(UsernameError::Required));
    }

    #[test]
    fn comment_bounds() {
        assert_eq!(validate_comment("  "), Err(CommentError::Empty));
        assert_eq!(validate_comment(&"a".repeat(1001)), Err(CommentError::TooLong));
        assert_eq!(validate_comment(&"a".repeat(1000)), Ok(()));
    }
}
