use snafu::Snafu;

use crate::content::{validate_content, ContentError};

/// Validation failures surfaced by ingestion as `400 Bad Request`. Never
/// published to the log: a request that fails validation never reaches the
/// producer.
#[derive(Debug, Snafu, PartialEq, Eq)]
pub enum ValidationError {
    #[snafu(display("user_id must not be empty"))]
    EmptyUserId,
    #[snafu(display("post_id must not be empty"))]
    EmptyPostId,
    #[snafu(transparent)]
    Content { source: ContentError },
    #[snafu(display("action must be \"like\" or \"unlike\", got {action:?}"))]
    UnknownAction { action: String },
}

pub fn validate_user_id(user_id: &str) -> Result<(), ValidationError> {
    if user_id.is_empty() {
        return Err(ValidationError::EmptyUserId);
    }
    Ok(())
}

pub fn validate_post_id_present(post_id: &str) -> Result<(), ValidationError> {
    if post_id.is_empty() {
        return Err(ValidationError::EmptyPostId);
    }
    Ok(())
}

pub fn validate_post_fields(user_id: &str, content: &str) -> Result<(), ValidationError> {
    validate_user_id(user_id)?;
    validate_content(content)?;
    Ok(())
}

pub fn validate_comment_fields(
    post_id: &str,
    user_id: &str,
    content: &str,
) -> Result<(), ValidationError> {
    validate_user_id(user_id)?;
    validate_post_id_present(post_id)?;
    validate_content(content)?;
    Ok(())
}

pub fn validate_like_fields(post_id: &str, user_id: &str) -> Result<(), ValidationError> {
    validate_user_id(user_id)?;
    validate_post_id_present(post_id)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_user_id() {
        assert_eq!(
            validate_post_fields("", "hi"),
            Err(ValidationError::EmptyUserId)
        );
    }

    #[test]
    fn rejects_bad_content_length() {
        assert!(validate_post_fields("alice", "").is_err());
        assert!(validate_post_fields("alice", &"a".repeat(281)).is_err());
        assert!(validate_post_fields("alice", &"a".repeat(280)).is_ok());
    }

    #[test]
    fn comment_requires_post_id() {
        assert_eq!(
            validate_comment_fields("", "alice", "hi"),
            Err(ValidationError::EmptyPostId)
        );
    }
}
