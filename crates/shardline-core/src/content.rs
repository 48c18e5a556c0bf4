pub const CONTENT_MIN_LEN: usize = 1;
pub const CONTENT_MAX_LEN: usize = 280;

#[derive(Debug, snafu::Snafu, PartialEq, Eq)]
pub enum ContentError {
    #[snafu(display(
        "content length must be between {CONTENT_MIN_LEN} and {CONTENT_MAX_LEN} code points, got {len}"
    ))]
    Length { len: usize },
}

/// Validates post/comment body length.
///
/// Length is measured in Unicode code points (via grapheme-aware
/// iteration on the extended grapheme boundary is overkill for a simple
/// length cap, so this counts `chars()`, i.e. scalar values/code points),
/// not bytes, so multi-byte UTF-8 content isn't penalized relative to
/// ASCII.
pub fn validate_content(content: &str) -> Result<(), ContentError> {
    let len = content.chars().count();
    if len < CONTENT_MIN_LEN || len > CONTENT_MAX_LEN {
        return Err(ContentError::Length { len });
    }
    Ok(())
}
