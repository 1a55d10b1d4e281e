/// Error types shared across the dashboard
use thiserror::Error;

/// Failures talking to the daily image service.
///
/// `Clone` so one in-flight result can be handed to every waiter.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {status}: {status_text}")]
    Status { status: u16, status_text: String },

    #[error("Invalid response format")]
    InvalidResponse,

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Request timed out after {0}ms")]
    Timeout(u32),

    #[error("Invalid image url: {0:?}")]
    InvalidImageUrl(String),
}

/// Failures of the key-value store backends
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("failed to serialize record: {0}")]
    Serialization(String),
}

/// Failures of user-initiated wallpaper actions
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WallpaperError {
    #[error("invalid date: {0:?}")]
    InvalidDate(String),

    #[error("not an image file: {0}")]
    NotAnImage(String),

    #[error("image is {size} bytes, the limit is {limit} bytes")]
    TooLarge { size: u64, limit: u64 },

    #[error("failed to read image file: {0}")]
    FileRead(String),

    #[error("image could not be displayed: {0}")]
    Undisplayable(String),
}

/// Failures of tag group edits
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TagGroupError {
    #[error("group with id {0} already exists")]
    DuplicateGroup(String),

    #[error("group with id {0} not found")]
    GroupNotFound(String),

    #[error("tag with id {tag} not found in group {group}")]
    TagNotFound { group: String, tag: String },

    #[error("name cannot be empty")]
    EmptyName,

    #[error("group {0} cannot be deleted")]
    ProtectedGroup(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_message_matches_http_wording() {
        let e = FetchError::Status {
            status: 404,
            status_text: "Not Found".to_string(),
        };
        assert_eq!(e.to_string(), "HTTP 404: Not Found");
    }

    #[test]
    fn test_upload_limit_message() {
        let e = WallpaperError::TooLarge {
            size: 11_534_336,
            limit: 10_485_760,
        };
        assert_eq!(e.to_string(), "image is 11534336 bytes, the limit is 10485760 bytes");
    }
}
