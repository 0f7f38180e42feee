//! Playlist persistence error types.

use thiserror::Error;

/// Errors that can occur while loading or saving the playlist.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the playlist file failed.
    #[error("playlist file I/O failed ({path}): {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The playlist file holds something other than a list of entries.
    #[error("playlist file is not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_display() {
        let err = StoreError::io(
            std::path::Path::new("/tmp/playlist.json"),
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let message = err.to_string();
        assert!(message.contains("/tmp/playlist.json"));
        assert!(message.contains("denied"));
    }

    #[test]
    fn test_serialization_error_from() {
        let json_err = serde_json::from_str::<Vec<u8>>("nope").unwrap_err();
        let err: StoreError = json_err.into();
        assert!(err.to_string().contains("not valid JSON"));
    }
}
