//! IPC client for talking to the TubeSleep daemon.
//!
//! This module provides:
//! - Unix Domain Socket client
//! - One method per daemon request
//! - Connect retry logic (a written request is never resent)
//! - Timeout handling

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tokio::time::timeout;

use crate::cli::commands::PlayTarget;
use crate::types::{EntryView, IpcRequest, IpcResponse, PlayerEvent};

// ============================================================================
// Constants
// ============================================================================

/// Connection timeout in seconds
const CONNECTION_TIMEOUT_SECS: u64 = 5;

/// Read/write timeout in seconds
const IO_TIMEOUT_SECS: u64 = 5;

/// Maximum response size in bytes (1MB, a listing can be long)
const MAX_RESPONSE_SIZE: u64 = 1024 * 1024;

/// Maximum retry attempts
const MAX_RETRIES: u32 = 3;

/// Retry delay in milliseconds (base delay, multiplied by attempt number)
const RETRY_DELAY_MS: u64 = 300;

// ============================================================================
// IpcClient
// ============================================================================

/// IPC client for daemon communication.
pub struct IpcClient {
    socket_path: PathBuf,
    timeout: Duration,
}

impl IpcClient {
    /// Creates a client for the daemon listening on `socket_path`.
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
            timeout: Duration::from_secs(CONNECTION_TIMEOUT_SECS),
        }
    }

    /// Returns the socket path.
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    pub async fn add(&self, url: &str, title: Option<String>) -> Result<IpcResponse> {
        self.request(&IpcRequest::Add {
            url: url.to_string(),
            title,
        })
        .await
    }

    pub async fn remove(&self, id: &str) -> Result<IpcResponse> {
        self.request(&IpcRequest::Remove { id: id.to_string() })
            .await
    }

    pub async fn clear(&self) -> Result<IpcResponse> {
        self.request(&IpcRequest::Clear).await
    }

    pub async fn list(&self) -> Result<IpcResponse> {
        self.request(&IpcRequest::List).await
    }

    pub async fn play(&self, id: &str) -> Result<IpcResponse> {
        self.request(&IpcRequest::Play { id: id.to_string() })
            .await
    }

    /// Starts the sleep timer; `None` lets the daemon pick its default.
    pub async fn start(&self, minutes: Option<u32>) -> Result<IpcResponse> {
        self.request(&IpcRequest::Start { minutes }).await
    }

    pub async fn cancel(&self) -> Result<IpcResponse> {
        self.request(&IpcRequest::Cancel).await
    }

    pub async fn mute(&self) -> Result<IpcResponse> {
        self.request(&IpcRequest::Mute).await
    }

    pub async fn wake(&self) -> Result<IpcResponse> {
        self.request(&IpcRequest::Wake).await
    }

    pub async fn status(&self) -> Result<IpcResponse> {
        self.request(&IpcRequest::Status).await
    }

    pub async fn directive(&self) -> Result<IpcResponse> {
        self.request(&IpcRequest::Directive).await
    }

    pub async fn player(&self, event: PlayerEvent) -> Result<IpcResponse> {
        self.request(&IpcRequest::Player { event }).await
    }

    /// Turns a `play` argument into an entry id.
    ///
    /// Positions are looked up in the daemon's current listing.
    pub async fn resolve_play_target(&self, target: PlayTarget) -> Result<String> {
        match target {
            PlayTarget::Id(id) => Ok(id),
            PlayTarget::Position(position) => {
                let response = self.list().await?;
                let entries: Vec<EntryView> = response
                    .data
                    .and_then(|d| d.entries)
                    .unwrap_or_default();
                let count = entries.len();
                entries
                    .into_iter()
                    .nth(position.saturating_sub(1))
                    .map(|view| view.entry.id)
                    .with_context(|| {
                        format!("No entry at position {} (playlist has {})", position, count)
                    })
            }
        }
    }

    /// Sends `request` and turns an error response into `Err`.
    async fn request(&self, request: &IpcRequest) -> Result<IpcResponse> {
        let response = self.send_request(request).await?;
        if !response.is_success() {
            anyhow::bail!("{}", response.message);
        }
        Ok(response)
    }

    /// Sends a single request to the daemon.
    ///
    /// Only the connect is retried. Once the request is written it may have
    /// been applied, so a lost answer is reported instead of resent.
    async fn send_request(&self, request: &IpcRequest) -> Result<IpcResponse> {
        let request_json = serde_json::to_vec(request).context("Failed to serialize request")?;
        let mut stream = self.connect_with_retry().await?;

        let io_timeout = Duration::from_secs(IO_TIMEOUT_SECS);
        timeout(io_timeout, stream.write_all(&request_json))
            .await
            .context("Write timed out")?
            .context("Failed to send request")?;

        // Shutdown write side to signal end of request
        stream
            .shutdown()
            .await
            .context("Failed to finish request")?;

        let mut buffer = Vec::with_capacity(4096);
        timeout(
            io_timeout,
            (&mut stream).take(MAX_RESPONSE_SIZE).read_to_end(&mut buffer),
        )
        .await
        .context("Read timed out")?
        .context("Failed to receive response")?;

        if buffer.is_empty() {
            anyhow::bail!("The daemon closed the connection without answering");
        }

        serde_json::from_slice(&buffer).context("Failed to parse response")
    }

    /// Connects to the daemon, retrying while it cannot be reached.
    async fn connect_with_retry(&self) -> Result<UnixStream> {
        let mut attempt = 1;
        loop {
            match self.connect().await {
                Ok(stream) => return Ok(stream),
                Err(e) if attempt < MAX_RETRIES => {
                    tracing::debug!("Connect failed (attempt {}/{}): {:#}", attempt, MAX_RETRIES, e);
                    let delay = Duration::from_millis(RETRY_DELAY_MS * u64::from(attempt));
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn connect(&self) -> Result<UnixStream> {
        timeout(self.timeout, UnixStream::connect(&self.socket_path))
            .await
            .context("Connection timed out")?
            .with_context(|| {
                format!(
                    "Cannot reach the daemon at {}. Start it with 'tubesleep daemon'",
                    self.socket_path.display()
                )
            })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PlayableEntry, ResponseData};
    use tokio::net::UnixListener;

    // ------------------------------------------------------------------------
    // Helper functions
    // ------------------------------------------------------------------------

    fn create_temp_socket_path() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.sock");
        (dir, path)
    }

    /// Answers `connections` requests with `respond`, returning what was asked.
    fn spawn_mock_server<F>(
        socket_path: &Path,
        connections: usize,
        respond: F,
    ) -> tokio::task::JoinHandle<Vec<IpcRequest>>
    where
        F: Fn(&IpcRequest) -> IpcResponse + Send + 'static,
    {
        let listener = UnixListener::bind(socket_path).unwrap();
        tokio::spawn(async move {
            let mut received = Vec::new();
            for _ in 0..connections {
                let (mut stream, _) = listener.accept().await.unwrap();
                let mut buffer = Vec::new();
                stream.read_to_end(&mut buffer).await.unwrap();
                let request: IpcRequest = serde_json::from_slice(&buffer).unwrap();

                let json = serde_json::to_vec(&respond(&request)).unwrap();
                stream.write_all(&json).await.unwrap();
                stream.shutdown().await.unwrap();
                received.push(request);
            }
            received
        })
    }

    fn listing(ids: &[&str]) -> IpcResponse {
        let entries = ids
            .iter()
            .map(|id| EntryView {
                entry: PlayableEntry {
                    id: id.to_string(),
                    source_url: format!("https://youtu.be/{}", id),
                    display_title: id.to_string(),
                    added_at: 0,
                },
                selected: false,
            })
            .collect();
        IpcResponse::success(
            "",
            Some(ResponseData {
                entries: Some(entries),
                ..Default::default()
            }),
        )
    }

    // ------------------------------------------------------------------------
    // IpcClient Tests
    // ------------------------------------------------------------------------

    mod client_tests {
        use super::*;

        #[test]
        fn test_socket_path() {
            let client = IpcClient::new("/tmp/test.sock");
            assert_eq!(client.socket_path(), Path::new("/tmp/test.sock"));
        }

        #[tokio::test]
        async fn test_connection_failure() {
            let (_dir, socket_path) = create_temp_socket_path();
            let client = IpcClient::new(socket_path);

            let err = client.status().await.unwrap_err();
            assert!(format!("{:#}", err).contains("tubesleep daemon"));
        }

        #[tokio::test]
        async fn test_send_status_request() {
            let (_dir, socket_path) = create_temp_socket_path();
            let server = spawn_mock_server(&socket_path, 1, |_| {
                IpcResponse::success(
                    "",
                    Some(ResponseData {
                        mode: Some("idle".to_string()),
                        ..Default::default()
                    }),
                )
            });

            let client = IpcClient::new(socket_path);
            let response = client.status().await.unwrap();
            assert_eq!(response.data.unwrap().mode.as_deref(), Some("idle"));

            let received = server.await.unwrap();
            assert!(matches!(received[0], IpcRequest::Status));
        }

        #[tokio::test]
        async fn test_send_add_request() {
            let (_dir, socket_path) = create_temp_socket_path();
            let server =
                spawn_mock_server(&socket_path, 1, |_| IpcResponse::success("Added", None));

            let client = IpcClient::new(socket_path);
            client
                .add("https://youtu.be/a", Some("Rain".to_string()))
                .await
                .unwrap();

            let received = server.await.unwrap();
            match &received[0] {
                IpcRequest::Add { url, title } => {
                    assert_eq!(url, "https://youtu.be/a");
                    assert_eq!(title.as_deref(), Some("Rain"));
                }
                other => panic!("Expected Add request, got {:?}", other),
            }
        }

        #[tokio::test]
        async fn test_send_start_and_player_requests() {
            let (_dir, socket_path) = create_temp_socket_path();
            let server = spawn_mock_server(&socket_path, 2, |_| IpcResponse::success("OK", None));

            let client = IpcClient::new(socket_path);
            client.start(None).await.unwrap();
            client
                .player(PlayerEvent::Error { code: 101 })
                .await
                .unwrap();

            let received = server.await.unwrap();
            assert!(matches!(received[0], IpcRequest::Start { minutes: None }));
            assert!(matches!(
                received[1],
                IpcRequest::Player {
                    event: PlayerEvent::Error { code: 101 }
                }
            ));
        }

        #[tokio::test]
        async fn test_error_response_is_not_retried() {
            let (_dir, socket_path) = create_temp_socket_path();
            let server = spawn_mock_server(&socket_path, 1, |_| {
                IpcResponse::error("Nothing to play: the playlist is empty")
            });

            let client = IpcClient::new(socket_path);
            let err = client.start(Some(10)).await.unwrap_err();
            assert!(err.to_string().contains("Nothing to play"));

            // Exactly one connection was served
            assert_eq!(server.await.unwrap().len(), 1);
        }

        #[tokio::test]
        async fn test_unanswered_request_is_sent_once() {
            let (_dir, socket_path) = create_temp_socket_path();
            let listener = UnixListener::bind(&socket_path).unwrap();
            let server = tokio::spawn(async move {
                let mut delivered = 0;
                // Read each request and hang up without answering
                while let Ok(Ok((mut stream, _))) =
                    timeout(Duration::from_secs(2), listener.accept()).await
                {
                    let mut buffer = Vec::new();
                    stream.read_to_end(&mut buffer).await.unwrap();
                    delivered += 1;
                }
                delivered
            });

            let client = IpcClient::new(socket_path);
            let err = client.mute().await.unwrap_err();
            assert!(err.to_string().contains("without answering"));

            assert_eq!(server.await.unwrap(), 1);
        }
    }

    // ------------------------------------------------------------------------
    // Play target resolution
    // ------------------------------------------------------------------------

    mod play_target_tests {
        use super::*;

        #[tokio::test]
        async fn test_id_passes_through() {
            let client = IpcClient::new("/tmp/unused.sock");
            let id = client
                .resolve_play_target(PlayTarget::Id("abc".to_string()))
                .await
                .unwrap();
            assert_eq!(id, "abc");
        }

        #[tokio::test]
        async fn test_position_resolves_through_list() {
            let (_dir, socket_path) = create_temp_socket_path();
            let server = spawn_mock_server(&socket_path, 1, |_| listing(&["first", "second"]));

            let client = IpcClient::new(socket_path);
            let id = client
                .resolve_play_target(PlayTarget::Position(2))
                .await
                .unwrap();
            assert_eq!(id, "second");

            let received = server.await.unwrap();
            assert!(matches!(received[0], IpcRequest::List));
        }

        #[tokio::test]
        async fn test_position_out_of_range() {
            let (_dir, socket_path) = create_temp_socket_path();
            let _server = spawn_mock_server(&socket_path, 1, |_| listing(&["only"]));

            let client = IpcClient::new(socket_path);
            let err = client
                .resolve_play_target(PlayTarget::Position(3))
                .await
                .unwrap_err();
            assert!(err.to_string().contains("No entry at position 3"));
        }
    }
}
