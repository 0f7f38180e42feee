//! IPC server for the TubeSleep daemon.
//!
//! One JSON request per connection over a Unix domain socket. The client
//! writes its request and shuts down its write half; the server answers with
//! one JSON response and closes.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::time::{timeout, Duration};
use tracing::{debug, info, warn};

use crate::types::{IpcRequest, IpcResponse, PlayerEvent, ResponseData};

use super::orchestrator::{Orchestrator, SessionEvent};
use super::session::SessionDriver;

// ============================================================================
// Constants
// ============================================================================

/// Maximum request size in bytes (16KB)
pub const MAX_REQUEST_SIZE: usize = 16 * 1024;

/// Read timeout in seconds
const READ_TIMEOUT_SECS: u64 = 5;

// ============================================================================
// IpcError
// ============================================================================

/// IPC-specific error types.
#[derive(Debug, thiserror::Error)]
pub enum IpcError {
    /// Socket binding error
    #[error("Failed to bind socket: {0}")]
    BindError(String),

    /// Connection error
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Read error
    #[error("Failed to read request: {0}")]
    ReadError(String),

    /// Write error
    #[error("Failed to write response: {0}")]
    WriteError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Timeout error
    #[error("Operation timed out")]
    Timeout,

    /// Request too large
    #[error("Request too large (max {MAX_REQUEST_SIZE} bytes)")]
    RequestTooLarge,
}

// ============================================================================
// IpcServer
// ============================================================================

/// Unix Domain Socket IPC server.
pub struct IpcServer {
    listener: UnixListener,
    /// Socket path (for cleanup)
    socket_path: PathBuf,
}

impl IpcServer {
    /// Binds the socket, replacing a stale socket file and creating the
    /// parent directory if needed.
    pub fn new(socket_path: &Path) -> Result<Self> {
        if socket_path.exists() {
            std::fs::remove_file(socket_path)
                .with_context(|| format!("Failed to remove existing socket: {:?}", socket_path))?;
        }

        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create socket directory: {:?}", parent))?;
        }

        let listener = UnixListener::bind(socket_path)
            .map_err(|e| IpcError::BindError(format!("{:?}: {}", socket_path, e)))?;

        Ok(Self {
            listener,
            socket_path: socket_path.to_path_buf(),
        })
    }

    /// Accepts an incoming client connection.
    pub async fn accept(&self) -> Result<UnixStream> {
        let (stream, _addr) = self
            .listener
            .accept()
            .await
            .map_err(|e| IpcError::ConnectionError(e.to_string()))?;
        Ok(stream)
    }

    /// Reads one request, up to EOF or [`MAX_REQUEST_SIZE`].
    pub async fn receive_request(stream: &mut UnixStream) -> Result<IpcRequest> {
        let mut buffer = Vec::with_capacity(1024);
        let limit = (MAX_REQUEST_SIZE + 1) as u64;

        let read_result = timeout(
            Duration::from_secs(READ_TIMEOUT_SECS),
            (&mut *stream).take(limit).read_to_end(&mut buffer),
        )
        .await;

        match read_result {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => return Err(IpcError::ReadError(e.to_string()).into()),
            Err(_) => return Err(IpcError::Timeout.into()),
        }

        if buffer.is_empty() {
            anyhow::bail!("Connection closed by client");
        }
        if buffer.len() > MAX_REQUEST_SIZE {
            return Err(IpcError::RequestTooLarge.into());
        }

        let request: IpcRequest = serde_json::from_slice(&buffer)
            .map_err(|e| IpcError::SerializationError(e.to_string()))?;

        Ok(request)
    }

    /// Serializes and sends an IPC response to the stream.
    pub async fn send_response(stream: &mut UnixStream, response: &IpcResponse) -> Result<()> {
        let json = serde_json::to_vec(response)
            .map_err(|e| IpcError::SerializationError(e.to_string()))?;

        stream
            .write_all(&json)
            .await
            .map_err(|e| IpcError::WriteError(e.to_string()))?;
        stream
            .shutdown()
            .await
            .context("Failed to close response stream")?;

        Ok(())
    }

    /// Returns the socket path.
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }
}

impl Drop for IpcServer {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.socket_path);
    }
}

/// Serves one connection: read, handle, answer.
pub async fn serve_connection(mut stream: UnixStream, handler: RequestHandler) {
    let response = match IpcServer::receive_request(&mut stream).await {
        Ok(request) => {
            debug!(?request, "IPC request");
            handler.handle(request).await
        }
        Err(e) => {
            warn!(error = %e, "Bad IPC request");
            IpcResponse::error(format!("Invalid request: {}", e))
        }
    };

    if let Err(e) = IpcServer::send_response(&mut stream, &response).await {
        warn!(error = %e, "Failed to send IPC response");
    }
}

// ============================================================================
// RequestHandler
// ============================================================================

/// Translates IPC requests into session events.
#[derive(Clone)]
pub struct RequestHandler {
    driver: Arc<SessionDriver>,
}

impl RequestHandler {
    pub fn new(driver: Arc<SessionDriver>) -> Self {
        Self { driver }
    }

    /// Handles an IPC request and returns the response. Never fails.
    pub async fn handle(&self, request: IpcRequest) -> IpcResponse {
        match request {
            IpcRequest::Add { url, title } => {
                self.transition(SessionEvent::AddEntry { url, title }, |_| {
                    "Added to the playlist".to_string()
                })
                .await
            }
            IpcRequest::Remove { id } => {
                self.transition(SessionEvent::RemoveEntry { id }, |_| {
                    "Removed from the playlist".to_string()
                })
                .await
            }
            IpcRequest::Clear => {
                self.transition(SessionEvent::ClearEntries, |_| {
                    "Playlist cleared".to_string()
                })
                .await
            }
            IpcRequest::List => self.handle_list().await,
            IpcRequest::Play { id } => {
                self.transition(SessionEvent::Play { id }, |o| {
                    let title = o
                        .selected_entry()
                        .map(|e| e.display_title.as_str())
                        .unwrap_or_default();
                    format!("Playing: {}", title)
                })
                .await
            }
            IpcRequest::Start { minutes } => {
                let minutes = match minutes {
                    Some(m) => m,
                    None => self.driver.read(|o| o.config().default_minutes).await,
                };
                self.transition(SessionEvent::StartCountdown { minutes }, move |_| {
                    format!("Sleep timer started for {} minutes", minutes)
                })
                .await
            }
            IpcRequest::Cancel => {
                self.transition(SessionEvent::CancelCountdown, |_| {
                    "Sleep timer cancelled and playback stopped".to_string()
                })
                .await
            }
            IpcRequest::Mute => {
                self.transition(SessionEvent::ToggleMute, |o| {
                    if o.playback().is_muted() {
                        "Muted".to_string()
                    } else {
                        "Unmuted".to_string()
                    }
                })
                .await
            }
            IpcRequest::Wake => {
                self.transition(SessionEvent::Wake, |_| "Good morning".to_string())
                    .await
            }
            IpcRequest::Status => {
                let data = self.driver.read(Orchestrator::status).await;
                IpcResponse::success("", Some(data))
            }
            IpcRequest::Directive => {
                let directive = self.driver.read(Orchestrator::directive).await;
                IpcResponse::success(
                    "",
                    Some(ResponseData {
                        directive: Some(directive),
                        ..Default::default()
                    }),
                )
            }
            IpcRequest::Player { event } => {
                self.transition(SessionEvent::Player(event), move |_| {
                    format!("Player event recorded: {}", event_name(&event))
                })
                .await
            }
        }
    }

    async fn handle_list(&self) -> IpcResponse {
        let (entries, mut data) = self
            .driver
            .read(|o| (o.entry_views(), o.status()))
            .await;
        let message = format!("{} item(s)", entries.len());
        data.entries = Some(entries);
        IpcResponse::success(message, Some(data))
    }

    /// Dispatches `event` and answers with the state it produced.
    async fn transition<F>(&self, event: SessionEvent, message: F) -> IpcResponse
    where
        F: FnOnce(&Orchestrator) -> String,
    {
        let outcome = self
            .driver
            .dispatch_with(event, |o| (message(o), o.status()))
            .await;
        match outcome {
            Ok((transition, (message, mut data))) => {
                data.entry_id = transition.added;
                IpcResponse::success(message, Some(data))
            }
            Err(e) => {
                if e.is_not_found() {
                    debug!(error = %e, "Request for unknown entry");
                } else {
                    info!(error = %e, "Request rejected");
                }
                IpcResponse::error(e.to_string())
            }
        }
    }
}

fn event_name(event: &PlayerEvent) -> String {
    match event {
        PlayerEvent::Started => "started".to_string(),
        PlayerEvent::Ended => "ended".to_string(),
        PlayerEvent::Paused => "paused".to_string(),
        PlayerEvent::Resumed => "resumed".to_string(),
        PlayerEvent::Error { code } => format!("error {}", code),
    }
}

// ============================================================================
// Tests
// ============================================================================
