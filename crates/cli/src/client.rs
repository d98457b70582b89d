//! Control-socket client: one request, one matched response.

use crate::exit_error::ExitError;
use berth_wire::{FrameReader, Request, Response};
use std::path::PathBuf;
use std::time::Duration;
use tokio::net::UnixStream;

/// Command forwarding inside the daemon already uses the 5 s bridge
/// deadline; give the whole exchange a little headroom.
const CLIENT_TIMEOUT: Duration = Duration::from_secs(10);

pub struct DaemonClient {
    socket_path: PathBuf,
}

impl DaemonClient {
    pub fn new(socket_path: PathBuf) -> Self {
        Self { socket_path }
    }

    pub async fn request(&self, request: Request) -> Result<Response, ExitError> {
        let exchange = async {
            let stream = UnixStream::connect(&self.socket_path).await.map_err(|e| {
                ExitError::new(
                    1,
                    format!(
                        "daemon not reachable at {} ({e}); run `berth daemon start`",
                        self.socket_path.display()
                    ),
                )
            })?;
            let (read_half, mut write_half) = stream.into_split();
            berth_wire::write_frame(&mut write_half, &request)
                .await
                .map_err(|e| ExitError::new(1, format!("request failed: {e}")))?;

            let mut reader = FrameReader::new(read_half);
            reader
                .next::<Response>()
                .await
                .map_err(|e| ExitError::new(1, format!("bad response: {e}")))?
                .ok_or_else(|| ExitError::new(1, "daemon closed the connection"))
        };
        match tokio::time::timeout(CLIENT_TIMEOUT, exchange).await {
            Ok(result) => result,
            Err(_) => Err(ExitError::new(1, "timed out waiting for the daemon")),
        }
    }

    /// Send a command string and return the response data.
    pub async fn command(
        &self,
        command: &str,
        session: Option<u64>,
        wait_for_response: bool,
    ) -> Result<serde_json::Value, ExitError> {
        let request_id = Request::new_request_id();
        let response = self
            .request(Request::Command {
                request_id: request_id.clone(),
                command: command.to_string(),
                session,
                wait_for_response,
            })
            .await?;

        match response {
            Response::Command { request_id: rid, success, data, error } => {
                if rid != request_id {
                    return Err(ExitError::new(1, format!("response correlation mismatch: {rid}")));
                }
                if success {
                    Ok(data.unwrap_or(serde_json::Value::Null))
                } else {
                    Err(ExitError::new(
                        1,
                        error.unwrap_or_else(|| "command failed".to_string()),
                    ))
                }
            }
            Response::Error { message } => Err(ExitError::new(1, message)),
            other => Err(ExitError::new(1, format!("unexpected response: {other:?}"))),
        }
    }
}
