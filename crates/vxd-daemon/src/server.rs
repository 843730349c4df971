//! Socket server (C2): accepts connections on the listening Unix socket
//! and runs the per-client read/dispatch/write loop.

use std::sync::Arc;

use tokio::net::UnixListener;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};

use vxd_core::DaemonError;
use vxd_kernel::{Frame, read_frame, write_frame};

use crate::codec::{self, ParsedPayload, Response};
use crate::context::DaemonContext;
use crate::lifecycle::State;
use crate::mcp;
use crate::registry;
use crate::router::{self, Protocol};

/// Bind the configured socket and accept connections until the lifecycle
/// leaves `Running`. Each accepted connection is handled on its own task.
///
/// # Errors
///
/// Returns [`DaemonError::Io`] if the socket cannot be bound.
pub async fn run(ctx: Arc<DaemonContext>) -> Result<(), DaemonError> {
    let listener = vxd_kernel::bind_listener(&ctx.config.socket)?;
    info!(socket = %ctx.config.socket.display(), "accepting connections");

    let mut active_connections: u32 = 0;
    loop {
        if ctx.lifecycle.state() != State::Running {
            info!("lifecycle left Running, stopping accept loop");
            break;
        }

        let accept_result = match accept_with_signal_poll(&listener, &ctx).await {
            Some(result) => result,
            None => break,
        };
        let stream = match accept_result {
            Ok((stream, _addr)) => stream,
            Err(e) => {
                warn!(error = %e, "accept failed");
                continue;
            }
        };

        if active_connections >= ctx.config.max_connections {
            debug!("max connections reached, dropping new connection");
            drop(stream);
            continue;
        }
        active_connections = active_connections.saturating_add(1);

        let ctx = Arc::clone(&ctx);
        tokio::spawn(async move {
            handle_connection(stream, ctx).await;
        });
    }

    Ok(())
}

async fn accept_with_signal_poll(
    listener: &UnixListener,
    ctx: &Arc<DaemonContext>,
) -> Option<std::io::Result<(tokio::net::UnixStream, tokio::net::unix::SocketAddr)>> {
    loop {
        tokio::select! {
            result = listener.accept() => return Some(result),
            () = tokio::time::sleep(crate::lifecycle::SIGNAL_POLL_INTERVAL) => {
                ctx.lifecycle.process_signals();
                if ctx.lifecycle.state() != State::Running {
                    return None;
                }
            }
        }
    }
}

async fn handle_connection(stream: tokio::net::UnixStream, ctx: Arc<DaemonContext>) {
    let (mut reader, writer) = stream.into_split();
    let writer = Arc::new(AsyncMutex::new(writer));

    loop {
        let frame = match read_frame(&mut reader, ctx.config.max_payload_bytes).await {
            Ok(Some(frame)) => frame,
            Ok(None) => break,
            Err(e) => {
                debug!(error = %e, "closing connection after read error");
                break;
            }
        };

        let ctx = Arc::clone(&ctx);
        let writer = Arc::clone(&writer);
        tokio::spawn(async move {
            if let Err(e) = process_frame(frame, &ctx, &writer).await {
                debug!(error = %e, "failed to process frame");
            }
        });
    }
}

async fn process_frame(
    frame: Frame,
    ctx: &Arc<DaemonContext>,
    writer: &Arc<AsyncMutex<tokio::net::unix::OwnedWriteHalf>>,
) -> Result<(), DaemonError> {
    let correlation_id = frame.header.id;
    let protocol = router::classify(&frame.payload, ctx.config.protocol);

    let (is_notification, response_bytes) = match protocol {
        Protocol::JsonRpc => dispatch_jsonrpc(&frame.payload, ctx).await,
        Protocol::Mcp => dispatch_mcp(&frame.payload, ctx).await,
    };

    if is_notification {
        return Ok(());
    }

    let response_bytes = response_bytes?;
    let response_frame = Frame::new(correlation_id, response_bytes);
    let mut writer = writer.lock().await;
    write_frame(&mut *writer, &response_frame).await
}

async fn dispatch_jsonrpc(payload: &[u8], ctx: &Arc<DaemonContext>) -> (bool, Result<Vec<u8>, DaemonError>) {
    match codec::parse(payload) {
        Ok(ParsedPayload::Single(Ok(request))) => {
            let is_notification = request.is_notification();
            let response = registry::dispatch(ctx, &request).await;
            (is_notification, response.to_bytes())
        }
        Ok(ParsedPayload::Single(Err(e))) => (false, Response::error(serde_json::Value::Null, &e).to_bytes()),
        Ok(ParsedPayload::Batch(results)) => {
            let mut responses = Vec::new();
            for result in results {
                match result {
                    Ok(request) if request.is_notification() => {
                        registry::dispatch(ctx, &request).await;
                    }
                    Ok(request) => responses.push(registry::dispatch(ctx, &request).await),
                    Err(e) => responses.push(Response::error(serde_json::Value::Null, &e)),
                }
            }
            // An all-notification batch produces zero responses; per §6.1
            // that yields no output at all, not an empty array frame.
            let is_notification = responses.is_empty();
            (is_notification, serialize_batch(&responses))
        }
        Err(e) => (false, Response::error(serde_json::Value::Null, &e).to_bytes()),
    }
}

fn serialize_batch(responses: &[Response]) -> Result<Vec<u8>, DaemonError> {
    if responses.is_empty() {
        return Ok(b"[]".to_vec());
    }
    let values: Result<Vec<serde_json::Value>, DaemonError> = responses
        .iter()
        .map(|r| r.to_bytes().and_then(|b| serde_json::from_slice(&b).map_err(|e| DaemonError::Internal(e.to_string()))))
        .collect();
    serde_json::to_vec(&values?).map_err(|e| DaemonError::Internal(e.to_string()))
}

async fn dispatch_mcp(payload: &[u8], ctx: &Arc<DaemonContext>) -> (bool, Result<Vec<u8>, DaemonError>) {
    match mcp::parse(payload) {
        Ok(request) => {
            let is_notification = request.is_notification();
            let response = registry::dispatch(ctx, &request).await;
            (is_notification, mcp::to_bytes(&response))
        }
        Err(e) => (false, mcp::to_bytes(&Response::error(serde_json::Value::Null, &e))),
    }
}

/// Default maximum accepted payload size, per §4.2.
pub const DEFAULT_MAX_PAYLOAD_BYTES: u32 = 16 * 1024 * 1024;

#[cfg(test)]
mod tests {
    use super::*;
    use vxd_config::Config;
    use vxd_core::InMemoryEngine;

    #[tokio::test]
    async fn accept_loop_exits_immediately_when_not_running() {
        let socket_dir = tempfile::tempdir().unwrap();
        let render_dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.socket = socket_dir.path().join("test.sock");
        config.render.base_dir = render_dir.path().to_path_buf();
        let ctx = Arc::new(DaemonContext::with_engine(config, Arc::new(InMemoryEngine::new())));
        // Lifecycle starts `Stopped`, so the accept loop's first check exits
        // the loop without ever calling `accept()`.
        let result = tokio::time::timeout(std::time::Duration::from_secs(2), run(ctx)).await;
        assert!(result.is_ok());
    }

    fn new_context() -> Arc<DaemonContext> {
        let render_dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.render.base_dir = render_dir.path().to_path_buf();
        Arc::new(DaemonContext::with_engine(config, Arc::new(InMemoryEngine::new())))
    }

    #[tokio::test]
    async fn all_notification_batch_yields_no_output() {
        let ctx = new_context();
        let payload = br#"[{"jsonrpc":"2.0","method":"echo","params":["a"]},{"jsonrpc":"2.0","method":"echo","params":["b"]}]"#;
        let (is_notification, bytes) = dispatch_jsonrpc(payload, &ctx).await;
        assert!(is_notification);
        assert_eq!(bytes.unwrap(), b"[]");
        ctx.shutdown().await;
    }

    #[tokio::test]
    async fn mixed_batch_keeps_only_non_notification_responses() {
        let ctx = new_context();
        let payload = br#"[{"jsonrpc":"2.0","method":"echo","params":["a"],"id":1},{"jsonrpc":"2.0","method":"echo","params":["b"]},{"jsonrpc":"2.0","method":"rpc.x","id":2}]"#;
        let (is_notification, bytes) = dispatch_jsonrpc(payload, &ctx).await;
        assert!(!is_notification);
        let text = String::from_utf8(bytes.unwrap()).unwrap();
        assert!(text.contains("\"id\":1"));
        assert!(text.contains("\"id\":2"));
        assert!(text.contains("-32600"));
        ctx.shutdown().await;
    }
}
