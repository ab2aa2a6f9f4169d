//! Request/response channel over a tab's debugger WebSocket.
//!
//! Every call gets a fresh integer id and parks a oneshot sender in the pending
//! map. A background reader routes responses by id, so out-of-order replies are
//! fine. When the socket ends, the reader marks the channel closed and fails
//! every parked call with [`StageError::ChannelClosed`]; calls issued after
//! that fail immediately.

use crate::error::{Result, StageError};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use log::{debug, trace};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{Mutex as AsyncMutex, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type Reply = oneshot::Sender<Result<Value>>;

#[derive(Default)]
struct PendingCalls {
    /// Set once the socket is gone; holds the reason
    closed: Option<String>,
    calls: HashMap<u64, (String, Reply)>,
}

#[derive(Clone, Default)]
struct Pending(Arc<Mutex<PendingCalls>>);

impl Pending {
    fn lock(&self) -> MutexGuard<'_, PendingCalls> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn register(&self, id: u64, method: &str, reply: Reply) -> Result<()> {
        let mut pending = self.lock();
        if let Some(reason) = &pending.closed {
            return Err(StageError::ChannelClosed(reason.clone()));
        }
        pending.calls.insert(id, (method.to_string(), reply));
        Ok(())
    }

    fn take(&self, id: u64) -> Option<(String, Reply)> {
        self.lock().calls.remove(&id)
    }

    fn fail_all(&self, reason: &str) {
        let drained: Vec<(u64, (String, Reply))> = {
            let mut pending = self.lock();
            pending.closed.get_or_insert_with(|| reason.to_string());
            pending.calls.drain().collect()
        };

        if !drained.is_empty() {
            debug!("Failing {} pending CDP call(s): {}", drained.len(), reason);
        }
        for (_, (_, reply)) in drained {
            let _ = reply.send(Err(StageError::ChannelClosed(reason.to_string())));
        }
    }
}

/// One WebSocket connection to a target's debugger endpoint
pub struct CdpChannel {
    writer: AsyncMutex<SplitSink<WsStream, Message>>,
    pending: Pending,
    next_id: AtomicU64,
    command_timeout: Duration,
    reader: JoinHandle<()>,
}

impl CdpChannel {
    /// Open the debugger socket at `url`
    pub async fn connect(url: &str, connect_timeout: Duration, command_timeout: Duration) -> Result<Self> {
        let (stream, _) = tokio::time::timeout(connect_timeout, tokio_tungstenite::connect_async(url))
            .await
            .map_err(|_| StageError::ConnectionFailed {
                url: url.to_string(),
                reason: format!("timed out after {}ms", connect_timeout.as_millis()),
            })?
            .map_err(|e| StageError::ConnectionFailed { url: url.to_string(), reason: e.to_string() })?;

        debug!("Connected to {}", url);

        let (write, read) = stream.split();
        let pending = Pending::default();
        let reader = tokio::spawn(Self::reader_loop(read, pending.clone()));

        Ok(Self {
            writer: AsyncMutex::new(write),
            pending,
            next_id: AtomicU64::new(1),
            command_timeout,
            reader,
        })
    }

    /// Whether the socket is gone and every further call will fail
    pub fn is_closed(&self) -> bool {
        self.pending.lock().closed.is_some()
    }

    /// Send `method` with `params` and wait for its result
    pub async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.pending.register(id, method, tx)?;

        let message = serde_json::json!({ "id": id, "method": method, "params": params });
        trace!("-> {}", message);

        let sent = self.writer.lock().await.send(Message::Text(message.to_string().into())).await;
        if let Err(e) = sent {
            self.pending.take(id);
            return Err(StageError::ChannelClosed(format!("send of {} failed: {}", method, e)));
        }

        match tokio::time::timeout(self.command_timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(StageError::ChannelClosed(format!("reply for {} dropped", method))),
            Err(_) => {
                self.pending.take(id);
                Err(StageError::CommandTimeout {
                    method: method.to_string(),
                    timeout_ms: self.command_timeout.as_millis() as u64,
                })
            }
        }
    }

    /// Close the socket; outstanding calls fail with `ChannelClosed`
    pub async fn close(&self) {
        let _ = self.writer.lock().await.close().await;
        self.pending.fail_all("channel closed locally");
    }

    async fn reader_loop(mut read: SplitStream<WsStream>, pending: Pending) {
        let mut reason = "socket ended".to_string();

        while let Some(frame) = read.next().await {
            match frame {
                Ok(Message::Text(text)) => dispatch(&text, &pending),
                Ok(Message::Close(frame)) => {
                    reason = match frame {
                        Some(f) if !f.reason.is_empty() => format!("closed by remote: {}", f.reason.as_str()),
                        _ => "closed by remote".to_string(),
                    };
                    break;
                }
                Ok(_) => continue,
                Err(e) => {
                    reason = format!("socket error: {}", e);
                    break;
                }
            }
        }

        pending.fail_all(&reason);
    }
}

impl Drop for CdpChannel {
    fn drop(&mut self) {
        self.reader.abort();
        self.pending.fail_all("channel dropped");
    }
}

fn dispatch(text: &str, pending: &Pending) {
    let message: Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(e) => {
            debug!("Ignoring unparsable CDP frame: {}", e);
            return;
        }
    };

    let Some(id) = message.get("id").and_then(Value::as_u64) else {
        if let Some(event) = message.get("method").and_then(Value::as_str) {
            trace!("<- event {}", event);
        }
        return;
    };

    let Some((method, reply)) = pending.take(id) else {
        debug!("Response for unknown call id {}", id);
        return;
    };

    let outcome = match message.get("error") {
        Some(error) => Err(remote_failure(&method, error)),
        None => Ok(message.get("result").cloned().unwrap_or(Value::Null)),
    };
    let _ = reply.send(outcome);
}

/// Turn an error payload into a typed failure.
///
/// Errors reporting that the inspected target went away are transport
/// failures, not page failures.
fn remote_failure(method: &str, error: &Value) -> StageError {
    let code = error.get("code").and_then(Value::as_i64).unwrap_or(0);
    let message = error.get("message").and_then(Value::as_str).unwrap_or("CDP error").to_string();

    let lowered = message.to_ascii_lowercase();
    if lowered.contains("target closed") || lowered.contains("navigated or closed") || lowered.contains("session closed")
    {
        return StageError::ChannelClosed(format!("{}: {}", method, message));
    }

    StageError::RemoteError { method: method.to_string(), code, message }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_remote_failure_plain_error() {
        let err = remote_failure("DOM.setFileInputFiles", &json!({ "code": -32000, "message": "Node is not a file input element" }));
        match err {
            StageError::RemoteError { method, code, message } => {
                assert_eq!(method, "DOM.setFileInputFiles");
                assert_eq!(code, -32000);
                assert!(message.contains("file input"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_remote_failure_target_closed_is_channel_failure() {
        let err = remote_failure("Runtime.evaluate", &json!({ "code": -32000, "message": "Target closed" }));
        assert!(err.is_channel_failure());

        let err = remote_failure("Runtime.evaluate", &json!({ "code": -32000, "message": "Inspected target navigated or closed" }));
        assert!(err.is_channel_failure());
    }

    #[tokio::test]
    async fn test_pending_routes_by_id() {
        let pending = Pending::default();
        let (tx1, rx1) = oneshot::channel();
        let (tx2, rx2) = oneshot::channel();
        pending.register(1, "A", tx1).unwrap();
        pending.register(2, "B", tx2).unwrap();

        dispatch(r#"{"id":2,"result":{"v":"two"}}"#, &pending);
        dispatch(r#"{"method":"Page.loadEventFired","params":{}}"#, &pending);
        dispatch(r#"{"id":1,"result":{"v":"one"}}"#, &pending);

        assert_eq!(rx1.await.unwrap().unwrap()["v"], "one");
        assert_eq!(rx2.await.unwrap().unwrap()["v"], "two");
    }

    #[tokio::test]
    async fn test_fail_all_rejects_later_registrations() {
        let pending = Pending::default();
        let (tx, rx) = oneshot::channel();
        pending.register(7, "Runtime.evaluate", tx).unwrap();

        pending.fail_all("socket error: reset");

        assert!(matches!(rx.await.unwrap(), Err(StageError::ChannelClosed(_))));
        let (late, _) = oneshot::channel();
        assert!(matches!(pending.register(8, "Runtime.evaluate", late), Err(StageError::ChannelClosed(_))));
    }
}
