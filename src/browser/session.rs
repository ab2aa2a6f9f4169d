use crate::browser::channel::CdpChannel;
use crate::browser::config::ConnectionOptions;
use crate::browser::page::{ObjectHandle, Page};
use crate::browser::target::DebugTarget;
use crate::error::{Result, StageError};
use async_trait::async_trait;
use log::{debug, info};
use serde_json::{Value, json};
use std::path::PathBuf;
use std::time::Duration;

/// A page-level CDP session attached to one browser tab
pub struct PageSession {
    /// The tab this session drives
    target: DebugTarget,

    /// Debugger socket for the tab
    channel: CdpChannel,
}

impl PageSession {
    /// Connect to the target's debugger socket and enable the domains we use
    pub async fn attach(target: DebugTarget, options: &ConnectionOptions) -> Result<Self> {
        let ws_url = target.web_socket_debugger_url.clone().ok_or_else(|| {
            StageError::InvalidArgument(format!("Target {} has no webSocketDebuggerUrl", target.id))
        })?;

        let channel = CdpChannel::connect(
            &ws_url,
            Duration::from_millis(options.connect_timeout),
            Duration::from_millis(options.command_timeout),
        )
        .await?;

        for domain in ["Page.enable", "Runtime.enable", "DOM.enable"] {
            channel.call(domain, json!({})).await?;
        }
        channel.call("Page.bringToFront", json!({})).await?;

        info!("Attached to tab {} ({})", target.id, target.url);
        Ok(Self { target, channel })
    }

    /// The tab this session is attached to
    pub fn target(&self) -> &DebugTarget {
        &self.target
    }

    /// The underlying debugger channel
    pub fn channel(&self) -> &CdpChannel {
        &self.channel
    }

    /// Navigate the tab, used when an unrelated tab was reused
    pub async fn navigate(&self, url: &str) -> Result<()> {
        let result = self.channel.call("Page.navigate", json!({ "url": url })).await?;
        if let Some(error) = result.get("errorText").and_then(Value::as_str) {
            return Err(StageError::EvaluationFailed(format!("Navigation to {} failed: {}", url, error)));
        }
        Ok(())
    }

    /// Tear down the debugger socket
    pub async fn close(&self) {
        debug!("Closing session for tab {}", self.target.id);
        self.channel.close().await;
    }

    async fn runtime_evaluate(&self, expression: &str, by_value: bool) -> Result<Value> {
        let result = self
            .channel
            .call(
                "Runtime.evaluate",
                json!({
                    "expression": expression,
                    "returnByValue": by_value,
                    "awaitPromise": true,
                    "userGesture": true,
                }),
            )
            .await?;

        if let Some(details) = result.get("exceptionDetails") {
            let description = details
                .pointer("/exception/description")
                .and_then(Value::as_str)
                .or_else(|| details.get("text").and_then(Value::as_str))
                .unwrap_or("unknown exception");
            return Err(StageError::EvaluationFailed(description.to_string()));
        }

        Ok(result.get("result").cloned().unwrap_or(Value::Null))
    }
}

#[async_trait]
impl Page for PageSession {
    async fn evaluate(&self, expression: &str) -> Result<Value> {
        let remote = self.runtime_evaluate(expression, true).await?;
        Ok(remote.get("value").cloned().unwrap_or(Value::Null))
    }

    async fn evaluate_handle(&self, expression: &str) -> Result<ObjectHandle> {
        let remote = self.runtime_evaluate(expression, false).await?;
        serde_json::from_value(remote)
            .map_err(|e| StageError::InvalidResponse(format!("Malformed remote object: {}", e)))
    }

    async fn set_file_input_files(&self, handle: &ObjectHandle, files: &[PathBuf]) -> Result<()> {
        let object_id = handle
            .object_id
            .as_deref()
            .ok_or_else(|| StageError::InvalidArgument("File input handle has no objectId".to_string()))?;

        let files: Vec<String> = files.iter().map(|p| p.to_string_lossy().into_owned()).collect();
        self.channel
            .call("DOM.setFileInputFiles", json!({ "files": files, "objectId": object_id }))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Integration tests (require Chrome running with --remote-debugging-port=9222)
    #[tokio::test]
    #[ignore] // Ignore by default, run with: cargo test -- --ignored
    async fn test_attach_and_evaluate() {
        let options = ConnectionOptions::default();
        let locator = crate::browser::TargetLocator::new(options.clone()).expect("Failed to build locator");
        let located = locator.ensure_target("about:blank").await.expect("No target");

        let session = PageSession::attach(located.target, &options).await.expect("Failed to attach");
        let value = session.evaluate("1 + 2").await.expect("Evaluation failed");
        assert_eq!(value, serde_json::json!(3));
        session.close().await;
    }
}
