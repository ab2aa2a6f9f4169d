use crate::dom::{AttachmentSet, upload_files};
use crate::error::Result;
use crate::tools::{Tool, ToolContext, ToolResult};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Parameters for the upload_files tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct UploadFilesParams {
    /// Files to attach; every one must exist
    pub paths: Vec<PathBuf>,

    /// Overall timeout the attachment deadline derives from (milliseconds, default: 60000)
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,
}

fn default_timeout() -> u64 {
    60_000
}

/// Attach files through the composer's file input
#[derive(Default)]
pub struct UploadFilesTool;

#[async_trait]
impl Tool for UploadFilesTool {
    type Params = UploadFilesParams;

    fn name(&self) -> &str {
        "upload_files"
    }

    fn description(&self) -> &str {
        "Attach files to the draft and wait until the page shows them"
    }

    async fn execute_typed(&self, params: UploadFilesParams, context: &ToolContext<'_>) -> Result<ToolResult> {
        let attachments = AttachmentSet::new(&params.paths)?;
        let state =
            upload_files(context.page, context.config, &attachments, Duration::from_millis(params.timeout_ms)).await?;

        Ok(ToolResult::success_with(serde_json::json!({
            "files": attachments.file_names(),
            "fileCount": state.file_count,
            "visibleNames": state.visible_names,
        })))
    }
}
