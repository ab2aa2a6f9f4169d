use crate::dom::await_composer_ready;
use crate::error::Result;
use crate::tools::{Tool, ToolContext, ToolResult};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Parameters for the check_composer tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CheckComposerParams {
    /// How long to wait for the composer (milliseconds, default: 30000)
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,
}

fn default_timeout() -> u64 {
    30_000
}

/// Wait until the composer has a text surface and a file input
#[derive(Default)]
pub struct CheckComposerTool;

#[async_trait]
impl Tool for CheckComposerTool {
    type Params = CheckComposerParams;

    fn name(&self) -> &str {
        "check_composer"
    }

    fn description(&self) -> &str {
        "Wait until the composer accepts text and files"
    }

    async fn execute_typed(&self, params: CheckComposerParams, context: &ToolContext<'_>) -> Result<ToolResult> {
        let readiness =
            await_composer_ready(context.page, context.config, Duration::from_millis(params.timeout_ms)).await?;
        Ok(ToolResult::success_with(serde_json::to_value(readiness)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_composer_params_default() {
        let params: CheckComposerParams = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(params.timeout_ms, 30_000);
    }

    #[test]
    fn test_check_composer_tool_metadata() {
        let tool = CheckComposerTool;
        assert_eq!(tool.name(), "check_composer");
        assert!(tool.parameters_schema().is_object());
    }
}
