use crate::error::Result;
use crate::selector::select_thinking_level;
use crate::tools::{Tool, ToolContext, ToolResult};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the select_thinking tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SelectThinkingParams {
    /// Reasoning level label, e.g. "Extended"
    pub level: String,
}

#[derive(Default)]
pub struct SelectThinkingTool;

#[async_trait]
impl Tool for SelectThinkingTool {
    type Params = SelectThinkingParams;

    fn name(&self) -> &str {
        "select_thinking"
    }

    fn description(&self) -> &str {
        "Select a reasoning level through the composer's thinking chip"
    }

    async fn execute_typed(&self, params: SelectThinkingParams, context: &ToolContext<'_>) -> Result<ToolResult> {
        let report = select_thinking_level(context.page, context.config, &params.level).await?;
        let data = serde_json::to_value(&report)?;

        if report.is_success() {
            Ok(ToolResult::success_with(data))
        } else {
            Ok(ToolResult::failure_with(format!("reasoning-level selection failed: {}", report.status), data))
        }
    }
}
