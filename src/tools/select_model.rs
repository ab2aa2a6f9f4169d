use crate::error::Result;
use crate::selector::select_model;
use crate::tools::{Tool, ToolContext, ToolResult};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the select_model tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SelectModelParams {
    /// Model label as shown in the menu, e.g. "GPT-5.2 Pro" or "gpt-5-2-pro"
    pub model: String,
}

/// Switch the chat model through the model menu
#[derive(Default)]
pub struct SelectModelTool;

#[async_trait]
impl Tool for SelectModelTool {
    type Params = SelectModelParams;

    fn name(&self) -> &str {
        "select_model"
    }

    fn description(&self) -> &str {
        "Select a chat model from the model menu"
    }

    async fn execute_typed(&self, params: SelectModelParams, context: &ToolContext<'_>) -> Result<ToolResult> {
        let report = select_model(context.page, context.config, &params.model).await?;
        let data = serde_json::to_value(&report)?;

        if report.is_success() {
            Ok(ToolResult::success_with(data))
        } else {
            Ok(ToolResult::failure_with(format!("model selection failed: {}", report.status), data))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_model_params() {
        let params: SelectModelParams = serde_json::from_value(serde_json::json!({ "model": "gpt-5-2" })).unwrap();
        assert_eq!(params.model, "gpt-5-2");

        assert!(serde_json::from_value::<SelectModelParams>(serde_json::json!({})).is_err());
    }

    #[test]
    fn test_select_model_tool_metadata() {
        let tool = SelectModelTool;
        assert_eq!(tool.name(), "select_model");
        assert!(tool.parameters_schema().is_object());
    }
}
