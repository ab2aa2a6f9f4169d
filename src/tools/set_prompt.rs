use crate::dom::set_prompt;
use crate::error::Result;
use crate::tools::{Tool, ToolContext, ToolResult};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the set_prompt tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SetPromptParams {
    /// Text to place in the composer, replacing what is there
    pub text: String,
}

/// Write the prompt without submitting it
#[derive(Default)]
pub struct SetPromptTool;

#[async_trait]
impl Tool for SetPromptTool {
    type Params = SetPromptParams;

    fn name(&self) -> &str {
        "set_prompt"
    }

    fn description(&self) -> &str {
        "Write prompt text into the composer without sending it"
    }

    async fn execute_typed(&self, params: SetPromptParams, context: &ToolContext<'_>) -> Result<ToolResult> {
        let outcome = set_prompt(context.page, &context.config.selectors, &params.text).await?.into_result()?;
        Ok(ToolResult::success_with(serde_json::to_value(outcome)?))
    }
}
