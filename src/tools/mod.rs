//! Staging steps as individually runnable tools
//!
//! Each tool takes a JSON parameter object described by a JSON schema, runs
//! one step against an attached [`Page`], and reports a [`ToolResult`].
//!
//! ```rust,no_run
//! use draft_stage::tools::{ToolContext, ToolRegistry};
//! use draft_stage::{StageConfig, Stager};
//! use serde_json::json;
//!
//! # async fn run() -> draft_stage::Result<()> {
//! let stager = Stager::new(StageConfig::default())?;
//! let (_, session) = stager.open("https://chatgpt.com/").await?;
//! let registry = ToolRegistry::with_defaults();
//! let context = ToolContext::new(&session, stager.config());
//!
//! let result = registry.execute("set_prompt", json!({ "text": "Review this." }), &context).await?;
//! assert!(result.success);
//! # Ok(())
//! # }
//! ```

pub mod check_composer;
pub mod select_model;
pub mod select_thinking;
pub mod set_prompt;
pub mod upload_files;

pub use check_composer::{CheckComposerParams, CheckComposerTool};
pub use select_model::{SelectModelParams, SelectModelTool};
pub use select_thinking::{SelectThinkingParams, SelectThinkingTool};
pub use set_prompt::{SetPromptParams, SetPromptTool};
pub use upload_files::{UploadFilesParams, UploadFilesTool};

use crate::browser::Page;
use crate::config::StageConfig;
use crate::error::{Result, StageError};
use async_trait::async_trait;
use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What a tool runs against
pub struct ToolContext<'a> {
    pub page: &'a dyn Page,
    pub config: &'a StageConfig,
}

impl<'a> ToolContext<'a> {
    pub fn new(page: &'a dyn Page, config: &'a StageConfig) -> Self {
        Self { page, config }
    }
}

/// Outcome of one tool execution
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolResult {
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResult {
    pub fn success_with(data: Value) -> Self {
        Self { success: true, data: Some(data), error: None }
    }

    /// A page-level miss that still carries what was observed
    pub fn failure_with(error: impl Into<String>, data: Value) -> Self {
        Self { success: false, data: Some(data), error: Some(error.into()) }
    }
}

/// A staging step with typed parameters
#[async_trait]
pub trait Tool: Send + Sync {
    type Params: DeserializeOwned + JsonSchema + Send;

    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn parameters_schema(&self) -> Value {
        serde_json::to_value(schemars::schema_for!(Self::Params)).unwrap_or_default()
    }

    async fn execute_typed(&self, params: Self::Params, context: &ToolContext<'_>) -> Result<ToolResult>;
}

/// Object-safe view of a [`Tool`] taking raw JSON parameters
#[async_trait]
pub trait DynTool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn parameters_schema(&self) -> Value;

    async fn execute(&self, params: Value, context: &ToolContext<'_>) -> Result<ToolResult>;
}

#[async_trait]
impl<T: Tool> DynTool for T {
    fn name(&self) -> &str {
        Tool::name(self)
    }

    fn description(&self) -> &str {
        Tool::description(self)
    }

    fn parameters_schema(&self) -> Value {
        Tool::parameters_schema(self)
    }

    async fn execute(&self, params: Value, context: &ToolContext<'_>) -> Result<ToolResult> {
        let params: T::Params = serde_json::from_value(params)
            .map_err(|e| StageError::InvalidArgument(format!("Invalid parameters for {}: {}", Tool::name(self), e)))?;
        self.execute_typed(params, context).await
    }
}

/// Name, description and parameter schema of a registered tool
#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Tools by name, in registration order
#[derive(Default)]
pub struct ToolRegistry {
    tools: IndexMap<String, Box<dyn DynTool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every staging step, in the order a full run executes them
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(CheckComposerTool);
        registry.register(SelectModelTool);
        registry.register(SelectThinkingTool);
        registry.register(SetPromptTool);
        registry.register(UploadFilesTool);
        registry
    }

    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        self.tools.insert(Tool::name(&tool).to_string(), Box::new(tool));
    }

    pub fn get(&self, name: &str) -> Option<&dyn DynTool> {
        self.tools.get(name).map(|tool| tool.as_ref())
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    pub fn list(&self) -> Vec<ToolInfo> {
        self.tools
            .values()
            .map(|tool| ToolInfo {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: tool.parameters_schema(),
            })
            .collect()
    }

    pub async fn execute(&self, name: &str, params: Value, context: &ToolContext<'_>) -> Result<ToolResult> {
        let tool = self
            .get(name)
            .ok_or_else(|| StageError::InvalidArgument(format!("Unknown tool '{}'", name)))?;
        log::debug!("Executing tool {}", name);
        tool.execute(params, context).await
    }
}
