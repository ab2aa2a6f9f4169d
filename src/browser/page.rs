use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

/// Live reference to an in-page object (`Runtime.RemoteObject`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ObjectHandle {
    #[serde(rename = "type", default)]
    pub object_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
}

impl ObjectHandle {
    /// Handle to a DOM node with the given remote object id
    pub fn node(object_id: impl Into<String>) -> Self {
        Self {
            object_type: "object".to_string(),
            subtype: Some("node".to_string()),
            class_name: None,
            description: None,
            object_id: Some(object_id.into()),
        }
    }

    /// The expression evaluated to `null`/`undefined` or a primitive
    pub fn is_null(&self) -> bool {
        self.object_id.is_none() || self.subtype.as_deref() == Some("null")
    }
}

/// The only way the automation touches the live DOM.
///
/// The page mutates on its own between any two calls, so callers re-query
/// elements on every evaluation and never hold on to handles beyond the
/// operation they were fetched for.
#[async_trait]
pub trait Page: Send + Sync {
    /// Evaluate `expression` and return its JSON value (promises are awaited)
    async fn evaluate(&self, expression: &str) -> Result<Value>;

    /// Evaluate `expression` and return a live handle to the result
    async fn evaluate_handle(&self, expression: &str) -> Result<ObjectHandle>;

    /// Populate a file input (referenced by `handle`) with `files` in one operation
    async fn set_file_input_files(&self, handle: &ObjectHandle, files: &[PathBuf]) -> Result<()>;
}
