use crate::browser::Page;
use crate::dom::scripts::SET_PROMPT;
use crate::dom::{UiSelectors, run_script};
use crate::error::{Result, StageError};
use log::{info, warn};
use serde::{Deserialize, Serialize};

/// Which input primitive received the prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PromptMode {
    #[serde(rename = "textarea")]
    Textarea,
    #[serde(rename = "contenteditable")]
    ContentEditable,
}

/// Result of writing the prompt, as reported by the page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptOutcome {
    pub ok: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<PromptMode>,

    /// Length of the composer content after writing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<usize>,

    /// `composer-input-not-found` or `exception`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl PromptOutcome {
    /// Turn a page-reported failure into [`StageError::PromptInjectionFailed`]
    pub fn into_result(self) -> Result<Self> {
        if self.ok {
            return Ok(self);
        }
        let reason = self.reason.unwrap_or_else(|| "unknown".to_string());
        Err(StageError::PromptInjectionFailed(match self.message {
            Some(message) => format!("{}: {}", reason, message),
            None => reason,
        }))
    }
}

/// Write `text` into whichever input primitive the composer renders.
///
/// Page-side failures come back as `ok: false`; only transport or protocol
/// failures are `Err`.
pub async fn set_prompt(page: &dyn Page, selectors: &UiSelectors, text: &str) -> Result<PromptOutcome> {
    let outcome: PromptOutcome =
        run_script(page, SET_PROMPT, &serde_json::json!({ "selectors": selectors, "text": text })).await?;

    if outcome.ok {
        let expected = text.encode_utf16().count();
        match outcome.length {
            Some(length) if length != expected => {
                warn!("Composer holds {} characters after writing a {}-character prompt", length, expected)
            }
            _ => info!("Prompt set via {:?} ({} characters)", outcome.mode, expected),
        }
    }

    Ok(outcome)
}
