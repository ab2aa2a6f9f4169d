//! Composer-level DOM operations
//!
//! This module holds everything that reads or writes the chat page's composer:
//! - scripts: the in-page snippets and their invocation format
//! - readiness: polling until the composer can be driven
//! - composer: writing the prompt text
//! - attachments: validating and uploading attachment files
//!
//! Selectors are plain data ([`UiSelectors`]) so a changed page can be handled
//! through configuration instead of code.

pub mod attachments;
pub mod composer;
pub mod readiness;
pub mod scripts;

pub use attachments::{AttachmentSet, AttachmentState, upload_files};
pub use composer::{PromptMode, PromptOutcome, set_prompt};
pub use readiness::{Readiness, await_composer_ready, probe_composer};
pub use scripts::Script;

use crate::browser::Page;
use crate::error::{Result, StageError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Ordered CSS selector lists; the first visible match wins
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct UiSelectors {
    /// Plain text inputs for the prompt
    pub textarea: Vec<String>,

    /// Rich editable regions used when no plain input is rendered
    pub editor: Vec<String>,

    pub file_input: Vec<String>,

    /// Region whose rendered text shows attachment names
    pub composer: Vec<String>,

    pub model_button: Vec<String>,

    /// Candidate toggles for the reasoning-level menu
    pub thinking_chip: Vec<String>,

    /// A candidate toggle must mention one of these (lowercase)
    pub thinking_keywords: Vec<String>,

    pub menu_container: Vec<String>,

    pub menu_item: Vec<String>,

    /// Markers of an ephemeral chat session
    pub temporary_chat: Vec<String>,
}

fn owned(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl Default for UiSelectors {
    fn default() -> Self {
        Self {
            textarea: owned(&[
                "textarea#prompt-textarea",
                "textarea[data-testid='prompt-textarea']",
                "form textarea",
                "textarea",
            ]),
            editor: owned(&[
                "#prompt-textarea[contenteditable='true']",
                "div.ProseMirror[contenteditable='true']",
                "[contenteditable='true'][role='textbox']",
                "[contenteditable='true']",
            ]),
            file_input: owned(&["form input[type='file'][multiple]", "form input[type='file']", "input[type='file']"]),
            composer: owned(&["form[data-type='unified-composer']", "form:has(#prompt-textarea)", "form"]),
            model_button: owned(&[
                "button[data-testid='model-switcher-dropdown-button']",
                "button[aria-label*='Model selector']",
                "button[aria-haspopup='menu'][aria-label*='model' i]",
            ]),
            thinking_chip: owned(&[
                "form button[aria-haspopup='menu']",
                "form [role='button'][aria-haspopup]",
                "form button",
                "button[aria-haspopup='menu']",
            ]),
            thinking_keywords: owned(&["think", "reason", "effort"]),
            menu_container: owned(&["[role='menu']", "[data-radix-menu-content]", "[role='listbox']", "[role='radiogroup']"]),
            menu_item: owned(&[
                "[role='menuitem']",
                "[role='menuitemradio']",
                "[role='option']",
                "[role='radio']",
                "[data-testid^='model-switcher-']",
            ]),
            temporary_chat: owned(&[
                "[data-testid='temporary-chat-label']",
                "button[aria-label*='temporary' i][aria-pressed='true']",
            ]),
        }
    }
}

/// Run `script` with `args` and deserialize its value
pub(crate) async fn run_script<T: DeserializeOwned>(page: &dyn Page, script: Script, args: &Value) -> Result<T> {
    let value = page.evaluate(&script.call(args)).await?;
    serde_json::from_value(value)
        .map_err(|e| StageError::InvalidResponse(format!("{} returned unexpected data: {}", script.name(), e)))
}
