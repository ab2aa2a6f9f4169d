//! Scripted in-memory page for driving the staging steps without a browser.
//!
//! The fake recognises each in-page snippet by its invocation prefix and
//! answers from a small model of the composer, the model menu and the
//! reasoning-level menu.

#![allow(dead_code)]

use async_trait::async_trait;
use draft_stage::browser::{ObjectHandle, Page};
use draft_stage::dom::scripts::{
    ATTACHMENT_STATE, CLICK_OPTION, CLOSE_MENU, COLLECT_OPTIONS, CONTROL_STATE, OPEN_CONTROL, PROBE_COMPOSER,
    RESOLVE_FILE_INPUT, SET_PROMPT,
};
use draft_stage::{Result, StageConfig, StageError, Timing};
use serde_json::{Value, json};
use std::path::PathBuf;
use std::sync::Mutex;

/// Config with short waits so failing paths finish quickly
pub fn fast_config() -> StageConfig {
    StageConfig {
        timing: Timing {
            readiness_poll: 5,
            attachment_poll: 5,
            attachment_min_wait: 200,
            selection_budget: 400,
            control_wait: 100,
            menu_settle: 0,
        },
        ..StageConfig::default()
    }
}

#[derive(Debug, Clone)]
pub struct FakeEntry {
    pub label: String,
    pub identifier: Option<String>,

    /// What the model button shows once this entry is chosen
    pub control_label: String,

    pub children: Vec<FakeEntry>,
    pub disabled: bool,
}

impl FakeEntry {
    pub fn model(label: &str, identifier: &str, control_label: &str) -> Self {
        Self {
            label: label.to_string(),
            identifier: Some(identifier.to_string()),
            control_label: control_label.to_string(),
            children: Vec::new(),
            disabled: false,
        }
    }

    pub fn submenu(label: &str, children: Vec<FakeEntry>) -> Self {
        Self {
            label: label.to_string(),
            identifier: None,
            control_label: String::new(),
            children,
            disabled: false,
        }
    }

    pub fn level(label: &str) -> Self {
        Self {
            label: label.to_string(),
            identifier: None,
            control_label: label.to_string(),
            children: Vec::new(),
            disabled: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMenu {
    Model,
    Thinking,
}

#[derive(Debug, Default)]
pub struct FakeState {
    /// `Some` when a plain text input is rendered
    pub textarea: Option<String>,

    /// `Some` when a rich editor is rendered
    pub editor: Option<String>,

    pub file_input: bool,
    pub files: Vec<PathBuf>,

    /// How many attached names the page renders; `None` renders all
    pub rendered_names: Option<usize>,

    /// Probes left before the composer appears
    pub loading_probes: usize,

    /// The composer throws while the prompt is written
    pub reject_prompt: bool,

    pub model_button: bool,
    pub model_label: String,
    pub models: Vec<FakeEntry>,
    pub expanded_submenu: Option<usize>,

    pub thinking_chip: bool,
    pub levels: Vec<FakeEntry>,
    pub level: Option<String>,

    pub open_menu: Option<OpenMenu>,
    pub temporary_chat: bool,

    /// Option clicks performed, submenu openers included
    pub clicks: usize,
    pub set_files_calls: usize,
}

enum Action {
    Expand(usize),
    Model(String),
    Level(String),
}

pub struct FakePage {
    pub state: Mutex<FakeState>,
}

impl FakePage {
    pub fn new(state: FakeState) -> Self {
        Self { state: Mutex::new(state) }
    }

    /// A composer with a plain text input and a file input
    pub fn composer() -> FakeState {
        FakeState { textarea: Some(String::new()), file_input: true, ..FakeState::default() }
    }

    pub fn with<T>(&self, f: impl FnOnce(&mut FakeState) -> T) -> T {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    fn menu_items(state: &FakeState) -> Vec<(Value, Action)> {
        let mut items = Vec::new();
        match state.open_menu {
            Some(OpenMenu::Model) => {
                for (position, entry) in state.models.iter().enumerate() {
                    let submenu = !entry.children.is_empty();
                    let action = if submenu { Action::Expand(position) } else { Action::Model(entry.control_label.clone()) };
                    let selected = !submenu && entry.control_label == state.model_label;
                    items.push((Self::item(items.len(), entry, submenu, selected), action));
                }
                if let Some(position) = state.expanded_submenu {
                    for child in &state.models[position].children {
                        let selected = child.control_label == state.model_label;
                        items.push((Self::item(items.len(), child, false, selected), Action::Model(child.control_label.clone())));
                    }
                }
            }
            Some(OpenMenu::Thinking) => {
                for entry in &state.levels {
                    let selected = state.level.as_deref() == Some(entry.label.as_str());
                    items.push((Self::item(items.len(), entry, false, selected), Action::Level(entry.label.clone())));
                }
            }
            None => {}
        }
        items
    }

    fn item(index: usize, entry: &FakeEntry, submenu: bool, selected: bool) -> Value {
        json!({
            "index": index,
            "label": entry.label,
            "identifier": entry.identifier,
            "submenu": submenu,
            "selected": selected,
            "disabled": entry.disabled,
        })
    }

    fn answer(&self, expression: &str) -> Result<Value> {
        let mut state = self.state.lock().unwrap();

        if PROBE_COMPOSER.invocation_args(expression).is_some() {
            if state.loading_probes > 0 {
                state.loading_probes -= 1;
                return Ok(json!({ "textareaReady": false, "fileInputReady": false }));
            }
            let text_ready = state.textarea.is_some() || state.editor.is_some();
            return Ok(json!({ "textareaReady": text_ready, "fileInputReady": state.file_input }));
        }

        if let Some(args) = SET_PROMPT.invocation_args(expression) {
            let text = args["text"].as_str().unwrap_or_default().to_string();
            let length = text.encode_utf16().count();
            if state.reject_prompt {
                return Ok(json!({ "ok": false, "reason": "exception", "message": "editor detached" }));
            }
            if let Some(value) = state.textarea.as_mut() {
                *value = text;
                return Ok(json!({ "ok": true, "mode": "textarea", "length": length }));
            }
            if let Some(value) = state.editor.as_mut() {
                *value = text;
                return Ok(json!({ "ok": true, "mode": "contenteditable", "length": length }));
            }
            return Ok(json!({ "ok": false, "reason": "composer-input-not-found" }));
        }

        if ATTACHMENT_STATE.invocation_args(expression).is_some() {
            let chips: Vec<String> = state
                .files
                .iter()
                .take(state.rendered_names.unwrap_or(usize::MAX))
                .filter_map(|p| p.file_name())
                .map(|name| format!("{}\nRemove file", name.to_string_lossy()))
                .collect();
            return Ok(json!({ "fileCount": state.files.len(), "renderedText": chips.join("\n") }));
        }

        if let Some(args) = CONTROL_STATE.invocation_args(expression) {
            let temporary_chat = state.temporary_chat;
            return Ok(match args["kind"].as_str() {
                Some("model") if state.model_button => json!({
                    "found": true,
                    "label": state.model_label,
                    "ariaLabel": format!("Model selector, current model is {}", state.model_label),
                    "expanded": state.open_menu == Some(OpenMenu::Model),
                    "temporaryChat": temporary_chat,
                }),
                Some("thinking") if state.thinking_chip => json!({
                    "found": true,
                    "label": state.level.clone().unwrap_or_else(|| "Thinking".to_string()),
                    "ariaLabel": "",
                    "expanded": state.open_menu == Some(OpenMenu::Thinking),
                    "temporaryChat": temporary_chat,
                }),
                _ => json!({ "found": false, "temporaryChat": temporary_chat }),
            });
        }

        if let Some(args) = OPEN_CONTROL.invocation_args(expression) {
            let (found, menu) = match args["kind"].as_str() {
                Some("model") => (state.model_button, OpenMenu::Model),
                _ => (state.thinking_chip, OpenMenu::Thinking),
            };
            if !found {
                return Ok(json!({ "found": false, "clicked": false }));
            }
            if state.open_menu == Some(menu) {
                return Ok(json!({ "found": true, "clicked": false }));
            }
            state.open_menu = Some(menu);
            state.expanded_submenu = None;
            return Ok(json!({ "found": true, "clicked": true }));
        }

        if COLLECT_OPTIONS.invocation_args(expression).is_some() {
            let items: Vec<Value> = Self::menu_items(&state).into_iter().map(|(item, _)| item).collect();
            return Ok(json!({ "menuFound": state.open_menu.is_some(), "items": items }));
        }

        if let Some(args) = CLICK_OPTION.invocation_args(expression) {
            let index = args["index"].as_u64().unwrap_or(u64::MAX) as usize;
            let mut items = Self::menu_items(&state);
            if index >= items.len() {
                return Ok(json!({ "clicked": false }));
            }
            state.clicks += 1;
            match items.swap_remove(index).1 {
                Action::Expand(position) => state.expanded_submenu = Some(position),
                Action::Model(label) => {
                    state.model_label = label;
                    state.open_menu = None;
                }
                Action::Level(label) => {
                    state.level = Some(label);
                    state.open_menu = None;
                }
            }
            return Ok(json!({ "clicked": true }));
        }

        if CLOSE_MENU.invocation_args(expression).is_some() {
            state.open_menu = None;
            state.expanded_submenu = None;
            return Ok(json!({ "closed": true }));
        }

        Err(StageError::EvaluationFailed(format!("unexpected expression: {:.60}", expression)))
    }
}

#[async_trait]
impl Page for FakePage {
    async fn evaluate(&self, expression: &str) -> Result<Value> {
        self.answer(expression)
    }

    async fn evaluate_handle(&self, expression: &str) -> Result<ObjectHandle> {
        if RESOLVE_FILE_INPUT.invocation_args(expression).is_none() {
            return Err(StageError::EvaluationFailed("unexpected handle expression".to_string()));
        }
        if self.with(|s| s.file_input) {
            Ok(ObjectHandle::node("file-input"))
        } else {
            Ok(serde_json::from_value(json!({ "type": "object", "subtype": "null", "value": null }))?)
        }
    }

    async fn set_file_input_files(&self, handle: &ObjectHandle, files: &[PathBuf]) -> Result<()> {
        assert_eq!(handle.object_id.as_deref(), Some("file-input"));
        self.with(|s| {
            s.set_files_calls += 1;
            s.files = files.to_vec();
        });
        Ok(())
    }
}

/// ChatGPT-like model menu with a legacy submenu
pub fn model_menu() -> Vec<FakeEntry> {
    vec![
        FakeEntry::model("GPT-5.2 Instant", "model-switcher-gpt-5-2-instant", "ChatGPT 5.2 Instant"),
        FakeEntry::model("GPT-5.2 Thinking", "model-switcher-gpt-5-2-thinking", "ChatGPT 5.2 Thinking"),
        FakeEntry::model("GPT-5.2 Pro", "model-switcher-gpt-5-2-pro", "ChatGPT 5.2 Pro"),
        FakeEntry::submenu(
            "Legacy models",
            vec![
                FakeEntry::model("GPT-4o", "model-switcher-gpt-4o", "ChatGPT 4o"),
                FakeEntry::model("GPT-4.1", "model-switcher-gpt-4-1", "ChatGPT 4.1"),
            ],
        ),
    ]
}
