//! Model and reasoning-level selection
//!
//! The pure half ([`matcher`], [`scoring`], [`thinking::match_level`]) decides
//! which menu entry is the target. The async half opens menus and clicks
//! entries through the [`Page`] snippets.

pub mod matcher;
pub mod model;
pub mod scoring;
pub mod thinking;

pub use matcher::{SelectionMatcher, normalize_label};
pub use model::select_model;
pub use scoring::{MenuCandidate, ScoredCandidate, ScoringWeights, rank, score_candidate};
pub use thinking::{match_level, select_thinking_level};

use crate::browser::Page;
use crate::config::StageConfig;
use crate::dom::scripts::{CLICK_OPTION, CLOSE_MENU, COLLECT_OPTIONS, CONTROL_STATE, OPEN_CONTROL};
use crate::dom::{UiSelectors, run_script};
use crate::error::{Result, StageError};
use indexmap::IndexSet;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use tokio::time::{Instant, sleep};

/// How many distinct entry labels a failure report keeps
const HINT_LABELS: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionKind {
    Model,
    Thinking,
}

impl SelectionKind {
    /// Name of the control family understood by the page snippets
    fn control(self) -> &'static str {
        match self {
            SelectionKind::Model => "model",
            SelectionKind::Thinking => "thinking",
        }
    }
}

impl fmt::Display for SelectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionKind::Model => f.write_str("model"),
            SelectionKind::Thinking => f.write_str("reasoning-level"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionStatus {
    AlreadySelected,
    Switched,
    ButtonMissing,
    ChipNotFound,
    MenuNotFound,
    OptionNotFound,
}

impl SelectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectionStatus::AlreadySelected => "already-selected",
            SelectionStatus::Switched => "switched",
            SelectionStatus::ButtonMissing => "button-missing",
            SelectionStatus::ChipNotFound => "chip-not-found",
            SelectionStatus::MenuNotFound => "menu-not-found",
            SelectionStatus::OptionNotFound => "option-not-found",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, SelectionStatus::AlreadySelected | SelectionStatus::Switched)
    }
}

impl fmt::Display for SelectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Context attached to a failed selection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionHints {
    pub temporary_chat: bool,

    /// Distinct entry labels seen while searching, in first-seen order
    pub seen_labels: Vec<String>,
}

impl fmt::Display for SelectionHints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "temporaryChat={}", self.temporary_chat)?;
        if !self.seen_labels.is_empty() {
            write!(f, ", seen: {}", self.seen_labels.join(" | "))?;
        }
        Ok(())
    }
}

/// Outcome of one selection attempt
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionReport {
    pub kind: SelectionKind,
    pub target: String,
    pub status: SelectionStatus,

    /// Control label after the attempt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub hints: Option<SelectionHints>,
}

impl SelectionReport {
    pub(crate) fn new(kind: SelectionKind, target: &str, status: SelectionStatus) -> Self {
        Self { kind, target: target.to_string(), status, label: None, hints: None }
    }

    pub(crate) fn with_label(mut self, label: impl Into<String>) -> Self {
        let label = label.into();
        self.label = (!label.is_empty()).then_some(label);
        self
    }

    pub(crate) fn with_hints(mut self, hints: SelectionHints) -> Self {
        self.hints = Some(hints);
        self
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Turn a failed status into [`StageError::SelectionFailed`]
    pub fn into_result(self) -> Result<Self> {
        if self.is_success() {
            return Ok(self);
        }
        Err(StageError::SelectionFailed { kind: self.kind, target: self.target, status: self.status, hints: self.hints })
    }
}

/// Menu toggle state as read from the page
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ControlState {
    #[serde(default)]
    pub found: bool,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub aria_label: String,
    #[serde(default)]
    pub temporary_chat: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MenuSnapshot {
    #[serde(default)]
    pub menu_found: bool,
    #[serde(default)]
    pub items: Vec<MenuCandidate>,
}

#[derive(Deserialize)]
struct Opened {
    #[serde(default)]
    found: bool,
}

#[derive(Deserialize)]
struct Clicked {
    #[serde(default)]
    clicked: bool,
}

/// Keep transport failures, demote page-side ones to a miss for this pass.
///
/// Menus re-render between evaluations, so a snippet that throws now may
/// succeed on the next poll.
pub(crate) fn transient<T>(result: Result<T>, step: &str) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_channel_failure() => Err(e),
        Err(e) => {
            debug!("{} failed, polling again: {}", step, e);
            Ok(None)
        }
    }
}

pub(crate) async fn control_state(page: &dyn Page, selectors: &UiSelectors, kind: SelectionKind) -> Result<ControlState> {
    run_script(page, CONTROL_STATE, &json!({ "selectors": selectors, "kind": kind.control() })).await
}

/// Poll for the menu toggle until it renders or `deadline` passes
pub(crate) async fn wait_for_control(
    page: &dyn Page,
    config: &StageConfig,
    kind: SelectionKind,
    deadline: Instant,
) -> Result<Option<ControlState>> {
    let poll = config.timing.readiness_poll();
    loop {
        let state = transient(control_state(page, &config.selectors, kind).await, "control lookup")?;
        if let Some(state) = state.filter(|s| s.found) {
            return Ok(Some(state));
        }
        if Instant::now() + poll > deadline {
            debug!("No {} control rendered", kind);
            return Ok(None);
        }
        sleep(poll).await;
    }
}

/// Click the toggle unless its menu is already expanded.
///
/// Returns whether the toggle was found.
pub(crate) async fn open_control(page: &dyn Page, selectors: &UiSelectors, kind: SelectionKind) -> Result<bool> {
    let opened: Opened =
        run_script(page, OPEN_CONTROL, &json!({ "selectors": selectors, "kind": kind.control() })).await?;
    Ok(opened.found)
}

pub(crate) async fn collect_options(page: &dyn Page, selectors: &UiSelectors) -> Result<MenuSnapshot> {
    run_script(page, COLLECT_OPTIONS, &json!({ "selectors": selectors })).await
}

/// Click the entry tagged with `index` by the last [`collect_options`]
pub(crate) async fn click_option(page: &dyn Page, index: usize) -> Result<bool> {
    let result: Clicked = run_script(page, CLICK_OPTION, &json!({ "index": index })).await?;
    Ok(result.clicked)
}

/// Dismiss any open menu; only transport failures are reported
pub(crate) async fn close_menu(page: &dyn Page) -> Result<()> {
    transient(page.evaluate(&CLOSE_MENU.call(&json!({}))).await, "menu close")?;
    Ok(())
}

/// Record entry labels for failure hints
pub(crate) fn remember_labels(seen: &mut IndexSet<String>, items: &[MenuCandidate]) {
    for item in items {
        let label = item.label.trim();
        if !label.is_empty() {
            seen.insert(label.to_string());
        }
    }
}

pub(crate) fn hints(temporary_chat: bool, seen: &IndexSet<String>) -> SelectionHints {
    SelectionHints { temporary_chat, seen_labels: seen.iter().take(HINT_LABELS).cloned().collect() }
}
