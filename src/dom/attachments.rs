use crate::browser::Page;
use crate::config::StageConfig;
use crate::dom::run_script;
use crate::dom::scripts::{ATTACHMENT_STATE, RESOLVE_FILE_INPUT};
use crate::error::{Result, StageError};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::{Instant, sleep};

/// Files to attach, validated up front
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AttachmentSet {
    paths: Vec<PathBuf>,
}

impl AttachmentSet {
    /// Validate every path; a single missing file rejects the whole set.
    ///
    /// Paths are made absolute without resolving symlinks, so each file keeps
    /// the base name it was given.
    pub fn new<I, P>(paths: I) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut resolved = Vec::new();
        for path in paths {
            let path = path.as_ref();
            let absolute = std::path::absolute(path)?;
            if !absolute.is_file() {
                return Err(StageError::MissingAttachment(path.to_path_buf()));
            }
            resolved.push(absolute);
        }
        Ok(Self { paths: resolved })
    }

    /// Parse a newline-separated list, skipping blank lines
    pub fn from_lines(text: &str) -> Result<Self> {
        Self::new(text.lines().map(str::trim).filter(|line| !line.is_empty()))
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Base names as the page is expected to render them
    pub fn file_names(&self) -> Vec<String> {
        self.paths
            .iter()
            .filter_map(|p| p.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .collect()
    }
}

/// What the page shows about attachments
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentState {
    /// Files held by the native input
    #[serde(default)]
    pub file_count: usize,

    /// Requested base names found in the composer's rendered text
    #[serde(default)]
    pub visible_names: Vec<String>,
}

impl AttachmentState {
    pub fn names_visible(&self, expected: &[String]) -> bool {
        expected.iter().all(|name| self.visible_names.iter().any(|seen| seen.eq_ignore_ascii_case(name)))
    }

    /// Both the native count and the rendered names account for every file
    pub fn confirms(&self, expected: &[String]) -> bool {
        self.file_count >= expected.len() && self.names_visible(expected)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Rendered {
    #[serde(default)]
    file_count: usize,

    /// Composer text plus title, aria-label and alt attributes
    #[serde(default)]
    rendered_text: String,
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-')
}

/// Whether `name` occurs in `text` as a whole file name.
///
/// The match may not continue a longer name on either side, so `a.md` is not
/// found inside `data.md` or `a.md.bak`.
pub fn name_rendered(text: &str, name: &str) -> bool {
    let text = text.to_lowercase();
    let name = name.trim().to_lowercase();
    if name.is_empty() {
        return false;
    }

    text.match_indices(&name).any(|(start, _)| {
        let before = text[..start].chars().next_back();
        let after = text[start + name.len()..].chars().next();
        let open = before.is_none_or(|c| !is_name_char(c) && c != '.');
        let closed = match after {
            None => true,
            Some('.') => !text[start + name.len() + 1..].chars().next().is_some_and(is_name_char),
            Some(c) => !is_name_char(c),
        };
        open && closed
    })
}

async fn read_state(page: &dyn Page, config: &StageConfig, names: &[String]) -> Result<AttachmentState> {
    let rendered: Rendered = run_script(page, ATTACHMENT_STATE, &json!({ "selectors": config.selectors })).await?;
    let visible_names = names.iter().filter(|name| name_rendered(&rendered.rendered_text, name)).cloned().collect();
    Ok(AttachmentState { file_count: rendered.file_count, visible_names })
}

/// Put every file on the native input in one operation, then wait until the
/// page renders all of them.
///
/// The deadline is the larger of `timing.attachment_min_wait` and half of
/// `overall_timeout`.
pub async fn upload_files(
    page: &dyn Page,
    config: &StageConfig,
    attachments: &AttachmentSet,
    overall_timeout: Duration,
) -> Result<AttachmentState> {
    if attachments.is_empty() {
        return Ok(AttachmentState::default());
    }

    let handle = page
        .evaluate_handle(&RESOLVE_FILE_INPUT.call(&json!({ "selectors": config.selectors })))
        .await?;
    if handle.is_null() {
        return Err(StageError::NoFileInput);
    }

    page.set_file_input_files(&handle, attachments.paths()).await?;
    info!("Attached {} file(s) to the composer input", attachments.len());

    let names = attachments.file_names();
    let timeout = config.timing.attachment_deadline(overall_timeout);
    let deadline = Instant::now() + timeout;
    let poll = config.timing.attachment_poll();
    let mut last = AttachmentState::default();

    loop {
        match read_state(page, config, &names).await {
            Ok(state) if state.confirms(&names) => {
                info!("All {} attachment(s) visible", names.len());
                return Ok(state);
            }
            Ok(state) => {
                debug!("Attachments pending: {} on input, {:?} visible", state.file_count, state.visible_names);
                last = state;
            }
            Err(e) if e.is_channel_failure() => return Err(e),
            Err(e) => debug!("Attachment probe failed: {}", e),
        }

        if Instant::now() + poll > deadline {
            break;
        }
        sleep(poll).await;
    }

    Err(StageError::AttachmentTimeout {
        staged: last.file_count,
        expected: names.len(),
        names_visible: last.names_visible(&names),
        timeout_ms: timeout.as_millis() as u64,
    })
}
