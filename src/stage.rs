//! End-to-end draft staging
//!
//! A staging run is strictly sequential: readiness, model, reasoning level,
//! prompt, attachments. Each step relies on the DOM state the previous one
//! left behind. [`Stager`] wraps one run in attempt-level retry for transport
//! failures; [`stage_on_page`] is the page-level sequence on its own.

use crate::browser::{LocatedTarget, Page, PageSession, TargetLocator};
use crate::config::{RetryPolicy, StageConfig};
use crate::dom::{AttachmentSet, AttachmentState, PromptOutcome, Readiness, await_composer_ready, set_prompt, upload_files};
use crate::error::Result;
use crate::selector::{SelectionKind, SelectionReport, SelectionStatus, select_model, select_thinking_level};
use log::{info, warn};
use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// What to stage
#[derive(Debug, Clone)]
pub struct StageRequest {
    pub url: String,
    pub model: Option<String>,
    pub thinking: Option<String>,
    pub prompt: String,
    pub attachments: AttachmentSet,

    /// Bounds composer readiness; half of it bounds attachment confirmation
    pub timeout: Duration,

    /// Treat model and reasoning-level misses as fatal
    pub strict_selection: bool,
}

impl StageRequest {
    /// Stage `prompt` at `url` with no selections or attachments
    pub fn new(url: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            model: None,
            thinking: None,
            prompt: prompt.into(),
            attachments: AttachmentSet::default(),
            timeout: Duration::from_secs(60),
            strict_selection: false,
        }
    }

    /// Model to select; blank values are ignored
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into()).filter(|m: &String| !m.trim().is_empty());
        self
    }

    /// Reasoning level to select; blank values are ignored
    pub fn thinking(mut self, level: impl Into<String>) -> Self {
        self.thinking = Some(level.into()).filter(|l: &String| !l.trim().is_empty());
        self
    }

    /// Files to attach after the prompt
    pub fn attachments(mut self, attachments: AttachmentSet) -> Self {
        self.attachments = attachments;
        self
    }

    /// Overall readiness timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Fail the run on selection misses
    pub fn strict_selection(mut self, strict: bool) -> Self {
        self.strict_selection = strict;
        self
    }
}

/// Everything observed during a successful run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<LocatedTarget>,

    /// Attempt that produced this report, starting at 1
    pub attempts: u32,

    pub readiness: Readiness,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<SelectionReport>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking: Option<SelectionReport>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<PromptOutcome>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachments: Option<AttachmentState>,
}

fn accept_selection(report: SelectionReport, strict: bool) -> Result<SelectionReport> {
    if report.is_success() {
        return Ok(report);
    }
    if strict {
        return report.into_result();
    }
    match &report.hints {
        Some(hints) => warn!("{} selection of '{}' failed: {} ({})", report.kind, report.target, report.status, hints),
        None => warn!("{} selection of '{}' failed: {}", report.kind, report.target, report.status),
    }
    Ok(report)
}

/// Fold a page-side selection error into a warned miss unless strict
fn settle_selection(
    outcome: Result<SelectionReport>,
    kind: SelectionKind,
    target: &str,
    strict: bool,
) -> Result<SelectionReport> {
    match outcome {
        Ok(report) => accept_selection(report, strict),
        Err(e) if strict || e.is_channel_failure() => Err(e),
        Err(e) => {
            warn!("{} selection of '{}' failed: {}", kind, target, e);
            Ok(SelectionReport::new(kind, target, SelectionStatus::OptionNotFound))
        }
    }
}

/// Run the page-level sequence on an attached page.
///
/// Selection misses, and page errors raised while selecting, are warnings
/// unless `strict_selection` is set. Prompt and attachment failures always
/// abort, as do transport failures.
pub async fn stage_on_page(page: &dyn Page, config: &StageConfig, request: &StageRequest) -> Result<StageReport> {
    let readiness = await_composer_ready(page, config, request.timeout).await?;
    info!("Composer ready ({})", readiness);

    let strict = request.strict_selection;
    let model = match request.model.as_deref() {
        Some(target) => {
            Some(settle_selection(select_model(page, config, target).await, SelectionKind::Model, target, strict)?)
        }
        None => None,
    };

    let thinking = match request.thinking.as_deref() {
        Some(level) => {
            let outcome = select_thinking_level(page, config, level).await;
            Some(settle_selection(outcome, SelectionKind::Thinking, level, strict)?)
        }
        None => None,
    };

    let prompt = if request.prompt.is_empty() {
        info!("No prompt text; leaving the composer text untouched");
        None
    } else {
        Some(set_prompt(page, &config.selectors, &request.prompt).await?.into_result()?)
    };

    let attachments = if request.attachments.is_empty() {
        None
    } else {
        Some(upload_files(page, config, &request.attachments, request.timeout).await?)
    };

    Ok(StageReport { target: None, attempts: 1, readiness, model, thinking, prompt, attachments })
}

/// Run `op` until it succeeds, fails with a non-transport error, or the
/// policy's attempts are used up. `op` receives the 1-based attempt number.
pub async fn retry_channel_failures<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_channel_failure() && attempt < attempts => {
                let delay = policy.delay_after(attempt);
                warn!("Attempt {}/{} lost the browser connection: {}; retrying in {:?}", attempt, attempts, e, delay);
                sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Drives staging runs against one CDP endpoint
pub struct Stager {
    config: StageConfig,
    locator: TargetLocator,
}

impl Stager {
    /// Build a stager for the endpoint in `config.connection`
    pub fn new(config: StageConfig) -> Result<Self> {
        let locator = TargetLocator::new(config.connection.clone())?;
        Ok(Self { config, locator })
    }

    /// Configuration shared by every run
    pub fn config(&self) -> &StageConfig {
        &self.config
    }

    /// Locate a tab for `url`, attach to it and navigate it when it was an
    /// unrelated page
    pub async fn open(&self, url: &str) -> Result<(LocatedTarget, PageSession)> {
        let located = self.locator.ensure_target(url).await?;
        let session = PageSession::attach(located.target.clone(), &self.config.connection).await?;
        if located.needs_navigation() {
            info!("Navigating tab {} to {}", located.target.id, url);
            if let Err(e) = session.navigate(url).await {
                session.close().await;
                return Err(e);
            }
        }
        Ok((located, session))
    }

    /// Stage a draft, retrying the whole sequence on transport failures
    pub async fn stage(&self, request: &StageRequest) -> Result<StageReport> {
        retry_channel_failures(&self.config.retry, |attempt| self.attempt(request, attempt)).await
    }

    /// Locate the tab and wait for the composer without changing anything
    pub async fn check(&self, url: &str, timeout: Duration) -> Result<(LocatedTarget, Readiness)> {
        retry_channel_failures(&self.config.retry, |_| async move {
            let (located, session) = self.open(url).await?;
            let readiness = await_composer_ready(&session, &self.config, timeout).await;
            session.close().await;
            Ok((located, readiness?))
        })
        .await
    }

    async fn attempt(&self, request: &StageRequest, attempt: u32) -> Result<StageReport> {
        info!("Staging attempt {} for {}", attempt, request.url);
        let (located, session) = self.open(&request.url).await?;

        let result = stage_on_page(&session, &self.config, request).await;
        session.close().await;

        let mut report = result?;
        report.target = Some(located);
        report.attempts = attempt;
        Ok(report)
    }
}
