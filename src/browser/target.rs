//! Finding or creating the browser tab to stage the draft in.
//!
//! Chrome exposes tabs over plain HTTP (`/json/list`, `/json/new`). Support for
//! creating tabs and the accepted HTTP verb differ between releases, so the
//! locator degrades through creation, waiting for an attached tab, and finally
//! discovery of an existing tab.

use crate::browser::config::ConnectionOptions;
use crate::error::{Result, StageError};
use log::{debug, info};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::{Instant, sleep};
use url::Url;

/// One browser tab as listed by the CDP HTTP endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DebugTarget {
    pub id: String,

    #[serde(rename = "type", default)]
    pub target_type: String,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_socket_debugger_url: Option<String>,
}

impl DebugTarget {
    /// Whether the target is a tab rather than a worker or extension
    pub fn is_page(&self) -> bool {
        self.target_type == "page"
    }

    /// A page that already has a debugger endpoint we can connect to
    pub fn is_attachable(&self) -> bool {
        self.is_page() && self.web_socket_debugger_url.as_deref().is_some_and(|ws| !ws.is_empty())
    }
}

/// How the located target relates to the requested URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TargetMatch {
    /// Opened by us through `/json/new`
    Created,
    ExactUrl,
    SameHost,
    /// Unrelated page; the caller must navigate it first
    AnyPage,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LocatedTarget {
    #[serde(flatten)]
    pub target: DebugTarget,
    pub matched: TargetMatch,
}

impl LocatedTarget {
    pub fn needs_navigation(&self) -> bool {
        self.matched == TargetMatch::AnyPage
    }
}

enum Creation {
    Ready(DebugTarget),
    Pending(String),
    Unsupported(String),
}

/// Locates a debuggable page through the CDP HTTP endpoint
pub struct TargetLocator {
    client: reqwest::Client,
    options: ConnectionOptions,
}

impl TargetLocator {
    pub fn new(options: ConnectionOptions) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(options.connect_timeout.max(1_000)))
            .build()
            .map_err(|e| StageError::InvalidArgument(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, options })
    }

    /// Options this locator was built with
    pub fn options(&self) -> &ConnectionOptions {
        &self.options
    }

    /// Find or create a page target for `desired_url`.
    ///
    /// Fails with [`StageError::TargetUnavailable`] once the configured timeout
    /// elapses without a usable tab.
    pub async fn ensure_target(&self, desired_url: &str) -> Result<LocatedTarget> {
        let deadline = Instant::now() + Duration::from_millis(self.options.timeout);

        let mut last_problem = match self.create_target(desired_url).await {
            Creation::Ready(target) => {
                info!("Created tab {} for {}", target.id, desired_url);
                return Ok(LocatedTarget { target, matched: TargetMatch::Created });
            }
            Creation::Pending(id) => {
                let wait_until = deadline.min(Instant::now() + Duration::from_millis(self.options.created_target_wait));
                if let Some(target) = self.wait_for_created(&id, wait_until).await {
                    info!("Created tab {} attached after waiting", target.id);
                    return Ok(LocatedTarget { target, matched: TargetMatch::Created });
                }
                format!("created tab {} never exposed a debugger URL", id)
            }
            Creation::Unsupported(reason) => {
                debug!("Tab creation unavailable ({}), falling back to discovery", reason);
                reason
            }
        };

        let poll = Duration::from_millis(self.options.discovery_poll.max(1));
        loop {
            match self.list_targets().await {
                Ok(targets) => {
                    if let Some(found) = select_target(&targets, desired_url, self.options.reuse_any_page) {
                        info!("Using existing tab {} ({:?})", found.target.id, found.matched);
                        return Ok(found);
                    }
                    last_problem = format!(
                        "{} page target(s) listed, none matching",
                        targets.iter().filter(|t| t.is_page()).count()
                    );
                }
                Err(e) => last_problem = e.to_string(),
            }

            if Instant::now() + poll > deadline {
                break;
            }
            sleep(poll).await;
        }

        Err(StageError::TargetUnavailable {
            url: desired_url.to_string(),
            timeout_ms: self.options.timeout,
            reason: last_problem,
        })
    }

    /// Enumerate the targets currently known to the endpoint
    pub async fn list_targets(&self) -> Result<Vec<DebugTarget>> {
        let url = format!("{}/json/list", self.options.http_base());
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| StageError::InvalidResponse(format!("GET {} failed: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(StageError::InvalidResponse(format!("GET {} returned {}", url, response.status())));
        }

        response
            .json::<Vec<DebugTarget>>()
            .await
            .map_err(|e| StageError::InvalidResponse(format!("Malformed target list: {}", e)))
    }

    async fn create_target(&self, desired_url: &str) -> Creation {
        let url = format!("{}/json/new?{}", self.options.http_base(), urlencoding::encode(desired_url));

        let response = match self.client.put(&url).send().await {
            Ok(r) if r.status() == StatusCode::METHOD_NOT_ALLOWED => {
                debug!("PUT /json/new not allowed, retrying with GET");
                match self.client.get(&url).send().await {
                    Ok(r) => r,
                    Err(e) => return Creation::Unsupported(e.to_string()),
                }
            }
            Ok(r) => r,
            Err(e) => return Creation::Unsupported(e.to_string()),
        };

        if !response.status().is_success() {
            return Creation::Unsupported(format!("/json/new returned {}", response.status()));
        }

        let body: serde_json::Value = match response.json().await {
            Ok(v) => v,
            Err(e) => return Creation::Unsupported(format!("Malformed /json/new response: {}", e)),
        };

        match serde_json::from_value::<DebugTarget>(body.clone()) {
            Ok(target) if target.is_attachable() => Creation::Ready(target),
            Ok(target) if !target.id.is_empty() => Creation::Pending(target.id),
            _ => match body.get("id").and_then(|v| v.as_str()) {
                Some(id) if !id.is_empty() => Creation::Pending(id.to_string()),
                _ => Creation::Unsupported("/json/new returned no target id".to_string()),
            },
        }
    }

    async fn wait_for_created(&self, id: &str, until: Instant) -> Option<DebugTarget> {
        let poll = Duration::from_millis(self.options.discovery_poll.max(1));
        loop {
            if let Ok(targets) = self.list_targets().await {
                if let Some(target) = targets.into_iter().find(|t| t.id == id && t.is_attachable()) {
                    return Some(target);
                }
            }
            if Instant::now() + poll > until {
                return None;
            }
            sleep(poll).await;
        }
    }
}

/// Pick the best existing page for `desired_url`.
///
/// Exact URL beats same host; `allow_any` admits the most recently listed page
/// (Chrome lists the most recently active tab first).
pub fn select_target(targets: &[DebugTarget], desired_url: &str, allow_any: bool) -> Option<LocatedTarget> {
    let pages: Vec<&DebugTarget> = targets.iter().filter(|t| t.is_attachable()).collect();

    if let Some(target) = pages.iter().find(|t| same_url(&t.url, desired_url)) {
        return Some(LocatedTarget { target: (*target).clone(), matched: TargetMatch::ExactUrl });
    }

    if let Some(host) = host_of(desired_url) {
        if let Some(target) = pages.iter().find(|t| host_of(&t.url).as_deref() == Some(host.as_str())) {
            return Some(LocatedTarget { target: (*target).clone(), matched: TargetMatch::SameHost });
        }
    }

    if allow_any {
        return pages
            .first()
            .map(|target| LocatedTarget { target: (*target).clone(), matched: TargetMatch::AnyPage });
    }

    None
}

fn same_url(a: &str, b: &str) -> bool {
    a.trim_end_matches('/') == b.trim_end_matches('/')
}

/// Host without a leading `www.`, lowercased
pub fn host_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?.to_ascii_lowercase();
    Some(host.strip_prefix("www.").map(str::to_string).unwrap_or(host))
}
