//! # draft-stage
//!
//! Stage a draft message in a live web chat page over the Chrome DevTools
//! Protocol, without sending it. A human reviews and submits the draft.
//!
//! ## Features
//!
//! - **Target discovery**: find a tab for the chat URL or open one through the CDP HTTP endpoint
//! - **RPC channel**: id-correlated CDP commands over the tab's debugger WebSocket
//! - **Model and reasoning-level selection**: heuristic matching against menus the page renders
//! - **Composer writing**: prompt text through whichever input primitive the page uses
//! - **Attachments**: native file-input upload, confirmed against what the page renders
//!
//! ## Running a full staging pass
//!
//! Chrome must be running with `--remote-debugging-port=9222`:
//!
//! ```bash
//! draft-stage stage --url https://chatgpt.com/ --model "GPT-5.2 Pro" --thinking Extended \
//!     --prompt "Review this." --attach notes.md
//! ```
//!
//! ## Library Usage
//!
//! ```rust,no_run
//! use draft_stage::{AttachmentSet, StageConfig, StageRequest, Stager};
//! use std::time::Duration;
//!
//! # async fn run() -> draft_stage::Result<()> {
//! let stager = Stager::new(StageConfig::default())?;
//! let request = StageRequest::new("https://chatgpt.com/", "Review this.")
//!     .model("GPT-5.2 Pro")
//!     .thinking("Extended")
//!     .attachments(AttachmentSet::new(["notes.md"])?)
//!     .timeout(Duration::from_secs(90));
//!
//! let report = stager.stage(&request).await?;
//! println!("Staged on attempt {}", report.attempts);
//! # Ok(())
//! # }
//! ```
//!
//! ### Driving single steps
//!
//! Every step is also a [`tools::Tool`], so a page can be driven one step at
//! a time through the [`ToolRegistry`].
//!
//! ## Module Overview
//!
//! - [`browser`]: CDP endpoint discovery, the debugger channel and page sessions
//! - [`dom`]: Composer readiness, prompt writing and attachment upload
//! - [`selector`]: Model and reasoning-level menu matching
//! - [`stage`]: The end-to-end sequence with retry on transport failures
//! - [`tools`]: Individually runnable staging steps
//! - [`config`]: Timing, selectors, weights and retry policy
//! - [`error`]: Error types and result aliases

pub mod browser;
pub mod config;
pub mod dom;
pub mod error;
pub mod selector;
pub mod stage;
pub mod tools;

pub use browser::{CdpChannel, ConnectionOptions, DebugTarget, LocatedTarget, Page, PageSession, TargetLocator};
pub use config::{RetryPolicy, StageConfig, Timing};
pub use dom::{AttachmentSet, AttachmentState, PromptOutcome, Readiness, UiSelectors};
pub use error::{Result, StageError};
pub use selector::{ScoringWeights, SelectionKind, SelectionReport, SelectionStatus};
pub use stage::{StageReport, StageRequest, Stager, stage_on_page};
pub use tools::{Tool, ToolContext, ToolRegistry, ToolResult};
