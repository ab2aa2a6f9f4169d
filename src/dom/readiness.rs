use crate::browser::Page;
use crate::config::StageConfig;
use crate::dom::scripts::PROBE_COMPOSER;
use crate::dom::{UiSelectors, run_script};
use crate::error::{Result, StageError};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tokio::time::{Instant, sleep};

/// Whether the composer can be driven right now
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Readiness {
    pub ready: bool,
    pub textarea_ready: bool,
    pub file_input_ready: bool,
}

impl fmt::Display for Readiness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "textarea={},fileInput={}", self.textarea_ready, self.file_input_ready)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Probe {
    #[serde(default)]
    textarea_ready: bool,
    #[serde(default)]
    file_input_ready: bool,
}

/// Read the composer state once
pub async fn probe_composer(page: &dyn Page, selectors: &UiSelectors) -> Result<Readiness> {
    let probe: Probe = run_script(page, PROBE_COMPOSER, &serde_json::json!({ "selectors": selectors })).await?;
    Ok(Readiness {
        ready: probe.textarea_ready && probe.file_input_ready,
        textarea_ready: probe.textarea_ready,
        file_input_ready: probe.file_input_ready,
    })
}

/// Poll until both a text surface and a file input are usable.
///
/// Page-side failures during polling (e.g. a navigation tearing down the
/// execution context) count as "not ready yet"; transport failures abort.
pub async fn await_composer_ready(page: &dyn Page, config: &StageConfig, timeout: Duration) -> Result<Readiness> {
    let deadline = Instant::now() + timeout;
    let poll = config.timing.readiness_poll();
    let mut last = Readiness::default();

    loop {
        match probe_composer(page, &config.selectors).await {
            Ok(readiness) if readiness.ready => return Ok(readiness),
            Ok(readiness) => last = readiness,
            Err(e) if e.is_channel_failure() => return Err(e),
            Err(e) => debug!("Composer probe failed: {}", e),
        }

        if Instant::now() + poll > deadline {
            break;
        }
        sleep(poll).await;
    }

    Err(StageError::ComposerNotReady { timeout_ms: timeout.as_millis() as u64, readiness: last })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_readiness_display() {
        let readiness = Readiness { ready: false, textarea_ready: true, file_input_ready: false };
        assert_eq!(readiness.to_string(), "textarea=true,fileInput=false");
    }
}
