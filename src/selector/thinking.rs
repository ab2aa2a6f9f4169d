use crate::browser::Page;
use crate::config::StageConfig;
use crate::error::{Result, StageError};
use crate::selector::matcher::normalize_label;
use crate::selector::scoring::MenuCandidate;
use crate::selector::{
    SelectionKind, SelectionReport, SelectionStatus, click_option, close_menu, collect_options, hints,
    open_control, remember_labels, transient, wait_for_control,
};
use indexmap::IndexSet;
use log::{debug, info};
use std::time::Duration;
use tokio::time::{Instant, sleep};

/// Pick the entry for a reasoning level.
///
/// Exact normalised text wins, then an entry containing the level as whole
/// words, then plain substring containment. Disabled entries never match.
pub fn match_level<'a>(candidates: &'a [MenuCandidate], level: &str) -> Option<&'a MenuCandidate> {
    let target = normalize_label(level);
    if target.is_empty() {
        return None;
    }

    let usable: Vec<(&MenuCandidate, String)> =
        candidates.iter().filter(|c| !c.disabled).map(|c| (c, normalize_label(&c.label))).collect();
    let padded = format!(" {} ", target);

    usable
        .iter()
        .find(|(_, text)| *text == target)
        .or_else(|| usable.iter().find(|(_, text)| format!(" {} ", text).contains(&padded)))
        .or_else(|| usable.iter().find(|(_, text)| text.contains(&target)))
        .map(|(candidate, _)| *candidate)
}

/// Set the reasoning level through the composer's thinking chip.
///
/// An entry that is already selected short-circuits without a click.
pub async fn select_thinking_level(page: &dyn Page, config: &StageConfig, level: &str) -> Result<SelectionReport> {
    if normalize_label(level).is_empty() {
        return Err(StageError::InvalidArgument(format!("empty reasoning level '{}'", level)));
    }

    let kind = SelectionKind::Thinking;
    let timing = &config.timing;
    let started = Instant::now();
    let deadline = started + Duration::from_millis(timing.selection_budget);
    let control_deadline = deadline.min(started + Duration::from_millis(timing.control_wait));

    let Some(state) = wait_for_control(page, config, kind, control_deadline).await? else {
        return Ok(SelectionReport::new(kind, level, SelectionStatus::ChipNotFound));
    };

    let mut seen = IndexSet::new();
    let mut menu_seen = false;

    while Instant::now() < deadline {
        if transient(open_control(page, &config.selectors, kind).await, "reasoning menu open")? != Some(true) {
            sleep(timing.readiness_poll()).await;
            continue;
        }
        sleep(timing.menu_settle()).await;

        let snapshot = transient(collect_options(page, &config.selectors).await, "reasoning menu scan")?;
        let Some(snapshot) = snapshot.filter(|s| s.menu_found && !s.items.is_empty()) else {
            sleep(timing.readiness_poll()).await;
            continue;
        };
        menu_seen = true;
        remember_labels(&mut seen, &snapshot.items);

        let Some(option) = match_level(&snapshot.items, level) else {
            debug!("No '{}' entry among {} option(s)", level, snapshot.items.len());
            sleep(timing.readiness_poll()).await;
            continue;
        };

        if option.selected {
            close_menu(page).await?;
            info!("Reasoning level '{}' already selected", option.label);
            return Ok(SelectionReport::new(kind, level, SelectionStatus::AlreadySelected).with_label(&option.label));
        }
        if transient(click_option(page, option.index).await, "reasoning entry click")? == Some(true) {
            sleep(timing.menu_settle()).await;
            info!("Reasoning level set to '{}'", option.label);
            return Ok(SelectionReport::new(kind, level, SelectionStatus::Switched).with_label(&option.label));
        }
    }

    close_menu(page).await?;
    let status = if menu_seen { SelectionStatus::OptionNotFound } else { SelectionStatus::MenuNotFound };
    Ok(SelectionReport::new(kind, level, status).with_hints(hints(state.temporary_chat, &seen)))
}
