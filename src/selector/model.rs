use crate::browser::Page;
use crate::config::StageConfig;
use crate::error::Result;
use crate::selector::matcher::{SelectionMatcher, normalize_label};
use crate::selector::scoring::rank;
use crate::selector::{
    SelectionKind, SelectionReport, SelectionStatus, click_option, close_menu, collect_options, control_state,
    hints, open_control, remember_labels, transient, wait_for_control,
};
use indexmap::IndexSet;
use log::{debug, info};
use std::collections::HashSet;
use std::time::Duration;
use tokio::time::{Instant, sleep};

/// Switch the chat model to `target`.
///
/// Succeeds early when the model control already shows the target. Otherwise
/// the menu is opened and its entries ranked on every pass, clicking the best
/// one until the control label confirms the switch or the selection budget
/// (`timing.selection_budget`) runs out. When nothing in the menu scores, each
/// submenu without a version is opened once to look for nested entries.
///
/// Page-level misses, including snippets that throw while the menu
/// re-renders, are reported through [`SelectionReport::status`]; only
/// transport failures are `Err`.
pub async fn select_model(page: &dyn Page, config: &StageConfig, target: &str) -> Result<SelectionReport> {
    let kind = SelectionKind::Model;
    let matcher = SelectionMatcher::new(target);
    let timing = &config.timing;

    let started = Instant::now();
    let deadline = started + Duration::from_millis(timing.selection_budget);
    let control_deadline = deadline.min(started + Duration::from_millis(timing.control_wait));

    let Some(state) = wait_for_control(page, config, kind, control_deadline).await? else {
        return Ok(SelectionReport::new(kind, target, SelectionStatus::ButtonMissing));
    };
    if matcher.satisfied_by(&state.label) || matcher.satisfied_by(&state.aria_label) {
        info!("Model already set to {}", state.label);
        return Ok(SelectionReport::new(kind, target, SelectionStatus::AlreadySelected).with_label(state.label));
    }

    let mut temporary_chat = state.temporary_chat;
    let mut label = state.label;
    let mut seen = IndexSet::new();
    let mut expanded = HashSet::new();
    let mut clicked = false;

    while Instant::now() < deadline {
        if transient(open_control(page, &config.selectors, kind).await, "model menu open")? != Some(true) {
            sleep(timing.readiness_poll()).await;
            continue;
        }
        sleep(timing.menu_settle()).await;

        let Some(snapshot) = transient(collect_options(page, &config.selectors).await, "model menu scan")? else {
            sleep(timing.readiness_poll()).await;
            continue;
        };
        remember_labels(&mut seen, &snapshot.items);
        let ranked = rank(&snapshot.items, &matcher, &config.weights);

        if let Some(best) = ranked.first() {
            let candidate = &best.candidate;
            if candidate.selected && !candidate.submenu {
                close_menu(page).await?;
                let status = if clicked { SelectionStatus::Switched } else { SelectionStatus::AlreadySelected };
                info!("Model entry '{}' is selected ({})", candidate.label, status);
                return Ok(SelectionReport::new(kind, target, status).with_label(label));
            }

            debug!("Clicking '{}' (score {})", candidate.label, best.score);
            if transient(click_option(page, candidate.index).await, "model entry click")? != Some(true) {
                sleep(timing.menu_settle()).await;
                continue;
            }
            sleep(timing.menu_settle()).await;
            if candidate.submenu {
                continue;
            }

            clicked = true;
            let Some(after) = transient(control_state(page, &config.selectors, kind).await, "model re-read")? else {
                continue;
            };
            temporary_chat |= after.temporary_chat;
            if matcher.satisfied_by(&after.label) || matcher.satisfied_by(&after.aria_label) {
                info!("Model switched to {}", after.label);
                return Ok(SelectionReport::new(kind, target, SelectionStatus::Switched).with_label(after.label));
            }
            if after.found {
                label = after.label;
            }
            continue;
        }

        let opener = snapshot
            .items
            .iter()
            .find(|item| item.submenu && !item.disabled && expanded.insert(normalize_label(&item.label)));
        if let Some(opener) = opener {
            debug!("Expanding submenu '{}'", opener.label);
            transient(click_option(page, opener.index).await, "submenu expand")?;
            sleep(timing.menu_settle()).await;
            continue;
        }

        sleep(timing.readiness_poll()).await;
    }

    close_menu(page).await?;
    Ok(SelectionReport::new(kind, target, SelectionStatus::OptionNotFound)
        .with_label(label)
        .with_hints(hints(temporary_chat, &seen)))
}
