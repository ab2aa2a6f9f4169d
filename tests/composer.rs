mod common;

use common::{FakePage, fast_config};
use draft_stage::dom::{PromptMode, await_composer_ready, set_prompt};
use draft_stage::{StageError, UiSelectors};
use std::time::Duration;

#[tokio::test]
async fn test_prompt_goes_to_plain_text_input() {
    let page = FakePage::new(FakePage::composer());

    let outcome = set_prompt(&page, &UiSelectors::default(), "Review this.").await.unwrap();

    assert!(outcome.ok);
    assert_eq!(outcome.mode, Some(PromptMode::Textarea));
    assert_eq!(outcome.length, Some(12));
    assert_eq!(page.with(|s| s.textarea.clone()), Some("Review this.".to_string()));
}

#[tokio::test]
async fn test_prompt_falls_back_to_rich_editor() {
    let page = FakePage::new(common::FakeState { editor: Some(String::new()), file_input: true, ..Default::default() });

    let outcome = set_prompt(&page, &UiSelectors::default(), "Draft only").await.unwrap();

    assert_eq!(outcome.mode, Some(PromptMode::ContentEditable));
    assert_eq!(page.with(|s| s.editor.clone()), Some("Draft only".to_string()));
}

#[tokio::test]
async fn test_missing_composer_input_is_reported() {
    let page = FakePage::new(common::FakeState::default());

    let outcome = set_prompt(&page, &UiSelectors::default(), "hello").await.unwrap();
    assert!(!outcome.ok);
    assert_eq!(outcome.reason.as_deref(), Some("composer-input-not-found"));

    match outcome.into_result() {
        Err(StageError::PromptInjectionFailed(reason)) => assert_eq!(reason, "composer-input-not-found"),
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn test_readiness_waits_for_composer() {
    let page = FakePage::new(common::FakeState { loading_probes: 3, ..FakePage::composer() });

    let readiness = await_composer_ready(&page, &fast_config(), Duration::from_secs(2)).await.unwrap();

    assert!(readiness.ready);
    assert_eq!(page.with(|s| s.loading_probes), 0);
}

#[tokio::test]
async fn test_readiness_times_out_with_last_state() {
    let page = FakePage::new(common::FakeState { textarea: Some(String::new()), ..Default::default() });

    let err = await_composer_ready(&page, &fast_config(), Duration::from_millis(60)).await.unwrap_err();

    match &err {
        StageError::ComposerNotReady { readiness, .. } => {
            assert!(readiness.textarea_ready);
            assert!(!readiness.file_input_ready);
        }
        other => panic!("unexpected {:?}", other),
    }
    assert!(err.to_string().contains("textarea=true,fileInput=false"));
}
