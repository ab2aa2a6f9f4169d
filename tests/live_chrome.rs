use draft_stage::dom::probe_composer;
use draft_stage::{ConnectionOptions, Page, PageSession, StageConfig, Stager, TargetLocator};
use std::time::Duration;

// These tests require Chrome running with --remote-debugging-port=9222

#[tokio::test]
#[ignore]
async fn test_attach_evaluate_and_probe() {
    let options = ConnectionOptions::default();
    let locator = TargetLocator::new(options.clone()).expect("Failed to build locator");

    let located = locator.ensure_target("about:blank").await.expect("No tab available");
    let session = PageSession::attach(located.target, &options).await.expect("Failed to attach");

    let value = session.evaluate("1 + 2").await.expect("Failed to evaluate");
    assert_eq!(value, 3);

    let readiness = probe_composer(&session, &StageConfig::default().selectors).await.expect("Probe failed");
    assert!(!readiness.ready);

    session.close().await;
}

#[tokio::test]
#[ignore]
async fn test_check_against_chat_page() {
    let url = std::env::var("DRAFT_STAGE_URL").unwrap_or_else(|_| "https://chatgpt.com/".to_string());
    let stager = Stager::new(StageConfig::default()).expect("Failed to build stager");

    let (located, readiness) = stager.check(&url, Duration::from_secs(60)).await.expect("Composer never became ready");

    println!("Tab {} ({:?}): {}", located.target.id, located.matched, readiness);
    assert!(readiness.ready);
}
