//! Integration tests for session management
//!
//! Lifecycle of the single browser session against the mock launcher.

use std::sync::Arc;

use crate::session::manager::Session;
use crate::session::mock::{MockLauncher, MockNode, MockPage};
use crate::session::traits::{BrowserContext, BrowserOptions, PageContext};
use crate::Error;

/// Helper function to create a session over a mock launcher
fn create_test_session() -> (Session, Arc<MockLauncher>, Arc<MockPage>) {
    let page = Arc::new(MockPage::new(MockNode::document()));
    let launcher = Arc::new(MockLauncher::new(Arc::clone(&page)));
    let session = Session::new(launcher.clone(), BrowserOptions::default());
    (session, launcher, page)
}

#[tokio::test]
async fn test_closed_session_has_no_page() {
    let (session, _, _) = create_test_session();

    assert!(session.active_page().await.is_none());
    assert!(matches!(session.require_page().await, Err(Error::SessionNotReady(_))));
    assert!(session.live_handles().await.none());
}

#[tokio::test]
async fn test_open_creates_new_page() {
    let (session, launcher, page) = create_test_session();

    session.open().await.expect("Failed to open session");

    let active = session.require_page().await.expect("Failed to get page");
    assert_eq!(active.id(), page.id());
    assert_eq!(launcher.launch_count(), 1);

    let (browser, _) = launcher.launched(0).expect("Missing launch record");
    assert_eq!(browser.new_page_count(), 1);

    let handles = session.live_handles().await;
    assert!(handles.browser && handles.driver && handles.page);
}

#[tokio::test]
async fn test_open_reuses_existing_tab() {
    let (session, launcher, page) = create_test_session();
    launcher.reuse_existing_page(true);

    session.open().await.expect("Failed to open session");

    let (browser, _) = launcher.launched(0).expect("Missing launch record");
    assert_eq!(browser.new_page_count(), 0);
    assert_eq!(session.require_page().await.unwrap().id(), page.id());
}

#[tokio::test]
async fn test_reopen_tears_down_previous_browser() {
    let (session, launcher, _) = create_test_session();

    session.open().await.expect("Failed to open session");
    session.open().await.expect("Failed to reopen session");

    assert_eq!(launcher.launch_count(), 2);
    let (first_browser, first_driver) = launcher.launched(0).unwrap();
    let (second_browser, second_driver) = launcher.launched(1).unwrap();
    assert!(!first_browser.is_active());
    assert_eq!(first_driver.stop_count(), 1);
    assert!(second_browser.is_active());
    assert_eq!(second_driver.stop_count(), 0);
}

#[tokio::test]
async fn test_reopen_swallows_teardown_errors() {
    let (session, launcher, _) = create_test_session();
    launcher.fail_close(true);
    session.open().await.expect("Failed to open session");
    launcher.fail_close(false);

    session.open().await.expect("Reopen should ignore close failures");

    let (_, first_driver) = launcher.launched(0).unwrap();
    assert_eq!(first_driver.stop_count(), 1);
    assert!(session.is_open().await);
}

#[tokio::test]
async fn test_failed_launch_leaves_session_closed() {
    let (session, launcher, _) = create_test_session();
    session.open().await.expect("Failed to open session");

    launcher.fail_launch(true);
    let result = session.open().await;

    assert!(matches!(result, Err(Error::Launch(_))));
    assert!(session.live_handles().await.none());
    let (_, first_driver) = launcher.launched(0).unwrap();
    assert_eq!(first_driver.stop_count(), 1);
}

#[tokio::test]
async fn test_close_is_idempotent() {
    let (session, launcher, page) = create_test_session();
    session.open().await.expect("Failed to open session");

    session.close().await;
    assert!(session.live_handles().await.none());
    assert!(!page.is_active());

    session.close().await;
    assert!(session.live_handles().await.none());

    let (_, driver) = launcher.launched(0).unwrap();
    assert_eq!(driver.stop_count(), 1);
}

#[tokio::test]
async fn test_close_nulls_handles_even_when_browser_close_fails() {
    let (session, launcher, _) = create_test_session();
    launcher.fail_close(true);
    session.open().await.expect("Failed to open session");

    session.close().await;

    assert!(session.live_handles().await.none());
    let (_, driver) = launcher.launched(0).unwrap();
    assert_eq!(driver.stop_count(), 1);
}

#[tokio::test]
async fn test_launch_uses_configured_options() {
    let page = Arc::new(MockPage::blank());
    let launcher = Arc::new(MockLauncher::new(page));
    let options = BrowserOptions {
        headless: true,
        window_width: 1024,
        ..Default::default()
    };
    let session = Session::new(launcher.clone(), options);

    session.open().await.expect("Failed to open session");

    let recorded = launcher.launch_options();
    assert_eq!(recorded.len(), 1);
    assert!(recorded[0].headless);
    assert_eq!(recorded[0].window_width, 1024);
}
