//! Common test utilities
//!
//! Shared fixtures for the integration tests: a portal wired to the in-memory
//! browser, and page builders for the portal's markup.

#![allow(dead_code)]

use qqmusic_oxide::config::Config;
use qqmusic_oxide::engine::{Diagnostics, NoopDiagnostics};
use qqmusic_oxide::portal::MusicPortal;
use qqmusic_oxide::session::{MockLauncher, MockNode, MockPage, Session};
use std::sync::Arc;

/// Portal over a mock browser, plus handles to inspect what it did
pub struct TestPortal {
    pub page: Arc<MockPage>,
    pub launcher: Arc<MockLauncher>,
    pub portal: MusicPortal,
}

/// Defaults with the post-navigation settle pause turned off
pub fn test_config() -> Config {
    Config {
        settle_delay_ms: 0,
        ..Config::default()
    }
}

pub fn setup_portal() -> TestPortal {
    setup_portal_with(test_config(), Arc::new(NoopDiagnostics))
}

pub fn setup_portal_with(config: Config, diagnostics: Arc<dyn Diagnostics>) -> TestPortal {
    let page = Arc::new(MockPage::blank());
    let launcher = Arc::new(MockLauncher::new(Arc::clone(&page)));
    let session = Arc::new(Session::new(launcher.clone(), config.browser_options()));

    TestPortal {
        page,
        launcher,
        portal: MusicPortal::new(session, &config, diagnostics),
    }
}

/// Home page as seen by a logged-out visitor
pub fn home_logged_out() -> MockNode {
    MockNode::document().child(
        MockNode::new("div")
            .class("top_login")
            .child(MockNode::new("a").class("top_login__link").text("登录")),
    )
}

/// Home page as seen after logging in
pub fn home_logged_in() -> MockNode {
    MockNode::document().child(
        MockNode::new("div")
            .class("top_login")
            .child(MockNode::new("img").class("top_login__cover")),
    )
}

/// Search results page with `count` song rows
pub fn search_page(count: usize) -> MockNode {
    MockNode::document().child(MockNode::new("ul").class("songlist__list").children((1..=count).map(|i| {
        MockNode::new("li")
            .class("songlist__item")
            .child(
                MockNode::new("a")
                    .class("songlist__songname")
                    .attr("href", &format!("https://y.qq.com/n/ryqq/songDetail/00{}", i))
                    .child(
                        MockNode::new("span")
                            .class("songlist__songname_txt")
                            .text(&format!("Song {}", i)),
                    ),
            )
            .child(MockNode::new("div").class("songlist__artist").text(&format!("Artist {}", i)))
            .child(MockNode::new("div").class("songlist__album").text(&format!("Album {}", i)))
            .child(MockNode::new("div").class("songlist__time").text("03:45"))
    })))
}

/// Song page with title, singer and lyrics
pub fn song_page(title: &str, singer: &str, lyrics: &str) -> MockNode {
    MockNode::document()
        .child(MockNode::new("h1").class("data__name").child(MockNode::new("span").class("data__name_txt").text(title)))
        .child(MockNode::new("div").class("data__singer").text(singer))
        .child(
            MockNode::new("ul")
                .class("data__info")
                .child(MockNode::new("time").text("2003-07-31")),
        )
        .child(MockNode::new("div").class("lyric").text(lyrics))
}

/// Numbered entries ("1. ", "2. ", ...) at the start of lines
pub fn numbered_lines(text: &str) -> Vec<&str> {
    text.lines()
        .filter(|line| {
            line.split_once(". ")
                .map_or(false, |(n, _)| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
        })
        .collect()
}
