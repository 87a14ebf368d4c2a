//! Portal tools against the in-memory browser

use std::sync::Arc;

use crate::config::Config;
use crate::engine::MemoryDiagnostics;
use crate::portal::format;
use crate::portal::selectors::SEARCH_READY;
use crate::portal::MusicPortal;
use crate::session::{MockLauncher, MockNode, MockPage, Session};
use crate::Error;

struct Harness {
    page: Arc<MockPage>,
    launcher: Arc<MockLauncher>,
    diagnostics: Arc<MemoryDiagnostics>,
    portal: MusicPortal,
}

fn harness() -> Harness {
    let config = Config {
        settle_delay_ms: 0,
        ..Config::default()
    };
    let page = Arc::new(MockPage::blank());
    let launcher = Arc::new(MockLauncher::new(Arc::clone(&page)));
    let session = Arc::new(Session::new(launcher.clone(), config.browser_options()));
    let diagnostics = Arc::new(MemoryDiagnostics::new());
    let portal = MusicPortal::new(session, &config, diagnostics.clone());

    Harness {
        page,
        launcher,
        diagnostics,
        portal,
    }
}

async fn opened() -> Harness {
    let h = harness();
    h.portal.session().open().await.unwrap();
    h
}

fn song_row(i: usize) -> MockNode {
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
        .child(MockNode::new("div").class("songlist__time").text("04:29"))
}

fn song_list(count: usize) -> MockNode {
    MockNode::new("ul")
        .class("songlist__list")
        .children((1..=count).map(song_row))
}

fn comment_item(author: &str, text: &str) -> MockNode {
    MockNode::new("li")
        .class("comment__list_item")
        .child(
            MockNode::new("h4")
                .class("comment__title")
                .child(MockNode::new("a").text(author)),
        )
        .child(MockNode::new("p").class("comment__text").text(text))
        .child(MockNode::new("span").class("comment__date").text("2024-05-01"))
        .child(MockNode::new("span").class("comment__zan").text("12"))
}

#[tokio::test]
async fn test_tools_require_an_open_session() {
    let h = harness();

    assert_eq!(h.portal.search_songs("晴天", 5).await, format::NOT_LOGGED_IN);
    assert_eq!(h.portal.get_song_details("001").await, format::NOT_LOGGED_IN);
    assert_eq!(h.portal.get_artist_details("A1", 10).await, format::NOT_LOGGED_IN);
    assert_eq!(h.portal.get_comments("001", 10).await, format::NOT_LOGGED_IN);
    assert_eq!(h.portal.post_comment("001", "好听").await, format::NOT_LOGGED_IN);
    assert_eq!(h.portal.get_top_lists().await, format::NOT_LOGGED_IN);

    assert!(h.page.navigations().is_empty());
    assert_eq!(h.launcher.launch_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_search_lists_at_most_limit_songs() {
    let h = opened().await;
    h.page.route("/search", MockNode::document().child(song_list(3)));

    let text = h.portal.search_songs("周杰伦", 2).await;

    assert_eq!(
        h.page.navigations(),
        vec!["https://y.qq.com/n/ryqq/search?w=%E5%91%A8%E6%9D%B0%E4%BC%A6".to_string()]
    );
    assert!(text.starts_with("搜索结果：\n\n1. Song 1 - Artist 1\n   专辑: Album 1\n   时长: 04:29\n   歌曲ID: 001"));
    assert!(text.contains("\n2. Song 2 - Artist 2\n"));
    assert!(!text.contains("3. "));
    assert!(!text.contains("Song 3"));
}

#[tokio::test(start_paused = true)]
async fn test_search_falls_back_to_older_markup() {
    let h = opened().await;
    h.page.route(
        "/search",
        MockNode::document().child(
            MockNode::new("div").class("songlist__list").child(
                MockNode::new("ul").class("mod_songlist").child(
                    MockNode::new("li")
                        .child(MockNode::new("span").class("songname").text("旧版歌曲"))
                        .child(MockNode::new("span").class("singer_name").text("旧版歌手")),
                ),
            ),
        ),
    );

    let text = h.portal.search_songs("旧版", 5).await;

    assert!(text.contains("1. 旧版歌曲 - 旧版歌手"));
    assert!(text.contains("专辑: 未知专辑"));
    assert!(text.contains("时长: 未知时长"));
    assert!(text.contains("歌曲ID: 未知ID"));
}

#[tokio::test]
async fn test_search_rejects_blank_keywords() {
    let h = opened().await;
    assert_eq!(h.portal.search_songs("   ", 5).await, format::EMPTY_KEYWORDS);
    assert!(h.page.navigations().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_search_recovers_from_slow_renders() {
    let h = opened().await;
    h.page.route("/search", MockNode::document().child(song_list(1)));
    h.page.time_out_next_waits(2);

    let text = h.portal.search_songs("晴天", 5).await;

    assert!(text.contains("1. Song 1 - Artist 1"));
    assert_eq!(h.page.reload_count(), 2);
    assert_eq!(h.page.navigations().len(), 3);
    assert!(h.diagnostics.captures().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_search_reports_exhaustion_as_text() {
    let h = opened().await;
    h.page.route("/search", MockNode::document().child(MockNode::new("div").class("empty")));

    let text = h.portal.search_songs("晴天", 5).await;

    assert_eq!(text, "操作超时：已重试 3 次仍未完成");
    assert_eq!(h.page.reload_count(), 2);
    assert_eq!(h.diagnostics.captures(), vec!["搜索歌曲".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_fatal_errors_are_not_retried() {
    let h = opened().await;
    h.page.route("/search", MockNode::document().child(song_list(1)));
    h.page.fail_selector(SEARCH_READY, Error::invalid_selector(SEARCH_READY));

    let text = h.portal.search_songs("晴天", 5).await;

    assert!(text.starts_with("搜索歌曲时出错: "), "{}", text);
    assert_eq!(h.page.reload_count(), 0);
    assert_eq!(h.page.navigations().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_song_details_use_defaults_for_missing_fields() {
    let h = opened().await;
    h.page.route(
        "/songDetail/001",
        MockNode::document()
            .child(MockNode::new("h1").class("data__name").text("晴天"))
            .child(MockNode::new("div").class("data__singer").text("周杰伦")),
    );

    let text = h.portal.get_song_details("001").await;

    assert_eq!(
        text,
        "歌曲: 晴天\n歌手: 周杰伦\n专辑: 未知专辑\n发行时间: 未知时间\n歌曲ID: 001\n\n歌词:\n暂无歌词"
    );
}

#[tokio::test(start_paused = true)]
async fn test_artist_details_with_hot_songs() {
    let h = opened().await;
    h.page.route(
        "/singer/0025NhlN2yWrP4",
        MockNode::document()
            .child(MockNode::new("h1").class("data__name").text("周杰伦"))
            .child(MockNode::new("div").class("data__desc").text("华语流行歌手"))
            .child(song_list(3)),
    );

    let text = h.portal.get_artist_details("0025NhlN2yWrP4", 2).await;

    assert!(text.starts_with("歌手: 周杰伦\n歌手ID: 0025NhlN2yWrP4\n简介: 华语流行歌手\n\n热门歌曲：\n\n"));
    assert!(text.contains("1. Song 1\n   专辑: Album 1"));
    assert!(text.contains("2. Song 2\n"));
    assert!(!text.contains("Song 3"));
}

#[tokio::test(start_paused = true)]
async fn test_comments_skip_empty_entries() {
    let h = opened().await;
    h.page.route(
        "/songDetail/001",
        MockNode::document().child(MockNode::new("ul").class("comment__list").children([
            comment_item("听众甲", "太好听了"),
            comment_item("听众乙", "  "),
            comment_item("听众丙", "循环中"),
        ])),
    );

    let text = h.portal.get_comments("001", 10).await;

    assert_eq!(
        text,
        "歌曲 001 的评论：\n\n1. 听众甲: 太好听了\n   时间: 2024-05-01  点赞: 12\n\n2. 听众丙: 循环中\n   时间: 2024-05-01  点赞: 12"
    );
}

#[tokio::test(start_paused = true)]
async fn test_comment_limit_counts_only_non_empty_entries() {
    let h = opened().await;
    h.page.route(
        "/songDetail/001",
        MockNode::document().child(MockNode::new("ul").class("comment__list").children([
            comment_item("听众甲", ""),
            comment_item("听众乙", "太好听了"),
            comment_item("听众丙", "循环中"),
            comment_item("听众丁", "单曲循环"),
        ])),
    );

    let text = h.portal.get_comments("001", 2).await;

    assert_eq!(
        text,
        "歌曲 001 的评论：\n\n1. 听众乙: 太好听了\n   时间: 2024-05-01  点赞: 12\n\n2. 听众丙: 循环中\n   时间: 2024-05-01  点赞: 12"
    );
}

#[tokio::test]
async fn test_blank_ids_are_rejected_before_navigating() {
    let h = opened().await;

    assert_eq!(h.portal.get_song_details("  ").await, format::EMPTY_SONG_ID);
    assert_eq!(h.portal.get_artist_details("", 10).await, format::EMPTY_ARTIST_ID);
    assert_eq!(h.portal.get_comments(" ", 10).await, format::EMPTY_SONG_ID);
    assert_eq!(h.portal.post_comment("", "好听").await, format::EMPTY_SONG_ID);

    assert!(h.page.navigations().is_empty());
    assert_eq!(h.page.reload_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_post_comment_types_and_submits() {
    let h = opened().await;
    h.page.route(
        "/songDetail/001",
        MockNode::document()
            .child(MockNode::new("ul").class("comment__list"))
            .child(MockNode::new("textarea").class("comment__textarea"))
            .child(MockNode::new("a").class("btn_comment").text("发表评论")),
    );

    let text = h.portal.post_comment("001", " 好听 ").await;

    assert_eq!(text, format::COMMENT_POSTED);
    assert_eq!(h.page.typed(), vec!["好听".to_string()]);
    assert_eq!(h.page.clicks(), vec![String::new(), "发表评论".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_post_comment_without_input_is_fatal() {
    let h = opened().await;
    h.page.route(
        "/songDetail/001",
        MockNode::document().child(MockNode::new("ul").class("comment__list")),
    );

    let text = h.portal.post_comment("001", "好听").await;

    assert!(text.starts_with("发表评论时出错: "), "{}", text);
    assert!(h.page.typed().is_empty());
    assert_eq!(h.page.reload_count(), 0);
}

#[tokio::test]
async fn test_post_comment_rejects_blank_content() {
    let h = opened().await;
    assert_eq!(h.portal.post_comment("001", "").await, format::EMPTY_COMMENT);
}

#[tokio::test(start_paused = true)]
async fn test_top_lists_read_id_from_item_link() {
    let h = opened().await;
    h.page.route(
        "/toplist",
        MockNode::document().children([
            MockNode::new("a")
                .class("toplist_nav__item")
                .attr("href", "/n/ryqq/toplist/62")
                .child(MockNode::new("span").class("toplist_nav__title").text("飙升榜")),
            MockNode::new("a")
                .class("toplist_nav__item")
                .attr("href", "/n/ryqq/toplist/26")
                .child(MockNode::new("span").class("toplist_nav__title").text("热歌榜"))
                .child(MockNode::new("span").class("toplist_nav__desc").text("最热门的歌曲")),
        ]),
    );

    let text = h.portal.get_top_lists().await;

    assert_eq!(
        text,
        "QQ音乐排行榜列表：\n\n1. 飙升榜\n   ID: 62\n\n2. 热歌榜\n   简介: 最热门的歌曲\n   ID: 26"
    );
}

// ---- login ----

fn home_with_login_entry() -> MockNode {
    MockNode::document().child(MockNode::new("a").class("top_login__link").text("登录"))
}

fn home_logged_in() -> MockNode {
    MockNode::document().child(MockNode::new("img").class("top_login__cover"))
}

#[tokio::test(start_paused = true)]
async fn test_login_when_already_logged_in() {
    let h = harness();
    h.page.set_dom(home_logged_in());

    assert_eq!(h.portal.login().await, format::ALREADY_LOGGED_IN);
    assert!(h.portal.session().is_open().await);
    assert_eq!(h.page.navigations(), vec!["https://y.qq.com".to_string()]);
    assert!(h.page.clicks().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_login_succeeds_once_entry_disappears() {
    let h = harness();
    h.page.set_dom(home_with_login_entry());
    h.page.swap_dom_on_click(home_logged_in());

    assert_eq!(h.portal.login().await, format::LOGIN_SUCCEEDED);
    assert_eq!(h.page.clicks(), vec!["登录".to_string()]);
    assert!(h.portal.session().is_open().await);
}

#[tokio::test(start_paused = true)]
async fn test_login_times_out_with_guidance() {
    let h = harness();
    h.page.set_dom(home_with_login_entry());

    let start = tokio::time::Instant::now();
    assert_eq!(h.portal.login().await, format::LOGIN_TIMED_OUT);

    assert!(start.elapsed() >= std::time::Duration::from_secs(180));
    // Recovery reloads at 60 s and 120 s
    assert_eq!(h.page.reload_count(), 2);
    assert!(h.portal.session().is_open().await);
}

#[tokio::test(start_paused = true)]
async fn test_login_with_unbounded_wait_settings() {
    let config = Config {
        settle_delay_ms: 0,
        login_wait_secs: u64::MAX,
        login_recovery_secs: Some(u64::MAX),
        ..Config::default()
    };
    let page = Arc::new(MockPage::blank());
    let launcher = Arc::new(MockLauncher::new(Arc::clone(&page)));
    let session = Arc::new(Session::new(launcher, config.browser_options()));
    let portal = MusicPortal::new(session, &config, Arc::new(MemoryDiagnostics::new()));
    page.set_dom(home_with_login_entry());
    page.swap_dom_on_click(home_logged_in());

    assert_eq!(portal.login().await, format::LOGIN_SUCCEEDED);
    assert_eq!(page.reload_count(), 0);
}

#[tokio::test]
async fn test_login_reports_browser_launch_failure() {
    let h = harness();
    h.launcher.fail_launch(true);

    let text = h.portal.login().await;

    assert!(text.starts_with("浏览器初始化失败: "), "{}", text);
    assert!(!h.portal.session().is_open().await);
}

#[tokio::test(start_paused = true)]
async fn test_login_error_closes_session() {
    let h = harness();
    h.page.time_out_next_navigations(1);

    let text = h.portal.login().await;

    assert!(text.starts_with("登录出错: "), "{}", text);
    assert!(h.portal.session().live_handles().await.none());
}

#[tokio::test(start_paused = true)]
async fn test_login_relaunches_the_browser() {
    let h = harness();
    h.page.set_dom(home_logged_in());

    h.portal.login().await;
    h.portal.login().await;

    assert_eq!(h.launcher.launch_count(), 2);
    let (first_browser, first_driver) = h.launcher.launched(0).unwrap();
    assert!(!crate::session::BrowserContext::is_active(first_browser.as_ref()));
    assert_eq!(first_driver.stop_count(), 1);
}

#[tokio::test]
async fn test_logout_closes_the_session() {
    let h = opened().await;

    assert_eq!(h.portal.logout().await, format::SESSION_CLOSED);
    assert!(!h.portal.session().is_open().await);
    assert_eq!(h.portal.get_top_lists().await, format::NOT_LOGGED_IN);
    // Logging out twice is harmless
    assert_eq!(h.portal.logout().await, format::SESSION_CLOSED);
}
