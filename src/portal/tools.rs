//! Portal tool operations
//!
//! Each tool asks the session for the active page, runs one unit of work
//! (navigate, wait, extract) under the retry engine and renders the outcome
//! as text. Nothing here returns an error to the caller.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

use crate::config::Config;
use crate::engine::{
    parse_id_from_link, Diagnostics, Extractor, Failure, FileDiagnostics, RetryEngine, RetryOutcome, WaitCondition,
    WaitOutcome, Waiter,
};
use crate::portal::format::{self, ArtistDetail, Comment, SongDetail, SongSummary, TopList};
use crate::portal::selectors::*;
use crate::session::{Locate, NavigationOptions, PageContext, Session};
use crate::Error;

/// The QQ Music tools, bound to one session
#[derive(Debug)]
pub struct MusicPortal {
    session: Arc<Session>,
    retry: RetryEngine,
    extractor: Extractor,
    waiter: Waiter,
    diagnostics: Arc<dyn Diagnostics>,
    base_url: String,
    navigation_timeout: Duration,
    element_timeout: Duration,
    settle_delay: Duration,
    login_wait: WaitCondition,
}

impl MusicPortal {
    pub fn new(session: Arc<Session>, config: &Config, diagnostics: Arc<dyn Diagnostics>) -> Self {
        Self {
            session,
            retry: RetryEngine::new(config.retry_policy()).with_diagnostics(Arc::clone(&diagnostics)),
            extractor: Extractor::new(Arc::clone(&diagnostics)),
            waiter: Waiter::new(Arc::clone(&diagnostics)),
            diagnostics,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            navigation_timeout: Duration::from_millis(config.navigation_timeout_ms),
            element_timeout: Duration::from_millis(config.default_timeout_ms),
            settle_delay: Duration::from_millis(config.settle_delay_ms),
            login_wait: config.login_wait(),
        }
    }

    /// Portal driving a local Chrome, with file diagnostics where configured
    pub fn from_config(config: &Config) -> Self {
        let session = Arc::new(Session::chrome(config.browser_options()));
        let diagnostics = Arc::new(FileDiagnostics::new(
            config.debug_log_path.clone(),
            config.screenshot_dir.clone(),
        ));
        Self::new(session, config, diagnostics)
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Navigate, let scripts settle, then wait for the page's ready marker
    async fn open_page(&self, page: &dyn PageContext, url: &str, ready: &str) -> Result<(), Error> {
        page.navigate(url, NavigationOptions::with_timeout(self.navigation_timeout))
            .await?;
        tokio::time::sleep(self.settle_delay).await;
        page.wait_for_selector(ready, Some(self.element_timeout)).await
    }

    /// Run `operation` against the active page under the retry engine.
    ///
    /// `Err` carries the text to reply with: the login guidance, the
    /// exhaustion notice or the failure description.
    async fn run<T, F, Fut>(&self, action: &str, mut operation: F) -> Result<T, String>
    where
        F: FnMut(Arc<dyn PageContext>) -> Fut,
        Fut: Future<Output = Result<T, Failure>>,
    {
        let Ok(page) = self.session.require_page().await else {
            info!("{}: no session open", action);
            return Err(format::NOT_LOGGED_IN.to_string());
        };

        match self.retry.execute(page.as_ref(), || operation(Arc::clone(&page))).await {
            Ok(RetryOutcome::Completed(value)) => Ok(value),
            Ok(RetryOutcome::Exhausted { attempts }) => {
                warn!("{}: gave up after {} attempts", action, attempts);
                self.diagnostics.capture(page.as_ref(), action).await;
                Err(format::timed_out(attempts))
            }
            Err(e) => {
                error!("{} failed: {}", action, e);
                self.diagnostics.capture(page.as_ref(), action).await;
                Err(format::failed(action, &e))
            }
        }
    }

    /// Open a fresh browser session and wait for the user to log in.
    ///
    /// A login entry on the home page means nobody is logged in: it is
    /// clicked to bring up the QR code, then the wait ends once the entry
    /// disappears.
    #[instrument(skip(self))]
    pub async fn login(&self) -> String {
        if let Err(e) = self.session.open().await {
            return format::browser_init_failed(&e);
        }
        let page = match self.session.require_page().await {
            Ok(page) => page,
            Err(e) => return format::browser_init_failed(&e),
        };

        match self.login_flow(page.as_ref()).await {
            Ok(reply) => reply,
            Err(e) => {
                error!("Login failed: {}", e);
                self.diagnostics.capture(page.as_ref(), "login").await;
                self.session.close().await;
                format::login_failed(&e)
            }
        }
    }

    async fn login_flow(&self, page: &dyn PageContext) -> Result<String, Error> {
        page.navigate(&self.base_url, NavigationOptions::with_timeout(self.navigation_timeout))
            .await?;
        tokio::time::sleep(self.settle_delay).await;

        let Some(entry) = page.query(LOGIN_ENTRY).await? else {
            info!("No login entry on the page, already logged in");
            return Ok(format::ALREADY_LOGGED_IN.to_string());
        };
        entry.click().await?;
        info!("Login dialog opened, waiting for confirmation");

        let outcome = self
            .waiter
            .wait_until(page, &self.login_wait, move || async move {
                page.query_all(LOGIN_ENTRY).await.map(|entries| entries.is_empty())
            })
            .await;

        Ok(match outcome {
            WaitOutcome::Succeeded => {
                tokio::time::sleep(self.settle_delay).await;
                format::LOGIN_SUCCEEDED.to_string()
            }
            WaitOutcome::TimedOut => format::LOGIN_TIMED_OUT.to_string(),
        })
    }

    #[instrument(skip(self))]
    pub async fn search_songs(&self, keywords: &str, limit: usize) -> String {
        let keywords = keywords.trim();
        if keywords.is_empty() {
            return format::EMPTY_KEYWORDS.to_string();
        }
        let url = self.url(&format!("/n/ryqq/search?w={}", urlencoding::encode(keywords)));
        let url = url.as_str();

        let result = self
            .run("搜索歌曲", move |page| async move {
                self.open_page(page.as_ref(), url, SEARCH_READY).await?;
                let records = self
                    .extractor
                    .extract_records(page.as_ref(), SONG_ITEM, limit, SONG_FIELDS)
                    .await;
                Ok::<_, Failure>(records.iter().map(SongSummary::from).collect::<Vec<_>>())
            })
            .await;

        match result {
            Ok(songs) => {
                info!("Found {} songs for {}", songs.len(), keywords);
                format::search_results(keywords, &songs)
            }
            Err(reply) => reply,
        }
    }

    #[instrument(skip(self))]
    pub async fn get_song_details(&self, song_id: &str) -> String {
        let song_id = song_id.trim();
        if song_id.is_empty() {
            return format::EMPTY_SONG_ID.to_string();
        }
        let url = self.url(&format!("/n/ryqq/songDetail/{}", song_id));
        let url = url.as_str();

        let result = self
            .run("获取歌曲详情", move |page| async move {
                self.open_page(page.as_ref(), url, DETAIL_READY).await?;
                let page = page.as_ref();
                Ok::<_, Failure>(SongDetail {
                    id: song_id.to_string(),
                    title: self.extractor.extract_text(page, DETAIL_NAME, "未知歌曲").await,
                    artist: self.extractor.extract_text(page, DETAIL_SINGER, "未知歌手").await,
                    album: self.extractor.extract_text(page, DETAIL_ALBUM, "未知专辑").await,
                    release_date: self.extractor.extract_text(page, DETAIL_TIME, "未知时间").await,
                    lyrics: self.extractor.extract_text(page, DETAIL_LYRIC, "暂无歌词").await,
                })
            })
            .await;

        result.map_or_else(|reply| reply, |song| format::song_detail(&song))
    }

    #[instrument(skip(self))]
    pub async fn get_artist_details(&self, artist_id: &str, limit: usize) -> String {
        let artist_id = artist_id.trim();
        if artist_id.is_empty() {
            return format::EMPTY_ARTIST_ID.to_string();
        }
        let url = self.url(&format!("/n/ryqq/singer/{}", artist_id));
        let url = url.as_str();

        let result = self
            .run("获取歌手详情", move |page| async move {
                self.open_page(page.as_ref(), url, ARTIST_READY).await?;
                let page = page.as_ref();
                let records = self
                    .extractor
                    .extract_records(page, SONG_ITEM, limit, SONG_FIELDS)
                    .await;
                Ok::<_, Failure>(ArtistDetail {
                    id: artist_id.to_string(),
                    name: self.extractor.extract_text(page, ARTIST_NAME, "未知歌手").await,
                    description: self.extractor.extract_text(page, ARTIST_DESC, "暂无简介").await,
                    songs: records.iter().map(SongSummary::from).collect(),
                })
            })
            .await;

        result.map_or_else(|reply| reply, |artist| format::artist_detail(&artist))
    }

    #[instrument(skip(self))]
    pub async fn get_comments(&self, song_id: &str, limit: usize) -> String {
        let song_id = song_id.trim();
        if song_id.is_empty() {
            return format::EMPTY_SONG_ID.to_string();
        }
        let url = self.url(&format!("/n/ryqq/songDetail/{}", song_id));
        let url = url.as_str();

        let result = self
            .run("获取评论", move |page| async move {
                self.open_page(page.as_ref(), url, COMMENTS_READY).await?;
                // Empty entries must not count against the limit
                let records = self
                    .extractor
                    .extract_records(page.as_ref(), COMMENT_ITEM, usize::MAX, COMMENT_FIELDS)
                    .await;
                Ok::<_, Failure>(records
                    .iter()
                    .map(Comment::from)
                    .filter(|comment| !comment.text.is_empty())
                    .take(limit)
                    .collect::<Vec<_>>())
            })
            .await;

        result.map_or_else(|reply| reply, |comments| format::comments(song_id, &comments))
    }

    /// Post a comment under a song.
    ///
    /// Runs through the same retry wrapper as the read-only tools, so a
    /// timeout after the submit click registered can post twice.
    #[instrument(skip(self, content))]
    pub async fn post_comment(&self, song_id: &str, content: &str) -> String {
        let content = content.trim();
        if content.is_empty() {
            return format::EMPTY_COMMENT.to_string();
        }
        let song_id = song_id.trim();
        if song_id.is_empty() {
            return format::EMPTY_SONG_ID.to_string();
        }
        let url = self.url(&format!("/n/ryqq/songDetail/{}", song_id));
        let url = url.as_str();

        let result = self
            .run("发表评论", move |page| async move {
                self.open_page(page.as_ref(), url, COMMENTS_READY).await?;
                let page = page.as_ref();

                let input = self
                    .extractor
                    .find_first(page, COMMENT_INPUT)
                    .await
                    .ok_or_else(|| Error::element_not_found(format!("comment input {}", COMMENT_INPUT)))?;
                input.click().await?;
                input.type_text(content).await?;

                let submit = self
                    .extractor
                    .find_first(page, COMMENT_SUBMIT)
                    .await
                    .ok_or_else(|| Error::element_not_found(format!("comment submit {}", COMMENT_SUBMIT)))?;
                submit.click().await?;
                tokio::time::sleep(self.settle_delay).await;
                Ok::<_, Failure>(())
            })
            .await;

        match result {
            Ok(()) => {
                info!("Comment posted under {}", song_id);
                format::COMMENT_POSTED.to_string()
            }
            Err(reply) => reply,
        }
    }

    #[instrument(skip(self))]
    pub async fn get_top_lists(&self) -> String {
        let url = self.url("/n/ryqq/toplist");
        let url = url.as_str();

        let result = self
            .run("获取排行榜", move |page| async move {
                self.open_page(page.as_ref(), url, TOPLIST_READY).await?;
                let items = self
                    .extractor
                    .extract_list(page.as_ref(), TOPLIST_ITEM, usize::MAX)
                    .await;

                let mut lists = Vec::with_capacity(items.len());
                for item in &items {
                    let mut list = TopList::from(&self.extractor.extract_record(item.as_ref(), TOPLIST_FIELDS).await);
                    // Chart entries are usually links themselves
                    if list.id.is_empty() {
                        if let Ok(Some(href)) = item.get_attribute("href").await {
                            list.id = parse_id_from_link(&href, TOPLIST_MARKER);
                        }
                    }
                    lists.push(list);
                }
                Ok::<_, Failure>(lists)
            })
            .await;

        result.map_or_else(|reply| reply, |lists| format::top_lists(&lists))
    }

    /// Close the browser session
    pub async fn logout(&self) -> String {
        self.session.close().await;
        format::SESSION_CLOSED.to_string()
    }
}
