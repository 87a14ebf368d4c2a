//! Reply texts
//!
//! Every tool answers with plain text; the wording here is what the user sees.

use std::fmt::Write;

use crate::engine::Record;
use crate::Error;

pub const NOT_LOGGED_IN: &str = "请先登录QQ音乐账号";
pub const LOGIN_SUCCEEDED: &str = "登录成功！";
pub const ALREADY_LOGGED_IN: &str = "已登录QQ音乐账号";
pub const LOGIN_TIMED_OUT: &str = "登录等待超时。请重试或手动登录后再使用其他功能。";
pub const SESSION_CLOSED: &str = "浏览器会话已关闭";
pub const COMMENT_POSTED: &str = "评论发表成功！";
pub const EMPTY_KEYWORDS: &str = "搜索关键词不能为空";
pub const EMPTY_COMMENT: &str = "评论内容不能为空";
pub const EMPTY_SONG_ID: &str = "歌曲ID不能为空";
pub const EMPTY_ARTIST_ID: &str = "歌手ID不能为空";
pub const NO_TOP_LISTS: &str = "未能获取到排行榜信息";

/// Operation timed out on every attempt
pub fn timed_out(attempts: u32) -> String {
    format!("操作超时：已重试 {} 次仍未完成", attempts)
}

/// Operation failed with a non-retryable error
pub fn failed(action: &str, error: &Error) -> String {
    format!("{}时出错: {}", action, error)
}

pub fn browser_init_failed(error: &Error) -> String {
    format!("浏览器初始化失败: {}", error)
}

pub fn login_failed(error: &Error) -> String {
    format!("登录出错: {}", error)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongSummary {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub duration: String,
    pub id: String,
}

impl From<&Record> for SongSummary {
    fn from(record: &Record) -> Self {
        Self {
            title: record.get("title").to_string(),
            artist: record.get("artist").to_string(),
            album: record.get("album").to_string(),
            duration: record.get("duration").to_string(),
            id: record.get("id").to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongDetail {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub release_date: String,
    pub lyrics: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtistDetail {
    pub id: String,
    pub name: String,
    pub description: String,
    pub songs: Vec<SongSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub author: String,
    pub text: String,
    pub time: String,
    pub likes: String,
}

impl From<&Record> for Comment {
    fn from(record: &Record) -> Self {
        Self {
            author: record.get("author").to_string(),
            text: record.get("text").to_string(),
            time: record.get("time").to_string(),
            likes: record.get("likes").to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopList {
    pub name: String,
    pub description: String,
    pub id: String,
}

impl From<&Record> for TopList {
    fn from(record: &Record) -> Self {
        Self {
            name: record.get("name").to_string(),
            description: record.get("desc").to_string(),
            id: record.get("id").to_string(),
        }
    }
}

pub fn search_results(keywords: &str, songs: &[SongSummary]) -> String {
    if songs.is_empty() {
        return format!("未找到与\"{}\"相关的歌曲", keywords);
    }

    let mut out = String::from("搜索结果：\n\n");
    for (i, song) in songs.iter().enumerate() {
        let _ = write!(
            out,
            "{}. {} - {}\n   专辑: {}\n   时长: {}\n   歌曲ID: {}\n\n",
            i + 1,
            song.title,
            song.artist,
            song.album,
            song.duration,
            song.id
        );
    }
    out.trim_end().to_string()
}

pub fn song_detail(song: &SongDetail) -> String {
    format!(
        "歌曲: {}\n歌手: {}\n专辑: {}\n发行时间: {}\n歌曲ID: {}\n\n歌词:\n{}",
        song.title, song.artist, song.album, song.release_date, song.id, song.lyrics
    )
}

pub fn artist_detail(artist: &ArtistDetail) -> String {
    let mut out = format!(
        "歌手: {}\n歌手ID: {}\n简介: {}\n\n",
        artist.name, artist.id, artist.description
    );
    if artist.songs.is_empty() {
        out.push_str("暂无热门歌曲");
        return out;
    }

    out.push_str("热门歌曲：\n\n");
    for (i, song) in artist.songs.iter().enumerate() {
        let _ = write!(
            out,
            "{}. {}\n   专辑: {}\n   时长: {}\n   歌曲ID: {}\n\n",
            i + 1,
            song.title,
            song.album,
            song.duration,
            song.id
        );
    }
    out.trim_end().to_string()
}

pub fn comments(song_id: &str, comments: &[Comment]) -> String {
    if comments.is_empty() {
        return format!("歌曲 {} 暂无评论", song_id);
    }

    let mut out = format!("歌曲 {} 的评论：\n\n", song_id);
    for (i, comment) in comments.iter().enumerate() {
        let _ = write!(
            out,
            "{}. {}: {}\n   时间: {}  点赞: {}\n\n",
            i + 1,
            comment.author,
            comment.text,
            comment.time,
            comment.likes
        );
    }
    out.trim_end().to_string()
}

pub fn top_lists(lists: &[TopList]) -> String {
    if lists.is_empty() {
        return NO_TOP_LISTS.to_string();
    }

    let mut out = String::from("QQ音乐排行榜列表：\n\n");
    for (i, list) in lists.iter().enumerate() {
        let _ = writeln!(out, "{}. {}", i + 1, list.name);
        if !list.description.is_empty() {
            let _ = writeln!(out, "   简介: {}", list.description);
        }
        let _ = write!(out, "   ID: {}\n\n", list.id);
    }
    out.trim_end().to_string()
}
