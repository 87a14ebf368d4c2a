//! Selector catalog for the QQ Music portal
//!
//! Each field lists the markup variants it has been seen under, newest first.
//! Supporting a new variant means adding a candidate here.

use crate::engine::{FieldSpec, SelectorChain};

/// Login entry shown while logged out
pub const LOGIN_ENTRY: &str = "text=\"登录\"";

/// Search results container; its presence means results rendered
pub const SEARCH_READY: &str = ".songlist__list";

/// Song detail header
pub const DETAIL_READY: &str = ".data__name";

/// Singer page header
pub const ARTIST_READY: &str = ".data__name";

/// Comment section
pub const COMMENTS_READY: &str = ".comment__list";

/// Chart navigation
pub const TOPLIST_READY: &str = ".toplist_nav__item";

/// Song row in search results and singer hot songs
pub const SONG_ITEM: SelectorChain<'static> = SelectorChain::new(&[
    ".songlist__item",
    ".songlist__list li",
    ".mod_songlist li",
]);

pub const SONG_FIELDS: &[FieldSpec<'static>] = &[
    FieldSpec::text(
        "title",
        &[".songlist__songname_txt", ".songlist__songname a", ".songname"],
        "未知歌曲",
    ),
    FieldSpec::text(
        "artist",
        &[".songlist__artist", ".songlist__singer", ".singer_name"],
        "未知歌手",
    ),
    FieldSpec::text("album", &[".songlist__album", ".album_name"], "未知专辑"),
    FieldSpec::text("duration", &[".songlist__time", ".song_time"], "未知时长"),
    FieldSpec::link_id(
        "id",
        &[
            "a.songlist__songname",
            ".songlist__songname_txt a",
            "a[href*='/songDetail/']",
        ],
        "href",
        "/songDetail/",
        "未知ID",
    ),
];

pub const DETAIL_NAME: SelectorChain<'static> = SelectorChain::new(&[".data__name_txt", ".data__name"]);
pub const DETAIL_SINGER: SelectorChain<'static> = SelectorChain::new(&[".data__singer", ".data__singer a"]);
pub const DETAIL_ALBUM: SelectorChain<'static> =
    SelectorChain::new(&[".data__album", ".data__info a[href*='/albumDetail/']"]);
pub const DETAIL_TIME: SelectorChain<'static> = SelectorChain::new(&[".data__info time", ".data__time"]);
pub const DETAIL_LYRIC: SelectorChain<'static> = SelectorChain::new(&[".lyric", ".lyric__cont", "#lrc_content"]);

pub const ARTIST_NAME: SelectorChain<'static> =
    SelectorChain::new(&[".data__name_txt", ".data__name", ".singer__name"]);
pub const ARTIST_DESC: SelectorChain<'static> =
    SelectorChain::new(&[".data__desc_txt", ".data__desc", ".singer__desc"]);

pub const COMMENT_ITEM: SelectorChain<'static> = SelectorChain::new(&[
    ".comment__list_item",
    ".comment__item",
    ".comment__list li",
]);

pub const COMMENT_FIELDS: &[FieldSpec<'static>] = &[
    FieldSpec::text(
        "author",
        &[".comment__title a", ".comment__nick", ".comment__title"],
        "匿名用户",
    ),
    FieldSpec::text("text", &[".comment__text", ".js_hot_text", ".comment__content"], ""),
    FieldSpec::text("time", &[".comment__date", ".comment__time"], "未知时间"),
    FieldSpec::text("likes", &[".comment__zan", ".js_praise_num"], "0"),
];

pub const COMMENT_INPUT: SelectorChain<'static> = SelectorChain::new(&[
    ".comment__textarea",
    "textarea.js_comment_textarea",
    ".comment__input textarea",
]);
pub const COMMENT_SUBMIT: SelectorChain<'static> = SelectorChain::new(&[
    ".comment__tool .btn_comment",
    "a.btn_comment",
    "text=\"发表评论\"",
]);

pub const TOPLIST_ITEM: SelectorChain<'static> = SelectorChain::new(&[".toplist_nav__item", ".toplist__item"]);

pub const TOPLIST_FIELDS: &[FieldSpec<'static>] = &[
    FieldSpec::text("name", &[".toplist_nav__title", ".toplist__name"], "未知排行榜"),
    FieldSpec::text("desc", &[".toplist_nav__desc", ".toplist__desc"], ""),
    FieldSpec::link_id(
        "id",
        &["a.toplist_nav__link", "a[href*='/toplist/']"],
        "href",
        "/toplist/",
        "",
    ),
];

/// Marker preceding a chart id in its link, when the item itself is the link
pub const TOPLIST_MARKER: &str = "/toplist/";
