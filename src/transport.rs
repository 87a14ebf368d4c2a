//! Line-delimited JSON tool protocol
//!
//! One request per line on the input, `{"id": .., "tool": "..", "arguments": {..}}`,
//! and one reply per line on the output, `{"id": .., "text": ".."}`. Every
//! request gets exactly one reply, including malformed ones and lines that
//! are not UTF-8.

use phf::phf_map;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio_stream::wrappers::SplitStream;
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};

use crate::portal::MusicPortal;
use crate::Result;

#[derive(Debug, Clone, Deserialize)]
pub struct ToolRequest {
    #[serde(default)]
    pub id: Value,
    pub tool: String,
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolReply {
    pub id: Value,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Login,
    SearchSongs,
    GetSongDetails,
    GetArtistDetails,
    GetComments,
    PostComment,
    GetTopLists,
    Logout,
}

static TOOLS: phf::Map<&'static str, Tool> = phf_map! {
    "login" => Tool::Login,
    "search_songs" => Tool::SearchSongs,
    "get_song_details" => Tool::GetSongDetails,
    "get_artist_details" => Tool::GetArtistDetails,
    "get_comments" => Tool::GetComments,
    "post_comment" => Tool::PostComment,
    "get_top_lists" => Tool::GetTopLists,
    "logout" => Tool::Logout,
};

impl Tool {
    pub fn from_name(name: &str) -> Option<Self> {
        TOOLS.get(name).copied()
    }
}

fn string_arg(arguments: &Map<String, Value>, name: &str) -> std::result::Result<String, String> {
    match arguments.get(name) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(format!("缺少参数: {}", name)),
    }
}

/// Optional count argument; numbers and numeric strings are accepted
fn limit_arg(arguments: &Map<String, Value>, name: &str, default: usize) -> usize {
    match arguments.get(name) {
        Some(Value::Number(n)) => n.as_u64().map_or(default, |n| n as usize),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(default),
        _ => default,
    }
}

/// Run one tool call to its reply text
pub async fn dispatch(portal: &MusicPortal, tool: Tool, arguments: &Map<String, Value>) -> String {
    let result = async {
        Ok::<_, String>(match tool {
            Tool::Login => portal.login().await,
            Tool::SearchSongs => {
                let keywords = string_arg(arguments, "keywords")?;
                portal
                    .search_songs(&keywords, limit_arg(arguments, "limit", 5))
                    .await
            }
            Tool::GetSongDetails => {
                let song_id = string_arg(arguments, "song_id")?;
                portal.get_song_details(&song_id).await
            }
            Tool::GetArtistDetails => {
                let artist_id = string_arg(arguments, "artist_id")?;
                portal
                    .get_artist_details(&artist_id, limit_arg(arguments, "limit", 10))
                    .await
            }
            Tool::GetComments => {
                let song_id = string_arg(arguments, "song_id")?;
                portal
                    .get_comments(&song_id, limit_arg(arguments, "limit", 10))
                    .await
            }
            Tool::PostComment => {
                let song_id = string_arg(arguments, "song_id")?;
                let content = string_arg(arguments, "content")?;
                portal.post_comment(&song_id, &content).await
            }
            Tool::GetTopLists => portal.get_top_lists().await,
            Tool::Logout => portal.logout().await,
        })
    };

    result.await.unwrap_or_else(|message| message)
}

fn unparseable(error: impl std::fmt::Display) -> ToolReply {
    ToolReply {
        id: Value::Null,
        text: format!("无法解析请求: {}", error),
    }
}

/// Reply for one input line; blank lines get none
pub async fn handle_line(portal: &MusicPortal, line: &str) -> Option<ToolReply> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let request: ToolRequest = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(e) => {
            warn!("Malformed request: {}", e);
            return Some(unparseable(e));
        }
    };

    let text = match Tool::from_name(&request.tool) {
        Some(tool) => {
            info!("Calling {}", request.tool);
            dispatch(portal, tool, &request.arguments).await
        }
        None => {
            warn!("Unknown tool {}", request.tool);
            format!("未知工具: {}", request.tool)
        }
    };

    Some(ToolReply { id: request.id, text })
}

/// Answer requests from `reader` on `writer` until the input ends
pub async fn serve<R, W>(portal: &MusicPortal, reader: R, mut writer: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = SplitStream::new(reader.split(b'\n'));

    // Only read errors end the loop; undecodable lines are answered
    while let Some(raw) = lines.next().await {
        let reply = match String::from_utf8(raw?) {
            Ok(line) => handle_line(portal, &line).await,
            Err(e) => {
                warn!("Request line is not UTF-8: {}", e);
                Some(unparseable(e.utf8_error()))
            }
        };
        let Some(reply) = reply else {
            continue;
        };

        let mut encoded = serde_json::to_string(&reply)?;
        encoded.push('\n');
        writer.write_all(encoded.as_bytes()).await?;
        writer.flush().await?;
    }

    debug!("Input closed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::config::Config;
    use crate::engine::NoopDiagnostics;
    use crate::session::{MockLauncher, MockPage, Session};

    fn portal() -> MusicPortal {
        let config = Config {
            settle_delay_ms: 0,
            ..Config::default()
        };
        let launcher = Arc::new(MockLauncher::new(Arc::new(MockPage::blank())));
        let session = Arc::new(Session::new(launcher, config.browser_options()));
        MusicPortal::new(session, &config, Arc::new(NoopDiagnostics))
    }

    #[test]
    fn test_tool_names() {
        assert_eq!(Tool::from_name("search_songs"), Some(Tool::SearchSongs));
        assert_eq!(Tool::from_name("logout"), Some(Tool::Logout));
        assert_eq!(Tool::from_name("Search_Songs"), None);
    }

    #[test]
    fn test_limit_argument_forms() {
        let args: Map<String, Value> =
            serde_json::from_str(r#"{"a": 3, "b": "7", "c": -1, "d": "x"}"#).unwrap();
        assert_eq!(limit_arg(&args, "a", 5), 3);
        assert_eq!(limit_arg(&args, "b", 5), 7);
        assert_eq!(limit_arg(&args, "c", 5), 5);
        assert_eq!(limit_arg(&args, "d", 5), 5);
        assert_eq!(limit_arg(&args, "missing", 5), 5);
    }

    #[tokio::test]
    async fn test_malformed_and_unknown_requests_get_replies() {
        let portal = portal();

        let reply = handle_line(&portal, "{not json").await.unwrap();
        assert_eq!(reply.id, Value::Null);
        assert!(reply.text.starts_with("无法解析请求"));

        let reply = handle_line(&portal, r#"{"id": 4, "tool": "play_song"}"#).await.unwrap();
        assert_eq!(reply.id, Value::from(4));
        assert_eq!(reply.text, "未知工具: play_song");

        assert!(handle_line(&portal, "   ").await.is_none());
    }

    #[tokio::test]
    async fn test_missing_argument_is_reported() {
        let portal = portal();
        let reply = handle_line(&portal, r#"{"id": "a", "tool": "get_song_details"}"#)
            .await
            .unwrap();
        assert_eq!(reply.text, "缺少参数: song_id");
    }

    #[tokio::test]
    async fn test_serve_keeps_going_after_undecodable_line() {
        let portal = portal();
        let mut input = br#"{"id": 1, "tool": "logout"}"#.to_vec();
        input.extend_from_slice(b"\n\xff\xfe\n");
        input.extend_from_slice(br#"{"id": 2, "tool": "logout"}"#);
        input.push(b'\n');
        let mut output = Vec::new();

        serve(&portal, input.as_slice(), &mut output).await.unwrap();

        let replies: Vec<Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(replies.len(), 3);
        assert_eq!(replies[0]["id"], 1);
        assert_eq!(replies[1]["id"], Value::Null);
        assert!(replies[1]["text"].as_str().unwrap().starts_with("无法解析请求"));
        assert_eq!(replies[2]["id"], 2);
        assert_eq!(replies[2]["text"], "浏览器会话已关闭");
    }

    #[tokio::test]
    async fn test_serve_answers_each_line() {
        let portal = portal();
        let input = concat!(
            r#"{"id": 1, "tool": "get_top_lists"}"#,
            "\n\n",
            r#"{"id": 2, "tool": "logout"}"#,
            "\n"
        );
        let mut output = Vec::new();

        serve(&portal, input.as_bytes(), &mut output).await.unwrap();

        let replies: Vec<Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0]["id"], 1);
        assert_eq!(replies[0]["text"], "请先登录QQ音乐账号");
        assert_eq!(replies[1]["text"], "浏览器会话已关闭");
    }
}
