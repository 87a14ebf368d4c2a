//! # Chrome DevTools Protocol (CDP) 层
//!
//! 提供与 Chrome/Chromium 浏览器的 WebSocket 通信接口，是会话层真实后端的基础。
//!
//! ## 主要功能
//! - **WebSocket 连接管理**: 建立 CDP 连接，按命令 ID 路由响应
//! - **超时分级**: 截图、导航、普通命令使用不同的等待上限，超时统一映射为 `Error::Timeout`
//! - **远程对象**: 通过 `Runtime.callFunctionOn` 操作元素句柄
//! - **目标发现**: 通过 `/json/*` HTTP 端点列出和创建页面
//!
//! ## 模块结构
//! - `traits`: CDP 操作的核心 trait 定义
//! - `types`: CDP 协议相关的数据类型
//! - `connection`: WebSocket 连接实现
//! - `client`: CDP 客户端实现
//! - `browser`: 浏览器级别的操作
//! - `mock`: 用于测试的脚本化连接
//!
//! ## 使用示例
//! ```rust,no_run
//! use qqmusic_oxide::cdp::{CdpBrowser, CdpBrowserImpl, CdpClient};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let browser = CdpBrowserImpl::new("127.0.0.1:9222")?;
//! let target = browser.create_target("about:blank").await?;
//! let ws_url = target.web_socket_debugger_url.unwrap_or_default();
//! let client = browser.create_client(&ws_url).await?;
//!
//! let result = client.navigate("https://y.qq.com", Duration::from_secs(60)).await?;
//! println!("Navigated to: {}", result.url);
//! # Ok(())
//! # }
//! ```

pub mod traits;
pub mod types;
pub mod connection;
pub mod client;
pub mod browser;
pub mod mock;

pub use traits::{
    CdpConnection, CdpClient, CdpBrowser, CdpResponse, CdpError,
    NavigationResult, EvaluationResult, ScreenshotFormat,
};
pub use types::{TargetDescriptor, VersionDescriptor, RemoteObject, CallArgument};

// Re-export implementation structs
pub use connection::CdpWebSocketConnection;
pub use client::CdpClientImpl;
pub use browser::CdpBrowserImpl;

pub use mock::MockCdpConnection;
