//! # 会话管理层
//!
//! 管理唯一的浏览器会话：浏览器进程、持久化用户目录和当前活动页面。
//!
//! ## 主要功能
//! - **会话生命周期**: `open` 先关闭旧会话再启动新浏览器，失败时完全关闭
//! - **幂等关闭**: `close` 可重复调用，始终释放浏览器、驱动和页面三个句柄
//! - **元素定位**: CSS、`text=` 和 `xpath=` 三种定位器
//! - **测试替身**: 内存 DOM 实现，带查询计数和故障注入
//!
//! ## 核心概念
//! - **BrowserContext**: 浏览器上下文，可以包含多个页面
//! - **PageContext**: 页面上下文，提供页面级别的操作
//! - **ElementRef**: 元素引用，用于页面元素交互
//! - **Locate**: 页面和元素共有的查询能力
//!
//! ## 模块结构
//! - `traits`: 会话管理的核心 trait 定义
//! - `selector`: 定位器解析与查询脚本
//! - `manager`: 会话管理器实现
//! - `launcher`: Chrome 进程启动
//! - `browser`: 浏览器上下文实现
//! - `page`: 页面上下文实现
//! - `element`: 元素引用实现
//! - `mock`: 用于测试的 Mock 实现
//!
//! ## 使用示例
//! ```rust,no_run
//! use qqmusic_oxide::session::{BrowserOptions, NavigationOptions, PageContext, Session};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let session = Session::chrome(BrowserOptions::default());
//! session.open().await?;
//!
//! let page = session.require_page().await?;
//! let result = page.navigate("https://y.qq.com", NavigationOptions::default()).await?;
//! println!("Page loaded: {}", result.url);
//!
//! session.close().await;
//! # Ok(())
//! # }
//! ```

pub mod traits;
pub mod selector;
pub mod manager;
pub mod launcher;
pub mod browser;
pub mod page;
pub mod element;
pub mod mock;

#[cfg(test)]
pub mod tests;

pub use traits::{
    BrowserContext, PageContext, ElementRef, Locate, BrowserLauncher, BrowserDriver,
    BrowserOptions, NavigationOptions, ScreenshotFormat, NavigationResult, EvaluationResult,
    LaunchedBrowser,
};
pub use selector::{Locator, SelectorType};

// Re-export implementation structs
pub use manager::{LiveHandles, Session};
pub use launcher::{ChromeDriver, ChromeLauncher};
pub use browser::BrowserContextImpl;
pub use page::PageContextImpl;
pub use element::ElementRefImpl;

// Mock implementations, also used by the integration tests
pub use mock::{MockBrowser, MockDriver, MockElement, MockLauncher, MockNode, MockPage};
