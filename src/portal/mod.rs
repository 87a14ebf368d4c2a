//! # QQ音乐门户工具
//!
//! 基于弹性引擎实现的具体工具：登录、搜索、歌曲详情、歌手详情、评论、排行榜。
//!
//! ## 主要功能
//! - **未登录拦截**: 没有打开的会话时直接返回“请先登录QQ音乐账号”
//! - **重试包装**: 每个工具的一次完整操作（导航、等待、提取）交给重试引擎执行
//! - **选择器目录**: 每个字段的候选选择器集中声明，页面改版时只需追加候选
//! - **文本输出**: 所有结果和错误都转换为中文文本，不向调用方抛出错误
//!
//! ## 模块结构
//! - `selectors`: 选择器目录
//! - `format`: 输出文本
//! - `tools`: 工具实现

pub mod selectors;
pub mod format;
pub mod tools;

#[cfg(test)]
pub mod tests;

pub use tools::MusicPortal;
