//! # 弹性自动化引擎
//!
//! 在不稳定的页面结构和网络状况下完成页面操作。
//!
//! ## 主要功能
//! - **重试引擎**: 将失败分为可重试（超时）和致命两类，超时后刷新页面再试
//! - **回退链提取**: 按顺序尝试候选选择器，第一个非空值胜出，全部落空时返回默认值
//! - **等待轮询**: 按固定间隔轮询条件，直到成功或超时，期间定期刷新页面
//! - **诊断**: 日志和截图通过注入的 `Diagnostics` 输出，不影响主流程
//!
//! ## 模块结构
//! - `retry`: 重试引擎
//! - `extractor`: 回退链提取器
//! - `wait`: 等待轮询工具
//! - `diagnostics`: 诊断输出

pub mod retry;
pub mod extractor;
pub mod wait;
pub mod diagnostics;


pub use retry::{Failure, RetryEngine, RetryOutcome, RetryPolicy};
pub use extractor::{
    parse_id_from_link, ExtractionResult, Extractor, FieldSource, FieldSpec, Record, SelectorChain,
};
pub use wait::{wait_until, WaitCondition, WaitOutcome, Waiter};
pub use diagnostics::{DiagnosticEvent, Diagnostics, FileDiagnostics, MemoryDiagnostics, NoopDiagnostics};
