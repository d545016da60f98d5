//! 协议事件流（供 UI / 离线回放使用）
//!
//! 设计目标：
//! - **结构化**：用 JSON 事件而不是解析文本日志
//! - **解耦**：渲染层只订阅事件，自己维护“序号 -> 视图”的映射
//! - **可回放**：每条事件带仿真时间与 RunId

mod types;

pub use types::{IgnoreReason, Observer, VizEvent, VizEventKind, VizLogger, WindowSide};
