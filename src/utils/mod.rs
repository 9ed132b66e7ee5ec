//! # 工具函数模块
//!
//! 提供美化输出、进度条与 B(T) 绘图。
//!
//! ## 依赖关系
//! - 被 `commands/`、`batch/`、`qha/` 使用
//! - 子模块: output, plot, progress

pub mod output;
pub mod plot;
pub mod progress;
