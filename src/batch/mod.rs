//! # 批量处理模块
//!
//! 提供跨结构的批处理能力。
//!
//! ## 功能
//! - 解析输入（zip 压缩包或目录）
//! - 收集匹配文件列表
//! - 逐结构执行，容忍单个结构失败
//! - 汇总表写出与打印
//!
//! ## 依赖关系
//! - 被 `commands/` 使用
//! - 使用 `zip` 解压、`walkdir`/`glob` 收集文件、`csv`/`tabled` 汇总

pub mod archive;
pub mod collector;
pub mod runner;
pub mod summary;

pub use collector::FileCollector;
pub use runner::{BatchResult, BatchRunner};
