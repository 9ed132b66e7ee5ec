//! # 命令执行模块
//!
//! 实现各子命令的业务逻辑。
//!
//! ## 依赖关系
//! - 被 `main.rs` 调用
//! - 使用 `cli/`, `batch/`, `qha/`, `parsers/`, `utils/`
//! - 子模块: batch, inputs, fit, evaluate

pub mod batch;
pub mod evaluate;
pub mod fit;
pub mod inputs;

use crate::cli::Commands;
use crate::error::Result;

/// 执行命令
pub fn run(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Batch(args) => batch::execute(args),
        Commands::Inputs(args) => inputs::execute(args),
        Commands::Fit(args) => fit::execute(args),
        Commands::Evaluate(args) => evaluate::execute(args),
    }
}
