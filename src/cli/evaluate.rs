//! # evaluate 子命令 CLI 定义
//!
//! 静态力场评估：单个文件、目录或 zip 压缩包
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/evaluate.rs`

use super::options::ForceFieldOpts;
use clap::Args;
use std::path::PathBuf;

/// evaluate 子命令参数
#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Structure file, directory or zip archive
    pub input: PathBuf,

    /// Comma-separated glob patterns when the input is a directory or archive
    #[arg(long, default_value = "*.cif,*.xyz,*.extxyz,*.json,*.vasp,POSCAR*,CONTCAR*")]
    pub pattern: String,

    /// Write the results to a CSV file
    #[arg(long)]
    pub output_csv: Option<PathBuf>,

    #[command(flatten)]
    pub forcefield: ForceFieldOpts,
}
