//! # batch 子命令 CLI 定义
//!
//! 对压缩包或目录中的每个结构执行 QHA 流程并写出汇总表
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/batch.rs`

use super::options::{FitOpts, ForceFieldOpts, PhononOpts, SamplingOpts};
use clap::Args;
use std::path::PathBuf;

/// batch 子命令参数
#[derive(Args, Debug)]
pub struct BatchArgs {
    /// Zip archive (or directory) of structure files
    pub zip_path: PathBuf,

    /// Output root; one subdirectory per structure plus the summary CSV
    pub out_root: PathBuf,

    /// Comma-separated glob patterns for candidate structure files
    #[arg(long, default_value = "*.cif")]
    pub pattern: String,

    /// Temperature at which the bulk modulus is reported (K)
    #[arg(long, default_value_t = 300.0)]
    pub t_report: f64,

    /// Write bulk_modulus-temperature.png for each structure
    #[arg(long, default_value_t = false)]
    pub plot: bool,

    /// Also write POSCAR-NN for every volume point
    #[arg(long, default_value_t = false)]
    pub save_structures: bool,

    #[command(flatten)]
    pub sampling: SamplingOpts,

    #[command(flatten)]
    pub phonon: PhononOpts,

    #[command(flatten)]
    pub forcefield: ForceFieldOpts,

    #[command(flatten)]
    pub fit: FitOpts,
}
