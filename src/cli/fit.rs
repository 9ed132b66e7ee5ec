//! # fit 子命令 CLI 定义
//!
//! 对已有的 QHA 输入目录执行拟合
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/fit.rs`

use super::options::FitOpts;
use clap::Args;
use std::path::PathBuf;

/// fit 子命令参数
#[derive(Args, Debug)]
pub struct FitArgs {
    /// Directory containing e-v.dat and thermal_properties.yaml-*
    pub dir: PathBuf,

    /// Temperature at which the bulk modulus is reported (K)
    #[arg(long, default_value_t = 300.0)]
    pub t_report: f64,

    /// Write bulk_modulus-temperature.png into the directory
    #[arg(long, default_value_t = false)]
    pub plot: bool,

    #[command(flatten)]
    pub fit: FitOpts,
}
