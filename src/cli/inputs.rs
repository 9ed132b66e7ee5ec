//! # inputs 子命令 CLI 定义
//!
//! 为单个结构生成 `e-v.dat` 与 `thermal_properties.yaml-NN`
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/inputs.rs`

use super::options::{FitOpts, ForceFieldOpts, PhononOpts, SamplingOpts};
use clap::Args;
use std::path::PathBuf;

/// inputs 子命令参数
#[derive(Args, Debug)]
pub struct InputsArgs {
    /// Structure file (.cif, .xyz, .json, POSCAR)
    pub structure: PathBuf,

    /// Output directory
    #[arg(default_value = "qha_out")]
    pub outdir: PathBuf,

    /// Run the fitter after generating the inputs
    #[arg(long, default_value_t = false)]
    pub fit: bool,

    /// Temperature at which the bulk modulus is reported (K), with --fit
    #[arg(long, default_value_t = 300.0)]
    pub t_report: f64,

    /// Write bulk_modulus-temperature.png, with --fit
    #[arg(long, default_value_t = false, requires = "fit")]
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
    pub fitter: FitOpts,
}
