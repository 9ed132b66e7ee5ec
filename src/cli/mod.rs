//! # CLI 模块
//!
//! 使用 `clap` 定义命令行参数和子命令。
//!
//! ## 命令结构
//! - `batch`: 对压缩包/目录中的全部结构执行 QHA 并汇总 B(T_report)
//! - `inputs`: 为单个结构生成 QHA 输入（可选直接拟合）
//! - `fit`: 对已有的 QHA 输入目录执行拟合
//! - `evaluate`: 静态力场评估（能量、压强）
//!
//! ## 依赖关系
//! - 被 `main.rs` 使用
//! - 子模块: options, batch, inputs, fit, evaluate

pub mod batch;
pub mod evaluate;
pub mod fit;
pub mod inputs;
pub mod options;

use clap::{Parser, Subcommand};

/// qhakit - 准谐近似批处理工具
#[derive(Parser)]
#[command(name = "qhakit")]
#[command(version)]
#[command(about = "Batch quasi-harmonic bulk modulus pipeline driven by a force field", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    /// Worker threads for q-point mesh diagonalisation (0 = all cores)
    #[arg(short = 'j', long, global = true, default_value_t = 0)]
    pub jobs: usize,

    #[command(subcommand)]
    pub command: Commands,
}

/// 可用的子命令
#[derive(Subcommand)]
pub enum Commands {
    /// Run the QHA pipeline for every structure in a zip archive or directory
    Batch(batch::BatchArgs),

    /// Generate e-v.dat and thermal_properties.yaml-* for one structure
    Inputs(inputs::InputsArgs),

    /// Fit an existing directory of QHA inputs
    Fit(fit::FitArgs),

    /// Evaluate energy and stress of structures with the force field
    Evaluate(evaluate::EvaluateArgs),
}
