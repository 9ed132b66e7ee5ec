//! # qhakit - 准谐近似 (QHA) 批处理工具
//!
//! 对一批晶体结构执行：体积采样 -> 力场评估 -> 有限位移声子 ->
//! 热力学性质 -> QHA 拟合，并汇总指定温度下的体模量。
//!
//! ## 子命令
//! - `batch`    - 压缩包/目录批处理，写出 `summary_bulk_modulus.csv`
//! - `inputs`   - 单个结构的 QHA 输入生成（可选拟合）
//! - `fit`      - 对已有输入目录执行拟合
//! - `evaluate` - 静态力场评估
//!
//! ## 依赖关系
//! ```text
//! main.rs
//!   ├── cli/        (命令行参数定义)
//!   ├── commands/   (命令执行逻辑)
//!   │     ├── batch/      (输入解析、执行器、汇总表)
//!   │     ├── qha/        (体积采样、流程、拟合器)
//!   │     ├── phonon/     (超胞、力常数、热力学性质)
//!   │     ├── forcefield/ (外部桥接、Lennard-Jones)
//!   │     ├── parsers/    (结构与 QHA 数据文件)
//!   │     └── models/     (数据模型)
//!   ├── utils/      (输出、进度条、绘图)
//!   └── error.rs    (错误处理)
//! ```

mod batch;
mod cli;
mod commands;
mod error;
mod forcefield;
mod models;
mod parsers;
mod phonon;
mod qha;
mod utils;

use clap::Parser;
use cli::Cli;

fn main() {
    // Initialize colored output for Windows compatibility
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();

    let threads = if cli.jobs == 0 { num_cpus::get() } else { cli.jobs };
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
    log::debug!("Using {} worker threads for q-point sampling", threads);

    if let Err(e) = commands::run(cli.command) {
        utils::output::print_error(&format!("{}", e));
        std::process::exit(1);
    }
}
