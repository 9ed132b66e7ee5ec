//! # QHA 拟合器
//!
//! 输入一个结构的 [`QhaDataset`]（每个体积点的 E(V) 与声子自由能），
//! 输出温度 -> 体模量的映射，并在工作目录写出 `bulk_modulus-temperature.dat`。
//!
//! - `phonopy`: 调用外部 `phonopy-qha`
//! - `native`: 内置 Birch-Murnaghan 拟合
//!
//! ## 依赖关系
//! - 被 `qha/mod.rs`、`commands/` 使用
//! - 子模块: native, phonopy

pub mod native;
pub mod phonopy;

pub use native::NativeQhaFitter;
pub use phonopy::PhonopyQhaFitter;

use crate::error::Result;
use crate::models::{BulkModulusPoint, QhaDataset};

use clap::ValueEnum;
use std::path::Path;

/// 拟合器接口
pub trait QhaFitter {
    fn name(&self) -> &str;

    /// 拟合数据集；`workdir` 为结构输出目录，数据文件已写入其中
    fn fit(&self, dataset: &QhaDataset, workdir: &Path) -> Result<Vec<BulkModulusPoint>>;
}

/// 命令行中的拟合器类型
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
pub enum FitterKind {
    /// External phonopy-qha
    #[default]
    Phonopy,
    /// Built-in Birch-Murnaghan fit
    Native,
}

impl std::fmt::Display for FitterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FitterKind::Phonopy => write!(f, "phonopy"),
            FitterKind::Native => write!(f, "native"),
        }
    }
}

/// 拟合器配置
#[derive(Debug, Clone, PartialEq)]
pub struct FitConfig {
    pub kind: FitterKind,
    /// phonopy-qha 可执行文件
    pub command: String,
    /// 传给 phonopy-qha 的 `--tmax`
    pub t_max: Option<f64>,
}

impl Default for FitConfig {
    fn default() -> Self {
        FitConfig {
            kind: FitterKind::Phonopy,
            command: "phonopy-qha".to_string(),
            t_max: None,
        }
    }
}

impl FitConfig {
    pub fn build(&self) -> Box<dyn QhaFitter> {
        match self.kind {
            FitterKind::Phonopy => Box::new(PhonopyQhaFitter::new(&self.command, self.t_max)),
            FitterKind::Native => Box::new(NativeQhaFitter::default()),
        }
    }
}
