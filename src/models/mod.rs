//! # 数据模型模块
//!
//! 定义统一的晶体结构和 QHA 流程数据模型。
//!
//! ## 依赖关系
//! - 被 `parsers/`、`forcefield/`、`phonon/`、`qha/` 和 `commands/` 使用
//! - 子模块: structure, element, qha

pub mod element;
pub mod qha;
pub mod structure;

pub use qha::{
    BatchSummaryRow, BulkModulusPoint, QhaDataset, QhaRecord, ThermalPoint,
    ThermalPropertyRecord, VolumePoint,
};
pub use structure::{Atom, Crystal, Lattice};
