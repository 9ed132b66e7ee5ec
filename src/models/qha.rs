//! # QHA 流程数据模型
//!
//! 体积采样点、热力学性质记录、拟合结果与批处理汇总行。
//!
//! 体积点与热力学记录的配对通过 [`QhaDataset::records`] 的下标显式
//! 表达，文件名只在写盘时由下标生成，从不反向解析。
//!
//! ## 依赖关系
//! - 被 `phonon/`、`qha/`、`parsers/qha_files.rs`、`commands/` 使用

use crate::error::{QhaError, Result};
use serde::{Deserialize, Serialize};

/// 能量-体积数据文件名
pub const EV_FILE: &str = "e-v.dat";
/// 拟合器输出：温度 -> 体模量
pub const BULK_MODULUS_FILE: &str = "bulk_modulus-temperature.dat";
/// 拟合器输出：温度 -> 平衡体积
pub const VOLUME_TEMPERATURE_FILE: &str = "volume-temperature.dat";
/// 批处理汇总表文件名
pub const SUMMARY_FILE: &str = "summary_bulk_modulus.csv";

/// 第 `index` 个体积点的热力学性质文件名（两位补零）
pub fn thermal_file_name(index: usize) -> String {
    format!("thermal_properties.yaml-{:02}", index)
}

/// 单个体积采样点
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumePoint {
    /// 采样序号（与升序缩放因子一致）
    pub index: usize,
    /// 晶胞体积 (Å³)
    pub volume: f64,
    /// 势能 (eV)
    pub energy: f64,
}

/// 单个温度下的声子热力学性质（phonopy 单位）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThermalPoint {
    /// 温度 (K)
    pub temperature: f64,
    /// 亥姆霍兹自由能 (kJ/mol)
    pub free_energy: f64,
    /// 熵 (J/K/mol)
    pub entropy: f64,
    /// 定容热容 (J/K/mol)
    pub heat_capacity: f64,
    /// 内能 (kJ/mol)
    pub energy: f64,
}

/// 一个体积点的完整热力学性质曲线
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThermalPropertyRecord {
    pub natom: usize,
    pub num_modes: usize,
    pub num_integrated_modes: usize,
    /// 截断频率 (THz)
    pub cutoff_frequency: f64,
    /// 零点能 (kJ/mol)
    pub zero_point_energy: f64,
    pub points: Vec<ThermalPoint>,
}

impl ThermalPropertyRecord {
    pub fn temperatures(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.temperature).collect()
    }
}

/// 体积点与其热力学记录的显式配对
#[derive(Debug, Clone, PartialEq)]
pub struct QhaRecord {
    pub point: VolumePoint,
    pub thermal: ThermalPropertyRecord,
    /// 相对于结构输出目录的热力学文件名
    pub thermal_file: String,
}

/// 一个结构的全部 QHA 输入
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QhaDataset {
    pub records: Vec<QhaRecord>,
}

impl QhaDataset {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn volume_points(&self) -> Vec<VolumePoint> {
        self.records.iter().map(|r| r.point).collect()
    }

    /// 公共温度网格（以第一条记录为准）
    pub fn temperatures(&self) -> Vec<f64> {
        self.records
            .first()
            .map(|r| r.thermal.temperatures())
            .unwrap_or_default()
    }

    /// 检查数据集是否满足拟合前提
    ///
    /// - 至少 3 个体积点，且下标与位置一致
    /// - 每条记录都有热力学数据，且温度网格完全相同
    pub fn validate(&self) -> Result<()> {
        if self.records.len() < 3 {
            return Err(QhaError::FitFailed(format!(
                "At least 3 volume points are required, got {}",
                self.records.len()
            )));
        }

        let reference = self.temperatures();
        if reference.is_empty() {
            return Err(QhaError::FitFailed(
                "Thermal property record has no temperatures".to_string(),
            ));
        }

        for (i, record) in self.records.iter().enumerate() {
            if record.point.index != i {
                return Err(QhaError::FitFailed(format!(
                    "Volume point at position {} carries index {}",
                    i, record.point.index
                )));
            }
            let temps = record.thermal.temperatures();
            if temps.len() != reference.len()
                || temps
                    .iter()
                    .zip(&reference)
                    .any(|(a, b)| (a - b).abs() > 1e-6)
            {
                return Err(QhaError::FitFailed(format!(
                    "Temperature grid of '{}' differs from '{}'",
                    record.thermal_file, self.records[0].thermal_file
                )));
            }
        }

        Ok(())
    }
}

/// 拟合结果中的一行：温度与体模量
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BulkModulusPoint {
    /// 温度 (K)
    pub temperature: f64,
    /// 体模量 (GPa)
    pub bulk_modulus: f64,
}

/// 选取温度最接近 `t_report` 的体模量
///
/// 严格小于才替换，距离相同时保留先出现的行。
pub fn nearest_bulk_modulus(points: &[BulkModulusPoint], t_report: f64) -> Option<f64> {
    let mut best: Option<&BulkModulusPoint> = None;
    for p in points {
        let better = match best {
            None => true,
            Some(b) => (p.temperature - t_report).abs() < (b.temperature - t_report).abs(),
        };
        if better {
            best = Some(p);
        }
    }
    best.map(|p| p.bulk_modulus)
}

/// 批处理汇总表中的一行
#[derive(Debug, Clone, PartialEq)]
pub struct BatchSummaryRow {
    pub material: String,
    pub outdir: String,
    pub t_report: f64,
    /// 失败时为 None
    pub bulk_modulus: Option<f64>,
}

impl BatchSummaryRow {
    /// CSV 字段：material, outdir, T_report_K, B_T_GPa
    pub fn to_record(&self) -> [String; 4] {
        [
            self.material.clone(),
            self.outdir.clone(),
            format!("{:?}", self.t_report),
            self.bulk_modulus
                .map(|b| format!("{:.4}", b))
                .unwrap_or_default(),
        ]
    }
}
