//! # 单结构 QHA 输入生成
//!
//! 对每个体积采样点依次：
//! 1. 静态能量
//! 2. 位移超胞受力 -> 力常数 -> q 点网格 -> 热力学性质
//! 3. 写出 `thermal_properties.yaml-NN`
//!
//! 全部体积点完成后写出 `e-v.dat`。同一结构的所有计算共用调用方传入的
//! 力场实例，严格串行。
//!
//! ## 依赖关系
//! - 被 `qha/mod.rs`、`commands/` 使用
//! - 使用 `qha/sampler.rs`、`phonon/`、`forcefield/`、`parsers/qha_files.rs`

use super::sampler::{sample_volumes, SamplingConfig};
use crate::error::{QhaError, Result};
use crate::forcefield::ForceField;
use crate::models::qha::{thermal_file_name, EV_FILE};
use crate::models::{Crystal, QhaDataset, QhaRecord, VolumePoint};
use crate::parsers::{poscar, qha_files};
use crate::phonon::{Phonon, PhononConfig};
use indicatif::ProgressBar;
use std::fs;
use std::path::Path;

/// 低于该频率 (THz) 的虚频会给出警告
const IMAGINARY_WARNING_THRESHOLD: f64 = -0.1;

/// 单结构 QHA 计算参数
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QhaSettings {
    pub sampling: SamplingConfig,
    pub phonon: PhononConfig,
    /// 额外写出每个体积点的 POSCAR-NN
    pub save_structures: bool,
}

impl QhaSettings {
    pub fn validate(&self) -> Result<()> {
        self.sampling.validate()?;
        self.phonon.validate()
    }
}

/// 生成一个结构的全部 QHA 输入文件
///
/// `pb` 按体积点推进；调用方负责创建和结束进度条。
pub fn prepare_inputs(
    crystal: &Crystal,
    outdir: &Path,
    settings: &QhaSettings,
    forcefield: &mut dyn ForceField,
    pb: &ProgressBar,
) -> Result<QhaDataset> {
    settings.validate()?;
    fs::create_dir_all(outdir).map_err(|e| QhaError::FileWriteError {
        path: outdir.display().to_string(),
        source: e,
    })?;

    let samples = sample_volumes(crystal, &settings.sampling)?;
    let config = &settings.phonon;
    let mut records = Vec::with_capacity(samples.len());

    for sample in &samples {
        let structure = &sample.crystal;
        let energy = forcefield.evaluate(structure)?.energy;
        let volume = structure.volume();
        pb.set_message(format!(
            "[{}/{}] V={:.4} Å^3 E={:.6} eV",
            sample.index + 1,
            samples.len(),
            volume,
            energy
        ));

        let mut phonon = Phonon::new(structure, config.supercell, config.displacement)?;
        let forces = phonon
            .supercells_with_displacements()
            .iter()
            .map(|sc| forcefield.evaluate(sc).map(|e| e.forces))
            .collect::<Result<Vec<_>>>()?;
        phonon.set_forces(forces)?;
        phonon.produce_force_constants()?;
        phonon.run_mesh(config.mesh)?;

        log::debug!(
            "{} at V={:.4}: Γ frequencies {:.4?} THz",
            crystal.name,
            volume,
            phonon.frequencies_at([0.0, 0.0, 0.0])?
        );
        if let Some(min) = phonon.min_mesh_frequency() {
            if min < IMAGINARY_WARNING_THRESHOLD {
                log::warn!(
                    "{} at V={:.4}: imaginary modes down to {:.3} THz",
                    crystal.name,
                    volume,
                    min
                );
            }
        }

        let thermal = phonon
            .run_thermal_properties(config.t_min, config.t_max, config.t_step, config.cutoff_frequency)?
            .clone();

        let thermal_file = thermal_file_name(sample.index);
        qha_files::write_thermal_yaml(&outdir.join(&thermal_file), &thermal)?;
        if settings.save_structures {
            let path = outdir.join(format!("POSCAR-{:02}", sample.index));
            fs::write(&path, poscar::to_poscar_string(structure)).map_err(|e| {
                QhaError::FileWriteError {
                    path: path.display().to_string(),
                    source: e,
                }
            })?;
        }

        log::info!(
            "{} [{}/{}] V={:.4} E={:.6} -> {}",
            crystal.name,
            sample.index + 1,
            samples.len(),
            volume,
            energy,
            thermal_file
        );

        records.push(QhaRecord {
            point: VolumePoint {
                index: sample.index,
                volume,
                energy,
            },
            thermal,
            thermal_file,
        });
        pb.inc(1);
    }

    let dataset = QhaDataset { records };
    qha_files::write_ev_file(&outdir.join(EV_FILE), &dataset.volume_points())?;
    Ok(dataset)
}

/// 从已有目录读取 `e-v.dat` 与对应的 `thermal_properties.yaml-NN`
///
/// 每个体积点都必须有热力学文件，缺失时返回拟合错误。
pub fn load_dataset(dir: &Path) -> Result<QhaDataset> {
    if !dir.is_dir() {
        return Err(QhaError::DirectoryNotFound {
            path: dir.display().to_string(),
        });
    }

    let ev_path = dir.join(EV_FILE);
    if !ev_path.is_file() {
        return Err(QhaError::FileNotFound {
            path: ev_path.display().to_string(),
        });
    }

    let points = qha_files::read_ev_file(&ev_path)?;
    let mut records = Vec::with_capacity(points.len());
    for point in points {
        let thermal_file = thermal_file_name(point.index);
        let path = dir.join(&thermal_file);
        if !path.is_file() {
            return Err(QhaError::FitFailed(format!(
                "Volume point {} has no {}",
                point.index, thermal_file
            )));
        }
        records.push(QhaRecord {
            point,
            thermal: qha_files::read_thermal_yaml(&path)?,
            thermal_file,
        });
    }

    let dataset = QhaDataset { records };
    dataset.validate()?;
    Ok(dataset)
}
