//! # QHA 流程模块
//!
//! 体积采样 -> 力场 -> 声子 -> 拟合，处理单个结构。
//! 跨结构的汇总在 `batch/` 中完成。
//!
//! ## 依赖关系
//! - 被 `commands/` 使用
//! - 子模块: sampler, pipeline, fitter

pub mod fitter;
pub mod pipeline;
pub mod sampler;

pub use fitter::{FitConfig, FitterKind, QhaFitter};
pub use pipeline::{load_dataset, prepare_inputs, QhaSettings};
pub use sampler::SamplingConfig;

use crate::error::Result;
use crate::forcefield::ForceFieldConfig;
use crate::models::{BulkModulusPoint, Crystal};
use indicatif::ProgressBar;
use std::path::Path;

/// 对单个结构执行完整的 QHA 流程
///
/// 力场在这里构造一次，所有体积点和位移超胞共用；拟合前释放。
/// 进度条在输入生成结束后清除，拟合阶段由拟合器自行显示进度。
pub fn run_structure(
    crystal: &Crystal,
    outdir: &Path,
    settings: &QhaSettings,
    forcefield: &ForceFieldConfig,
    fitter: &dyn QhaFitter,
    pb: &ProgressBar,
) -> Result<Vec<BulkModulusPoint>> {
    let dataset = {
        let mut ff = forcefield.build()?;
        log::debug!("{}: using force field '{}'", crystal.name, ff.name());
        prepare_inputs(crystal, outdir, settings, ff.as_mut(), pb)?
    };
    pb.finish_and_clear();

    log::debug!("{}: fitting with {}", crystal.name, fitter.name());
    fitter.fit(&dataset, outdir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QhaError;
    use crate::models::{Atom, Lattice, QhaDataset};
    use crate::phonon::PhononConfig;

    fn quick_settings() -> QhaSettings {
        QhaSettings {
            sampling: SamplingConfig {
                n_points: 5,
                strain: 0.06,
            },
            phonon: PhononConfig {
                mesh: [4, 4, 4],
                displacement: 0.01,
                t_max: 30.0,
                t_step: 15.0,
                ..PhononConfig::default()
            },
            save_structures: false,
        }
    }

    fn argon(a: f64) -> Crystal {
        let h = a / 2.0;
        let lattice = Lattice::from_vectors([[0.0, h, h], [h, 0.0, h], [h, h, 0.0]]);
        Crystal::new("Ar", lattice, vec![Atom::new("Ar", [0.0, 0.0, 0.0])])
    }

    struct FailingFitter;

    impl QhaFitter for FailingFitter {
        fn name(&self) -> &str {
            "failing"
        }

        fn fit(&self, _dataset: &QhaDataset, _workdir: &Path) -> Result<Vec<BulkModulusPoint>> {
            Err(QhaError::CommandFailed {
                command: "phonopy-qha".to_string(),
                stderr: "exit status 1".to_string(),
            })
        }
    }

    #[test]
    fn test_lennard_jones_argon_bulk_modulus() {
        let dir = tempfile::tempdir().unwrap();
        let ff = ForceFieldConfig::lennard_jones(0.0104, 3.4, 8.5);
        let fitter = fitter::NativeQhaFitter;

        let points = run_structure(
            &argon(5.30),
            dir.path(),
            &quick_settings(),
            &ff,
            &fitter,
            &ProgressBar::hidden(),
        )
        .unwrap();

        // 0 / 15 / 30 K 的平衡体积都在采样区间内
        assert_eq!(points.len(), 3);
        assert_eq!(points[0].temperature, 0.0);
        assert_eq!(points[2].temperature, 30.0);
        // LJ 氩的体模量为几个 GPa，并随温度降低
        assert!(points[0].bulk_modulus > 1.0 && points[0].bulk_modulus < 10.0);
        assert!(points[2].bulk_modulus < points[0].bulk_modulus);
    }

    #[test]
    fn test_fitter_failure_keeps_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let ff = ForceFieldConfig::lennard_jones(0.0104, 3.4, 8.5);

        let result = run_structure(
            &argon(5.26),
            dir.path(),
            &quick_settings(),
            &ff,
            &FailingFitter,
            &ProgressBar::hidden(),
        );
        assert!(matches!(result, Err(QhaError::CommandFailed { .. })));
        assert!(dir.path().join(crate::models::qha::EV_FILE).is_file());
    }
}
