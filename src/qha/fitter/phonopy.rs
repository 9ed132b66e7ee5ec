//! # phonopy-qha 拟合器
//!
//! 在结构目录中执行
//!
//! ```text
//! phonopy-qha e-v.dat thermal_properties.yaml-00 ... thermal_properties.yaml-NN
//! ```
//!
//! 文件列表按数据集记录的顺序给出。非零退出码视为拟合失败；
//! 没有生成 `bulk_modulus-temperature.dat` 视为"无结果"。
//! 运行前删除目录中已有的该文件。
//!
//! ## 依赖关系
//! - 被 `qha/fitter/mod.rs` 构造
//! - 使用 `parsers/qha_files.rs` 读取输出
//! - 使用 `utils/progress.rs` 显示 spinner

use super::QhaFitter;
use crate::error::{QhaError, Result};
use crate::models::qha::{BULK_MODULUS_FILE, EV_FILE};
use crate::models::{BulkModulusPoint, QhaDataset};
use crate::parsers::qha_files;
use crate::utils::progress;
use std::path::Path;
use std::process::Command;

#[derive(Debug, Clone)]
pub struct PhonopyQhaFitter {
    command: String,
    t_max: Option<f64>,
}

impl PhonopyQhaFitter {
    pub fn new(command: &str, t_max: Option<f64>) -> Self {
        PhonopyQhaFitter {
            command: command.to_string(),
            t_max,
        }
    }

    /// 传给 phonopy-qha 的参数
    fn arguments(&self, dataset: &QhaDataset) -> Vec<String> {
        let mut args = Vec::with_capacity(dataset.len() + 3);
        if let Some(t_max) = self.t_max {
            args.push("--tmax".to_string());
            args.push(format!("{}", t_max));
        }
        args.push(EV_FILE.to_string());
        args.extend(dataset.records.iter().map(|r| r.thermal_file.clone()));
        args
    }
}

impl QhaFitter for PhonopyQhaFitter {
    fn name(&self) -> &str {
        "phonopy-qha"
    }

    fn fit(&self, dataset: &QhaDataset, workdir: &Path) -> Result<Vec<BulkModulusPoint>> {
        dataset.validate()?;

        let mut parts = self.command.split_whitespace();
        let program = parts.next().ok_or_else(|| {
            QhaError::InvalidArgument("phonopy-qha command is empty".to_string())
        })?;
        let args = self.arguments(dataset);

        // 上一次运行留下的输出不能被当作本次结果
        let output_path = workdir.join(BULK_MODULUS_FILE);
        if output_path.exists() {
            log::debug!("Removing stale {}", output_path.display());
            std::fs::remove_file(&output_path).map_err(|e| QhaError::FileWriteError {
                path: output_path.display().to_string(),
                source: e,
            })?;
        }

        let command_line = format!("{} {}", self.command, args.join(" "));
        log::info!("Running in {}: {}", workdir.display(), command_line);

        let spinner = progress::create_spinner(&format!("Running {}", program));
        let result = Command::new(program)
            .args(parts)
            .args(&args)
            .current_dir(workdir)
            .output();
        spinner.finish_and_clear();

        match result {
            Ok(output) if output.status.success() => {}
            Ok(output) => {
                return Err(QhaError::CommandFailed {
                    command: command_line,
                    stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
                })
            }
            Err(_) => {
                return Err(QhaError::CommandNotFound {
                    command: program.to_string(),
                })
            }
        }

        let points = qha_files::read_bulk_modulus_file(&output_path)?;
        if points.is_none() {
            log::warn!(
                "{} finished but {} was not written in {}",
                program,
                BULK_MODULUS_FILE,
                workdir.display()
            );
        }
        Ok(points.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::qha::thermal_file_name;
    use crate::models::{QhaRecord, ThermalPoint, ThermalPropertyRecord, VolumePoint};
    use std::fs;

    fn dataset() -> QhaDataset {
        let records = (0..3)
            .map(|i| QhaRecord {
                point: VolumePoint {
                    index: i,
                    volume: 38.0 + i as f64 * 2.0,
                    energy: -10.0,
                },
                thermal: ThermalPropertyRecord {
                    natom: 1,
                    num_modes: 3,
                    num_integrated_modes: 3,
                    cutoff_frequency: 1e-3,
                    zero_point_energy: 0.0,
                    points: vec![ThermalPoint {
                        temperature: 0.0,
                        free_energy: 0.0,
                        entropy: 0.0,
                        heat_capacity: 0.0,
                        energy: 0.0,
                    }],
                },
                thermal_file: thermal_file_name(i),
            })
            .collect();
        QhaDataset { records }
    }

    #[test]
    fn test_arguments_follow_record_order() {
        let fitter = PhonopyQhaFitter::new("phonopy-qha", Some(800.0));
        assert_eq!(
            fitter.arguments(&dataset()),
            [
                "--tmax",
                "800",
                "e-v.dat",
                "thermal_properties.yaml-00",
                "thermal_properties.yaml-01",
                "thermal_properties.yaml-02"
            ]
        );
    }

    #[test]
    fn test_missing_program() {
        let dir = tempfile::tempdir().unwrap();
        let fitter = PhonopyQhaFitter::new("qhakit-no-such-phonopy-qha", None);
        assert!(matches!(
            fitter.fit(&dataset(), dir.path()),
            Err(QhaError::CommandNotFound { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit_is_fit_failure() {
        let dir = tempfile::tempdir().unwrap();
        let fitter = PhonopyQhaFitter::new("false", None);
        assert!(matches!(
            fitter.fit(&dataset(), dir.path()),
            Err(QhaError::CommandFailed { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_missing_output_is_no_result() {
        let dir = tempfile::tempdir().unwrap();
        let fitter = PhonopyQhaFitter::new("true", None);
        assert!(fitter.fit(&dataset(), dir.path()).unwrap().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_stale_output_is_not_reused() {
        let dir = tempfile::tempdir().unwrap();
        let stale = dir.path().join(BULK_MODULUS_FILE);
        fs::write(&stale, "0.0 100.0\n300.0 95.5\n").unwrap();

        let fitter = PhonopyQhaFitter::new("true", None);
        assert!(fitter.fit(&dataset(), dir.path()).unwrap().is_empty());
        assert!(!stale.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_fresh_output_is_read() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(BULK_MODULUS_FILE), "0.0 1.0\n").unwrap();

        let script = dir.path().join("fake-phonopy-qha");
        fs::write(
            &script,
            format!(
                "#!/bin/sh\nprintf '0.0 100.0\\n300.0 95.5\\n' > {}\n",
                BULK_MODULUS_FILE
            ),
        )
        .unwrap();

        let fitter = PhonopyQhaFitter::new(&format!("sh {}", script.display()), None);
        let points = fitter.fit(&dataset(), dir.path()).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[1].bulk_modulus, 95.5);
    }
}
