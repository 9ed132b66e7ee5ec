//! # 共享参数组
//!
//! 多个子命令共用的参数，通过 `#[command(flatten)]` 嵌入，
//! 在执行前转换为各模块的配置结构并完成校验。
//!
//! ## 依赖关系
//! - 被 `cli/` 各子命令使用
//! - 转换为 `qha::SamplingConfig`、`phonon::PhononConfig`、
//!   `forcefield::ForceFieldConfig`、`qha::FitConfig`

use crate::error::{QhaError, Result};
use crate::forcefield::{external, DeviceChoice, ForceFieldConfig, ForceFieldKind};
use crate::phonon::PhononConfig;
use crate::qha::{FitConfig, FitterKind, QhaSettings, SamplingConfig};

use clap::Args;
use std::path::PathBuf;

/// 体积采样参数
#[derive(Args, Debug, Clone)]
pub struct SamplingOpts {
    /// Number of volume points (>= 3)
    #[arg(long, default_value_t = 7)]
    pub n_points: usize,

    /// Symmetric volume strain fraction, volumes span V0*(1-s)..V0*(1+s)
    #[arg(long, default_value_t = 0.06)]
    pub strain: f64,
}

impl SamplingOpts {
    pub fn to_config(&self) -> SamplingConfig {
        SamplingConfig {
            n_points: self.n_points,
            strain: self.strain,
        }
    }
}

/// 声子计算参数
#[derive(Args, Debug, Clone)]
pub struct PhononOpts {
    /// Diagonal supercell multiplier
    #[arg(long, num_args = 3, value_names = ["NA", "NB", "NC"], default_values_t = [2, 2, 2])]
    pub supercell: Vec<usize>,

    /// Finite displacement amplitude (Angstrom)
    #[arg(long, default_value_t = 0.03)]
    pub disp: f64,

    /// Minimum temperature (K)
    #[arg(long, default_value_t = 0.0)]
    pub t_min: f64,

    /// Maximum temperature (K)
    #[arg(long, default_value_t = 1000.0)]
    pub t_max: f64,

    /// Temperature step (K)
    #[arg(long, default_value_t = 10.0)]
    pub t_step: f64,

    /// Gamma-centred q-point mesh
    #[arg(long, num_args = 3, value_names = ["QA", "QB", "QC"], default_values_t = [20, 20, 20])]
    pub qmesh: Vec<usize>,
}

impl PhononOpts {
    pub fn to_config(&self) -> Result<PhononConfig> {
        let config = PhononConfig {
            supercell: triple("--supercell", &self.supercell)?,
            displacement: self.disp,
            mesh: triple("--qmesh", &self.qmesh)?,
            t_min: self.t_min,
            t_max: self.t_max,
            t_step: self.t_step,
            ..PhononConfig::default()
        };
        config.validate()?;
        Ok(config)
    }
}

fn triple(flag: &str, values: &[usize]) -> Result<[usize; 3]> {
    match values {
        [a, b, c] => Ok([*a, *b, *c]),
        _ => Err(QhaError::InvalidArgument(format!(
            "{} expects 3 integers, got {}",
            flag,
            values.len()
        ))),
    }
}

/// 力场参数
#[derive(Args, Debug, Clone)]
pub struct ForceFieldOpts {
    /// Force field implementation
    #[arg(long = "forcefield", value_enum, default_value_t = ForceFieldKind::External)]
    pub kind: ForceFieldKind,

    /// Compute device for the external force field
    #[arg(long, value_enum, default_value_t = DeviceChoice::Auto)]
    pub device: DeviceChoice,

    /// Bridge program speaking the JSON-lines protocol
    #[arg(long, env = "QHAKIT_FF_COMMAND", default_value = "mattersim-bridge")]
    pub ff_command: String,

    /// Force field checkpoint (weights) passed to the bridge
    #[arg(long, env = "QHAKIT_CHECKPOINT")]
    pub checkpoint: Option<PathBuf>,

    /// Lennard-Jones well depth (eV)
    #[arg(long, default_value_t = 0.0104)]
    pub lj_epsilon: f64,

    /// Lennard-Jones length scale (Angstrom)
    #[arg(long, default_value_t = 3.40)]
    pub lj_sigma: f64,

    /// Lennard-Jones cutoff radius (Angstrom)
    #[arg(long, default_value_t = 8.5)]
    pub lj_cutoff: f64,
}

impl ForceFieldOpts {
    /// 转换为力场配置；`auto` 设备在这里解析一次
    pub fn to_config(&self) -> Result<ForceFieldConfig> {
        if let Some(path) = &self.checkpoint {
            if !path.exists() {
                return Err(QhaError::FileNotFound {
                    path: path.display().to_string(),
                });
            }
        }

        let config = match self.kind {
            ForceFieldKind::LennardJones => {
                ForceFieldConfig::lennard_jones(self.lj_epsilon, self.lj_sigma, self.lj_cutoff)
            }
            ForceFieldKind::External => {
                if self.ff_command.trim().is_empty() {
                    return Err(QhaError::InvalidArgument(
                        "--ff-command must not be empty".to_string(),
                    ));
                }
                // 缺少桥接程序是环境问题，在处理任何结构之前报错
                let program = external::check_bridge_command(&self.ff_command)?;
                log::debug!("Force field bridge: {}", program.display());
                ForceFieldConfig {
                    kind: ForceFieldKind::External,
                    device: self.device.resolve(),
                    command: self.ff_command.clone(),
                    checkpoint: self.checkpoint.clone(),
                    lj_epsilon: self.lj_epsilon,
                    lj_sigma: self.lj_sigma,
                    lj_cutoff: self.lj_cutoff,
                }
            }
        };
        Ok(config)
    }
}

/// 拟合器参数
#[derive(Args, Debug, Clone)]
pub struct FitOpts {
    /// QHA fitter implementation
    #[arg(long, value_enum, default_value_t = FitterKind::Phonopy)]
    pub fitter: FitterKind,

    /// phonopy-qha executable
    #[arg(long, env = "QHAKIT_QHA_COMMAND", default_value = "phonopy-qha")]
    pub qha_command: String,

    /// Upper temperature passed to phonopy-qha as --tmax
    #[arg(long)]
    pub qha_tmax: Option<f64>,
}

impl FitOpts {
    pub fn to_config(&self) -> FitConfig {
        FitConfig {
            kind: self.fitter,
            command: self.qha_command.clone(),
            t_max: self.qha_tmax,
        }
    }
}

/// 组合采样与声子参数
pub fn qha_settings(
    sampling: &SamplingOpts,
    phonon: &PhononOpts,
    save_structures: bool,
) -> Result<QhaSettings> {
    let settings = QhaSettings {
        sampling: sampling.to_config(),
        phonon: phonon.to_config()?,
        save_structures,
    };
    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phonon_opts() -> PhononOpts {
        PhononOpts {
            supercell: vec![2, 2, 2],
            disp: 0.03,
            t_min: 0.0,
            t_max: 1000.0,
            t_step: 10.0,
            qmesh: vec![20, 20, 20],
        }
    }

    #[test]
    fn test_phonon_opts_to_config() {
        let config = phonon_opts().to_config().unwrap();
        assert_eq!(config, PhononConfig::default());
    }

    #[test]
    fn test_invalid_values_rejected_before_work() {
        let mut opts = phonon_opts();
        opts.t_step = 0.0;
        assert!(matches!(opts.to_config(), Err(QhaError::InvalidArgument(_))));

        let mut opts = phonon_opts();
        opts.qmesh = vec![0, 20, 20];
        assert!(opts.to_config().is_err());

        let sampling = SamplingOpts {
            n_points: 2,
            strain: 0.06,
        };
        assert!(qha_settings(&sampling, &phonon_opts(), false).is_err());

        let sampling = SamplingOpts {
            n_points: 5,
            strain: 1.0,
        };
        assert!(qha_settings(&sampling, &phonon_opts(), false).is_err());
    }

    #[test]
    fn test_lennard_jones_needs_no_bridge() {
        let opts = ForceFieldOpts {
            kind: ForceFieldKind::LennardJones,
            device: DeviceChoice::Cpu,
            ff_command: String::new(),
            checkpoint: None,
            lj_epsilon: 0.0104,
            lj_sigma: 3.4,
            lj_cutoff: 8.5,
        };
        let config = opts.to_config().unwrap();
        assert_eq!(config, ForceFieldConfig::lennard_jones(0.0104, 3.4, 8.5));
        assert!(config.build().is_ok());
    }

    #[test]
    fn test_missing_checkpoint_rejected() {
        let opts = ForceFieldOpts {
            kind: ForceFieldKind::External,
            device: DeviceChoice::Cpu,
            ff_command: "mattersim-bridge".to_string(),
            checkpoint: Some(PathBuf::from("/nonexistent/model.pth")),
            lj_epsilon: 0.0104,
            lj_sigma: 3.4,
            lj_cutoff: 8.5,
        };
        assert!(matches!(opts.to_config(), Err(QhaError::FileNotFound { .. })));
    }

    fn external_opts(ff_command: &str) -> ForceFieldOpts {
        ForceFieldOpts {
            kind: ForceFieldKind::External,
            device: DeviceChoice::Cpu,
            ff_command: ff_command.to_string(),
            checkpoint: None,
            lj_epsilon: 0.0104,
            lj_sigma: 3.4,
            lj_cutoff: 8.5,
        }
    }

    #[test]
    fn test_missing_bridge_fails_before_processing() {
        let result = external_opts("qhakit-no-such-bridge").to_config();
        assert!(matches!(result, Err(QhaError::CommandNotFound { .. })));
    }

    #[test]
    fn test_existing_bridge_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let bridge = dir.path().join("mattersim-bridge");
        std::fs::write(&bridge, "").unwrap();

        let command = format!("{} --model large", bridge.display());
        let config = external_opts(&command).to_config().unwrap();
        assert_eq!(config.kind, ForceFieldKind::External);
        assert_eq!(config.command, command);
    }

    #[test]
    fn test_fit_opts_to_config() {
        let opts = FitOpts {
            fitter: FitterKind::Native,
            qha_command: "phonopy-qha".to_string(),
            qha_tmax: Some(800.0),
        };
        let config = opts.to_config();
        assert_eq!(config.kind, FitterKind::Native);
        assert_eq!(config.t_max, Some(800.0));
    }
}
