//! # 力场模块
//!
//! 给定结构，返回势能、原子受力和应力。QHA 流程只通过
//! [`ForceField`] trait 使用力场，具体实现由 [`ForceFieldConfig`] 构造：
//! - `external`: 通过 JSON 行协议驱动外部机器学习力场（如 MatterSim）
//! - `lennard-jones`: 内置周期性 LJ 对势，确定性，用于测试和快速试算
//!
//! 计算设备在启动时解析一次（[`DeviceChoice::resolve`]），
//! 之后作为显式配置传入，不读取任何全局状态。
//!
//! ## 依赖关系
//! - 被 `qha/pipeline.rs`、`commands/` 使用
//! - 子模块: external, lennard_jones

pub mod external;
pub mod lennard_jones;

pub use external::ExternalForceField;
pub use lennard_jones::LennardJones;

use crate::error::Result;
use crate::models::Crystal;

use clap::ValueEnum;
use std::path::PathBuf;
use std::process::Command;

/// 1 eV/Å³ 对应的 GPa
pub const EV_PER_A3_TO_GPA: f64 = 160.21766208;

/// 一次力场计算的结果
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// 势能 (eV)
    pub energy: f64,
    /// 每个原子的受力 (eV/Å)
    pub forces: Vec<[f64; 3]>,
    /// Voigt 顺序 xx, yy, zz, yz, xz, xy (eV/Å³)，正值表示拉伸
    pub stress: [f64; 6],
}

impl Evaluation {
    /// 静水压 (GPa)，压缩为正
    pub fn pressure_gpa(&self) -> f64 {
        -(self.stress[0] + self.stress[1] + self.stress[2]) / 3.0 * EV_PER_A3_TO_GPA
    }

    /// 应力 xx 分量 (GPa)
    pub fn stress_xx_gpa(&self) -> f64 {
        self.stress[0] * EV_PER_A3_TO_GPA
    }

    /// 最大原子受力模长 (eV/Å)
    pub fn max_force(&self) -> f64 {
        self.forces
            .iter()
            .map(|f| (f[0] * f[0] + f[1] * f[1] + f[2] * f[2]).sqrt())
            .fold(0.0, f64::max)
    }
}

/// 力场接口
///
/// 实现不要求线程安全；同一结构的全部计算串行调用同一个实例。
pub trait ForceField {
    /// 力场名称（用于日志和错误信息）
    fn name(&self) -> &str;

    /// 计算能量、受力和应力
    fn evaluate(&mut self, crystal: &Crystal) -> Result<Evaluation>;
}

/// 命令行中的设备选项
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
pub enum DeviceChoice {
    Cpu,
    Cuda,
    /// cuda if an NVIDIA GPU is visible, otherwise cpu
    #[default]
    Auto,
}

/// 解析后的计算设备
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Cpu,
    Cuda,
}

impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
            Device::Cuda => write!(f, "cuda"),
        }
    }
}

impl DeviceChoice {
    /// 解析为具体设备；`auto` 通过 `nvidia-smi -L` 探测 GPU
    pub fn resolve(self) -> Device {
        match self {
            DeviceChoice::Cpu => Device::Cpu,
            DeviceChoice::Cuda => Device::Cuda,
            DeviceChoice::Auto => {
                let has_gpu = Command::new("nvidia-smi")
                    .arg("-L")
                    .output()
                    .map(|o| o.status.success() && !o.stdout.is_empty())
                    .unwrap_or(false);
                let device = if has_gpu { Device::Cuda } else { Device::Cpu };
                log::debug!("Auto-detected force field device: {}", device);
                device
            }
        }
    }
}

/// 命令行中的力场类型
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
pub enum ForceFieldKind {
    /// External ML force field bridge (JSON lines over stdin/stdout)
    #[default]
    External,
    /// Built-in periodic Lennard-Jones pair potential
    LennardJones,
}

impl std::fmt::Display for ForceFieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ForceFieldKind::External => write!(f, "external"),
            ForceFieldKind::LennardJones => write!(f, "lennard-jones"),
        }
    }
}

/// 构造力场所需的全部配置
#[derive(Debug, Clone, PartialEq)]
pub struct ForceFieldConfig {
    pub kind: ForceFieldKind,
    pub device: Device,
    /// 外部桥接程序
    pub command: String,
    /// 力场权重文件
    pub checkpoint: Option<PathBuf>,
    /// LJ 参数 (eV, Å, Å)
    pub lj_epsilon: f64,
    pub lj_sigma: f64,
    pub lj_cutoff: f64,
}

impl ForceFieldConfig {
    /// 内置 LJ 力场配置（不需要外部程序）
    pub fn lennard_jones(epsilon: f64, sigma: f64, cutoff: f64) -> Self {
        ForceFieldConfig {
            kind: ForceFieldKind::LennardJones,
            device: Device::Cpu,
            command: String::new(),
            checkpoint: None,
            lj_epsilon: epsilon,
            lj_sigma: sigma,
            lj_cutoff: cutoff,
        }
    }

    /// 构造一个新的力场实例
    pub fn build(&self) -> Result<Box<dyn ForceField>> {
        match self.kind {
            ForceFieldKind::External => Ok(Box::new(ExternalForceField::spawn(
                &self.command,
                self.device,
                self.checkpoint.as_deref(),
            )?)),
            ForceFieldKind::LennardJones => Ok(Box::new(LennardJones::new(
                self.lj_epsilon,
                self.lj_sigma,
                self.lj_cutoff,
            )?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_device_resolution() {
        assert_eq!(DeviceChoice::Cpu.resolve(), Device::Cpu);
        assert_eq!(DeviceChoice::Cuda.resolve(), Device::Cuda);
        assert_eq!(Device::Cuda.to_string(), "cuda");
    }

    #[test]
    fn test_evaluation_derived_quantities() {
        let eval = Evaluation {
            energy: -1.0,
            forces: vec![[3.0, 4.0, 0.0], [0.0, 0.0, 1.0]],
            stress: [-0.01, -0.01, -0.01, 0.0, 0.0, 0.0],
        };
        assert!((eval.pressure_gpa() - 1.6021766208).abs() < 1e-9);
        assert!((eval.stress_xx_gpa() + 1.6021766208).abs() < 1e-9);
        assert!((eval.max_force() - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_build_lennard_jones() {
        let config = ForceFieldConfig::lennard_jones(0.0104, 3.4, 8.5);
        let ff = config.build().unwrap();
        assert_eq!(ff.name(), "lennard-jones");
    }
}
