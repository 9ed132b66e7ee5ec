//! # 体积采样
//!
//! 在 [V0(1-s), V0(1+s)] 上等间距取 N 个体积（含端点），
//! 三个晶格向量同乘线性因子 (V/V0)^(1/3)，分数坐标不变。
//! 输出按缩放因子升序排列，下标即下游文件编号。
//!
//! ## 依赖关系
//! - 被 `qha/pipeline.rs` 使用
//! - 使用 `models/structure.rs`

use crate::error::{QhaError, Result};
use crate::models::Crystal;

/// 体积采样参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingConfig {
    /// 体积点数 N (>= 3)
    pub n_points: usize,
    /// 对称体积应变 s，取值 (0, 1)
    pub strain: f64,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        SamplingConfig {
            n_points: 7,
            strain: 0.06,
        }
    }
}

impl SamplingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.n_points < 3 {
            return Err(QhaError::InvalidArgument(format!(
                "At least 3 volume points are required, got {}",
                self.n_points
            )));
        }
        if !(self.strain > 0.0 && self.strain < 1.0) {
            return Err(QhaError::InvalidArgument(format!(
                "Strain must lie in (0, 1), got {}",
                self.strain
            )));
        }
        Ok(())
    }

    /// 体积比 V/V0，升序
    pub fn volume_ratios(&self) -> Vec<f64> {
        let n = self.n_points;
        let lo = 1.0 - self.strain;
        let step = 2.0 * self.strain / (n - 1) as f64;
        (0..n)
            .map(|i| if i == n - 1 { 1.0 + self.strain } else { lo + i as f64 * step })
            .collect()
    }
}

/// 一个体积采样点上的结构
#[derive(Debug, Clone)]
pub struct VolumeSample {
    pub index: usize,
    /// 线性缩放因子
    pub scale: f64,
    pub crystal: Crystal,
}

/// 生成 N 个均匀缩放的结构
pub fn sample_volumes(base: &Crystal, config: &SamplingConfig) -> Result<Vec<VolumeSample>> {
    config.validate()?;
    if base.volume() < 1e-10 {
        return Err(QhaError::Numerical(format!(
            "Structure '{}' has zero volume",
            base.name
        )));
    }

    Ok(config
        .volume_ratios()
        .into_iter()
        .enumerate()
        .map(|(index, ratio)| {
            let scale = ratio.cbrt();
            VolumeSample {
                index,
                scale,
                crystal: base.scaled(scale),
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Atom, Lattice};

    fn triclinic() -> Crystal {
        let lattice = Lattice::from_parameters(3.1, 4.2, 5.3, 80.0, 95.0, 110.0);
        Crystal::new(
            "tri",
            lattice,
            vec![Atom::new("Si", [0.1, 0.2, 0.3]), Atom::new("O", [0.6, 0.5, 0.4])],
        )
    }

    #[test]
    fn test_volumes_are_linearly_spaced() {
        let base = triclinic();
        let v0 = base.volume();

        for n in [3, 4, 7, 11] {
            for s in [0.01, 0.06, 0.3, 0.9] {
                let config = SamplingConfig { n_points: n, strain: s };
                let samples = sample_volumes(&base, &config).unwrap();
                assert_eq!(samples.len(), n);

                for (i, sample) in samples.iter().enumerate() {
                    let expected = v0 * (1.0 - s + 2.0 * s * i as f64 / (n - 1) as f64);
                    assert_eq!(sample.index, i);
                    assert!((sample.crystal.volume() - expected).abs() < 1e-9 * v0);
                }
                assert!((samples[0].crystal.volume() - v0 * (1.0 - s)).abs() < 1e-9 * v0);
                assert!((samples[n - 1].crystal.volume() - v0 * (1.0 + s)).abs() < 1e-9 * v0);
                assert!(samples.windows(2).all(|w| w[0].scale < w[1].scale));
            }
        }
    }

    #[test]
    fn test_fractional_positions_unchanged() {
        let base = triclinic();
        let samples = sample_volumes(&base, &SamplingConfig::default()).unwrap();
        for sample in &samples {
            assert_eq!(sample.crystal.atoms, base.atoms);
        }
        // 奇数点数时中间点就是原始结构
        assert!((samples[3].scale - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_sampling_rejected() {
        let base = triclinic();
        for (n, s) in [(2, 0.06), (0, 0.06), (7, 0.0), (7, 1.0), (7, -0.1), (7, f64::NAN)] {
            let config = SamplingConfig { n_points: n, strain: s };
            assert!(matches!(
                sample_volumes(&base, &config),
                Err(QhaError::InvalidArgument(_))
            ));
        }
    }
}
