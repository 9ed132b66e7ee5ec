//! # 内置 Birch-Murnaghan 拟合器
//!
//! 对每个温度 T：
//!
//! F(V, T) = E(V) + F_ph(V, T)
//!
//! 以 x = V^(-2/3) 为自变量做最小二乘多项式拟合（三阶 Birch-Murnaghan
//! 恰好是 x 的三次多项式；只有 3 个体积点时退化为二阶）。
//! 平衡体积取采样区间内 dF/dx = 0 且 d²F/dx² > 0 的点，体模量
//!
//! B = V d²F/dV² = (4/9) F''(x) V^(-7/3)
//!
//! 平衡体积落在采样区间之外的温度被丢弃。
//!
//! ## 依赖关系
//! - 被 `qha/fitter/mod.rs` 构造
//! - 使用 `nalgebra` 求解最小二乘
//! - 使用 `parsers/qha_files.rs` 写出拟合结果

use super::QhaFitter;
use crate::error::{QhaError, Result};
use crate::forcefield::EV_PER_A3_TO_GPA;
use crate::models::qha::{BULK_MODULUS_FILE, VOLUME_TEMPERATURE_FILE};
use crate::models::{BulkModulusPoint, QhaDataset};
use crate::parsers::qha_files;
use crate::phonon::thermal::EV_TO_KJ_PER_MOL;
use nalgebra::{DMatrix, DVector};
use std::path::Path;

/// 单个温度的拟合结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EquationOfState {
    pub temperature: f64,
    /// 平衡体积 (Å³)
    pub volume: f64,
    /// 平衡自由能 (eV)
    pub free_energy: f64,
    /// 体模量 (GPa)
    pub bulk_modulus: f64,
}

#[derive(Debug, Clone, Default)]
pub struct NativeQhaFitter;

impl NativeQhaFitter {
    /// 逐温度拟合，不写文件
    pub fn fit_curves(&self, dataset: &QhaDataset) -> Result<Vec<EquationOfState>> {
        dataset.validate()?;

        let volumes: Vec<f64> = dataset.records.iter().map(|r| r.point.volume).collect();
        let temperatures = dataset.temperatures();
        let v_lo = volumes.iter().copied().fold(f64::INFINITY, f64::min);
        let v_hi = volumes.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if v_hi - v_lo < 1e-8 {
            return Err(QhaError::FitFailed("All volume points are identical".to_string()));
        }

        let degree = (volumes.len() - 1).min(3);
        let xs: Vec<f64> = volumes.iter().map(|v| v.powf(-2.0 / 3.0)).collect();
        let center = xs.iter().sum::<f64>() / xs.len() as f64;
        let ts: Vec<f64> = xs.iter().map(|x| x - center).collect();
        let t_lo = v_hi.powf(-2.0 / 3.0) - center;
        let t_hi = v_lo.powf(-2.0 / 3.0) - center;

        let mut curves = Vec::with_capacity(temperatures.len());
        for (k, &temperature) in temperatures.iter().enumerate() {
            let energies: Vec<f64> = dataset
                .records
                .iter()
                .map(|r| r.point.energy + r.thermal.points[k].free_energy / EV_TO_KJ_PER_MOL)
                .collect();

            let coeffs = polyfit(&ts, &energies, degree)?;
            let minimum = stationary_points(&coeffs)
                .into_iter()
                .filter(|&t| t >= t_lo && t <= t_hi && polyval_deriv2(&coeffs, t) > 0.0)
                .map(|t| (t, polyval(&coeffs, t)))
                .min_by(|a, b| a.1.total_cmp(&b.1));

            let Some((t0, f0)) = minimum else {
                log::debug!(
                    "T = {} K: equilibrium volume outside [{:.4}, {:.4}], dropped",
                    temperature,
                    v_lo,
                    v_hi
                );
                continue;
            };

            let volume = (t0 + center).powf(-1.5);
            let bulk_modulus = 4.0 / 9.0 * polyval_deriv2(&coeffs, t0) * volume.powf(-7.0 / 3.0)
                * EV_PER_A3_TO_GPA;

            curves.push(EquationOfState {
                temperature,
                volume,
                free_energy: f0,
                bulk_modulus,
            });
        }

        Ok(curves)
    }
}

impl QhaFitter for NativeQhaFitter {
    fn name(&self) -> &str {
        "native"
    }

    fn fit(&self, dataset: &QhaDataset, workdir: &Path) -> Result<Vec<BulkModulusPoint>> {
        let curves = self.fit_curves(dataset)?;
        if curves.is_empty() {
            return Err(QhaError::FitFailed(
                "Equilibrium volume left the sampled range at every temperature".to_string(),
            ));
        }
        log::info!(
            "Native fit: {} of {} temperatures inside the sampled volume range",
            curves.len(),
            dataset.temperatures().len()
        );

        let points: Vec<BulkModulusPoint> = curves
            .iter()
            .map(|c| BulkModulusPoint {
                temperature: c.temperature,
                bulk_modulus: c.bulk_modulus,
            })
            .collect();
        let volumes: Vec<(f64, f64)> = curves.iter().map(|c| (c.temperature, c.volume)).collect();

        qha_files::write_bulk_modulus_file(&workdir.join(BULK_MODULUS_FILE), &points)?;
        qha_files::write_volume_temperature_file(&workdir.join(VOLUME_TEMPERATURE_FILE), &volumes)?;

        Ok(points)
    }
}

/// 最小二乘多项式系数（低次在前）
fn polyfit(x: &[f64], y: &[f64], degree: usize) -> Result<Vec<f64>> {
    let a = DMatrix::from_fn(x.len(), degree + 1, |i, j| x[i].powi(j as i32));
    let b = DVector::from_column_slice(y);
    let solution = a
        .svd(true, true)
        .solve(&b, 1e-14)
        .map_err(|e| QhaError::FitFailed(format!("Least squares failed: {}", e)))?;
    if solution.iter().any(|c| !c.is_finite()) {
        return Err(QhaError::FitFailed("Polynomial fit is not finite".to_string()));
    }
    Ok(solution.iter().copied().collect())
}

fn polyval(c: &[f64], t: f64) -> f64 {
    c.iter().rev().fold(0.0, |acc, &ci| acc * t + ci)
}

fn polyval_deriv2(c: &[f64], t: f64) -> f64 {
    c.iter()
        .enumerate()
        .skip(2)
        .map(|(i, &ci)| (i * (i - 1)) as f64 * ci * t.powi(i as i32 - 2))
        .sum()
}

/// 二次或三次多项式导数为零的实根
fn stationary_points(c: &[f64]) -> Vec<f64> {
    let c1 = c.get(1).copied().unwrap_or(0.0);
    let c2 = c.get(2).copied().unwrap_or(0.0);
    let c3 = c.get(3).copied().unwrap_or(0.0);

    // p'(t) = 3 c3 t² + 2 c2 t + c1
    let (qa, qb, qc) = (3.0 * c3, 2.0 * c2, c1);
    let scale = qa.abs().max(qb.abs()).max(qc.abs());
    if scale == 0.0 {
        return Vec::new();
    }

    if qa.abs() <= 1e-12 * scale {
        if qb == 0.0 {
            return Vec::new();
        }
        return vec![-qc / qb];
    }

    let disc = qb * qb - 4.0 * qa * qc;
    if disc < 0.0 {
        return Vec::new();
    }
    let sqrt_disc = disc.sqrt();
    // 避免相近数相减
    let q = -0.5 * (qb + qb.signum() * sqrt_disc);
    let mut roots = Vec::with_capacity(2);
    if q != 0.0 {
        roots.push(q / qa);
        roots.push(qc / q);
    } else {
        roots.push(0.0);
    }
    roots
}
