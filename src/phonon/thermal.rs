//! # 声子热力学性质
//!
//! 谐振子近似下每个模式 (x = hν / k_B T) 的贡献：
//! - F = hν/2 + k_B T ln(1 - e^{-x})
//! - S = -k_B ln(1 - e^{-x}) + (hν/T) / (e^x - 1)
//! - C_v = k_B x² e^x / (e^x - 1)²
//! - E = hν (1/2 + 1 / (e^x - 1))
//!
//! 对 q 点网格求平均，结果为每个原胞的值。F、E 以 kJ/mol 表示，
//! S、C_v 以 J/K/mol 表示，与 phonopy 输出一致。
//!
//! ## 依赖关系
//! - 被 `phonon/mod.rs` 使用
//! - 产出 `models/qha.rs` 的 `ThermalPropertyRecord`

use crate::error::{QhaError, Result};
use crate::models::{ThermalPoint, ThermalPropertyRecord};

/// 1 THz 对应的能量 (eV)
pub const THZ_TO_EV: f64 = 4.135667662e-3;
/// 玻尔兹曼常数 (eV/K)
pub const KB_EV: f64 = 8.617333262e-5;
/// 1 eV 对应的 kJ/mol
pub const EV_TO_KJ_PER_MOL: f64 = 96.48533212;
/// 低于该频率 (THz) 的模式不参与积分
pub const DEFAULT_CUTOFF_FREQUENCY: f64 = 1e-3;

/// 生成 [t_min, t_max] 上步长为 t_step 的温度网格（包含端点）
pub fn temperature_grid(t_min: f64, t_max: f64, t_step: f64) -> Result<Vec<f64>> {
    if !(t_step > 0.0) {
        return Err(QhaError::InvalidArgument(format!(
            "Temperature step must be positive, got {}",
            t_step
        )));
    }
    if t_min < 0.0 || t_max < t_min {
        return Err(QhaError::InvalidArgument(format!(
            "Invalid temperature range [{}, {}]",
            t_min, t_max
        )));
    }

    // 网格不超出 t_max，容差只吸收浮点误差
    let count = ((t_max - t_min) / t_step + 1e-9).floor() as usize + 1;
    Ok((0..count).map(|i| t_min + i as f64 * t_step).collect())
}

/// 单个模式在温度 t 下的 (F, S, Cv, E)，单位 eV 与 eV/K
fn mode_contribution(freq: f64, t: f64) -> (f64, f64, f64, f64) {
    let hv = freq * THZ_TO_EV;
    let zero_point = 0.5 * hv;
    if t <= 0.0 {
        return (zero_point, 0.0, 0.0, zero_point);
    }

    let kt = KB_EV * t;
    let x = hv / kt;
    let boltzmann = (-x).exp();
    // 1 - e^{-x}
    let one_minus = -(-x).exp_m1();
    // 1 / (e^x - 1)
    let occupation = boltzmann / one_minus;

    let free_energy = zero_point + kt * one_minus.ln();
    let entropy = -KB_EV * one_minus.ln() + hv / t * occupation;
    let heat_capacity = KB_EV * x * x * boltzmann / (one_minus * one_minus);
    let energy = hv * (0.5 + occupation);

    (free_energy, entropy, heat_capacity, energy)
}

/// 由网格频率计算热力学性质曲线
///
/// `frequencies` 为每个 q 点的全部频率 (THz)。
pub fn thermal_properties(
    frequencies: &[Vec<f64>],
    natom: usize,
    temperatures: &[f64],
    cutoff_frequency: f64,
) -> Result<ThermalPropertyRecord> {
    if frequencies.is_empty() {
        return Err(QhaError::PhononState(
            "No mesh frequencies available".to_string(),
        ));
    }

    let active: Vec<f64> = frequencies
        .iter()
        .flatten()
        .copied()
        .filter(|&f| f > cutoff_frequency)
        .collect();
    let num_modes: usize = frequencies.iter().map(|f| f.len()).sum();
    let nq = frequencies.len() as f64;

    let points = temperatures
        .iter()
        .map(|&t| {
            let (mut f, mut s, mut cv, mut e) = (0.0, 0.0, 0.0, 0.0);
            for &freq in &active {
                let (df, ds, dcv, de) = mode_contribution(freq, t);
                f += df;
                s += ds;
                cv += dcv;
                e += de;
            }
            ThermalPoint {
                temperature: t,
                free_energy: f / nq * EV_TO_KJ_PER_MOL,
                entropy: s / nq * EV_TO_KJ_PER_MOL * 1000.0,
                heat_capacity: cv / nq * EV_TO_KJ_PER_MOL * 1000.0,
                energy: e / nq * EV_TO_KJ_PER_MOL,
            }
        })
        .collect();

    let zero_point_energy =
        active.iter().map(|f| 0.5 * f * THZ_TO_EV).sum::<f64>() / nq * EV_TO_KJ_PER_MOL;

    Ok(ThermalPropertyRecord {
        natom,
        num_modes,
        num_integrated_modes: active.len(),
        cutoff_frequency,
        zero_point_energy,
        points,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 摩尔气体常数 (J/K/mol)
    const R: f64 = 8.314462618;

    #[test]
    fn test_temperature_grid() {
        let grid = temperature_grid(0.0, 1000.0, 10.0).unwrap();
        assert_eq!(grid.len(), 101);
        assert_eq!(grid[0], 0.0);
        assert!((grid[100] - 1000.0).abs() < 1e-9);

        // 终点不整除时截断在 t_max 之内
        assert_eq!(temperature_grid(0.0, 25.0, 10.0).unwrap(), vec![0.0, 10.0, 20.0]);
        assert_eq!(temperature_grid(0.0, 29.9, 10.0).unwrap().len(), 3);
        assert!(temperature_grid(5.0, 47.0, 7.0)
            .unwrap()
            .iter()
            .all(|&t| t <= 47.0));
        assert_eq!(temperature_grid(0.0, 0.3, 0.1).unwrap().len(), 4);
        assert_eq!(temperature_grid(300.0, 300.0, 10.0).unwrap(), vec![300.0]);

        assert!(temperature_grid(0.0, 100.0, 0.0).is_err());
        assert!(temperature_grid(500.0, 100.0, 10.0).is_err());
    }

    #[test]
    fn test_zero_temperature_limit() {
        let freqs = vec![vec![5.0, 5.0, 5.0]];
        let record = thermal_properties(&freqs, 1, &[0.0], DEFAULT_CUTOFF_FREQUENCY).unwrap();
        let p = record.points[0];
        assert_eq!(p.entropy, 0.0);
        assert_eq!(p.heat_capacity, 0.0);
        assert!((p.free_energy - record.zero_point_energy).abs() < 1e-12);
        let expected_zpe = 1.5 * 5.0 * THZ_TO_EV * EV_TO_KJ_PER_MOL;
        assert!((record.zero_point_energy - expected_zpe).abs() < 1e-9);
    }

    #[test]
    fn test_classical_limit_heat_capacity() {
        // 低频模式在高温下每个模式贡献 k_B
        let freqs = vec![vec![0.5, 0.5, 0.5]];
        let record = thermal_properties(&freqs, 1, &[2000.0], DEFAULT_CUTOFF_FREQUENCY).unwrap();
        let cv = record.points[0].heat_capacity;
        assert!((cv - 3.0 * R).abs() / (3.0 * R) < 1e-3, "cv = {}", cv);
    }

    #[test]
    fn test_thermodynamic_consistency() {
        // F = E - T S
        let freqs = vec![vec![1.0, 2.0, 3.0], vec![1.5, 2.5, 6.0]];
        let record = thermal_properties(&freqs, 1, &[150.0, 600.0], DEFAULT_CUTOFF_FREQUENCY).unwrap();
        for p in &record.points {
            let ts = p.temperature * p.entropy / 1000.0;
            assert!((p.free_energy - (p.energy - ts)).abs() < 1e-9);
        }
    }

    #[test]
    fn test_cutoff_excludes_soft_and_imaginary_modes() {
        let freqs = vec![vec![-0.3, 0.0, 4.0]];
        let record = thermal_properties(&freqs, 1, &[300.0], DEFAULT_CUTOFF_FREQUENCY).unwrap();
        assert_eq!(record.num_modes, 3);
        assert_eq!(record.num_integrated_modes, 1);
        assert!(record.points[0].free_energy.is_finite());
    }

    #[test]
    fn test_very_stiff_mode_is_finite() {
        let freqs = vec![vec![80.0]];
        let record = thermal_properties(&freqs, 1, &[1.0], DEFAULT_CUTOFF_FREQUENCY).unwrap();
        assert!(record.points[0].heat_capacity.abs() < 1e-12);
        assert!(record.points[0].entropy.is_finite());
    }
}
