//! # 周期性 Lennard-Jones 对势
//!
//! V(r) = 4ε[(σ/r)¹² - (σ/r)⁶] - V(r_c)，r < r_c
//!
//! 对所有物种使用同一组 (ε, σ)。能量在截断处平移为零，
//! 受力和维里应力解析计算。
//!
//! ## 依赖关系
//! - 被 `forcefield/mod.rs` 构造
//! - 使用 `models/structure.rs` 的晶格工具

use super::{Evaluation, ForceField};
use crate::error::{QhaError, Result};
use crate::models::Crystal;

/// 两原子距离小于该值视为重叠 (Å)
const MIN_DISTANCE: f64 = 1e-6;

#[derive(Debug, Clone)]
pub struct LennardJones {
    epsilon: f64,
    sigma: f64,
    cutoff: f64,
    /// V(r_c)，用于能量平移
    shift: f64,
}

impl LennardJones {
    pub fn new(epsilon: f64, sigma: f64, cutoff: f64) -> Result<Self> {
        if epsilon <= 0.0 || sigma <= 0.0 || cutoff <= 0.0 {
            return Err(QhaError::InvalidArgument(format!(
                "Lennard-Jones parameters must be positive (epsilon={}, sigma={}, cutoff={})",
                epsilon, sigma, cutoff
            )));
        }
        let sr6 = (sigma / cutoff).powi(6);
        Ok(LennardJones {
            epsilon,
            sigma,
            cutoff,
            shift: 4.0 * epsilon * (sr6 * sr6 - sr6),
        })
    }
}

impl ForceField for LennardJones {
    fn name(&self) -> &str {
        "lennard-jones"
    }

    fn evaluate(&mut self, crystal: &Crystal) -> Result<Evaluation> {
        let positions = crystal.cartesian_positions();
        let lattice = &crystal.lattice;
        let volume = lattice.volume();
        if volume < 1e-10 {
            return Err(QhaError::Numerical("Zero volume cell".to_string()));
        }

        let spacings = lattice.plane_spacings();
        let mut ranges = [0i64; 3];
        for k in 0..3 {
            if crystal.pbc[k] {
                ranges[k] = (self.cutoff / spacings[k]).ceil() as i64;
            }
        }

        let rc2 = self.cutoff * self.cutoff;
        let s2 = self.sigma * self.sigma;
        let n = positions.len();
        let m = lattice.matrix;

        let mut energy = 0.0;
        let mut forces = vec![[0.0; 3]; n];
        let mut virial = [[0.0; 3]; 3];

        for l in -ranges[0]..=ranges[0] {
            for mm in -ranges[1]..=ranges[1] {
                for nn in -ranges[2]..=ranges[2] {
                    let shift = [
                        l as f64 * m[0][0] + mm as f64 * m[1][0] + nn as f64 * m[2][0],
                        l as f64 * m[0][1] + mm as f64 * m[1][1] + nn as f64 * m[2][1],
                        l as f64 * m[0][2] + mm as f64 * m[1][2] + nn as f64 * m[2][2],
                    ];
                    let home = l == 0 && mm == 0 && nn == 0;

                    for i in 0..n {
                        for j in 0..n {
                            if home && i == j {
                                continue;
                            }
                            let r = [
                                positions[j][0] + shift[0] - positions[i][0],
                                positions[j][1] + shift[1] - positions[i][1],
                                positions[j][2] + shift[2] - positions[i][2],
                            ];
                            let r2 = r[0] * r[0] + r[1] * r[1] + r[2] * r[2];
                            if r2 > rc2 {
                                continue;
                            }
                            if r2 < MIN_DISTANCE * MIN_DISTANCE {
                                return Err(QhaError::ForceFieldFailed {
                                    name: self.name().to_string(),
                                    reason: format!("Atoms {} and {} overlap", i, j),
                                });
                            }

                            let sr6 = (s2 / r2).powi(3);
                            let sr12 = sr6 * sr6;
                            energy += 0.5 * (4.0 * self.epsilon * (sr12 - sr6) - self.shift);

                            // V'(r)/r
                            let dv_over_r = 4.0 * self.epsilon * (-12.0 * sr12 + 6.0 * sr6) / r2;
                            for a in 0..3 {
                                forces[i][a] += dv_over_r * r[a];
                                for b in 0..3 {
                                    virial[a][b] += 0.5 * dv_over_r * r[a] * r[b];
                                }
                            }
                        }
                    }
                }
            }
        }

        let stress = [
            virial[0][0] / volume,
            virial[1][1] / volume,
            virial[2][2] / volume,
            virial[1][2] / volume,
            virial[0][2] / volume,
            virial[0][1] / volume,
        ];

        Ok(Evaluation {
            energy,
            forces,
            stress,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Atom, Lattice};

    fn argon() -> LennardJones {
        LennardJones::new(0.0104, 3.4, 8.5).unwrap()
    }

    fn fcc_primitive(a: f64) -> Crystal {
        let h = a / 2.0;
        let lattice = Lattice::from_vectors([[0.0, h, h], [h, 0.0, h], [h, h, 0.0]]);
        Crystal::new("Ar", lattice, vec![Atom::new("Ar", [0.0, 0.0, 0.0])])
    }

    fn cubic_pair() -> Crystal {
        let lattice = Lattice::from_vectors([[5.3, 0.0, 0.0], [0.0, 5.3, 0.0], [0.0, 0.0, 5.3]]);
        Crystal::new(
            "Ar2",
            lattice,
            vec![
                Atom::new("Ar", [0.0, 0.0, 0.0]),
                Atom::new("Ar", [0.5, 0.5, 0.0]),
            ],
        )
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(LennardJones::new(0.0, 3.4, 8.5).is_err());
        assert!(LennardJones::new(0.01, -1.0, 8.5).is_err());
    }

    #[test]
    fn test_fcc_is_bound_and_force_free() {
        let mut ff = argon();
        let eval = ff.evaluate(&fcc_primitive(5.26)).unwrap();
        assert!(eval.energy < 0.0);
        assert!(eval.max_force() < 1e-10);
        // 立方对称：对角应力相等，非对角为零
        assert!((eval.stress[0] - eval.stress[1]).abs() < 1e-10);
        assert!(eval.stress[3].abs() < 1e-10);
    }

    #[test]
    fn test_forces_match_energy_gradient() {
        let mut ff = argon();
        let base = cubic_pair();
        let h = 1e-4;

        let mut shifted = |dx: f64| {
            let mut c = base.clone();
            let cart = c.lattice.to_cartesian(c.atoms[1].position);
            c.atoms[1].position = c
                .lattice
                .to_fractional([cart[0] + dx, cart[1] + 0.1, cart[2]])
                .unwrap();
            ff.evaluate(&c).unwrap()
        };

        let e_plus = shifted(h).energy;
        let e_minus = shifted(-h).energy;
        let f = shifted(0.0).forces[1][0];
        let numeric = -(e_plus - e_minus) / (2.0 * h);
        assert!((numeric - f).abs() < 1e-6, "numeric {} analytic {}", numeric, f);
    }

    #[test]
    fn test_stress_matches_volume_derivative() {
        let mut ff = argon();
        let base = fcc_primitive(5.4);
        let eps = 1e-5;

        let e_plus = ff.evaluate(&base.scaled(1.0 + eps)).unwrap().energy;
        let e_minus = ff.evaluate(&base.scaled(1.0 - eps)).unwrap().energy;
        let stress = ff.evaluate(&base).unwrap().stress;

        // dE/dε = V · tr(σ) 对各向同性应变
        let numeric = (e_plus - e_minus) / (2.0 * eps);
        let analytic = base.volume() * (stress[0] + stress[1] + stress[2]);
        assert!((numeric - analytic).abs() < 1e-6 * analytic.abs().max(1e-3));
    }

    #[test]
    fn test_overlapping_atoms_fail() {
        let lattice = Lattice::from_vectors([[5.0, 0.0, 0.0], [0.0, 5.0, 0.0], [0.0, 0.0, 5.0]]);
        let crystal = Crystal::new(
            "bad",
            lattice,
            vec![Atom::new("Ar", [0.1, 0.1, 0.1]), Atom::new("Ar", [0.1, 0.1, 0.1])],
        );
        assert!(argon().evaluate(&crystal).is_err());
    }
}
