//! # 力常数与动力学矩阵
//!
//! 力常数由中心差分得到：
//!
//! Φ_αβ(p, s) = -[F_sβ(u_pα = +d) - F_sβ(u_pα = -d)] / 2d
//!
//! 之后对自身项施加平移声学求和规则 Σ_s Φ(p, s) = 0。
//!
//! 动力学矩阵
//!
//! D_pα,p'β(q) = Σ_{s→p'} Φ_αβ(p, s) / √(m_p m_p') · ⟨exp(2πi q·r_ps)⟩
//!
//! 其中 ⟨⟩ 对超胞中距离相同的最近周期像取平均。频率 ν = √λ · 15.633302 THz，
//! 负本征值给出负频率（虚频）。
//!
//! ## 依赖关系
//! - 被 `phonon/mod.rs` 使用
//! - 使用 `nalgebra` 求 Hermitian 本征值

use super::supercell::Supercell;
use super::Displacement;
use crate::error::{QhaError, Result};
use crate::models::structure::norm;
use nalgebra::{Complex, DMatrix};
use std::f64::consts::PI;

/// √(eV / Å² / amu) 对应的频率 (THz)
pub const VASP_TO_THZ: f64 = 15.633302;

/// 判定周期像等距的容差 (Å)
const IMAGE_TOLERANCE: f64 = 1e-4;

/// 原胞原子与超胞原子之间的实空间力常数
#[derive(Debug, Clone)]
pub struct ForceConstants {
    natom_prim: usize,
    natom_super: usize,
    /// 下标 `p * natom_super + s`，单位 eV/Å²
    data: Vec<[[f64; 3]; 3]>,
}

impl ForceConstants {
    /// 从成对的 ±d 位移及其超胞受力构造力常数
    pub fn from_forces(
        supercell: &Supercell,
        natom_prim: usize,
        displacements: &[Displacement],
        forces: &[Vec<[f64; 3]>],
    ) -> Result<Self> {
        let natom_super = supercell.num_atoms();
        let mut data = vec![[[0.0; 3]; 3]; natom_prim * natom_super];
        let mut counts = vec![[0usize; 3]; natom_prim];

        for (disp, f) in displacements.iter().zip(forces) {
            let scale = -disp.sign / (2.0 * disp.amplitude);
            for (s, force) in f.iter().enumerate() {
                let block = &mut data[disp.atom * natom_super + s];
                for b in 0..3 {
                    block[disp.direction][b] += scale * force[b];
                }
            }
            counts[disp.atom][disp.direction] += 1;
        }

        if let Some(p) = counts.iter().position(|c| c.iter().any(|&n| n != 2)) {
            return Err(QhaError::PhononState(format!(
                "Primitive atom {} does not have a +/- displacement pair in every direction",
                p
            )));
        }

        let mut fc = ForceConstants {
            natom_prim,
            natom_super,
            data,
        };
        fc.apply_acoustic_sum_rule(supercell);
        Ok(fc)
    }

    /// Φ(p, home) = -Σ_{s≠home} Φ(p, s)
    fn apply_acoustic_sum_rule(&mut self, supercell: &Supercell) {
        for p in 0..self.natom_prim {
            let home = supercell.home_atom(p);
            let mut sum = [[0.0; 3]; 3];
            for s in (0..self.natom_super).filter(|&s| s != home) {
                let block = self.get(p, s);
                for a in 0..3 {
                    for b in 0..3 {
                        sum[a][b] += block[a][b];
                    }
                }
            }
            let home_block = &mut self.data[p * self.natom_super + home];
            for a in 0..3 {
                for b in 0..3 {
                    home_block[a][b] = -sum[a][b];
                }
            }
        }
    }

    pub fn get(&self, p: usize, s: usize) -> &[[f64; 3]; 3] {
        &self.data[p * self.natom_super + s]
    }
}

/// 动力学矩阵中的一项：原胞原子对 (p, p') 经由超胞原子 s 的贡献
#[derive(Debug, Clone)]
struct Term {
    row: usize,
    col: usize,
    /// Φ(p, s) / √(m_p m_p')
    block: [[f64; 3]; 3],
    /// 等距最近周期像的位置差（原胞分数坐标）
    images: Vec<[f64; 3]>,
}

/// 可在任意 q 点求值的动力学矩阵
#[derive(Debug, Clone)]
pub struct DynamicalMatrix {
    natom_prim: usize,
    terms: Vec<Term>,
}

impl DynamicalMatrix {
    pub fn new(supercell: &Supercell, masses: &[f64], fc: &ForceConstants) -> Result<Self> {
        let natom_prim = masses.len();
        let lattice = &supercell.crystal.lattice;
        let mult = supercell.multiplier;
        let positions: Vec<[f64; 3]> = supercell.crystal.atoms.iter().map(|a| a.position).collect();

        let mut terms = Vec::with_capacity(natom_prim * supercell.num_atoms());
        for p in 0..natom_prim {
            let origin = positions[supercell.home_atom(p)];
            for (s, pos) in positions.iter().enumerate() {
                let p2 = supercell.primitive_index[s];
                let diff = [pos[0] - origin[0], pos[1] - origin[1], pos[2] - origin[2]];
                let images = shortest_images(lattice, diff)
                    .into_iter()
                    .map(|v| {
                        [
                            v[0] * mult[0] as f64,
                            v[1] * mult[1] as f64,
                            v[2] * mult[2] as f64,
                        ]
                    })
                    .collect();

                let weight = 1.0 / (masses[p] * masses[p2]).sqrt();
                let mut block = *fc.get(p, s);
                for row in block.iter_mut() {
                    for v in row.iter_mut() {
                        *v *= weight;
                    }
                }

                terms.push(Term {
                    row: p,
                    col: p2,
                    block,
                    images,
                });
            }
        }

        Ok(DynamicalMatrix { natom_prim, terms })
    }

    /// q 点（原胞倒格子分数坐标）处的 Hermitian 动力学矩阵
    pub fn at(&self, q: [f64; 3]) -> DMatrix<Complex<f64>> {
        let dim = 3 * self.natom_prim;
        let mut d = DMatrix::<Complex<f64>>::zeros(dim, dim);

        for term in &self.terms {
            let mut phase = Complex::new(0.0, 0.0);
            for v in &term.images {
                let arg = 2.0 * PI * (q[0] * v[0] + q[1] * v[1] + q[2] * v[2]);
                phase += Complex::new(arg.cos(), arg.sin());
            }
            phase /= term.images.len() as f64;

            for a in 0..3 {
                for b in 0..3 {
                    d[(3 * term.row + a, 3 * term.col + b)] += phase * term.block[a][b];
                }
            }
        }

        let adjoint = d.adjoint();
        (d + adjoint).map(|z| z * 0.5)
    }

    /// q 点处的频率 (THz)，升序
    pub fn frequencies(&self, q: [f64; 3]) -> Vec<f64> {
        let eigenvalues = self.at(q).symmetric_eigenvalues();
        let mut freqs: Vec<f64> = eigenvalues
            .iter()
            .map(|&lambda| lambda.signum() * lambda.abs().sqrt() * VASP_TO_THZ)
            .collect();
        freqs.sort_by(|a, b| a.total_cmp(b));
        freqs
    }
}

/// 超胞分数坐标差 `diff` 的所有最短周期像
fn shortest_images(lattice: &crate::models::Lattice, diff: [f64; 3]) -> Vec<[f64; 3]> {
    let mut candidates = Vec::with_capacity(125);
    for i in -2..=2 {
        for j in -2..=2 {
            for k in -2..=2 {
                let v = [diff[0] + i as f64, diff[1] + j as f64, diff[2] + k as f64];
                candidates.push((norm(lattice.to_cartesian(v)), v));
            }
        }
    }

    let min = candidates
        .iter()
        .map(|(len, _)| *len)
        .fold(f64::INFINITY, f64::min);

    candidates
        .into_iter()
        .filter(|(len, _)| *len - min < IMAGE_TOLERANCE)
        .map(|(_, v)| v)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Lattice;

    #[test]
    fn test_shortest_images_multiplicity() {
        let lattice = Lattice::from_vectors([[4.0, 0.0, 0.0], [0.0, 4.0, 0.0], [0.0, 0.0, 4.0]]);

        assert_eq!(shortest_images(&lattice, [0.0, 0.0, 0.0]).len(), 1);
        // 恰好位于半个超胞处：两个等距像
        let half = shortest_images(&lattice, [0.5, 0.0, 0.0]);
        assert_eq!(half.len(), 2);
        assert_eq!(shortest_images(&lattice, [0.5, 0.5, 0.5]).len(), 8);

        let wrapped = shortest_images(&lattice, [0.75, 0.0, 0.0]);
        assert_eq!(wrapped.len(), 1);
        assert!((wrapped[0][0] + 0.25).abs() < 1e-12);
    }
}
