//! # 对角超胞构造
//!
//! 超胞原子按"原胞原子优先"排列：超胞原子 `s = p * ncell + c`，
//! 其中 `p` 是原胞原子下标，`c` 是晶胞平移下标（k 变化最快）。
//!
//! ## 依赖关系
//! - 被 `phonon/mod.rs`、`phonon/dynmat.rs` 使用

use crate::error::{QhaError, Result};
use crate::models::{Atom, Crystal};

/// 超胞及其与原胞的映射
#[derive(Debug, Clone)]
pub struct Supercell {
    pub crystal: Crystal,
    pub multiplier: [usize; 3],
    /// 每个超胞原子对应的原胞原子
    pub primitive_index: Vec<usize>,
    /// 每个超胞原子所在的晶胞平移（原胞晶格向量单位）
    pub translations: Vec<[i64; 3]>,
}

impl Supercell {
    pub fn build(primitive: &Crystal, multiplier: [usize; 3]) -> Result<Self> {
        if multiplier.iter().any(|&n| n == 0) {
            return Err(QhaError::InvalidArgument(format!(
                "Supercell multiplier must be positive, got {:?}",
                multiplier
            )));
        }

        let [n1, n2, n3] = multiplier;
        let ncell = n1 * n2 * n3;
        let mut lattice = primitive.lattice.clone();
        for (row, &n) in lattice.matrix.iter_mut().zip(&multiplier) {
            for v in row.iter_mut() {
                *v *= n as f64;
            }
        }

        let natom = primitive.num_atoms() * ncell;
        let mut atoms = Vec::with_capacity(natom);
        let mut primitive_index = Vec::with_capacity(natom);
        let mut translations = Vec::with_capacity(natom);

        for (p, atom) in primitive.atoms.iter().enumerate() {
            for i in 0..n1 {
                for j in 0..n2 {
                    for k in 0..n3 {
                        let t = [i as i64, j as i64, k as i64];
                        let frac = [
                            (atom.position[0] + t[0] as f64) / n1 as f64,
                            (atom.position[1] + t[1] as f64) / n2 as f64,
                            (atom.position[2] + t[2] as f64) / n3 as f64,
                        ];
                        atoms.push(Atom::new(atom.element.clone(), frac));
                        primitive_index.push(p);
                        translations.push(t);
                    }
                }
            }
        }

        let mut crystal = Crystal::new(
            format!("{}_{}x{}x{}", primitive.name, n1, n2, n3),
            lattice,
            atoms,
        );
        crystal.pbc = primitive.pbc;

        Ok(Supercell {
            crystal,
            multiplier,
            primitive_index,
            translations,
        })
    }

    pub fn num_cells(&self) -> usize {
        self.multiplier.iter().product()
    }

    pub fn num_atoms(&self) -> usize {
        self.crystal.num_atoms()
    }

    /// 原胞原子 `p` 在超胞中位于原点晶胞的那个副本
    pub fn home_atom(&self, p: usize) -> usize {
        p * self.num_cells()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Lattice;

    fn rocksalt() -> Crystal {
        let lattice = Lattice::from_vectors([[0.0, 2.8, 2.8], [2.8, 0.0, 2.8], [2.8, 2.8, 0.0]]);
        Crystal::new(
            "NaCl",
            lattice,
            vec![Atom::new("Na", [0.0; 3]), Atom::new("Cl", [0.5, 0.5, 0.5])],
        )
    }

    #[test]
    fn test_supercell_size_and_volume() {
        let prim = rocksalt();
        let sc = Supercell::build(&prim, [2, 3, 1]).unwrap();
        assert_eq!(sc.num_cells(), 6);
        assert_eq!(sc.num_atoms(), 12);
        assert!((sc.crystal.volume() - 6.0 * prim.volume()).abs() < 1e-9);
    }

    #[test]
    fn test_atom_major_ordering() {
        let sc = Supercell::build(&rocksalt(), [2, 2, 2]).unwrap();
        assert_eq!(sc.home_atom(1), 8);
        assert_eq!(sc.primitive_index[7], 0);
        assert_eq!(sc.primitive_index[8], 1);
        assert_eq!(sc.crystal.atoms[8].element, "Cl");
        assert_eq!(sc.translations[1], [0, 0, 1]);

        // 笛卡尔位置 = 原胞位置 + 平移
        let prim = rocksalt();
        let cart = sc.crystal.cartesian_positions();
        let expected = prim.lattice.to_cartesian([1.0, 0.0, 0.0]);
        for k in 0..3 {
            assert!((cart[4][k] - expected[k]).abs() < 1e-12);
        }
    }

    #[test]
    fn test_zero_multiplier_rejected() {
        assert!(Supercell::build(&rocksalt(), [2, 0, 2]).is_err());
    }
}
