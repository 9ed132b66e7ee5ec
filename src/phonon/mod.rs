//! # 声子计算模块
//!
//! 有限位移法计算谐波声子与热力学性质。调用顺序固定：
//!
//! ```text
//! Phonon::new            -> Displaced       （生成位移超胞）
//! set_forces             -> ForcesSet       （逐个超胞由力场计算受力）
//! produce_force_constants-> ForceConstants  （位移数据随即释放）
//! run_mesh               -> Mesh            （Γ 中心 q 点网格）
//! run_thermal_properties -> Thermal
//! ```
//!
//! 提前调用任何一步都返回 [`QhaError::PhononState`]。
//!
//! ## 依赖关系
//! - 被 `qha/pipeline.rs` 使用
//! - 子模块: supercell, dynmat, thermal
//! - 使用 `rayon` 并行对角化 q 点

pub mod dynmat;
pub mod supercell;
pub mod thermal;

pub use dynmat::{DynamicalMatrix, ForceConstants};
pub use supercell::Supercell;

use crate::error::{QhaError, Result};
use crate::models::{Crystal, ThermalPropertyRecord};
use rayon::prelude::*;

/// 声子计算参数
#[derive(Debug, Clone, PartialEq)]
pub struct PhononConfig {
    /// 对角超胞倍数
    pub supercell: [usize; 3],
    /// 位移幅度 (Å)
    pub displacement: f64,
    /// q 点网格
    pub mesh: [usize; 3],
    pub t_min: f64,
    pub t_max: f64,
    pub t_step: f64,
    /// 积分截断频率 (THz)
    pub cutoff_frequency: f64,
}

impl Default for PhononConfig {
    fn default() -> Self {
        PhononConfig {
            supercell: [2, 2, 2],
            displacement: 0.03,
            mesh: [20, 20, 20],
            t_min: 0.0,
            t_max: 1000.0,
            t_step: 10.0,
            cutoff_frequency: thermal::DEFAULT_CUTOFF_FREQUENCY,
        }
    }
}

impl PhononConfig {
    pub fn validate(&self) -> Result<()> {
        if self.supercell.iter().any(|&n| n == 0) {
            return Err(QhaError::InvalidArgument(format!(
                "Supercell multiplier must be positive, got {:?}",
                self.supercell
            )));
        }
        if self.mesh.iter().any(|&n| n == 0) {
            return Err(QhaError::InvalidArgument(format!(
                "q-point mesh must be positive, got {:?}",
                self.mesh
            )));
        }
        if !(self.displacement > 0.0) {
            return Err(QhaError::InvalidArgument(format!(
                "Displacement must be positive, got {}",
                self.displacement
            )));
        }
        self.temperatures().map(|_| ())
    }

    pub fn temperatures(&self) -> Result<Vec<f64>> {
        thermal::temperature_grid(self.t_min, self.t_max, self.t_step)
    }
}

/// 单个有限位移：原胞原子 `atom` 沿笛卡尔方向 `direction` 移动 `sign * amplitude`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Displacement {
    pub atom: usize,
    pub direction: usize,
    /// +1 或 -1
    pub sign: f64,
    pub amplitude: f64,
}

/// 位移超胞及其受力，在力常数构造后释放
#[derive(Debug, Clone, Default)]
pub struct DisplacementSet {
    pub displacements: Vec<Displacement>,
    pub supercells: Vec<Crystal>,
    pub forces: Option<Vec<Vec<[f64; 3]>>>,
}

impl DisplacementSet {
    /// 每个原胞原子沿 x, y, z 各做 ±d 位移
    fn generate(supercell: &Supercell, natom_prim: usize, amplitude: f64) -> Result<Self> {
        let base = &supercell.crystal;
        let cartesian = base.cartesian_positions();
        let mut set = DisplacementSet::default();

        for atom in 0..natom_prim {
            let target = supercell.home_atom(atom);
            for direction in 0..3 {
                for sign in [1.0, -1.0] {
                    let mut cart = cartesian[target];
                    cart[direction] += sign * amplitude;

                    let mut displaced = base.clone();
                    displaced.atoms[target].position = base.lattice.to_fractional(cart)?;

                    set.displacements.push(Displacement {
                        atom,
                        direction,
                        sign,
                        amplitude,
                    });
                    set.supercells.push(displaced);
                }
            }
        }

        Ok(set)
    }

    pub fn len(&self) -> usize {
        self.displacements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.displacements.is_empty()
    }
}

/// 计算阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PhononStage {
    Displaced,
    ForcesSet,
    ForceConstants,
    Mesh,
    Thermal,
}

/// 单个结构的声子计算
#[derive(Debug)]
pub struct Phonon {
    natom: usize,
    masses: Vec<f64>,
    supercell: Supercell,
    dataset: DisplacementSet,
    dynamical_matrix: Option<DynamicalMatrix>,
    mesh_frequencies: Vec<Vec<f64>>,
    thermal: Option<ThermalPropertyRecord>,
    stage: PhononStage,
}

impl Phonon {
    /// 构造超胞并生成全部位移
    pub fn new(primitive: &Crystal, multiplier: [usize; 3], amplitude: f64) -> Result<Self> {
        if !(amplitude > 0.0) {
            return Err(QhaError::InvalidArgument(format!(
                "Displacement must be positive, got {}",
                amplitude
            )));
        }

        let masses = primitive.masses()?;
        let supercell = Supercell::build(primitive, multiplier)?;
        let dataset = DisplacementSet::generate(&supercell, primitive.num_atoms(), amplitude)?;

        log::debug!(
            "{}: {} atoms in {}x{}x{} supercell, {} displacements",
            primitive.name,
            supercell.num_atoms(),
            multiplier[0],
            multiplier[1],
            multiplier[2],
            dataset.len()
        );

        Ok(Phonon {
            natom: primitive.num_atoms(),
            masses,
            supercell,
            dataset,
            dynamical_matrix: None,
            mesh_frequencies: Vec::new(),
            thermal: None,
            stage: PhononStage::Displaced,
        })
    }

    pub fn stage(&self) -> PhononStage {
        self.stage
    }

    pub fn supercell(&self) -> &Supercell {
        &self.supercell
    }

    /// 待计算受力的位移超胞（力常数构造后为空）
    pub fn supercells_with_displacements(&self) -> &[Crystal] {
        &self.dataset.supercells
    }

    /// 按位移顺序提供每个超胞的受力
    pub fn set_forces(&mut self, forces: Vec<Vec<[f64; 3]>>) -> Result<()> {
        if self.stage > PhononStage::ForcesSet {
            return Err(QhaError::PhononState(
                "Forces can only be set before force constants are produced".to_string(),
            ));
        }
        if forces.len() != self.dataset.len() {
            return Err(QhaError::PhononState(format!(
                "Expected forces for {} displaced supercells, got {}",
                self.dataset.len(),
                forces.len()
            )));
        }
        let natom_super = self.supercell.num_atoms();
        if let Some(i) = forces.iter().position(|f| f.len() != natom_super) {
            return Err(QhaError::PhononState(format!(
                "Displaced supercell {} has {} forces, expected {}",
                i,
                forces[i].len(),
                natom_super
            )));
        }

        self.dataset.forces = Some(forces);
        self.stage = PhononStage::ForcesSet;
        Ok(())
    }

    /// 由位移受力构造力常数与动力学矩阵，并释放位移数据
    pub fn produce_force_constants(&mut self) -> Result<()> {
        let forces = match (&self.stage, &self.dataset.forces) {
            (PhononStage::ForcesSet, Some(forces)) => forces,
            _ => {
                return Err(QhaError::PhononState(
                    "set_forces must be called before produce_force_constants".to_string(),
                ))
            }
        };

        let fc = ForceConstants::from_forces(
            &self.supercell,
            self.natom,
            &self.dataset.displacements,
            forces,
        )?;
        self.dynamical_matrix = Some(DynamicalMatrix::new(&self.supercell, &self.masses, &fc)?);
        self.dataset = DisplacementSet::default();
        self.stage = PhononStage::ForceConstants;
        Ok(())
    }

    /// 单个 q 点的频率 (THz)
    pub fn frequencies_at(&self, q: [f64; 3]) -> Result<Vec<f64>> {
        Ok(self.dynamical_matrix()?.frequencies(q))
    }

    /// Γ 中心网格上全部 q 点的频率
    pub fn run_mesh(&mut self, mesh: [usize; 3]) -> Result<()> {
        if mesh.iter().any(|&n| n == 0) {
            return Err(QhaError::InvalidArgument(format!(
                "q-point mesh must be positive, got {:?}",
                mesh
            )));
        }
        let dm = self.dynamical_matrix()?;

        let [n1, n2, n3] = mesh;
        let qpoints: Vec<[f64; 3]> = (0..n1)
            .flat_map(|i| {
                (0..n2).flat_map(move |j| {
                    (0..n3).map(move |k| {
                        [
                            i as f64 / n1 as f64,
                            j as f64 / n2 as f64,
                            k as f64 / n3 as f64,
                        ]
                    })
                })
            })
            .collect();

        let frequencies: Vec<Vec<f64>> = qpoints.par_iter().map(|&q| dm.frequencies(q)).collect();
        log::debug!("Diagonalised {} q-points", frequencies.len());

        self.mesh_frequencies = frequencies;
        self.thermal = None;
        self.stage = PhononStage::Mesh;
        Ok(())
    }

    /// 网格上最低的频率 (THz)，负值表示存在虚频
    pub fn min_mesh_frequency(&self) -> Option<f64> {
        self.mesh_frequencies
            .iter()
            .flatten()
            .copied()
            .reduce(f64::min)
    }

    /// 计算热力学性质，必须先调用 [`Phonon::run_mesh`]
    pub fn run_thermal_properties(
        &mut self,
        t_min: f64,
        t_max: f64,
        t_step: f64,
        cutoff_frequency: f64,
    ) -> Result<&ThermalPropertyRecord> {
        if self.stage < PhononStage::Mesh {
            return Err(QhaError::PhononState(
                "run_mesh must be called before run_thermal_properties".to_string(),
            ));
        }

        let temperatures = thermal::temperature_grid(t_min, t_max, t_step)?;
        let record = thermal::thermal_properties(
            &self.mesh_frequencies,
            self.natom,
            &temperatures,
            cutoff_frequency,
        )?;
        self.stage = PhononStage::Thermal;
        Ok(&*self.thermal.insert(record))
    }

    pub fn thermal_properties(&self) -> Option<&ThermalPropertyRecord> {
        self.thermal.as_ref()
    }

    fn dynamical_matrix(&self) -> Result<&DynamicalMatrix> {
        self.dynamical_matrix.as_ref().ok_or_else(|| {
            QhaError::PhononState(
                "produce_force_constants must be called before mesh sampling".to_string(),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forcefield::{ForceField, LennardJones};
    use crate::models::{Atom, Lattice};

    fn fcc_argon() -> Crystal {
        let h = 5.26 / 2.0;
        let lattice = Lattice::from_vectors([[0.0, h, h], [h, 0.0, h], [h, h, 0.0]]);
        Crystal::new("Ar", lattice, vec![Atom::new("Ar", [0.0, 0.0, 0.0])])
    }

    fn phonon_with_forces() -> Phonon {
        let mut ff = LennardJones::new(0.0104, 3.4, 8.5).unwrap();
        let mut phonon = Phonon::new(&fcc_argon(), [2, 2, 2], 0.01).unwrap();
        let forces = phonon
            .supercells_with_displacements()
            .iter()
            .map(|sc| ff.evaluate(sc).map(|e| e.forces))
            .collect::<Result<Vec<_>>>()
            .unwrap();
        phonon.set_forces(forces).unwrap();
        phonon
    }

    #[test]
    fn test_displacement_generation() {
        let phonon = Phonon::new(&fcc_argon(), [2, 2, 2], 0.03).unwrap();
        assert_eq!(phonon.supercells_with_displacements().len(), 6);
        assert_eq!(phonon.supercell().num_atoms(), 8);

        let moved = &phonon.supercells_with_displacements()[1];
        let cart = moved.cartesian_positions();
        assert!((cart[0][0] + 0.03).abs() < 1e-12);
        assert_eq!(phonon.stage(), PhononStage::Displaced);
    }

    #[test]
    fn test_out_of_order_calls_are_rejected() {
        let mut phonon = Phonon::new(&fcc_argon(), [2, 2, 2], 0.03).unwrap();
        assert!(matches!(
            phonon.produce_force_constants(),
            Err(QhaError::PhononState(_))
        ));
        assert!(matches!(phonon.run_mesh([4, 4, 4]), Err(QhaError::PhononState(_))));
        assert!(matches!(
            phonon.run_thermal_properties(0.0, 100.0, 10.0, 1e-3),
            Err(QhaError::PhononState(_))
        ));
        assert!(matches!(
            phonon.set_forces(vec![vec![[0.0; 3]; 8]]),
            Err(QhaError::PhononState(_))
        ));

        let mut phonon = phonon_with_forces();
        phonon.produce_force_constants().unwrap();
        // 网格之前不能计算热力学性质
        assert!(matches!(
            phonon.run_thermal_properties(0.0, 100.0, 10.0, 1e-3),
            Err(QhaError::PhononState(_))
        ));
        assert!(phonon.supercells_with_displacements().is_empty());
    }

    #[test]
    fn test_acoustic_modes_vanish_at_gamma() {
        let mut phonon = phonon_with_forces();
        phonon.produce_force_constants().unwrap();

        let gamma = phonon.frequencies_at([0.0, 0.0, 0.0]).unwrap();
        assert_eq!(gamma.len(), 3);
        assert!(gamma.iter().all(|f| f.abs() < 1e-3), "{:?}", gamma);

        // 布里渊区边界的频率为实数且有限
        let zone_boundary = phonon.frequencies_at([0.5, 0.5, 0.0]).unwrap();
        assert!(zone_boundary.iter().all(|&f| f > 0.1 && f < 5.0), "{:?}", zone_boundary);
    }

    #[test]
    fn test_heat_capacity_reaches_dulong_petit() {
        let mut phonon = phonon_with_forces();
        phonon.produce_force_constants().unwrap();
        phonon.run_mesh([4, 4, 4]).unwrap();
        assert!(phonon.min_mesh_frequency().unwrap() > -1e-3);

        let record = phonon
            .run_thermal_properties(0.0, 1000.0, 500.0, 1e-3)
            .unwrap()
            .clone();
        assert_eq!(record.points.len(), 3);
        assert_eq!(record.num_modes, 3 * 64);
        // Γ 点的三个声学模式低于截断频率
        assert_eq!(record.num_integrated_modes, 3 * 64 - 3);
        assert_eq!(phonon.stage(), PhononStage::Thermal);

        // 每个参与积分的模式贡献 R，3R = 24.94 J/K/mol
        let expected = 24.943 * record.num_integrated_modes as f64 / record.num_modes as f64;
        let cv = record.points[2].heat_capacity;
        assert!((cv - expected).abs() < 0.1, "cv = {}", cv);
        assert!(record.points[2].free_energy < record.points[0].free_energy);
    }
}
