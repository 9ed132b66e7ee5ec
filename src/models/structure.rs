//! # 晶体结构数据模型
//!
//! 定义统一的晶体结构表示。所有解析器都产出 [`Crystal`]，
//! 体积采样、力场和声子模块都只消费这一种表示。
//!
//! ## 约定
//! - 晶格矩阵按行存放晶格向量 a, b, c（单位 Å）
//! - 原子坐标为分数坐标
//!
//! ## 依赖关系
//! - 被 `parsers/`、`forcefield/`、`phonon/`、`qha/` 使用
//! - 使用 `models/element.rs` 查询原子质量

use crate::error::{QhaError, Result};
use crate::models::element;
use serde::{Deserialize, Serialize};

/// 晶格参数表示
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lattice {
    /// 晶格向量矩阵 (3x3)，行向量表示 a, b, c
    /// [[a1, a2, a3], [b1, b2, b3], [c1, c2, c3]]
    pub matrix: [[f64; 3]; 3],
}

impl Lattice {
    /// 从晶格参数 (a, b, c, alpha, beta, gamma) 创建晶格
    /// 角度单位：度
    pub fn from_parameters(a: f64, b: f64, c: f64, alpha: f64, beta: f64, gamma: f64) -> Self {
        let cos_alpha = alpha.to_radians().cos();
        let cos_beta = beta.to_radians().cos();
        let cos_gamma = gamma.to_radians().cos();
        let sin_gamma = gamma.to_radians().sin();

        let a_vec = [a, 0.0, 0.0];
        let b_vec = [b * cos_gamma, b * sin_gamma, 0.0];

        let c1 = c * cos_beta;
        let c2 = c * (cos_alpha - cos_beta * cos_gamma) / sin_gamma;
        let c3 = (c * c - c1 * c1 - c2 * c2).sqrt();

        Lattice {
            matrix: [a_vec, b_vec, [c1, c2, c3]],
        }
    }

    /// 从晶格向量矩阵创建
    pub fn from_vectors(matrix: [[f64; 3]; 3]) -> Self {
        Lattice { matrix }
    }

    /// 获取晶格参数 (a, b, c, alpha, beta, gamma)
    pub fn parameters(&self) -> (f64, f64, f64, f64, f64, f64) {
        let [a_vec, b_vec, c_vec] = self.matrix;

        let a = norm(a_vec);
        let b = norm(b_vec);
        let c = norm(c_vec);

        let alpha = (dot(b_vec, c_vec) / (b * c)).acos().to_degrees();
        let beta = (dot(a_vec, c_vec) / (a * c)).acos().to_degrees();
        let gamma = (dot(a_vec, b_vec) / (a * b)).acos().to_degrees();

        (a, b, c, alpha, beta, gamma)
    }

    /// 有符号体积（行列式）
    pub fn determinant(&self) -> f64 {
        let [a, b, c] = self.matrix;
        dot(a, cross(b, c))
    }

    /// 晶胞体积 (Å³)
    pub fn volume(&self) -> f64 {
        self.determinant().abs()
    }

    /// 三个晶格向量同时乘以 `factor`
    pub fn scaled(&self, factor: f64) -> Lattice {
        let mut matrix = self.matrix;
        for row in matrix.iter_mut() {
            for v in row.iter_mut() {
                *v *= factor;
            }
        }
        Lattice { matrix }
    }

    /// 分数坐标 -> 笛卡尔坐标
    pub fn to_cartesian(&self, frac: [f64; 3]) -> [f64; 3] {
        let m = self.matrix;
        let mut out = [0.0; 3];
        for (k, o) in out.iter_mut().enumerate() {
            *o = frac[0] * m[0][k] + frac[1] * m[1][k] + frac[2] * m[2][k];
        }
        out
    }

    /// 笛卡尔坐标 -> 分数坐标
    pub fn to_fractional(&self, cart: [f64; 3]) -> Result<[f64; 3]> {
        let inv = self.inverse()?;
        let mut out = [0.0; 3];
        for (i, o) in out.iter_mut().enumerate() {
            *o = cart[0] * inv[0][i] + cart[1] * inv[1][i] + cart[2] * inv[2][i];
        }
        Ok(out)
    }

    /// 晶格矩阵的逆矩阵（满足 M · M⁻¹ = I）
    pub fn inverse(&self) -> Result<[[f64; 3]; 3]> {
        let m = self.matrix;
        let det = self.determinant();
        if det.abs() < 1e-10 {
            return Err(QhaError::Numerical(
                "Singular lattice matrix (zero volume cell)".to_string(),
            ));
        }

        Ok([
            [
                (m[1][1] * m[2][2] - m[1][2] * m[2][1]) / det,
                (m[0][2] * m[2][1] - m[0][1] * m[2][2]) / det,
                (m[0][1] * m[1][2] - m[0][2] * m[1][1]) / det,
            ],
            [
                (m[1][2] * m[2][0] - m[1][0] * m[2][2]) / det,
                (m[0][0] * m[2][2] - m[0][2] * m[2][0]) / det,
                (m[0][2] * m[1][0] - m[0][0] * m[1][2]) / det,
            ],
            [
                (m[1][0] * m[2][1] - m[1][1] * m[2][0]) / det,
                (m[0][1] * m[2][0] - m[0][0] * m[2][1]) / det,
                (m[0][0] * m[1][1] - m[0][1] * m[1][0]) / det,
            ],
        ])
    }

    /// 三组晶面间距 d_i = V / |a_j × a_k|，用于确定截断半径内的周期像数目
    pub fn plane_spacings(&self) -> [f64; 3] {
        let [a, b, c] = self.matrix;
        let v = self.volume();
        [
            v / norm(cross(b, c)),
            v / norm(cross(c, a)),
            v / norm(cross(a, b)),
        ]
    }
}

/// 原子信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Atom {
    /// 元素符号
    pub element: String,

    /// 分数坐标 [x, y, z]
    pub position: [f64; 3],
}

impl Atom {
    pub fn new(element: impl Into<String>, position: [f64; 3]) -> Self {
        Atom {
            element: element.into(),
            position,
        }
    }
}

/// 晶体结构
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Crystal {
    /// 结构名称
    pub name: String,

    /// 晶格
    pub lattice: Lattice,

    /// 原子列表
    pub atoms: Vec<Atom>,

    /// 三个方向上的周期性边界条件
    pub pbc: [bool; 3],

    /// 来源文件格式
    pub source_format: Option<String>,
}

impl Crystal {
    pub fn new(name: impl Into<String>, lattice: Lattice, atoms: Vec<Atom>) -> Self {
        Crystal {
            name: name.into(),
            lattice,
            atoms,
            pbc: [true; 3],
            source_format: None,
        }
    }

    /// 计算化学式
    pub fn formula(&self) -> String {
        use std::collections::BTreeMap;
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();

        for atom in &self.atoms {
            *counts.entry(atom.element.as_str()).or_insert(0) += 1;
        }

        counts
            .into_iter()
            .map(|(el, count)| {
                if count == 1 {
                    el.to_string()
                } else {
                    format!("{}{}", el, count)
                }
            })
            .collect::<Vec<_>>()
            .join("")
    }

    pub fn num_atoms(&self) -> usize {
        self.atoms.len()
    }

    /// 晶胞体积 (Å³)
    pub fn volume(&self) -> f64 {
        self.lattice.volume()
    }

    /// 按线性因子 `factor` 均匀缩放晶胞，原子随晶胞移动（分数坐标不变）
    pub fn scaled(&self, factor: f64) -> Crystal {
        Crystal {
            lattice: self.lattice.scaled(factor),
            ..self.clone()
        }
    }

    /// 所有原子的笛卡尔坐标 (Å)
    pub fn cartesian_positions(&self) -> Vec<[f64; 3]> {
        self.atoms
            .iter()
            .map(|atom| self.lattice.to_cartesian(atom.position))
            .collect()
    }

    /// 元素符号列表
    pub fn symbols(&self) -> Vec<String> {
        self.atoms.iter().map(|a| a.element.clone()).collect()
    }

    /// 原子质量 (amu)，未知元素返回错误
    pub fn masses(&self) -> Result<Vec<f64>> {
        self.atoms
            .iter()
            .map(|atom| {
                element::atomic_mass(&atom.element)
                    .ok_or_else(|| QhaError::UnknownElement(atom.element.clone()))
            })
            .collect()
    }
}

pub(crate) fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

pub(crate) fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

pub(crate) fn norm(a: [f64; 3]) -> f64 {
    dot(a, a).sqrt()
}
