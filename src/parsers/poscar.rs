//! # VASP POSCAR 格式解析器
//!
//! 解析 VASP 5+ 的 POSCAR/CONTCAR 文件，并可写出 POSCAR。
//!
//! ## POSCAR 格式说明
//! ```text
//! Comment line (structure name)
//! 1.0                    # 缩放因子（负数表示目标体积）
//! a1 a2 a3
//! b1 b2 b3
//! c1 c2 c3
//! Element1 Element2 ...  # 元素行（必需，声子计算需要质量）
//! n1 n2 ...
//! Selective dynamics     # 可选
//! Direct/Cartesian
//! x1 y1 z1
//! ...
//! ```
//!
//! ## 依赖关系
//! - 被 `parsers/mod.rs` 使用
//! - 使用 `models/structure.rs`

use crate::error::{QhaError, Result};
use crate::models::element::normalize_symbol;
use crate::models::{Atom, Crystal, Lattice};
use std::fs;
use std::path::Path;

/// 解析 POSCAR/CONTCAR 文件
pub fn parse_poscar_file(path: &Path) -> Result<Crystal> {
    let content = fs::read_to_string(path).map_err(|e| QhaError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_poscar_content(
        &content,
        path.file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown"),
    )
}

/// 从字符串内容解析 POSCAR 格式
pub fn parse_poscar_content(content: &str, default_name: &str) -> Result<Crystal> {
    let err = |reason: &str| QhaError::ParseError {
        format: "poscar".to_string(),
        path: default_name.to_string(),
        reason: reason.to_string(),
    };

    let lines: Vec<&str> = content.lines().collect();
    if lines.len() < 8 {
        return Err(err("File too short"));
    }

    let scale: f64 = lines[1]
        .split_whitespace()
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| err("Invalid scaling factor"))?;

    let mut matrix = [[0.0; 3]; 3];
    for (i, row) in matrix.iter_mut().enumerate() {
        let parts: Vec<f64> = lines[2 + i]
            .split_whitespace()
            .take(3)
            .filter_map(|s| s.parse().ok())
            .collect();
        if parts.len() < 3 {
            return Err(err(&format!("Invalid lattice vector at line {}", 3 + i)));
        }
        *row = [parts[0], parts[1], parts[2]];
    }

    let raw_lattice = Lattice::from_vectors(matrix);
    // 负的缩放因子表示晶胞体积
    let lattice = if scale < 0.0 {
        raw_lattice.scaled((scale.abs() / raw_lattice.volume()).cbrt())
    } else {
        raw_lattice.scaled(scale)
    };

    let symbol_tokens: Vec<&str> = lines[5].split_whitespace().collect();
    if symbol_tokens.is_empty() || symbol_tokens[0].parse::<usize>().is_ok() {
        return Err(err("Element symbol line is required (VASP 5 format)"));
    }
    let elements = symbol_tokens
        .iter()
        .map(|s| normalize_symbol(s).ok_or_else(|| QhaError::UnknownElement(s.to_string())))
        .collect::<Result<Vec<_>>>()?;

    let counts: Vec<usize> = lines[6]
        .split_whitespace()
        .map(|s| s.parse().map_err(|_| err("Invalid atom counts")))
        .collect::<Result<_>>()?;
    if counts.len() != elements.len() {
        return Err(err("Element and count lines differ in length"));
    }

    let mut coord_line = 7;
    if lines[coord_line].trim().to_lowercase().starts_with('s') {
        coord_line += 1;
    }
    let coord_type = lines
        .get(coord_line)
        .ok_or_else(|| err("Missing coordinate type line"))?
        .trim()
        .to_lowercase();
    let is_cartesian = coord_type.starts_with('c') || coord_type.starts_with('k');
    let cart_scale = if scale < 0.0 {
        (lattice.volume() / raw_lattice.volume()).cbrt()
    } else {
        scale
    };

    let mut atoms = Vec::new();
    let mut idx = coord_line + 1;
    for (element, &count) in elements.iter().zip(&counts) {
        for _ in 0..count {
            let parts: Vec<f64> = lines
                .get(idx)
                .ok_or_else(|| err("Fewer positions than atom counts"))?
                .split_whitespace()
                .take(3)
                .filter_map(|s| s.parse().ok())
                .collect();
            if parts.len() < 3 {
                return Err(err(&format!("Invalid position at line {}", idx + 1)));
            }
            let p = [parts[0], parts[1], parts[2]];
            let position = if is_cartesian {
                lattice.to_fractional([p[0] * cart_scale, p[1] * cart_scale, p[2] * cart_scale])?
            } else {
                p
            };
            atoms.push(Atom::new(element.clone(), position));
            idx += 1;
        }
    }

    let name = match lines[0].trim() {
        "" => default_name.to_string(),
        n => n.to_string(),
    };
    let mut crystal = Crystal::new(name, lattice, atoms);
    crystal.source_format = Some("poscar".to_string());

    Ok(crystal)
}

/// 将 Crystal 转换为 POSCAR 格式字符串（元素按首次出现顺序分组）
pub fn to_poscar_string(crystal: &Crystal) -> String {
    let mut order: Vec<&str> = Vec::new();
    for atom in &crystal.atoms {
        if !order.contains(&atom.element.as_str()) {
            order.push(&atom.element);
        }
    }

    let mut result = format!("{}\n1.0\n", crystal.name);
    for row in &crystal.lattice.matrix {
        result.push_str(&format!(
            "  {:16.10}  {:16.10}  {:16.10}\n",
            row[0], row[1], row[2]
        ));
    }

    let counts: Vec<String> = order
        .iter()
        .map(|el| {
            crystal
                .atoms
                .iter()
                .filter(|a| a.element == *el)
                .count()
                .to_string()
        })
        .collect();
    result.push_str(&format!("   {}\n", order.join("   ")));
    result.push_str(&format!("   {}\n", counts.join("   ")));
    result.push_str("Direct\n");

    for el in &order {
        for atom in crystal.atoms.iter().filter(|a| a.element == *el) {
            let p = atom.position;
            result.push_str(&format!("  {:16.10}  {:16.10}  {:16.10}\n", p[0], p[1], p[2]));
        }
    }

    result
}
