//! # 扩展 XYZ 格式解析器
//!
//! 解析 ASE 风格的 extended XYZ 文件（只读取第一帧）。
//!
//! ## 格式说明
//! ```text
//! 2
//! Lattice="5.43 0 0 0 5.43 0 0 0 5.43" Properties=species:S:1:pos:R:3 pbc="T T T"
//! Si 0.0 0.0 0.0
//! Si 1.3575 1.3575 1.3575
//! ```
//!
//! 坐标为笛卡尔坐标 (Å)。没有 `Lattice=` 的普通 XYZ 不是周期结构，会被拒绝。
//!
//! ## 依赖关系
//! - 被 `parsers/mod.rs` 使用
//! - 使用 `regex` 提取注释行中的键值

use crate::error::{QhaError, Result};
use crate::models::element::normalize_symbol;
use crate::models::{Atom, Crystal, Lattice};
use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

static LATTICE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)lattice\s*=\s*"([^"]*)""#).unwrap());

static PBC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)pbc\s*=\s*"([^"]*)""#).unwrap());

/// 解析 XYZ 文件
pub fn parse_xyz_file(path: &Path) -> Result<Crystal> {
    let content = fs::read_to_string(path).map_err(|e| QhaError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_xyz_content(
        &content,
        path.file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown"),
    )
}

/// 从字符串内容解析扩展 XYZ 格式
pub fn parse_xyz_content(content: &str, default_name: &str) -> Result<Crystal> {
    let err = |reason: String| QhaError::ParseError {
        format: "xyz".to_string(),
        path: default_name.to_string(),
        reason,
    };

    let mut lines = content.lines();
    let natoms: usize = lines
        .next()
        .and_then(|l| l.trim().parse().ok())
        .ok_or_else(|| err("First line must be the atom count".to_string()))?;
    let comment = lines.next().unwrap_or("");

    let lattice_text = LATTICE_RE
        .captures(comment)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .ok_or_else(|| err("Missing Lattice=\"...\" in comment line".to_string()))?;
    let values: Vec<f64> = lattice_text
        .split_whitespace()
        .map(|s| s.parse().map_err(|_| err(format!("Invalid lattice value '{}'", s))))
        .collect::<Result<_>>()?;
    if values.len() != 9 {
        return Err(err(format!("Lattice needs 9 values, got {}", values.len())));
    }
    let lattice = Lattice::from_vectors([
        [values[0], values[1], values[2]],
        [values[3], values[4], values[5]],
        [values[6], values[7], values[8]],
    ]);

    let pbc = match PBC_RE.captures(comment).and_then(|c| c.get(1)) {
        Some(m) => {
            let flags: Vec<bool> = m
                .as_str()
                .split_whitespace()
                .map(|s| matches!(s.to_ascii_uppercase().as_str(), "T" | "TRUE" | "1"))
                .collect();
            if flags.len() == 3 {
                [flags[0], flags[1], flags[2]]
            } else {
                [true; 3]
            }
        }
        None => [true; 3],
    };

    let mut atoms = Vec::with_capacity(natoms);
    for (i, line) in lines.take(natoms).enumerate() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 4 {
            return Err(err(format!("Invalid atom line {}", i + 3)));
        }
        let element =
            normalize_symbol(parts[0]).ok_or_else(|| QhaError::UnknownElement(parts[0].to_string()))?;
        let mut cart = [0.0; 3];
        for k in 0..3 {
            cart[k] = parts[k + 1]
                .parse()
                .map_err(|_| err(format!("Invalid coordinate on line {}", i + 3)))?;
        }
        atoms.push(Atom::new(element, lattice.to_fractional(cart)?));
    }

    if atoms.len() != natoms {
        return Err(err(format!("Expected {} atoms, found {}", natoms, atoms.len())));
    }

    let mut crystal = Crystal::new(default_name, lattice, atoms);
    crystal.pbc = pbc;
    crystal.source_format = Some("xyz".to_string());

    Ok(crystal)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_extxyz() {
        let content = r#"2
Lattice="5.43 0.0 0.0 0.0 5.43 0.0 0.0 0.0 5.43" Properties=species:S:1:pos:R:3 pbc="T T T"
Si 0.0 0.0 0.0
Si 1.3575 1.3575 1.3575
"#;
        let crystal = parse_xyz_content(content, "Si").unwrap();
        assert_eq!(crystal.atoms.len(), 2);
        assert_eq!(crystal.pbc, [true; 3]);
        assert!((crystal.atoms[1].position[0] - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_plain_xyz_rejected() {
        let content = "1\nwater-ish\nO 0 0 0\n";
        assert!(parse_xyz_content(content, "O").is_err());
    }

    #[test]
    fn test_atom_count_mismatch() {
        let content = "3\nLattice=\"3 0 0 0 3 0 0 0 3\"\nFe 0 0 0\n";
        assert!(parse_xyz_content(content, "Fe").is_err());
    }
}
