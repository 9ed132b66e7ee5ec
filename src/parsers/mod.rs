//! # 解析器模块
//!
//! 提供结构文件解析器和 QHA 数据文件读写。
//!
//! ## 依赖关系
//! - 被 `commands/`、`qha/` 使用
//! - 使用 `models/` 数据模型
//! - 子模块: cif, xyz, json, poscar, qha_files

pub mod cif;
pub mod json;
pub mod poscar;
pub mod qha_files;
pub mod xyz;

use crate::error::{QhaError, Result};
use crate::models::Crystal;
use std::path::Path;

/// 从文件路径推断格式并解析
pub fn parse_structure_file(path: &Path) -> Result<Crystal> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_lowercase())
        .unwrap_or_default();

    let crystal = match ext.as_str() {
        "cif" => cif::parse_cif_file(path)?,
        "xyz" | "extxyz" => xyz::parse_xyz_file(path)?,
        "json" => json::parse_json_file(path)?,
        "vasp" | "poscar" => poscar::parse_poscar_file(path)?,
        _ => {
            // POSCAR/CONTCAR 通常没有扩展名
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
            if name.starts_with("POSCAR") || name.starts_with("CONTCAR") {
                poscar::parse_poscar_file(path)?
            } else {
                return Err(QhaError::UnsupportedFormat(format!(
                    "Cannot determine format for: {}",
                    path.display()
                )));
            }
        }
    };

    if crystal.atoms.is_empty() {
        return Err(QhaError::ParseError {
            format: ext,
            path: path.display().to_string(),
            reason: "Structure contains no atoms".to_string(),
        });
    }

    Ok(crystal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_dispatch_by_extension() {
        let dir = tempdir().unwrap();

        let xyz = dir.path().join("si.xyz");
        fs::write(&xyz, "1\nLattice=\"3 0 0 0 3 0 0 0 3\"\nSi 0 0 0\n").unwrap();
        assert_eq!(parse_structure_file(&xyz).unwrap().source_format.as_deref(), Some("xyz"));

        let poscar = dir.path().join("POSCAR_1");
        fs::write(&poscar, "Si\n1.0\n3 0 0\n0 3 0\n0 0 3\nSi\n1\nDirect\n0 0 0\n").unwrap();
        assert_eq!(parse_structure_file(&poscar).unwrap().source_format.as_deref(), Some("poscar"));

        let unknown = dir.path().join("notes.txt");
        fs::write(&unknown, "hello").unwrap();
        assert!(matches!(
            parse_structure_file(&unknown),
            Err(QhaError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_empty_structure_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.json");
        fs::write(&path, r#"{"lattice": {"matrix": [[3,0,0],[0,3,0],[0,0,3]]}, "sites": []}"#).unwrap();
        assert!(parse_structure_file(&path).is_err());
    }
}
