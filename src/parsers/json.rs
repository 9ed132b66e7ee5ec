//! # JSON 结构解析器
//!
//! 读取 pymatgen `Structure.as_dict()` 格式，也接受外层包裹
//! `{"structure": {...}}` 的条目（如 Materials Project 导出）。
//!
//! ## 依赖关系
//! - 被 `parsers/mod.rs` 使用
//! - 使用 `serde_json` 反序列化

use crate::error::{QhaError, Result};
use crate::models::element::normalize_symbol;
use crate::models::{Atom, Crystal, Lattice};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct PmgLattice {
    matrix: [[f64; 3]; 3],
    #[serde(default)]
    pbc: Option<[bool; 3]>,
}

#[derive(Debug, Deserialize)]
struct PmgSpecies {
    element: String,
}

#[derive(Debug, Deserialize)]
struct PmgSite {
    species: Vec<PmgSpecies>,
    #[serde(default)]
    abc: Option<[f64; 3]>,
    #[serde(default)]
    xyz: Option<[f64; 3]>,
}

#[derive(Debug, Deserialize)]
struct PmgStructure {
    lattice: PmgLattice,
    sites: Vec<PmgSite>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum JsonDocument {
    Structure(PmgStructure),
    Wrapped { structure: PmgStructure },
}

/// 解析 JSON 结构文件
pub fn parse_json_file(path: &Path) -> Result<Crystal> {
    let content = fs::read_to_string(path).map_err(|e| QhaError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_json_content(
        &content,
        path.file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown"),
    )
}

/// 从字符串内容解析 JSON 结构
pub fn parse_json_content(content: &str, default_name: &str) -> Result<Crystal> {
    let err = |reason: String| QhaError::ParseError {
        format: "json".to_string(),
        path: default_name.to_string(),
        reason,
    };

    let doc: JsonDocument = serde_json::from_str(content).map_err(|e| err(e.to_string()))?;
    let structure = match doc {
        JsonDocument::Structure(s) | JsonDocument::Wrapped { structure: s } => s,
    };

    let lattice = Lattice::from_vectors(structure.lattice.matrix);
    let mut atoms = Vec::with_capacity(structure.sites.len());

    for (i, site) in structure.sites.iter().enumerate() {
        // 无序位点取第一个物种
        let raw = site
            .species
            .first()
            .map(|s| s.element.as_str())
            .ok_or_else(|| err(format!("Site {} has no species", i)))?;
        let element = normalize_symbol(raw).ok_or_else(|| QhaError::UnknownElement(raw.to_string()))?;

        let position = match (site.abc, site.xyz) {
            (Some(abc), _) => abc,
            (None, Some(xyz)) => lattice.to_fractional(xyz)?,
            (None, None) => return Err(err(format!("Site {} has neither abc nor xyz", i))),
        };
        atoms.push(Atom::new(element, position));
    }

    let mut crystal = Crystal::new(default_name, lattice, atoms);
    if let Some(pbc) = structure.lattice.pbc {
        crystal.pbc = pbc;
    }
    crystal.source_format = Some("json".to_string());

    Ok(crystal)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SI_JSON: &str = r#"{
        "@module": "pymatgen.core.structure",
        "@class": "Structure",
        "lattice": {"matrix": [[0.0, 2.715, 2.715], [2.715, 0.0, 2.715], [2.715, 2.715, 0.0]],
                    "pbc": [true, true, true]},
        "sites": [
            {"species": [{"element": "Si", "occu": 1}], "abc": [0.0, 0.0, 0.0], "label": "Si"},
            {"species": [{"element": "Si", "occu": 1}], "abc": [0.25, 0.25, 0.25], "label": "Si"}
        ]
    }"#;

    #[test]
    fn test_parse_pymatgen_structure() {
        let crystal = parse_json_content(SI_JSON, "Si").unwrap();
        assert_eq!(crystal.atoms.len(), 2);
        assert_eq!(crystal.atoms[1].position, [0.25, 0.25, 0.25]);
        assert!((crystal.volume() - 2.0 * 2.715f64.powi(3)).abs() < 1e-9);
    }

    #[test]
    fn test_parse_wrapped_entry() {
        let wrapped = format!(r#"{{"material_id": "mp-149", "structure": {}}}"#, SI_JSON);
        let crystal = parse_json_content(&wrapped, "mp-149").unwrap();
        assert_eq!(crystal.formula(), "Si2");
    }

    #[test]
    fn test_cartesian_sites() {
        let content = r#"{"lattice": {"matrix": [[4,0,0],[0,4,0],[0,0,4]]},
                          "sites": [{"species": [{"element": "Cu"}], "xyz": [2.0, 0.0, 1.0]}]}"#;
        let crystal = parse_json_content(content, "Cu").unwrap();
        assert_eq!(crystal.atoms[0].position, [0.5, 0.0, 0.25]);
    }

    #[test]
    fn test_invalid_json() {
        assert!(parse_json_content("{\"sites\": []}", "bad").is_err());
    }
}
