//! # CIF 格式解析器
//!
//! 解析晶体学信息文件 (Crystallographic Information File)。
//!
//! ## 支持内容
//! ```text
//! data_NaCl
//! _cell_length_a    5.64(1)
//! _cell_length_b    5.64
//! _cell_length_c    5.64
//! _cell_angle_alpha 90
//! _cell_angle_beta  90
//! _cell_angle_gamma 90
//! loop_
//! _symmetry_equiv_pos_as_xyz
//!   'x, y, z'
//!   '-x+1/2, y, -z'
//! loop_
//! _atom_site_label
//! _atom_site_type_symbol
//! _atom_site_fract_x
//! _atom_site_fract_y
//! _atom_site_fract_z
//! Na1 Na 0.0 0.0 0.0
//! ```
//!
//! - 只读取第一个 `data_` 块
//! - 括号中的不确定度（如 `5.431(2)`）会被去掉
//! - 对称操作作用于不对称单元后按周期距离去重
//! - 部分占位按完全占位处理
//!
//! ## 依赖关系
//! - 被 `parsers/mod.rs` 使用
//! - 使用 `models/structure.rs`、`models/element.rs`

use crate::error::{QhaError, Result};
use crate::models::element::normalize_symbol;
use crate::models::{Atom, Crystal, Lattice};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// 去重时的分数坐标容差
const DUPLICATE_TOLERANCE: f64 = 1e-3;

/// 对称操作：frac' = R · frac + t
#[derive(Debug, Clone, PartialEq)]
pub struct SymOp {
    pub rotation: [[f64; 3]; 3],
    pub translation: [f64; 3],
}

impl SymOp {
    pub fn identity() -> Self {
        SymOp {
            rotation: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
            translation: [0.0; 3],
        }
    }

    pub fn apply(&self, frac: [f64; 3]) -> [f64; 3] {
        let mut out = [0.0; 3];
        for (i, o) in out.iter_mut().enumerate() {
            let r = self.rotation[i];
            *o = r[0] * frac[0] + r[1] * frac[1] + r[2] * frac[2] + self.translation[i];
        }
        out
    }
}

/// CIF 文件中的一个 loop_ 块
#[derive(Debug, Default)]
struct CifLoop {
    tags: Vec<String>,
    values: Vec<String>,
}

impl CifLoop {
    fn column(&self, tag: &str) -> Option<usize> {
        self.tags.iter().position(|t| t.eq_ignore_ascii_case(tag))
    }

    fn rows(&self) -> impl Iterator<Item = &[String]> {
        self.values.chunks(self.tags.len().max(1))
    }
}

/// 第一个数据块中的标量项与 loop 块
#[derive(Debug, Default)]
struct CifBlock {
    name: Option<String>,
    items: HashMap<String, String>,
    loops: Vec<CifLoop>,
}

/// 解析 CIF 文件
pub fn parse_cif_file(path: &Path) -> Result<Crystal> {
    let content = fs::read_to_string(path).map_err(|e| QhaError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_cif_content(
        &content,
        path.file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown"),
    )
}

/// 从字符串内容解析 CIF 格式
pub fn parse_cif_content(content: &str, default_name: &str) -> Result<Crystal> {
    let parse_err = |reason: String| QhaError::ParseError {
        format: "cif".to_string(),
        path: default_name.to_string(),
        reason,
    };

    let block = read_first_block(content);

    let cell_value = |tag: &str| -> Result<f64> {
        block
            .items
            .get(tag)
            .and_then(|v| parse_cif_number(v))
            .ok_or_else(|| parse_err(format!("Missing or invalid {}", tag)))
    };

    let lattice = Lattice::from_parameters(
        cell_value("_cell_length_a")?,
        cell_value("_cell_length_b")?,
        cell_value("_cell_length_c")?,
        cell_value("_cell_angle_alpha")?,
        cell_value("_cell_angle_beta")?,
        cell_value("_cell_angle_gamma")?,
    );

    let sites = block
        .loops
        .iter()
        .find(|l| l.column("_atom_site_fract_x").is_some())
        .ok_or_else(|| parse_err("No _atom_site_fract_x loop".to_string()))?;

    let col = |tag: &str| sites.column(tag);
    let (cx, cy, cz) = match (
        col("_atom_site_fract_x"),
        col("_atom_site_fract_y"),
        col("_atom_site_fract_z"),
    ) {
        (Some(x), Some(y), Some(z)) => (x, y, z),
        _ => return Err(parse_err("Incomplete fractional coordinates".to_string())),
    };
    let c_symbol = col("_atom_site_type_symbol");
    let c_label = col("_atom_site_label");

    let mut asym: Vec<Atom> = Vec::new();
    for row in sites.rows() {
        if row.len() < sites.tags.len() {
            return Err(parse_err("Truncated _atom_site loop".to_string()));
        }
        let raw_symbol = c_symbol
            .or(c_label)
            .map(|c| row[c].as_str())
            .ok_or_else(|| parse_err("No _atom_site_type_symbol or _atom_site_label".to_string()))?;
        let element = normalize_symbol(raw_symbol)
            .ok_or_else(|| QhaError::UnknownElement(raw_symbol.to_string()))?;

        let coord = |c: usize| {
            parse_cif_number(&row[c])
                .ok_or_else(|| parse_err(format!("Invalid coordinate '{}'", row[c])))
        };
        asym.push(Atom::new(element, [coord(cx)?, coord(cy)?, coord(cz)?]));
    }

    let ops = symmetry_operations(&block)?;
    let atoms = expand_by_symmetry(&asym, &ops);

    let name = block
        .name
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| default_name.to_string());
    let mut crystal = Crystal::new(name, lattice, atoms);
    crystal.source_format = Some("cif".to_string());

    Ok(crystal)
}

/// 读取第一个数据块
fn read_first_block(content: &str) -> CifBlock {
    let mut block = CifBlock::default();
    let mut seen_data = false;
    let mut lines = content.lines().peekable();

    while let Some(raw) = lines.next() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        // 多行文本字段
        if raw.starts_with(';') {
            for inner in lines.by_ref() {
                if inner.starts_with(';') {
                    break;
                }
            }
            continue;
        }

        let lower = line.to_ascii_lowercase();
        if lower.starts_with("data_") {
            if seen_data {
                break;
            }
            seen_data = true;
            block.name = Some(line[5..].trim().to_string());
            continue;
        }

        if lower == "loop_" {
            let mut lp = CifLoop::default();

            while let Some(next) = lines.peek() {
                let t = next.trim();
                if t.starts_with('_') {
                    lp.tags.push(t.split_whitespace().next().unwrap_or(t).to_string());
                    lines.next();
                } else {
                    break;
                }
            }

            while let Some(next) = lines.peek() {
                let t = next.trim();
                let tl = t.to_ascii_lowercase();
                if t.starts_with('_') || tl == "loop_" || tl.starts_with("data_") {
                    break;
                }
                if next.starts_with(';') {
                    lines.next();
                    for inner in lines.by_ref() {
                        if inner.starts_with(';') {
                            break;
                        }
                    }
                    lp.values.push(String::new());
                    continue;
                }
                if !t.is_empty() && !t.starts_with('#') {
                    lp.values.extend(tokenize(t));
                }
                lines.next();
            }

            block.loops.push(lp);
            continue;
        }

        if line.starts_with('_') {
            let mut tokens = tokenize(line);
            let tag = tokens.remove(0).to_ascii_lowercase();
            let value = if let Some(v) = tokens.into_iter().next() {
                v
            } else {
                // 值位于下一行
                match lines.peek() {
                    Some(next) if !next.trim().starts_with('_') && !next.starts_with(';') => {
                        let v = tokenize(next.trim()).into_iter().next().unwrap_or_default();
                        lines.next();
                        v
                    }
                    _ => String::new(),
                }
            };
            block.items.insert(tag, value);
        }
    }

    block
}

/// 按空白切分，保留单/双引号包裹的值
fn tokenize(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut chars = line.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        if c == '#' {
            break;
        }
        if c == '\'' || c == '"' {
            chars.next();
            let mut tok = String::new();
            while let Some(d) = chars.next() {
                // 引号后必须是空白或行尾才算闭合
                if d == c && chars.peek().map_or(true, |n| n.is_whitespace()) {
                    break;
                }
                tok.push(d);
            }
            tokens.push(tok);
        } else {
            let mut tok = String::new();
            while let Some(&d) = chars.peek() {
                if d.is_whitespace() {
                    break;
                }
                tok.push(d);
                chars.next();
            }
            tokens.push(tok);
        }
    }

    tokens
}

/// 解析 CIF 数值，去掉不确定度括号
pub fn parse_cif_number(raw: &str) -> Option<f64> {
    let trimmed = raw.split('(').next()?.trim();
    if trimmed == "." || trimmed == "?" {
        return None;
    }
    trimmed.parse().ok()
}

/// 读取对称操作；没有对称操作 loop 时返回恒等操作
fn symmetry_operations(block: &CifBlock) -> Result<Vec<SymOp>> {
    const TAGS: [&str; 2] = [
        "_symmetry_equiv_pos_as_xyz",
        "_space_group_symop_operation_xyz",
    ];

    for lp in &block.loops {
        if let Some(c) = TAGS.iter().find_map(|t| lp.column(t)) {
            return lp.rows().map(|row| parse_symop(&row[c])).collect();
        }
    }

    Ok(vec![SymOp::identity()])
}

/// 解析形如 `-x+1/2, y-x, z+0.25` 的对称操作
pub fn parse_symop(text: &str) -> Result<SymOp> {
    let err = || QhaError::ParseError {
        format: "cif".to_string(),
        path: "symmetry operation".to_string(),
        reason: format!("Cannot parse '{}'", text),
    };

    let parts: Vec<&str> = text.split(',').collect();
    if parts.len() != 3 {
        return Err(err());
    }

    let mut op = SymOp {
        rotation: [[0.0; 3]; 3],
        translation: [0.0; 3],
    };

    for (i, part) in parts.iter().enumerate() {
        let expr: String = part
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();
        if expr.is_empty() {
            return Err(err());
        }

        let bytes = expr.as_bytes();
        let mut pos = 0;
        while pos < bytes.len() {
            let mut sign = 1.0;
            while pos < bytes.len() && (bytes[pos] == b'+' || bytes[pos] == b'-') {
                if bytes[pos] == b'-' {
                    sign = -sign;
                }
                pos += 1;
            }
            if pos >= bytes.len() {
                return Err(err());
            }

            // 系数或平移量
            let start = pos;
            while pos < bytes.len() && (bytes[pos].is_ascii_digit() || bytes[pos] == b'.' || bytes[pos] == b'/') {
                pos += 1;
            }
            let number = if pos > start {
                Some(parse_fraction(&expr[start..pos]).ok_or_else(err)?)
            } else {
                None
            };

            if pos < bytes.len() && bytes[pos] == b'*' {
                pos += 1;
            }

            match bytes.get(pos) {
                Some(b'x') | Some(b'y') | Some(b'z') => {
                    let axis = (bytes[pos] - b'x') as usize;
                    op.rotation[i][axis] += sign * number.unwrap_or(1.0);
                    pos += 1;
                }
                _ => match number {
                    Some(n) => op.translation[i] += sign * n,
                    None => return Err(err()),
                },
            }
        }
    }

    Ok(op)
}

fn parse_fraction(s: &str) -> Option<f64> {
    match s.split_once('/') {
        Some((num, den)) => {
            let den: f64 = den.parse().ok()?;
            if den == 0.0 {
                return None;
            }
            Some(num.parse::<f64>().ok()? / den)
        }
        None => s.parse().ok(),
    }
}

/// 对不对称单元作用全部对称操作并去除重复位置
fn expand_by_symmetry(asym: &[Atom], ops: &[SymOp]) -> Vec<Atom> {
    let mut atoms: Vec<Atom> = Vec::with_capacity(asym.len() * ops.len());

    for site in asym {
        for op in ops {
            let mut p = op.apply(site.position);
            for v in p.iter_mut() {
                *v = v.rem_euclid(1.0);
                if (1.0 - *v) < 1e-10 {
                    *v = 0.0;
                }
            }

            let duplicate = atoms.iter().any(|a| {
                a.element == site.element
                    && (0..3).all(|k| {
                        let d = a.position[k] - p[k];
                        (d - d.round()).abs() < DUPLICATE_TOLERANCE
                    })
            });
            if !duplicate {
                atoms.push(Atom::new(site.element.clone(), p));
            }
        }
    }

    atoms
}
