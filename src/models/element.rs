//! # 元素数据表
//!
//! 提供元素符号到标准原子质量 (amu) 的映射，以及 CIF 等格式中
//! 带电荷或编号的元素标签（如 `Fe2+`、`O1`）的规范化。
//!
//! ## 数据来源
//! IUPAC 标准原子量（放射性元素取最稳定同位素质量数）
//!
//! ## 依赖关系
//! - 被 `models/structure.rs`、`parsers/` 使用
//! - 纯静态数据，无外部依赖

use std::collections::HashMap;
use std::sync::LazyLock;

/// (符号, 原子质量) 按原子序数排列
const ELEMENTS: &[(&str, f64)] = &[
    ("H", 1.00794),
    ("He", 4.002602),
    ("Li", 6.941),
    ("Be", 9.012182),
    ("B", 10.811),
    ("C", 12.0107),
    ("N", 14.0067),
    ("O", 15.9994),
    ("F", 18.9984032),
    ("Ne", 20.1797),
    ("Na", 22.98976928),
    ("Mg", 24.305),
    ("Al", 26.9815386),
    ("Si", 28.0855),
    ("P", 30.973762),
    ("S", 32.065),
    ("Cl", 35.453),
    ("Ar", 39.948),
    ("K", 39.0983),
    ("Ca", 40.078),
    ("Sc", 44.955912),
    ("Ti", 47.867),
    ("V", 50.9415),
    ("Cr", 51.9961),
    ("Mn", 54.938045),
    ("Fe", 55.845),
    ("Co", 58.933195),
    ("Ni", 58.6934),
    ("Cu", 63.546),
    ("Zn", 65.38),
    ("Ga", 69.723),
    ("Ge", 72.64),
    ("As", 74.9216),
    ("Se", 78.96),
    ("Br", 79.904),
    ("Kr", 83.798),
    ("Rb", 85.4678),
    ("Sr", 87.62),
    ("Y", 88.90585),
    ("Zr", 91.224),
    ("Nb", 92.90638),
    ("Mo", 95.96),
    ("Tc", 98.0),
    ("Ru", 101.07),
    ("Rh", 102.9055),
    ("Pd", 106.42),
    ("Ag", 107.8682),
    ("Cd", 112.411),
    ("In", 114.818),
    ("Sn", 118.71),
    ("Sb", 121.76),
    ("Te", 127.6),
    ("I", 126.90447),
    ("Xe", 131.293),
    ("Cs", 132.9054519),
    ("Ba", 137.327),
    ("La", 138.90547),
    ("Ce", 140.116),
    ("Pr", 140.90765),
    ("Nd", 144.242),
    ("Pm", 145.0),
    ("Sm", 150.36),
    ("Eu", 151.964),
    ("Gd", 157.25),
    ("Tb", 158.92535),
    ("Dy", 162.5),
    ("Ho", 164.93032),
    ("Er", 167.259),
    ("Tm", 168.93421),
    ("Yb", 173.054),
    ("Lu", 174.9668),
    ("Hf", 178.49),
    ("Ta", 180.94788),
    ("W", 183.84),
    ("Re", 186.207),
    ("Os", 190.23),
    ("Ir", 192.217),
    ("Pt", 195.084),
    ("Au", 196.966569),
    ("Hg", 200.59),
    ("Tl", 204.3833),
    ("Pb", 207.2),
    ("Bi", 208.9804),
    ("Po", 209.0),
    ("At", 210.0),
    ("Rn", 222.0),
    ("Fr", 223.0),
    ("Ra", 226.0),
    ("Ac", 227.0),
    ("Th", 232.03806),
    ("Pa", 231.03588),
    ("U", 238.02891),
    ("Np", 237.0),
    ("Pu", 244.0),
];

/// 元素符号 -> 原子质量
static MASSES: LazyLock<HashMap<&'static str, f64>> =
    LazyLock::new(|| ELEMENTS.iter().copied().collect());

/// 查询原子质量 (amu)
pub fn atomic_mass(symbol: &str) -> Option<f64> {
    MASSES.get(symbol).copied()
}

/// 规范化元素标签
///
/// 取开头的字母部分，首字母大写其余小写，优先匹配两字母元素：
/// `"FE2+"` -> `"Fe"`, `"O1"` -> `"O"`, `"Sr_a"` -> `"Sr"`
pub fn normalize_symbol(raw: &str) -> Option<String> {
    let letters: String = raw
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect();

    if letters.is_empty() {
        return None;
    }

    let mut chars = letters.chars();
    let first = chars.next()?.to_ascii_uppercase();

    if let Some(second) = chars.next() {
        let two = format!("{}{}", first, second.to_ascii_lowercase());
        if MASSES.contains_key(two.as_str()) {
            return Some(two);
        }
    }

    let one = first.to_string();
    if MASSES.contains_key(one.as_str()) {
        Some(one)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atomic_mass_lookup() {
        assert!((atomic_mass("Si").unwrap() - 28.0855).abs() < 1e-6);
        assert!(atomic_mass("Xx").is_none());
    }

    #[test]
    fn test_normalize_symbol() {
        assert_eq!(normalize_symbol("FE2+").as_deref(), Some("Fe"));
        assert_eq!(normalize_symbol("O1").as_deref(), Some("O"));
        assert_eq!(normalize_symbol("O2-").as_deref(), Some("O"));
        assert_eq!(normalize_symbol("Sr_a").as_deref(), Some("Sr"));
        assert_eq!(normalize_symbol("Ca").as_deref(), Some("Ca"));
        assert_eq!(normalize_symbol("123").as_deref(), None);
    }
}
