//! # QHA 数据文件读写
//!
//! 读写 phonopy-qha 使用的文本文件：
//! - `e-v.dat`：体积-能量表
//! - `thermal_properties.yaml-NN`：每个体积点的声子热力学性质
//! - `bulk_modulus-temperature.dat` / `volume-temperature.dat`：拟合输出
//!
//! 写出的格式与 phonopy 保持一致，外部 `phonopy-qha` 可直接读取。
//!
//! ## 依赖关系
//! - 被 `qha/`、`commands/` 使用
//! - 使用 `models/qha.rs`

use crate::error::{QhaError, Result};
use crate::models::{BulkModulusPoint, ThermalPoint, ThermalPropertyRecord, VolumePoint};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

fn write_text(path: &Path, content: &str) -> Result<()> {
    fs::write(path, content).map_err(|e| QhaError::FileWriteError {
        path: path.display().to_string(),
        source: e,
    })
}

fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| QhaError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })
}

// ─────────────────────────────────────────────────────────────
// e-v.dat
// ─────────────────────────────────────────────────────────────

/// 生成 e-v.dat 内容，行顺序与采样顺序一致
pub fn format_ev_table(points: &[VolumePoint]) -> String {
    let mut s = String::from("# volume(Ang^3)   energy(eV)\n");
    for p in points {
        let _ = writeln!(s, "{:20.10} {:20.10}", p.volume, p.energy);
    }
    s
}

/// 写出 e-v.dat
pub fn write_ev_file(path: &Path, points: &[VolumePoint]) -> Result<()> {
    write_text(path, &format_ev_table(points))
}

/// 读取 e-v.dat，返回带下标的体积点
pub fn read_ev_file(path: &Path) -> Result<Vec<VolumePoint>> {
    let content = read_text(path)?;
    let mut points = Vec::new();

    for (lineno, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let values: Vec<f64> = line
            .split_whitespace()
            .take(2)
            .map(|s| s.parse::<f64>())
            .collect::<std::result::Result<_, _>>()
            .map_err(|_| QhaError::ParseError {
                format: "e-v".to_string(),
                path: path.display().to_string(),
                reason: format!("Invalid number on line {}", lineno + 1),
            })?;
        if values.len() < 2 {
            return Err(QhaError::ParseError {
                format: "e-v".to_string(),
                path: path.display().to_string(),
                reason: format!("Line {} needs volume and energy", lineno + 1),
            });
        }
        points.push(VolumePoint {
            index: points.len(),
            volume: values[0],
            energy: values[1],
        });
    }

    Ok(points)
}

// ─────────────────────────────────────────────────────────────
// thermal_properties.yaml
// ─────────────────────────────────────────────────────────────

/// 生成 phonopy 风格的 thermal_properties.yaml 内容
pub fn format_thermal_yaml(record: &ThermalPropertyRecord) -> String {
    let mut s = String::new();
    let _ = writeln!(s, "# Thermal properties / unit cell (natom)");
    let _ = writeln!(s);
    let _ = writeln!(s, "unit:");
    let _ = writeln!(s, "  temperature:   K");
    let _ = writeln!(s, "  free_energy:   kJ/mol");
    let _ = writeln!(s, "  entropy:       J/K/mol");
    let _ = writeln!(s, "  heat_capacity: J/K/mol");
    let _ = writeln!(s);
    let _ = writeln!(s, "natom: {:5}", record.natom);
    let _ = writeln!(s, "cutoff_frequency: {:8.3}", record.cutoff_frequency);
    let _ = writeln!(s, "num_modes: {}", record.num_modes);
    let _ = writeln!(s, "num_integrated_modes: {}", record.num_integrated_modes);
    let _ = writeln!(s);
    let _ = writeln!(s, "zero_point_energy: {:15.7}", record.zero_point_energy);
    let _ = writeln!(s);
    let _ = writeln!(s, "thermal_properties:");
    for p in &record.points {
        let _ = writeln!(s, "- temperature:   {:15.7}", p.temperature);
        let _ = writeln!(s, "  free_energy:   {:15.7}", p.free_energy);
        let _ = writeln!(s, "  entropy:       {:15.7}", p.entropy);
        let _ = writeln!(s, "  heat_capacity: {:15.7}", p.heat_capacity);
        let _ = writeln!(s, "  energy:        {:15.7}", p.energy);
        let _ = writeln!(s);
    }
    s
}

/// 写出 thermal_properties.yaml
pub fn write_thermal_yaml(path: &Path, record: &ThermalPropertyRecord) -> Result<()> {
    write_text(path, &format_thermal_yaml(record))
}

/// 读取 thermal_properties.yaml（只识别本工具和 phonopy 写出的平铺键值布局）
pub fn read_thermal_yaml(path: &Path) -> Result<ThermalPropertyRecord> {
    parse_thermal_yaml(&read_text(path)?, &path.display().to_string())
}

/// 从字符串内容解析 thermal_properties.yaml
pub fn parse_thermal_yaml(content: &str, source: &str) -> Result<ThermalPropertyRecord> {
    let err = |reason: String| QhaError::ParseError {
        format: "thermal_properties.yaml".to_string(),
        path: source.to_string(),
        reason,
    };

    let mut record = ThermalPropertyRecord {
        natom: 0,
        num_modes: 0,
        num_integrated_modes: 0,
        cutoff_frequency: 0.0,
        zero_point_energy: 0.0,
        points: Vec::new(),
    };
    let mut in_list = false;
    let mut current: Option<ThermalPoint> = None;

    for (lineno, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if line == "thermal_properties:" {
            in_list = true;
            continue;
        }

        let (key, value) = match line.trim_start_matches("- ").split_once(':') {
            Some((k, v)) => (k.trim(), v.trim()),
            None => continue,
        };
        let number = || {
            value
                .parse::<f64>()
                .map_err(|_| err(format!("Invalid value for '{}' on line {}", key, lineno + 1)))
        };

        if !in_list {
            match key {
                "natom" => record.natom = number()? as usize,
                "num_modes" => record.num_modes = number()? as usize,
                "num_integrated_modes" => record.num_integrated_modes = number()? as usize,
                "cutoff_frequency" => record.cutoff_frequency = number()?,
                "zero_point_energy" => record.zero_point_energy = number()?,
                _ => {}
            }
            continue;
        }

        if line.starts_with("- ") {
            if let Some(p) = current.take() {
                record.points.push(p);
            }
            current = Some(ThermalPoint {
                temperature: 0.0,
                free_energy: 0.0,
                entropy: 0.0,
                heat_capacity: 0.0,
                energy: 0.0,
            });
        }

        let point = current
            .as_mut()
            .ok_or_else(|| err(format!("Unexpected key '{}' on line {}", key, lineno + 1)))?;
        match key {
            "temperature" => point.temperature = number()?,
            "free_energy" => point.free_energy = number()?,
            "entropy" => point.entropy = number()?,
            "heat_capacity" => point.heat_capacity = number()?,
            "energy" => point.energy = number()?,
            _ => {}
        }
    }

    if let Some(p) = current {
        record.points.push(p);
    }
    if record.points.is_empty() {
        return Err(err("No thermal_properties entries".to_string()));
    }

    Ok(record)
}

// ─────────────────────────────────────────────────────────────
// 拟合输出
// ─────────────────────────────────────────────────────────────

/// 写出 bulk_modulus-temperature.dat（温度 K，体模量 GPa）
pub fn write_bulk_modulus_file(path: &Path, points: &[BulkModulusPoint]) -> Result<()> {
    let mut s = String::from("# temperature(K)   bulk_modulus(GPa)\n");
    for p in points {
        let _ = writeln!(s, "{:20.10} {:20.10}", p.temperature, p.bulk_modulus);
    }
    write_text(path, &s)
}

/// 写出 volume-temperature.dat（温度 K，平衡体积 Å³）
pub fn write_volume_temperature_file(path: &Path, rows: &[(f64, f64)]) -> Result<()> {
    let mut s = String::from("# temperature(K)   volume(Ang^3)\n");
    for (t, v) in rows {
        let _ = writeln!(s, "{:20.10} {:20.10}", t, v);
    }
    write_text(path, &s)
}

/// 读取 bulk_modulus-temperature.dat
///
/// 文件不存在返回 `Ok(None)`；少于两列或无法解析的行被跳过。
pub fn read_bulk_modulus_file(path: &Path) -> Result<Option<Vec<BulkModulusPoint>>> {
    if !path.exists() {
        return Ok(None);
    }

    let content = read_text(path)?;
    let points = content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .filter_map(|l| {
            let mut parts = l.split_whitespace();
            let t = parts.next()?.parse().ok()?;
            let b = parts.next()?.parse().ok()?;
            Some(BulkModulusPoint {
                temperature: t,
                bulk_modulus: b,
            })
        })
        .collect();

    Ok(Some(points))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_record() -> ThermalPropertyRecord {
        ThermalPropertyRecord {
            natom: 2,
            num_modes: 6,
            num_integrated_modes: 5,
            cutoff_frequency: 0.001,
            zero_point_energy: 5.25,
            points: (0..3)
                .map(|i| ThermalPoint {
                    temperature: 10.0 * i as f64,
                    free_energy: 5.25 - 0.1 * i as f64,
                    entropy: 0.5 * i as f64,
                    heat_capacity: 1.5 * i as f64,
                    energy: 5.25 + 0.01 * i as f64,
                })
                .collect(),
        }
    }

    #[test]
    fn test_ev_table_rows_follow_sample_order() {
        let points: Vec<VolumePoint> = (0..5)
            .map(|i| VolumePoint {
                index: i,
                volume: 38.0 + i as f64,
                energy: -10.0 + 0.01 * i as f64,
            })
            .collect();

        let table = format_ev_table(&points);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "# volume(Ang^3)   energy(eV)");
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[1], format!("{:20.10} {:20.10}", 38.0, -10.0));

        let dir = tempdir().unwrap();
        let path = dir.path().join("e-v.dat");
        write_ev_file(&path, &points).unwrap();
        let read = read_ev_file(&path).unwrap();
        assert_eq!(read.len(), 5);
        for (a, b) in read.iter().zip(&points) {
            assert_eq!(a.index, b.index);
            assert!((a.volume - b.volume).abs() < 1e-9);
        }
    }

    #[test]
    fn test_thermal_yaml_layout_and_parse() {
        let record = sample_record();
        let text = format_thermal_yaml(&record);
        assert!(text.contains("thermal_properties:\n- temperature:"));
        assert!(text.contains("natom:     2"));

        let parsed = parse_thermal_yaml(&text, "mem").unwrap();
        assert_eq!(parsed.natom, 2);
        assert_eq!(parsed.num_integrated_modes, 5);
        assert_eq!(parsed.points.len(), 3);
        assert!((parsed.points[2].heat_capacity - 3.0).abs() < 1e-6);
        assert!((parsed.zero_point_energy - 5.25).abs() < 1e-6);
    }

    #[test]
    fn test_empty_thermal_yaml_rejected() {
        assert!(parse_thermal_yaml("natom: 1\n", "mem").is_err());
    }

    #[test]
    fn test_bulk_modulus_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bulk_modulus-temperature.dat");
        assert!(read_bulk_modulus_file(&path).unwrap().is_none());

        fs::write(&path, "# T B\n0.0 100.5\n\n10.0 100.1\nbad line\n20.0\n").unwrap();
        let points = read_bulk_modulus_file(&path).unwrap().unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[1].bulk_modulus, 100.1);

        let written = [BulkModulusPoint {
            temperature: 300.0,
            bulk_modulus: 42.0,
        }];
        write_bulk_modulus_file(&path, &written).unwrap();
        let back = read_bulk_modulus_file(&path).unwrap().unwrap();
        assert_eq!(back, written.to_vec());
    }
}
