//! # 批处理汇总表
//!
//! 写出 `summary_bulk_modulus.csv` 并在终端打印汇总表。
//!
//! ## 依赖关系
//! - 被 `commands/batch.rs` 调用
//! - 使用 `csv` 写表，`tabled` 打印

use crate::error::{QhaError, Result};
use crate::models::BatchSummaryRow;
use std::path::Path;
use tabled::{settings::Style, Table, Tabled};

/// CSV 表头
pub const SUMMARY_HEADER: [&str; 4] = ["material", "outdir", "T_report_K", "B_T_GPa"];

/// 写出汇总 CSV
pub fn write_summary_csv(path: &Path, rows: &[BatchSummaryRow]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path).map_err(QhaError::CsvError)?;
    wtr.write_record(SUMMARY_HEADER)?;
    for row in rows {
        wtr.write_record(row.to_record())?;
    }
    wtr.flush().map_err(|e| QhaError::FileWriteError {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(())
}

#[derive(Tabled)]
struct SummaryTableRow {
    #[tabled(rename = "Material")]
    material: String,
    #[tabled(rename = "T (K)")]
    t_report: String,
    #[tabled(rename = "B_T (GPa)")]
    bulk_modulus: String,
}

/// 终端汇总表
pub fn format_summary_table(rows: &[BatchSummaryRow]) -> String {
    let table_rows: Vec<SummaryTableRow> = rows
        .iter()
        .map(|r| SummaryTableRow {
            material: r.material.clone(),
            t_report: format!("{}", r.t_report),
            bulk_modulus: r
                .bulk_modulus
                .map(|b| format!("{:.4}", b))
                .unwrap_or_else(|| "-".to_string()),
        })
        .collect();

    Table::new(table_rows).with(Style::rounded()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn rows() -> Vec<BatchSummaryRow> {
        vec![
            BatchSummaryRow {
                material: "NaCl".to_string(),
                outdir: "out/NaCl".to_string(),
                t_report: 300.0,
                bulk_modulus: Some(24.123456),
            },
            BatchSummaryRow {
                material: "broken".to_string(),
                outdir: "out/broken".to_string(),
                t_report: 300.0,
                bulk_modulus: None,
            },
        ]
    }

    #[test]
    fn test_summary_csv_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(crate::models::qha::SUMMARY_FILE);
        write_summary_csv(&path, &rows()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "material,outdir,T_report_K,B_T_GPa");
        assert_eq!(lines[1], "NaCl,out/NaCl,300.0,24.1235");
        assert_eq!(lines[2], "broken,out/broken,300.0,");
    }

    #[test]
    fn test_summary_table() {
        let table = format_summary_table(&rows());
        assert!(table.contains("NaCl"));
        assert!(table.contains("24.1235"));
        assert!(table.contains("B_T (GPa)"));
    }
}
