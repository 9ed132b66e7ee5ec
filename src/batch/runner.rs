//! # 批量执行器
//!
//! 逐个结构执行 QHA 流程并收集汇总行。
//!
//! ## 功能
//! - 串行处理（力场设备上下文不保证线程安全）
//! - 单个结构失败只记录空结果，不中断批处理
//! - 错误收集与汇总报告
//! - 不同子目录中的同名结构分配不同的输出目录
//!
//! ## 依赖关系
//! - 被 `commands/batch.rs` 调用
//! - 使用 `utils/output.rs` 输出每个结构的状态

use crate::error::Result;
use crate::models::BatchSummaryRow;
use crate::utils::output;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// 单个结构的处理结果
#[derive(Debug, Clone)]
pub enum ProcessResult {
    /// 得到体模量
    Success(BatchSummaryRow),
    /// 拟合完成但没有输出
    NoResult(BatchSummaryRow),
    /// 处理失败
    Failed(BatchSummaryRow, String),
}

/// 批量处理结果统计
#[derive(Debug, Default)]
pub struct BatchResult {
    /// 按处理顺序排列的汇总行
    pub rows: Vec<BatchSummaryRow>,
    /// 成功数量
    pub success: usize,
    /// 无结果数量
    pub no_result: usize,
    /// 失败数量
    pub failed: usize,
    /// 失败详情
    pub failures: Vec<(String, String)>,
}

impl BatchResult {
    /// 合并处理结果
    pub fn merge(&mut self, result: ProcessResult) {
        match result {
            ProcessResult::Success(row) => {
                self.success += 1;
                self.rows.push(row);
            }
            ProcessResult::NoResult(row) => {
                self.no_result += 1;
                self.rows.push(row);
            }
            ProcessResult::Failed(row, err) => {
                self.failed += 1;
                self.failures.push((row.material.clone(), err));
                self.rows.push(row);
            }
        }
    }

    /// 总处理数量
    pub fn total(&self) -> usize {
        self.success + self.no_result + self.failed
    }
}

/// 批量执行器
pub struct BatchRunner {
    /// 输出根目录
    out_root: PathBuf,
    /// 报告温度 (K)
    t_report: f64,
}

impl BatchRunner {
    /// 创建新的批量执行器
    pub fn new(out_root: impl Into<PathBuf>, t_report: f64) -> Self {
        Self {
            out_root: out_root.into(),
            t_report,
        }
    }

    /// 结构的输出目录 `<out_root>/<material>`
    pub fn outdir_for(&self, material: &str) -> PathBuf {
        self.out_root.join(material)
    }

    /// 依次处理文件列表
    ///
    /// `processor` 接收结构文件与其输出目录，返回报告温度处的体模量
    /// （`None` 表示拟合没有输出）。
    pub fn run<F>(&self, files: &[PathBuf], mut processor: F) -> BatchResult
    where
        F: FnMut(&Path, &Path) -> Result<Option<f64>>,
    {
        let total = files.len();
        let mut batch_result = BatchResult::default();
        let materials = unique_material_names(files);

        for (idx, (file, material)) in files.iter().zip(materials).enumerate() {
            let outdir = self.outdir_for(&material);
            output::print_info(&format!(
                "[{}/{}] Processing {} -> {}/",
                idx + 1,
                total,
                file.file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default(),
                material
            ));

            let mut row = BatchSummaryRow {
                material: material.clone(),
                outdir: outdir.display().to_string(),
                t_report: self.t_report,
                bulk_modulus: None,
            };

            let result = match processor(file, &outdir) {
                Ok(Some(b)) => {
                    output::print_success(&format!(
                        "{}: B({} K) = {:.4} GPa",
                        material, self.t_report, b
                    ));
                    row.bulk_modulus = Some(b);
                    ProcessResult::Success(row)
                }
                Ok(None) => {
                    output::print_warning(&format!("{}: fitter produced no result", material));
                    ProcessResult::NoResult(row)
                }
                Err(e) => {
                    if e.is_input_error() {
                        output::print_warning(&format!("Skipping {}: {}", material, e));
                    } else {
                        output::print_error(&format!("{}: {}", material, e));
                    }
                    log::debug!("{} failed: {:?}", file.display(), e);
                    ProcessResult::Failed(row, e.to_string())
                }
            };

            batch_result.merge(result);
        }

        batch_result
    }
}

/// 结构名：文件名去掉扩展名
pub fn material_name(file: &Path) -> String {
    file.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "structure".to_string())
}

/// 为文件列表分配互不相同的结构名
///
/// 递归收集时不同子目录可能有同名文件，后出现的依次加 `_2`、`_3` 后缀，
/// 避免写入同一个输出目录。
pub fn unique_material_names(files: &[PathBuf]) -> Vec<String> {
    let stems: Vec<String> = files.iter().map(|f| material_name(f)).collect();
    let mut taken: HashSet<String> = HashSet::new();
    let mut names = Vec::with_capacity(stems.len());

    for (idx, stem) in stems.iter().enumerate() {
        let name = if taken.contains(stem) {
            let renamed = (2..)
                .map(|n| format!("{}_{}", stem, n))
                .find(|c| !taken.contains(c) && !stems.contains(c))
                .unwrap_or_else(|| stem.clone());
            output::print_warning(&format!(
                "{} has the same name as an earlier structure, writing to {}/",
                files[idx].display(),
                renamed
            ));
            renamed
        } else {
            stem.clone()
        };
        taken.insert(name.clone());
        names.push(name);
    }
    names
}
