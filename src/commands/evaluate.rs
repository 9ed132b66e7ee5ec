//! # evaluate 命令实现
//!
//! 用力场对结构做静态评估：能量、每原子能量、压强与 σ_xx。
//!
//! ## 功能
//! - 输入为单个文件、目录或 zip 压缩包
//! - 力场只构造一次，依次评估所有结构
//! - 单个结构失败给出警告后继续
//! - 终端表格与可选 CSV 输出
//!
//! ## 依赖关系
//! - 使用 `cli/evaluate.rs` 定义的参数
//! - 使用 `batch/archive.rs`、`batch/collector.rs`、`forcefield/`、`parsers/`
//! - 使用 `utils/output.rs`, `utils/progress.rs`

use crate::batch::{archive, FileCollector};
use crate::cli::evaluate::EvaluateArgs;
use crate::error::{QhaError, Result};
use crate::forcefield::ForceField;
use crate::parsers;
use crate::utils::{output, progress};

use std::fs;
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};

/// 单个结构的评估结果
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationRow {
    pub structure: String,
    pub natoms: usize,
    /// eV
    pub energy: f64,
    /// GPa
    pub pressure: f64,
    pub stress_xx: f64,
}

impl EvaluationRow {
    pub fn energy_per_atom(&self) -> f64 {
        self.energy / self.natoms as f64
    }

    fn to_record(&self) -> [String; 6] {
        [
            self.structure.clone(),
            self.natoms.to_string(),
            format!("{:.8}", self.energy),
            format!("{:.8}", self.energy_per_atom()),
            format!("{:.4}", self.pressure),
            format!("{:.4}", self.stress_xx),
        ]
    }
}

const CSV_HEADER: [&str; 6] = [
    "structure",
    "natoms",
    "energy_eV",
    "energy_per_atom_eV",
    "pressure_GPa",
    "stress_xx_GPa",
];

#[derive(Tabled)]
struct TableRow {
    #[tabled(rename = "Structure")]
    structure: String,
    #[tabled(rename = "Atoms")]
    natoms: usize,
    #[tabled(rename = "E (eV)")]
    energy: String,
    #[tabled(rename = "E/atom (eV)")]
    energy_per_atom: String,
    #[tabled(rename = "P (GPa)")]
    pressure: String,
    #[tabled(rename = "σxx (GPa)")]
    stress_xx: String,
}

/// 执行 evaluate 命令
pub fn execute(args: EvaluateArgs) -> Result<()> {
    output::print_header("Force Field Evaluation");

    let ff_config = args.forcefield.to_config()?;

    let extract_root = archive::is_zip(&args.input).then(|| scratch_dir(&args.input));
    let input = match &extract_root {
        Some(root) => archive::resolve_input(&args.input, root)?,
        None => args.input.clone(),
    };
    if !input.exists() {
        return Err(QhaError::FileNotFound {
            path: input.display().to_string(),
        });
    }

    let files = FileCollector::new(&input).with_pattern(&args.pattern)?.collect();
    if files.is_empty() {
        return Err(QhaError::NoFilesFound {
            pattern: args.pattern.clone(),
        });
    }
    output::print_info(&format!("Evaluating {} structures", files.len()));

    let rows = {
        let mut ff = ff_config.build()?;
        evaluate_files(&files, ff.as_mut())
    };

    if let Some(root) = &extract_root {
        if let Err(e) = fs::remove_dir_all(root) {
            log::debug!("Failed to remove {}: {}", root.display(), e);
        }
    }

    if rows.is_empty() {
        output::print_warning("No structure could be evaluated");
        return Ok(());
    }

    println!("{}", format_table(&rows));

    if let Some(csv_path) = &args.output_csv {
        write_csv(csv_path, &rows)?;
        output::print_success(&format!("Results saved to {}", csv_path.display()));
    }

    output::print_done(&format!("Evaluated {}/{} structures", rows.len(), files.len()));
    Ok(())
}

/// zip 输入的临时解压目录
fn scratch_dir(zip_path: &Path) -> PathBuf {
    let stem = zip_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "input".to_string());
    std::env::temp_dir().join(format!("qhakit-{}", stem))
}

/// 依次评估；失败的结构给出警告并跳过
pub fn evaluate_files(files: &[PathBuf], forcefield: &mut dyn ForceField) -> Vec<EvaluationRow> {
    let pb = progress::create_progress_bar(files.len() as u64, forcefield.name());
    let mut rows = Vec::with_capacity(files.len());

    for file in files {
        pb.set_message(
            file.file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
        );
        match evaluate_file(file, forcefield) {
            Ok(row) => rows.push(row),
            Err(e) => pb.suspend(|| {
                output::print_warning(&format!("Skipping {}: {}", file.display(), e));
            }),
        }
        pb.inc(1);
    }

    pb.finish_and_clear();
    rows
}

fn evaluate_file(file: &Path, forcefield: &mut dyn ForceField) -> Result<EvaluationRow> {
    let crystal = parsers::parse_structure_file(file)?;
    let evaluation = forcefield.evaluate(&crystal)?;
    log::debug!(
        "{}: E={:.6} eV, max |F|={:.4} eV/Å",
        crystal.name,
        evaluation.energy,
        evaluation.max_force()
    );
    Ok(EvaluationRow {
        structure: crystal.name.clone(),
        natoms: crystal.atoms.len(),
        energy: evaluation.energy,
        pressure: evaluation.pressure_gpa(),
        stress_xx: evaluation.stress_xx_gpa(),
    })
}

fn format_table(rows: &[EvaluationRow]) -> String {
    let table_rows: Vec<TableRow> = rows
        .iter()
        .map(|r| TableRow {
            structure: r.structure.clone(),
            natoms: r.natoms,
            energy: format!("{:.6}", r.energy),
            energy_per_atom: format!("{:.6}", r.energy_per_atom()),
            pressure: format!("{:.3}", r.pressure),
            stress_xx: format!("{:.3}", r.stress_xx),
        })
        .collect();
    Table::new(table_rows).with(Style::rounded()).to_string()
}

fn write_csv(path: &Path, rows: &[EvaluationRow]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(CSV_HEADER)?;
    for row in rows {
        wtr.write_record(row.to_record())?;
    }
    wtr.flush().map_err(|e| QhaError::FileWriteError {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(())
}
