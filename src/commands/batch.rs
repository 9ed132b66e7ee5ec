//! # batch 命令实现
//!
//! 对压缩包（或目录）中的每个结构执行 QHA 流程，
//! 在 `<out_root>` 写出 `summary_bulk_modulus.csv`。
//!
//! ## 功能
//! - zip 解压到 `<out_root>/_unzipped`，按模式收集结构文件
//! - 逐结构执行：解析 -> 体积采样 -> 声子 -> 拟合
//! - 单个结构失败记录空结果，批处理继续
//! - 没有匹配文件时返回错误（退出码 1，不写汇总表）
//!
//! ## 依赖关系
//! - 使用 `cli/batch.rs` 定义的参数
//! - 使用 `batch/`、`qha/`、`parsers/`
//! - 使用 `utils/output.rs`, `utils/progress.rs`, `utils/plot.rs`

use crate::batch::{archive, summary, BatchResult, BatchRunner, FileCollector};
use crate::cli::batch::BatchArgs;
use crate::cli::options;
use crate::error::{QhaError, Result};
use crate::models::qha::{nearest_bulk_modulus, SUMMARY_FILE};
use crate::parsers;
use crate::qha;
use crate::utils::{output, plot, progress};

use std::fs;

/// 执行 batch 命令
pub fn execute(args: BatchArgs) -> Result<()> {
    output::print_header("QHA Batch");

    // 所有参数在处理前校验
    let settings = options::qha_settings(&args.sampling, &args.phonon, args.save_structures)?;
    let ff_config = args.forcefield.to_config()?;
    let fitter = args.fit.to_config().build();

    fs::create_dir_all(&args.out_root).map_err(|e| QhaError::FileWriteError {
        path: args.out_root.display().to_string(),
        source: e,
    })?;

    let input_dir = archive::resolve_input(&args.zip_path, &args.out_root)?;
    let files = FileCollector::new(&input_dir)
        .with_pattern(&args.pattern)?
        .collect();

    if files.is_empty() {
        return Err(QhaError::NoFilesFound {
            pattern: args.pattern.clone(),
        });
    }

    output::print_param("Input", &args.zip_path.display().to_string());
    output::print_param("Structures", &files.len().to_string());
    output::print_param(
        "Volume points",
        &format!("{} (strain ±{})", settings.sampling.n_points, settings.sampling.strain),
    );
    output::print_param(
        "Supercell",
        &format!("{:?}, disp {} Å", settings.phonon.supercell, settings.phonon.displacement),
    );
    output::print_param("q-mesh", &format!("{:?}", settings.phonon.mesh));
    output::print_param(
        "Temperatures",
        &format!(
            "{} - {} K, step {}",
            settings.phonon.t_min, settings.phonon.t_max, settings.phonon.t_step
        ),
    );
    output::print_param("Force field", &ff_config.kind.to_string());
    output::print_param("Fitter", fitter.name());
    output::print_separator();

    let runner = BatchRunner::new(&args.out_root, args.t_report);
    let n_points = settings.sampling.n_points as u64;

    let result = runner.run(&files, |file, outdir| {
        let crystal = parsers::parse_structure_file(file)?;
        let pb = progress::create_progress_bar(n_points, &crystal.name);
        let fitted = qha::run_structure(
            &crystal,
            outdir,
            &settings,
            &ff_config,
            fitter.as_ref(),
            &pb,
        );
        pb.finish_and_clear();
        let points = fitted?;

        if args.plot && !points.is_empty() {
            let path = outdir.join(plot::BULK_MODULUS_PLOT);
            if let Err(e) = plot::plot_bulk_modulus(&points, args.t_report, &path, &crystal.name) {
                output::print_warning(&format!("{}: plot failed: {}", crystal.name, e));
            }
        }
        Ok(nearest_bulk_modulus(&points, args.t_report))
    });

    let summary_path = args.out_root.join(SUMMARY_FILE);
    summary::write_summary_csv(&summary_path, &result.rows)?;

    print_report(&result);
    output::print_done(&format!("Summary written to {}", summary_path.display()));
    Ok(())
}

fn print_report(result: &BatchResult) {
    output::print_separator();
    println!("{}", summary::format_summary_table(&result.rows));

    output::print_info(&format!(
        "Total: {}, succeeded: {}, no result: {}, failed: {}",
        result.total(),
        result.success,
        result.no_result,
        result.failed
    ));
    for (material, err) in &result.failures {
        log::debug!("{}: {}", material, err);
    }
}
