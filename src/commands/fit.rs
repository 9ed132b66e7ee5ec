//! # fit 命令实现
//!
//! 读取已有目录中的 `e-v.dat` 与 `thermal_properties.yaml-*`，
//! 执行拟合并报告指定温度下的体模量。
//!
//! ## 依赖关系
//! - 使用 `cli/fit.rs` 定义的参数
//! - 使用 `qha/pipeline.rs` 的 `load_dataset`、`qha/fitter/`
//! - 使用 `utils/output.rs`, `utils/plot.rs`

use crate::cli::fit::FitArgs;
use crate::error::Result;
use crate::models::qha::nearest_bulk_modulus;
use crate::models::BulkModulusPoint;
use crate::qha::load_dataset;
use crate::utils::{output, plot};

use std::path::Path;

/// 执行 fit 命令
pub fn execute(args: FitArgs) -> Result<()> {
    output::print_header("QHA Fit");

    let dataset = load_dataset(&args.dir)?;
    let temperatures = dataset.temperatures();
    output::print_info(&format!(
        "Loaded {} volume points, {} temperatures ({} - {} K)",
        dataset.len(),
        temperatures.len(),
        temperatures.first().copied().unwrap_or_default(),
        temperatures.last().copied().unwrap_or_default()
    ));

    let fitter = args.fit.to_config().build();
    output::print_info(&format!("Fitting with {}", fitter.name()));
    let points = fitter.fit(&dataset, &args.dir)?;

    let title = args
        .dir
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "QHA".to_string());
    report_bulk_modulus(&points, args.t_report, &args.dir, args.plot, &title)?;
    Ok(())
}

/// 报告拟合结果并按需绘图，返回报告温度处的体模量
pub(crate) fn report_bulk_modulus(
    points: &[BulkModulusPoint],
    t_report: f64,
    dir: &Path,
    with_plot: bool,
    title: &str,
) -> Result<Option<f64>> {
    let Some(b) = nearest_bulk_modulus(points, t_report) else {
        output::print_warning("Fitter produced no bulk modulus data");
        return Ok(None);
    };

    output::print_success(&format!("B({} K) = {:.4} GPa", t_report, b));
    log::info!("{} temperatures in fit output for {}", points.len(), title);

    if with_plot {
        let path = dir.join(plot::BULK_MODULUS_PLOT);
        plot::plot_bulk_modulus(points, t_report, &path, title)?;
        output::print_success(&format!("Plot saved to {}", path.display()));
    }
    Ok(Some(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::options::FitOpts;
    use crate::error::QhaError;
    use crate::qha::FitterKind;

    fn native_args(dir: &Path) -> FitArgs {
        FitArgs {
            dir: dir.to_path_buf(),
            t_report: 300.0,
            plot: false,
            fit: FitOpts {
                fitter: FitterKind::Native,
                qha_command: "phonopy-qha".to_string(),
                qha_tmax: None,
            },
        }
    }

    #[test]
    fn test_missing_directory() {
        let args = native_args(Path::new("/nonexistent/qha"));
        assert!(matches!(
            execute(args),
            Err(QhaError::DirectoryNotFound { .. })
        ));
    }

    #[test]
    fn test_empty_directory_has_no_dataset() {
        let dir = tempfile::tempdir().unwrap();
        assert!(execute(native_args(dir.path())).is_err());
    }

    #[test]
    fn test_report_picks_nearest_temperature() {
        let points = [
            BulkModulusPoint {
                temperature: 290.0,
                bulk_modulus: 10.0,
            },
            BulkModulusPoint {
                temperature: 300.0,
                bulk_modulus: 12.0,
            },
            BulkModulusPoint {
                temperature: 310.0,
                bulk_modulus: 9.0,
            },
        ];
        let dir = tempfile::tempdir().unwrap();
        let b = report_bulk_modulus(&points, 305.0, dir.path(), false, "t").unwrap();
        assert_eq!(b, Some(12.0));
        assert_eq!(report_bulk_modulus(&[], 305.0, dir.path(), false, "t").unwrap(), None);
    }
}
