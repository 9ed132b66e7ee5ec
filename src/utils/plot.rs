//! # B(T) 曲线绘制
//!
//! 使用 `plotters` 绘制拟合得到的体模量-温度曲线，
//! 并用竖线标出报告温度。扩展名为 `.svg` 时输出 SVG，否则输出 PNG。
//!
//! ## 依赖关系
//! - 被 `commands/` 调用
//! - 使用 `models/qha.rs` 的 `BulkModulusPoint`

use crate::error::{QhaError, Result};
use crate::models::qha::nearest_bulk_modulus;
use crate::models::BulkModulusPoint;

use plotters::prelude::*;
use std::ops::Range;
use std::path::Path;

/// 默认图片文件名
pub const BULK_MODULUS_PLOT: &str = "bulk_modulus-temperature.png";

const WIDTH: u32 = 900;
const HEIGHT: u32 = 600;

/// 绘制 B(T) 曲线
pub fn plot_bulk_modulus(
    points: &[BulkModulusPoint],
    t_report: f64,
    output_path: &Path,
    title: &str,
) -> Result<()> {
    if points.is_empty() {
        return Err(QhaError::InvalidArgument(
            "No bulk modulus data to plot".to_string(),
        ));
    }

    let is_svg = output_path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("svg"))
        .unwrap_or(false);

    if is_svg {
        let root = SVGBackend::new(output_path, (WIDTH, HEIGHT)).into_drawing_area();
        draw_chart(&root, points, t_report, title)?;
        root.present().map_err(|e| QhaError::Other(e.to_string()))?;
    } else {
        let root = BitMapBackend::new(output_path, (WIDTH, HEIGHT)).into_drawing_area();
        draw_chart(&root, points, t_report, title)?;
        root.present().map_err(|e| QhaError::Other(e.to_string()))?;
    }
    Ok(())
}

fn draw_chart<DB: DrawingBackend>(
    root: &DrawingArea<DB, plotters::coord::Shift>,
    points: &[BulkModulusPoint],
    t_report: f64,
    title: &str,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)
        .map_err(|e| QhaError::Other(format!("{:?}", e)))?;

    let (x_range, y_range) = axis_ranges(points, t_report);
    let (y_lo, y_hi) = (y_range.start, y_range.end);

    let mut chart = ChartBuilder::on(root)
        .caption(title, ("sans-serif", 26).into_font())
        .margin(25)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(x_range, y_range)
        .map_err(|e| QhaError::Other(format!("{:?}", e)))?;

    chart
        .configure_mesh()
        .x_desc("Temperature (K)")
        .y_desc("Bulk modulus (GPa)")
        .x_label_style(("sans-serif", 16))
        .y_label_style(("sans-serif", 16))
        .axis_desc_style(("sans-serif", 18))
        .draw()
        .map_err(|e| QhaError::Other(format!("{:?}", e)))?;

    chart
        .draw_series(LineSeries::new(
            points.iter().map(|p| (p.temperature, p.bulk_modulus)),
            BLUE.stroke_width(2),
        ))
        .map_err(|e| QhaError::Other(format!("{:?}", e)))?;

    // 报告温度
    chart
        .draw_series(LineSeries::new(
            vec![(t_report, y_lo), (t_report, y_hi)],
            RED.mix(0.5).stroke_width(1),
        ))
        .map_err(|e| QhaError::Other(format!("{:?}", e)))?;

    if let Some(b) = nearest_bulk_modulus(points, t_report) {
        chart
            .draw_series(std::iter::once(Circle::new((t_report, b), 5, RED.filled())))
            .map_err(|e| QhaError::Other(format!("{:?}", e)))?;
        chart
            .draw_series(std::iter::once(Text::new(
                format!("{:.2} GPa @ {} K", b, t_report),
                (t_report, b),
                ("sans-serif", 16).into_font(),
            )))
            .map_err(|e| QhaError::Other(format!("{:?}", e)))?;
    }

    Ok(())
}

/// 坐标轴范围：温度覆盖数据和报告温度，体模量上下各留 5% 边距
fn axis_ranges(points: &[BulkModulusPoint], t_report: f64) -> (Range<f64>, Range<f64>) {
    let t_lo = points
        .iter()
        .map(|p| p.temperature)
        .fold(t_report, f64::min);
    let t_hi = points
        .iter()
        .map(|p| p.temperature)
        .fold(t_report, f64::max);
    let b_lo = points
        .iter()
        .map(|p| p.bulk_modulus)
        .fold(f64::INFINITY, f64::min);
    let b_hi = points
        .iter()
        .map(|p| p.bulk_modulus)
        .fold(f64::NEG_INFINITY, f64::max);

    let t_hi = if t_hi > t_lo { t_hi } else { t_lo + 1.0 };
    let pad = ((b_hi - b_lo) * 0.05).max(b_hi.abs() * 0.01).max(1e-3);
    (t_lo..t_hi, (b_lo - pad)..(b_hi + pad))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bm(t: f64, b: f64) -> BulkModulusPoint {
        BulkModulusPoint {
            temperature: t,
            bulk_modulus: b,
        }
    }

    #[test]
    fn test_axis_ranges_cover_data_and_report_temperature() {
        let points = [bm(0.0, 100.0), bm(500.0, 90.0)];
        let (x, y) = axis_ranges(&points, 800.0);
        assert_eq!(x, 0.0..800.0);
        assert!(y.start < 90.0 && y.end > 100.0);
    }

    #[test]
    fn test_axis_ranges_single_point() {
        let (x, y) = axis_ranges(&[bm(300.0, 50.0)], 300.0);
        assert!(x.end > x.start);
        assert!(y.end > y.start);
    }

    #[test]
    fn test_empty_plot_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let result = plot_bulk_modulus(&[], 300.0, &dir.path().join("b.png"), "empty");
        assert!(result.is_err());
    }
}
