//! # inputs 命令实现
//!
//! 为单个结构生成 QHA 输入文件，可选直接拟合。
//!
//! ## 依赖关系
//! - 使用 `cli/inputs.rs` 定义的参数
//! - 使用 `qha/pipeline.rs`、`parsers/`
//! - 使用 `commands/fit.rs` 的结果报告

use super::fit::report_bulk_modulus;
use crate::cli::inputs::InputsArgs;
use crate::cli::options;
use crate::error::Result;
use crate::models::qha::EV_FILE;
use crate::models::QhaDataset;
use crate::parsers;
use crate::qha::prepare_inputs;
use crate::utils::{output, progress};

/// 执行 inputs 命令
pub fn execute(args: InputsArgs) -> Result<()> {
    output::print_header("QHA Inputs");

    let settings = options::qha_settings(&args.sampling, &args.phonon, args.save_structures)?;
    let ff_config = args.forcefield.to_config()?;
    let crystal = parsers::parse_structure_file(&args.structure)?;

    output::print_param("Structure", &args.structure.display().to_string());
    output::print_param(
        "Formula",
        &format!("{} ({} atoms)", crystal.formula(), crystal.atoms.len()),
    );
    let (a, b, c, alpha, beta, gamma) = crystal.lattice.parameters();
    output::print_param(
        "Lattice",
        &format!(
            "{:.4} {:.4} {:.4} Å, {:.2} {:.2} {:.2}°",
            a, b, c, alpha, beta, gamma
        ),
    );
    output::print_param("Volume", &format!("{:.4} Å^3", crystal.volume()));
    output::print_param("Force field", &ff_config.kind.to_string());
    output::print_separator();

    let pb = progress::create_progress_bar(settings.sampling.n_points as u64, &crystal.name);
    let dataset = {
        let mut ff = ff_config.build()?;
        prepare_inputs(&crystal, &args.outdir, &settings, ff.as_mut(), &pb)
    };
    pb.finish_and_clear();
    let dataset = dataset?;

    output::print_success(&format!(
        "Wrote {} and {} thermal property files to {}",
        EV_FILE,
        dataset.len(),
        args.outdir.display()
    ));

    if !args.fit {
        output::print_info("Next step:");
        println!("  cd {} && {}", args.outdir.display(), phonopy_command_line(&args, &dataset));
        return Ok(());
    }

    let fitter = args.fitter.to_config().build();
    output::print_info(&format!("Fitting with {}", fitter.name()));
    let points = fitter.fit(&dataset, &args.outdir)?;
    report_bulk_modulus(&points, args.t_report, &args.outdir, args.plot, &crystal.name)?;
    output::print_done("QHA inputs complete");
    Ok(())
}

/// 手动执行 phonopy-qha 的命令行
fn phonopy_command_line(args: &InputsArgs, dataset: &QhaDataset) -> String {
    let mut parts = vec![args.fitter.qha_command.clone(), EV_FILE.to_string()];
    parts.extend(dataset.records.iter().map(|r| r.thermal_file.clone()));
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::options::{FitOpts, ForceFieldOpts, PhononOpts, SamplingOpts};
    use crate::forcefield::{DeviceChoice, ForceFieldKind};
    use crate::qha::FitterKind;
    use std::fs;
    use std::path::Path;

    fn args(structure: &Path, outdir: &Path, fit: bool) -> InputsArgs {
        InputsArgs {
            structure: structure.to_path_buf(),
            outdir: outdir.to_path_buf(),
            fit,
            t_report: 30.0,
            plot: false,
            save_structures: true,
            sampling: SamplingOpts {
                n_points: 5,
                strain: 0.06,
            },
            phonon: PhononOpts {
                supercell: vec![2, 2, 2],
                disp: 0.01,
                t_min: 0.0,
                t_max: 30.0,
                t_step: 15.0,
                qmesh: vec![4, 4, 4],
            },
            forcefield: ForceFieldOpts {
                kind: ForceFieldKind::LennardJones,
                device: DeviceChoice::Cpu,
                ff_command: String::new(),
                checkpoint: None,
                lj_epsilon: 0.0104,
                lj_sigma: 3.4,
                lj_cutoff: 8.5,
            },
            fitter: FitOpts {
                fitter: FitterKind::Native,
                qha_command: "phonopy-qha".to_string(),
                qha_tmax: None,
            },
        }
    }

    fn write_argon(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("POSCAR");
        fs::write(
            &path,
            "Ar\n1.0\n0.0 2.65 2.65\n2.65 0.0 2.65\n2.65 2.65 0.0\nAr\n1\nDirect\n0.0 0.0 0.0\n",
        )
        .unwrap();
        path
    }

    #[test]
    fn test_inputs_then_fit_directory() {
        let dir = tempfile::tempdir().unwrap();
        let structure = write_argon(dir.path());
        let outdir = dir.path().join("qha_out");

        execute(args(&structure, &outdir, true)).unwrap();

        assert!(outdir.join(EV_FILE).is_file());
        assert!(outdir.join("POSCAR-00").is_file());
        assert!(outdir.join("thermal_properties.yaml-04").is_file());
        assert!(outdir
            .join(crate::models::qha::BULK_MODULUS_FILE)
            .is_file());
    }

    #[test]
    fn test_unknown_structure_format() {
        let dir = tempfile::tempdir().unwrap();
        let structure = dir.path().join("structure.txt");
        fs::write(&structure, "").unwrap();
        assert!(execute(args(&structure, &dir.path().join("out"), false)).is_err());
    }
}
