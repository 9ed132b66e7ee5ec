//! # 外部力场桥接
//!
//! 机器学习力场（如 MatterSim）运行在独立的桥接进程中。
//! 每个结构启动一次桥接进程，之后通过标准输入输出逐行交换 JSON：
//!
//! ```text
//! -> {"cell": [[..],[..],[..]], "symbols": ["Si", ..], "scaled_positions": [[..], ..], "pbc": [true, true, true]}
//! <- {"energy": -10.8, "forces": [[..], ..], "stress": [xx, yy, zz, yz, xz, xy]}
//! <- {"error": "CUDA out of memory"}
//! ```
//!
//! 应力单位为 eV/Å³，拉伸为正。进程在实例 drop 时关闭 stdin 并回收。
//!
//! ## 依赖关系
//! - 被 `forcefield/mod.rs` 构造
//! - 使用 `serde_json` 编解码协议

use super::{Device, Evaluation, ForceField};
use crate::error::{QhaError, Result};
use crate::models::Crystal;
use serde::{Deserialize, Serialize};
use std::env;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

#[derive(Debug, Serialize)]
struct Request<'a> {
    cell: [[f64; 3]; 3],
    symbols: Vec<&'a str>,
    scaled_positions: Vec<[f64; 3]>,
    pbc: [bool; 3],
}

#[derive(Debug, Deserialize)]
struct Response {
    #[serde(default)]
    energy: Option<f64>,
    #[serde(default)]
    forces: Option<Vec<[f64; 3]>>,
    #[serde(default)]
    stress: Option<[f64; 6]>,
    #[serde(default)]
    error: Option<String>,
}

/// 外部力场进程
pub struct ExternalForceField {
    name: String,
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: BufReader<ChildStdout>,
}

impl ExternalForceField {
    /// 启动桥接进程
    ///
    /// `command` 可以带参数（按空白切分），之后追加 `--device` 与可选的 `--checkpoint`。
    pub fn spawn(command: &str, device: Device, checkpoint: Option<&Path>) -> Result<Self> {
        let mut parts = command.split_whitespace();
        let program = parts.next().ok_or_else(|| {
            QhaError::InvalidArgument("Force field command is empty".to_string())
        })?;

        let mut cmd = Command::new(program);
        cmd.args(parts).arg("--device").arg(device.to_string());
        if let Some(path) = checkpoint {
            cmd.arg("--checkpoint").arg(path);
        }

        // 桥接程序的日志只在 debug 级别透传
        let stderr = if log::log_enabled!(log::Level::Debug) {
            Stdio::inherit()
        } else {
            Stdio::null()
        };

        log::debug!("Spawning force field bridge: {:?}", cmd);
        let mut child = cmd
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(stderr)
            .spawn()
            .map_err(|_| QhaError::CommandNotFound {
                command: program.to_string(),
            })?;

        let stdin = child.stdin.take();
        let stdout = child.stdout.take().ok_or_else(|| QhaError::ForceFieldFailed {
            name: program.to_string(),
            reason: "Bridge stdout is not available".to_string(),
        })?;

        Ok(ExternalForceField {
            name: program.to_string(),
            child,
            stdin,
            stdout: BufReader::new(stdout),
        })
    }

    fn failure(&self, reason: impl Into<String>) -> QhaError {
        QhaError::ForceFieldFailed {
            name: self.name.clone(),
            reason: reason.into(),
        }
    }
}

impl ForceField for ExternalForceField {
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&mut self, crystal: &Crystal) -> Result<Evaluation> {
        let request = encode_request(crystal)?;

        let stdin = match self.stdin.as_mut() {
            Some(stdin) => stdin,
            None => return Err(self.failure("Bridge stdin is closed")),
        };
        if let Err(e) = writeln!(stdin, "{}", request).and_then(|_| stdin.flush()) {
            return Err(self.failure(format!("Failed to send request: {}", e)));
        }

        let mut line = String::new();
        let read = self
            .stdout
            .read_line(&mut line)
            .map_err(|e| self.failure(format!("Failed to read response: {}", e)))?;
        if read == 0 {
            return Err(self.failure("Bridge exited before answering"));
        }

        decode_response(&line, crystal.num_atoms()).map_err(|reason| self.failure(reason))
    }
}

impl Drop for ExternalForceField {
    fn drop(&mut self) {
        // 关闭 stdin 让桥接进程自行退出
        self.stdin.take();
        match self.child.wait() {
            Ok(status) if !status.success() => {
                log::warn!("Force field bridge '{}' exited with {}", self.name, status)
            }
            Err(e) => log::warn!("Failed to wait for force field bridge '{}': {}", self.name, e),
            _ => {}
        }
    }
}

/// 在 `PATH` 中查找可执行文件；带路径分隔符的名字直接检查该文件
pub fn find_program(program: &str) -> Option<PathBuf> {
    let direct = Path::new(program);
    if direct.components().count() > 1 {
        return direct.is_file().then(|| direct.to_path_buf());
    }

    let path_var = env::var_os("PATH")?;
    env::split_paths(&path_var).find_map(|dir| {
        let candidate = dir.join(program);
        if candidate.is_file() {
            return Some(candidate);
        }
        if cfg!(windows) {
            let exe = dir.join(format!("{}.exe", program));
            if exe.is_file() {
                return Some(exe);
            }
        }
        None
    })
}

/// 启动前确认桥接命令的可执行文件存在
pub fn check_bridge_command(command: &str) -> Result<PathBuf> {
    let program = command.split_whitespace().next().ok_or_else(|| {
        QhaError::InvalidArgument("Force field command is empty".to_string())
    })?;
    find_program(program).ok_or_else(|| QhaError::CommandNotFound {
        command: program.to_string(),
    })
}

/// 将结构编码为一行 JSON 请求
fn encode_request(crystal: &Crystal) -> Result<String> {
    let request = Request {
        cell: crystal.lattice.matrix,
        symbols: crystal.atoms.iter().map(|a| a.element.as_str()).collect(),
        scaled_positions: crystal.atoms.iter().map(|a| a.position).collect(),
        pbc: crystal.pbc,
    };
    Ok(serde_json::to_string(&request)?)
}

/// 解码一行 JSON 响应并检查原子数
fn decode_response(line: &str, natoms: usize) -> std::result::Result<Evaluation, String> {
    let response: Response = serde_json::from_str(line.trim())
        .map_err(|e| format!("Malformed response ({}): {}", e, line.trim()))?;

    if let Some(error) = response.error {
        return Err(error);
    }

    let energy = response.energy.ok_or("Response has no energy")?;
    let forces = response.forces.ok_or("Response has no forces")?;
    let stress = response.stress.ok_or("Response has no stress")?;

    if forces.len() != natoms {
        return Err(format!(
            "Expected forces for {} atoms, got {}",
            natoms,
            forces.len()
        ));
    }

    Ok(Evaluation {
        energy,
        forces,
        stress,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Atom, Lattice};

    fn silicon() -> Crystal {
        let lattice = Lattice::from_vectors([[0.0, 2.715, 2.715], [2.715, 0.0, 2.715], [2.715, 2.715, 0.0]]);
        Crystal::new(
            "Si",
            lattice,
            vec![
                Atom::new("Si", [0.0, 0.0, 0.0]),
                Atom::new("Si", [0.25, 0.25, 0.25]),
            ],
        )
    }

    #[test]
    fn test_encode_request() {
        let line = encode_request(&silicon()).unwrap();
        assert!(!line.contains('\n'));

        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["symbols"], serde_json::json!(["Si", "Si"]));
        assert_eq!(value["scaled_positions"][1][2], 0.25);
        assert_eq!(value["cell"][0][1], 2.715);
        assert_eq!(value["pbc"], serde_json::json!([true, true, true]));
    }

    #[test]
    fn test_decode_response() {
        let line = r#"{"energy": -10.84, "forces": [[0.0, 0.0, 0.1], [0.0, 0.0, -0.1]], "stress": [0.001, 0.001, 0.001, 0.0, 0.0, 0.0]}"#;
        let eval = decode_response(line, 2).unwrap();
        assert_eq!(eval.energy, -10.84);
        assert_eq!(eval.forces[1], [0.0, 0.0, -0.1]);
        assert!(eval.pressure_gpa() < 0.0);
    }

    #[test]
    fn test_decode_error_and_mismatch() {
        assert_eq!(
            decode_response(r#"{"error": "CUDA out of memory"}"#, 2).unwrap_err(),
            "CUDA out of memory"
        );

        let one_force = r#"{"energy": -1.0, "forces": [[0.0, 0.0, 0.0]], "stress": [0, 0, 0, 0, 0, 0]}"#;
        assert!(decode_response(one_force, 2).is_err());
        assert!(decode_response("not json", 2).is_err());
    }

    #[test]
    fn test_missing_bridge_program() {
        let result = ExternalForceField::spawn("qhakit-no-such-bridge", Device::Cpu, None);
        assert!(matches!(result, Err(QhaError::CommandNotFound { .. })));
    }

    #[test]
    fn test_bridge_command_lookup() {
        assert!(matches!(
            check_bridge_command("qhakit-no-such-bridge --fast"),
            Err(QhaError::CommandNotFound { command }) if command == "qhakit-no-such-bridge"
        ));
        assert!(matches!(
            check_bridge_command(""),
            Err(QhaError::InvalidArgument(_))
        ));

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("bridge");
        std::fs::write(&script, "").unwrap();
        let found = check_bridge_command(&format!("{} --fast", script.display())).unwrap();
        assert_eq!(found, script);
        assert!(find_program(&dir.path().join("missing").display().to_string()).is_none());
    }

    #[test]
    fn test_empty_command_rejected() {
        let result = ExternalForceField::spawn("  ", Device::Cpu, None);
        assert!(matches!(result, Err(QhaError::InvalidArgument(_))));
    }
}
