//! # xtask - 开发辅助工具
//!
//! 提供本地质量门禁与场景检查。
//!
//! ## 命令
//!
//! - `check-all`: 依次运行 fmt、clippy、test，任一失败即停止
//! - `scene-check`: 检查场景文件（JSON 结构、目标引用、指令编译）

use std::path::{Path, PathBuf};
use std::process::{Command, ExitCode};

use tween_host::SceneFile;
use walkdir::WalkDir;

/// 门禁步骤：cargo 参数
const GATES: &[&[&str]] = &[
    &["fmt", "--all", "--", "--check"],
    &["clippy", "--workspace", "--all-targets"],
    &["test", "--workspace"],
];

fn main() -> ExitCode {
    match real_main() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("xtask error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn real_main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let sub = args.next().unwrap_or_else(|| "help".to_string());

    match sub.as_str() {
        "check-all" => check_all(),
        "scene-check" => scene_check(args.next().as_deref()),
        "help" | "-h" | "--help" => {
            print_help();
            Ok(())
        }
        other => anyhow::bail!("unknown xtask subcommand: {other}"),
    }
}

fn check_all() -> anyhow::Result<()> {
    for gate in GATES {
        let line = format!("cargo {}", gate.join(" "));
        eprintln!("\n==> {line}");
        let status = Command::new("cargo").args(*gate).status()?;
        if !status.success() {
            anyhow::bail!("{line} failed with {status}");
        }
    }
    Ok(())
}

fn print_help() {
    eprintln!(
        r#"xtask - 开发辅助工具

USAGE:
  cargo xtask <command>

COMMANDS:
  check-all       运行 fmt、clippy、test 门禁检查
  scene-check     检查场景文件

SCENE-CHECK:
  cargo xtask scene-check [path]

  不带参数：检查 tween-host/scenes/ 下所有 .json 文件
  带路径参数：检查指定文件或目录

  检查内容：
    - JSON 结构错误
    - 未声明的目标 / 时间轴成员
    - 目标基数不符的指令（有目标 tween 上的 state 等）
    - 编译后没有任何步骤的 tween（警告）

ALIASES (in .cargo/config.toml):
  cargo check-all     -> cargo xtask check-all
  cargo scene-check   -> cargo xtask scene-check
"#
    );
}

//=============================================================================
// scene-check 命令实现
//=============================================================================

/// 默认场景目录（相对于 workspace root）
const DEFAULT_SCENES_DIR: &str = "tween-host/scenes";

/// 场景检查结果
#[derive(Default)]
struct SceneCheckResult {
    /// 检查的场景数量
    scenes_checked: usize,
    /// 错误
    errors: Vec<String>,
    /// 警告
    warnings: Vec<String>,
}

/// 执行场景检查
fn scene_check(path: Option<&str>) -> anyhow::Result<()> {
    let files = match path {
        Some(p) => {
            let path = PathBuf::from(p);
            if path.is_file() {
                vec![path]
            } else if path.is_dir() {
                collect_scene_files(&path)
            } else {
                anyhow::bail!("路径不存在: {}", p);
            }
        }
        None => {
            let dir = Path::new(DEFAULT_SCENES_DIR);
            if !dir.exists() {
                anyhow::bail!(
                    "默认场景目录不存在: {}\n请在 workspace 根目录运行，或指定场景路径",
                    dir.display()
                );
            }
            collect_scene_files(dir)
        }
    };

    if files.is_empty() {
        eprintln!("未找到场景文件（.json）");
        return Ok(());
    }

    eprintln!("==> 检查 {} 个场景文件...\n", files.len());

    let mut result = SceneCheckResult::default();
    for file in &files {
        check_scene_file(file, &mut result);
    }

    print_check_result(&result);

    if !result.errors.is_empty() {
        anyhow::bail!("场景检查发现错误");
    }

    Ok(())
}

/// 收集目录下的所有场景文件
fn collect_scene_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();
    files
}

/// 检查单个场景文件
fn check_scene_file(file: &Path, result: &mut SceneCheckResult) {
    let scene_id = file.display().to_string();
    result.scenes_checked += 1;

    let scene = match SceneFile::load(file) {
        Ok(scene) => scene,
        Err(e) => {
            result.errors.push(format!("{}: {}", scene_id, e));
            return;
        }
    };

    let steps = match scene.compile_steps() {
        Ok(steps) => steps,
        Err(e) => {
            result.errors.push(format!("{}: {}", scene_id, e));
            return;
        }
    };

    for (name, summaries) in &steps {
        if summaries.is_empty() {
            result
                .warnings
                .push(format!("{}: tween '{}' 没有任何步骤", scene_id, name));
        }
    }
}

/// 输出检查结果
fn print_check_result(result: &SceneCheckResult) {
    eprintln!("─────────────────────────────────────────────────────");
    eprintln!("检查完成: {} 个场景", result.scenes_checked);
    eprintln!();

    for error in &result.errors {
        eprintln!("[ERROR] {}", error);
    }
    for warning in &result.warnings {
        eprintln!("[WARN] {}", warning);
    }

    let error_count = result.errors.len();
    let warn_count = result.warnings.len();

    eprintln!();
    if error_count > 0 {
        eprintln!("❌ {} 个错误, {} 个警告", error_count, warn_count);
    } else if warn_count > 0 {
        eprintln!("⚠️  0 个错误, {} 个警告", warn_count);
    } else {
        eprintln!("✅ 检查通过，无错误");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gates_run_fmt_clippy_test_in_order() {
        let first: Vec<&str> = GATES.iter().map(|gate| gate[0]).collect();
        assert_eq!(first, vec!["fmt", "clippy", "test"]);
        assert!(GATES.iter().skip(1).all(|gate| gate.contains(&"--workspace")));
    }
}
