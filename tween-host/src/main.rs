//! # Tween Player
//!
//! 无界面播放器 - 加载 JSON 场景，逐帧推进并输出目标属性的采样报告。
//!
//! ## 用法
//!
//! ```bash
//! cargo run -p tween-host -- play scenes/slide.json
//! cargo run -p tween-host -- play scenes/slide.json --fps 30 --frames 90 --output report.json
//! cargo run -p tween-host -- steps scenes/guide.json
//! cargo run -p tween-host -- init-config
//! ```

use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{Level, warn};

use tween_host::{HostConfig, Player, SceneFile};

#[derive(Parser)]
#[command(name = "tween-player")]
#[command(about = "补间场景播放器 - 逐帧播放 JSON 场景并输出属性采样")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 配置文件（默认：config.json）
    #[arg(short, long, default_value = "config.json", global = true)]
    config: PathBuf,

    /// 日志级别，覆盖配置文件
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// 播放场景并输出采样报告
    Play {
        /// 场景文件
        scene: PathBuf,

        /// 帧率，覆盖配置文件
        #[arg(long)]
        fps: Option<f64>,

        /// 播放帧数，覆盖配置文件
        #[arg(long)]
        frames: Option<u32>,

        /// 采样间隔帧数，覆盖配置文件
        #[arg(long)]
        sample_every: Option<u32>,

        /// 报告中附带步骤表
        #[arg(long)]
        dump_steps: bool,

        /// 输出文件（默认：标准输出）
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// 编译场景并输出各 tween 的步骤表
    Steps {
        /// 场景文件
        scene: PathBuf,
    },

    /// 写出默认配置文件
    InitConfig,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = HostConfig::load(&cli.config);
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    init_logging(&config.log_level);

    match cli.command {
        Commands::Play {
            scene,
            fps,
            frames,
            sample_every,
            dump_steps,
            output,
        } => {
            if let Some(fps) = fps {
                config.fps = fps;
            }
            if let Some(frames) = frames {
                config.frames = frames;
            }
            if let Some(sample_every) = sample_every {
                config.sample_every = sample_every;
            }
            config.dump_steps |= dump_steps;
            config.validate()?;

            let scene_file = SceneFile::load(&scene)?;
            let report = Player::new(config).run(&scene_file)?;
            let json = serde_json::to_string_pretty(&report)?;
            write_output(output, &json)?;
        }
        Commands::Steps { scene } => {
            let steps = SceneFile::load(&scene)?.compile_steps()?;
            println!("{}", serde_json::to_string_pretty(&steps)?);
        }
        Commands::InitConfig => {
            if cli.config.exists() {
                anyhow::bail!("配置文件已存在: {}", cli.config.display());
            }
            HostConfig::default().save(&cli.config)?;
            eprintln!("已写出默认配置: {}", cli.config.display());
        }
    }

    Ok(())
}

fn init_logging(level: &str) {
    let parsed = level.parse::<Level>();
    tracing_subscriber::fmt()
        .with_max_level(parsed.as_ref().map_or(Level::INFO, |l| *l))
        .with_writer(std::io::stderr)
        .init();
    if parsed.is_err() {
        warn!(log_level = level, "未知日志级别，使用 info");
    }
}

fn write_output(output: Option<PathBuf>, json: &str) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            fs::write(&path, json)
                .with_context(|| format!("写入报告失败: {}", path.display()))?;
            eprintln!("报告已写入: {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}
