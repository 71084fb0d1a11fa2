use anyhow::Context;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Debug, Default, PartialEq)]
struct CliArgs {
    assets: Option<PathBuf>,
    no_audio: bool,
    log: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let args = parse_args(std::env::args().skip(1).collect())?;
    let settings = songcard::config::load_settings()?;

    let log_path = match args.log.clone().or_else(|| settings.log_file.clone()) {
        Some(path) => Some(path),
        None => songcard::config::default_log_path().ok(),
    };
    if let Some(path) = log_path {
        init_logging(&path);
    }

    songcard::app::run_with_startup(
        settings,
        songcard::app::AppStartupOptions {
            asset_root: args.assets,
            no_audio: args.no_audio,
        },
    )
}

/// Logs go to a file; the terminal belongs to the UI.
fn init_logging(path: &Path) {
    let file = match open_log_file(path) {
        Ok(file) => file,
        Err(err) => {
            eprintln!("songcard: logging disabled: {err:#}");
            return;
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("songcard=info"));
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_target(true)
                .with_writer(Mutex::new(file)),
        )
        .with(filter)
        .init();
}

fn open_log_file(path: &Path) -> anyhow::Result<File> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create log directory {}", parent.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))
}

fn parse_args(args: Vec<String>) -> anyhow::Result<CliArgs> {
    let mut out = CliArgs::default();
    let mut index = 0;
    while index < args.len() {
        match args[index].as_str() {
            "--no-audio" => out.no_audio = true,
            flag @ ("--assets" | "--log") => {
                index += 1;
                let Some(value) = args.get(index) else {
                    anyhow::bail!("{flag} requires a path");
                };
                if value.trim().is_empty() {
                    anyhow::bail!("{flag} cannot be empty");
                }
                let path = Some(PathBuf::from(value.trim()));
                if flag == "--assets" {
                    out.assets = path;
                } else {
                    out.log = path;
                }
            }
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            other => anyhow::bail!("unknown argument {other}"),
        }
        index += 1;
    }
    Ok(out)
}

fn print_help() {
    println!("SongCard");
    println!("  --assets <dir>    Directory track covers and audio resolve against");
    println!("  --no-audio        Run without an audio output device");
    println!("  --log <file>      Log file (RUST_LOG sets the filter)");
    println!();
    println!("Keys: Left/Right previous/next, Space play/pause, Up/Down volume, q quit");
}
