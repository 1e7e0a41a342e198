use std::path::{Path, PathBuf};
use std::process::{Command, ExitCode};

use clap::{Parser, Subcommand};

const EBPF_CRATE_DIR: &str = "crates/ebpf-engine/ebpf";
const EBPF_TARGET: &str = "bpfel-unknown-none";
const EBPF_BIN: &str = "xdpwall-ebpf";

/// xdpwall 빌드 태스크
#[derive(Parser)]
#[command(name = "xtask")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// XDP 커널 프로그램 빌드
    BuildEbpf {
        /// 릴리스 모드로 빌드
        #[arg(long)]
        release: bool,

        /// 빌드된 오브젝트를 복사할 경로 (데몬의 `ebpf.object_path`)
        #[arg(long)]
        install: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::BuildEbpf { release, install } => {
            build_ebpf(release).and_then(|object| match install {
                Some(dest) => install_object(&object, &dest),
                None => Ok(()),
            })
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("xtask: {e}");
            ExitCode::FAILURE
        }
    }
}

/// XDP 프로그램을 빌드하고 오브젝트 파일 경로를 반환합니다.
fn build_ebpf(release: bool) -> Result<PathBuf, String> {
    let mut cmd = Command::new("cargo");
    cmd.current_dir(EBPF_CRATE_DIR);
    cmd.args([
        "+nightly",
        "build",
        &format!("--target={EBPF_TARGET}"),
        "-Z",
        "build-std=core",
    ]);
    if release {
        cmd.arg("--release");
    }

    let status = cmd
        .status()
        .map_err(|e| format!("failed to run cargo: {e}"))?;
    if !status.success() {
        return Err("XDP program build failed".to_owned());
    }

    let profile = if release { "release" } else { "debug" };
    let object = Path::new(EBPF_CRATE_DIR)
        .join("target")
        .join(EBPF_TARGET)
        .join(profile)
        .join(EBPF_BIN);
    println!("XDP program built: {}", object.display());
    Ok(object)
}

fn install_object(object: &Path, dest: &Path) -> Result<(), String> {
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("failed to create {}: {e}", parent.display()))?;
    }
    std::fs::copy(object, dest)
        .map_err(|e| format!("failed to copy object to {}: {e}", dest.display()))?;
    println!("installed to {}", dest.display());
    Ok(())
}
