//! irstage command-line driver.
//!
//! `irstage samples` regenerates the staged sample trees and
//! `irstage coverage` renders coverage reports for instrumented test
//! binaries. Both run to completion or stop at the first failing tool.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use irstage::core::{locate_tool, CoverageConfig, PipelineConfig, PipelineResult};
use irstage::coverage::CoverageRun;
use irstage::pipeline::Pipeline;
use irstage::toolchain::LlvmToolchain;

#[derive(Parser, Debug)]
#[command(name = "irstage", version, about = "Staged LLVM sample builds and coverage reports")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile every sample to IR, assembly, objects and programs at -O0..-O3.
    Samples(SamplesArgs),
    /// Build the test binaries, run them instrumented and render HTML reports.
    Coverage(CoverageArgs),
}

#[derive(Args, Debug)]
struct SamplesArgs {
    /// Tree of .c/.cpp samples.
    #[arg(long, env = "IRSTAGE_SOURCE_ROOT", default_value = "ir_samples/src")]
    source_root: PathBuf,

    /// Root of the generated trees; deleted at the start of every run.
    #[arg(long, env = "IRSTAGE_OUTPUT_ROOT", default_value = "ir_samples/generated")]
    output_root: PathBuf,

    /// Directory holding the LLVM binaries. Defaults to looking them up on PATH.
    #[arg(long, env = "IRSTAGE_LLVM_BIN")]
    llvm_bin: Option<PathBuf>,

    /// C front end.
    #[arg(long)]
    cc: Option<PathBuf>,

    /// C++ front end.
    #[arg(long)]
    cxx: Option<PathBuf>,

    /// IR optimizer.
    #[arg(long)]
    opt: Option<PathBuf>,

    #[arg(long, default_value = PipelineConfig::DEFAULT_C_STANDARD)]
    c_std: String,

    #[arg(long, default_value = PipelineConfig::DEFAULT_CXX_STANDARD)]
    cxx_std: String,
}

#[derive(Args, Debug)]
struct CoverageArgs {
    #[arg(long, env = "IRSTAGE_BUILD_DIR", default_value = "build")]
    build_dir: PathBuf,

    /// Instrumented test binary; may be given several times.
    #[arg(long = "binary", default_value = "build/bin/kaleidoscope-tests")]
    binaries: Vec<PathBuf>,

    /// Sources the report is scoped to.
    #[arg(long, default_value = "kaleidoscope")]
    source_dir: PathBuf,

    /// Parent of the per-binary report directories.
    #[arg(long, default_value = "cov-report")]
    report_dir: PathBuf,

    /// Directory holding the LLVM binaries. Defaults to looking them up on PATH.
    #[arg(long, env = "IRSTAGE_LLVM_BIN")]
    llvm_bin: Option<PathBuf>,

    /// Build system driver, invoked as `<tool> --build <build-dir>`.
    #[arg(long, default_value = "cmake")]
    build_tool: PathBuf,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Command::Samples(args) => run_samples(args),
        Command::Coverage(args) => run_coverage(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default)).init();
}

fn run_samples(args: SamplesArgs) -> PipelineResult<()> {
    let llvm_bin = args.llvm_bin.as_deref();
    let cc = locate_tool(args.cc.as_deref(), llvm_bin, "clang")?;
    let cxx = locate_tool(args.cxx.as_deref(), llvm_bin, "clang++")?;
    let opt = locate_tool(args.opt.as_deref(), llvm_bin, "opt")?;

    let config = PipelineConfig::new(cc, opt, args.source_root, args.output_root)
        .with_cxx_compiler(cxx)
        .with_standards(args.c_std, args.cxx_std);
    log::debug!("{:?}", config);

    let toolchain = LlvmToolchain::for_pipeline(&config);
    let stats = Pipeline::new(config, toolchain).run()?;
    log::info!("{}", stats.to_string().trim_end());
    Ok(())
}

fn run_coverage(args: CoverageArgs) -> PipelineResult<()> {
    let llvm_bin = args.llvm_bin.as_deref();
    let explicit = Some(args.build_tool.as_path()).filter(|p| has_dir(p));
    let build_tool = locate_tool(explicit, None, &args.build_tool.to_string_lossy())?;

    let config = CoverageConfig {
        build_tool,
        build_dir: args.build_dir,
        binaries: args.binaries,
        source_dir: args.source_dir,
        report_root: args.report_dir,
        profdata_path: locate_tool(None, llvm_bin, "llvm-profdata")?,
        cov_path: locate_tool(None, llvm_bin, "llvm-cov")?,
    };
    log::debug!("{:?}", config);

    let toolchain = LlvmToolchain::for_coverage(&config);
    let reports = CoverageRun::new(config, toolchain).run()?;
    for report in &reports {
        log::info!(
            "{}: {}",
            report.binary.display(),
            report.report_dir.join("index.html").display()
        );
    }
    Ok(())
}

/// A bare program name is looked up on PATH; anything with a directory is used as given.
fn has_dir(path: &Path) -> bool {
    path.parent().is_some_and(|p| !p.as_os_str().is_empty())
}
