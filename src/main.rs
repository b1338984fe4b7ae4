use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{ArgAction, Parser};
use proofline::File;

#[derive(Debug, Parser)]
#[command(version, about, disable_version_flag = true)]
struct Args {
    /// Proof outlines to check; standard input is read when none are given
    inputs: Vec<PathBuf>,
    /// Only report failures
    #[arg(short, long)]
    quiet: bool,
    /// Print version
    #[arg(short = 'v', long, action = ArgAction::Version)]
    version: Option<bool>,
}

fn main() -> ExitCode {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Warn)
        .format_timestamp(None)
        .format_target(false)
        .parse_default_env()
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> anyhow::Result<()> {
    if args.inputs.is_empty() {
        let mut contents = String::new();
        std::io::stdin()
            .read_to_string(&mut contents)
            .context("failed to read standard input")?;
        return check(args, File::new("<stdin>", contents));
    }
    for input in &args.inputs {
        let contents = std::fs::read_to_string(input)
            .with_context(|| format!("failed to read `{}`", input.display()))?;
        check(args, File::new(input.display().to_string(), contents))?;
    }
    Ok(())
}

fn check(args: &Args, file: File) -> anyhow::Result<()> {
    let name = file.name().to_owned();
    proofline::process(Arc::new(file))?;
    if !args.quiet {
        println!("{name} was checked successfully; the proof outline is valid!");
    }
    Ok(())
}
