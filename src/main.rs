//! Single-file source bundler CLI

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use bundlecxx::BundlerBuilder;

/// Bundle a C-family translation unit's `#include "..."` tree into a
/// single self-contained source file
#[derive(Parser)]
#[command(name = "bundle-cxx")]
#[command(version = "0.1.0")]
#[command(about = "Single-file source bundler for a C-family translation unit")]
#[command(long_about = None)]
struct Args {
    /// Root source file to bundle
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output file path (defaults to stdout)
    #[arg(short, long, value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// User-include search directory, may be given multiple times
    #[arg(short = 'I', long = "include-dir", value_name = "DIR")]
    include_dirs: Vec<PathBuf>,

    /// Compiler driver to use for comment stripping (defaults to $CXX, then g++)
    #[arg(long)]
    cxx: Option<String>,

    /// Print debug-level logging to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut log_builder = env_logger::Builder::from_default_env();
    if args.verbose {
        log_builder.filter_level(log::LevelFilter::Debug);
    }
    log_builder.init();

    if !args.input.exists() {
        anyhow::bail!("Input file does not exist: {}", args.input.display());
    }
    if !args.input.is_file() {
        anyhow::bail!("Input path is not a file: {}", args.input.display());
    }

    let mut builder = BundlerBuilder::new().search_dirs(args.include_dirs);
    if let Some(cxx) = args.cxx {
        builder = builder.compiler(cxx);
    }
    let mut bundler = builder.build();

    match bundler.update(&args.input) {
        Ok(()) => {
            let bundled = bundler.finish();
            match args.output {
                Some(path) => {
                    std::fs::write(&path, &bundled)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                }
                None => {
                    std::io::stdout().write_all(&bundled)?;
                }
            }
        }
        Err(e) => {
            eprintln!("Error: {e}");
            let mut source = std::error::Error::source(&e);
            while let Some(err) = source {
                eprintln!("  Caused by: {err}");
                source = err.source();
            }
            std::process::exit(1);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parsing() {
        let args = Args::try_parse_from(["bundle-cxx", "main.cc"]).unwrap();
        assert_eq!(args.input, PathBuf::from("main.cc"));
        assert_eq!(args.output, None);
        assert!(args.include_dirs.is_empty());
        assert_eq!(args.verbose, false);
    }

    #[test]
    fn test_args_with_include_dirs() {
        let args = Args::try_parse_from([
            "bundle-cxx",
            "-I",
            "include",
            "-I",
            "vendor/include",
            "main.cc",
        ])
        .unwrap();
        assert_eq!(
            args.include_dirs,
            vec![PathBuf::from("include"), PathBuf::from("vendor/include")]
        );
    }

    #[test]
    fn test_args_with_output_and_cxx() {
        let args = Args::try_parse_from([
            "bundle-cxx",
            "--output",
            "bundled.cc",
            "--cxx",
            "clang++",
            "main.cc",
        ])
        .unwrap();
        assert_eq!(args.output, Some(PathBuf::from("bundled.cc")));
        assert_eq!(args.cxx, Some("clang++".to_string()));
    }
}
