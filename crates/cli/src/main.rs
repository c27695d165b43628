mod logging;

use std::fs;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use flate2::read::GzDecoder;

use sumstat_core::extract;

/// Simulation summary-log converter.
#[derive(Parser)]
#[command(name = "sumstat", version, about = "Convert simulation logs to Mathematica datasets")]
struct Cli {
    /// Path to the summary log (`.gz` accepted)
    data_file: PathBuf,

    /// Suppress the summary line
    #[arg(long)]
    quiet: bool,
}

fn main() {
    logging::init();
    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        eprintln!("{}", e);
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), String> {
    if !cli.data_file.is_file() {
        return Err(format!("file not found: {}", cli.data_file.display()));
    }

    let reader = open_reader(&cli.data_file)?;

    // Assemble the dataset in memory first; a structural error must
    // leave no output file behind.
    let mut out = Vec::new();
    let count = extract(reader, &mut out)
        .map_err(|e| format!("{}: {}", cli.data_file.display(), e))?;

    let out_path = output_path(&cli.data_file);
    fs::write(&out_path, &out)
        .map_err(|e| format!("could not write '{}': {}", out_path.display(), e))?;

    if !cli.quiet {
        println!("wrote {} runs to {}", count, out_path.display());
    }
    Ok(())
}

/// Open the input, decompressing transparently when it ends in `.gz`.
fn open_reader(path: &Path) -> Result<Box<dyn BufRead>, String> {
    let file =
        File::open(path).map_err(|e| format!("could not open '{}': {}", path.display(), e))?;
    if is_gzip(path) {
        Ok(Box::new(BufReader::new(GzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Output path next to the input: `runs.log` and `runs.log.gz` both
/// map to `runs.log.mma`.
fn output_path(input: &Path) -> PathBuf {
    let base = if is_gzip(input) {
        input.with_extension("")
    } else {
        input.to_path_buf()
    };
    let mut name = base.into_os_string();
    name.push(".mma");
    PathBuf::from(name)
}

fn is_gzip(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("gz")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_path_appends_mma() {
        assert_eq!(
            output_path(Path::new("runs.log")),
            PathBuf::from("runs.log.mma")
        );
        assert_eq!(output_path(Path::new("data")), PathBuf::from("data.mma"));
    }

    #[test]
    fn output_path_strips_gz_before_appending() {
        assert_eq!(
            output_path(Path::new("runs.log.gz")),
            PathBuf::from("runs.log.mma")
        );
        assert_eq!(
            output_path(Path::new("out/data.gz")),
            PathBuf::from("out/data.mma")
        );
    }

    #[test]
    fn gzip_detection_is_extension_based() {
        assert!(is_gzip(Path::new("x.log.gz")));
        assert!(!is_gzip(Path::new("x.log")));
        assert!(!is_gzip(Path::new("x.gzip")));
    }
}
