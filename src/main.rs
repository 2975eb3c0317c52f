//! Matrixgen CLI - Expand declarative CI matrices
//!
//! # Main Commands
//!
//! ```bash
//! matrixgen generate matrix.yaml           # Expand a matrix document
//! matrixgen generate matrix.yaml -c cfg.json --github-output
//! ```
//!
//! # Debug Commands (for development)
//!
//! ```bash
//! matrixgen check matrix.yaml              # Decode and flatten only
//! matrixgen directives                     # Show the directive reference
//! matrixgen example                        # Show an example document
//! ```

use clap::{Parser, Subcommand};
use matrixgen::{
    directives_description, example_document, generate_with_trace, load_document, FinalRecord,
    Node, NoopTrace, StderrTrace, TraceLevel, TraceSink,
};
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "matrixgen")]
#[command(about = "Expand declarative build matrices into concrete CI job configurations", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Expand a matrix document into its configuration records
    Generate {
        /// Input matrix document (JSON or YAML)
        input: PathBuf,

        /// Config document bound as `config` in expressions (default: {})
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output file for the JSON matrix (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Append a `matrix=<json>` line to a GitHub Actions output file
        /// (defaults to $GITHUB_OUTPUT when given without a value)
        #[arg(long, num_args = 0..=1, default_missing_value = "", value_name = "FILE")]
        github_output: Option<PathBuf>,

        /// Emit the matrix as a single line instead of pretty-printed
        #[arg(long)]
        compact: bool,

        /// Trace detail (-v: stage summaries, -vv: per-node steps)
        #[arg(short, long, action = clap::ArgAction::Count)]
        verbose: u8,
    },

    /// Decode and flatten a document without filtering (shape check)
    Check {
        /// Input matrix document (JSON or YAML)
        input: PathBuf,
    },

    /// Show the directive reference
    Directives,

    /// Show an example matrix document
    Example,
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Generate {
            input,
            config,
            output,
            github_output,
            compact,
            verbose,
        } => cmd_generate(
            &input,
            config.as_deref(),
            output.as_deref(),
            github_output.as_deref(),
            compact,
            verbose,
        ),

        Commands::Check { input } => cmd_check(&input),

        Commands::Directives => cmd_directives(),

        Commands::Example => cmd_example(),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_generate(
    input: &Path,
    config: Option<&Path>,
    output: Option<&Path>,
    github_output: Option<&Path>,
    compact: bool,
    verbose: u8,
) -> Result<(), Box<dyn std::error::Error>> {
    let level = match verbose {
        0 => TraceLevel::Normal,
        1 => TraceLevel::Detailed,
        _ => TraceLevel::Debugging,
    };
    let trace = StderrTrace::new(level);

    eprintln!("📄 Expanding: {}", input.display());
    let input_doc = load_document(input)?;
    trace.detailed(&format!(
        "input document:\n{}",
        serde_json::to_string_pretty(&input_doc)?
    ));

    let config_doc = match config {
        Some(path) => {
            eprintln!("   Config: {}", path.display());
            load_document(path)?
        }
        None => json!({}),
    };
    trace.detailed(&format!(
        "config object:\n{}",
        serde_json::to_string_pretty(&config_doc)?
    ));

    let node = Node::from_value(&input_doc)?;
    let matrix = generate_with_trace(&node, &config_doc, &trace)?;

    if matrix.is_empty() {
        return Err("failed to generate any configurations".into());
    }
    eprintln!("✅ Generated {} configurations", matrix.len());

    let rendered = if compact {
        serde_json::to_string(&matrix)?
    } else {
        serde_json::to_string_pretty(&matrix)?
    };
    write_output(&rendered, output)?;

    if let Some(target) = github_output {
        write_github_output(&matrix, target)?;
    }

    Ok(())
}

fn cmd_check(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let doc = load_document(input)?;
    let node = Node::from_value(&doc)?;
    let records = matrixgen::flatten(&node, &NoopTrace)?;
    eprintln!(
        "✅ {}: ok ({} partial records before filtering)",
        input.display(),
        records.len()
    );
    Ok(())
}

fn cmd_directives() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", directives_description());
    Ok(())
}

fn cmd_example() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(&example_document())?);
    Ok(())
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}

/// Append `matrix=<compact json>` to a GitHub Actions output file. An
/// empty path means "use $GITHUB_OUTPUT".
fn write_github_output(
    matrix: &[FinalRecord],
    path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let target: PathBuf = if path.as_os_str().is_empty() {
        std::env::var_os("GITHUB_OUTPUT")
            .map(PathBuf::from)
            .ok_or("--github-output given without a file and GITHUB_OUTPUT is not set")?
    } else {
        path.to_path_buf()
    };

    let line = format!("matrix={}\n", serde_json::to_string(matrix)?);
    use std::io::Write;
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&target)?;
    file.write_all(line.as_bytes())?;
    eprintln!("💾 Matrix appended to: {}", target.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn test_generate_writes_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("matrix.yaml");
        fs::write(&input, "os: [mac, linux]\n\"$if\": \"os != 'mac'\"\n").unwrap();
        let output = dir.path().join("matrix.json");

        cmd_generate(&input, None, Some(&output), None, true, 0).unwrap();

        let written = fs::read_to_string(&output).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&written).unwrap();
        assert_eq!(parsed, json!([{"os": "linux"}]));
    }

    #[test]
    fn test_generate_empty_matrix_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("matrix.yaml");
        fs::write(&input, "os: mac\n\"$if\": \"os != 'mac'\"\n").unwrap();

        let err = cmd_generate(&input, None, None, None, true, 0).unwrap_err();
        assert!(err.to_string().contains("failed to generate"));
    }

    #[test]
    fn test_github_output_appends() {
        let mut existing = tempfile::NamedTempFile::new().unwrap();
        writeln!(existing, "previous=1").unwrap();

        let matrix: Vec<FinalRecord> = vec![[("os".to_string(), json!("linux"))]
            .into_iter()
            .collect()];
        write_github_output(&matrix, existing.path()).unwrap();

        let content = fs::read_to_string(existing.path()).unwrap();
        assert!(content.starts_with("previous=1\n"));
        assert!(content.contains(r#"matrix=[{"os":"linux"}]"#));
    }

    #[test]
    fn test_check_reports_shape_errors() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("matrix.json");
        fs::write(&input, r#"{"$bogus": "x"}"#).unwrap();

        let err = cmd_check(&input).unwrap_err();
        assert!(err.to_string().contains("$bogus"));
    }
}
