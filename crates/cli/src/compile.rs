use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, ValueEnum};
use httpdesign_common::ResolvedModel;
use similar::TextDiff;
use tracing::info;

use crate::error::{CliError, report};

/// Encoding of the printed model.
#[derive(ValueEnum, Clone, Debug, Copy, PartialEq, Eq, Default)]
#[value(rename_all = "lower")]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
}

#[derive(Args, Debug, Clone)]
pub struct CompileArgs {
    /// Design document (.yaml, .yml, .json or .toml)
    #[arg(value_name = "DESIGN")]
    pub design: PathBuf,

    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Write the model to a file instead of stdout
    #[arg(long, short, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Compare the model with an expected file and print a diff on mismatch
    #[arg(long, value_name = "EXPECTED", conflicts_with = "output")]
    pub check: Option<PathBuf>,
}

pub fn run(args: &CompileArgs) -> i32 {
    match compile(args) {
        Ok(()) => 0,
        Err(err) => report(&err),
    }
}

fn compile(args: &CompileArgs) -> Result<(), CliError> {
    let model = httpdesign_core::compile_file(&args.design)?;
    let rendered = render(&model, args.format)?;

    if let Some(expected) = &args.check {
        return check(&rendered, expected);
    }
    match &args.output {
        Some(path) => {
            fs::write(path, &rendered).map_err(|source| CliError::Io {
                action: "write",
                path: path.clone(),
                source,
            })?;
            info!(path = %path.display(), "resolved model written");
        }
        None => print!("{rendered}"),
    }
    Ok(())
}

pub fn render(model: &ResolvedModel, format: OutputFormat) -> Result<String, CliError> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(model)
            .map(|json| json + "\n")
            .map_err(|e| CliError::Render {
                format: "JSON",
                message: e.to_string(),
            }),
        OutputFormat::Yaml => serde_yaml::to_string(model).map_err(|e| CliError::Render {
            format: "YAML",
            message: e.to_string(),
        }),
    }
}

fn check(rendered: &str, expected: &Path) -> Result<(), CliError> {
    let existing = fs::read_to_string(expected).map_err(|source| CliError::Io {
        action: "read",
        path: expected.to_path_buf(),
        source,
    })?;
    match unified_diff(&existing, rendered, expected) {
        None => {
            info!(expected = %expected.display(), "resolved model is up to date");
            Ok(())
        }
        Some(diff) => Err(CliError::Mismatch {
            expected: expected.to_path_buf(),
            diff,
        }),
    }
}

/// Unified diff from `existing` to `new`, `None` when they are equal.
pub fn unified_diff(existing: &str, new: &str, expected: &Path) -> Option<String> {
    if existing == new {
        return None;
    }
    let old_header = format!("{} (expected)", expected.display());
    let diff = TextDiff::from_lines(existing, new);
    Some(
        diff.unified_diff()
            .context_radius(3)
            .header(&old_header, "compiled")
            .to_string(),
    )
}
