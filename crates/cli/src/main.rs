//! httpdesign - HTTP API design compiler
//!
//! Loads a design document (YAML, JSON or TOML), runs it through the
//! compiler and prints the resolved HTTP model. Logs go to stderr so stdout
//! only carries the model.

mod compile;
mod error;
mod validate;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "httpdesign", version, about = "HTTP API design compiler")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Compile a design document and print the resolved model
    Compile(compile::CompileArgs),
    /// Check a design document and report every problem found
    Validate(validate::ValidateArgs),
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "httpdesign=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let code = match args.command {
        Command::Compile(args) => compile::run(&args),
        Command::Validate(args) => validate::run(&args),
    };
    std::process::exit(code);
}
