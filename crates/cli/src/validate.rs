use std::path::PathBuf;

use clap::Args;
use httpdesign_core::Error;

#[derive(Args, Debug, Clone)]
pub struct ValidateArgs {
    /// Design document (.yaml, .yml, .json or .toml)
    #[arg(value_name = "DESIGN")]
    pub design: PathBuf,
}

pub fn run(args: &ValidateArgs) -> i32 {
    match httpdesign_core::compile_file(&args.design) {
        Ok(model) => {
            let endpoints: usize = model.services.iter().map(|s| s.endpoints.len()).sum();
            println!(
                "{}: ok ({} services, {endpoints} endpoints)",
                args.design.display(),
                model.services.len()
            );
            0
        }
        Err(Error::Design(diagnostics)) => {
            eprintln!(
                "{}: {} problem(s) found\n{diagnostics}",
                args.design.display(),
                diagnostics.len()
            );
            1
        }
        Err(err) => {
            eprintln!("{err}");
            1
        }
    }
}
