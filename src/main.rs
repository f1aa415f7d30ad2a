use cifs_automount::cli::Cli;
use cifs_automount::error::AutomountError;
use cifs_automount::util::logging;
use clap::Parser;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // --help and --version go to stdout and succeed
            let _ = err.print();
            return if err.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    logging::init(cli.verbose);

    match cli.run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            if let Some(AutomountError::Usage(_)) = err.downcast_ref::<AutomountError>() {
                eprintln!("\nFor more information, try '--help'.");
            }
            ExitCode::FAILURE
        }
    }
}
