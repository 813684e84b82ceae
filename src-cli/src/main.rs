use std::process::ExitCode;

use clap::Parser;

use summarif_lib::commands::Command;

#[derive(Parser, Debug)]
#[command(name = "summarif")]
#[command(about = "Summarize PDFs and images with Gemini")]
struct Args {
    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let directives: &[&str] = if args.verbose {
        &["summarif_lib=debug", "summarif_core=debug"]
    } else {
        &["summarif_lib=info", "summarif_core=info"]
    };
    if let Err(e) = summarif_lib::init_logging(directives) {
        eprintln!("Failed to initialize logging: {:#}", e);
    }

    match summarif_lib::run(args.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
