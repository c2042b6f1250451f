#![forbid(unsafe_code)]

use clap::Parser;

use gaze_harness::cli::{Cli, init_logging, run};

fn main() {
    let cli = Cli::parse();
    let json = cli.json;
    init_logging(json);
    if let Err(error) = run(cli) {
        if json {
            eprintln!(
                "{}",
                serde_json::json!({
                    "status": "error",
                    "error": error.to_string(),
                    "exit_code": error.exit_code(),
                })
            );
        } else {
            eprintln!("{error}");
        }
        std::process::exit(error.exit_code());
    }
}
