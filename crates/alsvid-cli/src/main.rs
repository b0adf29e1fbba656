//! Alsvid command-line interface.
//!
//! ```text
//!     A L S V I D
//!     oracle synthesis for QIR
//! ```
//!
//! `alsvid INPUT OUTPUT` reads a QIR module, synthesizes every discovered
//! (classical function, operation) pair, and writes the module back out.
//!
//! Exit codes: 0 on success, 1 on bad arguments, a failed synthesis, or a
//! failed output write, 2 when the input module cannot be read or parsed.

use std::fs;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Alsvid - compile classical functions into quantum oracles
#[derive(Parser)]
#[command(name = "alsvid")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Input QIR module (textual IR)
    input: String,

    /// Output path for the synthesized module
    output: String,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(error) => {
            // clap would exit with code 2, which is reserved for parse
            // failures of the input module
            println!("[e] {error}");
            println!("usage: alsvid INPUT OUTPUT");
            return ExitCode::from(1);
        }
    };

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();

    let source = match fs::read_to_string(&cli.input) {
        Ok(source) => source,
        Err(error) => {
            println!("[e] error reading module: {error}");
            return ExitCode::from(2);
        }
    };

    let mut module = match alsvid_qir::parse(&source) {
        Ok(module) => module,
        Err(error) => {
            println!("[e] error reading module: {error}");
            return ExitCode::from(2);
        }
    };

    if let Err(error) = alsvid_compile::compile_module(&mut module) {
        println!("[e] {error}");
        return ExitCode::from(1);
    }

    // code 2 is reserved for failures to read or parse the input module;
    // a write failure after a successful compile is a general failure
    if let Err(error) = fs::write(&cli.output, alsvid_qir::print(&module)) {
        println!("[e] error writing module: {error}");
        return ExitCode::from(1);
    }

    ExitCode::SUCCESS
}
