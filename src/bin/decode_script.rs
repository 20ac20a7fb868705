//! Compile a script and decode a file with its `main` transform.
//!
//! Usage:
//!   decode_script [OPTIONS] SCRIPT [INPUT]
//!   decode_script SCRIPT < data.bin
//!
//! Prints the decoded value as a tree. Exit status: 0 on success, 1 when the
//! script is invalid or decoding fails, 2 on I/O errors, 3 when out of memory.

use anyhow::Context;
use bitscript::dump::{value_summary_line, value_to_dump};
use bitscript::{compile_file, Registry, Scope, StderrSink, Status, Value};
use clap::Parser;
use std::io::{self, Read};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "decode_script")]
#[command(about = "Decode binary data using a bitscript format description")]
#[command(version)]
struct Cli {
    /// Script defining a `main` transform
    script: PathBuf,

    /// Data to decode (default: stdin)
    input: Option<PathBuf>,

    /// Only compile the script
    #[arg(short, long)]
    check: bool,

    /// List the built-in primitives and exit
    #[arg(long)]
    list_primitives: bool,

    /// Print only the top-level line of the decoded value
    #[arg(short, long)]
    summary: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn exit_code(status: Status) -> i32 {
    match status {
        Status::InvalidInput => 1,
        Status::Io => 2,
        Status::OutOfMemory => 3,
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let registry = Registry::builtin();
    if cli.list_primitives {
        for name in registry.names() {
            println!("{}", name);
        }
        return Ok(());
    }

    let main = match compile_file(&cli.script, &registry, &mut StderrSink) {
        Ok(t) => t,
        Err(e) => {
            // Invalid input was already reported by the sink.
            if e.status() != Status::InvalidInput {
                eprintln!("{}", e);
            }
            std::process::exit(exit_code(e.status()));
        }
    };
    if cli.check {
        return Ok(());
    }

    let data = match &cli.input {
        Some(path) => {
            std::fs::read(path).with_context(|| format!("reading {}", path.display()))?
        }
        None => {
            let mut buf = Vec::new();
            io::stdin().read_to_end(&mut buf).context("reading stdin")?;
            buf
        }
    };

    match main.apply(&Scope::default(), &Value::Bytes(data)) {
        Ok(value) if cli.summary => {
            println!("{}", value_summary_line(&value));
            Ok(())
        }
        Ok(value) => {
            println!("{}", value_to_dump(&value, 0));
            Ok(())
        }
        Err(e) => {
            eprintln!("decode failed: {}", e);
            std::process::exit(1);
        }
    }
}
