//! Command-line front end for `ctpl`: renders one or more template files
//! against an environment built from `--env-file`/`--env-chunk` sources,
//! in the order given on the command line.

use clap::Parser;
use ctpl::{env_loader, filter, Environment, InputStream};
use std::fs::File;
use std::io::{self, BufWriter, Cursor, Write};
use std::path::PathBuf;
use std::process::ExitCode;

/// Render text templates against a symbol environment.
#[derive(Parser, Debug)]
#[command(name = "ctpl", version, about)]
struct Cli {
    /// Template files to render, in order; their output is concatenated.
    #[arg(required = true)]
    templates: Vec<PathBuf>,

    /// Write output here instead of stdout.
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Load environment bindings from a file (repeatable, applied in order).
    #[arg(short = 'e', long = "env-file", value_name = "FILE")]
    env_files: Vec<PathBuf>,

    /// Load environment bindings from an inline chunk of text (repeatable).
    #[arg(short = 'c', long = "env-chunk", value_name = "TEXT")]
    env_chunks: Vec<String>,

    /// Enable verbose (debug-level) logging.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{}", err.describe());
            eprintln!("ctpl: {}", err.describe());
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> ctpl::Result<()> {
    let mut env = Environment::new();
    filter::register_builtins(&mut env);

    for path in &cli.env_files {
        log::debug!("loading environment file {}", path.display());
        let file = File::open(path).map_err(|source| ctpl::Error::Io {
            source,
            position: None,
        })?;
        let mut stream = InputStream::new(path.display().to_string(), file);
        env_loader::load(&mut stream, &mut env)?;
    }

    for (i, chunk) in cli.env_chunks.iter().enumerate() {
        log::debug!("loading environment chunk #{i}");
        let mut stream = InputStream::new(
            format!("<env-chunk {i}>"),
            Cursor::new(chunk.as_bytes().to_vec()),
        );
        env_loader::load(&mut stream, &mut env)?;
    }

    let mut sink: Box<dyn Write> = match &cli.output {
        Some(path) => Box::new(BufWriter::new(File::create(path).map_err(|source| {
            ctpl::Error::Io {
                source,
                position: None,
            }
        })?)),
        None => Box::new(BufWriter::new(io::stdout())),
    };

    for path in &cli.templates {
        log::debug!("rendering template {}", path.display());
        let file = File::open(path).map_err(|source| ctpl::Error::Io {
            source,
            position: None,
        })?;
        ctpl::render_template(path.display().to_string(), file, &mut env, &mut sink)?;
    }

    sink.flush().map_err(|source| ctpl::Error::Io {
        source,
        position: None,
    })
}
