// rgo-cli: CLI entry point for rgo tools (init, build, version).

mod setup;

use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use rgo_codegen::config::CONFIG_FILE;

#[derive(Parser)]
#[command(name = "rgo", about = "rgo: generate R packages that call into Go packages")]
struct Cli {
    /// Verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starting rgo.toml for a Go package.
    Init {
        /// Import path of the Go package to wrap.
        pkg_path: String,
        /// Directory to write rgo.toml into.
        #[arg(long, default_value = ".")]
        dir: PathBuf,
        /// Print the config to stdout instead of writing it.
        #[arg(long)]
        dry_run: bool,
    },
    /// Generate the R package sources for the configured Go package.
    #[command(alias = "generate")]
    Build {
        /// Path to rgo.toml.
        #[arg(long, default_value = CONFIG_FILE)]
        config: PathBuf,
        /// Print the generated files to stdout as a txtar archive.
        #[arg(long)]
        dry_run: bool,
    },
    /// Print the rgo version.
    Version,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(err) = run(cli.command) {
        eprintln!("rgo: {err}");
        std::process::exit(1);
    }
}

fn run(command: Commands) -> Result<(), Box<dyn Error>> {
    match command {
        Commands::Init { pkg_path, dir, dry_run } => setup::run_init(&pkg_path, &dir, dry_run),
        Commands::Build { config, dry_run } => Ok(rgo_codegen::run_generate(&config, dry_run)?),
        Commands::Version => {
            println!("rgo {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Log to stderr. RUST_LOG takes precedence over the verbosity flag.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}
