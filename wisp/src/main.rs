mod config;
mod stdlib;

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use wisp::env::Scope;
use wisp::error::Error;
use wisp::resolver::MODULE_EXTENSION;
use wisp::{load_graph, Evaluator, FsModuleSource, Resolver};

use config::Config;

/// Runs a wisp program: resolves its module graph and evaluates it
/// top to bottom in dependency order.
#[derive(Parser, Debug)]
#[command(name = "wisp", version)]
struct Cli {
	/// Script to run directly, bypassing `wisp.config.json`.
	#[arg(long)]
	entrypoint: Option<PathBuf>,

	/// Config file to read the entrypoint and import aliases from.
	#[arg(long, default_value = "wisp.config.json")]
	config: PathBuf,
}

fn main() {
	if let Err(err) = run() {
		eprintln!("[error] {err:#}");
		std::process::exit(1);
	}
}

fn run() -> anyhow::Result<()> {
	tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

	let cli = Cli::parse();
	let (entrypoint, aliases) = match cli.entrypoint {
		Some(path) => (path, Default::default()),
		None => {
			let config = Config::load(&cli.config).context("loading wisp.config.json")?;
			(config.entrypoint, config.aliases)
		}
	};

	let entrypoint = validate_entrypoint(entrypoint)?;

	let resolver = Resolver::new(aliases);
	let builtins = Scope::new();
	stdlib::register_all(&builtins).context("registering standard library")?;

	let source = FsModuleSource;
	let registry = load_graph(&entrypoint, &source, &resolver).context("resolving module graph")?;

	let mut evaluator = Evaluator::new(resolver, builtins);
	evaluator.run(&registry).context("running program")?;

	Ok(())
}

/// Checks the entry point before any module is read: it must exist and
/// carry the recognized source extension, and resolution downstream needs
/// it in canonical, absolute form (`Resolver::resolve` rejects a
/// non-absolute importer).
fn validate_entrypoint(path: PathBuf) -> anyhow::Result<PathBuf> {
	let canonical = std::fs::canonicalize(&path)
		.map_err(|e| Error::path(format!("entrypoint `{}` does not exist: {e}", path.display())))?;
	match canonical.extension() {
		Some(ext) if ext == MODULE_EXTENSION => Ok(canonical),
		_ => Err(Error::path(format!(
			"entrypoint `{}` must have a `.{MODULE_EXTENSION}` extension",
			canonical.display()
		))
		.into()),
	}
}
