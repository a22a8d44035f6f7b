use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::ast::Stmt;
use crate::error::{Error, Result};
use crate::lexer::Lexer;
use crate::parser;
use crate::resolver::Resolver;

/// Abstracts reading a module's source text, so graph construction is
/// testable against an in-memory fixture instead of the real filesystem.
pub trait ModuleSource {
	fn read(&self, path: &Path) -> Result<String>;
}

/// Reads modules from disk; what the CLI wires up for a real run.
pub struct FsModuleSource;

impl ModuleSource for FsModuleSource {
	fn read(&self, path: &Path) -> Result<String> {
		std::fs::read_to_string(path).map_err(|e| Error::module(format!("cannot read `{}`: {e}", path.display())))
	}
}

/// One parsed module: its canonical path and its statement list.
pub struct Module {
	pub path: PathBuf,
	pub program: Vec<Stmt>,
}

/// The full set of modules reachable from an entry point, plus a
/// dependency-first evaluation order.
pub struct ModuleRegistry {
	modules: HashMap<PathBuf, Module>,
	pub order: Vec<PathBuf>,
}

impl ModuleRegistry {
	pub fn get(&self, path: &Path) -> Option<&Module> {
		self.modules.get(path)
	}

	#[cfg(test)]
	pub fn single(path: PathBuf, program: Vec<Stmt>) -> ModuleRegistry {
		let mut modules = HashMap::new();
		modules.insert(path.clone(), Module { path: path.clone(), program });
		ModuleRegistry { modules, order: vec![path] }
	}

	/// Builds a registry from already-parsed modules given in dependency-first
	/// order, bypassing the filesystem and resolver entirely.
	#[cfg(test)]
	pub fn multi(entries: Vec<(PathBuf, Vec<Stmt>)>) -> ModuleRegistry {
		let mut modules = HashMap::new();
		let mut order = Vec::new();
		for (path, program) in entries {
			order.push(path.clone());
			modules.insert(path.clone(), Module { path, program });
		}
		ModuleRegistry { modules, order }
	}
}

/// Discovers every module transitively imported from `entry`, parses each
/// one exactly once, rejects import cycles, and returns them in
/// dependency-first order: a module always appears after everything it
/// imports.
pub fn load_graph(entry: &Path, source: &dyn ModuleSource, resolver: &Resolver) -> Result<ModuleRegistry> {
	let mut modules = HashMap::new();
	let mut analyzing = HashSet::new();
	let mut analyzed = HashSet::new();
	let mut postorder = Vec::new();

	visit(entry, source, resolver, &mut modules, &mut analyzing, &mut analyzed, &mut postorder)?;

	tracing::debug!(modules = postorder.len(), "resolved module graph");
	Ok(ModuleRegistry { modules, order: postorder })
}

fn visit(
	path: &Path,
	source: &dyn ModuleSource,
	resolver: &Resolver,
	modules: &mut HashMap<PathBuf, Module>,
	analyzing: &mut HashSet<PathBuf>,
	analyzed: &mut HashSet<PathBuf>,
	postorder: &mut Vec<PathBuf>,
) -> Result<()> {
	if analyzed.contains(path) {
		return Ok(());
	}
	if analyzing.contains(path) {
		return Err(Error::resolution(format!("circular dependency including `{}`", path.display())));
	}
	analyzing.insert(path.to_path_buf());

	let text = source.read(path)?;
	let tokens = Lexer::new(&text).tokenize()?;
	let program = parser::parse(tokens)?;

	for stmt in &program {
		if let Stmt::Import { path: spec, .. } = stmt {
			let dep = resolver.resolve(path, &spec.lexeme)?;
			visit(&dep, source, resolver, modules, analyzing, analyzed, postorder)?;
		}
	}

	analyzing.remove(path);
	analyzed.insert(path.to_path_buf());
	postorder.push(path.to_path_buf());
	modules.insert(path.to_path_buf(), Module { path: path.to_path_buf(), program });
	Ok(())
}
