use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// The extension every module file is expected to carry.
pub const MODULE_EXTENSION: &str = "wisp";

/// Resolves import specifiers to canonical file paths. A specifier prefixed
/// with `@name/...` is looked up against a configured alias table (the
/// project config's `aliases` map); anything else is resolved relative to
/// the importing module's own directory.
#[derive(Clone, Default)]
pub struct Resolver {
	aliases: HashMap<String, PathBuf>,
}

impl Resolver {
	pub fn new(aliases: HashMap<String, PathBuf>) -> Resolver {
		Resolver { aliases }
	}

	/// `importer` is the absolute path of the module doing the importing;
	/// `spec` is the raw string inside the `from "..."` clause. Three
	/// failure modes — non-absolute importer, unmatched alias, unrecognized
	/// extension — surface as `PathError`; a resolved path that simply
	/// doesn't exist on disk is left to the module reader (`ModuleError`).
	/// The final path is canonicalized against the real filesystem (§4.1:
	/// "canonicalized (symlinks resolved; `..` collapsed)") so that two
	/// specifiers reaching the same file through different symlinks key the
	/// same `Module` — this is the only filesystem touch in resolution, and
	/// it degrades gracefully to the lexically-normalized path when nothing
	/// exists there yet, which is what keeps this testable against fixture
	/// paths that never touch a real disk.
	pub fn resolve(&self, importer: &Path, spec: &str) -> Result<PathBuf> {
		if !importer.is_absolute() {
			return Err(Error::path(format!("importer `{}` is not an absolute path", importer.display())));
		}

		let raw = if let Some(rest) = spec.strip_prefix('@') {
			let mut parts = rest.splitn(2, '/');
			let alias = parts.next().unwrap_or("");
			let remainder = parts.next().unwrap_or("");
			let base = self.aliases.get(alias).ok_or_else(|| Error::path(format!("no alias registered for `@{alias}`")))?;
			base.join(remainder)
		} else {
			let dir = importer.parent().unwrap_or_else(|| Path::new("."));
			dir.join(spec)
		};

		let with_extension = match raw.extension() {
			None => raw.with_extension(MODULE_EXTENSION),
			Some(ext) if ext == MODULE_EXTENSION => raw,
			Some(ext) => {
				return Err(Error::path(format!(
					"`{spec}` has extension `.{}`, expected `.{MODULE_EXTENSION}`",
					ext.to_string_lossy()
				)))
			}
		};
		let normalized = normalize(&with_extension).ok_or_else(|| Error::path(format!("`{spec}` escapes the project root")))?;
		Ok(canonicalize_best_effort(&normalized))
	}
}

/// Resolves symlinks against the real filesystem when the target exists;
/// falls back to the already `.`/`..`-collapsed path otherwise (a module
/// that hasn't been written yet, or a fixture path in a test with no
/// backing filesystem). The fallback is what keeps `resolve` pure enough to
/// test against synthetic paths while still giving real runs true canonical
/// identity.
fn canonicalize_best_effort(path: &Path) -> PathBuf {
	std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Lexically collapses `.` and `..` components without touching the
/// filesystem, so resolution stays testable against paths that may not
/// exist yet. Returns `None` if the path tries to climb above its root.
fn normalize(path: &Path) -> Option<PathBuf> {
	let mut out = PathBuf::new();
	for component in path.components() {
		use std::path::Component::*;
		match component {
			CurDir => {}
			ParentDir => {
				if !out.pop() {
					return None;
				}
			}
			other => out.push(other.as_os_str()),
		}
	}
	Some(out)
}
