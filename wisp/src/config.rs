use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// `wisp.config.json` shape: where to start, and what `@alias/...` import
/// prefixes resolve to. Mirrors the reference implementation's two-key
/// configuration file.
#[derive(Deserialize, Debug)]
pub struct Config {
	pub entrypoint: PathBuf,
	#[serde(default)]
	pub aliases: HashMap<String, PathBuf>,
}

impl Config {
	pub fn load(path: &Path) -> Result<Config> {
		let text = std::fs::read_to_string(path).with_context(|| format!("reading config file `{}`", path.display()))?;
		let mut config: Config =
			serde_json::from_str(&text).with_context(|| format!("parsing config file `{}`", path.display()))?;

		let base = path.parent().unwrap_or_else(|| Path::new("."));
		if config.entrypoint.is_relative() {
			config.entrypoint = base.join(&config.entrypoint);
		}
		for alias_path in config.aliases.values_mut() {
			if alias_path.is_relative() {
				*alias_path = base.join(&alias_path);
			}
		}
		Ok(config)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	#[test]
	fn loads_entrypoint_and_aliases_relative_to_config_dir() {
		let dir = std::env::temp_dir().join(format!("wisp-config-test-{}", std::process::id()));
		std::fs::create_dir_all(&dir).unwrap();
		let config_path = dir.join("wisp.config.json");
		let mut file = std::fs::File::create(&config_path).unwrap();
		write!(file, r#"{{"entrypoint": "src/main.wisp", "aliases": {{"lib": "vendor/lib"}}}}"#).unwrap();

		let config = Config::load(&config_path).unwrap();
		assert_eq!(config.entrypoint, dir.join("src/main.wisp"));
		assert_eq!(config.aliases.get("lib").unwrap(), &dir.join("vendor/lib"));

		std::fs::remove_dir_all(&dir).ok();
	}
}
