use std::{env, fs::exists, path::PathBuf};

use tracing::debug;

use crate::{AppError, OptionsConfig};

const DEFAULT_CONFIG_NAMES: [&str; 4] = [
	"compose2nomad.yaml",
	"compose2nomad.yml",
	"compose2nomad.toml",
	"compose2nomad.json",
];

/// Loads the config file given on the command line, or the first one found in the default locations.
pub(crate) fn get_config_from_cli(
	config_path: Option<PathBuf>,
	ignore_config_file: bool,
) -> Result<OptionsConfig, AppError> {
	let config_path = if let Some(path) = config_path {
		Some(path)
	} else if !ignore_config_file {
		get_config_path_from_defaults()
	} else {
		None
	};

	match config_path {
		Some(config_path) => {
			debug!("Using the config file `{}`", config_path.display());

			OptionsConfig::from_file(&config_path)
		}
		None => Ok(OptionsConfig::default()),
	}
}

fn get_config_path_from_defaults() -> Option<PathBuf> {
	for name in DEFAULT_CONFIG_NAMES {
		if exists(name).is_ok_and(|exists| exists) {
			return Some(PathBuf::from(name));
		}
	}

	// Try xdg path if nothing else was found
	get_config_from_xdg()
}

fn get_config_from_xdg() -> Option<PathBuf> {
	let xdg_config = if let Ok(env_val) = env::var("XDG_CONFIG_HOME") {
		Some(PathBuf::from(env_val))
	} else {
		env::home_dir().map(|home| home.join(".config"))
	};

	let config_dir = xdg_config?.join("compose2nomad");

	if !config_dir.is_dir() {
		return None;
	}

	DEFAULT_CONFIG_NAMES
		.into_iter()
		.map(|name| config_dir.join(name))
		.find(|path| exists(path).is_ok_and(|exists| exists))
}
