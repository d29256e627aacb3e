use std::{
	fs::{File, read_to_string},
	io::{Read, Write},
	path::{Path, PathBuf},
};

use serde::de::DeserializeOwned;

use crate::AppError;

/// The path that stands for stdin (as an input) or stdout (as an output).
pub const STDIO_PATH: &str = "-";

pub fn deserialize_toml<T: DeserializeOwned>(path: &Path) -> Result<T, AppError> {
	let contents = read_to_string(path).map_err(|e| AppError::ReadError {
		path: path.to_path_buf(),
		source: e,
	})?;

	toml::from_str(&contents).map_err(|e| AppError::DeserializationError {
		file: path.to_path_buf(),
		error: e.to_string(),
	})
}

pub fn deserialize_json<T: DeserializeOwned>(path: &Path) -> Result<T, AppError> {
	let file = read_file(path)?;

	serde_json::from_reader(file).map_err(|e| AppError::DeserializationError {
		file: path.to_path_buf(),
		error: e.to_string(),
	})
}

pub fn deserialize_yaml<T: DeserializeOwned>(path: &Path) -> Result<T, AppError> {
	let file = read_file(path)?;

	serde_yaml_ng::from_reader(file).map_err(|e| AppError::DeserializationError {
		file: path.to_path_buf(),
		error: e.to_string(),
	})
}

pub fn read_file(path: &Path) -> Result<File, AppError> {
	File::open(path).map_err(|e| AppError::ReadError {
		path: path.to_path_buf(),
		source: e,
	})
}

/// Reads a whole file, or stdin if the path is `-`.
pub fn read_input(path: &Path) -> Result<String, AppError> {
	if path == Path::new(STDIO_PATH) {
		let mut contents = String::new();

		std::io::stdin()
			.read_to_string(&mut contents)
			.map_err(|e| AppError::ReadError {
				path: PathBuf::from("<stdin>"),
				source: e,
			})?;

		return Ok(contents);
	}

	read_to_string(path).map_err(|e| AppError::ReadError {
		path: path.to_path_buf(),
		source: e,
	})
}

/// Writes the content to a file, or to stdout if there is no path or if the path is `-`.
pub fn write_output(path: Option<&Path>, content: &str) -> Result<(), AppError> {
	match path {
		Some(path) if path != Path::new(STDIO_PATH) => {
			let mut file = File::create(path).map_err(|e| AppError::WriteError {
				path: path.to_path_buf(),
				source: e,
			})?;

			file
				.write_all(content.as_bytes())
				.map_err(|e| AppError::WriteError {
					path: path.to_path_buf(),
					source: e,
				})
		}
		_ => {
			let mut stdout = std::io::stdout().lock();

			stdout
				.write_all(content.as_bytes())
				.and_then(|()| {
					if content.ends_with('\n') {
						Ok(())
					} else {
						stdout.write_all(b"\n")
					}
				})
				.map_err(|e| AppError::WriteError {
					path: PathBuf::from("<stdout>"),
					source: e,
				})
		}
	}
}
